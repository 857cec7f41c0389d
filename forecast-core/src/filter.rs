//! Allow-list filtering for JSON decoding.
//!
//! The MapClick feed is large, and we read a handful of fields out of it.
//! A [`FieldFilter`] describes the shape of those fields; decoding through it
//! skips everything else while parsing, so unlisted fields are never
//! allocated no matter how big the upstream response grows.
//!
//! Arrays take the filter of their parent entry and apply it to every
//! element. Scalars found where the filter expects an object are dropped.

use std::{
    collections::BTreeMap,
    fmt,
    io::{BufReader, Read},
};

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    /// Keep the whole subtree.
    Keep,
    /// Keep only the listed fields, each filtered further.
    Fields(BTreeMap<String, FieldFilter>),
}

impl Default for FieldFilter {
    fn default() -> Self {
        FieldFilter::Fields(BTreeMap::new())
    }
}

impl FieldFilter {
    /// Allow a dotted path such as `"currentobservation.Temp"`.
    ///
    /// The last segment is kept whole; intermediate segments become nested
    /// allow-lists. Allowing a path below an entry that is already `Keep` is
    /// a no-op.
    pub fn allow(mut self, path: &str) -> Self {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        self.insert(&segments);
        self
    }

    fn insert(&mut self, segments: &[&str]) {
        let FieldFilter::Fields(fields) = self else {
            return;
        };
        match segments {
            [] => {}
            [name] => {
                fields.insert(name.to_string(), FieldFilter::Keep);
            }
            [name, rest @ ..] => {
                fields.entry(name.to_string()).or_default().insert(rest);
            }
        }
    }

    /// The filter for `name`, or `None` if the field is dropped.
    pub fn get(&self, name: &str) -> Option<&FieldFilter> {
        match self {
            FieldFilter::Keep => Some(self),
            FieldFilter::Fields(fields) => fields.get(name),
        }
    }

    /// Whether the dotted `path` survives this filter.
    pub fn allows(&self, path: &str) -> bool {
        let mut node = self;
        for segment in path.split('.') {
            match node.get(segment) {
                Some(next) => node = next,
                None => return false,
            }
        }
        true
    }

    /// Decode a complete JSON document from `reader`, materializing only
    /// allowed fields.
    ///
    /// Trailing non-whitespace after the document is an error, as is an empty
    /// input. A top-level value that doesn't match the filter decodes to
    /// `Value::Null`.
    pub fn decode_reader<R: Read>(&self, reader: R) -> serde_json::Result<Value> {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
        let value = Filtered(self).deserialize(&mut de)?;
        de.end()?;
        Ok(value.unwrap_or(Value::Null))
    }

    pub fn decode_slice(&self, bytes: &[u8]) -> serde_json::Result<Value> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let value = Filtered(self).deserialize(&mut de)?;
        de.end()?;
        Ok(value.unwrap_or(Value::Null))
    }
}

/// Seed that decodes one value under a filter. `None` means dropped.
struct Filtered<'f>(&'f FieldFilter);

impl<'de> DeserializeSeed<'de> for Filtered<'_> {
    type Value = Option<Value>;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        match self.0 {
            FieldFilter::Keep => <Value as serde::Deserialize>::deserialize(deserializer).map(Some),
            FieldFilter::Fields(_) => deserializer.deserialize_any(FilteredVisitor(self.0)),
        }
    }
}

struct FilteredVisitor<'f>(&'f FieldFilter);

impl FilteredVisitor<'_> {
    fn dropped<E: de::Error>(self) -> Result<Option<Value>, E> {
        Ok(None)
    }
}

impl<'de> Visitor<'de> for FilteredVisitor<'_> {
    type Value = Option<Value>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        self.dropped()
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut out = Vec::new();
        while let Some(element) = seq.next_element_seed(Filtered(self.0))? {
            out.push(element.unwrap_or(Value::Null));
        }
        Ok(Some(Value::Array(out)))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut out = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            match self.0.get(&key) {
                Some(child) => {
                    if let Some(value) = map.next_value_seed(Filtered(child))? {
                        out.insert(key, value);
                    }
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(Some(Value::Object(out)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn observation_filter() -> FieldFilter {
        FieldFilter::default()
            .allow("currentobservation.Temp")
            .allow("data.temperature")
    }

    #[test]
    fn allow_builds_nested_entries() {
        let filter = observation_filter();
        assert!(filter.allows("currentobservation"));
        assert!(filter.allows("currentobservation.Temp"));
        assert!(filter.allows("data.temperature"));
        assert!(!filter.allows("currentobservation.Dewp"));
        assert!(!filter.allows("location"));
    }

    #[test]
    fn keep_covers_everything_below() {
        let filter = FieldFilter::default().allow("data");
        assert!(filter.allows("data.temperature"));

        // narrowing an already-kept entry changes nothing
        let filter = filter.allow("data.weather");
        assert_eq!(filter.get("data"), Some(&FieldFilter::Keep));
    }

    #[test]
    fn unlisted_fields_are_dropped() {
        let body = br#"{
            "operationalMode": "Production",
            "location": {"areaDescription": "Somewhere", "elevation": "33"},
            "currentobservation": {"Temp": "54", "Dewp": "40", "name": "KXYZ"},
            "data": {"temperature": ["61", "48"], "text": ["a very long text"]}
        }"#;

        let doc = observation_filter().decode_slice(body).expect("valid json");

        assert_eq!(
            doc,
            json!({
                "currentobservation": {"Temp": "54"},
                "data": {"temperature": ["61", "48"]}
            })
        );
    }

    #[test]
    fn filter_applies_to_each_array_element() {
        let filter = FieldFilter::default().allow("periods.name");
        let body = br#"{"periods": [{"name": "Tonight", "x": 1}, {"name": "Mon", "y": [1]}, 7]}"#;

        let doc = filter.decode_slice(body).unwrap();

        assert_eq!(doc, json!({"periods": [{"name": "Tonight"}, {"name": "Mon"}, null]}));
    }

    #[test]
    fn scalar_where_object_expected_is_dropped() {
        let doc = observation_filter()
            .decode_slice(br#"{"currentobservation": "NA", "data": {"temperature": [1]}}"#)
            .unwrap();
        assert_eq!(doc, json!({"data": {"temperature": [1]}}));
    }

    #[test]
    fn reader_and_slice_agree() {
        let body = br#"{"data": {"temperature": [72, 58], "iconLink": ["x"]}, "time": {}}"#;
        let filter = observation_filter();

        let from_reader = filter.decode_reader(&body[..]).unwrap();
        let from_slice = filter.decode_slice(body).unwrap();

        assert_eq!(from_reader, from_slice);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let filter = observation_filter();
        assert!(filter.decode_slice(br#"{"data": {"temperature": [72, "#).is_err());
        assert!(filter.decode_slice(b"<html>503 Service Unavailable</html>").is_err());
        assert!(filter.decode_reader(std::io::empty()).is_err());
    }

    #[test]
    fn malformed_json_inside_dropped_field_is_still_an_error() {
        let err = observation_filter()
            .decode_slice(br#"{"location": {"elevation": tru}, "data": {}}"#)
            .unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(observation_filter().decode_slice(br#"{"data": {}} {"#).is_err());
    }

    #[test]
    fn top_level_scalar_decodes_to_null() {
        assert_eq!(observation_filter().decode_slice(b"42").unwrap(), Value::Null);
    }
}
