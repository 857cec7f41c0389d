use std::{fmt::Debug, io::Read, time::Duration};

use reqwest::blocking::{Client, Response};

use crate::error::TransportError;

/// User agent sent with every request. api.weather.gov and its siblings
/// refuse requests without one.
pub const USER_AGENT: &str = concat!("forecast-core/", env!("CARGO_PKG_VERSION"));

/// Default request timeout for [`ReqwestTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single-session HTTP GET capability.
///
/// One request is in flight at a time. `get` opens a session, the remaining
/// methods inspect it, and `stop` tears it down. Calling `stop` without an
/// open session must be harmless.
pub trait Transport: Debug {
    /// Issue `GET https://{host}:{port}{path}`.
    ///
    /// An `Err` means no HTTP response was received at all.
    fn get(&mut self, host: &str, port: u16, path: &str) -> Result<(), TransportError>;

    /// HTTP status of the open session.
    fn status_code(&self) -> Option<u16>;

    /// Whether the open session has body bytes to read.
    fn available(&self) -> bool;

    /// Declared body length, if the server sent one.
    fn content_length(&self) -> Option<u64>;

    /// Body of the open session as a byte stream.
    fn body(&mut self) -> Option<&mut dyn Read>;

    /// Close the session.
    fn stop(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&mut self, host: &str, port: u16, path: &str) -> Result<(), TransportError> {
        (**self).get(host, port, path)
    }

    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn available(&self) -> bool {
        (**self).available()
    }

    fn content_length(&self) -> Option<u64> {
        (**self).content_length()
    }

    fn body(&mut self) -> Option<&mut dyn Read> {
        (**self).body()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}

/// Blocking HTTPS transport backed by `reqwest`.
#[derive(Debug)]
pub struct ReqwestTransport {
    http: Client,
    /// Replaces `https://{host}:{port}` when set.
    base: Option<String>,
    response: Option<Response>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::build(timeout, None)
    }

    /// Send every request to `base` (e.g. `http://127.0.0.1:8080`) instead of
    /// the host and port passed to `get`. System proxies are not used.
    pub fn with_base(
        base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Self::build(timeout, Some(base.into()))
    }

    fn build(timeout: Duration, base: Option<String>) -> Result<Self, TransportError> {
        let mut builder = Client::builder().user_agent(USER_AGENT).timeout(timeout);
        if base.is_some() {
            builder = builder.no_proxy();
        }
        let http = builder.build().map_err(|e| TransportError::Client(Box::new(e)))?;

        Ok(Self { http, base, response: None })
    }
}

impl Transport for ReqwestTransport {
    fn get(&mut self, host: &str, port: u16, path: &str) -> Result<(), TransportError> {
        let url = match &self.base {
            Some(base) => format!("{base}{path}"),
            None => format!("https://{host}:{port}{path}"),
        };

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| TransportError::request(url.as_str(), e))?;

        self.response = Some(response);
        Ok(())
    }

    fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status().as_u16())
    }

    fn available(&self) -> bool {
        self.response.as_ref().is_some_and(|r| r.content_length() != Some(0))
    }

    fn content_length(&self) -> Option<u64> {
        self.response.as_ref().and_then(Response::content_length)
    }

    fn body(&mut self) -> Option<&mut dyn Read> {
        self.response.as_mut().map(|r| r as &mut dyn Read)
    }

    fn stop(&mut self) {
        self.response = None;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    use super::*;
    use crate::ForecastClient;

    /// Accept one connection on loopback, answer it with `status` and
    /// `body`, and hand back the request head the client sent.
    fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).expect("read request") == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            stream.write_all(response.as_bytes()).expect("write response");
            head
        });

        (base, handle)
    }

    const FORECAST: &str =
        r#"{"time":{"tempLabel":["High","Low"]},"data":{"temperature":["70","55"],"text":["x"]}}"#;

    #[test]
    fn fresh_transport_has_no_session() {
        let mut t = ReqwestTransport::new().expect("client should build");

        assert_eq!(t.status_code(), None);
        assert!(!t.available());
        assert_eq!(t.content_length(), None);
        assert!(t.body().is_none());

        t.stop();
        t.stop();
    }

    #[test]
    fn connection_refused_is_a_transport_error() {
        let mut t = ReqwestTransport::with_timeout(Duration::from_secs(5)).unwrap();

        // Port 1 on loopback has nothing listening.
        let err = t.get("127.0.0.1", 1, "/MapClick.php").unwrap_err();

        match err {
            TransportError::Request { url, .. } => {
                assert_eq!(url, "https://127.0.0.1:1/MapClick.php")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(t.body().is_none());
    }

    #[test]
    fn served_response_is_exposed_then_closed() {
        let (base, server) = serve_once("200 OK", FORECAST);
        let mut t = ReqwestTransport::with_base(base, Duration::from_secs(5)).unwrap();

        t.get("ignored.example", 443, "/MapClick.php?lat=1&lon=2").expect("server is up");

        assert_eq!(t.status_code(), Some(200));
        assert!(t.available());
        assert_eq!(t.content_length(), Some(FORECAST.len() as u64));

        let mut body = String::new();
        t.body().expect("open session").read_to_string(&mut body).unwrap();
        assert_eq!(body, FORECAST);

        t.stop();
        assert_eq!(t.status_code(), None);
        assert!(t.body().is_none());

        let head = server.join().unwrap();
        assert!(head.starts_with("GET /MapClick.php?lat=1&lon=2 HTTP/1.1\r\n"), "{head}");
        assert!(
            head.to_lowercase().contains(&format!("user-agent: {USER_AGENT}\r\n")),
            "{head}"
        );
    }

    #[test]
    fn error_status_is_reported_not_raised() {
        let (base, server) = serve_once("503 Service Unavailable", "{}");
        let mut t = ReqwestTransport::with_base(base, Duration::from_secs(5)).unwrap();

        t.get("ignored.example", 443, "/").expect("an HTTP error is still a response");
        assert_eq!(t.status_code(), Some(503));

        t.stop();
        server.join().unwrap();
    }

    #[test]
    fn forecast_client_decodes_over_http() {
        let (base, server) = serve_once("200 OK", FORECAST);
        let transport = ReqwestTransport::with_base(base, Duration::from_secs(5)).unwrap();
        let mut client = ForecastClient::new(transport, "39.7456", "97.0892");

        client.download_new_data().expect("download should succeed");

        assert!(client.has_valid_data());
        assert_eq!(client.todays_high_temperature(), Some(70.0));
        assert_eq!(client.tonights_low_temperature(), Some(55.0));
        assert!(client.document().pointer("/data/text").is_none());
        assert_eq!(client.transport().status_code(), None);

        let head = server.join().unwrap();
        assert!(head.starts_with(&format!("GET {} HTTP/1.1", client.request_path())), "{head}");
    }

    #[test]
    fn user_agent_names_the_crate() {
        assert!(USER_AGENT.starts_with("forecast-core/"));
    }
}
