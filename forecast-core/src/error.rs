use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a [`Transport`](crate::Transport) before any body is read.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying client could not be constructed.
    #[error("Failed to build HTTP client")]
    Client(#[source] BoxError),

    /// DNS, connect, TLS handshake or request write failed.
    #[error("GET request failed")]
    Request {
        url: String,
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    pub fn request(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        TransportError::Request { url: url.into(), source: source.into() }
    }
}

/// Why a call to [`ForecastClient::download_new_data`](crate::ForecastClient::download_new_data)
/// did not produce fresh data.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Transport failure")]
    Transport(#[from] TransportError),

    /// The body was malformed, truncated or empty.
    #[error("Failed to decode forecast JSON")]
    Decode(#[from] serde_json::Error),
}

/// An error and its sources on one line, outermost first.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
