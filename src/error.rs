/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum AuthInterceptorError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code that was not intercepted, with raw body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Buffered request rejected by a cancelled login.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// A head retry was requested while nothing was buffered.
    #[error("request buffer is empty")]
    EmptyBuffer,
    /// A replay task was cancelled before it finished, e.g. at runtime shutdown.
    #[error("replay cancelled")]
    Cancelled,
    /// Request descriptor could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Response body decoding error.
    #[error("decode error: {0}")]
    Decode(String),
}
