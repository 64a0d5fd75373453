/// Configures the bundled reqwest transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Base URL that relative request URLs (`/path`) are resolved against.
    pub base_url: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            base_url: None,
        }
    }
}

impl ClientOptions {
    /// Sets the base URL for relative request URLs.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Resolves `url` against [`ClientOptions::base_url`].
    ///
    /// Absolute URLs and URLs without a configured base are returned as is.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if !url.contains("://") => {
                let base = base.trim_end_matches('/');
                let path = url.trim_start_matches('/');
                format!("{base}/{path}")
            }
            _ => url.to_owned(),
        }
    }
}
