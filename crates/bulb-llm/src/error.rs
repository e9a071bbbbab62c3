/// Errors that can occur when talking to the chat stream endpoint.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or expired credentials (no token configured, 401, 403).
    #[error("not signed in: {0}")]
    Unauthorized(String),

    /// HTTP 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// HTTP 402: the account has run out of credits.
    #[error("quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map a non-success HTTP status and its error message to a category.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Error::Unauthorized(message),
            402 => Error::QuotaExceeded(message),
            429 => Error::RateLimited(message),
            _ => Error::Api { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn status_codes_map_to_distinct_categories() {
        assert!(matches!(Error::from_status(429, "slow down"), Error::RateLimited(m) if m == "slow down"));
        assert!(matches!(Error::from_status(402, "pay up"), Error::QuotaExceeded(_)));
        assert!(matches!(Error::from_status(401, "who"), Error::Unauthorized(_)));
        assert!(matches!(Error::from_status(403, "no"), Error::Unauthorized(_)));
        assert!(matches!(
            Error::from_status(500, "boom"),
            Error::Api { status: 500, .. }
        ));
    }
}
