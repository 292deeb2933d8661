use thiserror::Error;

/// Failure of a single upstream call
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, timeout or body read failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("api responded with non 200 status code: {status}")]
    Status { status: u16 },

    #[error("malformed response payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("response is missing {0}")]
    Incomplete(&'static str),

    /// The api answered with `success: false`
    #[error("api responded with bad status{}", .cause.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
    Rejected { cause: Option<String> },
}

impl FetchError {
    /// Transport and HTTP status failures are expected to clear up on their own.
    /// Everything else means upstream sent something we cannot use.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(FetchError::Status { status: 503 }.is_transient());
        assert!(!FetchError::Rejected { cause: None }.is_transient());
        assert!(!FetchError::Incomplete("product_info").is_transient());

        let payload = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!FetchError::from(payload).is_transient());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            FetchError::Status { status: 429 }.to_string(),
            "api responded with non 200 status code: 429"
        );
        assert_eq!(
            FetchError::Rejected { cause: Some("Invalid API key".to_string()) }.to_string(),
            "api responded with bad status: Invalid API key"
        );
        assert_eq!(
            FetchError::Rejected { cause: None }.to_string(),
            "api responded with bad status"
        );
    }
}
