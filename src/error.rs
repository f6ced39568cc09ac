use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Missing configuration value: {0}")]
    MissingConfiguration(String),

    #[error("Invalid reference date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Data feed '{feed}' failed: {details}")]
    DataFetch { feed: String, details: String },

    #[error("Exchange rate fetch failed for {currency}: {details}")]
    RateLookup { currency: String, details: String },

    #[error("Commentary service error: {0}")]
    Commentary(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Chart rendering failed for '{chart}': {details}")]
    Chart { chart: String, details: String },

    #[error("Publishing to {target} failed: {details}")]
    Publishing { target: String, details: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "reporting")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReportError {
    /// Transient errors worth another attempt; everything else fails fast.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::RateLimited { .. } => true,
            ReportError::Api { status, .. } => (500..=599).contains(status) || *status == 429,
            #[cfg(feature = "reporting")]
            ReportError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ReportError::RateLimited {
            retry_after_secs: 30
        }
        .is_retryable());
        assert!(ReportError::Api {
            status: 503,
            message: "overloaded".to_string()
        }
        .is_retryable());
        assert!(ReportError::Api {
            status: 429,
            message: "throttled".to_string()
        }
        .is_retryable());
        assert!(!ReportError::Api {
            status: 400,
            message: "bad request".to_string()
        }
        .is_retryable());
        assert!(!ReportError::MissingConfiguration("SLACK_TOKEN".to_string()).is_retryable());
    }
}
