// ABOUTME: Error types for the deployment provider abstraction.
// ABOUTME: Client errors (4xx) are fatal; server and network errors may retry.

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("provider API client error {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("provider API server error {status}")]
    ServerError { status: u16 },

    #[error("provider API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::MissingEnvVar(_) | ProviderError::ClientError { .. } => false,
            ProviderError::ServerError { .. } | ProviderError::Request(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_never_retry() {
        let err = ProviderError::ClientError {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_retry() {
        assert!(ProviderError::ServerError { status: 502 }.is_retryable());
    }

    #[test]
    fn missing_env_is_fatal() {
        assert!(!ProviderError::MissingEnvVar("VERCEL_TOKEN".into()).is_retryable());
    }
}
