use solana_client::client_error::ClientError;
use thiserror::Error;

/// Ledger RPC error types
#[derive(Debug, Clone, Error)]
pub enum RpcManagerError {
    /// Transport-level errors (network, connection)
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport {
        endpoint: String,
        message: String,
    },

    /// Timeout errors
    #[error("Request timed out (endpoint: {endpoint})")]
    Timeout { endpoint: String },

    /// RPC response errors (from the RPC server)
    #[error("RPC response error: {message} (endpoint: {endpoint}, code: {code:?})")]
    RpcResponse {
        endpoint: String,
        message: String,
        code: Option<i64>,
    },

    /// Rate limit exceeded (HTTP 429 and friends)
    #[error("Rate limit exceeded (endpoint: {endpoint})")]
    RateLimitExceeded {
        endpoint: String,
    },

    /// Response body could not be decoded
    #[error("Malformed response from {endpoint}: {message}")]
    Decode {
        endpoint: String,
        message: String,
    },
}

impl RpcManagerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcManagerError::Transport { .. } => true,
            RpcManagerError::Timeout { .. } => true,
            RpcManagerError::RateLimitExceeded { .. } => true,
            RpcManagerError::Decode { .. } => false,

            // Retry on server errors (5xx)
            RpcManagerError::RpcResponse { code, .. } => {
                matches!(code, Some(c) if *c >= 500 && *c < 600)
            }
        }
    }

    /// Rate-limited responses are "unknown", never a hard answer
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RpcManagerError::RateLimitExceeded { .. })
    }

    /// Create from ClientError with context
    pub fn from_client_error(err: ClientError, endpoint: &str) -> Self {
        Self::from_message(&err.to_string(), endpoint)
    }

    /// Classify a free-text failure from any RPC transport
    pub fn from_message(message: &str, endpoint: &str) -> Self {
        let err_str = message.to_lowercase();

        if err_str.contains("rate limit")
            || err_str.contains("too many requests")
            || err_str.contains("429")
        {
            RpcManagerError::RateLimitExceeded {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("timeout") || err_str.contains("timed out") {
            RpcManagerError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err_str.contains("connection")
            || err_str.contains("dns error")
            || err_str.contains("error sending request")
        {
            RpcManagerError::Transport {
                endpoint: endpoint.to_string(),
                message: message.to_string(),
            }
        } else {
            // Extract error code if available
            let code = err_str
                .split("code:")
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.trim_end_matches(|c: char| !c.is_ascii_digit()).parse::<i64>().ok());

            RpcManagerError::RpcResponse {
                endpoint: endpoint.to_string(),
                message: message.to_string(),
                code,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(RpcManagerError::Transport {
            endpoint: "test".to_string(),
            message: "connection failed".to_string(),
        }
        .is_retryable());

        assert!(RpcManagerError::Timeout {
            endpoint: "test".to_string(),
        }
        .is_retryable());

        assert!(!RpcManagerError::Decode {
            endpoint: "test".to_string(),
            message: "bad base64".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn test_rate_limit_classification() {
        for text in [
            "HTTP status client error (429 Too Many Requests) for url (https://api.devnet.solana.com/)",
            "Rate limit exceeded",
            "too many requests for a specific RPC call",
        ] {
            let err = RpcManagerError::from_message(text, "https://rpc");
            assert!(err.is_rate_limited(), "not rate limited: {}", text);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_response_code_extraction() {
        let err = RpcManagerError::from_message("RPC failure code: 503, service unavailable", "e");
        match err {
            RpcManagerError::RpcResponse { code, .. } => assert_eq!(code, Some(503)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(RpcManagerError::from_message("code: 503", "e").is_retryable());
        assert!(!RpcManagerError::from_message("invalid param", "e").is_retryable());
    }

    #[test]
    fn test_transport_and_timeout_classification() {
        let err = RpcManagerError::from_message("error sending request: connection refused", "e");
        assert!(matches!(err, RpcManagerError::Transport { .. }));
        let err = RpcManagerError::from_message("operation timed out", "e");
        assert!(matches!(err, RpcManagerError::Timeout { .. }));
        assert!(err.is_retryable());

        // reqwest send failures carry only the url in their display text
        let err = RpcManagerError::from_message(
            "error sending request for url (http://127.0.0.1:8899/)",
            "e",
        );
        assert!(matches!(err, RpcManagerError::Transport { .. }));
        assert!(err.is_retryable());
    }
}
