// ABOUTME: Error types shared by the backend client, pollers, and actions
// ABOUTME: Variants carry enough context for a user-visible message and a retry path

use std::fmt;

#[derive(Debug, Clone)]
pub enum ConsoleError {
    /// Transport failure before any HTTP status was received.
    Connection(String),
    /// Backend answered with a non-2xx status; `body` is the parsed response.
    Http {
        status: u16,
        body: serde_json::Value,
    },
    /// A 2xx body that could not be decoded into the expected shape.
    Decode(String),
    /// Caught before anything is sent to the backend.
    Validation(String),
    NotFound(String),
    /// The same workflow action is already running.
    ActionInFlight(&'static str),
    /// Backend accepted the export call but reported it did not succeed.
    Export(String),
    Config(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

impl ConsoleError {
    /// Backend-provided `detail` or `message` field, if the error body has one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ConsoleError::Http { body, .. } => body
                .get("detail")
                .or_else(|| body.get("message"))
                .and_then(|v| v.as_str())
                .or_else(|| body.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConsoleError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ConsoleError::Http { status, body } => match self.backend_message() {
                Some(msg) => write!(f, "Backend error {}: {}", status, msg),
                None => write!(f, "Backend error {}: {}", status, body),
            },
            ConsoleError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ConsoleError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ConsoleError::NotFound(what) => write!(f, "Not found: {}", what),
            ConsoleError::ActionInFlight(action) => {
                write!(f, "{} is already in progress", action)
            }
            ConsoleError::Export(msg) => write!(f, "Export failed: {}", msg),
            ConsoleError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ConsoleError {}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Decode(err.to_string())
        } else {
            ConsoleError::Connection(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_error_prefers_backend_detail() {
        let err = ConsoleError::Http {
            status: 422,
            body: json!({"detail": "Domain weights must sum to 100"}),
        };
        assert_eq!(
            err.to_string(),
            "Backend error 422: Domain weights must sum to 100"
        );
    }

    #[test]
    fn test_http_error_falls_back_to_raw_body() {
        let err = ConsoleError::Http {
            status: 500,
            body: json!({"code": 7}),
        };
        assert_eq!(err.backend_message(), None);
        assert_eq!(err.to_string(), r#"Backend error 500: {"code":7}"#);
    }

    #[test]
    fn test_plain_text_body() {
        let err = ConsoleError::Http {
            status: 502,
            body: json!("Bad Gateway"),
        };
        assert_eq!(err.backend_message(), Some("Bad Gateway"));
    }
}
