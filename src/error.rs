// Error types shared by the API client, the config/token store and the
// OAuth flow. Commands wrap these in `anyhow` for context; the core never
// retries or swallows any of them.

use std::time::Duration;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the core can report to a command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The config file does not exist yet.
    #[error("config file not found, run 'basecamp init' to create one")]
    ConfigNotFound,

    /// The config file exists but is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No token has been stored.
    #[error("not authenticated, run 'basecamp auth' first")]
    NotAuthenticated,

    /// The stored token is past its expiry.
    #[error("token expired, run 'basecamp auth' to refresh")]
    TokenExpired,

    /// Connection, DNS, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("API error: {status}\n{body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, as sent by the server.
        body: String,
    },

    /// A 2xx response carried a body that is not the expected JSON.
    #[error("invalid JSON in response: {0}")]
    Parse(#[from] serde_json::Error),

    /// The authorization step failed (bind, missing code, provider error).
    #[error("authorization failed: {0}")]
    OAuth(String),

    /// No redirect arrived before the deadline.
    #[error("timeout waiting for authorization after {} seconds", .0.as_secs())]
    OAuthTimeout(Duration),

    /// The token endpoint rejected the code exchange.
    #[error("token exchange failed: {status}\n{body}")]
    TokenExchange {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// File system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// HTTP status carried by API or token-exchange errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::TokenExchange { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the error means the user has to run `basecamp auth` again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated | Error::TokenExpired | Error::Api { status: 401, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_keeps_status_and_body() {
        let err = Error::Api {
            status: 404,
            body: r#"{"error":"Not found"}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains(r#"{"error":"Not found"}"#));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn timeout_display_uses_seconds() {
        let err = Error::OAuthTimeout(Duration::from_secs(120));
        assert_eq!(
            err.to_string(),
            "timeout waiting for authorization after 120 seconds"
        );
    }

    #[test]
    fn auth_errors_need_reauth() {
        assert!(Error::NotAuthenticated.needs_reauth());
        assert!(Error::TokenExpired.needs_reauth());
        assert!(Error::Api { status: 401, body: String::new() }.needs_reauth());
        assert!(!Error::Api { status: 500, body: String::new() }.needs_reauth());
        assert!(!Error::ConfigNotFound.needs_reauth());
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io);
        assert!(err.to_string().contains("denied"));
    }
}
