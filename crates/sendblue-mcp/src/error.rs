//! Error types for the Sendblue MCP server.
//!
//! There are three disjoint channels:
//! - [`ConfigError`]: fatal at startup, the server never begins serving.
//! - [`ValidationError`]: bad tool arguments, surfaced to the caller as a rejected invocation.
//! - [`GatewayError`]: anything between us and the Sendblue API, converted into an ordinary
//!   tool result by the tool functions.

use thiserror::Error;

/// Startup configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required credential is absent or empty.
    #[error("{0} is not set")]
    MissingCredential(&'static str),

    /// A base URL could not be parsed.
    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The outbound HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Tool argument validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Phone number '{0}' must be in E.164 format (e.g., +19998887777)")]
    InvalidPhoneNumber(String),

    #[error("Invalid send style '{value}'. Must be one of: {allowed}")]
    InvalidSendStyle { value: String, allowed: String },

    #[error("Group chats can have at most {max} participants (got {got})")]
    TooManyRecipients { max: usize, got: usize },

    #[error("Limit must be between {min} and {max} (got {got})")]
    LimitOutOfRange { min: i64, max: i64, got: i64 },

    #[error("Offset cannot be negative (got {0})")]
    NegativeOffset(i64),

    #[error("Either content or media_url must be provided")]
    MissingContent,

    #[error("Either to_numbers or group_id must be provided")]
    MissingAddressing,

    #[error("Missing required parameter: {0}")]
    MissingField(&'static str),

    /// The arguments object could not be decoded into the tool's parameter shape.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Failures between the gateway and the Sendblue API.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Non-2xx response.
    #[error("Sendblue API error: {status} - {detail}")]
    Http { status: u16, detail: String },

    /// Connection refused, timeout, DNS failure, undecodable body.
    #[error("Error communicating with Sendblue API: {0}")]
    Transport(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(crate::gateway::sanitize_reqwest_error(&value))
    }
}

/// Result type alias for tool-level operations that can only fail validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_embeds_status_and_detail() {
        let e = GatewayError::Http {
            status: 400,
            detail: "Invalid request".to_string(),
        };
        assert_eq!(e.to_string(), "Sendblue API error: 400 - Invalid request");
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let e = ConfigError::MissingCredential("SENDBLUE_API_KEY_ID");
        assert_eq!(e.to_string(), "SENDBLUE_API_KEY_ID is not set");
    }
}
