//! # Error Types
//!
//! Errors raised while parsing envelopes, plus the structured error codes a
//! Response may carry next to its human-readable `error` string.

use thiserror::Error;

/// Error codes carried in `Response::error_code`.
pub mod codes {
    /// The Request itself was malformed (missing id, bad shape).
    pub const PROTOCOL_ERROR: i32 = -32600;
    /// The Request named a target the receiver does not serve.
    pub const UNSUPPORTED_TARGET: i32 = -32004;
    /// The target has no operation with the requested name.
    pub const UNKNOWN_COMMAND: i32 = -32601;
    /// The positional parameters did not match the operation.
    pub const INVALID_PARAMS: i32 = -32602;
    /// The operation ran and failed.
    pub const CAPABILITY_FAILED: i32 = -32000;
}

/// A payload could not be turned into an envelope at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The payload is not a JSON object.
    #[error("payload is not an object: {0}")]
    NotAnObject(String),

    /// The payload has no usable `command`.
    #[error("request command is missing or not a non-empty string")]
    MissingCommand,

    /// `parameters` is present but not an array.
    #[error("request parameters must be an array, got {0}")]
    ParametersNotArray(String),
}

/// Something about an accepted envelope that does not match the protocol.
///
/// Issues are logged and processing continues with best-effort defaults, so
/// protocol drift stays visible without crashing either side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("target is not set")]
    MissingTarget,

    #[error("expected target to be one of [filesystem, environment, view-command] but is '{0}'")]
    UnrecognizedTarget(String),

    #[error("parameters is not set")]
    MissingParameters,

    #[error("message has no id")]
    MissingId,

    #[error("id must be a string, got {0}")]
    IdNotString(String),

    #[error("neither result nor error is set")]
    NeitherResultNorError,

    #[error("both result and error are set")]
    BothResultAndError,

    #[error("response error must be a string, got {0}")]
    ErrorNotString(String),

    #[error("response errorCode must be a 32-bit integer, got {0}")]
    ErrorCodeNotInteger(String),
}

/// Render a JSON value's type for error messages.
pub fn json_type_name(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_messages() {
        assert_eq!(ValidationIssue::MissingId.to_string(), "message has no id");
        assert!(ValidationIssue::UnrecognizedTarget("x".into())
            .to_string()
            .contains("'x'"));
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&serde_json::json!(false)), "boolean");
        assert_eq!(json_type_name(&serde_json::json!([])), "array");
    }
}
