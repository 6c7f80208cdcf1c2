//! # Message Envelopes
//!
//! The only two shapes that cross the channel: a [`Request`] and a
//! [`Response`]. Both are plain data. Incoming payloads are parsed into new
//! typed values; the untyped payload is never reinterpreted in place.
//!
//! ## Wire Shape
//!
//! ```text
//! Request  { id?: string, target: "filesystem"|"environment"|"view-command", command: string, parameters: any[] }
//! Response { id: string, result?: any, error?: string, errorCode?: integer }
//! ```
//!
//! ## Classification
//!
//! A payload carrying `command` is a Request. A payload carrying `result`
//! (any value, `null` and `false` included) or a non-null `error` is a
//! Response. Anything else is an anomaly.

use crate::correlation::CorrelationId;
use crate::errors::{json_type_name, EnvelopeError, ValidationIssue};
use crate::target::{Destination, Target};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Command name of the view's startup greeting.
pub const GREET_COMMAND: &str = "greet";

/// Command name of the host-pushed navigation command.
pub const NAVIGATE_TO_COMMAND: &str = "navigate-to";

/// An envelope parsed from an untyped payload, with the protocol deviations
/// that were tolerated while parsing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    /// The typed envelope.
    pub envelope: T,
    /// Deviations from the protocol that did not prevent parsing.
    pub issues: Vec<ValidationIssue>,
}

impl<T> Parsed<T> {
    /// Whether the payload matched the protocol exactly.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// A call the view wants the host to perform, or a command the host pushes
/// into the view.
///
/// Requests are never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    id: Option<CorrelationId>,
    destination: Destination,
    command: String,
    parameters: Vec<Value>,
}

impl Request {
    /// A call that expects a Response carrying `id`.
    pub fn call(
        id: CorrelationId,
        target: Target,
        command: impl Into<String>,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            id: Some(id),
            destination: Destination::Known(target),
            command: command.into(),
            parameters,
        }
    }

    /// A fire-and-forget command; no Response is expected.
    pub fn push(target: Target, command: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            id: None,
            destination: Destination::Known(target),
            command: command.into(),
            parameters,
        }
    }

    /// The greeting a view sends once it has finished bootstrapping.
    pub fn greet(message: impl Into<String>) -> Self {
        Self {
            id: None,
            destination: Destination::Unspecified,
            command: GREET_COMMAND.to_string(),
            parameters: vec![Value::String(message.into())],
        }
    }

    /// Correlation id, absent for pushes and greetings.
    pub fn id(&self) -> Option<&CorrelationId> {
        self.id.as_ref()
    }

    /// Where this Request is addressed.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Operation name.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Positional parameters.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Consume the Request, keeping only its parameters.
    pub fn into_parameters(self) -> Vec<Value> {
        self.parameters
    }

    /// Whether this is the view's startup greeting.
    pub fn is_greeting(&self) -> bool {
        self.command == GREET_COMMAND
    }

    /// Parse a Request from an untyped payload.
    ///
    /// Only a non-object payload or a missing command is fatal. Everything
    /// else is recorded as a [`ValidationIssue`] and logged.
    pub fn from_value(value: &Value) -> Result<Parsed<Request>, EnvelopeError> {
        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::NotAnObject(json_type_name(value)))?;

        let command = match object.get("command") {
            Some(Value::String(command)) if !command.is_empty() => command.clone(),
            _ => return Err(EnvelopeError::MissingCommand),
        };

        let mut issues = Vec::new();

        // Absence is legal for pushes and greetings; the host decides whether
        // a missing id matters.
        let id = parse_id(object.get("id"), &mut issues);

        let destination = match object.get("target") {
            None | Some(Value::Null) => {
                if command != GREET_COMMAND {
                    issues.push(ValidationIssue::MissingTarget);
                }
                Destination::Unspecified
            }
            Some(Value::String(name)) => match name.parse::<Target>() {
                Ok(target) => Destination::Known(target),
                Err(_) => {
                    issues.push(ValidationIssue::UnrecognizedTarget(name.clone()));
                    Destination::Unrecognized(name.clone())
                }
            },
            Some(other) => {
                let rendered = other.to_string();
                issues.push(ValidationIssue::UnrecognizedTarget(rendered.clone()));
                Destination::Unrecognized(rendered)
            }
        };

        let parameters = match object.get("parameters") {
            None | Some(Value::Null) => {
                issues.push(ValidationIssue::MissingParameters);
                Vec::new()
            }
            Some(Value::Array(parameters)) => parameters.clone(),
            Some(other) => return Err(EnvelopeError::ParametersNotArray(json_type_name(other))),
        };

        for issue in &issues {
            tracing::warn!(command = %command, issue = %issue, "Request validation");
        }

        Ok(Parsed {
            envelope: Request {
                id,
                destination,
                command,
                parameters,
            },
            issues,
        })
    }

    /// Render the wire form.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a CorrelationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    command: &'a str,
    parameters: &'a [Value],
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireRequest {
            id: self.id.as_ref(),
            target: self.destination.wire_name(),
            command: &self.command,
            parameters: &self.parameters,
        }
        .serialize(serializer)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// The outcome of executing a Request that expected a reply.
///
/// `result` tracks presence separately from value: `Some(Value::Null)` is a
/// present `null` result, `None` is unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: CorrelationId,
    result: Option<Value>,
    error: Option<String>,
    error_code: Option<i32>,
}

/// Failure side of a resolved Response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Human-readable description.
    pub message: String,
    /// Structured code from [`crate::codes`], when the sender gave one.
    pub code: Option<i32>,
}

/// How a Response resolves its call, after applying the precedence rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// `Ok` with the result, or `Err` with the error.
    pub outcome: Result<Value, RemoteError>,
    /// Set when the Response was in a degraded both-set or neither-set state.
    pub anomaly: Option<ValidationIssue>,
}

impl Response {
    /// Successful outcome.
    pub fn success(id: CorrelationId, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
            error_code: None,
        }
    }

    /// Successful outcome that also carries notes about tolerated protocol
    /// deviations in `error`. Receivers treat it as success.
    pub fn success_with_notes(id: CorrelationId, result: Value, notes: Option<String>) -> Self {
        Self {
            id,
            result: Some(result),
            error: notes,
            error_code: None,
        }
    }

    /// Failed outcome.
    pub fn failure(id: CorrelationId, error: impl Into<String>, code: i32) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
            error_code: Some(code),
        }
    }

    /// Correlation id of the Request this answers.
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Result, if set.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// Error message, if set.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Structured error code, if set.
    pub fn error_code(&self) -> Option<i32> {
        self.error_code
    }

    /// Whether the result is set (including a `null` result).
    pub fn has_result(&self) -> bool {
        self.result.is_some()
    }

    /// Resolve into a call outcome.
    ///
    /// - result set, error unset: success
    /// - result set, error set: success, flagged as an anomaly
    /// - only error set: failure with that error
    /// - neither set: failure, flagged as an anomaly
    pub fn into_resolution(self) -> Resolution {
        match (self.result, self.error) {
            (Some(result), None) => Resolution {
                outcome: Ok(result),
                anomaly: None,
            },
            (Some(result), Some(_)) => Resolution {
                outcome: Ok(result),
                anomaly: Some(ValidationIssue::BothResultAndError),
            },
            (None, Some(message)) => Resolution {
                outcome: Err(RemoteError {
                    message,
                    code: self.error_code,
                }),
                anomaly: None,
            },
            (None, None) => Resolution {
                outcome: Err(RemoteError {
                    message: "response carries neither result nor error".to_string(),
                    code: self.error_code,
                }),
                anomaly: Some(ValidationIssue::NeitherResultNorError),
            },
        }
    }

    /// Parse a Response from an untyped payload.
    pub fn from_value(value: &Value) -> Result<Parsed<Response>, EnvelopeError> {
        let object = value
            .as_object()
            .ok_or_else(|| EnvelopeError::NotAnObject(json_type_name(value)))?;

        let mut issues = Vec::new();

        let id = match parse_id(object.get("id"), &mut issues) {
            Some(id) => id,
            None => {
                if object.get("id").is_none() {
                    issues.push(ValidationIssue::MissingId);
                }
                CorrelationId::new("")
            }
        };

        // Key presence decides; a `null` result is still a result.
        let result = object.get("result").cloned();

        let error = match object.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(message.clone()),
            // Any other error value still rejects the call, rendered as JSON text.
            Some(other) => {
                issues.push(ValidationIssue::ErrorNotString(json_type_name(other)));
                Some(other.to_string())
            }
        };

        let error_code = match object.get("errorCode") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(code) => Some(code),
                None => {
                    issues.push(ValidationIssue::ErrorCodeNotInteger(n.to_string()));
                    None
                }
            },
            Some(other) => {
                issues.push(ValidationIssue::ErrorCodeNotInteger(json_type_name(other)));
                None
            }
        };

        match (&result, &error) {
            (None, None) => issues.push(ValidationIssue::NeitherResultNorError),
            (Some(_), Some(_)) => issues.push(ValidationIssue::BothResultAndError),
            _ => {}
        }

        for issue in &issues {
            tracing::warn!(correlation_id = %id, issue = %issue, "Response validation");
        }

        Ok(Parsed {
            envelope: Response {
                id,
                result,
                error,
                error_code,
            },
            issues,
        })
    }

    /// Render the wire form.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

#[derive(Serialize)]
struct WireResponse<'a> {
    id: &'a CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    error_code: Option<i32>,
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireResponse {
            id: &self.id,
            result: self.result.as_ref(),
            error: self.error.as_deref(),
            error_code: self.error_code,
        }
        .serialize(serializer)
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Either envelope, for code that sends both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(Request),
    Response(Response),
}

impl Envelope {
    /// Render the wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Envelope::Request(request) => request.to_value(),
            Envelope::Response(response) => response.to_value(),
        }
    }
}

impl From<Request> for Envelope {
    fn from(request: Request) -> Self {
        Envelope::Request(request)
    }
}

impl From<Response> for Envelope {
    fn from(response: Response) -> Self {
        Envelope::Response(response)
    }
}

/// What an untyped payload looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Carries `command` and nothing Response-like.
    Request,
    /// Carries `result` or a non-null `error`, and no `command`.
    Response,
    /// Carries both shapes.
    Ambiguous,
    /// Carries neither shape.
    Unclassifiable,
}

/// Classify a payload by its keys.
pub fn classify(value: &Value) -> Classification {
    let Some(object) = value.as_object() else {
        return Classification::Unclassifiable;
    };

    let is_request = matches!(object.get("command"), Some(v) if !v.is_null());
    let is_response = object.contains_key("result")
        || matches!(object.get("error"), Some(v) if !v.is_null());

    match (is_request, is_response) {
        (true, false) => Classification::Request,
        (false, true) => Classification::Response,
        (true, true) => Classification::Ambiguous,
        (false, false) => Classification::Unclassifiable,
    }
}

/// Best-effort correlation id of any payload: a non-empty string, or a
/// number rendered as its decimal string.
pub fn peek_id(value: &Value) -> Option<CorrelationId> {
    parse_id(value.get("id"), &mut Vec::new())
}

fn parse_id(raw: Option<&Value>, issues: &mut Vec<ValidationIssue>) -> Option<CorrelationId> {
    match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.is_empty() => Some(CorrelationId::new(id.clone())),
        Some(Value::String(_)) => {
            issues.push(ValidationIssue::MissingId);
            None
        }
        // Older views used numeric ids; keep them usable.
        Some(Value::Number(n)) => {
            issues.push(ValidationIssue::IdNotString("number".into()));
            Some(CorrelationId::new(n.to_string()))
        }
        Some(other) => {
            issues.push(ValidationIssue::IdNotString(json_type_name(other)));
            None
        }
    }
}
