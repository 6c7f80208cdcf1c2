//! # Capabilities
//!
//! A capability is a named group of operations the view can reach only
//! through the broker. Each one is a [`CapabilityTable`]: a closed map from
//! command name to a typed async handler, checked when it is built.
//! Unknown commands are a lookup miss with a well-defined error, not a
//! reflection failure.

pub mod environment;
pub mod filesystem;

use bridge_types::{codes, json_type_name, Target};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::config::HostConfig;
use crate::notifier::SharedNotifier;

pub use environment::{environment_table, EnvironmentAdapter, LocalEnvironment};
pub use filesystem::{filesystem_table, FileSystemAdapter, LocalFileSystem};

/// Failure of a capability invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The target has no handler for this command.
    #[error("unknown command '{command}' for target '{target}'")]
    UnknownCommand { target: Target, command: String },

    /// The parameters do not fit the command.
    #[error("{0}")]
    InvalidParams(String),

    /// The operation itself failed.
    #[error("{0}")]
    Failed(String),
}

impl CapabilityError {
    /// Wire error code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            CapabilityError::UnknownCommand { .. } => codes::UNKNOWN_COMMAND,
            CapabilityError::InvalidParams(_) => codes::INVALID_PARAMS,
            CapabilityError::Failed(_) => codes::CAPABILITY_FAILED,
        }
    }
}

impl From<std::io::Error> for CapabilityError {
    fn from(err: std::io::Error) -> Self {
        CapabilityError::Failed(err.to_string())
    }
}

/// Rejected handler registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("command name for target '{0}' is empty")]
    EmptyCommand(Target),

    #[error("command '{command}' is registered twice for target '{target}'")]
    DuplicateCommand { target: Target, command: String },
}

/// Result of a handler.
pub type HandlerResult = Result<Value, CapabilityError>;

type Handler = Arc<dyn Fn(Parameters) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Value sent back for operations that return nothing.
///
/// "No result" must still serialize to something present, so void
/// operations answer with an empty object.
pub fn void() -> Value {
    Value::Object(Map::new())
}

/// Serialize an operation's return value.
pub fn to_result<T: Serialize>(value: T) -> HandlerResult {
    serde_json::to_value(value).map_err(|e| CapabilityError::Failed(e.to_string()))
}

/// Adapt an adapter method call into a handler that owns its adapter.
pub(crate) fn bind<A, F, Fut>(
    adapter: &Arc<A>,
    handler: F,
) -> impl Fn(Parameters) -> Fut + Send + Sync + 'static
where
    A: ?Sized + Send + Sync + 'static,
    F: Fn(Arc<A>, Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let adapter = Arc::clone(adapter);
    move |parameters| handler(Arc::clone(&adapter), parameters)
}

// =============================================================================
// PARAMETERS
// =============================================================================

/// Positional parameters of one invocation, with typed access.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    command: String,
    values: Vec<Value>,
}

impl Parameters {
    pub fn new(command: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            command: command.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fail unless exactly `expected` parameters were given.
    pub fn expect_len(&self, expected: usize) -> Result<(), CapabilityError> {
        if self.values.len() != expected {
            let noun = if expected == 1 { "parameter" } else { "parameters" };
            return Err(CapabilityError::InvalidParams(format!(
                "{}: expected exactly {} {}, but are {}",
                self.command,
                expected,
                noun,
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Required string parameter.
    pub fn string(&self, index: usize) -> Result<String, CapabilityError> {
        match self.values.get(index) {
            Some(Value::String(value)) => Ok(value.clone()),
            Some(other) => Err(CapabilityError::InvalidParams(format!(
                "{}: expected a string as parameter {}, but is {}",
                self.command,
                index,
                json_type_name(other)
            ))),
            None => Err(self.missing(index)),
        }
    }

    /// Required parameter of any deserializable type.
    pub fn value<T: DeserializeOwned>(&self, index: usize) -> Result<T, CapabilityError> {
        let raw = self.values.get(index).ok_or_else(|| self.missing(index))?;
        self.decode(index, raw)
    }

    /// Optional parameter; absent and `null` both give `None`.
    pub fn optional<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, CapabilityError> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => self.decode(index, raw).map(Some),
        }
    }

    fn decode<T: DeserializeOwned>(&self, index: usize, raw: &Value) -> Result<T, CapabilityError> {
        serde_json::from_value(raw.clone()).map_err(|e| {
            CapabilityError::InvalidParams(format!(
                "{}: parameter {} is invalid: {}",
                self.command, index, e
            ))
        })
    }

    fn missing(&self, index: usize) -> CapabilityError {
        CapabilityError::InvalidParams(format!(
            "{}: missing parameter {}, got {} parameter(s)",
            self.command,
            index,
            self.values.len()
        ))
    }
}

// =============================================================================
// TABLE
// =============================================================================

/// Closed map from command name to handler for one target.
#[derive(Clone)]
pub struct CapabilityTable {
    target: Target,
    handlers: HashMap<String, Handler>,
}

impl std::fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("target", &self.target)
            .field("commands", &self.commands())
            .finish()
    }
}

impl CapabilityTable {
    /// Start building a table for `target`.
    pub fn builder(target: Target) -> CapabilityTableBuilder {
        CapabilityTableBuilder {
            target,
            handlers: HashMap::new(),
        }
    }

    /// Target this table serves.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Run `command` with `parameters`.
    pub async fn invoke(&self, command: &str, parameters: Vec<Value>) -> HandlerResult {
        let handler = self
            .handlers
            .get(command)
            .cloned()
            .ok_or_else(|| CapabilityError::UnknownCommand {
                target: self.target,
                command: command.to_string(),
            })?;

        handler(Parameters::new(command, parameters)).await
    }
}

/// Builder that validates registrations.
pub struct CapabilityTableBuilder {
    target: Target,
    handlers: HashMap<String, Handler>,
}

impl CapabilityTableBuilder {
    /// Register `handler` under `command`.
    ///
    /// Fails on an empty name or a name that is already taken.
    pub fn register<F, Fut>(mut self, command: &str, handler: F) -> Result<Self, RegistrationError>
    where
        F: Fn(Parameters) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        if command.trim().is_empty() {
            return Err(RegistrationError::EmptyCommand(self.target));
        }
        if self.handlers.contains_key(command) {
            return Err(RegistrationError::DuplicateCommand {
                target: self.target,
                command: command.to_string(),
            });
        }

        let handler: Handler =
            Arc::new(move |parameters| -> BoxFuture<'static, HandlerResult> {
                Box::pin(handler(parameters))
            });
        self.handlers.insert(command.to_string(), handler);
        Ok(self)
    }

    pub fn build(self) -> CapabilityTable {
        CapabilityTable {
            target: self.target,
            handlers: self.handlers,
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// The capability tables one broker routes to, keyed by target.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRouter {
    tables: HashMap<Target, Arc<CapabilityTable>>,
}

impl CapabilityRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table for the same target.
    pub fn with(mut self, table: CapabilityTable) -> Self {
        self.tables.insert(table.target(), Arc::new(table));
        self
    }

    /// Table for `target`, if one is routed.
    pub fn get(&self, target: Target) -> Option<Arc<CapabilityTable>> {
        self.tables.get(&target).cloned()
    }

    /// Local filesystem and environment capabilities from configuration.
    pub fn local(config: &HostConfig, notifier: SharedNotifier) -> Result<Self, RegistrationError> {
        let filesystem = LocalFileSystem::new(config.filesystem.clone(), notifier);
        let environment = LocalEnvironment::new(config.environment.clone());

        Ok(Self::new()
            .with(filesystem_table(Arc::new(filesystem))?)
            .with(environment_table(Arc::new(environment))?))
    }
}
