//! Commands the host can push into the view.
//!
//! A closed map from command name to a local handler. Handlers check the
//! shape of their parameters; a pushed command that does not fit is
//! rejected, logged by the dispatcher, and otherwise ignored.

use bridge_types::{json_type_name, NAVIGATE_TO_COMMAND};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure to register or run a pushed command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command name is empty")]
    EmptyName,

    #[error("command '{0}' is already registered")]
    Duplicate(String),

    #[error("no handler for command '{0}'")]
    Unknown(String),

    #[error("command '{command}' rejected its parameters: {reason}")]
    InvalidParameters { command: String, reason: String },
}

type Handler = Arc<dyn Fn(&[Value]) -> Result<(), String> + Send + Sync>;

/// Registry of handlers for host-pushed commands.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `command`.
    ///
    /// The handler validates its parameters and returns the reason when they
    /// do not fit.
    pub fn register<F>(&mut self, command: &str, handler: F) -> Result<(), CommandError>
    where
        F: Fn(&[Value]) -> Result<(), String> + Send + Sync + 'static,
    {
        if command.trim().is_empty() {
            return Err(CommandError::EmptyName);
        }
        if self.handlers.contains_key(command) {
            return Err(CommandError::Duplicate(command.to_string()));
        }
        self.handlers.insert(command.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Register the `navigate-to` handler. It receives the location path,
    /// the first parameter, which must be a string.
    pub fn on_navigate_to<F>(&mut self, navigate: F) -> Result<(), CommandError>
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.register(NAVIGATE_TO_COMMAND, move |parameters| {
            match parameters.first() {
                Some(Value::String(location)) => {
                    navigate(location.clone());
                    Ok(())
                }
                Some(other) => Err(format!(
                    "expected a string as first parameter, but is {}",
                    json_type_name(other)
                )),
                None => Err("expected at least one parameter".to_string()),
            }
        })
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    /// Run the handler for `command`.
    pub fn dispatch(&self, command: &str, parameters: &[Value]) -> Result<(), CommandError> {
        let handler = self
            .handlers
            .get(command)
            .ok_or_else(|| CommandError::Unknown(command.to_string()))?;

        handler(parameters).map_err(|reason| CommandError::InvalidParameters {
            command: command.to_string(),
            reason,
        })
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_navigate_to_receives_location() {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let mut registry = CommandRegistry::new();
        registry
            .on_navigate_to({
                let visited = visited.clone();
                move |location| visited.lock().unwrap().push(location)
            })
            .unwrap();

        registry.dispatch("navigate-to", &[json!("/x/y")]).unwrap();
        assert_eq!(*visited.lock().unwrap(), vec!["/x/y".to_string()]);
    }

    #[test]
    fn test_navigate_to_rejects_wrong_shape() {
        let mut registry = CommandRegistry::new();
        registry.on_navigate_to(|_| panic!("must not run")).unwrap();

        assert!(matches!(
            registry.dispatch("navigate-to", &[]),
            Err(CommandError::InvalidParameters { .. })
        ));
        assert!(matches!(
            registry.dispatch("navigate-to", &[json!(12)]),
            Err(CommandError::InvalidParameters { ref reason, .. }) if reason.contains("number")
        ));
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        assert_eq!(
            registry.dispatch("zoom", &[]),
            Err(CommandError::Unknown("zoom".into()))
        );
    }

    #[test]
    fn test_registration_checks() {
        let mut registry = CommandRegistry::new();
        assert_eq!(registry.register(" ", |_| Ok(())), Err(CommandError::EmptyName));
        registry.register("zoom", |_| Ok(())).unwrap();
        assert_eq!(
            registry.register("zoom", |_| Ok(())),
            Err(CommandError::Duplicate("zoom".into()))
        );
        assert_eq!(registry.commands(), vec!["zoom"]);
    }
}
