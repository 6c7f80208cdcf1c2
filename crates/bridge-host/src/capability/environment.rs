//! # Environment Capability
//!
//! Operations on the host's operating environment: naming it, opening a file
//! in an editor, running a shell command.

use async_trait::async_trait;
use bridge_types::capability::environment_commands as commands;
use bridge_types::capability::ShellOutput;
use bridge_types::Target;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use super::{bind, to_result, void, CapabilityError, CapabilityTable, RegistrationError};
use crate::config::EnvironmentConfig;

/// Environment operations reachable from the view.
#[async_trait]
pub trait EnvironmentAdapter: Send + Sync {
    /// Name of the environment the host runs in.
    fn environment_name(&self) -> String;

    /// Open `path` for the user. Returns once the opener is launched.
    async fn open_file(&self, path: &str) -> Result<(), CapabilityError>;

    /// Run `command` through the shell and capture its output.
    async fn run_shell_command(&self, command: &str) -> Result<ShellOutput, CapabilityError>;
}

/// Build the `environment` table on top of `adapter`.
pub fn environment_table(
    adapter: Arc<dyn EnvironmentAdapter>,
) -> Result<CapabilityTable, RegistrationError> {
    let table = CapabilityTable::builder(Target::Environment)
        .register(
            commands::GET_ENVIRONMENT_NAME,
            bind(&adapter, |env, _params| async move {
                to_result(env.environment_name())
            }),
        )?
        .register(
            commands::OPEN_FILE,
            bind(&adapter, |env, params| async move {
                params.expect_len(1)?;
                let path = params.string(0)?;
                env.open_file(&path).await?;
                Ok(void())
            }),
        )?
        .register(
            commands::RUN_SHELL_COMMAND,
            bind(&adapter, |env, params| async move {
                params.expect_len(1)?;
                let command = params.string(0)?;
                to_result(env.run_shell_command(&command).await?)
            }),
        )?
        .build();

    Ok(table)
}

/// Environment capability that launches local processes.
pub struct LocalEnvironment {
    config: EnvironmentConfig,
}

impl LocalEnvironment {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self { config }
    }

    /// Flag that makes the configured shell run a command string.
    fn shell_flag(&self) -> &'static str {
        let is_cmd = Path::new(&self.config.shell)
            .file_stem()
            .map(|stem| stem.eq_ignore_ascii_case("cmd"))
            .unwrap_or(false);
        if is_cmd {
            "/C"
        } else {
            "-c"
        }
    }
}

#[async_trait]
impl EnvironmentAdapter for LocalEnvironment {
    fn environment_name(&self) -> String {
        self.config.name.clone()
    }

    async fn open_file(&self, path: &str) -> Result<(), CapabilityError> {
        let child = Command::new(&self.config.editor)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CapabilityError::Failed(format!(
                    "failed to launch '{}' for '{}': {}",
                    self.config.editor, path, e
                ))
            })?;

        info!(editor = %self.config.editor, path = %path, pid = ?child.id(), "Opened file");
        Ok(())
    }

    async fn run_shell_command(&self, command: &str) -> Result<ShellOutput, CapabilityError> {
        debug!(shell = %self.config.shell, command = %command, "Running shell command");

        let output = Command::new(&self.config.shell)
            .arg(self.shell_flag())
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CapabilityError::Failed(format!(
                    "failed to run '{}' with '{}': {}",
                    command, self.config.shell, e
                ))
            })?;

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
