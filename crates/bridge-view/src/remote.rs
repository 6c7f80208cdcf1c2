//! Typed proxies for the host's capabilities.
//!
//! Each method issues one call through the dispatcher and decodes the
//! result into the shared data types.

use bridge_types::capability::environment_commands as env_commands;
use bridge_types::capability::filesystem_commands as fs_commands;
use bridge_types::capability::{
    Dirent, DirentStats, OpenDialogOptions, OpenDialogReturnValue, ShellOutput, SymlinkType,
    WriteFileOptions,
};
use bridge_types::Target;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::dispatcher::ViewDispatcher;
use crate::error::CallError;

async fn call_as<T: DeserializeOwned>(
    dispatcher: &ViewDispatcher,
    target: Target,
    command: &str,
    parameters: Vec<Value>,
) -> Result<T, CallError> {
    let result = dispatcher.call(target, command, parameters).await?;
    serde_json::from_value(result).map_err(|err| CallError::Decode(format!("{}: {}", command, err)))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, CallError> {
    serde_json::to_value(value).map_err(|err| CallError::Decode(err.to_string()))
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

/// The host's `filesystem` target.
#[derive(Debug, Clone)]
pub struct RemoteFileSystem {
    dispatcher: ViewDispatcher,
}

impl RemoteFileSystem {
    pub fn new(dispatcher: ViewDispatcher) -> Self {
        Self { dispatcher }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        command: &str,
        parameters: Vec<Value>,
    ) -> Result<T, CallError> {
        call_as(&self.dispatcher, Target::FileSystem, command, parameters).await
    }

    /// Calls that return nothing still get a Response; its result is ignored.
    async fn call_void(&self, command: &str, parameters: Vec<Value>) -> Result<(), CallError> {
        self.dispatcher
            .call(Target::FileSystem, command, parameters)
            .await
            .map(|_| ())
    }

    pub async fn does_dirent_exist(&self, path: &str) -> Result<bool, CallError> {
        self.call(fs_commands::DOES_DIRENT_EXIST, vec![text(path)]).await
    }

    pub async fn does_dirent_exist_and_is_file(&self, path: &str) -> Result<bool, CallError> {
        self.call(fs_commands::DOES_DIRENT_EXIST_AND_IS_FILE, vec![text(path)])
            .await
    }

    pub async fn get_dirent_stats_if_exists(
        &self,
        path: &str,
    ) -> Result<Option<DirentStats>, CallError> {
        self.call(fs_commands::GET_DIRENT_STATS_IF_EXISTS, vec![text(path)])
            .await
    }

    pub async fn get_dirent_stats_or_throw(&self, path: &str) -> Result<DirentStats, CallError> {
        self.call(fs_commands::GET_DIRENT_STATS_OR_THROW, vec![text(path)])
            .await
    }

    pub async fn readdir(&self, path: &str) -> Result<Vec<Dirent>, CallError> {
        self.call(fs_commands::READDIR, vec![text(path)]).await
    }

    pub async fn read_file(&self, path: &str) -> Result<String, CallError> {
        self.call(fs_commands::READ_FILE, vec![text(path)]).await
    }

    pub async fn write_file(
        &self,
        path: &str,
        data: &str,
        options: Option<WriteFileOptions>,
    ) -> Result<(), CallError> {
        let mut parameters = vec![text(path), text(data)];
        if let Some(options) = options {
            parameters.push(encode(&options)?);
        }
        self.call_void(fs_commands::WRITE_FILE, parameters).await
    }

    pub async fn make_folder(&self, path: &str) -> Result<(), CallError> {
        self.call_void(fs_commands::MAKE_FOLDER, vec![text(path)]).await
    }

    pub async fn symlink(
        &self,
        existing_path: &str,
        new_path: &str,
        kind: Option<SymlinkType>,
    ) -> Result<(), CallError> {
        let mut parameters = vec![text(existing_path), text(new_path)];
        if let Some(kind) = kind {
            parameters.push(encode(&kind)?);
        }
        self.call_void(fs_commands::SYMLINK, parameters).await
    }

    pub async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), CallError> {
        self.call_void(fs_commands::RENAME, vec![text(old_path), text(new_path)])
            .await
    }

    pub async fn show_open_dialog(
        &self,
        options: &OpenDialogOptions,
    ) -> Result<OpenDialogReturnValue, CallError> {
        self.call(fs_commands::SHOW_OPEN_DIALOG, vec![encode(options)?])
            .await
    }

    pub async fn get_workspace_folder_path(&self) -> Result<String, CallError> {
        self.call(fs_commands::GET_WORKSPACE_FOLDER_PATH, vec![]).await
    }
}

/// The host's `environment` target.
#[derive(Debug, Clone)]
pub struct RemoteEnvironment {
    dispatcher: ViewDispatcher,
}

impl RemoteEnvironment {
    pub fn new(dispatcher: ViewDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn get_environment_name(&self) -> Result<String, CallError> {
        call_as(
            &self.dispatcher,
            Target::Environment,
            env_commands::GET_ENVIRONMENT_NAME,
            vec![],
        )
        .await
    }

    pub async fn open_file(&self, path: &str) -> Result<(), CallError> {
        self.dispatcher
            .call(Target::Environment, env_commands::OPEN_FILE, vec![text(path)])
            .await
            .map(|_| ())
    }

    pub async fn run_shell_command(&self, command: &str) -> Result<ShellOutput, CallError> {
        call_as(
            &self.dispatcher,
            Target::Environment,
            env_commands::RUN_SHELL_COMMAND,
            vec![text(command)],
        )
        .await
    }
}
