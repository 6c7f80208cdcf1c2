//! # Capability Data
//!
//! Command names and the plain-data shapes exchanged with the filesystem and
//! environment capabilities. Host handlers produce these values and view
//! proxies decode them, so both sides agree on one definition.

use serde::{Deserialize, Serialize};

/// Command names served by the `filesystem` target.
pub mod filesystem_commands {
    pub const DOES_DIRENT_EXIST: &str = "doesDirentExist";
    pub const DOES_DIRENT_EXIST_AND_IS_FILE: &str = "doesDirentExistAndIsFile";
    pub const GET_DIRENT_STATS_IF_EXISTS: &str = "getDirentStatsIfExists";
    pub const GET_DIRENT_STATS_OR_THROW: &str = "getDirentStatsOrThrow";
    pub const READDIR: &str = "readdir";
    pub const READ_FILE: &str = "readFile";
    pub const WRITE_FILE: &str = "writeFile";
    pub const MAKE_FOLDER: &str = "makeFolder";
    pub const SYMLINK: &str = "symlink";
    pub const RENAME: &str = "rename";
    pub const SHOW_OPEN_DIALOG: &str = "showOpenDialog";
    pub const GET_WORKSPACE_FOLDER_PATH: &str = "getWorkspaceFolderPath";
}

/// Command names served by the `environment` target.
pub mod environment_commands {
    pub const GET_ENVIRONMENT_NAME: &str = "getEnvironmentName";
    pub const OPEN_FILE: &str = "openFile";
    pub const RUN_SHELL_COMMAND: &str = "runShellCommand";
}

/// What a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirentKind {
    Directory,
    File,
    /// A kind this side does not know about.
    #[serde(other)]
    Unknown,
}

/// Stats of a directory entry, reduced to what survives serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirentStats {
    pub kind: DirentKind,
    #[serde(default)]
    pub size: u64,
}

impl DirentStats {
    pub fn is_file(&self) -> bool {
        self.kind == DirentKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == DirentKind::Directory
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dirent {
    pub name: String,
    pub kind: DirentKind,
}

/// Link flavour for `symlink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkType {
    Dir,
    File,
    Junction,
}

/// Options for `writeFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileOptions {
    /// Fail instead of logging a warning when the write does not happen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throw_instead_of_warn: Option<bool>,
}

/// Options for `showOpenDialog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDialogOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(default)]
    pub properties: Vec<String>,
}

/// Result of `showOpenDialog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDialogReturnValue {
    pub canceled: bool,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

/// Captured output of `runShellCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}
