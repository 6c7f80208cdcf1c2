//! # Filesystem Capability
//!
//! Operations the view performs on the host's filesystem. Results are
//! reduced to plain data before they cross the channel: stats and directory
//! entries carry a `kind` instead of methods.

use async_trait::async_trait;
use bridge_types::capability::filesystem_commands as commands;
use bridge_types::capability::{
    Dirent, DirentKind, DirentStats, OpenDialogOptions, OpenDialogReturnValue, SymlinkType,
    WriteFileOptions,
};
use bridge_types::Target;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use super::{bind, to_result, void, CapabilityError, CapabilityTable, RegistrationError};
use crate::config::FileSystemConfig;
use crate::notifier::SharedNotifier;
use crate::path::{normalize_path, to_extension_path};

/// Filesystem operations reachable from the view.
#[async_trait]
pub trait FileSystemAdapter: Send + Sync {
    async fn does_dirent_exist(&self, path: &str) -> Result<bool, CapabilityError>;

    async fn does_dirent_exist_and_is_file(&self, path: &str) -> Result<bool, CapabilityError>;

    /// `None` when nothing exists at `path`.
    async fn get_dirent_stats_if_exists(
        &self,
        path: &str,
    ) -> Result<Option<DirentStats>, CapabilityError>;

    async fn get_dirent_stats_or_throw(&self, path: &str) -> Result<DirentStats, CapabilityError>;

    async fn readdir(&self, path: &str) -> Result<Vec<Dirent>, CapabilityError>;

    async fn read_file(&self, path: &str) -> Result<String, CapabilityError>;

    /// Write `data`, creating missing parent folders.
    async fn write_file(
        &self,
        path: &str,
        data: &str,
        options: WriteFileOptions,
    ) -> Result<(), CapabilityError>;

    async fn make_folder(&self, path: &str) -> Result<(), CapabilityError>;

    async fn symlink(
        &self,
        existing_path: &str,
        new_path: &str,
        kind: Option<SymlinkType>,
    ) -> Result<(), CapabilityError>;

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), CapabilityError>;

    async fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> Result<OpenDialogReturnValue, CapabilityError>;

    async fn get_workspace_folder_path(&self) -> Result<String, CapabilityError>;
}

/// Build the `filesystem` table on top of `adapter`.
pub fn filesystem_table(
    adapter: Arc<dyn FileSystemAdapter>,
) -> Result<CapabilityTable, RegistrationError> {
    let table = CapabilityTable::builder(Target::FileSystem)
        .register(
            commands::DOES_DIRENT_EXIST,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                to_result(fs.does_dirent_exist(&path).await?)
            }),
        )?
        .register(
            commands::DOES_DIRENT_EXIST_AND_IS_FILE,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                to_result(fs.does_dirent_exist_and_is_file(&path).await?)
            }),
        )?
        .register(
            commands::GET_DIRENT_STATS_IF_EXISTS,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                // `None` goes out as a present `null` result
                to_result(fs.get_dirent_stats_if_exists(&path).await?)
            }),
        )?
        .register(
            commands::GET_DIRENT_STATS_OR_THROW,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                to_result(fs.get_dirent_stats_or_throw(&path).await?)
            }),
        )?
        .register(
            commands::READDIR,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                to_result(fs.readdir(&path).await?)
            }),
        )?
        .register(
            commands::READ_FILE,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                to_result(fs.read_file(&path).await?)
            }),
        )?
        .register(
            commands::WRITE_FILE,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                let data = params.string(1)?;
                let options = params.optional::<WriteFileOptions>(2)?.unwrap_or_default();
                fs.write_file(&path, &data, options).await?;
                Ok(void())
            }),
        )?
        .register(
            commands::MAKE_FOLDER,
            bind(&adapter, |fs, params| async move {
                let path = params.string(0)?;
                fs.make_folder(&path).await?;
                Ok(void())
            }),
        )?
        .register(
            commands::SYMLINK,
            bind(&adapter, |fs, params| async move {
                let existing_path = params.string(0)?;
                let new_path = params.string(1)?;
                let kind = params.optional::<SymlinkType>(2)?;
                fs.symlink(&existing_path, &new_path, kind).await?;
                Ok(void())
            }),
        )?
        .register(
            commands::RENAME,
            bind(&adapter, |fs, params| async move {
                let old_path = params.string(0)?;
                let new_path = params.string(1)?;
                fs.rename(&old_path, &new_path).await?;
                Ok(void())
            }),
        )?
        .register(
            commands::SHOW_OPEN_DIALOG,
            bind(&adapter, |fs, params| async move {
                let options = params.optional::<OpenDialogOptions>(0)?.unwrap_or_default();
                to_result(fs.show_open_dialog(options).await?)
            }),
        )?
        .register(
            commands::GET_WORKSPACE_FOLDER_PATH,
            bind(&adapter, |fs, _params| async move {
                to_result(fs.get_workspace_folder_path().await?)
            }),
        )?
        .build();

    Ok(table)
}

// =============================================================================
// LOCAL IMPLEMENTATION
// =============================================================================

/// Filesystem capability backed by `tokio::fs`.
pub struct LocalFileSystem {
    config: FileSystemConfig,
    notifier: SharedNotifier,
}

impl LocalFileSystem {
    pub fn new(config: FileSystemConfig, notifier: SharedNotifier) -> Self {
        Self { config, notifier }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        to_extension_path(&self.config.extension_root, path)
    }

    fn kind_of(&self, file_type: std::fs::FileType, path: &str) -> DirentKind {
        if file_type.is_dir() {
            DirentKind::Directory
        } else if file_type.is_file() {
            DirentKind::File
        } else {
            self.notifier.warn(&format!(
                "path '{}' is neither 'directory' nor 'file', defaulting to 'file'.",
                path
            ));
            DirentKind::File
        }
    }

    async fn stats(&self, path: &str) -> io::Result<DirentStats> {
        let metadata = fs::metadata(self.resolve(path)).await?;
        Ok(DirentStats {
            kind: self.kind_of(metadata.file_type(), path),
            size: metadata.len(),
        })
    }

    async fn write_creating_parents(target: &Path, data: &str) -> io::Result<()> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(target, data).await
    }
}

#[async_trait]
impl FileSystemAdapter for LocalFileSystem {
    async fn does_dirent_exist(&self, path: &str) -> Result<bool, CapabilityError> {
        Ok(fs::try_exists(self.resolve(path)).await?)
    }

    async fn does_dirent_exist_and_is_file(&self, path: &str) -> Result<bool, CapabilityError> {
        match fs::metadata(self.resolve(path)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_dirent_stats_if_exists(
        &self,
        path: &str,
    ) -> Result<Option<DirentStats>, CapabilityError> {
        match self.stats(path).await {
            Ok(stats) => Ok(Some(stats)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_dirent_stats_or_throw(&self, path: &str) -> Result<DirentStats, CapabilityError> {
        Ok(self.stats(path).await?)
    }

    async fn readdir(&self, path: &str) -> Result<Vec<Dirent>, CapabilityError> {
        let mut entries = fs::read_dir(self.resolve(path)).await?;
        let mut dirents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            dirents.push(Dirent {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: self.kind_of(file_type, path),
            });
        }

        dirents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(dirents)
    }

    async fn read_file(&self, path: &str) -> Result<String, CapabilityError> {
        Ok(fs::read_to_string(self.resolve(path)).await?)
    }

    async fn write_file(
        &self,
        path: &str,
        data: &str,
        options: WriteFileOptions,
    ) -> Result<(), CapabilityError> {
        match Self::write_creating_parents(&self.resolve(path), data).await {
            Ok(()) => Ok(()),
            Err(err) if options.throw_instead_of_warn.unwrap_or(false) => Err(err.into()),
            Err(err) => {
                self.notifier
                    .warn(&format!("failed to write file '{}': {}", path, err));
                Ok(())
            }
        }
    }

    async fn make_folder(&self, path: &str) -> Result<(), CapabilityError> {
        Ok(fs::create_dir_all(self.resolve(path)).await?)
    }

    async fn symlink(
        &self,
        existing_path: &str,
        new_path: &str,
        kind: Option<SymlinkType>,
    ) -> Result<(), CapabilityError> {
        let existing = self.resolve(existing_path);
        let new = self.resolve(new_path);
        Ok(create_symlink(&existing, &new, kind).await?)
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), CapabilityError> {
        Ok(fs::rename(self.resolve(old_path), self.resolve(new_path)).await?)
    }

    async fn show_open_dialog(
        &self,
        options: OpenDialogOptions,
    ) -> Result<OpenDialogReturnValue, CapabilityError> {
        debug!(title = ?options.title, "No dialog available on a headless host, cancelling");
        Ok(OpenDialogReturnValue {
            canceled: true,
            file_paths: Vec::new(),
        })
    }

    async fn get_workspace_folder_path(&self) -> Result<String, CapabilityError> {
        let folders = &self.config.workspace_folders;
        let first = folders.first().ok_or_else(|| {
            CapabilityError::Failed("no workspace folder is configured".to_string())
        })?;

        if folders.len() > 1 {
            self.notifier.warn(&format!(
                "expected exactly one workspace folder but are {}, returning first that is '{}'.",
                folders.len(),
                first.display()
            ));
        }

        let folder = first.display().to_string();
        if cfg!(windows) {
            // The view works with forward slashes and lower-case drives
            return Ok(normalize_path(&folder, self.notifier.as_ref()));
        }
        Ok(folder)
    }
}

#[cfg(unix)]
async fn create_symlink(existing: &Path, new: &Path, _kind: Option<SymlinkType>) -> io::Result<()> {
    fs::symlink(existing, new).await
}

#[cfg(windows)]
async fn create_symlink(existing: &Path, new: &Path, kind: Option<SymlinkType>) -> io::Result<()> {
    let is_dir = match kind {
        Some(SymlinkType::Dir) | Some(SymlinkType::Junction) => true,
        Some(SymlinkType::File) => false,
        None => fs::metadata(existing).await.map(|m| m.is_dir()).unwrap_or(false),
    };
    if is_dir {
        fs::symlink_dir(existing, new).await
    } else {
        fs::symlink_file(existing, new).await
    }
}
