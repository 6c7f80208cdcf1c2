//! # Filesystem Round Trips
//!
//! The view's typed filesystem proxy against the host's local filesystem,
//! rooted in a temporary directory.

#[cfg(test)]
mod tests {
    use super::super::Bridge;
    use bridge_host::HostConfig;
    use bridge_types::capability::{DirentKind, OpenDialogOptions, WriteFileOptions};
    use bridge_types::codes;
    use bridge_view::{CommandRegistry, RemoteFileSystem};
    use std::path::Path;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Bridge, RemoteFileSystem) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig::default();
        config.filesystem.extension_root = dir.path().to_path_buf();
        config.filesystem.workspace_folders = vec![dir.path().join("workspace")];

        let bridge = Bridge::connect(&config, CommandRegistry::new());
        let fs = RemoteFileSystem::new(bridge.view.clone());
        (dir, bridge, fs)
    }

    fn path_in(dir: &Path, name: &str) -> String {
        dir.join(name).display().to_string()
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (dir, _bridge, fs) = setup();
        let file = path_in(dir.path(), "nested/deeper/notes.txt");

        fs.write_file(&file, "remember the milk", None).await.unwrap();

        assert_eq!(fs.read_file(&file).await.unwrap(), "remember the milk");
        assert!(fs.does_dirent_exist_and_is_file(&file).await.unwrap());

        let stats = fs.get_dirent_stats_or_throw(&file).await.unwrap();
        assert!(stats.is_file());
        assert_eq!(stats.size, "remember the milk".len() as u64);
    }

    #[tokio::test]
    async fn test_missing_paths_are_falsy_not_errors() {
        let (dir, _bridge, fs) = setup();
        let missing = path_in(dir.path(), "nothing-here");

        assert!(!fs.does_dirent_exist(&missing).await.unwrap());
        assert!(!fs.does_dirent_exist_and_is_file(&missing).await.unwrap());
        assert_eq!(fs.get_dirent_stats_if_exists(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stats_or_throw_rejects_missing_path() {
        let (dir, _bridge, fs) = setup();
        let err = fs
            .get_dirent_stats_or_throw(&path_in(dir.path(), "nothing-here"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::CAPABILITY_FAILED));
    }

    #[tokio::test]
    async fn test_folders_listing_and_rename() {
        let (dir, _bridge, fs) = setup();
        let folder = path_in(dir.path(), "project");
        fs.make_folder(&path_in(dir.path(), "project/src")).await.unwrap();
        fs.write_file(&path_in(dir.path(), "project/b.txt"), "b", None)
            .await
            .unwrap();
        fs.write_file(&path_in(dir.path(), "project/a.txt"), "a", None)
            .await
            .unwrap();

        let listing = fs.readdir(&folder).await.unwrap();
        let names: Vec<_> = listing.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "src"]);
        assert_eq!(listing[2].kind, DirentKind::Directory);

        fs.rename(
            &path_in(dir.path(), "project/a.txt"),
            &path_in(dir.path(), "project/c.txt"),
        )
        .await
        .unwrap();
        assert!(!fs.does_dirent_exist(&path_in(dir.path(), "project/a.txt")).await.unwrap());
        assert_eq!(
            fs.read_file(&path_in(dir.path(), "project/c.txt")).await.unwrap(),
            "a"
        );
    }

    #[tokio::test]
    async fn test_extension_relative_paths_resolve_under_out() {
        let (dir, _bridge, fs) = setup();
        fs.write_file("./assets/panel.css", "body {}", None).await.unwrap();

        let on_disk = dir.path().join("out").join("assets").join("panel.css");
        assert_eq!(std::fs::read_to_string(on_disk).unwrap(), "body {}");
        assert_eq!(fs.read_file("./assets/panel.css").await.unwrap(), "body {}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_write_warns_unless_asked_to_throw() {
        let (dir, bridge, fs) = setup();
        let blocker = path_in(dir.path(), "blocker");
        fs.write_file(&blocker, "plain file", None).await.unwrap();
        // A file stands where a parent folder would have to be created
        let impossible = path_in(dir.path(), "blocker/child.txt");

        fs.write_file(&impossible, "x", None).await.unwrap();
        assert_eq!(bridge.notifier.warnings().len(), 1);

        let strict = WriteFileOptions {
            throw_instead_of_warn: Some(true),
        };
        assert!(fs.write_file(&impossible, "x", Some(strict)).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_points_at_target() {
        let (dir, _bridge, fs) = setup();
        let target = path_in(dir.path(), "real.txt");
        let link = path_in(dir.path(), "link.txt");
        fs.write_file(&target, "real", None).await.unwrap();

        fs.symlink(&target, &link, None).await.unwrap();
        assert_eq!(fs.read_file(&link).await.unwrap(), "real");
    }

    #[tokio::test]
    async fn test_headless_dialog_is_cancelled() {
        let (_dir, _bridge, fs) = setup();
        let options = OpenDialogOptions {
            title: Some("Pick a map".into()),
            ..OpenDialogOptions::default()
        };
        let picked = fs.show_open_dialog(&options).await.unwrap();
        assert!(picked.canceled);
        assert!(picked.file_paths.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_workspace_folder_path() {
        let (dir, _bridge, fs) = setup();
        assert_eq!(
            fs.get_workspace_folder_path().await.unwrap(),
            path_in(dir.path(), "workspace")
        );
    }
}
