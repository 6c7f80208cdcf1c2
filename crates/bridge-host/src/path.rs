//! Path helpers for paths sent by the view.

use std::path::{Path, PathBuf};

use crate::notifier::OperatorNotifier;

/// Normalise a drive-letter path coming from a URI or from Windows.
///
/// - `/c:/folder` becomes `c:/folder`
/// - `C:\folder` becomes `c:/folder`
/// - backslashes become slashes
///
/// Paths without a drive prefix are returned with slashes only, after
/// warning the operator.
pub fn normalize_path(path: &str, notifier: &dyn OperatorNotifier) -> String {
    let mut normalized = strip_slash_before_drive(path).to_string();

    if has_drive_prefix(&normalized, '\\') {
        normalized[..1].make_ascii_lowercase();
    }

    if normalized == path {
        notifier.warn(&format!(
            "normalize_path expected path '{}' to start with '/c:/' or 'C:\\'.",
            path
        ));
    }

    normalized.replace('\\', "/")
}

/// Resolve a path against the extension root. Paths starting with `./`
/// point into the root's `out` directory, everything else is used as is.
pub fn to_extension_path(extension_root: &Path, path: &str) -> PathBuf {
    match path.strip_prefix("./") {
        Some(relative) => extension_root.join("out").join(relative),
        None => PathBuf::from(path),
    }
}

fn strip_slash_before_drive(path: &str) -> &str {
    match path.strip_prefix('/') {
        Some(rest) if has_drive_prefix(rest, '/') => rest,
        _ => path,
    }
}

/// `x:` followed by `separator`, where `x` is a word character.
fn has_drive_prefix(path: &str, separator: char) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(':'), Some(sep))
            if (letter.is_ascii_alphanumeric() || letter == '_') && sep == separator
    )
}
