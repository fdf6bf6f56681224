//! Atomic file hand-off for files read concurrently by the static server.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Hidden sibling path used as the staging file for `path`.
///
/// The leading dot keeps it out of the static roots, which refuse dot-files.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("manifest")));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` to `path` so readers see either the old or the new file.
///
/// The parent directory is created if missing. Data goes to a staging file in
/// the same directory which is then renamed over `path`.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let staging = staging_path(path);
    tokio::fs::write(&staging, contents).await?;

    if let Err(e) = tokio::fs::rename(&staging, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&staging).await {
            warn!(
                "Failed to remove staging file {}: {}",
                staging.display(),
                cleanup
            );
        }
        return Err(e);
    }

    Ok(())
}
