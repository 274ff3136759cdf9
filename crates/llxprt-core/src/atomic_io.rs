use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::time_utils::current_unix_timestamp;

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<std::path::PathBuf> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.exists() && path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let temp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("securestore"),
        std::process::id(),
        current_unix_timestamp()
    );
    Ok(parent_dir.join(temp_name))
}

/// Writes text using a temp file + rename so readers never observe partial data.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    write_bytes_atomic(path, content.as_bytes(), None)
}

/// Writes bytes via temp-file + fsync + rename, optionally setting file
/// permissions on the destination after the rename lands. The temp file is
/// fsynced before the rename so a crash between write and rename can only
/// ever leave a (discardable) temp remnant, never a partially written
/// destination file.
pub fn write_bytes_atomic(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    let temp_path = temp_path_for(path)?;

    let write_result = (|| -> Result<()> {
        std::fs::write(&temp_path, content)
            .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
        let file = File::open(&temp_path)
            .with_context(|| format!("failed to reopen temporary file {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to fsync temporary file {}", temp_path.display()))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(error);
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename temporary file {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    if let Some(mode) = mode {
        set_permissions(path, mode)?;
    }
    Ok(())
}

/// Ensures `dir` exists with the given unix permission bits.
pub fn ensure_dir_with_mode(dir: &Path, mode: u32) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    set_permissions(dir, mode)
}
