//! Small filesystem helpers shared by the stores.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GateError, Result};

/// Maximum size of a state, feature or evidence file read into memory (16 MB).
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum size of a trace collection read into memory (1 GB).
///
/// The collection is append-only; at roughly 12 KB of compact JSON per
/// 1024-dimension trace this admits tens of thousands of traces.
pub const MAX_COLLECTION_SIZE: u64 = 1024 * 1024 * 1024;

/// Read a file into a string, refusing files larger than [`MAX_FILE_SIZE`].
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    read_optional_within(path, MAX_FILE_SIZE)
}

/// Read a file into a string, refusing files larger than `limit` bytes.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn read_optional_within(path: &Path, limit: u64) -> Result<Option<String>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GateError::storage(path, e)),
    };

    if metadata.len() > limit {
        return Err(GateError::storage(
            path,
            std::io::Error::other(format!(
                "file is too large ({} bytes, max {} bytes)",
                metadata.len(),
                limit
            )),
        ));
    }

    fs::read_to_string(path)
        .map(Some)
        .map_err(|e| GateError::storage(path, e))
}

/// Temp file used while atomically replacing `path`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write `contents` to `path` via temp file + rename.
///
/// Parent directories are created as needed.
pub fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| GateError::storage(parent, e))?;
        }
    }

    let temp = temp_path(path);
    {
        let mut file = fs::File::create(&temp).map_err(|e| GateError::storage(&temp, e))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| GateError::storage(&temp, e))?;
        file.sync_all().map_err(|e| GateError::storage(&temp, e))?;
    }

    // Rename is atomic on POSIX
    fs::rename(&temp, path).map_err(|e| GateError::storage(path, e))?;

    Ok(())
}
