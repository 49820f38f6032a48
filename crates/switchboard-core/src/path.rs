//! Path validation for static asset requests
//!
//! Request paths come straight off the wire, so every one is resolved
//! against the asset root before any filesystem access.

use crate::error::PathError;
use crate::{MAX_FILENAME_LEN, MAX_PATH_LEN};
use std::path::{Component, Path, PathBuf};

/// Resolve a request path (e.g. `/js/app.js`) inside `base`.
///
/// Leading slashes are stripped, `.` components are ignored, and `..`,
/// prefixes, NUL bytes and overlong names are rejected. Works on paths that
/// do not exist yet; use [`safe_real_path`] once the file is known to exist.
pub fn safe_path(base: &Path, request_path: &str) -> Result<PathBuf, PathError> {
    if request_path.contains('\0') {
        return Err(PathError::Traversal("path contains null byte".into()));
    }

    if request_path.len() > MAX_PATH_LEN {
        return Err(PathError::TooLong {
            len: request_path.len(),
            max: MAX_PATH_LEN,
        });
    }

    let relative = request_path.trim_start_matches('/');
    let mut result = base.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(name) => {
                let len = name.to_string_lossy().len();
                if len > MAX_FILENAME_LEN {
                    return Err(PathError::TooLong {
                        len,
                        max: MAX_FILENAME_LEN,
                    });
                }
                result.push(name);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(PathError::Traversal(
                    "parent directory (..) not allowed".into(),
                ));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(PathError::Traversal("absolute paths not allowed".into()));
            }
        }
    }

    if !result.starts_with(base) {
        return Err(PathError::Traversal("path escapes base directory".into()));
    }

    Ok(result)
}

/// Verify an existing path stays inside `base` after following symlinks.
pub fn safe_real_path(base: &Path, path: &Path) -> Result<PathBuf, PathError> {
    let canonical_base = base
        .canonicalize()
        .map_err(|e| PathError::Traversal(format!("cannot canonicalize base: {}", e)))?;

    let canonical_path = path
        .canonicalize()
        .map_err(|e| PathError::Traversal(format!("cannot canonicalize path: {}", e)))?;

    if !canonical_path.starts_with(&canonical_base) {
        return Err(PathError::Traversal(
            "symlink escapes asset directory".into(),
        ));
    }

    Ok(canonical_path)
}
