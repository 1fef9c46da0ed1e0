//! Deterministic directory hashing used to report whether a copy changed
//! anything.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, Result};

/// Compute a blake3 hash over a directory tree.
///
/// Entries are visited in sorted order. Each file contributes
/// `relative_path || 0x00 || content`, each directory its relative path
/// followed by `0xFF`. A missing directory hashes like an empty one, and a
/// directory link back to an ancestor is not descended into.
pub fn hash_tree(path: &Path) -> Result<String> {
    let mut hasher = blake3::Hasher::new();
    if path.is_dir() {
        hash_dir_recursive(&mut hasher, path, "", &mut Vec::new())?;
    }
    Ok(hasher.finalize().to_hex().to_string())
}

fn hash_dir_recursive(
    hasher: &mut blake3::Hasher,
    dir: &Path,
    base: &str,
    ancestors: &mut Vec<PathBuf>,
) -> Result<()> {
    let canonical = fs::canonicalize(dir).map_err(|e| DeployError::io(dir, e))?;
    if ancestors.contains(&canonical) {
        return Ok(());
    }
    ancestors.push(canonical);

    let mut entries = fs::read_dir(dir)
        .map_err(|e| DeployError::io(dir, e))?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| DeployError::io(dir, e))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        let rel_path = if base.is_empty() {
            name.to_string_lossy().to_string()
        } else {
            format!("{}/{}", base, name.to_string_lossy())
        };
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| DeployError::io(&path, e))?;

        if metadata.is_dir() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0xFF]);
            hash_dir_recursive(hasher, &path, &rel_path, ancestors)?;
        } else if metadata.is_file() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0x00]);
            let content = fs::read(&path).map_err(|e| DeployError::io(&path, e))?;
            hasher.update(&content);
        }
    }
    ancestors.pop();
    Ok(())
}
