//! Filesystem helpers for copying and removing artifact trees.

pub mod tree_hash;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DeployError, Result};

pub use tree_hash::hash_tree;

/// Recursively copy `src` into `dst`, overwriting files that already exist.
/// Files in `dst` without a counterpart in `src` are left alone.
///
/// Symlinks are followed. A directory link back to one of its own ancestors
/// is skipped.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    copy_dir(src, dst, &mut Vec::new())
}

fn copy_dir(src: &Path, dst: &Path, ancestors: &mut Vec<PathBuf>) -> Result<()> {
    let canonical = fs::canonicalize(src).map_err(|e| DeployError::io(src, e))?;
    if ancestors.contains(&canonical) {
        debug!(path = %src.display(), "Skipping directory link cycle");
        return Ok(());
    }
    ancestors.push(canonical);

    fs::create_dir_all(dst).map_err(|e| DeployError::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| DeployError::io(src, e))? {
        let entry = entry.map_err(|e| DeployError::io(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let metadata = fs::metadata(&from).map_err(|e| DeployError::io(&from, e))?;

        if metadata.is_dir() {
            copy_dir(&from, &to, ancestors)?;
        } else if metadata.is_file() {
            fs::copy(&from, &to).map_err(|e| DeployError::io(&to, e))?;
        }
    }

    ancestors.pop();
    Ok(())
}

/// Remove a file or directory. Returns `false` when nothing was there.
pub fn remove_path_if_exists(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DeployError::io(path, e)),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| DeployError::io(path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| DeployError::io(path, e))?;
    }
    Ok(true)
}

/// Write `content`, creating parent directories first.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| DeployError::io(path, e))
}

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| DeployError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_tree_overwrites_and_keeps_extras() {
        let temp = TempDir::new().expect("tempdir");
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("nested")).expect("mkdir src");
        fs::write(src.join("SKILL.md"), "new").expect("write");
        fs::write(src.join("nested").join("helper.sh"), "echo").expect("write");
        fs::create_dir_all(&dst).expect("mkdir dst");
        fs::write(dst.join("SKILL.md"), "old").expect("write");
        fs::write(dst.join("local.txt"), "keep").expect("write");

        copy_tree(&src, &dst).expect("copy");

        assert_eq!(fs::read_to_string(dst.join("SKILL.md")).expect("read"), "new");
        assert!(dst.join("nested").join("helper.sh").exists());
        assert!(dst.join("local.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_skips_link_to_ancestor() {
        let temp = TempDir::new().expect("tempdir");
        let src = temp.path().join("src");
        let dst = temp.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("mkdir src");
        fs::write(src.join("sub").join("notes.md"), "n").expect("write");
        std::os::unix::fs::symlink(&src, src.join("sub").join("back")).expect("symlink");

        copy_tree(&src, &dst).expect("copy");

        assert!(dst.join("sub").join("notes.md").exists());
        assert!(!dst.join("sub").join("back").exists());
    }

    #[test]
    fn test_remove_path_if_exists() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join("dir");
        fs::create_dir_all(dir.join("inner")).expect("mkdir");
        let file = temp.path().join("file.md");
        fs::write(&file, "x").expect("write");

        assert!(remove_path_if_exists(&dir).expect("remove dir"));
        assert!(remove_path_if_exists(&file).expect("remove file"));
        assert!(!remove_path_if_exists(&file).expect("second remove"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_write_file_creates_parents() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("a").join("b").join("c.md");
        write_file(&path, "hello").expect("write");
        assert_eq!(read_file(&path).expect("read"), "hello");
    }
}
