//! Installation probing and project root detection.

use std::path::{Path, PathBuf};

use crate::schema::PlatformDescriptor;

/// Files or directories whose presence marks a project root.
pub const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    ".opencode",
    ".claude",
    ".github",
    ".kilocodemodes",
];

/// Expand a leading `~` against `home`.
pub fn expand_home(path: &str, home: &Path) -> PathBuf {
    if path == "~" {
        return home.to_path_buf();
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Answers whether a platform is installed and where.
pub trait InstallProbe {
    /// First existing detection path of `platform`.
    fn detected_root(&self, platform: &PlatformDescriptor) -> Option<PathBuf>;

    fn is_installed(&self, platform: &PlatformDescriptor) -> bool {
        self.detected_root(platform).is_some()
    }
}

/// Probe backed by path existence checks under a home directory.
#[derive(Debug, Clone)]
pub struct FsProbe {
    home_dir: PathBuf,
}

impl FsProbe {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }
}

impl InstallProbe for FsProbe {
    fn detected_root(&self, platform: &PlatformDescriptor) -> Option<PathBuf> {
        platform
            .detection_paths
            .iter()
            .map(|candidate| expand_home(candidate, &self.home_dir))
            .find(|candidate| candidate.exists())
    }
}

/// Walk upward from `start` looking for a project marker.
///
/// Returns `None` once the filesystem root is reached without a match.
pub fn detect_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}
