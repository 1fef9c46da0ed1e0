//! Descriptor registry.
//!
//! Loads platform descriptors from the built-in set and any configured
//! directories, then answers lookups by name or alias.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{PlatformDescriptor, builtin, parse_descriptor};
use crate::error::{DeployError, Result};
use crate::types::Scope;

/// Where descriptors are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorSource {
    /// Descriptors compiled into the binary.
    Builtin,
    /// Every `*.toml` file in a directory.
    Dir(PathBuf),
}

/// Registry of platform descriptors.
///
/// Sources are consulted in order; the first descriptor to claim a name
/// wins and later duplicates are skipped with a warning. Directory sources
/// are placed ahead of the built-in set so local files can override it.
#[derive(Debug)]
pub struct SchemaRegistry {
    sources: Vec<DescriptorSource>,
    platforms: BTreeMap<String, PlatformDescriptor>,
    aliases: HashMap<String, String>,
    loaded: bool,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SchemaRegistry {
    /// Create a registry over explicit sources. Nothing is read until
    /// [`SchemaRegistry::load`] runs.
    pub fn new(sources: Vec<DescriptorSource>) -> Self {
        Self {
            sources,
            platforms: BTreeMap::new(),
            aliases: HashMap::new(),
            loaded: false,
        }
    }

    /// Registry over the built-in descriptors only.
    pub fn builtin() -> Self {
        Self::new(vec![DescriptorSource::Builtin])
    }

    /// Registry over extra descriptor directories followed by the built-ins.
    pub fn with_dirs(dirs: &[PathBuf]) -> Self {
        let mut sources: Vec<_> = dirs.iter().cloned().map(DescriptorSource::Dir).collect();
        sources.push(DescriptorSource::Builtin);
        Self::new(sources)
    }

    /// Registry over a single directory, without the built-ins.
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(vec![DescriptorSource::Dir(dir.into())])
    }

    /// Build and load a registry in one step.
    pub fn load_from(sources: Vec<DescriptorSource>) -> Result<Self> {
        let mut registry = Self::new(sources);
        registry.load()?;
        Ok(registry)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read every source. Runs once; later calls are no-ops.
    ///
    /// Malformed descriptors and duplicate names are skipped with a warning
    /// so one bad file never hides the rest. A directory that does not exist
    /// is skipped silently; one that cannot be listed is an error.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        for source in self.sources.clone() {
            match source {
                DescriptorSource::Builtin => {
                    for (file_name, content) in builtin::DESCRIPTORS {
                        let origin = Path::new("<builtin>").join(file_name);
                        self.admit(&origin, content);
                    }
                }
                DescriptorSource::Dir(dir) => self.load_dir(&dir)?,
            }
        }

        self.loaded = true;
        debug!(count = self.platforms.len(), "Loaded platform descriptors");
        Ok(())
    }

    fn load_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            debug!(dir = %dir.display(), "Descriptor directory does not exist, skipping");
            return Ok(());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| DeployError::io(dir, e))? {
            let entry = entry.map_err(|e| DeployError::io(dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();

        for path in files {
            match fs::read_to_string(&path) {
                Ok(content) => self.admit(&path, &content),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable descriptor"),
            }
        }
        Ok(())
    }

    fn admit(&mut self, origin: &Path, content: &str) {
        let descriptor = match parse_descriptor(origin, content) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };

        if self.platforms.contains_key(&descriptor.name) {
            warn!(
                platform = %descriptor.name,
                path = %origin.display(),
                "Duplicate platform descriptor, keeping the first"
            );
            return;
        }

        for alias in &descriptor.aliases {
            if self.platforms.contains_key(alias) || self.aliases.contains_key(alias) {
                warn!(alias = %alias, platform = %descriptor.name, "Alias already claimed, ignoring");
                continue;
            }
            self.aliases.insert(alias.clone(), descriptor.name.clone());
        }
        self.platforms.insert(descriptor.name.clone(), descriptor);
    }

    /// Canonical name for `name`, which may be an alias.
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if let Some((key, _)) = self.platforms.get_key_value(name) {
            return Some(key.as_str());
        }
        self.aliases.get(name).map(String::as_str)
    }

    /// Look up a descriptor by name or alias.
    pub fn get(&self, name: &str) -> Option<&PlatformDescriptor> {
        let canonical = self.canonical_name(name)?;
        self.platforms.get(canonical)
    }

    /// Like [`SchemaRegistry::get`] but fails with `UnsupportedPlatform`.
    pub fn require(&self, name: &str) -> Result<&PlatformDescriptor> {
        self.get(name)
            .ok_or_else(|| DeployError::UnsupportedPlatform(name.to_string()))
    }

    /// All descriptors in name order.
    pub fn all(&self) -> Vec<&PlatformDescriptor> {
        self.platforms.values().collect()
    }

    /// All descriptors in presentation order: `sort_order` ascending
    /// (absent last), then case-insensitive name.
    pub fn ordered(&self) -> Vec<&PlatformDescriptor> {
        let mut platforms = self.all();
        platforms.sort_by(|a, b| {
            let key_a = (a.sort_order.unwrap_or(i64::MAX), a.name.to_lowercase());
            let key_b = (b.sort_order.unwrap_or(i64::MAX), b.name.to_lowercase());
            key_a.cmp(&key_b)
        });
        platforms
    }

    /// Descriptors declaring `feature`, in presentation order.
    pub fn with_feature(&self, feature: &str) -> Vec<&PlatformDescriptor> {
        self.ordered()
            .into_iter()
            .filter(|p| p.has_feature(feature))
            .collect()
    }

    /// Descriptors that can receive agents at `scope`, in presentation order.
    pub fn agent_platforms_for_scope(&self, scope: Scope) -> Vec<&PlatformDescriptor> {
        self.ordered()
            .into_iter()
            .filter(|p| {
                p.agent_output_kind()
                    .is_some_and(|kind| p.supports_scope(kind, scope))
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.platforms.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
