//! Merge and remove service entries in a platform's shared JSON config.
//!
//! Writes are merge-by-key: only the entries named by the neutral agent are
//! touched, every other entry and top-level key is carried through.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{declared_names, entries_from_metadata};
use crate::error::{DeployError, Result};
use crate::resolver::{PathResolver, ResolvedTarget};
use crate::schema::ENTRIES_PLACEHOLDER;
use crate::types::{OutputKind, Scope};

pub struct McpMerger<'r, 'a> {
    resolver: &'r PathResolver<'a>,
}

impl<'r, 'a> McpMerger<'r, 'a> {
    pub fn new(resolver: &'r PathResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Resolve the config file for `platform`, or `None` when the platform
    /// has no auxiliary output at this scope.
    fn target(
        &self,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<Option<ResolvedTarget>> {
        let descriptor = self.resolver.registry().require(platform)?;
        if descriptor.output(OutputKind::Mcp).is_none() {
            debug!(platform = %descriptor.name, "Platform has no auxiliary config output");
            return Ok(None);
        }
        if !descriptor.supports_scope(OutputKind::Mcp, scope) {
            warn!(
                platform = %descriptor.name,
                scope = %scope,
                "Auxiliary config has no equivalent at this scope, skipping"
            );
            return Ok(None);
        }
        self.resolver
            .resolve_for(descriptor, OutputKind::Mcp, scope, project_root)
            .map(Some)
    }

    /// Merge the enabled entries of `metadata` into the platform config.
    ///
    /// Returns the config path when anything was written.
    pub fn apply(
        &self,
        metadata: &serde_yaml::Mapping,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        let Some(entries) = entries_from_metadata(metadata)? else {
            return Ok(None);
        };
        let Some(target) = self.target(platform, scope, project_root)? else {
            return Ok(None);
        };

        let format = target.output.entry_format;
        let desired: Map<String, Value> = entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| (entry.name.clone(), entry.to_json(format)))
            .collect();
        if desired.is_empty() {
            debug!(platform = %platform, "No enabled auxiliary entries to write");
            return Ok(None);
        }

        let path = target.file_path();
        if !path.exists()
            && let Some(template) = &target.output.template
        {
            let rendered =
                serde_json::to_string_pretty(&desired).map_err(|source| DeployError::Json {
                    path: path.clone(),
                    source,
                })?;
            write_text(&path, &template.replace(ENTRIES_PLACEHOLDER, &rendered))?;
            info!(
                path = %path.display(),
                count = desired.len(),
                "Bootstrapped auxiliary config from template"
            );
            return Ok(Some(path));
        }

        let key_path: Vec<&str> = target.output.entries_key().split('.').collect();
        let mut root = load_json_map(&path)?;
        let mut section = extract_map_at_path(&root, &key_path, &path)?;
        for (name, entry) in desired {
            section.insert(name, entry);
        }
        set_map_at_path(&mut root, &key_path, section, &path)?;
        write_json_map(&path, &root)?;

        info!(path = %path.display(), "Merged auxiliary entries");
        Ok(Some(path))
    }

    /// Delete the entries named in `metadata` from the platform config.
    ///
    /// Returns `true` when the file changed. A missing file is a no-op.
    pub fn remove(
        &self,
        metadata: &serde_yaml::Mapping,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<bool> {
        let Some(names) = declared_names(metadata) else {
            return Ok(false);
        };
        let Some(target) = self.target(platform, scope, project_root)? else {
            return Ok(false);
        };

        let path = target.file_path();
        if !path.exists() {
            return Ok(false);
        }

        let key_path: Vec<&str> = target.output.entries_key().split('.').collect();
        let mut root = load_json_map(&path)?;
        let mut section = extract_map_at_path(&root, &key_path, &path)?;

        let before = section.len();
        for name in &names {
            section.shift_remove(name);
        }
        if section.len() == before {
            return Ok(false);
        }

        let removed = before - section.len();
        set_map_at_path(&mut root, &key_path, section, &path)?;
        write_json_map(&path, &root)?;
        info!(path = %path.display(), removed, "Removed auxiliary entries");
        Ok(true)
    }
}

pub(crate) fn load_json_map(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let bytes = fs::read(path).map_err(|e| DeployError::io(path, e))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| DeployError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DeployError::UnexpectedShape {
            path: path.to_path_buf(),
            key: "<root>".to_string(),
            expected: "a JSON object",
        }),
    }
}

pub(crate) fn write_json_map(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(map).map_err(|source| DeployError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, &bytes)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    write_bytes(path, content.as_bytes())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
    }
    fs::write(path, bytes).map_err(|e| DeployError::io(path, e))
}

fn extract_map_at_path(
    root: &Map<String, Value>,
    key_path: &[&str],
    file: &Path,
) -> Result<Map<String, Value>> {
    let mut current = root;
    for (idx, segment) in key_path.iter().enumerate() {
        let value = match current.get(*segment) {
            Some(Value::Null) | None => return Ok(Map::new()),
            Some(value) => value,
        };
        match value {
            Value::Object(map) if idx == key_path.len() - 1 => return Ok(map.clone()),
            Value::Object(map) => current = map,
            _ => return Err(shape_error(file, segment)),
        }
    }
    Ok(Map::new())
}

fn set_map_at_path(
    root: &mut Map<String, Value>,
    key_path: &[&str],
    map: Map<String, Value>,
    file: &Path,
) -> Result<()> {
    let Some((last, parents)) = key_path.split_last() else {
        return Ok(());
    };
    let mut current = root;
    for segment in parents {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if next.is_null() {
            *next = Value::Object(Map::new());
        }
        match next {
            Value::Object(map) => current = map,
            _ => return Err(shape_error(file, segment)),
        }
    }
    current.insert(last.to_string(), Value::Object(map));
    Ok(())
}

fn shape_error(file: &Path, key: &str) -> DeployError {
    DeployError::UnexpectedShape {
        path: file.to_path_buf(),
        key: key.to_string(),
        expected: "a JSON object",
    }
}
