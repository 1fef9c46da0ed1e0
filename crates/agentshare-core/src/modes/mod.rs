//! Shared YAML list documents (`custom_modes.yaml`, `.kilocodemodes`).
//!
//! The whole document is parsed and rewritten structurally: one entry per
//! agent keyed by the layout's id field. Entries and top-level keys that
//! belong to other agents are carried through untouched.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{DeployError, Result};
use crate::schema::ListLayout;
use crate::types::Scope;

#[derive(Debug, Clone)]
pub struct ListDocument {
    path: PathBuf,
    layout: ListLayout,
    root: Mapping,
}

impl ListDocument {
    /// Load the document at `path`, or start an empty one if it is missing.
    pub fn load(path: &Path, layout: &ListLayout) -> Result<Self> {
        let root = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
            match serde_yaml::from_str::<Value>(&content).map_err(|source| DeployError::Yaml {
                path: path.to_path_buf(),
                source,
            })? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(DeployError::UnexpectedShape {
                        path: path.to_path_buf(),
                        key: "<root>".to_string(),
                        expected: "a YAML mapping",
                    });
                }
            }
        } else {
            Mapping::new()
        };

        let document = Self {
            path: path.to_path_buf(),
            layout: layout.clone(),
            root,
        };
        document.entries()?;
        Ok(document)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<&[Value]> {
        match self.root.get(self.layout.list_key.as_str()) {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Sequence(items)) => Ok(items),
            Some(_) => Err(self.shape_error()),
        }
    }

    fn entries_mut(&mut self) -> Result<&mut Vec<Value>> {
        let key = Value::String(self.layout.list_key.clone());
        let slot = self
            .root
            .entry(key)
            .or_insert_with(|| Value::Sequence(Vec::new()));
        if slot.is_null() {
            *slot = Value::Sequence(Vec::new());
        }
        match slot {
            Value::Sequence(items) => Ok(items),
            _ => Err(DeployError::UnexpectedShape {
                path: self.path.clone(),
                key: self.layout.list_key.clone(),
                expected: "a YAML sequence",
            }),
        }
    }

    fn shape_error(&self) -> DeployError {
        DeployError::UnexpectedShape {
            path: self.path.clone(),
            key: self.layout.list_key.clone(),
            expected: "a YAML sequence",
        }
    }

    fn entry_id<'v>(&self, entry: &'v Value) -> Option<&'v str> {
        entry.as_mapping()?.get(self.layout.id_field.as_str())?.as_str()
    }

    /// Identifiers of every entry, in document order.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .iter()
            .filter_map(|entry| self.entry_id(entry))
            .map(str::to_string)
            .collect())
    }

    pub fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.find(id)?.is_some())
    }

    pub fn find(&self, id: &str) -> Result<Option<&Mapping>> {
        Ok(self
            .entries()?
            .iter()
            .find(|entry| self.entry_id(entry) == Some(id))
            .and_then(Value::as_mapping))
    }

    /// Replace the entry with the same id in place, or append it.
    /// Returns `true` when an existing entry was replaced.
    pub fn upsert(&mut self, entry: Mapping) -> Result<bool> {
        let id = entry
            .get(self.layout.id_field.as_str())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DeployError::missing_field(&self.layout.id_field, "list entry"))?;

        let id_field = self.layout.id_field.clone();
        let items = self.entries_mut()?;
        let existing = items.iter().position(|item| {
            item.as_mapping()
                .and_then(|m| m.get(id_field.as_str()))
                .and_then(Value::as_str)
                == Some(id.as_str())
        });

        match existing {
            Some(index) => {
                items[index] = Value::Mapping(entry);
                Ok(true)
            }
            None => {
                items.push(Value::Mapping(entry));
                Ok(false)
            }
        }
    }

    /// Remove every entry with `id`. Returns `true` if anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        if !self.contains(id)? {
            return Ok(false);
        }
        let id_field = self.layout.id_field.clone();
        let items = self.entries_mut()?;
        items.retain(|item| {
            item.as_mapping()
                .and_then(|m| m.get(id_field.as_str()))
                .and_then(Value::as_str)
                != Some(id)
        });
        Ok(true)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;
        }
        let content =
            serde_yaml::to_string(&self.root).map_err(|source| DeployError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        fs::write(&self.path, content).map_err(|e| DeployError::io(&self.path, e))
    }

    pub fn layout(&self) -> &ListLayout {
        &self.layout
    }
}

/// Build a list entry from projected platform metadata.
///
/// Field order: id, metadata fields, body, scope marker.
pub fn build_entry(
    layout: &ListLayout,
    id: &str,
    metadata: &Mapping,
    body: Option<&str>,
    scope: Scope,
) -> Mapping {
    let mut entry = Mapping::new();
    entry.insert(
        Value::String(layout.id_field.clone()),
        Value::String(id.to_string()),
    );
    for (key, value) in metadata {
        entry.insert(key.clone(), value.clone());
    }
    if let (Some(field), Some(body)) = (&layout.body_field, body) {
        entry.insert(
            Value::String(field.clone()),
            Value::String(body.trim().to_string()),
        );
    }
    if let Some(field) = &layout.scope_field {
        entry.insert(
            Value::String(field.clone()),
            Value::String(scope.as_str().to_string()),
        );
    }
    entry
}

/// Split an entry back into platform metadata and body. The id, body and
/// scope fields are stripped from the metadata.
pub fn split_entry(layout: &ListLayout, entry: &Mapping) -> (Mapping, String) {
    let body = layout
        .body_field
        .as_deref()
        .and_then(|field| entry.get(field))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let structural = [
        Some(layout.id_field.as_str()),
        layout.body_field.as_deref(),
        layout.scope_field.as_deref(),
    ];
    let metadata = entry
        .iter()
        .filter(|(key, _)| {
            let key = key.as_str();
            !structural.iter().flatten().any(|field| key == Some(*field))
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    (metadata, body)
}
