//! Agent lifecycle: deploy, extract and uninstall.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use super::{DeployOutcome, ExtractOutcome, Orchestrator, UninstallOutcome, list_layout};
use crate::artifact::{AGENT_SKILLS_DIR, AGENT_WORKFLOWS_DIR, NeutralArtifact};
use crate::error::{DeployError, Result};
use crate::frontmatter::{self, project_from_platform, project_to_platform};
use crate::mcp::McpMerger;
use crate::modes::{self, ListDocument};
use crate::resolver::ResolvedTarget;
use crate::schema::PlatformDescriptor;
use crate::types::{ArtifactKind, OutputKind, Scope};

impl Orchestrator<'_> {
    /// Project a neutral agent onto a platform and merge its auxiliary
    /// entries. Nothing is written if projection fails.
    pub fn deploy_agent(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<DeployOutcome> {
        let descriptor = self.registry().require(platform)?;
        let target = self.resolve(ArtifactKind::Agent, &descriptor.name, scope, project_root)?;
        let artifact = self.load_matching(ArtifactKind::Agent, id)?;
        let projected = project_to_platform(&artifact.metadata, &target.output)?;

        let (path, replaced, changed) = match target.kind {
            OutputKind::CustomModes => {
                let path = target.file_path();
                let layout = list_layout(&target)?;
                let mut document = ListDocument::load(&path, layout)?;
                let body = target.output.include_body.then_some(artifact.body.as_str());
                let entry = modes::build_entry(layout, id, &projected, body, scope);
                let changed = document.find(id)? != Some(&entry);
                let replaced = document.upsert(entry)?;
                document.save()?;
                (path, replaced, changed)
            }
            _ => {
                let path = target.path_for(id);
                let content =
                    frontmatter::serialize(&projected, &artifact.body, target.output.include_body)
                        .map_err(|source| DeployError::Yaml {
                            path: path.clone(),
                            source,
                        })?;
                let previous = fs::read_to_string(&path).ok();
                let replaced = previous.is_some();
                let changed = previous.as_deref() != Some(content.as_str());
                crate::fs::write_file(&path, &content)?;
                (path, replaced, changed)
            }
        };
        info!(agent = %id, platform = %descriptor.name, path = %path.display(), "Deployed agent");

        self.deliver_bundle(descriptor, &artifact, scope, project_root)?;
        let aux_config = McpMerger::new(self.resolver()).apply(
            &artifact.metadata,
            &descriptor.name,
            scope,
            project_root,
        )?;

        Ok(DeployOutcome {
            platform: descriptor.name.clone(),
            path,
            replaced,
            changed,
            aux_config,
        })
    }

    /// Read a platform agent back into the neutral repository.
    ///
    /// Extracted fields are overlaid onto an existing neutral document so
    /// fields the platform does not carry survive.
    pub fn extract_agent(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ExtractOutcome> {
        let descriptor = self.registry().require(platform)?;
        let target = self.resolve(ArtifactKind::Agent, &descriptor.name, scope, project_root)?;
        let (source, platform_meta, body) = read_platform_agent(&target, id)?;

        let mut extracted = project_from_platform(&platform_meta, &target.output, id)?;
        // The neutral name is the repository identifier.
        if extracted.get("name").and_then(Value::as_str) != Some(id) {
            debug!(agent = %id, "Platform name differs from identifier, using identifier");
            extracted.insert("name".into(), Value::String(id.to_string()));
        }
        let (metadata, body) = match self.store().existing_metadata(ArtifactKind::Agent, id)? {
            Some((mut base, previous_body)) => {
                merge_mapping(&mut base, extracted);
                let body = if target.output.include_body {
                    body
                } else {
                    previous_body
                };
                (base, body)
            }
            None => (extracted, body),
        };

        let artifact_path = self
            .store()
            .write(ArtifactKind::Agent, id, &metadata, &body)?;
        info!(agent = %id, platform = %descriptor.name, "Extracted agent");

        Ok(ExtractOutcome {
            platform: descriptor.name.clone(),
            source,
            artifact_path,
        })
    }

    /// Remove a deployed agent, its bundled skills and workflows, and the
    /// auxiliary entries its neutral source declares.
    pub fn uninstall_agent(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<UninstallOutcome> {
        let descriptor = self.registry().require(platform)?;
        let target = self.resolve(ArtifactKind::Agent, &descriptor.name, scope, project_root)?;
        // Read the neutral source before removing anything.
        let neutral = self.store().existing_metadata(ArtifactKind::Agent, id)?;

        let (path, removed) = match target.kind {
            OutputKind::CustomModes => {
                let path = target.file_path();
                let mut removed = false;
                if path.exists() {
                    let mut document = ListDocument::load(&path, list_layout(&target)?)?;
                    removed = document.remove(id)?;
                    if removed {
                        document.save()?;
                    }
                }
                (path, removed)
            }
            _ => {
                let path = target.path_for(id);
                let removed = crate::fs::remove_path_if_exists(&path)?;
                (path, removed)
            }
        };
        if removed {
            info!(agent = %id, platform = %descriptor.name, "Uninstalled agent");
        }

        let mut aux_removed = false;
        let agent_dir = self.store().artifact_dir(ArtifactKind::Agent, id);
        if agent_dir.is_dir() {
            self.retract_bundle(descriptor, &agent_dir, scope, project_root)?;
        }
        if let Some((metadata, _)) = neutral {
            aux_removed = McpMerger::new(self.resolver()).remove(
                &metadata,
                &descriptor.name,
                scope,
                project_root,
            )?;
        }

        Ok(UninstallOutcome {
            platform: descriptor.name.clone(),
            path,
            removed,
            aux_removed,
        })
    }

    /// Copy `agents/<id>/skills/*` and `agents/<id>/workflows/*` to the
    /// platform's skill and workflow outputs, where declared.
    fn deliver_bundle(
        &self,
        descriptor: &PlatformDescriptor,
        artifact: &NeutralArtifact,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<()> {
        let skills_src = artifact.dir.join(AGENT_SKILLS_DIR);
        let skill_names = subdirectories(&skills_src)?;
        if !skill_names.is_empty() {
            if let Some(target) =
                self.bundle_target(descriptor, OutputKind::Skills, scope, project_root)?
            {
                for name in &skill_names {
                    crate::fs::copy_tree(&skills_src.join(name), &target.path_for(name))?;
                }
                debug!(count = skill_names.len(), "Delivered bundled skills");
            }
        }

        let workflows_src = artifact.dir.join(AGENT_WORKFLOWS_DIR);
        if workflows_src.is_dir() {
            if let Some(target) =
                self.bundle_target(descriptor, OutputKind::Workflows, scope, project_root)?
            {
                crate::fs::copy_tree(&workflows_src, &target.file_path())?;
                debug!(dir = %target.file_path().display(), "Delivered bundled workflows");
            }
        }
        Ok(())
    }

    /// Inverse of [`Orchestrator::deliver_bundle`]: remove exactly the names
    /// the neutral bundle holds.
    fn retract_bundle(
        &self,
        descriptor: &PlatformDescriptor,
        agent_dir: &Path,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<()> {
        let skill_names = subdirectories(&agent_dir.join(AGENT_SKILLS_DIR))?;
        if !skill_names.is_empty() {
            if let Some(target) =
                self.bundle_target(descriptor, OutputKind::Skills, scope, project_root)?
            {
                for name in &skill_names {
                    crate::fs::remove_path_if_exists(&target.path_for(name))?;
                }
            }
        }

        let workflow_names = entry_names(&agent_dir.join(AGENT_WORKFLOWS_DIR))?;
        if !workflow_names.is_empty() {
            if let Some(target) =
                self.bundle_target(descriptor, OutputKind::Workflows, scope, project_root)?
            {
                let dir = target.file_path();
                for name in &workflow_names {
                    crate::fs::remove_path_if_exists(&dir.join(name))?;
                }
            }
        }
        Ok(())
    }

    /// Bundle destination, or `None` when the platform has no such output
    /// at this scope.
    fn bundle_target(
        &self,
        descriptor: &PlatformDescriptor,
        kind: OutputKind,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<Option<ResolvedTarget>> {
        if !descriptor.supports_scope(kind, scope) {
            debug!(platform = %descriptor.name, kind = %kind, "No bundle output, skipping");
            return Ok(None);
        }
        self.resolver()
            .resolve_for(descriptor, kind, scope, project_root)
            .map(Some)
    }
}

/// Read `(source path, platform metadata, body)` for `id` at `target`.
fn read_platform_agent(target: &ResolvedTarget, id: &str) -> Result<(PathBuf, Mapping, String)> {
    match target.kind {
        OutputKind::CustomModes => {
            let path = target.file_path();
            if !path.exists() {
                return Err(DeployError::ArtifactNotFound(path));
            }
            let layout = list_layout(target)?;
            let document = ListDocument::load(&path, layout)?;
            let Some(entry) = document.find(id)? else {
                return Err(DeployError::ArtifactNotFound(path));
            };
            let (metadata, body) = modes::split_entry(layout, entry);
            Ok((path, metadata, body))
        }
        _ => {
            let path = target.path_for(id);
            if !path.is_file() {
                return Err(DeployError::ArtifactNotFound(path));
            }
            let content = crate::fs::read_file(&path)?;
            let document = frontmatter::parse(&content).map_err(|source| DeployError::Yaml {
                path: path.clone(),
                source,
            })?;
            Ok((path, document.metadata.unwrap_or_default(), document.body))
        }
    }
}

/// Deep-merge `overlay` into `base`: nested mappings merge, everything
/// else is replaced.
fn merge_mapping(base: &mut Mapping, overlay: Mapping) {
    for (key, value) in overlay {
        match value {
            Value::Mapping(incoming) => {
                if let Some(Value::Mapping(existing)) = base.get_mut(&key) {
                    merge_mapping(existing, incoming);
                } else {
                    base.insert(key, Value::Mapping(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    Ok(entry_names(dir)?
        .into_iter()
        .filter(|name| dir.join(name).is_dir())
        .collect())
}

fn entry_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DeployError::io(dir, e))? {
        let entry = entry.map_err(|e| DeployError::io(dir, e))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}
