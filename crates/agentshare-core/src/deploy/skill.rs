//! Skill lifecycle. Skills travel as whole directories; only `SKILL.md` is
//! inspected.

use std::path::Path;

use tracing::info;

use super::{DeployOutcome, ExtractOutcome, Orchestrator, UninstallOutcome};
use crate::artifact::SKILL_FILE;
use crate::error::{DeployError, Result};
use crate::frontmatter::{self, projection::require_identity_fields};
use crate::fs::{copy_tree, hash_tree, remove_path_if_exists};
use crate::types::{ArtifactKind, Scope};

impl Orchestrator<'_> {
    /// Copy the skill directory into the platform's skills location,
    /// overwriting conflicting files.
    pub fn deploy_skill(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<DeployOutcome> {
        let target = self.resolve(ArtifactKind::Skill, platform, scope, project_root)?;
        let artifact = self.load_matching(ArtifactKind::Skill, id)?;

        let dest = target.path_for(id);
        let replaced = dest.exists();
        let before = hash_tree(&dest)?;
        copy_tree(&artifact.dir, &dest)?;
        let changed = hash_tree(&dest)? != before;

        info!(skill = %id, platform = %target.platform, changed, "Deployed skill");
        Ok(DeployOutcome {
            platform: target.platform,
            path: dest,
            replaced,
            changed,
            aux_config: None,
        })
    }

    /// Copy a platform skill directory into the repository.
    ///
    /// `SKILL.md` must carry a description; a missing name is filled in
    /// from `id`. The platform copy is validated before anything is written.
    pub fn extract_skill(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ExtractOutcome> {
        let target = self.resolve(ArtifactKind::Skill, platform, scope, project_root)?;
        let source = target.path_for(id);
        let source_doc = source.join(SKILL_FILE);
        if !source_doc.is_file() {
            return Err(DeployError::ArtifactNotFound(source_doc));
        }

        let content = crate::fs::read_file(&source_doc)?;
        let document = frontmatter::parse(&content).map_err(|e| DeployError::Yaml {
            path: source_doc.clone(),
            source: e,
        })?;
        let mut metadata = document.metadata.unwrap_or_default();
        let has_name = metadata
            .get("name")
            .and_then(|v| v.as_str())
            .is_some_and(|name| !name.trim().is_empty());
        if !has_name {
            metadata.insert("name".into(), id.into());
        }
        require_identity_fields(&metadata, &source_doc.display().to_string())?;

        let dest = self.store().artifact_dir(ArtifactKind::Skill, id);
        copy_tree(&source, &dest)?;
        let artifact_path = if has_name {
            dest.join(SKILL_FILE)
        } else {
            self.store()
                .write(ArtifactKind::Skill, id, &metadata, &document.body)?
        };

        info!(skill = %id, platform = %target.platform, "Extracted skill");
        Ok(ExtractOutcome {
            platform: target.platform,
            source,
            artifact_path,
        })
    }

    /// Remove the deployed skill directory if present.
    pub fn uninstall_skill(
        &self,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<UninstallOutcome> {
        let target = self.resolve(ArtifactKind::Skill, platform, scope, project_root)?;
        let path = target.path_for(id);
        let removed = remove_path_if_exists(&path)?;
        if removed {
            info!(skill = %id, platform = %target.platform, "Uninstalled skill");
        }
        Ok(UninstallOutcome {
            platform: target.platform,
            path,
            removed,
            aux_removed: false,
        })
    }
}
