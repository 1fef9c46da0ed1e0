//! Neutral artifact repository.
//!
//! Layout under the repository root:
//!
//! ```text
//! agents/<id>/agent.md
//! agents/<id>/skills/<skill>/...   (optional bundle)
//! agents/<id>/workflows/...        (optional bundle)
//! skills/<id>/SKILL.md
//! skills/<id>/...                  (supporting files)
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Mapping;
use tracing::debug;

use crate::error::{DeployError, Result};
use crate::frontmatter::{self, projection::require_identity_fields};
use crate::types::ArtifactKind;

pub const AGENT_FILE: &str = "agent.md";
pub const SKILL_FILE: &str = "SKILL.md";

/// Sub-directory of an agent holding bundled skills.
pub const AGENT_SKILLS_DIR: &str = "skills";
/// Sub-directory of an agent holding bundled workflows.
pub const AGENT_WORKFLOWS_DIR: &str = "workflows";

impl ArtifactKind {
    /// Top-level repository directory for this kind.
    pub fn repo_dir(self) -> &'static str {
        match self {
            ArtifactKind::Agent => "agents",
            ArtifactKind::Skill => "skills",
        }
    }

    /// Document file inside each artifact directory.
    pub fn document_file(self) -> &'static str {
        match self {
            ArtifactKind::Agent => AGENT_FILE,
            ArtifactKind::Skill => SKILL_FILE,
        }
    }
}

/// A loaded neutral agent or skill.
#[derive(Debug, Clone, PartialEq)]
pub struct NeutralArtifact {
    pub kind: ArtifactKind,
    pub id: String,
    pub dir: PathBuf,
    pub metadata: Mapping,
    pub body: String,
}

impl NeutralArtifact {
    /// Declared `name`, validated present at load.
    pub fn name(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    pub fn document_path(&self) -> PathBuf {
        self.dir.join(self.kind.document_file())
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    repo_root: PathBuf,
}

impl ArtifactStore {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn artifact_dir(&self, kind: ArtifactKind, id: &str) -> PathBuf {
        self.repo_root.join(kind.repo_dir()).join(id)
    }

    pub fn document_path(&self, kind: ArtifactKind, id: &str) -> PathBuf {
        self.artifact_dir(kind, id).join(kind.document_file())
    }

    pub fn exists(&self, kind: ArtifactKind, id: &str) -> bool {
        self.document_path(kind, id).is_file()
    }

    /// Load and validate an artifact. `name` and `description` are required.
    pub fn load(&self, kind: ArtifactKind, id: &str) -> Result<NeutralArtifact> {
        let path = self.document_path(kind, id);
        if !path.is_file() {
            return Err(DeployError::ArtifactNotFound(path));
        }
        let content = crate::fs::read_file(&path)?;
        let document = frontmatter::parse(&content).map_err(|source| DeployError::Yaml {
            path: path.clone(),
            source,
        })?;
        let context = path.display().to_string();
        let metadata = document
            .metadata
            .ok_or_else(|| DeployError::missing_field("name", context.clone()))?;
        require_identity_fields(&metadata, &context)?;

        Ok(NeutralArtifact {
            kind,
            id: id.to_string(),
            dir: self.artifact_dir(kind, id),
            metadata,
            body: document.body,
        })
    }

    /// Like [`ArtifactStore::load`], but `None` when the artifact is absent.
    pub fn load_optional(&self, kind: ArtifactKind, id: &str) -> Result<Option<NeutralArtifact>> {
        if !self.exists(kind, id) {
            return Ok(None);
        }
        self.load(kind, id).map(Some)
    }

    /// Read the metadata of an existing artifact without validation, for
    /// overlaying extracted fields.
    pub fn existing_metadata(
        &self,
        kind: ArtifactKind,
        id: &str,
    ) -> Result<Option<(Mapping, String)>> {
        let path = self.document_path(kind, id);
        if !path.is_file() {
            return Ok(None);
        }
        let content = crate::fs::read_file(&path)?;
        let document = frontmatter::parse(&content).map_err(|source| DeployError::Yaml {
            path: path.clone(),
            source,
        })?;
        Ok(Some((document.metadata.unwrap_or_default(), document.body)))
    }

    /// Write an artifact document, creating its directory if needed.
    pub fn write(
        &self,
        kind: ArtifactKind,
        id: &str,
        metadata: &Mapping,
        body: &str,
    ) -> Result<PathBuf> {
        let path = self.document_path(kind, id);
        let content = frontmatter::serialize(metadata, body, true).map_err(|source| {
            DeployError::Yaml {
                path: path.clone(),
                source,
            }
        })?;
        crate::fs::write_file(&path, &content)?;
        debug!(path = %path.display(), "Wrote neutral artifact");
        Ok(path)
    }

    /// Identifiers of every artifact of `kind`, sorted.
    pub fn list(&self, kind: ArtifactKind) -> Result<Vec<String>> {
        let dir = self.repo_root.join(kind.repo_dir());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| DeployError::io(&dir, e))? {
            let entry = entry.map_err(|e| DeployError::io(&dir, e))?;
            let path = entry.path();
            if path.join(kind.document_file()).is_file() {
                ids.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    pub fn list_agents(&self) -> Result<Vec<String>> {
        self.list(ArtifactKind::Agent)
    }

    pub fn list_skills(&self) -> Result<Vec<String>> {
        self.list(ArtifactKind::Skill)
    }
}
