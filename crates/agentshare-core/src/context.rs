//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use crate::artifact::ArtifactStore;
use crate::config::{AppConfig, ConfigStore};
use crate::deploy::Orchestrator;
use crate::detect::detect_project_root;
use crate::error::Result;
use crate::schema::SchemaRegistry;

/// Overrides the home directory used for `~` expansion and detection.
pub const HOME_ENV: &str = "AGENTSHARE_HOME";
/// Overrides the neutral artifact repository root.
pub const REPO_ENV: &str = "AGENTSHARE_REPO";

/// Paths shared by every operation of one run.
///
/// Front ends create this once and derive the registry and orchestrator
/// from it.
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    repo_root: PathBuf,
    project_root: Option<PathBuf>,
    config_dir: PathBuf,
}

impl AppContext {
    /// Create a context with explicit paths.
    pub fn new(
        home_dir: PathBuf,
        repo_root: PathBuf,
        project_root: Option<PathBuf>,
        config_dir: PathBuf,
    ) -> Self {
        Self {
            home_dir,
            repo_root,
            project_root,
            config_dir,
        }
    }

    /// Build a context from the process environment.
    ///
    /// The repository defaults to the current directory and the project
    /// root is detected by walking upward from it.
    pub fn from_env() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let home_dir = match std::env::var_os(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?,
        };
        let repo_root = std::env::var_os(REPO_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| cwd.clone());
        let config_dir = ConfigStore::from_env(&home_dir).config_dir().to_path_buf();
        let project_root = detect_project_root(&cwd);
        Ok(Self::new(home_dir, repo_root, project_root, config_dir))
    }

    /// Replace the project root, e.g. from a `--project` flag.
    pub fn with_project_root(mut self, project_root: Option<PathBuf>) -> Self {
        self.project_root = project_root;
        self
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::new(self.config_dir.clone())
    }

    pub fn config(&self) -> AppConfig {
        self.config_store().load()
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(self.repo_root.clone())
    }

    /// Load the registry over the configured descriptor directories and the
    /// built-ins.
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let config = self.config();
        let mut registry = SchemaRegistry::with_dirs(&config.descriptor_dirs);
        registry.load()?;
        Ok(registry)
    }

    /// Orchestrator over a registry the caller keeps alive.
    pub fn orchestrator<'a>(&self, registry: &'a SchemaRegistry) -> Orchestrator<'a> {
        Orchestrator::new(registry, self.home_dir.clone(), self.repo_root.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_registry_includes_configured_dirs() {
        let temp = TempDir::new().expect("tempdir");
        let descriptors = temp.path().join("descriptors");
        std::fs::create_dir_all(&descriptors).expect("mkdir");
        std::fs::write(
            descriptors.join("custom.toml"),
            "name = \"custom\"\ndisplay_name = \"Custom\"\nfeatures = [\"skills\"]\n\n[outputs.skills]\ntarget = \"~/.custom/skills/{id}\"\n",
        )
        .expect("write");

        let ctx = AppContext::new(
            temp.path().join("home"),
            temp.path().join("repo"),
            None,
            temp.path().join("config"),
        );
        let mut config = AppConfig::new();
        config.add_descriptor_dir(descriptors);
        ctx.config_store().save(&config).expect("save");

        let registry = ctx.registry().expect("registry");
        assert!(registry.get("custom").is_some());
        assert!(registry.get("claude_code").is_some());
    }

    #[test]
    fn test_orchestrator_uses_repo_root() {
        let temp = TempDir::new().expect("tempdir");
        let ctx = AppContext::new(
            temp.path().join("home"),
            temp.path().join("repo"),
            Some(temp.path().join("project")),
            temp.path().join("config"),
        );
        let registry = SchemaRegistry::builtin();
        let orchestrator = ctx.orchestrator(&registry);
        assert_eq!(orchestrator.store().repo_root(), ctx.repo_root());
        assert_eq!(ctx.project_root(), Some(temp.path().join("project").as_path()));
    }
}
