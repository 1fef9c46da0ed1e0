//! Deployment orchestration.
//!
//! Every single-target operation is linear: resolve the target, validate
//! source and target, transform, write or remove, then touch the auxiliary
//! config. Nothing is cached between operations; the presence of a
//! platform file is the only record of a deployment.

mod agent;
mod fanout;
mod skill;

use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactStore, NeutralArtifact};
use crate::error::{DeployError, Result};
use crate::modes::ListDocument;
use crate::resolver::{PathResolver, ResolvedTarget};
use crate::schema::{PlatformDescriptor, SchemaRegistry};
use crate::types::{ArtifactKind, OutputKind, Scope};

pub use fanout::{FanOutReport, TargetFailure};

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub platform: String,
    /// File or directory written.
    pub path: PathBuf,
    /// Whether a previous deployment was overwritten.
    pub replaced: bool,
    /// Whether the written content differs from what was there before.
    pub changed: bool,
    /// Auxiliary config that received entries, if any.
    pub aux_config: Option<PathBuf>,
}

/// Result of a successful extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub platform: String,
    /// Platform file or directory read.
    pub source: PathBuf,
    /// Neutral document written.
    pub artifact_path: PathBuf,
}

/// Result of an uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOutcome {
    pub platform: String,
    pub path: PathBuf,
    /// Whether anything was present to remove.
    pub removed: bool,
    /// Whether auxiliary entries were removed.
    pub aux_removed: bool,
}

/// Deploy precondition at a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Nothing deployed yet.
    Clear,
    /// A deployment exists and would be overwritten.
    Exists(PathBuf),
}

impl Conflict {
    pub fn is_clear(&self) -> bool {
        matches!(self, Conflict::Clear)
    }
}

/// Targets of a batch deploy partitioned by precondition, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployPlan {
    pub clear: Vec<String>,
    pub conflicting: Vec<String>,
    /// Targets that could not even be resolved.
    pub failures: Vec<TargetFailure>,
}

/// Runs lifecycle operations against a registry and an artifact store.
pub struct Orchestrator<'a> {
    resolver: PathResolver<'a>,
    store: ArtifactStore,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        home_dir: impl Into<PathBuf>,
        repo_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(registry, home_dir),
            store: ArtifactStore::new(repo_root),
        }
    }

    pub fn with_parts(resolver: PathResolver<'a>, store: ArtifactStore) -> Self {
        Self { resolver, store }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.resolver.registry()
    }

    pub fn resolver(&self) -> &PathResolver<'a> {
        &self.resolver
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Every platform in presentation order (`sort_order`, then name).
    pub fn ordered_platforms(&self) -> Vec<&'a PlatformDescriptor> {
        self.registry().ordered()
    }

    /// Output kind used for `kind` on `descriptor`.
    pub fn output_kind(descriptor: &PlatformDescriptor, kind: ArtifactKind) -> Result<OutputKind> {
        let output_kind = match kind {
            ArtifactKind::Agent => descriptor.agent_output_kind(),
            ArtifactKind::Skill => descriptor
                .output(OutputKind::Skills)
                .map(|_| OutputKind::Skills),
        };
        output_kind.ok_or_else(|| DeployError::UnsupportedCapability {
            platform: descriptor.name.clone(),
            capability: kind.feature(),
        })
    }

    /// Whether `platform` can hold `kind` at `scope`, from descriptor data
    /// alone.
    pub fn supports_scope(
        &self,
        platform: &str,
        kind: ArtifactKind,
        scope: Scope,
    ) -> Result<bool> {
        let descriptor = self.registry().require(platform)?;
        Ok(Self::output_kind(descriptor, kind)
            .map(|output_kind| descriptor.supports_scope(output_kind, scope))
            .unwrap_or(false))
    }

    /// Resolve the target for an artifact kind on a platform.
    pub fn resolve(
        &self,
        kind: ArtifactKind,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ResolvedTarget> {
        let descriptor = self.registry().require(platform)?;
        let output_kind = Self::output_kind(descriptor, kind)?;
        self.resolver.resolve_for(descriptor, output_kind, scope, project_root)
    }

    /// Whether `id` is currently present at `target`.
    pub fn is_deployed_at(&self, target: &ResolvedTarget, id: &str) -> Result<bool> {
        match target.kind {
            OutputKind::CustomModes => {
                let path = target.file_path();
                if !path.exists() {
                    return Ok(false);
                }
                let layout = list_layout(target)?;
                ListDocument::load(&path, layout)?.contains(id)
            }
            _ => Ok(target.path_for(id).exists()),
        }
    }

    /// Location `id` occupies at `target` (the shared file for list
    /// documents).
    pub fn location_of(target: &ResolvedTarget, id: &str) -> PathBuf {
        if target.is_per_id() {
            target.path_for(id)
        } else {
            target.file_path()
        }
    }

    /// Deploy precondition: whether `id` already exists at the target.
    pub fn check_conflict(
        &self,
        kind: ArtifactKind,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<Conflict> {
        let target = self.resolve(kind, platform, scope, project_root)?;
        if self.is_deployed_at(&target, id)? {
            Ok(Conflict::Exists(Self::location_of(&target, id)))
        } else {
            Ok(Conflict::Clear)
        }
    }

    /// Partition `platforms` into clear and conflicting targets before any
    /// write happens, so callers can deploy the clear ones first and ask
    /// about the rest.
    pub fn plan_deploy(
        &self,
        kind: ArtifactKind,
        id: &str,
        platforms: &[String],
        scope: Scope,
        project_root: Option<&Path>,
    ) -> DeployPlan {
        let mut plan = DeployPlan::default();
        for platform in platforms {
            match self.check_conflict(kind, id, platform, scope, project_root) {
                Ok(Conflict::Clear) => plan.clear.push(platform.clone()),
                Ok(Conflict::Exists(_)) => plan.conflicting.push(platform.clone()),
                Err(e) => plan.failures.push(TargetFailure::new(platform, &e)),
            }
        }
        plan
    }

    /// Deploy an artifact of either kind.
    pub fn deploy(
        &self,
        kind: ArtifactKind,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<DeployOutcome> {
        match kind {
            ArtifactKind::Agent => self.deploy_agent(id, platform, scope, project_root),
            ArtifactKind::Skill => self.deploy_skill(id, platform, scope, project_root),
        }
    }

    /// Extract an artifact of either kind.
    pub fn extract(
        &self,
        kind: ArtifactKind,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ExtractOutcome> {
        match kind {
            ArtifactKind::Agent => self.extract_agent(id, platform, scope, project_root),
            ArtifactKind::Skill => self.extract_skill(id, platform, scope, project_root),
        }
    }

    /// Uninstall an artifact of either kind.
    pub fn uninstall(
        &self,
        kind: ArtifactKind,
        id: &str,
        platform: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<UninstallOutcome> {
        match kind {
            ArtifactKind::Agent => self.uninstall_agent(id, platform, scope, project_root),
            ArtifactKind::Skill => self.uninstall_skill(id, platform, scope, project_root),
        }
    }

    /// Load a neutral artifact and check that its declared name matches
    /// the identifier it was requested under.
    fn load_matching(&self, kind: ArtifactKind, id: &str) -> Result<NeutralArtifact> {
        let artifact = self.store.load(kind, id)?;
        if artifact.name() != id {
            return Err(DeployError::IdentityMismatch {
                expected: id.to_string(),
                found: artifact.name().to_string(),
            });
        }
        Ok(artifact)
    }
}

fn list_layout(target: &ResolvedTarget) -> Result<&crate::schema::ListLayout> {
    target
        .output
        .list
        .as_ref()
        .ok_or_else(|| DeployError::MalformedDescriptor {
            path: PathBuf::from(&target.platform),
            reason: format!("{} output has no list layout", target.kind),
        })
}
