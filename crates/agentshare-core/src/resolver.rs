//! Target path resolution.
//!
//! Turns `(platform, output kind, scope, project root)` into a concrete
//! directory plus the final path component, still carrying the `{id}`
//! placeholder so callers can either substitute an identifier or scan for
//! every deployed one.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::detect::{FsProbe, InstallProbe, expand_home};
use crate::error::{DeployError, Result};
use crate::schema::{
    ID_PLACEHOLDER, OutputDefinition, PlatformDescriptor, ProjectPath, SchemaRegistry,
};
use crate::types::{OutputKind, Scope};

/// A resolved deployment location. Computed fresh on every operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTarget {
    pub platform: String,
    pub kind: OutputKind,
    pub scope: Scope,
    /// Directory holding the target.
    pub dir: PathBuf,
    /// Final path component, possibly containing `{id}`.
    pub file_template: String,
    pub output: OutputDefinition,
}

impl ResolvedTarget {
    /// Concrete path for one identifier.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(self.file_template.replace(ID_PLACEHOLDER, id))
    }

    /// Concrete path for outputs without a placeholder (shared documents).
    pub fn file_path(&self) -> PathBuf {
        self.dir.join(&self.file_template)
    }

    pub fn is_per_id(&self) -> bool {
        self.file_template.contains(ID_PLACEHOLDER)
    }

    /// Recover the identifier from a directory entry name, treating the
    /// placeholder as a wildcard.
    pub fn id_from_file_name(&self, file_name: &str) -> Option<String> {
        let (prefix, suffix) = self.file_template.split_once(ID_PLACEHOLDER)?;
        let id = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
        (!id.is_empty()).then(|| id.to_string())
    }
}

/// Resolves targets against a registry and an install probe.
pub struct PathResolver<'a> {
    registry: &'a SchemaRegistry,
    home_dir: PathBuf,
    probe: Box<dyn InstallProbe + 'a>,
}

impl<'a> PathResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry, home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        Self {
            registry,
            probe: Box::new(FsProbe::new(home_dir.clone())),
            home_dir,
        }
    }

    /// Use a custom install probe (tests, alternative detection).
    pub fn with_probe(
        registry: &'a SchemaRegistry,
        home_dir: impl Into<PathBuf>,
        probe: impl InstallProbe + 'a,
    ) -> Self {
        Self {
            registry,
            home_dir: home_dir.into(),
            probe: Box::new(probe),
        }
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn probe(&self) -> &dyn InstallProbe {
        self.probe.as_ref()
    }

    pub fn is_installed(&self, platform: &PlatformDescriptor) -> bool {
        self.probe.is_installed(platform)
    }

    /// Resolve a target by platform name or alias.
    pub fn resolve_target(
        &self,
        platform: &str,
        kind: OutputKind,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ResolvedTarget> {
        let descriptor = self.registry.require(platform)?;
        self.resolve_for(descriptor, kind, scope, project_root)
    }

    /// Resolve a target for an already looked-up descriptor.
    pub fn resolve_for(
        &self,
        descriptor: &PlatformDescriptor,
        kind: OutputKind,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> Result<ResolvedTarget> {
        let output = descriptor
            .output(kind)
            .ok_or_else(|| DeployError::UnsupportedCapability {
                platform: descriptor.name.clone(),
                capability: kind.as_str(),
            })?;

        let (dir, file_template) = match scope {
            Scope::Global => self.resolve_global(descriptor, output)?,
            Scope::Project => {
                let root = project_root.ok_or(DeployError::ProjectRootRequired)?;
                resolve_project(descriptor, kind, output, root)?
            }
        };

        debug!(
            platform = %descriptor.name,
            kind = %kind,
            scope = %scope,
            dir = %dir.display(),
            file = %file_template,
            "Resolved target"
        );

        Ok(ResolvedTarget {
            platform: descriptor.name.clone(),
            kind,
            scope,
            dir,
            file_template,
            output: output.clone(),
        })
    }

    fn resolve_global(
        &self,
        descriptor: &PlatformDescriptor,
        output: &OutputDefinition,
    ) -> Result<(PathBuf, String)> {
        let (parent, last) = split_template(&output.target);
        let dir = if output.target_is_home_relative() {
            expand_home(parent_or_home(parent), &self.home_dir)
        } else if Path::new(&output.target).is_absolute() {
            PathBuf::from(parent_or_root(parent))
        } else {
            let root = self
                .probe
                .detected_root(descriptor)
                .ok_or_else(|| DeployError::PlatformNotInstalled(descriptor.name.clone()))?;
            join_relative(&root, parent)
        };
        Ok((dir, last.to_string()))
    }
}

fn resolve_project(
    descriptor: &PlatformDescriptor,
    kind: OutputKind,
    output: &OutputDefinition,
    root: &Path,
) -> Result<(PathBuf, String)> {
    match descriptor.project_path(kind) {
        Some(ProjectPath::Dir(dir)) => Ok((root.join(dir), output.basename().to_string())),
        Some(ProjectPath::File { file }) => {
            let (parent, last) = split_template(file);
            Ok((join_relative(root, parent), last.to_string()))
        }
        None if output.target_is_relative() => {
            let (parent, last) = split_template(&output.target);
            Ok((join_relative(root, parent), last.to_string()))
        }
        None => Err(DeployError::ProjectScopeUnsupported {
            platform: descriptor.name.clone(),
            capability: kind.as_str(),
        }),
    }
}

/// Split a template into its parent and final component.
fn split_template(template: &str) -> (&str, &str) {
    let trimmed = template.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, last)) => (parent, last),
        None => ("", trimmed),
    }
}

fn parent_or_home(parent: &str) -> &str {
    if parent.is_empty() { "~" } else { parent }
}

fn parent_or_root(parent: &str) -> &str {
    if parent.is_empty() { "/" } else { parent }
}

fn join_relative(base: &Path, parent: &str) -> PathBuf {
    if parent.is_empty() {
        base.to_path_buf()
    } else {
        base.join(parent)
    }
}
