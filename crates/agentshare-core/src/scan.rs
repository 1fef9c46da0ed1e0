//! Enumerate what is currently deployed at platform targets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::deploy::Orchestrator;
use crate::error::{DeployError, Result};
use crate::modes::ListDocument;
use crate::resolver::ResolvedTarget;
use crate::types::{ArtifactKind, OutputKind, Scope};

/// Identifiers of `kind` present on `platform` at `scope`, sorted.
///
/// Per-id outputs are matched against the template with the placeholder as
/// a wildcard; list documents are read by their id field. A missing target
/// directory or file yields an empty list.
pub fn scan_deployed(
    orchestrator: &Orchestrator<'_>,
    kind: ArtifactKind,
    platform: &str,
    scope: Scope,
    project_root: Option<&Path>,
) -> Result<Vec<String>> {
    let target = orchestrator.resolve(kind, platform, scope, project_root)?;
    let mut ids = match target.kind {
        OutputKind::CustomModes => scan_list(&target)?,
        _ => scan_dir(&target, kind)?,
    };
    ids.sort();
    ids.dedup();
    Ok(ids)
}

fn scan_list(target: &ResolvedTarget) -> Result<Vec<String>> {
    let path = target.file_path();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let Some(layout) = target.output.list.as_ref() else {
        return Ok(Vec::new());
    };
    ListDocument::load(&path, layout)?.ids()
}

fn scan_dir(target: &ResolvedTarget, kind: ArtifactKind) -> Result<Vec<String>> {
    if !target.dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(&target.dir).map_err(|e| DeployError::io(&target.dir, e))? {
        let entry = entry.map_err(|e| DeployError::io(&target.dir, e))?;
        let path = entry.path();
        let wanted = match kind {
            ArtifactKind::Agent => path.is_file(),
            ArtifactKind::Skill => path.is_dir(),
        };
        if !wanted {
            continue;
        }
        if let Some(id) = target.id_from_file_name(&entry.file_name().to_string_lossy()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Dashboard data for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformSummary {
    pub name: String,
    pub display_name: String,
    pub installed: bool,
    pub detected_root: Option<PathBuf>,
    pub global_agents: Vec<String>,
    pub global_skills: Vec<String>,
    pub project_agents: Vec<String>,
    pub project_skills: Vec<String>,
}

/// Summaries for every platform in presentation order. Targets that cannot
/// be resolved (not installed, no project root, unsupported) count as empty.
pub fn platform_summaries(
    orchestrator: &Orchestrator<'_>,
    project_root: Option<&Path>,
) -> Vec<PlatformSummary> {
    let probe = orchestrator.resolver().probe();
    orchestrator
        .ordered_platforms()
        .into_iter()
        .map(|descriptor| {
            let scan = |kind: ArtifactKind, scope: Scope| {
                scan_deployed(orchestrator, kind, &descriptor.name, scope, project_root)
                    .unwrap_or_else(|e| {
                        debug!(
                            platform = %descriptor.name,
                            kind = %kind,
                            scope = %scope,
                            error = %e,
                            "Scan skipped"
                        );
                        Vec::new()
                    })
            };
            let detected_root = probe.detected_root(descriptor);
            PlatformSummary {
                name: descriptor.name.clone(),
                display_name: descriptor.display_name.clone(),
                installed: detected_root.is_some(),
                detected_root,
                global_agents: scan(ArtifactKind::Agent, Scope::Global),
                global_skills: scan(ArtifactKind::Skill, Scope::Global),
                project_agents: scan(ArtifactKind::Agent, Scope::Project),
                project_skills: scan(ArtifactKind::Skill, Scope::Project),
            }
        })
        .collect()
}
