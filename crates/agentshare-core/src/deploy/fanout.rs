//! Multi-platform fan-out with per-target error aggregation.
//!
//! Targets run strictly one after another in presentation order. A failure
//! on one platform is recorded and the loop moves on; completed targets are
//! never rolled back.

use std::fmt;
use std::path::Path;

use tracing::warn;

use super::{DeployOutcome, Orchestrator, UninstallOutcome};
use crate::error::{DeployError, ErrorKind};
use crate::types::{ArtifactKind, Scope};

/// A failed target within a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub platform: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl TargetFailure {
    pub fn new(platform: &str, error: &DeployError) -> Self {
        Self {
            platform: platform.to_string(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for TargetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.platform, self.message)
    }
}

/// Aggregated outcome of a fan-out, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport<T> {
    pub succeeded: Vec<T>,
    pub failures: Vec<TargetFailure>,
}

impl<T> Default for FanOutReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> FanOutReport<T> {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one, keeping order.
    pub fn absorb(&mut self, other: FanOutReport<T>) {
        self.succeeded.extend(other.succeeded);
        self.failures.extend(other.failures);
    }
}

impl Orchestrator<'_> {
    /// Platforms a fan-out for `kind` at `scope` should visit, in
    /// presentation order.
    ///
    /// At global scope platforms that are not installed are left out; at
    /// project scope installation is not required.
    pub fn fan_out_targets(&self, kind: ArtifactKind, scope: Scope) -> Vec<String> {
        self.ordered_platforms()
            .into_iter()
            .filter(|descriptor| {
                Self::output_kind(descriptor, kind)
                    .is_ok_and(|output_kind| descriptor.supports_scope(output_kind, scope))
            })
            .filter(|descriptor| {
                scope == Scope::Project || self.resolver().is_installed(descriptor)
            })
            .map(|descriptor| descriptor.name.clone())
            .collect()
    }

    /// Run `op` against every platform in `platforms`, sequentially.
    pub fn fan_out<T>(
        &self,
        platforms: &[String],
        mut op: impl FnMut(&str) -> crate::error::Result<T>,
    ) -> FanOutReport<T> {
        let mut report = FanOutReport::default();
        for platform in platforms {
            match op(platform) {
                Ok(outcome) => report.succeeded.push(outcome),
                Err(e) => {
                    warn!(platform = %platform, error = %e, "Target failed");
                    report.failures.push(TargetFailure::new(platform, &e));
                }
            }
        }
        report
    }

    /// Deploy `id` to every supporting platform.
    pub fn deploy_all(
        &self,
        kind: ArtifactKind,
        id: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> FanOutReport<DeployOutcome> {
        let targets = self.fan_out_targets(kind, scope);
        self.fan_out(&targets, |platform| {
            self.deploy(kind, id, platform, scope, project_root)
        })
    }

    /// Uninstall `id` from every supporting platform.
    pub fn uninstall_all(
        &self,
        kind: ArtifactKind,
        id: &str,
        scope: Scope,
        project_root: Option<&Path>,
    ) -> FanOutReport<UninstallOutcome> {
        let targets = self.fan_out_targets(kind, scope);
        self.fan_out(&targets, |platform| {
            self.uninstall(kind, id, platform, scope, project_root)
        })
    }
}
