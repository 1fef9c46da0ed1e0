//! Shared core types used across the resolver, transcoder and orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Deployment scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Per-account install directories.
    Global,
    /// Directories relative to a detected project root.
    Project,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact kinds a platform descriptor can declare an output for.
///
/// The serialized names double as keys of `outputs` and `project_paths`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// One markdown document per agent.
    #[serde(alias = "agents")]
    AgentDefinition,
    /// A shared YAML list document holding every agent as an entry.
    CustomModes,
    /// One directory per skill.
    Skills,
    /// Shared JSON configuration holding auxiliary service entries.
    Mcp,
    /// Directory receiving agent workflow files.
    Workflows,
}

impl OutputKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputKind::AgentDefinition => "agent_definition",
            OutputKind::CustomModes => "custom_modes",
            OutputKind::Skills => "skills",
            OutputKind::Mcp => "mcp",
            OutputKind::Workflows => "workflows",
        }
    }

    /// Feature tag a descriptor must list for this output to be usable.
    pub fn feature(self) -> &'static str {
        match self {
            OutputKind::AgentDefinition | OutputKind::CustomModes | OutputKind::Workflows => {
                "agents"
            }
            OutputKind::Skills => "skills",
            OutputKind::Mcp => "mcps",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two neutral artifact families managed by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Agent,
    Skill,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Agent => "agent",
            ArtifactKind::Skill => "skill",
        }
    }

    /// Capability tag required on a descriptor.
    pub fn feature(self) -> &'static str {
        match self {
            ArtifactKind::Agent => "agents",
            ArtifactKind::Skill => "skills",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
