//! AgentShare Core Library
//!
//! Schema-driven deployment of neutral agent and skill artifacts onto AI
//! coding-assistant platforms. Platform behavior comes from descriptors;
//! the engine itself names no platform.

pub mod artifact;
pub mod config;
pub mod context;
pub mod deploy;
pub mod detect;
pub mod error;
pub mod frontmatter;
pub mod fs;
pub mod mcp;
pub mod modes;
pub mod resolver;
pub mod scan;
pub mod schema;
pub mod types;

pub use error::{DeployError, ErrorKind, Result};

/// Re-exports of commonly used types
pub mod prelude {
    pub use crate::artifact::{ArtifactStore, NeutralArtifact};
    pub use crate::config::{AppConfig, ConfigStore};
    pub use crate::context::AppContext;
    pub use crate::deploy::{
        Conflict, DeployOutcome, DeployPlan, ExtractOutcome, FanOutReport, Orchestrator,
        TargetFailure, UninstallOutcome,
    };
    pub use crate::detect::{FsProbe, InstallProbe, detect_project_root};
    pub use crate::error::{DeployError, ErrorKind, Result};
    pub use crate::resolver::{PathResolver, ResolvedTarget};
    pub use crate::scan::{PlatformSummary, platform_summaries, scan_deployed};
    pub use crate::schema::{PlatformDescriptor, SchemaRegistry};
    pub use crate::types::{ArtifactKind, OutputKind, Scope};
}
