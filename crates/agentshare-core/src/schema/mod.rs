//! Platform descriptor schema.
//!
//! Descriptors are TOML documents interpreted into validated, strongly-typed
//! structures at load time. A descriptor that fails validation never reaches
//! the registry, so operations never discover missing fields mid-flight.

pub mod builtin;
pub mod registry;

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DeployError, Result};
use crate::types::{OutputKind, Scope};

pub use registry::{DescriptorSource, SchemaRegistry};

/// Identifier placeholder inside path templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Entries placeholder inside auxiliary-config bootstrap templates.
pub const ENTRIES_PLACEHOLDER: &str = "{{entries}}";

/// Default top-level key for auxiliary service entries.
pub const DEFAULT_MCP_KEY: &str = "mcpServers";

/// A validated platform descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformDescriptor {
    pub name: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub features: Vec<String>,
    pub detection_paths: Vec<String>,
    pub outputs: BTreeMap<OutputKind, OutputDefinition>,
    pub project_paths: BTreeMap<OutputKind, ProjectPath>,
    pub sort_order: Option<i64>,
}

impl PlatformDescriptor {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Output definition for `kind`, treated as absent unless the matching
    /// feature tag is also declared.
    pub fn output(&self, kind: OutputKind) -> Option<&OutputDefinition> {
        if !self.has_feature(kind.feature()) {
            return None;
        }
        self.outputs.get(&kind)
    }

    /// The output used for agents: a per-agent markdown file if declared,
    /// otherwise a shared list document.
    pub fn agent_output_kind(&self) -> Option<OutputKind> {
        [OutputKind::AgentDefinition, OutputKind::CustomModes]
            .into_iter()
            .find(|kind| self.output(*kind).is_some())
    }

    pub fn project_path(&self, kind: OutputKind) -> Option<&ProjectPath> {
        self.project_paths.get(&kind)
    }

    /// Whether `kind` can be materialized at `scope`, judged from descriptor
    /// data alone (no filesystem access).
    pub fn supports_scope(&self, kind: OutputKind, scope: Scope) -> bool {
        let Some(output) = self.output(kind) else {
            return false;
        };
        match scope {
            Scope::Global => true,
            Scope::Project => {
                self.project_paths.contains_key(&kind) || output.target_is_relative()
            }
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("'name' must not be empty".to_string());
        }
        for (kind, output) in &self.outputs {
            output
                .validate(*kind)
                .map_err(|reason| format!("outputs.{kind}: {reason}"))?;
        }
        for (kind, project_path) in &self.project_paths {
            let raw = project_path.as_str();
            if Path::new(raw).is_absolute() || raw.starts_with('~') {
                return Err(format!("project_paths.{kind} must be project-relative"));
            }
            let per_id = matches!(kind, OutputKind::AgentDefinition | OutputKind::Skills);
            if per_id && matches!(project_path, ProjectPath::File { .. }) {
                return Err(format!("project_paths.{kind} must be a directory"));
            }
        }
        Ok(())
    }
}

/// Layout of the document written for an output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Metadata block followed by a markdown body.
    #[default]
    Markdown,
    /// YAML document holding a list of entries keyed by an id field.
    YamlList,
}

/// Shape of one auxiliary service entry in the platform's JSON config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFormat {
    /// `{ "command": "...", "args": [...], "env": {...} }`
    #[default]
    Standard,
    /// `{ "type": "local", "command": [cmd, ...args], "environment": {...}, "enabled": true }`
    CommandArray,
}

/// Field layout of a list-document output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListLayout {
    pub list_key: String,
    pub id_field: String,
    pub body_field: Option<String>,
    pub scope_field: Option<String>,
}

/// How and where one artifact kind is materialized for a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    pub target: String,
    #[serde(default)]
    pub format: DocumentFormat,
    #[serde(default)]
    pub frontmatter: Vec<FieldSpec>,
    #[serde(default)]
    pub exclude_fields: Vec<String>,
    #[serde(default = "default_include_body")]
    pub include_body: bool,
    /// Platform-side values written when projection leaves a field unset.
    #[serde(default)]
    pub defaults: serde_yaml::Mapping,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub entry_format: EntryFormat,
    #[serde(default, flatten)]
    pub list: Option<ListLayout>,
}

fn default_include_body() -> bool {
    true
}

impl OutputDefinition {
    /// Top-level JSON key for auxiliary entries.
    pub fn entries_key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_MCP_KEY)
    }

    pub fn is_excluded(&self, field: &str) -> bool {
        self.exclude_fields.iter().any(|f| f == field)
    }

    pub fn target_is_home_relative(&self) -> bool {
        self.target == "~" || self.target.starts_with("~/")
    }

    pub fn target_is_relative(&self) -> bool {
        !self.target_is_home_relative() && !Path::new(&self.target).is_absolute()
    }

    /// Final component of the target template.
    pub fn basename(&self) -> &str {
        self.target
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.target)
    }

    fn validate(&self, kind: OutputKind) -> std::result::Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("'target' must not be empty".to_string());
        }
        let trimmed = self.target.trim_end_matches('/');
        let (parent, last) = match trimmed.rsplit_once('/') {
            Some((parent, last)) => (parent, last),
            None => ("", trimmed),
        };
        if parent.contains(ID_PLACEHOLDER) {
            return Err(format!(
                "'{ID_PLACEHOLDER}' may only appear in the final path component"
            ));
        }
        let per_id = matches!(kind, OutputKind::AgentDefinition | OutputKind::Skills);
        if per_id && !last.contains(ID_PLACEHOLDER) {
            return Err(format!("'target' must contain '{ID_PLACEHOLDER}'"));
        }
        if !per_id && last.contains(ID_PLACEHOLDER) {
            return Err(format!("'target' must not contain '{ID_PLACEHOLDER}'"));
        }
        match (kind, self.format) {
            (OutputKind::CustomModes, DocumentFormat::YamlList) => {
                if self.list.is_none() {
                    return Err("yaml_list outputs require 'list_key' and 'id_field'".to_string());
                }
            }
            (OutputKind::CustomModes, DocumentFormat::Markdown) => {
                return Err("custom_modes outputs must use format = \"yaml_list\"".to_string());
            }
            (_, DocumentFormat::YamlList) => {
                return Err("only custom_modes outputs may use format = \"yaml_list\"".to_string());
            }
            _ => {}
        }
        if let Some(template) = &self.template {
            if !template.contains(ENTRIES_PLACEHOLDER) {
                return Err(format!("'template' must contain '{ENTRIES_PLACEHOLDER}'"));
            }
        }
        Ok(())
    }
}

/// One entry of an output's `frontmatter` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldSpec", into = "RawFieldSpec")]
pub enum FieldSpec {
    /// Copied verbatim under the same name.
    Bare(String),
    /// Written as `output` on the platform side, read from the dotted
    /// `source` path on the neutral side.
    Mapped { output: String, source: String },
}

impl FieldSpec {
    /// Field name on the platform side.
    pub fn output_name(&self) -> &str {
        match self {
            FieldSpec::Bare(name) => name,
            FieldSpec::Mapped { output, .. } => output,
        }
    }

    /// Dotted path on the neutral side.
    pub fn neutral_path(&self) -> &str {
        match self {
            FieldSpec::Bare(name) => name,
            FieldSpec::Mapped { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFieldSpec {
    Bare(String),
    Mapped(BTreeMap<String, String>),
}

impl TryFrom<RawFieldSpec> for FieldSpec {
    type Error = String;

    fn try_from(raw: RawFieldSpec) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawFieldSpec::Bare(name) if name.trim().is_empty() => {
                Err("frontmatter field names must not be empty".to_string())
            }
            RawFieldSpec::Bare(name) => Ok(FieldSpec::Bare(name)),
            RawFieldSpec::Mapped(map) => {
                let mut iter = map.into_iter();
                match (iter.next(), iter.next()) {
                    (Some((output, source)), None) => Ok(FieldSpec::Mapped { output, source }),
                    _ => Err("mapped frontmatter fields must have exactly one key".to_string()),
                }
            }
        }
    }
}

impl From<FieldSpec> for RawFieldSpec {
    fn from(spec: FieldSpec) -> Self {
        match spec {
            FieldSpec::Bare(name) => RawFieldSpec::Bare(name),
            FieldSpec::Mapped { output, source } => {
                RawFieldSpec::Mapped(BTreeMap::from([(output, source)]))
            }
        }
    }
}

/// Project-scope override for one output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectPath {
    /// Directory joined with the template's basename.
    Dir(String),
    /// Exact project-relative file.
    File { file: String },
}

impl ProjectPath {
    pub fn as_str(&self) -> &str {
        match self {
            ProjectPath::Dir(dir) => dir,
            ProjectPath::File { file } => file,
        }
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "agent_definition" | "agents" => Ok(OutputKind::AgentDefinition),
            "custom_modes" => Ok(OutputKind::CustomModes),
            "skills" => Ok(OutputKind::Skills),
            "mcp" | "mcps" => Ok(OutputKind::Mcp),
            "workflows" => Ok(OutputKind::Workflows),
            other => Err(format!("unknown output kind '{other}'")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    target_detection: RawDetection,
    #[serde(default)]
    outputs: BTreeMap<String, OutputDefinition>,
    #[serde(default)]
    project_paths: BTreeMap<String, ProjectPath>,
    #[serde(default)]
    sort_order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDetection {
    #[serde(default)]
    paths: Vec<String>,
}

/// Parse and validate a descriptor document. `origin` is only used for
/// error reporting.
pub fn parse_descriptor(origin: &Path, content: &str) -> Result<PlatformDescriptor> {
    let malformed = |reason: String| DeployError::MalformedDescriptor {
        path: origin.to_path_buf(),
        reason,
    };

    let raw: RawDescriptor = toml::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let outputs = raw
        .outputs
        .into_iter()
        .map(|(key, output)| Ok((key.parse::<OutputKind>()?, output)))
        .collect::<std::result::Result<BTreeMap<_, _>, String>>()
        .map_err(malformed)?;
    let project_paths = raw
        .project_paths
        .into_iter()
        .map(|(key, path)| Ok((key.parse::<OutputKind>()?, path)))
        .collect::<std::result::Result<BTreeMap<_, _>, String>>()
        .map_err(malformed)?;

    let descriptor = PlatformDescriptor {
        display_name: raw.display_name.unwrap_or_else(|| raw.name.clone()),
        name: raw.name,
        aliases: raw.aliases,
        features: raw.features,
        detection_paths: raw.target_detection.paths,
        outputs,
        project_paths,
        sort_order: raw.sort_order,
    };
    descriptor.validate().map_err(malformed)?;
    Ok(descriptor)
}
