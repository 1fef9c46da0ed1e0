//! Auxiliary service entries (`mcps`) declared on neutral agents.

pub mod merger;

use serde_json::{Map, Value as JsonValue, json};
use serde_yaml::{Mapping, Value};

use crate::error::{DeployError, Result};
use crate::schema::EntryFormat;

pub use merger::McpMerger;

/// Neutral metadata key holding the service map.
pub const MCPS_KEY: &str = "mcps";

/// One service reference as declared in neutral metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct McpEntry {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: Map<String, JsonValue>,
    pub enabled: bool,
}

impl McpEntry {
    /// Render the entry in a platform's JSON shape.
    pub fn to_json(&self, format: EntryFormat) -> JsonValue {
        match format {
            EntryFormat::Standard => {
                let mut entry = Map::new();
                entry.insert("command".to_string(), json!(self.command));
                if !self.args.is_empty() {
                    entry.insert("args".to_string(), json!(self.args));
                }
                if !self.env.is_empty() {
                    entry.insert("env".to_string(), JsonValue::Object(self.env.clone()));
                }
                JsonValue::Object(entry)
            }
            EntryFormat::CommandArray => {
                let mut command = vec![self.command.clone()];
                command.extend(self.args.iter().cloned());
                let mut entry = Map::new();
                entry.insert("type".to_string(), json!("local"));
                entry.insert("command".to_string(), json!(command));
                if !self.env.is_empty() {
                    entry.insert(
                        "environment".to_string(),
                        JsonValue::Object(self.env.clone()),
                    );
                }
                entry.insert("enabled".to_string(), json!(true));
                JsonValue::Object(entry)
            }
        }
    }
}

/// Names of every declared entry, enabled or not. `None` when the metadata
/// has no service map.
pub fn declared_names(metadata: &Mapping) -> Option<Vec<String>> {
    let map = metadata.get(MCPS_KEY)?.as_mapping()?;
    Some(
        map.keys()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

/// Parse the service map. `None` when the metadata declares none.
///
/// `command` is either a string or a non-empty list whose tail becomes the
/// argument list (followed by any explicit `args`).
pub fn entries_from_metadata(metadata: &Mapping) -> Result<Option<Vec<McpEntry>>> {
    let Some(raw) = metadata.get(MCPS_KEY) else {
        return Ok(None);
    };
    let map = match raw {
        Value::Null => return Ok(None),
        Value::Mapping(map) => map,
        _ => {
            return Err(DeployError::missing_field(
                MCPS_KEY,
                "neutral metadata (expected a mapping)",
            ));
        }
    };

    let mut entries = Vec::with_capacity(map.len());
    for (key, value) in map {
        let Some(name) = key.as_str() else {
            continue;
        };
        entries.push(parse_entry(name, value)?);
    }
    Ok(Some(entries))
}

fn parse_entry(name: &str, value: &Value) -> Result<McpEntry> {
    let context = format!("{MCPS_KEY}.{name}");
    let fields = value
        .as_mapping()
        .ok_or_else(|| DeployError::missing_field("command", context.clone()))?;

    let (command, mut args) = match fields.get("command") {
        Some(Value::String(command)) if !command.trim().is_empty() => {
            (command.clone(), Vec::new())
        }
        Some(Value::Sequence(parts)) => {
            let mut parts = parts.iter().map(scalar_to_string);
            let head = parts
                .next()
                .flatten()
                .ok_or_else(|| DeployError::missing_field("command", context.clone()))?;
            (head, parts.flatten().collect())
        }
        _ => return Err(DeployError::missing_field("command", context)),
    };

    if let Some(Value::Sequence(extra)) = fields.get("args") {
        args.extend(extra.iter().filter_map(scalar_to_string));
    }

    let env = fields
        .get("env")
        .or_else(|| fields.get("environment"))
        .and_then(|env| serde_json::to_value(env).ok())
        .and_then(|env| match env {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    let enabled = fields
        .get("enabled")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok(McpEntry {
        name: name.to_string(),
        command,
        args,
        env,
        enabled,
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
