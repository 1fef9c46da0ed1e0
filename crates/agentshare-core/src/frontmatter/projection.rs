//! Field mapping between neutral and platform metadata.
//!
//! Only fields declared by an output definition cross the boundary; anything
//! else is dropped on the platform side and is not expected to round-trip.

use serde_yaml::{Mapping, Value};

use crate::error::{DeployError, Result};
use crate::schema::{FieldSpec, OutputDefinition};

/// Fields every agent and skill document must carry.
pub const REQUIRED_FIELDS: [&str; 2] = ["name", "description"];

/// Read a value at a dotted path such as `platforms.opencode.mode`.
pub fn get_dotted<'a>(mapping: &'a Mapping, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = mapping.get(first)?;
    for segment in segments {
        current = current.as_mapping()?.get(segment)?;
    }
    Some(current)
}

/// Write a value at a dotted path, creating intermediate mappings and
/// replacing any non-mapping value found on the way.
pub fn set_dotted(mapping: &mut Mapping, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = mapping;
    for segment in segments {
        let key = Value::String(segment.to_string());
        let slot = current
            .entry(key)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !slot.is_mapping() {
            *slot = Value::Mapping(Mapping::new());
        }
        let Value::Mapping(next) = slot else {
            return;
        };
        current = next;
    }
    current.insert(Value::String(last.to_string()), value);
}

/// Whether a required field holds a usable value.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Fail with `MissingRequiredField` unless `name` and `description` are set.
pub fn require_identity_fields(metadata: &Mapping, context: &str) -> Result<()> {
    for field in REQUIRED_FIELDS {
        if !is_present(metadata.get(field)) {
            return Err(DeployError::missing_field(field, context));
        }
    }
    Ok(())
}

/// Build platform metadata from neutral metadata, in the output's declared
/// field order. Declared `defaults` fill fields left unset.
pub fn project_to_platform(neutral: &Mapping, output: &OutputDefinition) -> Result<Mapping> {
    let mut projected = Mapping::new();

    for spec in &output.frontmatter {
        let name = spec.output_name();
        if output.is_excluded(name) {
            continue;
        }
        let value = match spec {
            FieldSpec::Bare(field) => neutral.get(field.as_str()),
            FieldSpec::Mapped { source, .. } => get_dotted(neutral, source),
        };
        if let Some(value) = value.filter(|v| !v.is_null()) {
            projected.insert(Value::String(name.to_string()), value.clone());
        }
    }

    for (key, value) in &output.defaults {
        let excluded = key.as_str().is_some_and(|k| output.is_excluded(k));
        if !excluded && !projected.contains_key(key) {
            projected.insert(key.clone(), value.clone());
        }
    }

    require_identity_fields(&projected, "platform metadata")?;
    Ok(projected)
}

/// Rebuild neutral metadata from platform metadata.
///
/// A missing `name` falls back to `fallback_id`; `description` stays
/// mandatory.
pub fn project_from_platform(
    platform: &Mapping,
    output: &OutputDefinition,
    fallback_id: &str,
) -> Result<Mapping> {
    let mut neutral = Mapping::new();

    for spec in &output.frontmatter {
        let Some(value) = platform.get(spec.output_name()).filter(|v| !v.is_null()) else {
            continue;
        };
        match spec {
            FieldSpec::Bare(field) => {
                neutral.insert(Value::String(field.clone()), value.clone());
            }
            FieldSpec::Mapped { source, .. } => set_dotted(&mut neutral, source, value.clone()),
        }
    }

    if !is_present(neutral.get("name")) {
        neutral.insert("name".into(), Value::String(fallback_id.to_string()));
    }
    require_identity_fields(&neutral, "extracted metadata")?;
    Ok(neutral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::OutputDefinition;

    fn output(frontmatter: Vec<FieldSpec>) -> OutputDefinition {
        OutputDefinition {
            target: "agents/{id}.md".to_string(),
            format: Default::default(),
            frontmatter,
            exclude_fields: Vec::new(),
            include_body: true,
            defaults: Mapping::new(),
            key: None,
            template: None,
            entry_format: Default::default(),
            list: None,
        }
    }

    fn mapped(output: &str, source: &str) -> FieldSpec {
        FieldSpec::Mapped {
            output: output.to_string(),
            source: source.to_string(),
        }
    }

    fn neutral() -> Mapping {
        serde_yaml::from_str(
            "name: reviewer\ndescription: Reviews code\ntools: [read]\nplatforms:\n  demo:\n    model: fast\n",
        )
        .expect("yaml")
    }

    #[test]
    fn test_dotted_get_and_set() {
        let mut map = Mapping::new();
        set_dotted(&mut map, "a.b.c", Value::from(1));
        assert_eq!(get_dotted(&map, "a.b.c"), Some(&Value::from(1)));
        assert_eq!(get_dotted(&map, "a.x"), None);

        map.insert("flat".into(), "scalar".into());
        set_dotted(&mut map, "flat.inner", Value::from(true));
        assert_eq!(get_dotted(&map, "flat.inner"), Some(&Value::from(true)));
    }

    #[test]
    fn test_project_to_platform_follows_declared_order() {
        let def = output(vec![
            FieldSpec::Bare("description".to_string()),
            FieldSpec::Bare("name".to_string()),
            mapped("model", "platforms.demo.model"),
        ]);
        let projected = project_to_platform(&neutral(), &def).expect("project");

        let keys: Vec<_> = projected.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["description", "name", "model"]);
        assert_eq!(projected.get("model"), Some(&Value::from("fast")));
        assert!(projected.get("tools").is_none());
    }

    #[test]
    fn test_project_to_platform_honors_exclusions_and_defaults() {
        let mut def = output(vec![
            FieldSpec::Bare("name".to_string()),
            FieldSpec::Bare("description".to_string()),
            mapped("model", "platforms.demo.model"),
        ]);
        def.exclude_fields = vec!["model".to_string()];
        def.defaults.insert("mode".into(), "primary".into());
        def.defaults.insert("model".into(), "ignored".into());

        let projected = project_to_platform(&neutral(), &def).expect("project");
        assert!(projected.get("model").is_none());
        assert_eq!(projected.get("mode"), Some(&Value::from("primary")));
    }

    #[test]
    fn test_project_to_platform_requires_description() {
        let def = output(vec![
            FieldSpec::Bare("name".to_string()),
            FieldSpec::Bare("description".to_string()),
        ]);
        let mut meta = neutral();
        meta.remove("description");

        let err = project_to_platform(&meta, &def).expect_err("missing description");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    }

    #[test]
    fn test_project_from_platform_falls_back_to_id() {
        let def = output(vec![
            FieldSpec::Bare("name".to_string()),
            FieldSpec::Bare("description".to_string()),
        ]);
        let platform: Mapping = serde_yaml::from_str("description: Reviews code\n").expect("yaml");
        let neutral = project_from_platform(&platform, &def, "reviewer").expect("project back");
        assert_eq!(neutral.get("name"), Some(&Value::from("reviewer")));
    }

    #[test]
    fn test_round_trip_preserves_declared_fields() {
        let def = output(vec![
            FieldSpec::Bare("name".to_string()),
            FieldSpec::Bare("description".to_string()),
            mapped("model", "platforms.demo.model"),
        ]);
        let original = neutral();
        let projected = project_to_platform(&original, &def).expect("project");
        let back = project_from_platform(&projected, &def, "reviewer").expect("project back");

        assert_eq!(back.get("name"), original.get("name"));
        assert_eq!(back.get("description"), original.get("description"));
        assert_eq!(
            get_dotted(&back, "platforms.demo.model"),
            get_dotted(&original, "platforms.demo.model")
        );
        // Undeclared fields are lost on the platform side.
        assert!(back.get("tools").is_none());
    }
}
