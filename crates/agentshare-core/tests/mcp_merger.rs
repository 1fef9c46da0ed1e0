mod support;

use serde_json::{Value, json};

use agentshare_core::ErrorKind;
use agentshare_core::mcp::McpMerger;
use agentshare_core::resolver::PathResolver;
use agentshare_core::types::Scope;

use support::{Fixture, builtin_registry, read, write};

fn metadata(yaml: &str) -> serde_yaml::Mapping {
    serde_yaml::from_str(yaml).unwrap()
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&read(path)).unwrap()
}

const WITH_MCPS: &str = r#"
name: reviewer
description: Reviews code
mcps:
  filesystem:
    command: npx
    args: ["-y", "@modelcontextprotocol/server-filesystem"]
    env:
      ROOT: /tmp
  disabled-one:
    command: ["uvx", "thing"]
    enabled: false
"#;

#[test]
fn merge_preserves_unrelated_keys() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);
    let config = fixture.home.join(".claude.json");
    write(
        &config,
        r#"{"theme": "dark", "mcpServers": {"existing": {"command": "echo"}}}"#,
    );

    let written = McpMerger::new(&resolver)
        .apply(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();

    assert_eq!(written, Some(config.clone()));
    let value = read_json(&config);
    assert_eq!(value["theme"], json!("dark"));
    assert_eq!(value["mcpServers"]["existing"], json!({"command": "echo"}));
    assert_eq!(
        value["mcpServers"]["filesystem"],
        json!({
            "command": "npx",
            "args": ["-y", "@modelcontextprotocol/server-filesystem"],
            "env": {"ROOT": "/tmp"}
        })
    );
    assert!(value["mcpServers"].get("disabled-one").is_none());
}

#[test]
fn merge_twice_does_not_duplicate() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);
    let merger = McpMerger::new(&resolver);

    merger
        .apply(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();
    let first = read(&fixture.home.join(".claude.json"));
    merger
        .apply(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();
    let second = read(&fixture.home.join(".claude.json"));

    assert_eq!(first, second);
}

#[test]
fn only_disabled_entries_write_nothing() {
    let fixture = Fixture::new();
    fixture.install(".config/opencode");
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);
    let only_disabled = metadata(
        r#"
name: reviewer
description: Reviews code
mcps:
  disabled-one:
    command: ["uvx", "thing"]
    enabled: false
"#,
    );

    let merger = McpMerger::new(&resolver);
    let claude = merger
        .apply(&only_disabled, "claude_code", Scope::Global, None)
        .unwrap();
    let opencode = merger
        .apply(&only_disabled, "opencode", Scope::Global, None)
        .unwrap();

    assert_eq!(claude, None);
    assert_eq!(opencode, None);
    assert!(!fixture.home.join(".claude.json").exists());
    assert!(!fixture.home.join(".config/opencode/opencode.json").exists());
}

#[test]
fn remove_drops_only_declared_entries() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);
    let merger = McpMerger::new(&resolver);
    let config = fixture.home.join(".claude.json");
    write(
        &config,
        r#"{"theme": "dark", "mcpServers": {"existing": {"command": "echo"}}}"#,
    );

    merger
        .apply(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();
    let removed = merger
        .remove(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();

    assert!(removed);
    let value = read_json(&config);
    assert_eq!(value["theme"], json!("dark"));
    assert_eq!(value["mcpServers"], json!({"existing": {"command": "echo"}}));

    let again = merger
        .remove(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap();
    assert!(!again);
}

#[test]
fn template_bootstraps_missing_config() {
    let fixture = Fixture::new();
    let opencode_root = fixture.install(".config/opencode");
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);

    let written = McpMerger::new(&resolver)
        .apply(&metadata(WITH_MCPS), "opencode", Scope::Global, None)
        .unwrap()
        .unwrap();

    assert_eq!(written, opencode_root.join("opencode.json"));
    let value = read_json(&written);
    assert_eq!(value["$schema"], json!("https://opencode.ai/config.json"));
    assert_eq!(
        value["mcp"]["filesystem"],
        json!({
            "type": "local",
            "command": ["npx", "-y", "@modelcontextprotocol/server-filesystem"],
            "environment": {"ROOT": "/tmp"},
            "enabled": true
        })
    );
}

#[test]
fn existing_config_ignores_template() {
    let fixture = Fixture::new();
    let opencode_root = fixture.install(".config/opencode");
    let config = opencode_root.join("opencode.json");
    write(&config, r#"{"model": "x", "mcp": {}}"#);
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);

    McpMerger::new(&resolver)
        .apply(&metadata(WITH_MCPS), "opencode", Scope::Global, None)
        .unwrap();

    let value = read_json(&config);
    assert_eq!(value["model"], json!("x"));
    assert!(value.get("$schema").is_none());
    assert!(value["mcp"].get("filesystem").is_some());
}

#[test]
fn project_scope_writes_project_file() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);

    let written = McpMerger::new(&resolver)
        .apply(
            &metadata(WITH_MCPS),
            "claude_code",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();

    assert_eq!(written, Some(fixture.project.join(".mcp.json")));
    assert!(!fixture.home.join(".claude.json").exists());
}

#[test]
fn platform_without_mcp_output_is_skipped() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);

    let written = McpMerger::new(&resolver)
        .apply(&metadata(WITH_MCPS), "github_copilot", Scope::Global, None)
        .unwrap();

    assert_eq!(written, None);
}

#[test]
fn non_object_section_is_rejected() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let resolver = PathResolver::new(&registry, &fixture.home);
    let config = fixture.home.join(".claude.json");
    write(&config, r#"{"mcpServers": []}"#);

    let err = McpMerger::new(&resolver)
        .apply(&metadata(WITH_MCPS), "claude_code", Scope::Global, None)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(read(&config), r#"{"mcpServers": []}"#);
}
