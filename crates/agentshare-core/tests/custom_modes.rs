mod support;

use serde_yaml::{Mapping, Value};

use agentshare_core::deploy::{Conflict, Orchestrator};
use agentshare_core::scan::scan_deployed;
use agentshare_core::types::{ArtifactKind, Scope};

use support::{Fixture, REVIEWER, builtin_registry, read, write};

const EXISTING_MODES: &str = r#"customModes:
  - slug: architect
    name: Architect
    description: Designs systems
    roleDefinition: You design systems.
    groups:
      - read
    source: project
"#;

fn modes(path: &std::path::Path) -> Vec<Mapping> {
    let root: Mapping = serde_yaml::from_str(&read(path)).unwrap();
    root.get("customModes")
        .and_then(Value::as_sequence)
        .unwrap()
        .iter()
        .map(|entry| entry.as_mapping().unwrap().clone())
        .collect()
}

#[test]
fn deploy_appends_entry_and_keeps_others() {
    let fixture = Fixture::new();
    fixture.write_agent("reviewer", REVIEWER);
    let modes_path = fixture.project.join(".kilocodemodes");
    write(&modes_path, EXISTING_MODES);
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);

    let outcome = orchestrator
        .deploy(
            ArtifactKind::Agent,
            "reviewer",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();

    assert_eq!(outcome.path, modes_path);
    assert!(!outcome.replaced);
    let entries = modes(&modes_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].get("slug"), Some(&Value::from("architect")));

    let reviewer = &entries[1];
    assert_eq!(reviewer.get("slug"), Some(&Value::from("reviewer")));
    assert_eq!(reviewer.get("name"), Some(&Value::from("reviewer")));
    assert_eq!(reviewer.get("description"), Some(&Value::from("Reviews code")));
    assert_eq!(
        reviewer.get("roleDefinition"),
        Some(&Value::from("You review code."))
    );
    assert_eq!(reviewer.get("source"), Some(&Value::from("project")));
    let groups = reviewer.get("groups").and_then(Value::as_sequence).unwrap();
    assert_eq!(groups.len(), 5);
}

#[test]
fn redeploy_replaces_entry_in_place() {
    let fixture = Fixture::new();
    fixture.write_agent("reviewer", REVIEWER);
    let modes_path = fixture.project.join(".kilocodemodes");
    write(&modes_path, EXISTING_MODES);
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);
    let deploy = || {
        orchestrator
            .deploy(
                ArtifactKind::Agent,
                "reviewer",
                "kilo_code_vscode",
                Scope::Project,
                Some(&fixture.project),
            )
            .unwrap()
    };

    deploy();
    let first = read(&modes_path);
    let second_outcome = deploy();

    assert!(second_outcome.replaced);
    assert!(!second_outcome.changed);
    assert_eq!(read(&modes_path), first);
    assert_eq!(modes(&modes_path).len(), 2);
}

#[test]
fn conflict_check_finds_slug() {
    let fixture = Fixture::new();
    let modes_path = fixture.project.join(".kilocodemodes");
    write(&modes_path, EXISTING_MODES);
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);

    let architect = orchestrator
        .check_conflict(
            ArtifactKind::Agent,
            "architect",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();
    assert_eq!(architect, Conflict::Exists(modes_path.clone()));

    let reviewer = orchestrator
        .check_conflict(
            ArtifactKind::Agent,
            "reviewer",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();
    assert!(reviewer.is_clear());

    let ids = scan_deployed(
        &orchestrator,
        ArtifactKind::Agent,
        "kilocode",
        Scope::Project,
        Some(&fixture.project),
    )
    .unwrap();
    assert_eq!(ids, vec!["architect".to_string()]);
}

#[test]
fn uninstall_removes_only_matching_entry() {
    let fixture = Fixture::new();
    fixture.write_agent("reviewer", REVIEWER);
    let modes_path = fixture.project.join(".kilocodemodes");
    write(&modes_path, EXISTING_MODES);
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);

    orchestrator
        .deploy(
            ArtifactKind::Agent,
            "reviewer",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();
    let outcome = orchestrator
        .uninstall(
            ArtifactKind::Agent,
            "reviewer",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();

    assert!(outcome.removed);
    let entries = modes(&modes_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].get("slug"), Some(&Value::from("architect")));
}

#[test]
fn extract_reads_entry_back_into_repository() {
    let fixture = Fixture::new();
    let modes_path = fixture.project.join(".kilocodemodes");
    write(&modes_path, EXISTING_MODES);
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);

    orchestrator
        .extract(
            ArtifactKind::Agent,
            "architect",
            "kilocode",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();

    let artifact = orchestrator
        .store()
        .load(ArtifactKind::Agent, "architect")
        .unwrap();
    assert_eq!(artifact.name(), "architect");
    assert_eq!(
        artifact.metadata.get("description"),
        Some(&Value::from("Designs systems"))
    );
    assert_eq!(artifact.body, "You design systems.");
    assert_eq!(
        agentshare_core::frontmatter::get_dotted(&artifact.metadata, "platforms.kilo_code.groups"),
        Some(&Value::Sequence(vec![Value::from("read")]))
    );
}
