mod support;

use agentshare_core::ErrorKind;
use agentshare_core::deploy::Orchestrator;
use agentshare_core::scan::platform_summaries;
use agentshare_core::types::{ArtifactKind, Scope};

use support::{Fixture, REVIEWER, builtin_registry, registry_from, simple_descriptor, write};

fn three_platforms(fixture: &Fixture) -> std::path::PathBuf {
    fixture.descriptor_dir(&[
        ("alpha.toml", simple_descriptor("alpha", 1).as_str()),
        ("beta.toml", simple_descriptor("beta", 2).as_str()),
        ("gamma.toml", simple_descriptor("gamma", 3).as_str()),
    ])
}

#[test]
fn failure_on_one_platform_does_not_abort_the_rest() {
    let fixture = Fixture::new();
    for name in [".alpha", ".beta", ".gamma"] {
        fixture.install(name);
    }
    // A regular file where beta's agents directory should be.
    write(&fixture.home.join(".beta/agents"), "not a directory");
    let registry = registry_from(&three_platforms(&fixture));
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);
    fixture.write_agent("reviewer", REVIEWER);

    let report = orchestrator.deploy_all(ArtifactKind::Agent, "reviewer", Scope::Global, None);

    let succeeded: Vec<_> = report
        .succeeded
        .iter()
        .map(|outcome| outcome.platform.as_str())
        .collect();
    assert_eq!(succeeded, vec!["alpha", "gamma"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].platform, "beta");
    assert_eq!(report.failures[0].kind, ErrorKind::Io);
    assert!(!report.is_success());
    assert!(fixture.home.join(".gamma/agents/reviewer.md").is_file());
}

#[test]
fn global_fan_out_skips_uninstalled_platforms() {
    let fixture = Fixture::new();
    fixture.install(".alpha");
    fixture.install(".gamma");
    let registry = registry_from(&three_platforms(&fixture));
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);

    assert_eq!(
        orchestrator.fan_out_targets(ArtifactKind::Agent, Scope::Global),
        vec!["alpha".to_string(), "gamma".to_string()]
    );
    assert_eq!(
        orchestrator.fan_out_targets(ArtifactKind::Agent, Scope::Project),
        vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]
    );
    assert!(
        orchestrator
            .fan_out_targets(ArtifactKind::Skill, Scope::Global)
            .is_empty()
    );
}

#[test]
fn plan_partitions_clear_and_conflicting_targets() {
    let fixture = Fixture::new();
    let registry = builtin_registry();
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);
    fixture.write_agent("reviewer", REVIEWER);
    write(
        &fixture.project.join(".opencode/agents/reviewer.md"),
        "---\nname: reviewer\ndescription: old\n---\n",
    );

    let platforms: Vec<String> = ["claude_code", "opencode", "nope", "github_copilot"]
        .iter()
        .map(|p| p.to_string())
        .collect();
    let plan = orchestrator.plan_deploy(
        ArtifactKind::Agent,
        "reviewer",
        &platforms,
        Scope::Project,
        Some(&fixture.project),
    );

    assert_eq!(plan.clear, vec!["claude_code", "github_copilot"]);
    assert_eq!(plan.conflicting, vec!["opencode"]);
    assert_eq!(plan.failures.len(), 1);
    assert_eq!(plan.failures[0].kind, ErrorKind::UnsupportedPlatform);
    assert!(!fixture.project.join(".claude").exists());
}

#[test]
fn uninstall_all_reports_each_platform() {
    let fixture = Fixture::new();
    for name in [".alpha", ".beta", ".gamma"] {
        fixture.install(name);
    }
    let registry = registry_from(&three_platforms(&fixture));
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);
    fixture.write_agent("reviewer", REVIEWER);
    orchestrator
        .deploy(ArtifactKind::Agent, "reviewer", "beta", Scope::Global, None)
        .unwrap();

    let report = orchestrator.uninstall_all(ArtifactKind::Agent, "reviewer", Scope::Global, None);

    assert!(report.is_success());
    let removed: Vec<_> = report
        .succeeded
        .iter()
        .filter(|outcome| outcome.removed)
        .map(|outcome| outcome.platform.as_str())
        .collect();
    assert_eq!(removed, vec!["beta"]);
    assert_eq!(report.succeeded.len(), 3);
}

#[test]
fn summaries_count_deployments_per_scope() {
    let fixture = Fixture::new();
    fixture.install(".alpha");
    let registry = registry_from(&three_platforms(&fixture));
    let orchestrator = Orchestrator::new(&registry, &fixture.home, &fixture.repo);
    fixture.write_agent("reviewer", REVIEWER);
    orchestrator
        .deploy(ArtifactKind::Agent, "reviewer", "alpha", Scope::Global, None)
        .unwrap();
    orchestrator
        .deploy(
            ArtifactKind::Agent,
            "reviewer",
            "gamma",
            Scope::Project,
            Some(&fixture.project),
        )
        .unwrap();

    let summaries = platform_summaries(&orchestrator, Some(&fixture.project));

    assert_eq!(summaries.len(), 3);
    let alpha = &summaries[0];
    assert!(alpha.installed);
    assert_eq!(alpha.global_agents, vec!["reviewer"]);
    assert!(alpha.project_agents.is_empty());
    let gamma = &summaries[2];
    assert!(!gamma.installed);
    assert!(gamma.global_agents.is_empty());
    assert_eq!(gamma.project_agents, vec!["reviewer"]);
}
