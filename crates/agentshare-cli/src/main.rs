//! AgentShare - deploy agents and skills across AI coding assistants
//!
//! Usage:
//!   agentshare platforms                      # List platforms and install state
//!   agentshare status                         # Per-platform deployment summary
//!   agentshare agent deploy <id> -p <p|all>   # Deploy a neutral agent
//!   agentshare skill extract <id> -p <p>      # Pull a platform skill back
//!   agentshare config --language en           # Update preferences

mod prompt;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentshare_core::context::AppContext;
use agentshare_core::deploy::{Conflict, FanOutReport, Orchestrator, TargetFailure};
use agentshare_core::scan::{PlatformSummary, platform_summaries};
use agentshare_core::schema::SchemaRegistry;
use agentshare_core::types::{ArtifactKind, Scope};

use crate::prompt::ConflictPrompt;

const ALL_PLATFORMS: &str = "all";

#[derive(Parser)]
#[command(name = "agentshare")]
#[command(about = "Deploy agents and skills across AI coding assistants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known platforms and whether they are installed
    Platforms {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show what is deployed on each platform
    Status {
        /// Project root used for project-scope listings (detected by default)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Manage agents
    Agent(ArtifactArgs),

    /// Manage skills
    Skill(ArtifactArgs),

    /// Update preferences
    Config {
        /// Preferred UI language code
        #[arg(long)]
        language: Option<String>,

        /// Extra directory of platform descriptors
        #[arg(long, value_name = "DIR")]
        add_descriptor_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum ScopeArg {
    /// User-level install
    #[default]
    Global,
    /// Inside the detected project
    Project,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Global => Scope::Global,
            ScopeArg::Project => Scope::Project,
        }
    }
}

#[derive(Args)]
struct ArtifactArgs {
    #[command(subcommand)]
    action: ArtifactAction,
}

#[derive(Subcommand)]
enum ArtifactAction {
    /// Copy from the repository onto platforms
    Deploy(TargetArgs),
    /// Copy from a platform back into the repository
    Extract(TargetArgs),
    /// Remove from platforms
    #[command(alias = "rm")]
    Uninstall(TargetArgs),
    /// List artifacts in the repository
    List,
}

#[derive(Args)]
struct TargetArgs {
    /// Artifact identifier
    id: String,

    /// Platform name or alias, or `all`
    #[arg(short, long)]
    platform: String,

    /// Deployment scope
    #[arg(short, long, default_value = "global")]
    scope: ScopeArg,

    /// Overwrite existing deployments without asking
    #[arg(short, long)]
    yes: bool,

    /// Project root for project scope (detected by default)
    #[arg(long)]
    project: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agentshare=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::from_env().context("Failed to set up application context")?;

    match cli.command {
        Commands::Platforms { format } => run_platforms(&ctx, format),
        Commands::Status { project, format } => run_status(ctx, project, format),
        Commands::Agent(args) => run_artifact(ctx, ArtifactKind::Agent, args.action),
        Commands::Skill(args) => run_artifact(ctx, ArtifactKind::Skill, args.action),
        Commands::Config {
            language,
            add_descriptor_dir,
        } => run_config(&ctx, language, add_descriptor_dir),
    }
}

fn load_registry(ctx: &AppContext) -> Result<SchemaRegistry> {
    ctx.registry().context("Failed to load platform descriptors")
}

fn run_platforms(ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let registry = load_registry(ctx)?;
    let orchestrator = ctx.orchestrator(&registry);
    let resolver = orchestrator.resolver();

    match format {
        OutputFormat::Table => {
            println!(
                "  {:<18} {:<24} {:<10} Features",
                "Name", "Display name", "Installed"
            );
            println!("  {}", "-".repeat(70));
            for descriptor in orchestrator.ordered_platforms() {
                let installed = if resolver.is_installed(descriptor) {
                    style("yes").green()
                } else {
                    style("no").dim()
                };
                println!(
                    "  {:<18} {:<24} {:<10} {}",
                    descriptor.name,
                    descriptor.display_name,
                    installed,
                    descriptor.features.join(", ")
                );
            }
        }
        OutputFormat::Json => {
            let platforms: Vec<_> = orchestrator
                .ordered_platforms()
                .into_iter()
                .map(|descriptor| {
                    serde_json::json!({
                        "name": descriptor.name,
                        "display_name": descriptor.display_name,
                        "aliases": descriptor.aliases,
                        "features": descriptor.features,
                        "installed": resolver.is_installed(descriptor),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&platforms)?);
        }
    }
    Ok(())
}

fn run_status(ctx: AppContext, project: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let ctx = match project {
        Some(project) => ctx.with_project_root(Some(project)),
        None => ctx,
    };
    let registry = load_registry(&ctx)?;
    let orchestrator = ctx.orchestrator(&registry);
    let summaries = platform_summaries(&orchestrator, ctx.project_root());

    match format {
        OutputFormat::Table => print_status_table(&ctx, &orchestrator, &summaries)?,
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
    }
    Ok(())
}

fn print_status_table(
    ctx: &AppContext,
    orchestrator: &Orchestrator<'_>,
    summaries: &[PlatformSummary],
) -> Result<()> {
    println!("Repository: {}", ctx.repo_root().display());
    match ctx.project_root() {
        Some(root) => println!("Project: {}", root.display()),
        None => println!("Project: {}", style("not detected").dim()),
    }
    println!();

    let agents = orchestrator.store().list_agents()?;
    let skills = orchestrator.store().list_skills()?;
    println!("Repository agents ({}): {}", agents.len(), join_or_none(&agents));
    println!("Repository skills ({}): {}", skills.len(), join_or_none(&skills));
    println!();

    for summary in summaries.iter().filter(|summary| summary.installed) {
        println!("{}", style(&summary.display_name).bold());
        println!("  Global agents:  {}", join_or_none(&summary.global_agents));
        println!("  Global skills:  {}", join_or_none(&summary.global_skills));
        if ctx.project_root().is_some() {
            println!("  Project agents: {}", join_or_none(&summary.project_agents));
            println!("  Project skills: {}", join_or_none(&summary.project_skills));
        }
    }

    let missing: Vec<_> = summaries
        .iter()
        .filter(|summary| !summary.installed)
        .map(|summary| summary.name.clone())
        .collect();
    if !missing.is_empty() {
        println!();
        println!("Not installed: {}", missing.join(", "));
    }
    Ok(())
}

fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

fn run_artifact(ctx: AppContext, kind: ArtifactKind, action: ArtifactAction) -> Result<()> {
    let args = match action {
        ArtifactAction::List => {
            let registry = load_registry(&ctx)?;
            let orchestrator = ctx.orchestrator(&registry);
            for id in orchestrator.store().list(kind)? {
                println!("{id}");
            }
            return Ok(());
        }
        ArtifactAction::Deploy(ref args)
        | ArtifactAction::Extract(ref args)
        | ArtifactAction::Uninstall(ref args) => args,
    };

    let ctx = match &args.project {
        Some(project) => ctx.with_project_root(Some(project.clone())),
        None => ctx,
    };
    let scope = Scope::from(args.scope);
    if scope == Scope::Project && ctx.project_root().is_none() {
        anyhow::bail!(
            "No project root detected. Run inside a project (a directory with .git, \
             package.json, Cargo.toml, ...) or pass --project DIR"
        );
    }

    let registry = load_registry(&ctx)?;
    let orchestrator = ctx.orchestrator(&registry);
    let run = ArtifactRun {
        orchestrator: &orchestrator,
        kind,
        id: &args.id,
        scope,
        project_root: ctx.project_root(),
    };

    let ok = match action {
        ArtifactAction::Deploy(_) => run.deploy(&args.platform, args.yes)?,
        ArtifactAction::Extract(_) => run.extract(&args.platform)?,
        ArtifactAction::Uninstall(_) => run.uninstall(&args.platform)?,
        ArtifactAction::List => true,
    };
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// One lifecycle command against one or all platforms.
struct ArtifactRun<'o, 'a> {
    orchestrator: &'o Orchestrator<'a>,
    kind: ArtifactKind,
    id: &'o str,
    scope: Scope,
    project_root: Option<&'o std::path::Path>,
}

impl ArtifactRun<'_, '_> {
    /// Explicit platforms resolve through aliases; `all` fans out over
    /// every platform that can take this kind at this scope.
    fn targets(&self, platform: &str) -> Result<Vec<String>> {
        if platform.eq_ignore_ascii_case(ALL_PLATFORMS) {
            let targets = self.orchestrator.fan_out_targets(self.kind, self.scope);
            if targets.is_empty() {
                anyhow::bail!(
                    "No installed platform supports {}s at {} scope",
                    self.kind,
                    self.scope
                );
            }
            tracing::debug!(targets = ?targets, "Fan-out targets");
            return Ok(targets);
        }
        let descriptor = self.orchestrator.registry().require(platform)?;
        Ok(vec![descriptor.name.clone()])
    }

    /// Deploy clear targets first, then ask about each conflicting one.
    fn deploy(&self, platform: &str, assume_yes: bool) -> Result<bool> {
        let targets = self.targets(platform)?;
        let plan = self.orchestrator.plan_deploy(
            self.kind,
            self.id,
            &targets,
            self.scope,
            self.project_root,
        );

        let deploy_one = |platform: &str| {
            self.orchestrator
                .deploy(self.kind, self.id, platform, self.scope, self.project_root)
        };
        let mut report = self.orchestrator.fan_out(&plan.clear, deploy_one);
        report.failures.extend(plan.failures);

        let prompt = ConflictPrompt::new(assume_yes);
        let mut approved = Vec::new();
        for platform in &plan.conflicting {
            let conflict = self.orchestrator.check_conflict(
                self.kind,
                self.id,
                platform,
                self.scope,
                self.project_root,
            )?;
            let location = match conflict {
                Conflict::Exists(path) => path,
                Conflict::Clear => {
                    approved.push(platform.clone());
                    continue;
                }
            };
            if prompt.confirm_overwrite(self.id, platform, &location)? {
                approved.push(platform.clone());
            } else {
                println!("  {} {} (kept existing)", style("-").dim(), platform);
            }
        }
        report.absorb(self.orchestrator.fan_out(&approved, deploy_one));

        for outcome in &report.succeeded {
            let verb = match (outcome.replaced, outcome.changed) {
                (false, _) => "Deployed",
                (true, true) => "Updated",
                (true, false) => "Unchanged",
            };
            println!(
                "{} {} '{}' to {} ({})",
                style("✓").green(),
                verb,
                self.id,
                outcome.platform,
                outcome.path.display()
            );
            if let Some(aux) = &outcome.aux_config {
                println!("    MCP servers merged into {}", aux.display());
            }
        }
        Ok(print_failures(&report))
    }

    /// Extract from one platform, or from every platform where the
    /// artifact is currently deployed.
    fn extract(&self, platform: &str) -> Result<bool> {
        let mut targets = self.targets(platform)?;
        if platform.eq_ignore_ascii_case(ALL_PLATFORMS) {
            targets.retain(|platform| {
                matches!(
                    self.orchestrator.check_conflict(
                        self.kind,
                        self.id,
                        platform,
                        self.scope,
                        self.project_root
                    ),
                    Ok(Conflict::Exists(_))
                )
            });
            if targets.is_empty() {
                anyhow::bail!("'{}' is not deployed on any platform", self.id);
            }
        }

        let report = self.orchestrator.fan_out(&targets, |platform| {
            self.orchestrator
                .extract(self.kind, self.id, platform, self.scope, self.project_root)
        });
        for outcome in &report.succeeded {
            println!(
                "{} Extracted '{}' from {} into {}",
                style("✓").green(),
                self.id,
                outcome.platform,
                outcome.artifact_path.display()
            );
        }
        Ok(print_failures(&report))
    }

    fn uninstall(&self, platform: &str) -> Result<bool> {
        let targets = self.targets(platform)?;
        let report = self.orchestrator.fan_out(&targets, |platform| {
            self.orchestrator
                .uninstall(self.kind, self.id, platform, self.scope, self.project_root)
        });
        for outcome in &report.succeeded {
            if outcome.removed {
                println!(
                    "{} Uninstalled '{}' from {}",
                    style("✓").green(),
                    self.id,
                    outcome.platform
                );
            } else {
                println!(
                    "  {} '{}' was not deployed on {}",
                    style("-").dim(),
                    self.id,
                    outcome.platform
                );
            }
            if outcome.aux_removed {
                println!("    MCP servers removed");
            }
        }
        Ok(print_failures(&report))
    }
}

/// Print aggregated failures. Returns whether the run succeeded.
fn print_failures<T>(report: &FanOutReport<T>) -> bool {
    for failure in &report.failures {
        print_failure(failure);
    }
    report.is_success()
}

fn print_failure(failure: &TargetFailure) {
    eprintln!("{} {}", style("✗").red(), failure);
}

fn run_config(
    ctx: &AppContext,
    language: Option<String>,
    add_descriptor_dir: Option<PathBuf>,
) -> Result<()> {
    let store = ctx.config_store();
    let mut config = store.load();
    let mut changed = false;

    if let Some(language) = language {
        config.language = Some(language);
        changed = true;
    }
    if let Some(dir) = add_descriptor_dir {
        let dir = std::fs::canonicalize(&dir)
            .with_context(|| format!("Descriptor directory not found: {}", dir.display()))?;
        changed |= config.add_descriptor_dir(dir);
    }

    if changed {
        store.save(&config)?;
        println!("Saved {}", store.config_path().display());
    }
    println!("Language: {}", config.language.as_deref().unwrap_or("(unset)"));
    if config.descriptor_dirs.is_empty() {
        println!("Descriptor dirs: (none)");
    } else {
        println!("Descriptor dirs:");
        for dir in &config.descriptor_dirs {
            println!("  {}", dir.display());
        }
    }
    Ok(())
}
