use anyhow::{Context, Result};
use assetgraph_cache::CacheStatus;
use assetgraph_core::{Config, Severity, CONFIG_FILE_NAME};
use assetgraph_manifest::{CompileOutcome, Project};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// assetgraph - compile data asset definitions into lineage and manifests
#[derive(Parser)]
#[command(name = "assetgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root (default: current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default assetgraph.toml in the project root
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Compile all assets, reusing cached artifacts when nothing changed
    Compile {
        /// Ignore the cache and recompile
        #[arg(short, long)]
        force: bool,

        /// Print the manifest as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show upstream and downstream assets of one asset
    Lineage {
        /// Asset id
        asset: String,

        /// Follow dependencies transitively
        #[arg(short, long)]
        transitive: bool,
    },

    /// Print the build order, one asset per line
    Order,

    /// Inspect or clear the metadata cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show whether each cached artifact matches the asset files
    Status,

    /// Remove all cached artifacts
    Clear,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if let Commands::Init { force } = cli.command {
        return init_command(&cli.project, force);
    }

    let project = Project::open(&cli.project)
        .with_context(|| format!("Failed to open project at {}", cli.project.display()))?;

    if cli.verbose {
        eprintln!(
            "{} {} ({})",
            "Project:".cyan(),
            project.config().project.name,
            project.config().project_root.display()
        );
    }

    match cli.command {
        Commands::Init { .. } => unreachable!("handled before the project is opened"),
        Commands::Compile { force, json } => compile_command(&project, force, json),
        Commands::Lineage { asset, transitive } => lineage_command(&project, &asset, transitive),
        Commands::Order => order_command(&project),
        Commands::Cache { action } => match action {
            CacheAction::Status => cache_status_command(&project),
            CacheAction::Clear => cache_clear_command(&project),
        },
    }
}

/// Init command - write the effective config so it can be edited
fn init_command(root: &Path, force: bool) -> Result<()> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = Config::for_project(root)?;
    config.save_to_file(&path)?;
    println!("{} {}", "Created".green(), path.display());
    Ok(())
}

fn compile(project: &Project, force: bool) -> Result<CompileOutcome> {
    let outcome = project.compile(force).context("Compilation failed")?;
    tracing::debug!(
        cache_hit = outcome.cache_hit,
        parsed = outcome.assets_parsed,
        files = outcome.fingerprints.len(),
        "compile finished"
    );
    Ok(outcome)
}

/// Compile command - build or load all artifacts
fn compile_command(project: &Project, force: bool, json: bool) -> Result<()> {
    let outcome = compile(project, force)?;
    let manifest = &outcome.artifacts.manifest;

    if json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    let source = if outcome.cache_hit {
        "from cache".green()
    } else {
        format!("{} files parsed", outcome.assets_parsed).yellow()
    };
    println!(
        "{} {} assets, {} edges, {} external sources ({})",
        "Compiled".green().bold(),
        manifest.project.asset_count,
        outcome.artifacts.lineage.edges.len(),
        outcome.artifacts.lineage.external_sources.len(),
        source
    );
    println!("{} {}", "Tests:".bold(), outcome.artifacts.tests.total());

    let warnings: Vec<_> = manifest
        .warnings()
        .filter(|w| w.severity == Severity::Warn)
        .collect();
    if !warnings.is_empty() {
        println!();
        println!("{}", format!("{} warning(s):", warnings.len()).yellow().bold());
        for warning in warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    Ok(())
}

/// Lineage command - show neighbours of an asset
fn lineage_command(project: &Project, asset: &str, transitive: bool) -> Result<()> {
    let outcome = compile(project, false)?;
    let graph = outcome.artifacts.graph();

    if !graph.contains(asset) {
        anyhow::bail!("Asset '{}' not found in project", asset);
    }

    let (upstream, downstream) = if transitive {
        (graph.transitive_upstream(asset), graph.transitive_downstream(asset))
    } else {
        (
            graph.upstream(asset).into_iter().cloned().collect(),
            graph.downstream(asset).into_iter().cloned().collect(),
        )
    };

    println!("{} {}", "Asset:".bold(), asset.green());
    if graph.is_external(asset) {
        println!("{}", "(external source)".dimmed());
    }

    for (label, ids) in [("Upstream", &upstream), ("Downstream", &downstream)] {
        println!();
        println!("{} ({})", label.bold(), ids.len());
        if ids.is_empty() {
            println!("  {}", "none".dimmed());
        }
        for id in ids {
            if graph.is_external(id) {
                println!("  {} {}", id.yellow(), "(external)".dimmed());
            } else {
                println!("  {}", id);
            }
        }
    }

    Ok(())
}

/// Order command - print the topological build order
fn order_command(project: &Project) -> Result<()> {
    let outcome = compile(project, false)?;
    for id in &outcome.artifacts.manifest.project.build_order {
        println!("{}", id);
    }
    Ok(())
}

fn cache_status_command(project: &Project) -> Result<()> {
    println!("{} {}", "Cache:".bold(), project.cache().dir().display());

    for (kind, status) in project.cache_status()? {
        let label = match status {
            CacheStatus::Fresh => status.to_string().green(),
            CacheStatus::Stale => status.to_string().yellow(),
            CacheStatus::Missing => status.to_string().dimmed(),
            CacheStatus::Corrupt => status.to_string().red(),
        };
        let generated = project
            .cache()
            .generated_at(kind)
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        println!("  {:<10} {:<8} {}", kind.as_str(), label, generated.dimmed());
    }

    Ok(())
}

fn cache_clear_command(project: &Project) -> Result<()> {
    let removed = project.cache().clear()?;
    println!("{} {} cached artifact(s)", "Removed".green(), removed);
    Ok(())
}
