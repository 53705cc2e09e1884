//! homer-aggregator CLI
//!
//! Renders a Homer `config.yml` from a directory of manifests: one
//! `Dashboard` holding the foundation configuration plus any number of
//! Ingresses and HTTPRoutes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use homer_aggregator::config::{MemoryRepository, TreeRepository, YamlFileRepository};
use homer_aggregator::engine::annotations::IssueAction;
use homer_aggregator::gitops::{collect_batches, BatchReport};
use homer_aggregator::{telemetry, ManifestLoader, Reconciler, Result};

#[derive(Parser)]
#[command(name = "homer-aggregator")]
#[command(about = "Aggregate a Homer dashboard from foundation and discovered routes", version)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the dashboard configuration
    Render {
        /// Directory containing Dashboard, Ingress and HTTPRoute manifests
        #[arg(long, short = 'm')]
        manifests: PathBuf,

        /// Write the document here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// State file holding the tree between runs
        #[arg(long, short = 's')]
        state: Option<PathBuf>,
    },

    /// Check that the manifests produce a valid dashboard without writing anything
    Validate {
        /// Directory containing Dashboard, Ingress and HTTPRoute manifests
        #[arg(long, short = 'm')]
        manifests: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_logging(cli.json_logs);

    let result = match cli.command {
        Commands::Render {
            manifests,
            output,
            state,
        } => run_render(&manifests, output.as_deref(), state.as_deref()),
        Commands::Validate { manifests } => run_validate(&manifests),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_render(manifest_dir: &Path, output: Option<&Path>, state: Option<&Path>) -> Result<()> {
    let repo: Box<dyn TreeRepository> = match state {
        Some(path) => Box::new(YamlFileRepository::new(path)),
        None => Box::new(MemoryRepository::new()),
    };

    let (reconciler, report) = reconcile(manifest_dir, repo.as_ref())?;
    log_report(&report);

    let rendered = reconciler.publish(repo.as_ref(), output)?;
    if output.is_none() {
        print!("{}", rendered.yaml);
    }
    Ok(())
}

fn run_validate(manifest_dir: &Path) -> Result<()> {
    let (reconciler, report) = reconcile(manifest_dir, &MemoryRepository::new())?;
    log_report(&report);

    let rendered = reconciler.render()?;
    let entries = rendered.config.entries().count();
    println!(
        "Dashboard is valid: {} groups, {} entries, {} annotation issues",
        rendered.config.services.len(),
        entries,
        report.origins.iter().map(|o| o.issues.len()).sum::<usize>()
    );
    Ok(())
}

/// Loads manifests, restores previous discoveries and reconciles every origin.
fn reconcile(manifest_dir: &Path, repo: &dyn TreeRepository) -> Result<(Reconciler, BatchReport)> {
    let manifests = ManifestLoader::new(manifest_dir).load()?;
    let reconciler = Reconciler::from_dashboard(&manifests.dashboard.resource.spec);

    if let Some(previous) = repo.load()? {
        reconciler.restore(&previous)?;
    }

    let batches = collect_batches(&manifests, chrono::Utc::now());
    let live: BTreeSet<_> = batches.iter().map(|b| b.origin.clone()).collect();
    reconciler.forget_absent(&live)?;

    let report = reconciler.reconcile_batch(batches)?;
    Ok((reconciler, report))
}

fn log_report(report: &BatchReport) {
    for origin in &report.origins {
        for issue in origin
            .issues
            .iter()
            .filter(|i| i.action == IssueAction::Dropped)
        {
            log::info!(
                "{}: dropped annotation '{}' = '{}': {}",
                origin.origin,
                issue.key,
                issue.value,
                issue.reason
            );
        }
    }
    log::info!(
        "Reconciled {} origins, {} entries placed",
        report.origins.len(),
        report
            .origins
            .iter()
            .map(|o| o.placements.len())
            .sum::<usize>()
    );
}
