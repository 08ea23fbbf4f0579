//! care-hydration CLI: build hydration dashboards from care-home documents.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use care_hydration_cli::{load_inputs, InputDirs};
use care_hydration_core::{DocumentExtractor, HydrationCore, PipelineConfig};

#[derive(Parser)]
#[command(name = "care-hydration", version, about = "Care-home hydration dashboard pipeline")]
struct Cli {
    /// Pipeline configuration (TOML). Defaults apply when the file is absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dashboard archive database; in-memory when omitted.
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process input files and write dashboards.
    Run {
        /// Care home display name, e.g. "Cedar Grove".
        #[arg(long)]
        home: String,

        /// Directory of care-plan PDFs.
        #[arg(long)]
        care_plans: PathBuf,

        /// Directory of hydration-log PDFs.
        #[arg(long)]
        hydration: Option<PathBuf>,

        /// Directory of IPC CSV files.
        #[arg(long)]
        ipc: Option<PathBuf>,

        /// Base directory for `files/hydration/<home-id>/`.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Fail with a non-zero exit code if any file-level error occurred.
        #[arg(long)]
        strict: bool,
    },

    /// List archived dashboards for a home.
    Dashboards {
        /// Care home display name.
        #[arg(long)]
        home: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .init();
}

fn open_core(cli: &Cli) -> Result<HydrationCore> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::load_or_default(path)
            .with_context(|| format!("Failed loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match &cli.archive {
        Some(path) => HydrationCore::open(path, config)
            .with_context(|| format!("Failed opening archive {}", path.display())),
        None => HydrationCore::open_in_memory(config).context("Failed opening in-memory archive"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let core = open_core(&cli)?;

    match &cli.command {
        Commands::Run {
            home,
            care_plans,
            hydration,
            ipc,
            out,
            strict,
        } => {
            let inputs = load_inputs(&InputDirs {
                care_plans: care_plans.clone(),
                hydration: hydration.clone(),
                ipc: ipc.clone(),
            })?;

            info!(
                home = %home,
                care_plans = inputs.care_plans.len(),
                hydration = inputs.hydration.len(),
                ipc = inputs.ipc.len(),
                "Starting run"
            );

            let now = chrono::Local::now().naive_local();
            let outcome = core.run(home, &inputs, &DocumentExtractor, now)?;
            let result = &outcome.result;

            if result.residents.is_empty() {
                bail!("No residents extracted from care plans; nothing written");
            }

            let saved = core
                .publish(home, &outcome, out)
                .with_context(|| format!("Failed writing artifacts under {}", out.display()))?;

            info!(
                job = %outcome.job_id,
                directory = %saved.directory.display(),
                "Run finished"
            );
            println!(
                "{} residents, {} dashboards, {} warnings, {} errors",
                result.residents.len(),
                result.dashboard_data.len(),
                result.warnings.len(),
                result.errors.len()
            );
            for file in &saved.files {
                println!("  {}", file.display());
            }

            if !result.errors.is_empty() {
                warn!(job = %outcome.job_id, errors = result.errors.len(), "Run had file-level errors");
            }
            if *strict && !result.errors.is_empty() {
                bail!("{} file-level errors", result.errors.len());
            }
        }

        Commands::Dashboards { home } => {
            let archived = core.archived_dashboards(home)?;
            if archived.is_empty() {
                println!("No archived dashboards for {home}");
            }
            for entry in archived {
                println!(
                    "{}  {:>3} residents  generated {}  sha256 {}",
                    entry.dashboard.date_display,
                    entry.dashboard.resident_count(),
                    entry.dashboard.generated_at,
                    &entry.content_sha256[..12.min(entry.content_sha256.len())]
                );
            }
        }
    }

    Ok(())
}
