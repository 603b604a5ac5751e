// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dnsclaim::{
    config::{
        check_concurrency, resolve_domain, Config, ProviderConfig, ReconcileOptions, SourcePaths,
    },
    constants::{
        DEFAULT_API_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_DECLARATIONS_DIR,
        DEFAULT_RECORD_TTL_SECS, DEFAULT_RESERVED_FILE, DEFAULT_RUN_TIMEOUT_SECS,
        DEFAULT_TRUSTED_FILE, ENV_API_TOKEN, ENV_DOMAIN, ENV_REQUESTER, ENV_ZONE_ID,
    },
    fetcher::fetch_managed,
    metrics,
    provider::CloudflareProvider,
    reconciler, report,
    source::{load_declaration_files, resolve_selection},
    validation::{validate_batch, ValidationReport},
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Validate subdomain declarations and reconcile them into a DNS zone.
#[derive(Debug, Parser)]
#[command(name = "dnsclaim", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate declaration files
    Validate(ValidateArgs),
    /// Validate, then converge the provider onto the declarations
    Reconcile(ReconcileArgs),
    /// Validate and print the planned provider writes without applying them
    Plan(ReconcileArgs),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct SourceArgs {
    /// Directory of declaration files
    #[arg(long, default_value = DEFAULT_DECLARATIONS_DIR)]
    declarations_dir: PathBuf,

    /// Reserved-name list
    #[arg(long, default_value = DEFAULT_RESERVED_FILE)]
    reserved_file: PathBuf,

    /// Owners exempt from the one-declaration quota
    #[arg(long, default_value = DEFAULT_TRUSTED_FILE)]
    trusted_file: PathBuf,

    /// Require each file name to equal its owner username
    #[arg(long)]
    strict_filenames: bool,
}

impl SourceArgs {
    fn into_paths(self) -> SourcePaths {
        SourcePaths {
            declarations_dir: self.declarations_dir,
            reserved_file: self.reserved_file,
            trusted_file: self.trusted_file,
            require_filename_match: self.strict_filenames,
        }
    }
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Identity that submitted the change; must own every checked file
    #[arg(long, env = ENV_REQUESTER)]
    requester: Option<String>,

    /// Only run per-file checks on these files (e.g. the files a change touches)
    files: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Managed base domain
    #[arg(long, env = ENV_DOMAIN)]
    domain: Option<String>,

    /// Provider zone identifier
    #[arg(long, env = ENV_ZONE_ID)]
    zone_id: Option<String>,

    /// Provider API token
    #[arg(long, env = ENV_API_TOKEN, hide_env_values = true)]
    api_token: Option<String>,

    /// Provider API base URL
    #[arg(long, default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Maximum provider writes in flight
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Deadline for the whole run, in seconds
    #[arg(long, default_value_t = DEFAULT_RUN_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// TTL of created records (1 = provider automatic)
    #[arg(long, default_value_t = DEFAULT_RECORD_TTL_SECS)]
    ttl: u32,

    /// Compute and log the plan without writing
    #[arg(long)]
    dry_run: bool,

    /// Write Prometheus metrics in text format to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .thread_name("dnsclaim-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_logging() {
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Respects RUST_LOG_FORMAT=json for structured output
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    if let Command::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "dnsclaim", &mut std::io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    init_logging();
    debug!("Logging initialized with file and line number tracking");

    match cli.command {
        Command::Validate(args) => run_validate(args).await,
        Command::Reconcile(args) => run_reconcile(args, false).await,
        Command::Plan(args) => run_reconcile(args, true).await,
        Command::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// Read the lists and every declaration, then validate the batch.
///
/// Filesystem reads run on the blocking pool.
async fn validate_sources(
    sources: SourcePaths,
    requester: Option<String>,
    selected: Option<Vec<PathBuf>>,
) -> Result<ValidationReport> {
    tokio::task::spawn_blocking(move || -> Result<ValidationReport> {
        let policy = sources.load_policy()?;
        let files = load_declaration_files(&sources.declarations_dir)?;
        let selected = selected.map(|paths| resolve_selection(&files, &paths));
        Ok(validate_batch(
            &files,
            &policy,
            requester.as_deref(),
            selected.as_deref(),
        ))
    })
    .await
    .context("validation task panicked")?
}

async fn run_validate(args: ValidateArgs) -> Result<ExitCode> {
    let selected = (!args.files.is_empty()).then_some(args.files);
    if let Some(files) = &selected {
        info!(count = files.len(), "Validating selected declaration files");
    } else {
        info!(dir = %args.source.declarations_dir.display(), "Validating all declaration files");
    }

    let report = validate_sources(args.source.into_paths(), args.requester, selected).await?;
    report::log_validation(&report);

    Ok(if report.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_config(args: ReconcileArgs, force_dry_run: bool) -> Result<Config> {
    let domain = resolve_domain(args.domain.as_deref())?;
    let provider = ProviderConfig::new(
        &args.api_base_url,
        args.zone_id.as_deref(),
        args.api_token.as_deref(),
    )?;
    let reconcile = ReconcileOptions {
        concurrency: check_concurrency(args.concurrency)?,
        timeout: Duration::from_secs(args.timeout_secs),
        ttl: args.ttl,
        dry_run: args.dry_run || force_dry_run,
    };
    Ok(Config {
        domain,
        sources: args.source.into_paths(),
        provider,
        reconcile,
    })
}

/// Resolves once SIGINT arrives; never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

async fn run_reconcile(args: ReconcileArgs, force_dry_run: bool) -> Result<ExitCode> {
    let started = Instant::now();
    let metrics_file = args.metrics_file.clone();
    let config = build_config(args, force_dry_run)?;

    let outcome = converge(&config, started).await;

    // Recorded for every outcome, failed runs included
    let success = matches!(outcome, Ok(true));
    metrics::record_reconcile_duration(started.elapsed(), success);
    if let Some(path) = metrics_file {
        write_metrics(&path);
    }

    Ok(if outcome? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Validate, fetch, plan and apply. Returns whether the run succeeded.
async fn converge(config: &Config, started: Instant) -> Result<bool> {
    let provider = CloudflareProvider::new(&config.provider)?;

    info!(
        domain = %config.domain,
        dir = %config.sources.declarations_dir.display(),
        dry_run = config.reconcile.dry_run,
        concurrency = config.reconcile.concurrency,
        "Starting reconciliation"
    );

    let (validation, remote) = tokio::select! {
        pair = async {
            tokio::join!(
                validate_sources(config.sources.clone(), None, None),
                tokio::time::timeout(
                    config.reconcile.timeout,
                    fetch_managed(&provider, &config.domain),
                ),
            )
        } => pair,
        () = shutdown_signal() => {
            warn!("Interrupted before any provider write");
            return Ok(false);
        }
    };

    let report = validation?;
    report::log_validation(&report);
    if !report.is_ok() {
        error!("Declarations failed validation, refusing to reconcile");
        return Ok(false);
    }

    let actual = match remote {
        Ok(Ok(actual)) => actual,
        Ok(Err(e)) => {
            error!(error = %e, fatal = e.is_fatal(), "Failed to fetch remote state");
            return Ok(false);
        }
        Err(_) => {
            error!("Deadline exceeded while fetching remote state");
            return Ok(false);
        }
    };

    let plan = reconciler::plan(&report.desired_records(), &actual, &config.domain);
    report::log_plan(&plan);

    // The deadline covers the whole run, fetch included
    let options = ReconcileOptions {
        timeout: config.reconcile.timeout.saturating_sub(started.elapsed()),
        ..config.reconcile.clone()
    };
    let summary = reconciler::apply_until(&plan, &provider, &options, shutdown_signal()).await;
    report::log_reconcile(&summary);

    Ok(summary.is_success())
}

fn write_metrics(path: &Path) {
    match metrics::write_textfile(path) {
        Ok(()) => debug!(path = %path.display(), "Wrote metrics"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to write metrics"),
    }
}
