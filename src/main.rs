//! PulseCheck - concurrent integration probe runner
//!
//! A CLI tool that fires every configured probe against its provider,
//! reports pass/fail per probe, and can serve the run as an HTTP trigger
//! for an external scheduler.
//!
//! Exit codes:
//!   0 - Success (every probe passed)
//!   1 - Runtime error (config, registry, server failure, etc.)
//!   2 - At least one probe failed

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pulsecheck::cli::{Args, Command, OutputFormat};
use pulsecheck::config::{Config, CONFIG_FILE_NAME};
use pulsecheck::probe::{ProcessEnv, SecretSource};
use pulsecheck::registry::ProbeRegistry;
use pulsecheck::report;
use pulsecheck::runner::Runner;
use pulsecheck::server::{self, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // A config file that exists but does not parse aborts the run.
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("PulseCheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("{} probes configured", config.probes.len());

    match dispatch(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("PulseCheck failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .pulsecheck.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to add probes and point them at your environment variables.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected command. Returns the process exit code.
async fn dispatch(args: Args, config: Config) -> Result<i32> {
    match args.command.clone() {
        Some(Command::Run { format, output, .. }) => {
            let runner = build_runner(&config)?;
            run_once(&runner, format, output, args.quiet).await
        }
        Some(Command::Serve { secret, .. }) => {
            let runner = build_runner(&config)?;
            serve(&config, runner, secret).await?;
            Ok(0)
        }
        Some(Command::List) => {
            list_probes(&config)?;
            Ok(0)
        }
        None => anyhow::bail!("No command given"),
    }
}

/// Build the probe registry from configuration, rejecting bad ids.
fn build_registry(config: &Config) -> Result<ProbeRegistry> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.runner.request_timeout_seconds))
        .build()
        .context("Failed to build HTTP client")?;

    ProbeRegistry::from_config(&config.probes, &client, &ProcessEnv)
        .context("Invalid probe registry")
}

/// Build the probe registry and the orchestrator.
fn build_runner(config: &Config) -> Result<Runner> {
    let registry = build_registry(config)?;
    info!("Registered {} probes", registry.len());

    let probe_timeout = config.runner.probe_timeout_seconds.map(Duration::from_secs);
    if let Some(limit) = probe_timeout {
        info!("Probe timeout: {}s", limit.as_secs());
    }

    Ok(Runner::new(Arc::new(registry)).with_probe_timeout(probe_timeout))
}

/// Execute a single run and emit the report. Returns 0 or 2.
async fn run_once(
    runner: &Runner,
    format: OutputFormat,
    output: Option<PathBuf>,
    quiet: bool,
) -> Result<i32> {
    let spinner = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .context("Invalid spinner template")?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    spinner.set_message(format!("Running {} probes...", runner.registry().len()));

    let result = runner.run_all().await;
    spinner.finish_and_clear();
    let report = result.context("Runner crashed")?;

    let rendered = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("📄 Report saved to: {}", path.display());
        }
        None => println!("{}", rendered),
    }

    if !quiet {
        eprintln!(
            "\n📊 {} passed, {} failed, {} total in {}ms",
            report.summary.passed,
            report.summary.failed,
            report.summary.total,
            report.duration_ms_total
        );
    }

    if report.all_passed {
        Ok(0)
    } else {
        for detail in &report.failure_details {
            eprintln!("   ❌ {}", detail);
        }
        Ok(2)
    }
}

/// Serve the HTTP trigger until interrupted.
async fn serve(config: &Config, runner: Runner, secret: Option<String>) -> Result<()> {
    let secret = secret.or_else(|| ProcessEnv.lookup(&config.server.secret_env));
    if secret.is_none() {
        warn!(
            "{} is not set; every trigger request will be rejected",
            config.server.secret_env
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = Arc::new(AppState::new(runner, secret));
    server::serve(addr, state).await
}

/// Print registered probe ids and kinds.
fn list_probes(config: &Config) -> Result<()> {
    let registry = build_registry(config)?;

    if registry.is_empty() {
        println!("No probes configured.");
        return Ok(());
    }

    for entry in registry.iter() {
        println!("{:<28} {}", entry.id.as_str(), entry.probe.kind());
    }
    println!("\n{} probes", registry.len());
    Ok(())
}

/// Load configuration from `--config`, else `.pulsecheck.toml`, else defaults.
///
/// Runs before logging is initialized, so it does not log.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}
