//! SNI Check CLI Application
//!
//! A command-line interface for finding the hostnames a server answers to
//! over HTTP and HTTPS. Reads a hostname list, probes every entry against
//! the given server, and writes the working hostnames plus a client
//! configuration block that uses one of them as its server name.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use sni_check_lib::{
    best_https_hosts, format_working_hosts, load_env_config, load_host_file, parse_timeout_string,
    CheckConfig, ClientConfig, ConfigManager, EnvConfig, FileConfig, ResultStats, SniCheckError,
    SniChecker, DEFAULT_CLIENT_CONFIG_FILE, DEFAULT_INPUT_FILE, DEFAULT_WORKING_FILE,
    MAX_CONCURRENCY,
};
use std::fs;
use std::future::Future;
use std::io;
use std::process;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit code used when the user interrupts a run.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI arguments for sni-check
#[derive(Parser, Debug)]
#[command(name = "sni-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find hostnames a server answers to over HTTP and HTTPS")]
#[command(
    long_about = "Probe a list of candidate hostnames against one server address, sending each \
                  one in the Host header over HTTP and HTTPS.\n\nHostnames answered with 200, 301, \
                  302 or 404 are written to the working list and used to build a VLESS + Reality \
                  client configuration."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Server address to probe (IP address or hostname)
    #[arg(value_name = "SERVER")]
    pub server: String,

    /// Hostname list, one per line (default: sni.txt)
    #[arg(short = 'f', long = "file", value_name = "FILE", help_heading = "Files")]
    pub file: Option<String>,

    /// Where to write working hostnames (default: working_sni.txt)
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Files")]
    pub output: Option<String>,

    /// Where to write the client configuration (default: xui_reality_config.txt)
    #[arg(long = "client-config", value_name = "FILE", help_heading = "Files")]
    pub client_config: Option<String>,

    /// Max concurrent checks (default: 50, max: 1000)
    #[arg(short = 'c', long = "concurrency", help_heading = "Performance")]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. "5s" or "1m" (default: 5s)
    #[arg(short = 't', long = "timeout", value_name = "DURATION", help_heading = "Performance")]
    pub timeout: Option<String>,

    /// Port for the HTTP probe (default: 80)
    #[arg(long = "http-port", value_name = "PORT", help_heading = "Protocol")]
    pub http_port: Option<u16>,

    /// Port for the HTTPS probe (default: 443)
    #[arg(long = "https-port", value_name = "PORT", help_heading = "Protocol")]
    pub https_port: Option<u16>,

    /// Also print working hostnames as JSON on stdout
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logs for every probe
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Resolved file locations for one run.
#[derive(Debug, Clone, PartialEq)]
struct RunPaths {
    input: String,
    working: String,
    client_config: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args);

    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let outcome = run_until_interrupted(run_check(args), tokio::signal::ctrl_c()).await;

    if let Err(e) = outcome {
        if matches!(
            e.downcast_ref::<SniCheckError>(),
            Some(SniCheckError::Interrupted)
        ) {
            ui::print_interrupted();
            process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Drive `run` to completion unless `interrupt` resolves first.
///
/// An interrupt becomes `SniCheckError::Interrupted`. If the interrupt
/// listener itself fails, the run carries on without it.
async fn run_until_interrupted<R, I>(
    run: R,
    interrupt: I,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    I: Future<Output = io::Result<()>>,
{
    tokio::pin!(run);

    let signal = tokio::select! {
        result = &mut run => return result,
        signal = interrupt => signal,
    };

    match signal {
        Ok(()) => Err(SniCheckError::Interrupted.into()),
        Err(e) => {
            warn!(error = %e, "unable to listen for Ctrl-C, continuing without it");
            run.await
        }
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sni_check={0},sni_check_lib={0}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.server.trim().is_empty() {
        return Err("Server address cannot be empty".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}'. Use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    if args.http_port == Some(0) || args.https_port == Some(0) {
        return Err("Ports must be between 1 and 65535".to_string());
    }

    Ok(())
}

/// Main checking logic
async fn run_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let config = build_config(&args, &file_config, &env_config);
    let paths = resolve_paths(&args, &file_config, &env_config);
    debug!(?config, ?paths, "resolved configuration");

    let hosts = load_host_file(&paths.input)?;
    if hosts.is_empty() {
        ui::print_empty_input(&paths.input);
        return Ok(());
    }
    ui::print_host_preview(&hosts);

    // Stale artifacts from a previous run must not survive this one.
    truncate(&paths.working)?;
    truncate(&paths.client_config)?;

    ui::print_header(&args.server, config.concurrency);

    let checker = SniChecker::with_config(args.server.trim(), config)?
        .with_progress(ui::progress_sink());

    let report = match checker.check_hosts(&hosts).await {
        Ok(report) => report,
        Err(SniCheckError::EmptyInput) => {
            ui::print_empty_input(&paths.input);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    write_file(&paths.working, &format_working_hosts(&report.results))?;

    let stats = ResultStats::from_results(&report.results, report.progress.completed);
    ui::print_stats(&stats, report.duration);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.results)?);
    }

    match ClientConfig::generate(checker.address(), &report.results, report.progress.completed) {
        Some(client_config) => {
            write_file(&paths.client_config, &client_config.render())?;
            info!(server_name = %client_config.server_name, "client configuration written");
            ui::print_saved(&paths.client_config, &paths.working);
        }
        None => ui::print_no_working_hosts(),
    }

    ui::print_best_https_hosts(&best_https_hosts(&report.results, ui::BEST_HOSTS_LIMIT));

    Ok(())
}

/// Load the config file named by `--config` or `SC_CONFIG`, or discover one.
///
/// An explicitly named file must load; discovered files are best effort.
fn load_file_config(args: &Args, env_config: &EnvConfig) -> Result<FileConfig, SniCheckError> {
    let manager = ConfigManager::new();
    match args.config.as_ref().or(env_config.config.as_ref()) {
        Some(path) => manager.load_file(path),
        None => Ok(manager.discover_and_load()),
    }
}

/// Build CheckConfig with precedence: CLI > environment > config files > defaults.
fn build_config(args: &Args, file_config: &FileConfig, env_config: &EnvConfig) -> CheckConfig {
    let mut config = file_config.apply_to(CheckConfig::default());
    config = env_config.apply_to(config);

    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_timeout_string) {
        config = config.with_timeout(timeout);
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(port) = args.https_port {
        config.https_port = port;
    }

    config
}

/// Resolve file locations with the same precedence as `build_config`.
fn resolve_paths(args: &Args, file_config: &FileConfig, env_config: &EnvConfig) -> RunPaths {
    let input = args
        .file
        .clone()
        .or_else(|| env_config.file.clone())
        .or_else(|| file_config.input_file().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_INPUT_FILE.to_string());

    let working = args
        .output
        .clone()
        .or_else(|| file_config.working_file().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_WORKING_FILE.to_string());

    let client_config = args
        .client_config
        .clone()
        .or_else(|| file_config.client_config_file().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CLIENT_CONFIG_FILE.to_string());

    RunPaths {
        input,
        working,
        client_config,
    }
}

fn truncate(path: &str) -> Result<(), SniCheckError> {
    write_file(path, "")
}

fn write_file(path: &str, content: &str) -> Result<(), SniCheckError> {
    fs::write(path, content)
        .map_err(|e| SniCheckError::file_error(path, format!("Failed to write file: {}", e)))
}
