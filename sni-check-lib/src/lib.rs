//! # SNI Check Library
//!
//! Finds which hostnames a given server answers to when they are presented
//! in the Host header, over plain HTTP and over HTTPS. The result is a list
//! of domain fronting candidates for proxy configuration.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sni_check_lib::{parse_host_list, SniChecker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hosts = parse_host_list("www.example.com\n# skipped\ncdn.example.net\n");
//!     let checker = SniChecker::new("203.0.113.7")?;
//!     let report = checker.check_hosts(&hosts).await?;
//!
//!     println!("{} of {} hostnames work", report.results.len(), report.progress.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Work queue**: every hostname is enqueued up front, then one stop
//!   marker per worker once the backlog drains
//! - **Worker pool**: a fixed number of workers, the only concurrency bound
//! - **Result aggregator**: working hostnames in completion order
//! - **Progress reporter**: consumes one completion event per hostname

// Re-export main public API types and functions
pub use aggregator::ResultAggregator;
pub use checker::SniChecker;
pub use concurrent::WorkerPool;
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, FilesConfig, DEFAULT_CLIENT_CONFIG_FILE, DEFAULT_INPUT_FILE,
    DEFAULT_WORKING_FILE,
};
pub use error::SniCheckError;
pub use hosts::{load_host_file, parse_host_list};
pub use probe::{build_url, is_accepted_status, HttpTransport, Prober, Transport};
pub use progress::{
    completion_channel, should_report, CompletionEvent, CompletionReceiver, CompletionSender,
    ProgressReporter, ProgressSink, ProgressSnapshot, REPORT_EVERY,
};
pub use queue::{QueueHandle, WorkItem, WorkQueue};
pub use report::{
    best_https_hosts, format_working_hosts, select_server_name, ClientConfig, ResultStats,
};
pub use types::{
    CheckConfig, ProbeOutcome, ProgressState, Protocol, ProtocolSet, RunReport,
    ACCEPTED_STATUSES, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, MAX_CONCURRENCY,
};

// Internal modules - reachable through the re-exports above
mod aggregator;
mod checker;
mod concurrent;
mod config;
mod error;
mod hosts;
mod probe;
mod progress;
mod queue;
mod report;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, SniCheckError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    LibraryInfo {
        name: NAME,
        version: VERSION,
    }
}

/// Information about the library build
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: &'static str,
    pub version: &'static str,
}
