//! Terminal display logic for the sni-check CLI.
//!
//! This module handles everything the user sees: the live progress line,
//! the run header, the hostname preview, and the final summaries. Uses only
//! the `console` crate. Progress goes to stderr so stdout stays clean.

use console::{style, Term};
use sni_check_lib::{ProgressSink, ProgressSnapshot, ResultStats};
use std::sync::Arc;
use std::time::Duration;

/// Width of the progress bar in cells.
const BAR_WIDTH: usize = 50;

/// Hostnames shown before the run starts.
pub const PREVIEW_LIMIT: usize = 10;

/// HTTPS-capable hostnames listed after the run.
pub const BEST_HOSTS_LIMIT: usize = 10;

// ── Progress ─────────────────────────────────────────────────────────────────

/// Sink that redraws a single progress line on stderr.
///
/// On a terminal the line is rewritten in place; otherwise each snapshot is
/// written as its own line. A newline follows the final snapshot.
pub fn progress_sink() -> ProgressSink {
    let term = Term::stderr();
    let interactive = term.is_term();

    Arc::new(move |snapshot: &ProgressSnapshot| {
        let line = render_progress_line(snapshot);
        if interactive {
            let _ = term.clear_line();
            let _ = term.write_str(&line);
            if snapshot.completed >= snapshot.total {
                let _ = term.write_line("");
            }
        } else {
            let _ = term.write_line(&line);
        }
    })
}

/// Format one progress line: bar, percentage, counts, rate, and ETA.
pub fn render_progress_line(snapshot: &ProgressSnapshot) -> String {
    let fraction = snapshot.fraction();
    let (done, remaining) = bar_cells(fraction, BAR_WIDTH);

    format!(
        "{} [{}{}] {} {} | {} | ETA: {}",
        style("Progress:").cyan(),
        style("█".repeat(done)).green(),
        style("░".repeat(remaining)).cyan(),
        style(format!("{:.1}%", fraction * 100.0)).yellow(),
        style(format!("({}/{})", snapshot.completed, snapshot.total)).cyan(),
        style(format!("{:.1} hosts/s", snapshot.rate)).cyan(),
        style(format_eta(snapshot.eta)).cyan(),
    )
}

/// Split `width` cells into done and remaining for `fraction`.
fn bar_cells(fraction: f64, width: usize) -> (usize, usize) {
    let done = ((width as f64) * fraction.clamp(0.0, 1.0)) as usize;
    (done, width - done)
}

/// Hours above an hour, minutes above a minute, seconds otherwise.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs_f64();
    if secs > 3600.0 {
        format!("{:.1}h", secs / 3600.0)
    } else if secs > 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.0}s", secs)
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print how many hostnames were loaded and the first few of them.
pub fn print_host_preview(hosts: &[String]) {
    println!(
        "{}",
        style(format!("Found {} hostname{}", hosts.len(), plural(hosts.len()))).green()
    );
    println!(
        "{}",
        style(format!("First {} hostnames to check:", PREVIEW_LIMIT.min(hosts.len()))).cyan()
    );
    for (i, host) in hosts.iter().take(PREVIEW_LIMIT).enumerate() {
        println!("  {}. {}", i + 1, host);
    }
    if hosts.len() > PREVIEW_LIMIT {
        println!("  ...");
    }
}

/// Print a styled header at the start of a run.
pub fn print_header(server: &str, concurrency: usize) {
    println!(
        "{} {} {}",
        style("sni-check").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
        style(format!("| Checking server {}", server)).yellow(),
    );
    println!(
        "{}",
        style(format!("Concurrency: up to {} parallel checks", concurrency)).magenta()
    );
    println!("{}", style("=".repeat(60)).dim());
}

// ── Summary ──────────────────────────────────────────────────────────────────

/// Print the counts after a run.
pub fn print_stats(stats: &ResultStats, duration: Duration) {
    println!(
        "{} {}",
        style("Check complete!").green().bold(),
        style(format!("({:.1}s)", duration.as_secs_f64())).dim()
    );
    println!("{}", style(format!("Total checked: {}", stats.checked)).green());
    println!("{}", style(format!("Working over HTTP: {}", stats.http)).green());
    println!("{}", style(format!("Working over HTTPS: {}", stats.https)).green());
    println!("{}", style(format!("Total working: {}", stats.working)).green());
}

pub fn print_no_working_hosts() {
    println!(
        "{}",
        style("No working hostnames found, client configuration not written").red()
    );
}

pub fn print_saved(client_config_path: &str, working_path: &str) {
    println!(
        "{}",
        style(format!("Configuration saved to: {}", client_config_path)).green()
    );
    println!(
        "{}",
        style(format!("Working hostnames saved to: {}", working_path)).green()
    );
}

/// List the best candidates for a Reality server name.
pub fn print_best_https_hosts(hosts: &[&str]) {
    if hosts.is_empty() {
        return;
    }
    println!();
    println!("{}", style("Best hostnames for Reality (HTTPS):").yellow());
    for host in hosts {
        println!("  {} {}", style("✓").green(), host);
    }
}

pub fn print_empty_input(path: &str) {
    println!(
        "{}",
        style(format!("Hostname list '{}' is empty, nothing to check", path)).red()
    );
}

pub fn print_interrupted() {
    eprintln!();
    eprintln!("{}", style("Check interrupted by user").yellow());
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use console::strip_ansi_codes;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::ZERO), "0s");
        assert_eq!(format_eta(Duration::from_secs(42)), "42s");
        assert_eq!(format_eta(Duration::from_secs(60)), "60s");
        assert_eq!(format_eta(Duration::from_secs(90)), "1.5m");
        assert_eq!(format_eta(Duration::from_secs(3600)), "60.0m");
        assert_eq!(format_eta(Duration::from_secs(5400)), "1.5h");
    }

    #[test]
    fn test_bar_cells() {
        assert_eq!(bar_cells(0.0, 50), (0, 50));
        assert_eq!(bar_cells(0.5, 50), (25, 25));
        assert_eq!(bar_cells(1.0, 50), (50, 0));
        assert_eq!(bar_cells(1.7, 50), (50, 0));
    }

    #[test]
    fn test_render_progress_line() {
        let snapshot = ProgressSnapshot::compute(100, 400, 3, Duration::from_secs(20));
        let line = strip_ansi_codes(&render_progress_line(&snapshot)).to_string();

        assert!(line.starts_with("Progress: ["));
        assert!(line.contains("25.0%"));
        assert!(line.contains("(100/400)"));
        assert!(line.contains("5.0 hosts/s"));
        assert!(line.contains("ETA: 60s"));
        assert_eq!(line.matches('█').count(), 12);
        assert_eq!(line.matches('░').count(), 38);
    }

    #[test]
    fn test_render_final_line() {
        let snapshot = ProgressSnapshot::compute(7, 7, 7, Duration::from_secs(1));
        let line = strip_ansi_codes(&render_progress_line(&snapshot)).to_string();
        assert!(line.contains("100.0%"));
        assert!(line.contains("ETA: 0s"));
        assert_eq!(line.matches('█').count(), BAR_WIDTH);
    }
}
