//! Logging helpers
//!
//! Subscriber setup plus the banner lines the binary prints around a run.

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::orchestrator::{JobSnapshot, JobStatus};

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `info`, or `debug`
/// when verbose. Safe to call more than once.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// Banner for the requests found on disk
pub fn log_requests_loaded(total: usize, max_workers: usize) {
    info!("✓ found {} quote request(s)", total);
    info!("📋 up to {} run at once, the rest wait in FIFO order\n", max_workers);
}

/// Final tally of a run
pub fn print_final_stats(snapshots: &[JobSnapshot]) {
    let succeeded = snapshots
        .iter()
        .filter(|s| s.status == JobStatus::Succeeded)
        .count();
    let failed = snapshots
        .iter()
        .filter(|s| s.status == JobStatus::Failed)
        .count();

    info!("\n{}", "=".repeat(60));
    info!("📊 run complete");
    info!(
        "finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ succeeded: {}/{}", succeeded, snapshots.len());
    info!("❌ failed: {}", failed);
    for snapshot in snapshots.iter().filter(|s| s.status == JobStatus::Failed) {
        if let Some(error) = &snapshot.error {
            info!(
                "   {} → {}",
                snapshot.id,
                truncate_text(&error.message, 100)
            );
        }
    }
    info!("{}", "=".repeat(60));
}

/// Shorten long text for log lines
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_text("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
