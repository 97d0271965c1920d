use crate::{
    api::{
        self,
        handlers::login::{LoginState, StaticCredentials, TracingAuditLog},
    },
    cli::telemetry,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the listener cannot bind or the server stops with an error.
pub async fn execute(args: Args) -> Result<()> {
    let credentials = StaticCredentials::default();

    log_startup_args(&args, credentials.len());

    let state = Arc::new(LoginState::new(
        Arc::new(credentials),
        Arc::new(TracingAuditLog),
    ));

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args, credentials: usize) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("credentials", credentials.to_string()),
        ("otlp_export", telemetry::otlp_endpoint().unwrap_or("off").to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    info!("{}\n\n{title}:{}", banner(), format_entries(entries));
}

/// One `key: value` line per entry, values aligned on the longest key.
fn format_entries(entries: &[(&str, String)]) -> String {
    let width = entries.iter().map(|(key, _)| key.len() + 1).max().unwrap_or(0);
    entries
        .iter()
        .map(|(key, value)| format!("\n  {:<width$} {value}", format!("{key}:")))
        .collect()
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const BANNER: &str = r"
   _______
  |  ___  |
  | |   | |
  | |___| |   P A S S G A T E {VERSION}
  |_______|";
