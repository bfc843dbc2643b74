//! Apiary bot entry point.
//!
//! Opens the SQLite store once, wires the session store and dialog router,
//! and hands control to the Telegram long-poll runtime until Ctrl-C.

mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use apiary_dialog::{DialogRouter, SessionStore};
use apiary_storage::Database;
use apiary_telegram::{TelegramRuntime, TelegramRuntimeConfig};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_bot(cli).await
}

async fn run_bot(cli: Cli) -> Result<()> {
    let database = Database::open(&cli.db_path).with_context(|| {
        format!(
            "failed to open apiary database at {}",
            cli.db_path.display()
        )
    })?;
    let family_count = database
        .family_count()
        .context("failed to read bee family count")?;
    info!(
        db_path = %cli.db_path.display(),
        family_count,
        "apiary database ready"
    );

    let sessions = Arc::new(SessionStore::new());
    let router = Arc::new(DialogRouter::new(database, sessions));

    let mut config = TelegramRuntimeConfig::new(cli.telegram_bot_token);
    config.api_base = cli.api_base;
    config.poll_timeout_seconds = cli.poll_timeout_seconds;
    config.request_timeout_ms = cli.request_timeout_ms;
    config.retry_max_attempts = cli.retry_max_attempts;
    config.retry_base_delay_ms = cli.retry_base_delay_ms;
    config.error_backoff_ms = cli.error_backoff_ms;

    let mut runtime = TelegramRuntime::new(&config, router)?;
    runtime.run().await
}
