//! Long-poll runtime that drives dialog routing and reply delivery.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use apiary_dialog::DialogRouter;

use crate::telegram_api_client::TelegramApiClient;
use crate::telegram_ingress::parse_telegram_update;

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
/// Tunables for the long-poll loop and the underlying API client.
pub struct TelegramRuntimeConfig {
    pub bot_token: String,
    pub api_base: String,
    pub poll_timeout_seconds: u64,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub error_backoff_ms: u64,
}

impl TelegramRuntimeConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            poll_timeout_seconds: 30,
            request_timeout_ms: 15_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
            error_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Summary of one poll cycle, used for log lines and tests.
pub struct TelegramPollReport {
    pub polled_updates: usize,
    pub handled_events: usize,
    pub parse_failures: usize,
    pub handling_failures: usize,
    pub replies_sent: usize,
    pub send_failures: usize,
    pub next_offset: u64,
}

pub struct TelegramRuntime {
    client: TelegramApiClient,
    router: Arc<DialogRouter>,
    poll_timeout_seconds: u64,
    error_backoff_ms: u64,
    next_update_offset: u64,
}

impl TelegramRuntime {
    pub fn new(config: &TelegramRuntimeConfig, router: Arc<DialogRouter>) -> Result<Self> {
        let client = TelegramApiClient::new(
            &config.api_base,
            &config.bot_token,
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )
        .context("failed to build telegram runtime")?;
        Ok(Self {
            client,
            router,
            poll_timeout_seconds: config.poll_timeout_seconds,
            error_backoff_ms: config.error_backoff_ms.max(1),
            next_update_offset: 0,
        })
    }

    pub fn next_update_offset(&self) -> u64 {
        self.next_update_offset
    }

    /// Runs one poll cycle: fetch pending updates, route each through the
    /// dialog layer, and deliver every produced reply to its chat.
    ///
    /// The update offset advances past every polled row, including rows that
    /// fail to parse, so a malformed update is never fetched twice.
    pub async fn run_poll_cycle(&mut self) -> Result<TelegramPollReport> {
        let updates = self
            .client
            .get_updates(self.next_update_offset, self.poll_timeout_seconds)
            .await?;

        let mut report = TelegramPollReport {
            polled_updates: updates.len(),
            ..TelegramPollReport::default()
        };

        for update in &updates {
            self.advance_offset(update);

            let event = match parse_telegram_update(update) {
                Ok(event) => event,
                Err(parse_failure) => {
                    debug!(
                        code = parse_failure.code.as_str(),
                        error = %parse_failure,
                        "skipping unparseable update"
                    );
                    report.parse_failures += 1;
                    continue;
                }
            };

            let outcome = match self.router.handle_event(&event) {
                Ok(outcome) => outcome,
                Err(handling_failure) => {
                    error!(
                        chat_id = event.chat_id.as_str(),
                        error = %handling_failure,
                        "dialog handling failed"
                    );
                    report.handling_failures += 1;
                    continue;
                }
            };
            report.handled_events += 1;

            for reply in &outcome.replies {
                match self.client.send_message(&event.chat_id, reply).await {
                    Ok(_) => report.replies_sent += 1,
                    Err(send_failure) => {
                        error!(
                            chat_id = event.chat_id.as_str(),
                            error = %send_failure,
                            "reply delivery failed"
                        );
                        report.send_failures += 1;
                    }
                }
            }
        }

        report.next_offset = self.next_update_offset;
        Ok(report)
    }

    /// Polls until Ctrl-C. A failed cycle is logged and the loop backs off
    /// before polling again so a provider outage does not spin hot.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            poll_timeout_seconds = self.poll_timeout_seconds,
            "telegram long-poll runtime started"
        );
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("telegram runtime shutdown requested");
                    return Ok(());
                }
                cycle = self.run_poll_cycle() => match cycle {
                    Ok(report) => {
                        if report.polled_updates > 0 {
                            debug!(
                                polled_updates = report.polled_updates,
                                handled_events = report.handled_events,
                                parse_failures = report.parse_failures,
                                replies_sent = report.replies_sent,
                                send_failures = report.send_failures,
                                next_offset = report.next_offset,
                                "poll cycle complete"
                            );
                        }
                    }
                    Err(cycle_failure) => {
                        warn!(
                            error = %cycle_failure,
                            backoff_ms = self.error_backoff_ms,
                            "poll cycle failed; backing off"
                        );
                        tokio::time::sleep(Duration::from_millis(self.error_backoff_ms)).await;
                    }
                },
            }
        }
    }

    fn advance_offset(&mut self, update: &Value) {
        let update_id = update.get("update_id").and_then(Value::as_u64).unwrap_or(0);
        if update_id > 0 {
            self.next_update_offset = self.next_update_offset.max(update_id.saturating_add(1));
        }
    }
}
