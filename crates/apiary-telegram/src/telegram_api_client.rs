//! Telegram Bot API client used by update polling and reply delivery.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use apiary_core::OutboundReply;

#[derive(Debug, Clone, Deserialize)]
struct TelegramApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TelegramSendMessageResult {
    message_id: Option<u64>,
}

#[derive(Debug, Clone)]
/// Receipt for one delivered reply.
pub struct TelegramDeliveredReply {
    pub message_id: u64,
}

#[derive(Clone)]
pub struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    request_timeout_ms: u64,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl TelegramApiClient {
    pub fn new(
        api_base: &str,
        bot_token: &str,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("apiary-bot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create telegram api client")?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.trim().to_string(),
            request_timeout_ms: request_timeout_ms.max(1),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    /// Long-polls `getUpdates` starting at `offset`. The per-request timeout
    /// is widened by the poll window so a quiet long poll is not cut short.
    pub async fn get_updates(&self, offset: u64, poll_timeout_seconds: u64) -> Result<Vec<Value>> {
        let url = self.method_url("getUpdates");
        let poll_budget = Duration::from_millis(
            self.request_timeout_ms
                .saturating_add(poll_timeout_seconds.saturating_mul(1000)),
        );
        let response: TelegramApiEnvelope<Vec<Value>> = self
            .request_json("getUpdates", || {
                self.http.get(&url).timeout(poll_budget).query(&[
                    ("timeout", poll_timeout_seconds.to_string()),
                    ("offset", offset.to_string()),
                ])
            })
            .await?;

        if !response.ok {
            bail!(
                "telegram getUpdates failed: {}",
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        Ok(response.result.unwrap_or_default())
    }

    /// Sends one reply to `chat_id`, attaching the quick-reply keyboard when
    /// the reply carries one.
    pub async fn send_message(
        &self,
        chat_id: &str,
        reply: &OutboundReply,
    ) -> Result<TelegramDeliveredReply> {
        let payload = build_send_payload(chat_id, reply);
        let url = self.method_url("sendMessage");
        let response: TelegramApiEnvelope<TelegramSendMessageResult> = self
            .request_json("sendMessage", || self.http.post(&url).json(&payload))
            .await?;

        if !response.ok {
            bail!(
                "telegram sendMessage failed: {}",
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string())
            );
        }
        response
            .result
            .and_then(|message| message.message_id)
            .map(|message_id| TelegramDeliveredReply { message_id })
            .ok_or_else(|| anyhow!("telegram sendMessage did not return message_id"))
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    async fn request_json<T, F>(&self, operation: &str, mut builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder().send().await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode telegram {operation}"))?;
                        return Ok(parsed);
                    }

                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        apply_retry_delay(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }

                    bail!(
                        "telegram api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 400)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        apply_retry_delay(self.retry_base_delay_ms, attempt).await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("telegram api {operation} request failed"));
                }
            }
        }
    }
}

fn build_send_payload(chat_id: &str, reply: &OutboundReply) -> Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": reply.text,
        "disable_web_page_preview": true,
    });
    if let Some(keyboard) = &reply.keyboard {
        payload["reply_markup"] = json!({
            "keyboard": keyboard.rows,
            "resize_keyboard": true,
        });
    }
    payload
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

fn retry_delay_ms(base_delay_ms: u64, attempt: usize) -> u64 {
    if base_delay_ms == 0 {
        return 0;
    }
    let exponent = attempt.saturating_sub(1).min(10) as u32;
    base_delay_ms.saturating_mul(1_u64 << exponent)
}

async fn apply_retry_delay(base_delay_ms: u64, attempt: usize) {
    let delay_ms = retry_delay_ms(base_delay_ms, attempt);
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let truncated: String = body.chars().take(max_chars).collect();
    format!("{truncated}...")
}
