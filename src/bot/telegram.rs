use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::BotHandler;

const API_BASE: &str = "https://api.telegram.org";
/// Long-poll window passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    first_name: String,
}

/// Telegram Bot API transport using long polling.
pub struct TelegramBot {
    client: Client,
    base_url: String,
    offset: i64,
}

impl TelegramBot {
    pub fn new(token: &str) -> Result<Self> {
        let client = Client::builder()
            // Must outlast the long-poll window
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, token),
            offset: 0,
        })
    }

    /// Poll for messages until Ctrl-C, answering each through `handler`.
    ///
    /// Transport errors are logged and retried after a short delay.
    pub async fn run(&mut self, handler: &BotHandler<'_>) -> Result<()> {
        info!("Telegram bot started");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Telegram bot stopping");
                    return Ok(());
                }
                polled = self.poll_once(handler) => {
                    if let Err(e) = polled {
                        warn!(error = %e, "Telegram polling failed, retrying");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }
    }

    async fn poll_once(&mut self, handler: &BotHandler<'_>) -> Result<()> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": self.offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text.as_deref() else {
                continue;
            };

            let sender = message.from.as_ref().map(|u| u.first_name.as_str());
            debug!(chat_id = message.chat.id, "Received message");

            if let Some(reply) = handler.handle(sender, text).await {
                self.send_message(message.chat.id, &reply).await?;
            }
        }

        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response: ApiResponse<T> = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await
            // The URL carries the bot token; keep it out of error messages
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Telegram {} request failed", method))?
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Invalid Telegram {} response", method))?;

        if !response.ok {
            anyhow::bail!(
                "Telegram {} failed: {}",
                method,
                response.description.unwrap_or_default()
            );
        }

        response
            .result
            .with_context(|| format!("Telegram {} returned no result", method))
    }
}
