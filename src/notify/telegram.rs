use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{Markup, Notifier};
use crate::error::{Result, WatchError};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API `sendMessage` with legacy Markdown.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, token: &str, chat_id: &str) -> Self {
        Self {
            client,
            api_base: API_BASE.to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    fn message_body(&self, text: &str) -> Value {
        json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        })
    }

    /// Error text with the bot token masked; request URLs embed it.
    fn scrub(&self, message: String) -> String {
        if self.token.is_empty() {
            message
        } else {
            message.replace(&self.token, "<token>")
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn markup(&self) -> Markup {
        Markup::Markdown
    }

    async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&self.message_body(text))
            .send()
            .await
            .map_err(|e| WatchError::Notify(self.scrub(e.without_url().to_string())))?;

        let status = response.status();
        let api: ApiResponse = response.json().await.map_err(|e| {
            WatchError::Notify(self.scrub(format!("HTTP {}: {}", status, e.without_url())))
        })?;
        if !api.ok {
            return Err(WatchError::Notify(self.scrub(format!(
                "HTTP {}: {}",
                status,
                api.description.unwrap_or_else(|| "no description".to_string())
            ))));
        }

        info!("Telegram message sent to chat {}", self.chat_id);
        Ok(())
    }
}
