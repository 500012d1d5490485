//! Telegram Bot API HTTP client.

use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{
    ApiResponse, BotInfo, DeleteMessageParams, GetUpdatesParams, SendMessageParams, TgMessage,
    Update,
};

/// HTTP client for the Telegram Bot API.
pub struct TelegramApi {
    client: Client,
    base_url: String,
}

impl TelegramApi {
    /// Create a new API client with the given bot token.
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        })
    }

    /// POST `params` to `method` and unwrap the `{ok, result}` envelope.
    async fn call<P, T>(&self, method: &str, params: &P) -> anyhow::Result<Option<T>>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(params)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?
            .json()
            .await
            .with_context(|| format!("{method} response parse failed"))?;

        if !resp.ok {
            bail!(
                "{method} failed: {}",
                resp.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(resp.result)
    }

    /// Verify the bot token by calling `getMe`.
    pub async fn get_me(&self) -> anyhow::Result<BotInfo> {
        self.call("getMe", &serde_json::json!({}))
            .await?
            .context("getMe returned no result")
    }

    /// Long-poll for updates.
    pub async fn get_updates(&self, params: &GetUpdatesParams) -> anyhow::Result<Vec<Update>> {
        Ok(self.call("getUpdates", params).await?.unwrap_or_default())
    }

    /// Send a text message.
    pub async fn send_message(&self, params: &SendMessageParams) -> anyhow::Result<TgMessage> {
        self.call("sendMessage", params)
            .await?
            .context("sendMessage returned no result")
    }

    /// Delete a message. Fails if it is already gone or too old to delete.
    pub async fn delete_message(&self, params: &DeleteMessageParams) -> anyhow::Result<()> {
        let _: Option<bool> = self.call("deleteMessage", params).await?;
        Ok(())
    }
}
