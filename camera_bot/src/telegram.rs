use crate::config::TelegramConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::instrument;
use traffic_core::ErrorKind;

pub type ChatId = i64;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Telegram API error on {method}: {description}")]
    Api { method: String, description: String },
}

impl TelegramError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TelegramError::RequestFailed(e) if e.is_decode() => ErrorKind::Malformed,
            TelegramError::RequestFailed(_) => ErrorKind::Upstream,
            TelegramError::Api { .. } => ErrorKind::Upstream,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T, TelegramError> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                method: method.to_string(),
                description: self
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub file_name: String,
    pub caption: String,
    pub data: Bytes,
}

/// The three messaging primitives the bot is built on.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    async fn get_updates(&self, offset: i64, timeout_secs: u64)
        -> Result<Vec<Update>, TelegramError>;

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError>;

    async fn send_photo(&self, chat_id: ChatId, photo: Photo) -> Result<(), TelegramError>;
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(config.get_request_timeout())
            .build()?;
        let base_url = format!(
            "{}/bot{}",
            config.api_base_url.trim_end_matches('/'),
            config.get_token()
        );
        Ok(Self { client, base_url })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &str,
    ) -> Result<T, TelegramError> {
        let body: ApiResponse<T> = response.json().await?;
        body.into_result(method)
    }
}

#[async_trait]
impl ChatTransport for TelegramClient {
    #[instrument(skip(self))]
    async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", timeout_secs as i64)])
            .send()
            .await?;
        Self::read(response, "getUpdates").await
    }

    #[instrument(skip(self, text))]
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TelegramError> {
        let chat_id = chat_id.to_string();
        let mut form = vec![("chat_id", chat_id.as_str()), ("text", text)];
        if let Some(mode) = parse_mode {
            form.push(("parse_mode", mode.as_str()));
        }

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .form(&form)
            .send()
            .await?;
        Self::read::<serde_json::Value>(response, "sendMessage").await?;
        Ok(())
    }

    #[instrument(skip(self, photo), fields(caption = %photo.caption, size = photo.data.len()))]
    async fn send_photo(&self, chat_id: ChatId, photo: Photo) -> Result<(), TelegramError> {
        let length = photo.data.len() as u64;
        let part = multipart::Part::stream_with_length(photo.data, length)
            .file_name(photo.file_name)
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", photo.caption)
            .part("photo", part);

        let response = self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()
            .await?;
        Self::read::<serde_json::Value>(response, "sendPhoto").await?;
        Ok(())
    }
}
