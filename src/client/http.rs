use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};

use super::{parse_history, parse_reply, parse_status, ChatReply, ChatService};
use crate::core::attachment::Attachment;
use crate::core::config::AppConfig;
use crate::core::error::ChatError;
use crate::core::history::RawRecord;
use crate::core::status::AccountStatus;

/// `ChatService` over the service's JSON/multipart HTTP API.
pub struct HttpChatService {
    client: Client,
    chat_url: String,
    upload_url: String,
    history_url: String,
    status_url: String,
}

impl HttpChatService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            chat_url: config.endpoint_url(&config.endpoints.chat),
            upload_url: config.endpoint_url(&config.endpoints.upload),
            history_url: config.endpoint_url(&config.endpoints.history),
            status_url: config.endpoint_url(&config.endpoints.status),
        }
    }

    /// Send once and return the body of a 2xx response.
    async fn execute(&self, req: RequestBuilder, token: &str) -> Result<String, ChatError> {
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let detail = super::error_detail(&body);
            tracing::warn!("chat service returned {status}: {detail}");
            return Err(ChatError::RequestFailed(detail));
        }
        Ok(body)
    }
}

#[async_trait]
impl ChatService for HttpChatService {
    async fn chat(&self, token: &str, query: &str) -> Result<ChatReply, ChatError> {
        tracing::debug!("POST {} ({} chars)", self.chat_url, query.len());
        let req = self
            .client
            .post(&self.chat_url)
            .json(&serde_json::json!({ "query": query }));
        let body = self.execute(req, token).await?;
        parse_reply(&body)
    }

    async fn upload(
        &self,
        token: &str,
        attachment: &Attachment,
        query: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        tracing::debug!(
            "POST {} (file {}, {} bytes)",
            self.upload_url,
            attachment.name,
            attachment.len()
        );
        let mut form = Form::new().part(
            "file",
            Part::bytes(attachment.bytes.clone()).file_name(attachment.name.clone()),
        );
        if let Some(query) = query {
            form = form.text("query", query.to_string());
        }
        let req = self.client.post(&self.upload_url).multipart(form);
        let body = self.execute(req, token).await?;
        parse_reply(&body)
    }

    async fn history(&self, token: &str) -> Result<Vec<RawRecord>, ChatError> {
        let req = self.client.get(&self.history_url);
        let body = self.execute(req, token).await?;
        parse_history(&body)
    }

    async fn account_status(&self, token: &str) -> Result<AccountStatus, ChatError> {
        let req = self.client.get(&self.status_url);
        let body = self.execute(req, token).await?;
        parse_status(&body)
    }
}
