use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ChatTransport, NotifyError};

pub struct BotApiChat {
    client: reqwest::Client,
    push_url: String,
    token: String,
}

impl BotApiChat {
    pub fn new(push_url: String, token: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            push_url,
            token,
        }
    }
}

#[async_trait]
impl ChatTransport for BotApiChat {
    async fn push(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "to": channel_id,
            "messages": [{ "type": "text", "text": text }],
        });

        let mut request = self.client.post(&self.push_url).json(&payload);
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| NotifyError::Chat(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Chat(format!(
                "push rejected with {status}: {body}"
            )));
        }
        Ok(())
    }
}
