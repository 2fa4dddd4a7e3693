use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{MailTransport, NotifyError};

pub struct HttpMailer {
    client: reqwest::Client,
    send_url: String,
}

impl HttpMailer {
    pub fn new(send_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, send_url }
    }
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "to": to,
            "subject": subject,
            "body": body,
        });

        let response = self
            .client
            .post(&self.send_url)
            .json(&payload)
            .send()
            .await
            .map_err(|err| NotifyError::Mail(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Mail(format!(
                "relay rejected with {status}: {body}"
            )));
        }
        Ok(())
    }
}
