use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::{DispatchError, DispatchReceipt, MailDispatcher, OutboundMail, SenderOptions, compose_body};

pub const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client de l'API v3 `mail/send`, suivi des ouvertures activé.
#[derive(Debug, Clone)]
pub struct SendGridClient {
    client: reqwest::Client,
    options: SenderOptions,
    endpoint: String,
}

impl SendGridClient {
    pub fn new(options: SenderOptions) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DispatchError::client_build)?;
        Ok(Self {
            client,
            options,
            endpoint: SENDGRID_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub(crate) fn payload(&self, mail: &OutboundMail, from_email: &str) -> Value {
        let (text, html) = compose_body(&mail.text, mail.html.as_deref(), self.options.primary_mode);
        let mut payload = json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": from_email, "name": self.options.from_name },
            "subject": mail.subject,
            "content": [
                { "type": "text/plain", "value": text },
                { "type": "text/html", "value": html }
            ],
            "tracking_settings": { "open_tracking": { "enable": true } },
            "custom_args": mail.custom_args,
        });
        if let Some(reply_to) = self.options.reply_to.as_deref().filter(|r| !r.is_empty()) {
            let mut target = json!({ "email": reply_to });
            if let Some(name) = self.options.reply_to_name.as_deref().filter(|n| !n.is_empty()) {
                target["name"] = json!(name);
            }
            payload["reply_to"] = target;
        }
        payload
    }
}

#[async_trait]
impl MailDispatcher for SendGridClient {
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError> {
        let api_key = self
            .options
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(DispatchError::MissingApiKey)?;
        let from_email = self
            .options
            .from_email
            .as_deref()
            .filter(|f| !f.is_empty())
            .ok_or(DispatchError::MissingSender)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.payload(mail, from_email))
            .send()
            .await
            .map_err(DispatchError::request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let provider_message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        debug!(to = %mail.to, id = ?provider_message_id, "mail accepted by provider");
        Ok(DispatchReceipt {
            provider_message_id,
        })
    }
}
