//! Envoi des messages via le fournisseur transactionnel.

mod client;
mod error;
mod html;
mod options;

pub use client::{SENDGRID_URL, SendGridClient};
pub use error::DispatchError;
pub use html::{compose_body, escape_html, strip_html_to_text};
pub use options::SenderOptions;

use std::collections::BTreeMap;

use async_trait::async_trait;

/// Message prêt à partir. `custom_args` revient dans les webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub custom_args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReceipt {
    /// En-tête `x-message-id` de la réponse.
    pub provider_message_id: Option<String>,
}

#[async_trait]
pub trait MailDispatcher: Send + Sync {
    async fn send(&self, mail: &OutboundMail) -> Result<DispatchReceipt, DispatchError>;
}
