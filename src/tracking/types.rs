use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventArgs {
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_tag: Option<String>,
}

/// Événement du webhook fournisseur (format SendGrid).
///
/// Les arguments personnalisés sont lus dans `custom_args` ou, à défaut,
/// au premier niveau de l'événement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Secondes Unix, nombre ou chaîne numérique.
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub sg_message_id: Option<String>,
    #[serde(default)]
    pub sg_message_id_legacy: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub custom_args: Option<EventArgs>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub app_tag: Option<String>,
    #[serde(default)]
    pub useragent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, rename = "smtp-id")]
    pub smtp_id: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl ProviderEvent {
    pub fn app_id(&self) -> Option<&str> {
        non_empty(self.custom_args.as_ref().and_then(|a| a.app_id.as_ref()))
            .or_else(|| non_empty(self.app_id.as_ref()))
    }

    pub fn app_tag(&self) -> Option<&str> {
        non_empty(self.custom_args.as_ref().and_then(|a| a.app_tag.as_ref()))
            .or_else(|| non_empty(self.app_tag.as_ref()))
    }

    pub fn provider_message_id(&self) -> Option<&str> {
        non_empty(self.sg_message_id.as_ref())
            .or_else(|| non_empty(self.sg_message_id_legacy.as_ref()))
            .or_else(|| non_empty(self.message_id.as_ref()))
    }

    pub fn recipient(&self) -> Option<String> {
        non_empty(self.email.as_ref()).map(str::to_lowercase)
    }

    pub fn user_agent(&self) -> &str {
        self.useragent.as_deref().unwrap_or_default()
    }

    /// Raison d'échec: `reason`, sinon `response`, sinon `smtp-id`.
    pub fn failure_reason(&self) -> Option<&str> {
        non_empty(self.reason.as_ref())
            .or_else(|| non_empty(self.response.as_ref()))
            .or_else(|| non_empty(self.smtp_id.as_ref()))
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        let seconds = match self.timestamp.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if seconds == 0.0 || !seconds.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
    }
}
