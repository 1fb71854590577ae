use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Delivered,
    Bounce,
    Dropped,
    Blocked,
    Deferred,
}

impl DeliveryStatus {
    /// Événements fournisseur qui signalent un échec de remise.
    pub fn from_failure_event(event: &str) -> Option<Self> {
        match event {
            "bounce" => Some(Self::Bounce),
            "dropped" => Some(Self::Dropped),
            "blocked" => Some(Self::Blocked),
            "deferred" => Some(Self::Deferred),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Bounce => "bounce",
            Self::Dropped => "dropped",
            Self::Blocked => "blocked",
            Self::Deferred => "deferred",
        }
    }
}

/// Un envoi et son cycle de vie. Les champs absents d'un ancien fichier
/// prennent leur valeur par défaut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub tag: String,
    #[serde(default)]
    pub token: Option<String>,
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sg_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_status: Option<String>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub first_open_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_open_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub replied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub followup_sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_count: u32,
    #[serde(default)]
    pub sent_logged: bool,
    #[serde(default)]
    pub delivered_logged: bool,
    #[serde(default)]
    pub opened_logged: bool,
    #[serde(default)]
    pub delivery_status: Option<DeliveryStatus>,
    #[serde(default)]
    pub delivery_reason: Option<String>,
    #[serde(default)]
    pub delivery_updated_at: Option<DateTime<Utc>>,
}

impl MessageRecord {
    pub fn new(
        id: impl Into<String>,
        tag: impl Into<String>,
        to: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            tag: tag.into(),
            token: None,
            to: to.into(),
            subject: String::new(),
            text: String::new(),
            sg_message_id: None,
            created_at,
            sent_at: None,
            sent_status: None,
            delivered_at: None,
            opened_at: None,
            first_open_at: None,
            last_open_at: None,
            replied_at: None,
            followup_sent_at: None,
            open_count: 0,
            sent_logged: false,
            delivered_logged: false,
            opened_logged: false,
            delivery_status: None,
            delivery_reason: None,
            delivery_updated_at: None,
        }
    }
}
