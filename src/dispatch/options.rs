use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SenderOptions {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub reply_to_name: Option<String>,
    /// Corps HTML minimal (`<div>`) pour ressembler à un envoi manuel.
    #[serde(default)]
    pub primary_mode: bool,
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

fn default_from_name() -> String {
    "Mailer".to_string()
}

fn default_subject() -> String {
    "Message".to_string()
}

impl Default for SenderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            from_email: None,
            from_name: default_from_name(),
            reply_to: None,
            reply_to_name: None,
            primary_mode: false,
            default_subject: default_subject(),
        }
    }
}
