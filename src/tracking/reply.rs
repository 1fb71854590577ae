use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeaderMap};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::store::MessageRecord;

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9\-._]+@.*?)>").expect("static regex"));

/// Réponse entrante (webhook « inbound parse »).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundReply {
    pub in_reply_to: String,
    pub references: String,
    /// Expéditeur de la réponse, c'est-à-dire notre destinataire initial.
    pub from: Option<String>,
    pub to: Option<String>,
}

impl InboundReply {
    /// `headers` peut être un objet JSON ou le bloc d'en-têtes brut.
    pub fn from_payload(payload: &Value) -> Self {
        let (mut in_reply_to, mut references) = match payload.get("headers") {
            Some(Value::Object(map)) => {
                let header = |name: &str| {
                    map.iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(name))
                        .and_then(|(_, v)| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                (header("In-Reply-To"), header("References"))
            }
            Some(Value::String(raw)) => match mailparse::parse_headers(raw.as_bytes()) {
                Ok((headers, _)) => (
                    headers.get_first_value("In-Reply-To").unwrap_or_default(),
                    headers.get_first_value("References").unwrap_or_default(),
                ),
                Err(_) => Default::default(),
            },
            _ => Default::default(),
        };
        if in_reply_to.is_empty() {
            in_reply_to = field_str(payload, "in-reply-to");
        }
        if references.is_empty() {
            references = field_str(payload, "references");
        }

        Self {
            in_reply_to,
            references,
            from: payload.get("from").and_then(address_of),
            to: payload.get("to").and_then(address_of),
        }
    }

    /// Premier identifiant `<id@hôte>` trouvé dans In-Reply-To puis References.
    pub fn reference_id(&self) -> Option<&str> {
        [self.in_reply_to.as_str(), self.references.as_str()]
            .into_iter()
            .find_map(|text| REFERENCE_RE.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Adresse utilisée pour le rapprochement de repli.
    pub fn counterpart(&self) -> Option<&str> {
        self.from.as_deref().or(self.to.as_deref())
    }
}

fn field_str(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn address_of(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(address_of),
        Value::Object(map) => map.get("email").and_then(address_of),
        Value::String(raw) => parse_mailbox(raw),
        _ => None,
    }
}

fn parse_mailbox(raw: &str) -> Option<String> {
    let parsed = mailparse::addrparse(raw).ok().and_then(|list| {
        list.iter().find_map(|addr| match addr {
            MailAddr::Single(info) => Some(info.addr.clone()),
            MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
        })
    });
    parsed
        .or_else(|| Some(raw.trim().to_string()))
        .filter(|addr| !addr.is_empty())
        .map(|addr| addr.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Reference,
    Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyMatch {
    pub index: usize,
    pub matched_by: MatchedBy,
    /// `false` quand la réponse était déjà enregistrée.
    pub newly_recorded: bool,
}

/// Rattache une réponse à un envoi et pose `repliedAt` une seule fois.
///
/// Priorité à la référence d'en-tête (`sgMessageId` contenu dans l'id
/// référencé); sinon l'envoi le plus récent vers la même adresse et sans
/// réponse.
pub fn record_reply(
    messages: &mut [MessageRecord],
    reply: &InboundReply,
    now: DateTime<Utc>,
) -> Option<ReplyMatch> {
    let by_reference = reply.reference_id().and_then(|reference| {
        messages.iter().position(|m| {
            m.sg_message_id
                .as_deref()
                .is_some_and(|id| !id.is_empty() && reference.contains(id))
        })
    });

    let (index, matched_by) = match by_reference {
        Some(index) => (index, MatchedBy::Reference),
        None => {
            let address = reply.counterpart()?.to_lowercase();
            let index = messages
                .iter()
                .enumerate()
                .filter(|(_, m)| m.replied_at.is_none() && m.to.to_lowercase() == address)
                .max_by_key(|(_, m)| m.created_at)
                .map(|(i, _)| i)?;
            (index, MatchedBy::Recipient)
        }
    };

    let record = &mut messages[index];
    let newly_recorded = record.replied_at.is_none();
    if newly_recorded {
        record.replied_at = Some(now);
    }
    Some(ReplyMatch {
        index,
        matched_by,
        newly_recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn messages() -> Vec<MessageRecord> {
        let mut a = MessageRecord::new("m1", "T0001", "Bob@Example.com", at(0));
        a.sg_message_id = Some("abc123".to_string());
        let b = MessageRecord::new("m2", "T0002", "bob@example.com", at(60));
        let c = MessageRecord::new("m3", "T0003", "amy@example.com", at(120));
        vec![a, b, c]
    }

    #[test]
    fn payload_with_header_object() {
        let reply = InboundReply::from_payload(&json!({
            "headers": {"in-reply-to": "<abc123.filter0001.1@geopod-ismtpd-1>"},
            "from": "Bob <Bob@Example.com>",
            "to": [{"email": "inbox@relay.test"}]
        }));
        assert_eq!(reply.reference_id(), Some("abc123.filter0001.1@geopod-ismtpd-1"));
        assert_eq!(reply.from.as_deref(), Some("bob@example.com"));
        assert_eq!(reply.to.as_deref(), Some("inbox@relay.test"));
    }

    #[test]
    fn payload_with_raw_headers() {
        let reply = InboundReply::from_payload(&json!({
            "headers": "Subject: Re: hi\r\nIn-Reply-To: <xyz@mail.test>\r\nReferences: <first@mail.test> <xyz@mail.test>\r\n\r\n",
            "to": "inbox@relay.test"
        }));
        assert_eq!(reply.reference_id(), Some("xyz@mail.test"));
        assert_eq!(reply.counterpart(), Some("inbox@relay.test"));
    }

    #[test]
    fn reference_match_records_once() {
        let mut msgs = messages();
        let reply = InboundReply {
            in_reply_to: "<abc123.filter0001@ismtpd>".to_string(),
            ..InboundReply::default()
        };

        let first = record_reply(&mut msgs, &reply, at(500)).expect("matched");
        assert_eq!(first.index, 0);
        assert_eq!(first.matched_by, MatchedBy::Reference);
        assert!(first.newly_recorded);

        let replay = record_reply(&mut msgs, &reply, at(900)).expect("matched again");
        assert!(!replay.newly_recorded);
        assert_eq!(msgs[0].replied_at, Some(at(500)));
    }

    #[test]
    fn recipient_fallback_picks_latest_unreplied() {
        let mut msgs = messages();
        let reply = InboundReply {
            from: Some("BOB@example.com".to_string()),
            ..InboundReply::default()
        };
        let m = record_reply(&mut msgs, &reply, at(500)).expect("matched");
        assert_eq!((m.index, m.matched_by), (1, MatchedBy::Recipient));

        let m = record_reply(&mut msgs, &reply, at(600) + TimeDelta::seconds(1)).expect("older one");
        assert_eq!(m.index, 0);

        assert!(record_reply(&mut msgs, &reply, at(700)).is_none());
    }

    #[test]
    fn unmatched_reply() {
        let mut msgs = messages();
        let reply = InboundReply {
            in_reply_to: "<nothing@here>".to_string(),
            from: Some("nobody@example.com".to_string()),
            ..InboundReply::default()
        };
        assert!(record_reply(&mut msgs, &reply, at(1)).is_none());
    }
}
