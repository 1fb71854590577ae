use std::borrow::Cow;

use phf::phf_map;

static REASON_TEXT: phf::Map<&'static str, &'static str> = phf_map! {
    "bad_syntax" => "invalid address syntax",
    "bad_domain" => "domain does not resolve (no MX/A/AAAA)",
    "mailboxlayer_disposable" => "temporary/disposable mailbox",
    "mailboxlayer_role" => "role address (info@, admin@, ...)",
    "mailboxlayer_free_mail_blocked" => "free mail providers are blocked by configuration",
    "mailboxlayer_smtp_false" => "SMTP check failed",
    "mailboxlayer_catch_all" => "catch-all domain (blocked by configuration)",
    "mailboxlayer_low_score" => "low deliverability score",
    "mailboxlayer_unavailable" => "scoring service unavailable (not blocking)",
};

const UNAVAILABLE_PREFIX: &str = "mailboxlayer_unavailable";

/// Texte lisible d'un code de raison; un code inconnu est renvoyé tel quel.
pub fn reason_text(code: &str) -> Cow<'_, str> {
    if let Some(text) = REASON_TEXT.get(code) {
        return Cow::Borrowed(*text);
    }
    if code.starts_with(UNAVAILABLE_PREFIX) {
        if let Some(text) = REASON_TEXT.get(UNAVAILABLE_PREFIX) {
            return Cow::Borrowed(*text);
        }
    }
    Cow::Borrowed(code)
}
