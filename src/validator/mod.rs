//! Contrôle syntaxique des adresses (premier étage du pipeline).

mod domain;
mod local;
mod types;

pub use domain::normalize_domain;
pub use types::{ParsedAddress, SyntaxReport};

use domain::check_domain;
use local::is_local_valid;

/// Vérifie la syntaxe d'une adresse et collecte toutes les raisons de rejet.
pub fn check_syntax(email: &str) -> SyntaxReport {
    let (reasons, _) = inspect(email);
    SyntaxReport {
        ok: reasons.is_empty(),
        reasons,
    }
}

pub fn is_valid_syntax(email: &str) -> bool {
    check_syntax(email).ok
}

/// Découpe une adresse valide; `None` si la syntaxe est rejetée.
pub fn parse_address(email: &str) -> Option<ParsedAddress> {
    match inspect(email) {
        (reasons, Some(parsed)) if reasons.is_empty() => Some(parsed),
        _ => None,
    }
}

fn inspect(email: &str) -> (Vec<String>, Option<ParsedAddress>) {
    let input = email.trim();
    let mut reasons = Vec::new();

    if input.is_empty() {
        reasons.push("empty address".to_string());
        return (reasons, None);
    }

    // ASCII imprimable uniquement (0x21..=0x7E), donc ni espace ni contrôle
    if !input.chars().all(|c| matches!(c, '!'..='~')) {
        reasons.push("contains whitespace or non-printable characters".to_string());
    }

    let at = match input.find('@') {
        Some(at) if at > 0 && at < input.len() - 1 => at,
        _ => {
            reasons.push("must contain '@' between local part and domain".to_string());
            return (reasons, None);
        }
    };
    let (local, domain) = (&input[..at], &input[at + 1..]);

    if !is_local_valid(local) {
        reasons.push(format!("invalid local part '{}'", local));
    }

    let ascii_domain = check_domain(domain, &mut reasons);

    let parsed = ascii_domain.map(|ascii_domain| ParsedAddress {
        local: local.to_string(),
        domain: domain.to_string(),
        ascii_domain,
    });
    (reasons, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_basic() {
        let r = check_syntax("alice@example.com");
        assert!(r.ok, "{:?}", r.reasons);
    }

    #[test]
    fn trims_before_checking() {
        assert!(is_valid_syntax("  alice@example.com\n"));
    }

    #[test]
    fn rejects_malformed() {
        for bad in [
            "",
            "alice",
            "@example.com",
            "alice@",
            "ali ce@example.com",
            "alicé@example.com",
            "al\"ice@example.com",
            "alice@-example.com",
            "alice@example",
            "alice@example.c",
            "alice@exa..mple.com",
            "alice@b@example.com",
        ] {
            assert!(!is_valid_syntax(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn parse_address_keeps_ascii_domain() {
        let parsed = parse_address("Bob@Example.COM.").expect("valid");
        assert_eq!(parsed.local, "Bob");
        assert_eq!(parsed.ascii_domain, "example.com");
        assert!(parse_address("bob@").is_none());
    }

    #[test]
    fn reasons_are_collected() {
        let r = check_syntax("bad!local@x");
        assert!(!r.ok);
        assert!(r.reasons.len() >= 2, "{:?}", r.reasons);
    }

    proptest! {
        #[test]
        fn without_at_sign_never_valid(s in "[A-Za-z0-9._%+-]{0,40}") {
            prop_assert!(!is_valid_syntax(&s));
        }

        #[test]
        fn inner_whitespace_never_valid(
            local in "[a-z]{1,10}",
            ws in "[ \t]",
            tail in "[a-z]{1,10}",
        ) {
            let email = format!("{local}{ws}{tail}@example.com");
            prop_assert!(!is_valid_syntax(&email));
        }

        #[test]
        fn simple_addresses_valid(local in "[a-z0-9]{1,20}", host in "[a-z]{1,20}", tld in "[a-z]{2,6}") {
            let email = format!("{local}@{host}.{tld}");
            prop_assert!(is_valid_syntax(&email));
        }
    }
}
