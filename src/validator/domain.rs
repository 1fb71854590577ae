/// Normalise un domaine: trim, suppression des points finaux, IDNA → ASCII.
///
/// Renvoie `None` si le résultat est vide ou si la conversion échoue.
pub fn normalize_domain(domain: &str) -> Option<String> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    match idna::domain_to_ascii(trimmed) {
        Ok(ascii) if !ascii.is_empty() => Some(ascii),
        _ => None,
    }
}

/// Valide le domaine: conversion IDNA + checks de labels.
/// Push des raisons invalidantes dans `reasons`; renvoie le domaine ASCII.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    let Some(ascii) = normalize_domain(domain) else {
        reasons.push("domain normalization failed".to_string());
        return None;
    };

    let labels: Vec<&str> = ascii.split('.').collect();
    if labels.len() < 2 {
        reasons.push("domain must have at least two labels".to_string());
    }

    for label in &labels {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
    }

    if let Some(tld) = labels.last().filter(|_| labels.len() >= 2) {
        if tld.len() < 2 {
            reasons.push(format!("top-level label '{}' shorter than 2", tld));
        }
    }

    Some(ascii)
}
