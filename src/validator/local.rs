/// Partie locale: 1..=64 caractères parmi `[A-Za-z0-9._%+-]`.
pub(crate) fn is_local_valid(s: &str) -> bool {
    (1..=64).contains(&s.len())
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn allowed_charset() {
        assert!(is_local_valid("john.doe+promo_1%x-y"));
        assert!(!is_local_valid("jo\"hn"));
        assert!(!is_local_valid("a!b"));
    }
    #[test]
    fn length_bounds() {
        assert!(!is_local_valid(""));
        assert!(is_local_valid(&"a".repeat(64)));
        assert!(!is_local_valid(&"a".repeat(65)));
    }
}
