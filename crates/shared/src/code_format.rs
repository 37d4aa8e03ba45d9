/// Minimum length of a plausible transfer code after separator stripping.
pub const MIN_CODE_LEN: usize = 11;

/// Cheap format check applied before any authority lookup: strip separator
/// characters, then require the issuer prefix and a minimum length. Scanned
/// payloads from foreign devices fail here without ever reaching the
/// authority.
pub fn is_plausible_code(code: &str, issuer_code: &str) -> bool {
    let cleaned: String = code.chars().filter(|c| c.is_alphanumeric()).collect();
    cleaned.starts_with(issuer_code) && cleaned.len() >= MIN_CODE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_well_formed_code() {
        assert!(is_plausible_code("088SH1A2B3CF4G", "088"));
    }

    #[test]
    fn accepts_a_code_with_separators() {
        assert!(is_plausible_code("088-SH1A2B-3CF4G", "088"));
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(!is_plausible_code("020SH1A2B3CF4G", "088"));
    }

    #[test]
    fn rejects_short_codes() {
        assert!(!is_plausible_code("088SH1A", "088"));
        assert!(!is_plausible_code("", "088"));
    }
}
