//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::UnicodeNormalization;

/// Trim and NFC-normalize a login so visually identical logins collide on the
/// unique index.
pub(crate) fn normalize_login(value: &str) -> String {
    value.trim().nfc().collect()
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_is_trimmed_and_composed() {
        // "e" followed by a combining acute accent.
        assert_eq!(normalize_login("  jose\u{301} "), "jos\u{e9}");
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" Ada ")),
            Some("Ada".to_string())
        );
    }
}
