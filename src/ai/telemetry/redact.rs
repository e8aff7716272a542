//! PII redaction for logged prompt/response text
//!
//! Prompts routinely embed resume content, so redaction runs on everything
//! that is persisted, successful or not.

use regex::Regex;
use std::sync::LazyLock;

use crate::constants::telemetry::{EMAIL_PLACEHOLDER, PHONE_PLACEHOLDER};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

// Optional country code, then 3-3-4 digits with optional (), space, dot or dash separators
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b")
        .expect("phone pattern is valid")
});

/// Replace email addresses and phone numbers with fixed placeholders
pub fn redact_pii(text: &str) -> String {
    let without_emails = EMAIL_RE.replace_all(text, EMAIL_PLACEHOLDER);
    PHONE_RE
        .replace_all(&without_emails, PHONE_PLACEHOLDER)
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_redacts_email_and_phone() {
        let input = "Contact jane.doe@example.com or (416) 555-1234 for details.";
        assert_eq!(
            redact_pii(input),
            "Contact [REDACTED_EMAIL] or [REDACTED_PHONE] for details."
        );
    }

    #[test]
    fn test_phone_formats() {
        for phone in [
            "416-555-1234",
            "416.555.1234",
            "416 555 1234",
            "4165551234",
            "+1 416-555-1234",
            "(416)555-1234",
        ] {
            let redacted = redact_pii(&format!("call {} now", phone));
            assert_eq!(redacted, "call [REDACTED_PHONE] now", "format: {}", phone);
        }
    }

    #[test]
    fn test_leaves_ordinary_text_alone() {
        let input = "5 years of Rust, salary 120k-150k, started 2019-03-01.";
        assert_eq!(redact_pii(input), input);
    }

    #[test]
    fn test_multiple_occurrences() {
        let input = "a@b.io, c@d.org; 416-555-1234 / 647-555-9876";
        assert_eq!(
            redact_pii(input),
            "[REDACTED_EMAIL], [REDACTED_EMAIL]; [REDACTED_PHONE] / [REDACTED_PHONE]"
        );
    }

    proptest! {
        #[test]
        fn prop_emails_never_survive(
            local in "[a-z][a-z0-9._]{0,12}",
            domain in "[a-z]{1,10}",
            tld in "(com|org|io|dev)",
            prefix in "[A-Za-z ]{0,20}",
        ) {
            let email = format!("{}@{}.{}", local, domain, tld);
            let redacted = redact_pii(&format!("{} {} end", prefix, email));
            prop_assert!(!redacted.contains(&email));
            prop_assert!(redacted.contains(EMAIL_PLACEHOLDER));
        }

        #[test]
        fn prop_phones_never_survive(
            area in 200u32..1000,
            exchange in 200u32..1000,
            line in 0u32..10000,
            sep in "[ .-]",
        ) {
            let phone = format!("{}{}{}{}{:04}", area, sep, exchange, sep, line);
            let redacted = redact_pii(&format!("phone: {} thanks", phone));
            prop_assert_eq!(redacted, format!("phone: {} thanks", PHONE_PLACEHOLDER));
        }

        #[test]
        fn prop_text_without_digits_or_at_is_unchanged(text in "[A-Za-z ,.!?]{0,80}") {
            prop_assert_eq!(redact_pii(&text), text);
        }
    }
}
