/// Characters that never appear in a synthesized address.
pub const STRIPPED_EMAIL_CHARS: &[char] = &[' ', ',', '\'', '"', '(', ')', ':', ';', '<', '>'];

/// Removes every character of [`STRIPPED_EMAIL_CHARS`].
pub fn scrub_email_address(s: &str) -> String {
    s.chars().filter(|c| !STRIPPED_EMAIL_CHARS.contains(c)).collect()
}

/// `first.last@domain`, or `first.middle.last@domain` when a middle name is
/// present, lower-cased and scrubbed. Returns `None` without a first name.
pub fn build_email(first: &str, middle: &str, last: &str, domain: &str) -> Option<String> {
    let (first, middle, last) = (first.trim(), middle.trim(), last.trim());
    let raw = if !middle.is_empty() {
        format!("{}.{}.{}@{}", first, middle, last, domain)
    } else if !first.is_empty() {
        format!("{}.{}@{}", first, last, domain)
    } else {
        return None;
    };
    Some(scrub_email_address(&raw).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula() {
        assert_eq!(
            build_email("Robert", "", "Smith", "faa.gov").as_deref(),
            Some("robert.smith@faa.gov")
        );
        assert_eq!(
            build_email("Jane", "Q", "Doe", "faa.gov").as_deref(),
            Some("jane.q.doe@faa.gov")
        );
        assert_eq!(build_email("", "", "Doe", "faa.gov"), None);
    }

    #[test]
    fn test_stripped_characters() {
        let email = build_email("Mary Ann", "(J)", "O'Neil, Jr;<x>", "faa.gov").unwrap();
        assert_eq!(email, "maryann.j.oneiljrx@faa.gov");
        assert!(!email.contains(STRIPPED_EMAIL_CHARS));
    }

    #[test]
    fn test_idempotent() {
        let once = build_email("De La", "\"Q\"", "Cruz", "faa.gov").unwrap();
        let twice = build_email("De La", "\"Q\"", "Cruz", "faa.gov").unwrap();
        assert_eq!(once, twice);
        assert_eq!(scrub_email_address(&once), once);
    }
}
