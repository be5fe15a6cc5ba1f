use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::vocabulary::SKILL_VOCABULARY;

const NAME_MAX_CHARS: usize = 50;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});

static EMAIL_EXACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

// +33 / 00 33 / 0, a significant digit, then four pairs with optional separators.
static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?:\+|00)\s?33|0)\s*[1-9](?:[\s.-]*[0-9]{2}){4}").expect("valid phone regex")
});

/// Contact details and skills recovered from document text. Best effort: the same text
/// always yields the same fields, nothing more is promised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub skills: Vec<String>,
}

pub fn extract_fields(text: &str) -> ExtractedFields {
    ExtractedFields {
        email: extract_email(text),
        phone: extract_phone(text),
        name: extract_name(text),
        skills: extract_skills(text),
    }
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL.find(text).map(|found| found.as_str().to_string())
}

/// Phone number with whitespace removed; dots and dashes are kept as written.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE.find(text).map(|found| {
        found
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect()
    })
}

pub fn extract_name(text: &str) -> Option<String> {
    let first_line = text.lines().next()?.trim();
    if first_line.is_empty()
        || first_line.chars().count() >= NAME_MAX_CHARS
        || first_line.contains('@')
    {
        return None;
    }
    Some(first_line.to_string())
}

/// Vocabulary terms occurring anywhere in the text, in vocabulary order.
pub fn extract_skills(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    SKILL_VOCABULARY
        .iter()
        .filter(|skill| haystack.contains(&skill.to_lowercase()))
        .map(|skill| skill.to_string())
        .collect()
}

/// Whole-string check used to validate applicant-supplied addresses.
pub fn looks_like_email(candidate: &str) -> bool {
    EMAIL_EXACT.is_match(candidate.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_contact_line() {
        let fields = extract_fields("Contact: jane.doe@example.com, 06 12 34 56 78");

        assert_eq!(fields.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(fields.phone.as_deref(), Some("0612345678"));
        assert_eq!(fields.name, None);
    }

    #[test]
    fn accepts_international_prefixes() {
        assert_eq!(
            extract_phone("tel +33 6 12 34 56 78").as_deref(),
            Some("+33612345678")
        );
        assert_eq!(
            extract_phone("tel 0033 1.23.45.67.89").as_deref(),
            Some("00331.23.45.67.89")
        );
        assert_eq!(extract_phone("06-12-34-56-78").as_deref(), Some("06-12-34-56-78"));
    }

    #[test]
    fn ignores_numbers_that_are_not_phones() {
        assert_eq!(extract_phone("Order 00 12 34"), None);
        assert_eq!(extract_phone("05 0 12"), None);
    }

    #[test]
    fn name_is_the_short_first_line() {
        assert_eq!(
            extract_name("  Jane Doe  \nSenior engineer").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(extract_name("jane.doe@example.com\nJane"), None);
        assert_eq!(extract_name(&"x".repeat(50)), None);
        assert_eq!(extract_name(&"x".repeat(49)).map(|name| name.len()), Some(49));
        assert_eq!(extract_name("\nJane Doe"), None);
        assert_eq!(extract_name(""), None);
    }

    #[test]
    fn skills_follow_vocabulary_order_without_duplicates() {
        let skills =
            extract_skills("Built REST services in java with spring boot; JAVA once more. Docker.");
        assert_eq!(skills, vec!["Java", "Spring", "Spring Boot", "Docker", "REST"]);
    }

    #[test]
    fn substring_matching_is_deliberately_loose() {
        // "JavaScript" also contains "Java".
        let skills = extract_skills("JavaScript");
        assert_eq!(skills, vec!["Java", "JavaScript"]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "Jane Doe\njane@example.org\n+33 6 11 22 33 44\nPython, Kafka, AWS";
        assert_eq!(extract_fields(text), extract_fields(text));
    }

    #[test]
    fn validates_whole_addresses() {
        assert!(looks_like_email(" jane.doe@example.com "));
        assert!(!looks_like_email("jane.doe@example"));
        assert!(!looks_like_email("contact jane@example.com"));
    }
}
