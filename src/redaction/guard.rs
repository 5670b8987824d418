//! Regex backstop for identifiers the model may have missed.
//!
//! Runs over every string in a response body after LLM redaction, so a
//! redaction pass that silently echoes its input still cannot leak SSNs,
//! email addresses or US phone numbers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

// Digit adjacency is checked by hand in `mask_matches`, so these patterns
// carry no leading or trailing anchors and still match inside words.
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{3}-\d{2}-\d{4}").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+1[-. ]?)?(?:\(\d{3}\)\s?|\d{3}[-. ])\d{3}[-. ]\d{4}").expect("valid regex")
});

#[derive(Debug, Clone)]
pub struct PiiGuard {
    mask: String,
}

impl PiiGuard {
    pub fn new(mask: impl Into<String>) -> Self {
        Self { mask: mask.into() }
    }

    /// Mask matches in a single string. Returns the number of replacements.
    pub fn scrub_str(&self, text: &mut String) -> usize {
        self.mask_matches(&SSN_RE, text, true)
            + self.mask_matches(&EMAIL_RE, text, false)
            + self.mask_matches(&PHONE_RE, text, true)
    }

    /// Mask matches in every string of `value`, object keys included.
    pub fn scrub(&self, value: &mut Value) -> usize {
        match value {
            Value::String(s) => self.scrub_str(s),
            Value::Array(items) => items.iter_mut().map(|v| self.scrub(v)).sum(),
            Value::Object(map) => self.scrub_map(map),
            _ => 0,
        }
    }

    fn scrub_map(&self, map: &mut Map<String, Value>) -> usize {
        let mut count = 0;
        for (mut key, mut value) in std::mem::take(map) {
            count += self.scrub(&mut value);
            let masked = self.scrub_str(&mut key);
            if masked > 0 {
                count += masked;
                key = unique_key(map, key);
            }
            map.insert(key, value);
        }
        count
    }

    /// Replace every match of `re`. With `digit_bounded`, a match touching
    /// another digit on either side is part of a longer number and is kept.
    fn mask_matches(&self, re: &Regex, text: &mut String, digit_bounded: bool) -> usize {
        let source = text.as_str();
        let mut out = String::with_capacity(source.len());
        let mut last = 0;
        let mut count = 0;

        for m in re.find_iter(source) {
            if digit_bounded && touches_digit(source, m.start(), m.end()) {
                continue;
            }
            out.push_str(&source[last..m.start()]);
            out.push_str(&self.mask);
            last = m.end();
            count += 1;
        }

        if count > 0 {
            out.push_str(&source[last..]);
            *text = out;
        }
        count
    }
}

fn touches_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}

/// Masked keys can collide; later ones get a numeric suffix.
fn unique_key(map: &Map<String, Value>, key: String) -> String {
    let mut candidate = key.clone();
    let mut n = 2;
    while map.contains_key(&candidate) {
        candidate = format!("{} #{}", key, n);
        n += 1;
    }
    candidate
}

impl Default for PiiGuard {
    fn default() -> Self {
        Self::new("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_ssn_email_and_phone() {
        let guard = PiiGuard::default();
        let mut text = "SSN 123-45-6789, mail jane.doe@agency.gov, call (303) 555-1234 or 720.555.9876".to_string();
        assert_eq!(guard.scrub_str(&mut text), 4);
        assert_eq!(text, "SSN ***, mail ***, call *** or ***");
    }

    #[test]
    fn leaves_dates_and_plain_numbers() {
        let guard = PiiGuard::default();
        let mut text = "Population 5773714 as of 2023-01-15, quarter Q4 2023".to_string();
        assert_eq!(guard.scrub_str(&mut text), 0);
        assert_eq!(text, "Population 5773714 as of 2023-01-15, quarter Q4 2023");
    }

    #[test]
    fn scrubs_nested_values() {
        let guard = PiiGuard::new("[REDACTED]");
        let mut value = json!({
            "records": [
                {"contact": "ops@usdx.gov", "count": 3},
                {"notes": ["ssn 987-65-4321", null, true]}
            ]
        });
        assert_eq!(guard.scrub(&mut value), 2);
        assert_eq!(value["records"][0]["contact"], "[REDACTED]");
        assert_eq!(value["records"][0]["count"], 3);
        assert_eq!(value["records"][1]["notes"][0], "ssn [REDACTED]");
    }

    #[test]
    fn masks_identifiers_used_as_keys() {
        let guard = PiiGuard::default();
        let mut value = json!({
            "123-45-6789": 1,
            "jane.roe@example.com": {"visits": 3, "phone": "303-555-0142"},
            "region": "west"
        });
        assert_eq!(guard.scrub(&mut value), 3);

        let text = value.to_string();
        assert!(!text.contains("123-45-6789"));
        assert!(!text.contains("jane.roe@example.com"));
        assert_eq!(value["region"], "west");

        // Both identifiers mask to the same key; neither entry is dropped
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 3);
        assert!(map.contains_key("***"));
        assert!(map.contains_key("*** #2"));
    }

    #[test]
    fn masks_ssn_glued_to_letters() {
        let guard = PiiGuard::default();
        let mut text = "id123-45-6789 and ref:987-65-4321x".to_string();
        assert_eq!(guard.scrub_str(&mut text), 2);
        assert_eq!(text, "id*** and ref:***x");
    }

    #[test]
    fn keeps_longer_digit_runs() {
        let guard = PiiGuard::default();
        let mut text = "serial 1123-45-67890 batch 303-555-12345".to_string();
        assert_eq!(guard.scrub_str(&mut text), 0);
    }

    #[test]
    fn masks_space_separated_phone() {
        let guard = PiiGuard::default();
        let mut text = "id123-45-6789 tel 303 555 1234".to_string();
        assert_eq!(guard.scrub_str(&mut text), 2);
        assert_eq!(text, "id*** tel ***");
    }

    #[test]
    fn international_prefix_is_consumed() {
        let guard = PiiGuard::default();
        let mut text = "+1 303-555-1234".to_string();
        assert_eq!(guard.scrub_str(&mut text), 1);
        assert_eq!(text, "***");
    }
}
