//! Termination phrase detector (spec §4.6), ported in semantics from
//! `original_source/.../termination_phrase.py` — normalization plus three matching
//! strategies (exact, prefix, substring). Raising an exception on match is replaced by
//! a plain boolean return; the cooperative `ActivityControl::Cancelled` signal the
//! caller derives from it is what propagates the cancellation (spec §9).

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let without_punct: String = lower.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    without_punct.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stateless per-activity detector over a fixed phrase list (spec §4.6).
pub struct TerminationPhraseDetector {
    phrases: Vec<String>,
    require_active: bool,
}

impl TerminationPhraseDetector {
    pub fn new(phrases: Vec<String>, require_active: bool) -> Self {
        Self { phrases, require_active }
    }

    pub fn is_termination_phrase(&self, user_text: &str, active: bool) -> bool {
        if user_text.is_empty() {
            return false;
        }
        if self.require_active && !active {
            return false;
        }

        let normalized_user = normalize_text(user_text);
        self.phrases.iter().any(|phrase| {
            let normalized_phrase = normalize_text(phrase);
            if normalized_phrase.is_empty() {
                return false;
            }
            normalized_user == normalized_phrase || normalized_user.starts_with(&format!("{normalized_phrase} ")) || normalized_user.contains(&normalized_phrase)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_case() {
        assert_eq!(normalize_text("Stop,  Now!"), "stop now");
    }

    #[test]
    fn matches_exact_prefix_and_substring() {
        let detector = TerminationPhraseDetector::new(vec!["that's all".to_string()], false);
        assert!(detector.is_termination_phrase("That's all", true));
        assert!(detector.is_termination_phrase("that's all for today", true));
        assert!(detector.is_termination_phrase("ok, that's all, thanks", true));
        assert!(!detector.is_termination_phrase("thats different", true));
    }

    #[test]
    fn require_active_gates_matching() {
        let detector = TerminationPhraseDetector::new(vec!["done".to_string()], true);
        assert!(!detector.is_termination_phrase("done", false));
        assert!(detector.is_termination_phrase("done", true));
    }
}
