//! Keyword intent matcher (spec §4.6.a, Idle's intent routing), ported in semantics
//! from `original_source/.../keyword_intent_matcher.py` — the same normalize-and-match
//! strategy as [`super::TerminationPhraseDetector`], keyed by intent name instead of a
//! single yes/no phrase list.

use super::termination::normalize_text;
use super::ActivityKind;

#[derive(Debug, Clone)]
pub struct IntentMatch {
    pub kind: ActivityKind,
    pub confidence: f32,
}

/// Keeps intents in the order they were first seen in the keyword list: with
/// overlapping keywords across intents, the first table entry that matches wins, so
/// iteration order must match the source list's order rather than a hash order.
pub struct KeywordIntentMatcher {
    intents: Vec<(ActivityKind, Vec<String>)>,
}

impl KeywordIntentMatcher {
    pub fn new(intents: Vec<(ActivityKind, Vec<String>)>) -> Self {
        Self { intents }
    }

    /// Builds straight from a language bundle's flat `"activity_kind:keyword"` list
    /// (spec §4.6.a/g; both Idle and Activity Suggestion route off the same encoding).
    pub fn from_keyword_list(keywords: &[String]) -> Self {
        Self::new(build_intent_table(keywords))
    }

    pub fn match_intent(&self, transcript: &str) -> Option<IntentMatch> {
        if transcript.is_empty() {
            return None;
        }
        let normalized_transcript = normalize_text(transcript);

        for (kind, keywords) in &self.intents {
            for keyword in keywords {
                let normalized_keyword = normalize_text(keyword);
                if normalized_keyword.is_empty() {
                    continue;
                }
                if normalized_transcript == normalized_keyword
                    || normalized_transcript.starts_with(&format!("{normalized_keyword} "))
                    || normalized_transcript.contains(&normalized_keyword)
                {
                    return Some(IntentMatch { kind: *kind, confidence: 1.0 });
                }
            }
        }
        None
    }
}

fn build_intent_table(keywords: &[String]) -> Vec<(ActivityKind, Vec<String>)> {
    let mut table: Vec<(ActivityKind, Vec<String>)> = Vec::new();
    for entry in keywords {
        if let Some((kind_str, keyword)) = entry.split_once(':') {
            if let Some(kind) = parse_activity_kind(kind_str) {
                match table.iter_mut().find(|(k, _)| *k == kind) {
                    Some((_, list)) => list.push(keyword.to_string()),
                    None => table.push((kind, vec![keyword.to_string()])),
                }
            }
        }
    }
    table
}

fn parse_activity_kind(s: &str) -> Option<ActivityKind> {
    match s {
        "smalltalk" => Some(ActivityKind::SmallTalk),
        "journal" => Some(ActivityKind::Journal),
        "gratitude" => Some(ActivityKind::Gratitude),
        "quote" => Some(ActivityKind::Quote),
        "meditation" => Some(ActivityKind::Meditation),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_activity_kind_covers_routable_activities() {
        for name in ["smalltalk", "journal", "gratitude", "quote", "meditation"] {
            assert!(parse_activity_kind(name).is_some());
        }
        assert!(parse_activity_kind("unknown").is_none());
    }

    #[test]
    fn matches_first_hit_keyword() {
        let intents = vec![
            (ActivityKind::Gratitude, vec!["grateful".to_string(), "thankful".to_string()]),
            (ActivityKind::Quote, vec!["inspire me".to_string()]),
        ];
        let matcher = KeywordIntentMatcher::new(intents);

        let result = matcher.match_intent("I'm feeling grateful today").unwrap();
        assert_eq!(result.kind, ActivityKind::Gratitude);
    }

    #[test]
    fn earlier_table_entry_wins_on_overlapping_keywords() {
        let intents = vec![(ActivityKind::Gratitude, vec!["calm".to_string()]), (ActivityKind::Meditation, vec!["calm".to_string()])];
        let matcher = KeywordIntentMatcher::new(intents);

        let result = matcher.match_intent("I want to feel calm").unwrap();
        assert_eq!(result.kind, ActivityKind::Gratitude);
    }

    #[test]
    fn returns_none_for_unmatched_transcript() {
        let matcher = KeywordIntentMatcher::new(Vec::new());
        assert!(matcher.match_intent("random text").is_none());
    }
}
