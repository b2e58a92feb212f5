//! Success detection over page text.
//!
//! After a submit click, the orchestrator scans the visible text of the
//! page for completion phrases. The phrase list is a heuristic allowlist
//! and therefore configurable; these defaults cover the common
//! confirmation pages.

/// Default completion phrases. Overridable via `FormSettings::success_keywords`.
pub const DEFAULT_SUCCESS_KEYWORDS: [&str; 5] = [
    "thank you",
    "successfully submitted",
    "submission received",
    "your response has been recorded",
    "form submitted",
];

/// Case- and whitespace-insensitive phrase matcher.
#[derive(Debug, Clone)]
pub struct SuccessMatcher {
    phrases: Vec<String>,
}

fn collapse(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl SuccessMatcher {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| collapse(p)).collect(),
        }
    }

    /// True when any configured phrase occurs in `page_text`.
    pub fn matches(&self, page_text: &str) -> bool {
        let haystack = collapse(page_text);
        self.phrases.iter().any(|p| !p.is_empty() && haystack.contains(p.as_str()))
    }
}

impl Default for SuccessMatcher {
    fn default() -> Self {
        Self::new(
            &DEFAULT_SUCCESS_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
        )
    }
}
