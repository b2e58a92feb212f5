//! Date normalization for form fields.
//!
//! Date-typed inputs only accept ISO `YYYY-MM-DD`; plan values may arrive
//! in whatever format the reasoning backend or the profile used.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Formats accepted from plans and profile payloads, tried in order.
const INPUT_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%d %B %Y",
];

/// Parse a human-entered date and normalize it to ISO `YYYY-MM-DD`.
///
/// Returns `None` when no known format matches; the caller fills the
/// literal string instead.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    for format in INPUT_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

/// Current-date context merged into every job's profile data so the plan
/// generator can populate date fields without asking the user.
pub fn date_context(now: chrono::DateTime<chrono::Utc>) -> BTreeMap<String, String> {
    let mut ctx = BTreeMap::new();
    ctx.insert("current_date".to_string(), now.format("%Y-%m-%d").to_string());
    ctx.insert("current_day".to_string(), now.format("%A").to_string());
    ctx.insert("current_year".to_string(), now.year().to_string());
    ctx
}
