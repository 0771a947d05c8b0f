pub mod post;
pub mod project;
pub mod task;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

/// Bounds applied to user-supplied fields before anything is persisted.
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MAX_NOTES_CHARS: usize = 1000;
pub const MAX_LIST_ITEMS: usize = 10;
pub const MAX_DEPENDENCIES: usize = 5;

pub fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

pub fn parse_rfc3339(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

pub fn new_entity_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::now_v7())
}

/// Truncate to a maximum number of characters, never splitting a char.
pub fn truncate_chars(raw: &str, max_chars: usize) -> String {
    if raw.chars().count() <= max_chars {
        return raw.to_string();
    }
    raw.chars().take(max_chars).collect()
}

/// Normalize a tag-style list: trim, lowercase, drop empties and
/// duplicates, clamp to `max_items`.
pub fn clamp_tag_list(raw: &[String], max_items: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in raw {
        let normalized = entry.trim().to_ascii_lowercase();
        if normalized.is_empty() || out.iter().any(|existing| existing == &normalized) {
            continue;
        }
        out.push(normalized);
        if out.len() == max_items {
            break;
        }
    }
    out
}

/// Clamp an id list without renaming entries: drop empties and
/// duplicates, keep at most `max_items`.
pub fn clamp_id_list(raw: &[String], max_items: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in raw {
        let trimmed = entry.trim();
        if trimmed.is_empty() || out.iter().any(|existing| existing == trimmed) {
            continue;
        }
        out.push(trimmed.to_string());
        if out.len() == max_items {
            break;
        }
    }
    out
}
