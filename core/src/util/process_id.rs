//! Process id generation
//!
//! Ids are derived from the application directory name plus a millisecond
//! timestamp, normalized so they are safe as file names on every platform.
use std::path::Path;

use chrono::{DateTime, Local};

/// `<sanitized dir name>-<unix millis>`, e.g. `my_shop-1717171717171`.
pub fn process_id(dir: &Path, at: DateTime<Local>) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}-{}", sanitize_id(&name), at.timestamp_millis())
}

/// Sanitize a raw name so it is usable as an id
///
/// Rules:
/// - Keep only letters, numbers, hyphens, underscores
/// - Convert to lowercase
/// - Remove consecutive special chars
/// - Strip leading/trailing special chars
/// - Limit to 48 characters
pub fn sanitize_id(raw: &str) -> String {
    let mut sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }
    while sanitized.contains("--") {
        sanitized = sanitized.replace("--", "-");
    }

    sanitized = sanitized
        .trim_matches(|c: char| c == '_' || c == '-')
        .to_string();

    if sanitized.len() > 48 {
        sanitized.truncate(48);
    }

    if sanitized.is_empty() {
        "app".to_string()
    } else {
        sanitized
    }
}
