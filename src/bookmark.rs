//! Bookmark parsing
//!
//! A bookmark is a replay position expressed as a UTC instant with
//! 100-nanosecond precision: `YYYYMMDDThhmmss.fffffffZ`. The store may append
//! a comma-separated tail; everything from the first comma is ignored.
//!
//! A corrupt bookmark must not prevent recovery, so parse failures degrade to
//! "no filter" with a WARN instead of failing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

const BOOKMARK_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

/// Decode a bookmark string into an instant, or `None` for "no filter".
pub fn parse_bookmark(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Tolerate a trailing ",..." tail from the bookmark store.
    let head = trimmed.split(',').next().unwrap_or(trimmed);

    match NaiveDateTime::parse_from_str(head, BOOKMARK_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(err) => {
            warn!(bookmark = head, %err, "unparseable bookmark, replaying without filter");
            None
        }
    }
}
