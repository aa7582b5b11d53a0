//! Conditional-request support: entity tags and freshness.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::resolve::FileMetadata;

/// Compute the entity tag for a file.
///
/// The tag is a quoted hex digest of the file's identity fingerprint,
/// `<inode>-<size>-<mtime>`. It depends on nothing else, so an unchanged
/// file keeps its tag across requests and restarts, while any rewrite that
/// touches size or mtime produces a new one.
pub fn compute_etag(meta: &FileMetadata) -> String {
    let mtime = meta
        .modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let fingerprint = format!(
        "{}-{}-{}.{}",
        meta.ino,
        meta.size,
        mtime.as_secs(),
        mtime.subsec_nanos()
    );

    let mut hasher = DefaultHasher::new();
    fingerprint.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// Decide whether the client's cached copy is still good, i.e. whether the
/// request can be answered with 304.
///
/// `no_cache` forces a full response. Otherwise the copy is stale when the
/// request carries no validator at all, when `If-None-Match` differs from
/// the current tag, or when `If-Modified-Since` is strictly earlier than the
/// file's mtime truncated to whole seconds. An `If-Modified-Since` that
/// fails to parse still counts as a validator, but never as earlier.
pub fn is_fresh(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    modified: SystemTime,
    no_cache: bool,
) -> bool {
    if no_cache {
        return false;
    }
    if if_none_match.is_none() && if_modified_since.is_none() {
        return false;
    }
    if matches!(if_none_match, Some(tag) if tag != etag) {
        return false;
    }
    if let Some(since) = if_modified_since.and_then(|value| httpdate::parse_http_date(value).ok()) {
        if since < truncate_to_seconds(modified) {
            return false;
        }
    }
    true
}

// HTTP dates have whole-second resolution; the file's mtime usually doesn't.
fn truncate_to_seconds(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => UNIX_EPOCH + Duration::from_secs(elapsed.as_secs()),
        Err(_) => time,
    }
}
