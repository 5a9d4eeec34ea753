//! UUID v7 utilities for time-ordered identifiers.
//!
//! Folders, notes, and blocks are all keyed by UUIDv7 so that primary keys
//! sort in creation order, which keeps sibling listings and block scans
//! naturally chronological without an extra column.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// UUIDv7 embeds a Unix timestamp (milliseconds) in the first 48 bits,
/// providing natural time-ordering.
///
/// # Example
///
/// ```
/// use carnet_core::uuid_utils::new_v7;
///
/// let id = new_v7();
/// // IDs generated later will be lexicographically greater
/// ```
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

/// Extract the timestamp from a UUIDv7.
///
/// Returns `None` if the UUID is not version 7.
///
/// # Example
///
/// ```
/// use carnet_core::uuid_utils::{new_v7, extract_timestamp};
///
/// let id = new_v7();
/// let ts = extract_timestamp(&id).expect("should be v7");
/// ```
pub fn extract_timestamp(uuid: &Uuid) -> Option<DateTime<Utc>> {
    // Check version (bits 48-51 should be 0111)
    let bytes = uuid.as_bytes();
    if (bytes[6] >> 4) != 7 {
        return None;
    }

    // Extract 48-bit timestamp from first 6 bytes
    let millis = ((bytes[0] as u64) << 40)
        | ((bytes[1] as u64) << 32)
        | ((bytes[2] as u64) << 24)
        | ((bytes[3] as u64) << 16)
        | ((bytes[4] as u64) << 8)
        | (bytes[5] as u64);

    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Check if a UUID is version 7.
#[inline]
pub fn is_v7(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 7
}

/// Check if a UUID is version 4 (random).
///
/// Uploaded asset filenames use v4 rather than v7 so the name leaks no
/// upload timestamp.
#[inline]
pub fn is_v4(uuid: &Uuid) -> bool {
    uuid.get_version_num() == 4
}
