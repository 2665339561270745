//! Identifier generation for branches, tags and Call-IDs

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::types::via::BRANCH_MAGIC_COOKIE;

/// A fresh RFC 3261 branch (`z9hG4bK` + 32 hex digits)
pub fn generate_branch() -> String {
    format!("{}{}", BRANCH_MAGIC_COOKIE, Uuid::new_v4().simple())
}

/// A random 10-character alphanumeric tag
pub fn generate_tag() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

/// A globally unique Call-ID, optionally qualified with a host
pub fn generate_call_id(host: Option<&str>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match host {
        Some(host) => format!("{}@{}", id, host),
        None => id,
    }
}
