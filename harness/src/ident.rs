//! Fresh identifier generation.
//!
//! Every scenario mints its own identifier so runs never collide with each
//! other or with earlier runs. The `test-user-` prefix marks rows for
//! out-of-band manual cleanup; the harness itself never deletes data.

use chrono::Utc;
use rand::Rng;

/// Unique user id for a registration scenario: `test-user-<unix-ts>-<8 hex>`.
pub fn fresh_user_id() -> String {
    let tag: u32 = rand::thread_rng().r#gen();
    format!("test-user-{}-{tag:08x}", Utc::now().timestamp())
}

/// Identifier guaranteed never to have been registered.
///
/// Derived from the current time and never passed to the register endpoint.
pub fn never_registered_user_id() -> String {
    format!("nonexistent-user-{}", Utc::now().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_id_has_timestamp_and_suffix() {
        let id = fresh_user_id();
        let rest = id.strip_prefix("test-user-").expect("prefix");
        let (timestamp, suffix) = rest.rsplit_once('-').expect("two parts");
        assert!(timestamp.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(fresh_user_id(), fresh_user_id());
    }

    #[test]
    fn never_registered_id_is_marked() {
        assert!(never_registered_user_id().starts_with("nonexistent-user-"));
    }
}
