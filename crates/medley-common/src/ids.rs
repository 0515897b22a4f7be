//! Record identifiers and timestamps.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A fresh hyphenated v4 UUID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Eight hex characters, for ids that end up in URLs typed by people.
pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_is_eight_hex_chars() {
        let id = short_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
