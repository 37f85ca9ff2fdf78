// Row identifiers are UUIDv7, generated app-side so that ids sort by
// creation time in both the memory and PostgreSQL stores. Listing
// queries rely on this as a tie-breaker when timestamps collide.

use uuid::Uuid;

use crate::error::VaultError;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Parse an identifier received from a caller.
///
/// Malformed ids are reported as `NotFound` so that path parameters never
/// produce a different error than an id that simply does not exist.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, VaultError> {
    Uuid::parse_str(raw.trim()).map_err(|_| VaultError::NotFound(format!("{what} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn uuidv7_is_monotonic() {
        let a = uuidv7();
        let b = uuidv7();
        assert!(b >= a);
    }

    #[test]
    fn parse_id_rejects_garbage_as_not_found() {
        let err = parse_id("not-a-uuid", "Document").unwrap_err();
        assert!(matches!(err, VaultError::NotFound(ref m) if m == "Document not found"));
    }

    #[test]
    fn parse_id_accepts_surrounding_whitespace() {
        let id = uuidv7();
        assert_eq!(parse_id(&format!(" {id} "), "User").unwrap(), id);
    }
}
