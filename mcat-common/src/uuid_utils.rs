//! UUID utilities
//!
//! Identities are stored as hyphenated TEXT in `guid` columns.

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a guid read back from the database
pub fn parse_guid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Internal(format!("Corrupt guid '{}': {}", s, e)))
}

/// Parse a caller-supplied id
///
/// Malformed ids cannot name any stored row, so they surface as `NotFound`
/// with the given entity label.
pub fn parse_id(s: &str, entity: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|_| Error::NotFound(format!("{} not found: {}", entity, s)))
}
