//! Client-side identifier allocation.
//!
//! Entities created while offline receive a local id at creation time and
//! keep it for their entire lifetime, even after the server assigns its own
//! id during sync. All parent/child references between local rows use local
//! ids, so offline-created chains stay resolvable before any sync happens.

use uuid::Uuid;

/// Prefix that distinguishes client-generated ids from server-assigned ones.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Generate a new collision-resistant local id.
///
/// Pure and stateless; safe to call concurrently from any task.
pub fn generate() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4())
}

/// Returns true if the id was generated by [`generate`] rather than
/// assigned by the server.
pub fn is_local(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_local() {
        let a = generate();
        let b = generate();
        assert_ne!(a, b);
        assert!(is_local(&a));
        assert!(is_local(&b));
    }

    #[test]
    fn server_ids_are_not_local() {
        assert!(!is_local("wk_8f3a91"));
        assert!(!is_local(""));
    }
}
