//! ULID generation (§9 glossary: "26-character Crockford-base-32
//! identifiers; 48 bits of millisecond timestamp followed by 80 bits of
//! randomness"). Used for anonymous volume names (`anon-<ULID>`) and
//! content-store ingest session ids.

use ulid::Ulid;

/// A fresh, lexicographically time-ordered ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}

/// Builds an anonymous volume name (`anon-<26-char ULID>`), per §3/§8.
pub fn anonymous_volume_name() -> String {
    format!("anon-{}", generate_ulid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ulid_has_expected_length() {
        let id = generate_ulid();
        assert_eq!(id.len(), 26);
    }

    #[test]
    fn anonymous_volume_name_has_prefix() {
        let name = anonymous_volume_name();
        assert!(name.starts_with("anon-"));
        assert_eq!(name.len(), "anon-".len() + 26);
    }

    #[test]
    fn ulids_are_unique() {
        let a = generate_ulid();
        let b = generate_ulid();
        assert_ne!(a, b);
    }
}
