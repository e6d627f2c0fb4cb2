use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = chat_common::id::prefixed_ulid("req");
/// assert!(id.starts_with("req_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// A single quote request handled by the stock bot.
    pub const REQUEST: &str = "req";
    /// A running stock bot instance.
    pub const WORKER: &str = "wrk";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid(prefix::REQUEST);
        assert!(id.starts_with("req_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 4 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid(prefix::WORKER);
        let b = prefixed_ulid(prefix::WORKER);
        assert_ne!(a, b);
    }
}
