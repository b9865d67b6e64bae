//! ID generation utilities using ULID for time-ordered unique identifiers.
//!
//! Messages and extracted code blocks both carry a prefixed ULID so they can
//! be told apart in logs and looked up while a message is being rendered.

use ulid::Ulid;

/// ID prefix types for different entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    Message,
    Code,
}

impl IdPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Message => "msg",
            IdPrefix::Code => "cod",
        }
    }
}

/// Generate an ascending (chronologically ordered) ID
pub fn ascending(prefix: IdPrefix) -> String {
    let ulid = Ulid::new();
    format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
}

/// Check whether `id` was produced by [`ascending`] for the given prefix
pub fn has_prefix(id: &str, prefix: IdPrefix) -> bool {
    id.strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|ulid| Ulid::from_string(ulid).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascending_id() {
        let id1 = ascending(IdPrefix::Message);
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ascending(IdPrefix::Message);

        assert!(id1.starts_with("msg_"));
        assert!(id2.starts_with("msg_"));
        assert!(id1 < id2); // IDs should be chronologically ordered
    }

    #[test]
    fn test_code_ids_are_unique() {
        let a = ascending(IdPrefix::Code);
        let b = ascending(IdPrefix::Code);

        assert!(a.starts_with("cod_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_has_prefix() {
        let id = ascending(IdPrefix::Code);
        assert!(has_prefix(&id, IdPrefix::Code));
        assert!(!has_prefix(&id, IdPrefix::Message));
        assert!(!has_prefix("cod_not-a-ulid", IdPrefix::Code));
    }
}
