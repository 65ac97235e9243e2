use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque key for a remote presence subject (for example a Discord user id).
///
/// Cheap to clone; the same identity is used as a map key by the registry,
/// the store and the desired subscription set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Arc<str>);

impl Identity {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identity {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn display_is_raw_id() {
        assert_eq!(Identity::from("94490510688792576").to_string(), "94490510688792576");
    }

    #[test]
    fn lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Identity::from("42"), 1);
        assert_eq!(map.get("42"), Some(&1));
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Identity::from("7")).unwrap();
        assert_eq!(json, "\"7\"");
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Identity::from("7"));
    }
}
