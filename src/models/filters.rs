//! Filter snapshot taken alongside a viewport change

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEARCH_KEY: &str = "search";
pub const PREFECTURE_KEY: &str = "prefecture";
pub const SPOT_TYPE_KEY: &str = "type";

/// Opaque key/value filter set, compared by value.
///
/// Keys are kept sorted so two snapshots built in different orders compare equal
/// and encode to the same query string.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct FilterSnapshot(BTreeMap<String, String>);

impl FilterSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Empty values are dropped so "unset" and "" compare equal.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn search_term(&self) -> Option<&str> {
        self.get(SEARCH_KEY)
    }

    #[must_use]
    pub fn prefecture(&self) -> Option<&str> {
        self.get(PREFECTURE_KEY)
    }

    #[must_use]
    pub fn spot_type(&self) -> Option<&str> {
        self.get(SPOT_TYPE_KEY)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality_ignores_insert_order() {
        let a = FilterSnapshot::new()
            .with(PREFECTURE_KEY, "長野県")
            .with(SEARCH_KEY, "湖");
        let b = FilterSnapshot::new()
            .with(SEARCH_KEY, "湖")
            .with(PREFECTURE_KEY, "長野県");
        assert_eq!(a, b);
        assert_eq!(a.prefecture(), Some("長野県"));
        assert_eq!(a.search_term(), Some("湖"));
        assert_eq!(a.spot_type(), None);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let a = FilterSnapshot::new().with(SEARCH_KEY, "  ");
        assert!(a.is_empty());
        assert_eq!(a, FilterSnapshot::new());
    }

    #[test]
    fn test_deserializes_from_plain_object() {
        let f: FilterSnapshot = serde_json::from_str(r#"{"type":"roadside_station"}"#).unwrap();
        assert_eq!(f.spot_type(), Some("roadside_station"));
    }
}
