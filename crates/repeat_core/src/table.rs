//! Identity table - the uniqueness-enforcing map from identity to value.
//!
//! Insertion never overwrites: a colliding key is a programming error and
//! fails fast. Iteration follows insertion order as long as entries are only
//! removed with [`IdentityTable::shift_take`]; `remove` and `take` run in
//! constant time and may reorder the remaining entries.

use crate::error::{CoreError, CoreResult};
use crate::identity::Identity;
use indexmap::IndexMap;

/// Map from identity to value with fail-fast uniqueness
#[derive(Debug, Clone)]
pub struct IdentityTable<V> {
    entries: IndexMap<Identity, V>,
}

impl<V> IdentityTable<V> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add an entry
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the key is already taken
    pub fn insert(&mut self, identity: Identity, value: V) -> CoreResult<()> {
        if self.entries.contains_key(&identity) {
            return Err(CoreError::DuplicateIdentity { identity });
        }
        self.entries.insert(identity, value);
        Ok(())
    }

    /// Remove an entry, returning its value
    ///
    /// The last entry takes the removed one's place.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if no entry exists for the key
    pub fn remove(&mut self, identity: &str) -> CoreResult<V> {
        self.entries
            .swap_remove(identity)
            .ok_or_else(|| CoreError::unknown(&Identity::from(identity)))
    }

    /// Remove an entry if present; the last entry takes its place
    pub fn take(&mut self, identity: &str) -> Option<V> {
        self.entries.swap_remove(identity)
    }

    /// Remove an entry if present, keeping the order of the rest
    ///
    /// Linear in the number of entries after it.
    pub fn shift_take(&mut self, identity: &str) -> Option<V> {
        self.entries.shift_remove(identity)
    }

    /// Look up an entry
    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&V> {
        self.entries.get(identity)
    }

    /// Check if an entry exists
    #[must_use]
    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Identity, &V)> {
        self.entries.iter()
    }

    /// Iterate identities in insertion order
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.entries.keys()
    }

    /// Remove all entries, yielding them in insertion order
    pub fn drain(&mut self) -> impl Iterator<Item = (Identity, V)> + '_ {
        self.entries.drain(..)
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<V> Default for IdentityTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_new() {
        let table: IdentityTable<u32> = IdentityTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_table_insert_get() {
        let mut table = IdentityTable::new();
        table.insert(Identity::from("a"), 1).unwrap();
        assert_eq!(table.get("a"), Some(&1));
        assert!(table.contains("a"));
        assert_eq!(table.get("b"), None);
    }

    #[test]
    fn test_table_duplicate_fails_fast() {
        let mut table = IdentityTable::new();
        table.insert(Identity::from("1"), "first").unwrap();

        let err = table.insert(Identity::from("1"), "second").unwrap_err();
        assert_eq!(err.to_string(), "Key `1` is already taken.");
        // No implicit overwrite
        assert_eq!(table.get("1"), Some(&"first"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_remove_unknown() {
        let mut table: IdentityTable<u32> = IdentityTable::new();
        let err = table.remove("ghost").unwrap_err();
        assert!(matches!(err, CoreError::UnknownIdentity { ref identity } if identity.as_str() == "ghost"));
    }

    #[test]
    fn test_table_remove_and_take() {
        let mut table = IdentityTable::new();
        table.insert(Identity::from("a"), 1).unwrap();
        table.insert(Identity::from("b"), 2).unwrap();

        assert_eq!(table.remove("a").unwrap(), 1);
        assert_eq!(table.take("a"), None);
        assert_eq!(table.take("b"), Some(2));
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_drain_insertion_order() {
        let mut table = IdentityTable::new();
        for key in ["c", "a", "b"] {
            table.insert(Identity::from(key), key.len()).unwrap();
        }
        table.remove("a").unwrap();
        table.insert(Identity::from("a"), 1).unwrap();

        let keys: Vec<String> = table.drain().map(|(k, _)| k.into_string()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_shift_take_keeps_order() {
        let mut table = IdentityTable::new();
        for key in ["a", "b", "c", "d"] {
            table.insert(Identity::from(key), ()).unwrap();
        }

        assert_eq!(table.shift_take("a"), Some(()));
        assert_eq!(table.shift_take("a"), None);

        let keys: Vec<&str> = table.identities().map(Identity::as_str).collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_table_remove_moves_last_entry() {
        let mut table = IdentityTable::new();
        for key in ["a", "b", "c", "d"] {
            table.insert(Identity::from(key), ()).unwrap();
        }

        table.remove("a").unwrap();

        let keys: Vec<&str> = table.identities().map(Identity::as_str).collect();
        assert_eq!(keys, vec!["d", "b", "c"]);
    }

    #[test]
    fn test_table_bulk_removal() {
        let mut table = IdentityTable::new();
        for key in 0..100_000u32 {
            table.insert(Identity::new(key.to_string()), key).unwrap();
        }

        for key in 0..50_000u32 {
            assert_eq!(table.remove(&key.to_string()).unwrap(), key);
        }

        assert_eq!(table.len(), 50_000);
        assert!(!table.contains("0"));
        assert!(table.contains("99999"));
    }

    proptest::proptest! {
        #[test]
        fn prop_len_tracks_distinct_inserts(keys: Vec<u8>) {
            let mut table = IdentityTable::new();
            let mut distinct = std::collections::HashSet::new();
            for key in keys {
                let inserted = table.insert(Identity::new(key.to_string()), key).is_ok();
                prop_assert_eq!(inserted, distinct.insert(key));
            }
            prop_assert_eq!(table.len(), distinct.len());
        }
    }
}
