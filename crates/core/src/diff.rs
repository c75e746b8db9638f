//! Key sets and the orphan difference.
//!
//! Keys are compared by exact byte equality only. No prefix matching,
//! normalization, or separator translation happens here: `/a/b` and `a/b`
//! are different keys. [`convention_mismatches`] exists to *detect* that
//! situation so it can be surfaced, never to paper over it.

use std::collections::HashSet;

use crate::key::FlatKey;

/// A set of keys that remembers first-insertion order.
///
/// Equality is set equality; order only matters for iteration, which keeps
/// reports reproducible.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    order: Vec<FlatKey>,
    members: HashSet<FlatKey>,
}

/// Flat keys with no exact match among the hierarchical leaves.
pub type OrphanSet = KeySet;

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key`, returning `false` if it was already present.
    pub fn insert(&mut self, key: impl Into<FlatKey>) -> bool {
        let key = key.into();
        if self.members.contains(&key) {
            return false;
        }
        self.members.insert(key.clone());
        self.order.push(key);
        true
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FlatKey> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<FlatKey> {
        self.order
    }
}

impl PartialEq for KeySet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for KeySet {}

impl<K: Into<FlatKey>> FromIterator<K> for KeySet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl IntoIterator for KeySet {
    type Item = FlatKey;
    type IntoIter = std::vec::IntoIter<FlatKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.into_iter()
    }
}

/// Every key of `candidate` with no exact match in `reference`, in
/// candidate order.
///
/// Membership is a hash lookup, so this is linear in the size of both sets.
pub fn difference(reference: &KeySet, candidate: &KeySet) -> OrphanSet {
    candidate
        .iter()
        .filter(|key| !reference.contains(key.as_bytes()))
        .collect()
}

/// Orphans that would match a reference key if a leading `/` were added or
/// removed.
///
/// A non-empty result means the two namespaces were probably written with
/// different path conventions and the orphan report contains false
/// positives.
pub fn convention_mismatches(reference: &KeySet, orphans: &OrphanSet) -> Vec<FlatKey> {
    orphans
        .iter()
        .filter(|key| {
            let toggled = match key.as_bytes().strip_prefix(b"/") {
                Some(rest) => rest.to_vec(),
                None => [&b"/"[..], key.as_bytes()].concat(),
            };
            reference.contains(&toggled)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(keys: &[&str]) -> KeySet {
        keys.iter().copied().collect()
    }

    #[test]
    fn difference_keeps_unmatched_candidates() {
        let orphans = difference(&set(&["a", "b", "c"]), &set(&["a", "b", "d", "e"]));
        assert_eq!(orphans, set(&["d", "e"]));
    }

    #[test]
    fn difference_against_empty_reference_is_candidate() {
        assert_eq!(difference(&set(&[]), &set(&["x"])), set(&["x"]));
    }

    #[test]
    fn difference_of_empty_candidate_is_empty() {
        assert!(difference(&set(&["x"]), &set(&[])).is_empty());
    }

    #[test]
    fn difference_preserves_candidate_order() {
        let orphans = difference(&set(&["m"]), &set(&["z", "m", "a", "q"]));
        assert_eq!(orphans.into_vec(), vec!["z", "a", "q"]);
    }

    #[test]
    fn leading_separator_is_significant() {
        let orphans = difference(&set(&["a/b"]), &set(&["/a/b"]));
        assert_eq!(orphans.into_vec(), vec!["/a/b"]);
    }

    #[test]
    fn key_set_collapses_duplicates_keeping_first_position() {
        let keys = set(&["b", "a", "b", "c", "a"]);
        assert_eq!(keys.len(), 3);
        assert_eq!(keys.iter().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn key_set_equality_ignores_order() {
        assert_eq!(set(&["a", "b"]), set(&["b", "a"]));
        assert_ne!(set(&["a"]), set(&["a", "b"]));
    }

    #[test]
    fn convention_mismatches_flags_both_directions() {
        let reference = set(&["a/b", "/c/d", "/exact"]);
        let orphans = difference(&reference, &set(&["/a/b", "c/d", "/exact", "/other"]));

        assert_eq!(convention_mismatches(&reference, &orphans), vec!["/a/b", "c/d"]);
    }

    #[test]
    fn non_utf8_candidate_is_an_orphan() {
        let candidate: KeySet = [b"/a".to_vec(), vec![b'/', 0xff]].into_iter().collect();
        let orphans = difference(&set(&["/a"]), &candidate);
        assert_eq!(orphans.into_vec(), vec![FlatKey::from(vec![b'/', 0xff])]);
    }

    #[test]
    fn convention_mismatches_empty_when_conventions_agree() {
        let reference = set(&["/a", "/b"]);
        let orphans = difference(&reference, &set(&["/a", "/c"]));
        assert!(convention_mismatches(&reference, &orphans).is_empty());
    }
}
