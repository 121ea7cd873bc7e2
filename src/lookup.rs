//! Association list from a pair of 64-bit ids to a string, used to resolve
//! hard links (device/inode pairs to the path first restored for them).
//!
//! Lookups are a linear scan. The list only grows with the number of
//! hard-linked files, never with archive size.

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    key1:  u64,
    key2:  u64,
    value: String,
}

#[derive(Debug, Clone, Default)]
pub struct TwoKeyMap {
    entries: Vec<Entry>,
}

impl TwoKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Existing entries for the same keys are kept and
    /// continue to shadow this one.
    pub fn insert(&mut self, key1: u64, key2: u64, value: impl Into<String>) {
        self.entries.push(Entry { key1, key2, value: value.into() });
    }

    /// First value stored under exactly `(key1, key2)`.
    pub fn get(&self, key1: u64, key2: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key1 == key1 && e.key2 == key2)
            .map(|e| e.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pair_match() {
        let mut m = TwoKeyMap::new();
        m.insert(1, 2, "a/b");
        m.insert(2, 1, "c");
        assert_eq!(m.get(1, 2), Some("a/b"));
        assert_eq!(m.get(2, 1), Some("c"));
        assert_eq!(m.get(1, 1), None);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn first_match_wins() {
        let mut m = TwoKeyMap::new();
        m.insert(5, 5, "first");
        m.insert(5, 5, "second");
        assert_eq!(m.get(5, 5), Some("first"));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn empty_map() {
        let m = TwoKeyMap::new();
        assert!(m.is_empty());
        assert_eq!(m.get(0, 0), None);
    }
}
