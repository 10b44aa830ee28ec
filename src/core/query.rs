//! Multi-valued parameter mapping for query strings and form bodies.

/// Ordered multi-valued mapping.
///
/// A key may appear several times. [`QueryDict::get`] returns the last value
/// for a key, [`QueryDict::get_list`] returns all of them in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    entries: Vec<(String, String)>,
}

impl QueryDict {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value for a key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Last value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All values for a key, in insertion order.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Distinct keys in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in &self.entries {
            if !keys.contains(&k.as_str()) {
                keys.push(k);
            }
        }
        keys
    }

    /// Iterate over all pairs, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = QueryDict::new();
        for (k, v) in iter {
            dict.push(k, v);
        }
        dict
    }
}
