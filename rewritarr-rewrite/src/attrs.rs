use std::collections::{HashMap, HashSet};

/// Attribute annotations extracted from one feed entry.
///
/// Names are stored lower-cased, values trimmed. A pair with an empty name
/// or an empty value is never stored, so `get` returning `Some` always means
/// a usable, non-empty field; `None` means the indexer did not supply it.
/// When an indexer repeats a name, the last occurrence wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributeMap {
    entries: HashMap<String, String>,
}

impl AttributeMap {
    pub fn insert(&mut self, name: &str, value: &str) {
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return;
        }
        self.entries
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Category codes attached to one feed entry, collected from both the
/// dedicated `category` attribute annotations and plain category elements.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategorySet {
    codes: HashSet<String>,
}

impl CategorySet {
    pub fn insert(&mut self, code: &str) {
        let code = code.trim();
        if !code.is_empty() {
            self.codes.insert(code.to_string());
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn intersects(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.codes.contains(*code))
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}
