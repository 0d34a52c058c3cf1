use std::rc::Rc;

use indexmap::IndexMap;

/// A string-to-string map shared between a context and its descendants.
///
/// A child starts out borrowing its parent's map. The first local write
/// clones it, so a registration made on one element is never observed by
/// its ancestors or siblings.
///
/// Iteration follows insertion order, which keeps case-insensitive
/// fallback lookups deterministic.
#[derive(Clone, Debug)]
pub struct Registry {
    entries: Rc<IndexMap<String, String>>,
    owned: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Rc::default(),
            owned: true,
        }
    }

    /// A handle that reads through to `self` until it is first written to.
    pub fn share(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            owned: false,
        }
    }

    /// Whether this handle still reads through to another registry's map.
    pub fn is_shared(&self) -> bool {
        !self.owned
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Exact lookup first, then the first entry whose key matches ignoring
    /// ASCII case.
    pub fn get_ignore_ascii_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.entries
                .iter()
                .find_map(|(k, v)| k.eq_ignore_ascii_case(key).then_some(v.as_str()))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a mapping, returning the value it replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        if !self.owned {
            self.entries = Rc::new(IndexMap::clone(&self.entries));
            self.owned = true;
        }

        Rc::make_mut(&mut self.entries).insert(key.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Registry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: Rc::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            owned: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_registry_copies_on_first_write() {
        let parent: Registry = [("foaf", "http://xmlns.com/foaf/0.1/")].into_iter().collect();

        let mut child = parent.share();
        let sibling = parent.share();
        assert!(child.is_shared());

        child.set("ex", "http://example.org/");
        assert!(!child.is_shared());

        assert_eq!(child.get("ex"), Some("http://example.org/"));
        assert_eq!(child.get("foaf"), Some("http://xmlns.com/foaf/0.1/"));
        assert_eq!(parent.get("ex"), None);
        assert_eq!(sibling.get("ex"), None);
    }

    #[test]
    fn grandchild_write_does_not_leak_upwards() {
        let root = Registry::new();
        let mut child = root.share();
        child.set("a", "http://a/");

        let mut grandchild = child.share();
        grandchild.set("a", "http://b/");

        assert_eq!(root.get("a"), None);
        assert_eq!(child.get("a"), Some("http://a/"));
        assert_eq!(grandchild.get("a"), Some("http://b/"));
    }

    #[test]
    fn case_insensitive_lookup_prefers_exact_match() {
        let registry: Registry = [("License", "http://a/"), ("license", "http://b/")]
            .into_iter()
            .collect();

        assert_eq!(registry.get_ignore_ascii_case("license"), Some("http://b/"));
        assert_eq!(registry.get_ignore_ascii_case("LICENSE"), Some("http://a/"));
        assert_eq!(registry.get("LICENSE"), None);
    }
}
