use std::{collections::BTreeMap, fmt};

/// A set of tags attached to a metric event.
///
/// Keys are unique: inserting an existing key replaces its value. Iteration, and therefore rendering, is always in
/// ascending key order, so two sets holding the same pairs render identically no matter how they were built.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    /// Creates an empty `TagSet`.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Inserts a tag, returning the previous value for the key, if any.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<String>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of tags in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merges the given tags into this set, overwriting the values of keys that are already present.
    pub fn merge<I, K, V>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in tags {
            self.insert(key, value);
        }
    }

    /// Returns an iterator over the tags, in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Self::new();
        tags.merge(iter);
        tags
    }
}

impl<K, V> Extend<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.merge(iter);
    }
}

/// Renders the wire form of the set: nothing at all when empty, otherwise `#k1:v1,k2:v2,...`.
///
/// Keys and values are written verbatim. A key or value containing `:`, `,`, `|` or a newline produces a line that
/// downstream parsers will split incorrectly; callers that care must sanitize beforehand.
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (key, value)) in self.0.iter().enumerate() {
            let lead = if idx == 0 { "#" } else { "," };
            write!(f, "{}{}:{}", lead, key, value)?;
        }

        Ok(())
    }
}

/// Formats a tag set into the tag segment of an encoded line.
///
/// Returns an empty string for an empty set.
pub fn format_tags(tags: &TagSet) -> String {
    tags.to_string()
}
