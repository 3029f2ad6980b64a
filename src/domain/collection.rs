use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Grouping tags carried by a line. Two lines belong to the same collection
/// when their tag sets are equal, regardless of order or repetition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CollectionTags(BTreeSet<String>);

impl CollectionTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tags.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl From<Vec<String>> for CollectionTags {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<CollectionTags> for Vec<String> {
    fn from(tags: CollectionTags) -> Self {
        tags.0.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for CollectionTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_order_and_duplicates() {
        let a = CollectionTags::new(["group-winner", "group-stage"]);
        let b = CollectionTags::new(["group-stage", "group-winner", "group-stage"]);
        assert_eq!(a, b);
    }

    #[test]
    fn subsets_are_not_equal() {
        let a = CollectionTags::new(["group-winner"]);
        let b = CollectionTags::new(["group-winner", "knockout"]);
        assert_ne!(a, b);
        assert_ne!(a, CollectionTags::default());
    }

    #[test]
    fn serializes_as_sorted_array() {
        let tags = CollectionTags::new(["b", "a", "b"]);
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"["a","b"]"#);
        let parsed: CollectionTags = serde_json::from_str(r#"["b","a"]"#).unwrap();
        assert_eq!(parsed, tags);
    }
}
