//! Codec between nested records and the flat dot-joined key/value form
//! used by the state file.

use std::collections::BTreeMap;

/// A JSON-like value restricted to what release records actually
/// contain: string leaves and ordered maps. No arrays, no nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Leaf(String),
    Branch(BTreeMap<String, Tree>),
}

impl Tree {
    #[must_use]
    pub fn leaf(value: impl Into<String>) -> Self {
        Self::Leaf(value.into())
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(value) => Some(value),
            Self::Branch(_) => None,
        }
    }

    #[must_use]
    pub fn as_branch(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Self::Leaf(_) => None,
            Self::Branch(children) => Some(children),
        }
    }
}

/// Flattens a nested mapping into one entry per leaf, keyed by the
/// dot-joined path from the root (`downloads.bz2.sha256`).
///
/// Contract: `unflatten(flatten(x)) == x` holds as long as no key in
/// `x` contains the `.` delimiter. That restriction is not validated
/// here; callers own the key vocabulary.
#[must_use]
pub fn flatten(nested: &BTreeMap<String, Tree>) -> BTreeMap<String, String> {
    let mut flat = BTreeMap::new();
    flatten_into(nested, "", &mut flat);
    flat
}

fn flatten_into(nested: &BTreeMap<String, Tree>, prefix: &str, flat: &mut BTreeMap<String, String>) {
    for (key, value) in nested {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Tree::Leaf(scalar) => {
                flat.insert(path, scalar.clone());
            }
            Tree::Branch(children) => flatten_into(children, &path, flat),
        }
    }
}

/// Inverse of [`flatten`]: splits each key on `.` and rebuilds the
/// intermediate branches.
#[must_use]
pub fn unflatten(flat: &BTreeMap<String, String>) -> BTreeMap<String, Tree> {
    let mut nested = BTreeMap::new();
    for (path, value) in flat {
        let mut node = &mut nested;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), Tree::leaf(value.clone()));
                break;
            }
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Tree::Branch(BTreeMap::new()));
            if !matches!(child, Tree::Branch(_)) {
                *child = Tree::Branch(BTreeMap::new());
            }
            let Tree::Branch(children) = child else {
                unreachable!("child was just made a branch");
            };
            node = children;
        }
    }
    nested
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BTreeMap<String, Tree> {
        let mut downloads = BTreeMap::new();
        let mut bz2 = BTreeMap::new();
        bz2.insert("line_endings".to_string(), Tree::leaf("unix"));
        bz2.insert("sha256".to_string(), Tree::leaf("ab".repeat(32)));
        downloads.insert("bz2".to_string(), Tree::Branch(bz2));

        let mut record = BTreeMap::new();
        record.insert("documentation".to_string(), Tree::leaf("/doc/1.55.0/"));
        record.insert("downloads".to_string(), Tree::Branch(downloads));
        record
    }

    #[test]
    fn flatten_produces_dot_joined_leaf_paths() {
        let flat = flatten(&sample_record());

        assert_eq!(
            flat.get("documentation").map(String::as_str),
            Some("/doc/1.55.0/")
        );
        assert_eq!(
            flat.get("downloads.bz2.line_endings").map(String::as_str),
            Some("unix")
        );
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn unflatten_rebuilds_intermediate_branches() {
        let mut flat = BTreeMap::new();
        flat.insert("downloads.bz2.url".to_string(), "http://x/a.bz2".to_string());
        flat.insert("release_status".to_string(), "dev".to_string());

        let nested = unflatten(&flat);

        let downloads = nested
            .get("downloads")
            .and_then(Tree::as_branch)
            .expect("downloads branch");
        let bz2 = downloads
            .get("bz2")
            .and_then(Tree::as_branch)
            .expect("bz2 branch");
        assert_eq!(
            bz2.get("url").and_then(Tree::as_leaf),
            Some("http://x/a.bz2")
        );
        assert_eq!(
            nested.get("release_status").and_then(Tree::as_leaf),
            Some("dev")
        );
    }

    #[test]
    fn round_trip_preserves_dot_free_trees() {
        let record = sample_record();
        assert_eq!(unflatten(&flatten(&record)), record);
    }

    #[test]
    fn flatten_of_empty_tree_is_empty() {
        assert!(flatten(&BTreeMap::new()).is_empty());
        assert!(unflatten(&BTreeMap::new()).is_empty());
    }
}
