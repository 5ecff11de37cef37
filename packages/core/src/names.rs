//! Package and handler name inputs.
//!
//! Callers may pass either a single name or a list of names wherever a
//! package list or a handler list is accepted. [`NameList`] captures both
//! shapes; a single string always becomes a one-element list and is never
//! iterated character by character.

use std::collections::BTreeSet;

/// Ordered list of names built from a single name or a sequence of names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameList(Vec<String>);

impl NameList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for NameList {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for NameList {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&String> for NameList {
    fn from(name: &String) -> Self {
        Self(vec![name.clone()])
    }
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for NameList {
    fn from(names: Vec<&str>) -> Self {
        names.into_iter().collect()
    }
}

impl From<&[&str]> for NameList {
    fn from(names: &[&str]) -> Self {
        names.iter().copied().collect()
    }
}

impl From<&[String]> for NameList {
    fn from(names: &[String]) -> Self {
        Self(names.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for NameList {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for NameList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for NameList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a NameList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Top-level namespace of a dotted package name or a Rust module path.
///
/// Returns `None` when that namespace is empty (`""`, `".hidden"`).
pub fn top_level_namespace(name: &str) -> Option<&str> {
    let head = name
        .trim()
        .split(['.', ':'])
        .next()
        .unwrap_or_default()
        .trim();

    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// Collapse package names to their distinct top-level namespaces.
///
/// `["pkg.sub.mod", "other.thing", "pkg"]` becomes `{"other", "pkg"}`.
pub fn normalize_package_names<I, S>(names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| top_level_namespace(name.as_ref()).map(str::to_string))
        .collect()
}
