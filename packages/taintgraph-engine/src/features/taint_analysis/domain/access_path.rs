//! Access paths
//!
//! An access path names a position inside a value's structure: a root (the
//! return value or an argument) followed by an ordered sequence of field
//! selectors. The empty path denotes the root value itself.

use serde::{Deserialize, Serialize};

/// Interned field-name selector, one step of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldId(pub u32);

/// The root of an access path: the return value or a positional argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Root {
    Return,
    Argument(u32),
}

impl Root {
    /// Whether this root is an argument
    pub fn is_argument(&self) -> bool {
        matches!(self, Root::Argument(_))
    }

    /// The argument position, if any
    pub fn parameter_position(&self) -> Option<u32> {
        match self {
            Root::Argument(position) => Some(*position),
            Root::Return => None,
        }
    }
}

/// An ordered sequence of field selectors, without the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    elements: Vec<FieldId>,
}

impl Path {
    /// The empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from selectors
    pub fn from_elements(elements: Vec<FieldId>) -> Self {
        Self { elements }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldId> {
        self.elements.iter()
    }

    pub fn elements(&self) -> &[FieldId] {
        &self.elements
    }

    /// Append a selector
    pub fn append(&mut self, element: FieldId) {
        self.elements.push(element);
    }

    /// Append all selectors of another path
    pub fn extend(&mut self, other: &Path) {
        self.elements.extend_from_slice(&other.elements);
    }

    /// Remove the last selector
    pub fn pop_back(&mut self) {
        self.elements.pop();
    }

    /// Keep at most `max_size` leading selectors
    pub fn truncate(&mut self, max_size: usize) {
        self.elements.truncate(max_size);
    }

    /// Whether this path is a prefix of `other`
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.elements.len() >= self.elements.len()
            && other.elements[..self.elements.len()] == self.elements[..]
    }
}

impl FromIterator<FieldId> for Path {
    fn from_iter<I: IntoIterator<Item = FieldId>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

/// A root plus a path: one position within a value reachable from a port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessPath {
    root: Root,
    path: Path,
}

impl AccessPath {
    pub fn new(root: Root, path: Path) -> Self {
        Self { root, path }
    }

    /// An access path with an empty path
    pub fn from_root(root: Root) -> Self {
        Self {
            root,
            path: Path::new(),
        }
    }

    /// The return-value port
    pub fn return_value() -> Self {
        Self::from_root(Root::Return)
    }

    /// The port of argument `position`
    pub fn argument(position: u32) -> Self {
        Self::from_root(Root::Argument(position))
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a selector
    pub fn append(&mut self, element: FieldId) {
        self.path.append(element);
    }

    /// Port size: number of selectors below the root
    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Truncate the path to at most `max_size` selectors
    pub fn truncate(&mut self, max_size: usize) {
        self.path.truncate(max_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefix() {
        let short = Path::from_elements(vec![FieldId(1)]);
        let long = Path::from_elements(vec![FieldId(1), FieldId(2)]);

        assert!(short.is_prefix_of(&long));
        assert!(!long.is_prefix_of(&short));
        assert!(Path::new().is_prefix_of(&short));
    }

    #[test]
    fn test_path_truncate() {
        let mut path = Path::from_elements(vec![FieldId(1), FieldId(2), FieldId(3)]);
        path.truncate(2);
        assert_eq!(path.len(), 2);
        path.truncate(5);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_access_path_ports() {
        let ret = AccessPath::return_value();
        assert_eq!(ret.root(), Root::Return);
        assert!(ret.is_empty());

        let mut arg = AccessPath::argument(0);
        arg.append(FieldId(7));
        assert_eq!(arg.root().parameter_position(), Some(0));
        assert_eq!(arg.len(), 1);
    }

    #[test]
    fn test_root_ordering_is_deterministic() {
        let mut roots = vec![Root::Argument(2), Root::Return, Root::Argument(0)];
        roots.sort();
        assert_eq!(roots, vec![Root::Return, Root::Argument(0), Root::Argument(2)]);
    }
}
