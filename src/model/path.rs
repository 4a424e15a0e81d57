use serde::{Deserialize, Serialize};
use std::fmt;

/// An address in a tree: one index per level, outermost first.
///
/// The empty path addresses the (invisible) root node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    /// The root path
    pub fn root() -> Self {
        TreePath(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        TreePath(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The path of the parent node. The root is its own parent.
    pub fn parent(&self) -> TreePath {
        let mut indices = self.0.clone();
        indices.pop();
        TreePath(indices)
    }

    /// The path of the `n`th child of this node
    pub fn child(&self, n: usize) -> TreePath {
        let mut indices = self.0.clone();
        indices.push(n);
        TreePath(indices)
    }

    /// A copy with the last index replaced, or `None` for the root.
    pub fn with_last(&self, index: usize) -> Option<TreePath> {
        let mut indices = self.0.clone();
        *indices.last_mut()? = index;
        Some(TreePath(indices))
    }

    /// A copy with the first index replaced, or `None` for the root.
    pub fn with_first(&self, index: usize) -> Option<TreePath> {
        let mut indices = self.0.clone();
        *indices.first_mut()? = index;
        Some(TreePath(indices))
    }

    /// `prefix` followed by this path
    pub fn prefixed(&self, prefix: &TreePath) -> TreePath {
        let mut indices = prefix.0.clone();
        indices.extend_from_slice(&self.0);
        TreePath(indices)
    }

    /// Everything below the first level (`[2, 0, 1]` → `[0, 1]`)
    pub fn tail(&self) -> TreePath {
        TreePath(self.0.iter().skip(1).copied().collect())
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(indices: Vec<usize>) -> Self {
        TreePath(indices)
    }
}

impl From<&[usize]> for TreePath {
    fn from(indices: &[usize]) -> Self {
        TreePath(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for TreePath {
    fn from(indices: [usize; N]) -> Self {
        TreePath(indices.to_vec())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{}", index)?;
        }
        Ok(())
    }
}
