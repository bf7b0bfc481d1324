//! Multi-segment lookup paths and their resolution against a registry tree.
//!
//! A [`Path`] is an ordered list of string segments. Resolution walks the
//! tree left to right: every segment but the last must land on a child
//! [`RegistryNode`]; reaching a leaf early is a `NotFound` that names the
//! unconsumed remainder.
//!
//! ```text
//! ("Elevator", "kPIDConstants", "Kp")
//!      │            │              └─ leaf
//!      │            └─ child node
//!      └─ child node
//! ```

use std::fmt;

use crate::error::RegistryError;
use crate::node::RegistryNode;
use crate::value::Value;

/// An ordered sequence of string keys identifying a nested location.
///
/// Paths are built from a single key (`"a"`), arrays (`["a", "b"]`), slices
/// or owned vectors. A one-segment path resolves exactly like a plain key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a dot-separated path: `"Elevator.kPIDConstants.Kp"`.
    ///
    /// Only useful when no key contains a dot; keys themselves are arbitrary
    /// strings.
    pub fn dotted(path: &str) -> Self {
        Self::new(path.split('.'))
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// A new path with `prefix` prepended.
    pub fn prefixed(&self, prefix: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.push(prefix.into());
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Self {
            segments: vec![key.to_owned()],
        }
    }
}

impl From<String> for Path {
    fn from(key: String) -> Self {
        Self {
            segments: vec![key],
        }
    }
}

impl From<&String> for Path {
    fn from(key: &String) -> Self {
        Self::from(key.as_str())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

/// Stateless walker behind [`RegistryNode::get_path`].
pub struct PathResolver;

impl PathResolver {
    /// Resolve `path` against `root`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::EmptyPath`] if `path` has no segments
    /// - [`RegistryError::NotFound`] for the first segment that cannot be
    ///   resolved, either because the key is absent or because a leaf value
    ///   was reached before the path was exhausted
    pub fn resolve<'a>(root: &'a RegistryNode, path: &Path) -> Result<&'a Value, RegistryError> {
        let (first, rest) = path
            .segments()
            .split_first()
            .ok_or(RegistryError::EmptyPath)?;

        let mut current = root.lookup_segment(first, path, 0)?;
        for (offset, segment) in rest.iter().enumerate() {
            let depth = offset + 1;
            current = match current {
                Value::Node(node) => node.lookup_segment(segment, path, depth)?,
                Value::Leaf(leaf) => {
                    return Err(RegistryError::NotFound {
                        segment: segment.clone(),
                        path: path.clone(),
                        depth,
                        within: format!("leaf value {leaf}"),
                    });
                }
            };
        }
        Ok(current)
    }
}
