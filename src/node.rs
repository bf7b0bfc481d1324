//! Registry node: one frozen level of nested configuration.

use std::fmt;

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::guard::ImmutabilityGuard;
use crate::path::{Path, PathResolver};
use crate::source::{Source, SourceKey, SourceValue};
use crate::value::{LeafValue, Scalar, Sequence, Value};

/// An immutable tree node mapping string keys to leaves or child nodes.
///
/// Built once from a [`Source`]:
/// - nested mappings become child nodes, eagerly and recursively
/// - lists become fixed [`Sequence`]s
/// - scalars are stored as-is
///
/// Construction either converts the whole source or fails without producing
/// a node. There is no `&mut` API afterwards; keys cannot be added, removed
/// or rebound, and insertion order is the iteration order.
///
/// ```
/// use robot_config::{RegistryNode, source};
///
/// let reg = RegistryNode::new(source! {
///     "Interface" => { "kDriverControllerPort" => 0, "kManipControllerPort" => 1 },
/// })?;
///
/// assert_eq!(reg.get_path(["Interface", "kDriverControllerPort"])?.as_int(), Some(0));
/// assert_eq!(reg.attr("Interface")?.attr("kManipControllerPort")?.as_int(), Some(1));
/// # Ok::<(), robot_config::RegistryError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct RegistryNode {
    entries: IndexMap<String, Value>,
    /// Declared keys that never received a value. Not part of the content.
    pending: IndexMap<String, Pending>,
}

/// A placeholder key left without a value by its declaring group.
#[derive(Clone, Debug)]
pub(crate) struct Pending {
    pub(crate) group: String,
    pub(crate) type_name: &'static str,
}

impl RegistryNode {
    /// Convert `source` into a frozen node.
    ///
    /// A repeated key keeps the position of its first occurrence and the
    /// value of its last.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MalformedKey`] if any key, at any depth, is not a string
    /// - [`RegistryError::MalformedValue`] if a list holds a list or a mapping
    pub fn new(source: impl Into<Source>) -> Result<Self, RegistryError> {
        let node = Self::convert(source.into())?;
        tracing::trace!(keys = node.len(), "registry node frozen");
        Ok(node)
    }

    /// Shorthand for `RegistryNode::new(Source::from_pairs(pairs))`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SourceKey>,
        V: Into<SourceValue>,
    {
        Self::new(Source::from_pairs(pairs))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Freeze already-converted entries, remembering which declared keys
    /// are still waiting for a value.
    pub(crate) fn from_entries(
        entries: IndexMap<String, Value>,
        pending: IndexMap<String, Pending>,
    ) -> Self {
        Self { entries, pending }
    }

    fn convert(source: Source) -> Result<Self, RegistryError> {
        let raw = source.into_entries();
        let mut entries = IndexMap::with_capacity(raw.len());

        for (key, value) in raw {
            let SourceKey::Str(key) = key else {
                return Err(RegistryError::MalformedKey {
                    found: key.to_string(),
                });
            };

            let value = match value {
                SourceValue::Map(child) => Value::Node(Self::convert(child)?),
                SourceValue::List(items) => {
                    Value::Leaf(LeafValue::Sequence(Sequence::from_source(&key, items)?))
                }
                scalar => Value::Leaf(LeafValue::Scalar(Scalar::from_source(&key, scalar)?)),
            };

            entries.insert(key, value);
        }

        Ok(Self {
            entries,
            pending: IndexMap::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Exact one-level lookup.
    pub fn get(&self, key: &str) -> Result<&Value, RegistryError> {
        self.lookup_segment(key, &Path::from(key), 0)
    }

    #[inline]
    pub fn try_get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Multi-segment lookup; a single-segment path behaves like [`get`](Self::get).
    pub fn get_path(&self, path: impl Into<Path>) -> Result<&Value, RegistryError> {
        PathResolver::resolve(self, &path.into())
    }

    /// Attribute-style access: `get(name)` with an attribute-flavoured error.
    pub fn attr(&self, name: &str) -> Result<&Value, RegistryError> {
        self.entries.get(name).ok_or_else(|| {
            self.pending_error(name)
                .unwrap_or_else(|| RegistryError::AttributeNotFound {
                    name: name.to_owned(),
                    within: self.to_string(),
                })
        })
    }

    /// Typed lookup: `let port: i64 = reg.get_as(["Interface", "kDriverControllerPort"])?;`
    pub fn get_as<T>(&self, path: impl Into<Path>) -> Result<T, RegistryError>
    where
        T: for<'v> TryFrom<&'v Value, Error = RegistryError>,
    {
        T::try_from(self.get_path(path)?)
    }

    pub(crate) fn lookup_segment(
        &self,
        segment: &str,
        path: &Path,
        depth: usize,
    ) -> Result<&Value, RegistryError> {
        self.entries.get(segment).ok_or_else(|| {
            self.pending_error(segment)
                .unwrap_or_else(|| RegistryError::NotFound {
                    segment: segment.to_owned(),
                    path: path.clone(),
                    depth,
                    within: self.to_string(),
                })
        })
    }

    fn pending_error(&self, key: &str) -> Option<RegistryError> {
        self.pending
            .get(key)
            .map(|pending| RegistryError::PlaceholderUnresolved {
                group: pending.group.clone(),
                field: key.to_owned(),
                type_name: pending.type_name.to_owned(),
            })
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Keys in insertion order. Calling again restarts from the first key.
    #[inline]
    pub fn keys(&self) -> Keys<'_> {
        Keys {
            inner: self.entries.keys(),
        }
    }

    /// Same as [`keys`](Self::keys); primary iteration yields keys.
    #[inline]
    pub fn iter(&self) -> Keys<'_> {
        self.keys()
    }

    #[inline]
    pub fn values(&self) -> indexmap::map::Values<'_, String, Value> {
        self.entries.values()
    }

    pub fn items(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The canonical key → value mapping.
    #[inline]
    pub fn as_map(&self) -> &IndexMap<String, Value> {
        &self.entries
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = (String, Value)> {
        self.entries.into_iter()
    }
}

/// Iterator over the keys of a [`RegistryNode`].
#[derive(Clone)]
pub struct Keys<'a> {
    inner: indexmap::map::Keys<'a, String, Value>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<&'a str> {
        self.inner.next().map(String::as_str)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_> {}

impl<'a> IntoIterator for &'a RegistryNode {
    type Item = &'a str;
    type IntoIter = Keys<'a>;

    fn into_iter(self) -> Keys<'a> {
        self.keys()
    }
}

impl fmt::Display for RegistryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key:?}: {value}")?;
        }
        f.write_str("}")
    }
}

impl ImmutabilityGuard for RegistryNode {
    fn guard_target(&self) -> String {
        format!("registry node {self}")
    }
}

// =============================================================================
// Equality against canonical mappings
// =============================================================================

impl PartialEq for RegistryNode {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl PartialEq<IndexMap<String, Value>> for RegistryNode {
    fn eq(&self, other: &IndexMap<String, Value>) -> bool {
        self.entries == *other
    }
}

impl PartialEq<RegistryNode> for IndexMap<String, Value> {
    fn eq(&self, other: &RegistryNode) -> bool {
        *self == other.entries
    }
}

/// A node equals any source that converts into an equal node; a source that
/// fails to convert is simply unequal.
impl PartialEq<Source> for RegistryNode {
    fn eq(&self, other: &Source) -> bool {
        RegistryNode::new(other.clone()).is_ok_and(|node| node == *self)
    }
}

impl PartialEq<RegistryNode> for Source {
    fn eq(&self, other: &RegistryNode) -> bool {
        other == self
    }
}

// =============================================================================
// Tests
// =============================================================================
