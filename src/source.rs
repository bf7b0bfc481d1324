//! The construction grammar: what a registry is built from.
//!
//! A [`Source`] is an ordered list of key/value entries. Keys are *not*
//! restricted to strings here, so that a malformed key can be represented
//! and rejected when the registry is built. Values are scalars, lists, or
//! nested sources.
//!
//! Any serde format whose documents are maps with string keys (TOML, JSON)
//! deserializes straight into a [`Source`], preserving document order.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

use crate::node::RegistryNode;
use crate::value::{LeafValue, Scalar, Value};

// =============================================================================
// Keys and values
// =============================================================================

/// A source key. Only [`SourceKey::Str`] is accepted by the registry.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceKey {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(k) => write!(f, "{k:?} (string)"),
            Self::Int(k) => write!(f, "{k} (integer)"),
            Self::Float(k) => write!(f, "{k:?} (float)"),
            Self::Bool(k) => write!(f, "{k} (boolean)"),
        }
    }
}

impl From<&str> for SourceKey {
    fn from(k: &str) -> Self {
        Self::Str(k.to_owned())
    }
}

impl From<String> for SourceKey {
    fn from(k: String) -> Self {
        Self::Str(k)
    }
}

impl From<i64> for SourceKey {
    fn from(k: i64) -> Self {
        Self::Int(k)
    }
}

impl From<i32> for SourceKey {
    fn from(k: i32) -> Self {
        Self::Int(i64::from(k))
    }
}

impl From<f64> for SourceKey {
    fn from(k: f64) -> Self {
        Self::Float(k)
    }
}

impl From<bool> for SourceKey {
    fn from(k: bool) -> Self {
        Self::Bool(k)
    }
}

/// A source value before conversion.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<SourceValue>),
    Map(Source),
}

macro_rules! source_value_from {
    ($variant:ident: $($ty:ty),+ => $conv:expr) => {
        $(
            impl From<$ty> for SourceValue {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::$variant($conv(v))
                }
            }
        )+
    };
}

source_value_from!(Int: i8, i16, i32, i64, u8, u16, u32 => i64::from);
source_value_from!(Float: f32, f64 => f64::from);
source_value_from!(Bool: bool => std::convert::identity);
source_value_from!(Str: String => std::convert::identity);

impl From<&str> for SourceValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<Source> for SourceValue {
    fn from(source: Source) -> Self {
        Self::Map(source)
    }
}

impl<T: Into<SourceValue>> From<Vec<T>> for SourceValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SourceValue>, const N: usize> From<[T; N]> for SourceValue {
    fn from(items: [T; N]) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Scalar> for SourceValue {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Int(v) => Self::Int(v),
            Scalar::Float(v) => Self::Float(v),
            Scalar::Bool(v) => Self::Bool(v),
            Scalar::Str(v) => Self::Str(v),
        }
    }
}

impl From<Value> for SourceValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Leaf(LeafValue::Scalar(scalar)) => scalar.into(),
            Value::Leaf(LeafValue::Sequence(seq)) => {
                Self::List(seq.iter().cloned().map(Into::into).collect())
            }
            Value::Node(node) => Self::Map(node.into()),
        }
    }
}

// =============================================================================
// Source
// =============================================================================

/// An ordered mapping handed to [`RegistryNode::new`].
///
/// Three construction styles normalise to the same thing:
///
/// ```
/// use robot_config::Source;
///
/// let mapping: Source = [("kDriverControllerPort", 0), ("kManipControllerPort", 1)].into();
/// let pairs = Source::from_pairs(vec![("kDriverControllerPort", 0), ("kManipControllerPort", 1)]);
/// let kwargs = Source::new()
///     .entry("kDriverControllerPort", 0)
///     .entry("kManipControllerPort", 1);
///
/// assert_eq!(mapping, pairs);
/// assert_eq!(pairs, kwargs);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Source {
    entries: Vec<(SourceKey, SourceValue)>,
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SourceKey>,
        V: Into<SourceValue>,
    {
        pairs.into_iter().collect()
    }

    /// Builder form of [`Source::push`], the keyword-argument style.
    #[must_use]
    pub fn entry(mut self, key: impl Into<SourceKey>, value: impl Into<SourceValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<SourceKey>, value: impl Into<SourceValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Layer `overrides` on top of `self`; later entries win on conversion.
    #[must_use]
    pub fn extend_with(mut self, overrides: Source) -> Self {
        self.entries.extend(overrides.entries);
        self
    }

    #[inline]
    pub fn entries(&self) -> &[(SourceKey, SourceValue)] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(SourceKey, SourceValue)> {
        self.entries
    }
}

impl<K: Into<SourceKey>, V: Into<SourceValue>> FromIterator<(K, V)> for Source {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<SourceKey>, V: Into<SourceValue>> From<Vec<(K, V)>> for Source {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<SourceKey>, V: Into<SourceValue>, const N: usize> From<[(K, V); N]> for Source {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<RegistryNode> for Source {
    fn from(node: RegistryNode) -> Self {
        node.into_entries()
            .map(|(key, value)| (SourceKey::Str(key), SourceValue::from(value)))
            .collect()
    }
}

impl From<&RegistryNode> for Source {
    fn from(node: &RegistryNode) -> Self {
        Self::from(node.clone())
    }
}

/// Build a [`Source`] literal.
///
/// Values are single token trees: literals, `[..]` lists, `{..}` nested
/// sources, or parenthesised expressions such as `(-1)`.
///
/// ```
/// use robot_config::source;
///
/// let src = source! {
///     "Interface" => { "kDriverControllerPort" => 0, "kManipControllerPort" => 1 },
///     "Elevator" => { "kMotorIDs" => [5, 6], "kOffset" => (-2) },
/// };
/// assert_eq!(src.len(), 2);
/// ```
#[macro_export]
macro_rules! source {
    (@value { $($inner:tt)* }) => {
        $crate::SourceValue::Map($crate::source!($($inner)*))
    };
    (@value [ $($item:tt),* $(,)? ]) => {
        $crate::SourceValue::List(::std::vec![$($crate::source!(@value $item)),*])
    };
    (@value $value:expr) => {
        $crate::SourceValue::from($value)
    };
    ($($key:expr => $value:tt),* $(,)?) => {
        $crate::Source::new()$(.entry($key, $crate::source!(@value $value)))*
    };
}

// =============================================================================
// Deserialization
// =============================================================================

impl<'de> Deserialize<'de> for SourceKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = SourceKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SourceKey, E> {
                Ok(SourceKey::Str(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<SourceKey, E> {
                Ok(SourceKey::Str(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SourceKey, E> {
                Ok(SourceKey::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SourceKey, E> {
                i64::try_from(v)
                    .map(SourceKey::Int)
                    .map_err(|_| E::custom(format!("integer key {v} exceeds i64::MAX")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<SourceKey, E> {
                Ok(SourceKey::Float(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<SourceKey, E> {
                Ok(SourceKey::Bool(v))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

struct SourceValueVisitor;

impl<'de> Visitor<'de> for SourceValueVisitor {
    type Value = SourceValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar, a list, or a mapping")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<SourceValue, E> {
        Ok(SourceValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SourceValue, E> {
        Ok(SourceValue::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SourceValue, E> {
        i64::try_from(v)
            .map(SourceValue::Int)
            .map_err(|_| E::custom(format!("integer {v} exceeds i64::MAX")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<SourceValue, E> {
        Ok(SourceValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SourceValue, E> {
        Ok(SourceValue::Str(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<SourceValue, E> {
        Ok(SourceValue::Str(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SourceValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(SourceValue::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<SourceValue, A::Error> {
        SourceVisitor.visit_map(map).map(SourceValue::Map)
    }
}

impl<'de> Deserialize<'de> for SourceValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SourceValueVisitor)
    }
}

struct SourceVisitor;

impl<'de> Visitor<'de> for SourceVisitor {
    type Value = Source;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Source, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<SourceKey, SourceValue>()? {
            entries.push((key, value));
        }
        Ok(Source { entries })
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SourceVisitor)
    }
}
