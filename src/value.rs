//! Terminal values and the value slot of a registry node.
//!
//! A [`LeafValue`] is either a [`Scalar`] or a fixed-length [`Sequence`] of
//! scalars. A [`Value`] is whatever a key maps to: a leaf or a child
//! [`RegistryNode`].

use std::fmt;
use std::ops::Deref;

use crate::error::RegistryError;
use crate::guard::{ImmutabilityGuard, Mutation};
use crate::node::RegistryNode;
use crate::path::Path;
use crate::source::SourceValue;

// =============================================================================
// Scalar
// =============================================================================

/// A single configuration value.
///
/// Floats compare by bit pattern, so a stored `NaN` equals itself and a
/// registry always equals its own canonical mapping.
#[derive(Clone, Debug)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Scalar {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Str(_) => "string",
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Floats, and integers widened to float (gains are often written `0`).
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v),
            Self::Int(v) => Some(v as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn from_source(key: &str, value: SourceValue) -> Result<Self, RegistryError> {
        match value {
            SourceValue::Int(v) => Ok(Self::Int(v)),
            SourceValue::Float(v) => Ok(Self::Float(v)),
            SourceValue::Bool(v) => Ok(Self::Bool(v)),
            SourceValue::Str(v) => Ok(Self::Str(v)),
            SourceValue::List(_) => Err(RegistryError::MalformedValue {
                key: key.to_owned(),
                reason: "sequences may only contain scalars, found a nested sequence".into(),
            }),
            SourceValue::Map(_) => Err(RegistryError::MalformedValue {
                key: key.to_owned(),
                reason: "sequences may only contain scalars, found a mapping".into(),
            }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident: $($ty:ty),+ => $conv:expr) => {
        $(
            impl From<$ty> for Scalar {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::$variant($conv(v))
                }
            }
        )+
    };
}

scalar_from!(Int: i8, i16, i32, i64, u8, u16, u32 => i64::from);
scalar_from!(Float: f32, f64 => f64::from);
scalar_from!(Bool: bool => std::convert::identity);
scalar_from!(Str: String => std::convert::identity);

impl From<&str> for Scalar {
    #[inline]
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<&String> for Scalar {
    #[inline]
    fn from(v: &String) -> Self {
        Self::Str(v.clone())
    }
}

// =============================================================================
// Sequence
// =============================================================================

/// A fixed-length, immutable sequence of scalars.
///
/// Lists handed to the registry are converted into this form once; the
/// length and elements never change afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sequence {
    items: Box<[Scalar]>,
}

impl Sequence {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        items.into_iter().collect()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Scalar] {
        &self.items
    }

    /// Element rebinding is never permitted.
    pub fn set(&self, index: usize, value: impl Into<Scalar>) -> Result<(), RegistryError> {
        let _: Scalar = value.into();
        Err(self.reject(Mutation::SetItem, &index.to_string()))
    }

    pub(crate) fn from_source(key: &str, items: Vec<SourceValue>) -> Result<Self, RegistryError> {
        items
            .into_iter()
            .map(|item| Scalar::from_source(key, item))
            .collect()
    }
}

impl Deref for Sequence {
    type Target = [Scalar];

    #[inline]
    fn deref(&self) -> &[Scalar] {
        &self.items
    }
}

impl<T: Into<Scalar>> FromIterator<T> for Sequence {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Scalar;
    type IntoIter = std::slice::Iter<'a, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

impl ImmutabilityGuard for Sequence {
    fn guard_target(&self) -> String {
        format!("sequence {self}")
    }
}

// =============================================================================
// LeafValue
// =============================================================================

/// A terminal configuration value.
#[derive(Clone, Debug, PartialEq)]
pub enum LeafValue {
    Scalar(Scalar),
    Sequence(Sequence),
}

impl LeafValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Scalar(s) => s.kind_name(),
            Self::Sequence(_) => "sequence",
        }
    }

    #[inline]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Sequence(_) => None,
        }
    }

    #[inline]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            Self::Scalar(_) => None,
        }
    }
}

impl fmt::Display for LeafValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => fmt::Display::fmt(s, f),
            Self::Sequence(s) => fmt::Display::fmt(s, f),
        }
    }
}

impl From<Scalar> for LeafValue {
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}

impl From<Sequence> for LeafValue {
    fn from(s: Sequence) -> Self {
        Self::Sequence(s)
    }
}

impl<T: Clone + Into<Scalar>> From<&[T]> for LeafValue {
    fn from(items: &[T]) -> Self {
        Self::Sequence(items.iter().cloned().collect())
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for LeafValue {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for LeafValue {
    fn from(items: [T; N]) -> Self {
        Self::Sequence(items.into_iter().collect())
    }
}

// =============================================================================
// Value
// =============================================================================

/// What a registry key maps to.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Leaf(LeafValue),
    Node(RegistryNode),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Leaf(leaf) => leaf.kind_name(),
            Self::Node(_) => "node",
        }
    }

    #[inline]
    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    #[inline]
    pub fn as_node(&self) -> Option<&RegistryNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Leaf(_) => None,
        }
    }

    #[inline]
    pub fn as_leaf(&self) -> Option<&LeafValue> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Node(_) => None,
        }
    }

    #[inline]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        self.as_leaf().and_then(LeafValue::as_scalar)
    }

    #[inline]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        self.as_leaf().and_then(LeafValue::as_sequence)
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_int)
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_float)
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// One-level lookup for chaining: `root.get("a")?.get("b")`.
    pub fn get(&self, key: &str) -> Result<&Value, RegistryError> {
        self.get_path(key)
    }

    /// Path lookup relative to this value.
    pub fn get_path(&self, path: impl Into<Path>) -> Result<&Value, RegistryError> {
        let path = path.into();
        match self {
            Self::Node(node) => node.get_path(path),
            Self::Leaf(leaf) => {
                let segment = path.segments().first().cloned().ok_or(RegistryError::EmptyPath)?;
                Err(RegistryError::NotFound {
                    segment,
                    path,
                    depth: 0,
                    within: format!("leaf value {leaf}"),
                })
            }
        }
    }

    /// Attribute-style chaining: `root.attr("a")?.attr("b")`.
    pub fn attr(&self, name: &str) -> Result<&Value, RegistryError> {
        match self {
            Self::Node(node) => node.attr(name),
            Self::Leaf(leaf) => Err(RegistryError::AttributeNotFound {
                name: name.to_owned(),
                within: format!("leaf value {leaf}"),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => fmt::Display::fmt(leaf, f),
            Self::Node(node) => fmt::Display::fmt(node, f),
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for LeafValue {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::Scalar(Scalar::from(v))
                }
            }

            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Self::Leaf(LeafValue::from(v))
                }
            }
        )+
    };
}

value_from_scalar!(i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, String, &str, &String);

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Leaf(LeafValue::Scalar(s))
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Self::Leaf(LeafValue::Sequence(s))
    }
}

impl From<LeafValue> for Value {
    fn from(leaf: LeafValue) -> Self {
        Self::Leaf(leaf)
    }
}

impl From<RegistryNode> for Value {
    fn from(node: RegistryNode) -> Self {
        Self::Node(node)
    }
}

impl<T: Clone + Into<Scalar>> From<&[T]> for Value {
    fn from(items: &[T]) -> Self {
        Self::Leaf(LeafValue::from(items))
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Leaf(LeafValue::from(items))
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Self::Leaf(LeafValue::from(items))
    }
}

// =============================================================================
// Typed reads
// =============================================================================

fn wrong_kind(expected: &'static str, found: &Value) -> RegistryError {
    RegistryError::WrongKind {
        expected,
        found: found.kind_name(),
    }
}

impl TryFrom<&Value> for i64 {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_int().ok_or_else(|| wrong_kind("integer", value))
    }
}

impl TryFrom<&Value> for f64 {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_float().ok_or_else(|| wrong_kind("float", value))
    }
}

impl TryFrom<&Value> for bool {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| wrong_kind("boolean", value))
    }
}

impl TryFrom<&Value> for String {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| wrong_kind("string", value))
    }
}

impl TryFrom<&Value> for Vec<i64> {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let seq = value
            .as_sequence()
            .ok_or_else(|| wrong_kind("integer sequence", value))?;
        seq.iter()
            .map(|item| {
                item.as_int().ok_or(RegistryError::WrongKind {
                    expected: "integer",
                    found: item.kind_name(),
                })
            })
            .collect()
    }
}

impl TryFrom<&Value> for Vec<f64> {
    type Error = RegistryError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let seq = value
            .as_sequence()
            .ok_or_else(|| wrong_kind("float sequence", value))?;
        seq.iter()
            .map(|item| {
                item.as_float().ok_or(RegistryError::WrongKind {
                    expected: "float",
                    found: item.kind_name(),
                })
            })
            .collect()
    }
}
