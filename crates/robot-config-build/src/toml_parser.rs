//! TOML configuration parser for constants files.
//!
//! ```toml
//! module_name = "Constants"      # optional
//!
//! [constants.Interface]
//! kDriverControllerPort = 0
//!
//! [constants.Elevator]
//! kMotorIDs = [5, 6]
//!
//! [placeholders]                 # optional: declared type, no value
//! "Drivetrain.kGyroIDs" = "[i64]"
//! ```

use indexmap::IndexMap;
use robot_config::{LeafValue, RegistryNode, Scalar, Sequence, Source, Value};
use serde::Deserialize;
use std::path::Path;

use crate::BuildError;

/// Names the generated code reserves inside every group.
const RESERVED_NAMES: &[&str] = &["Group", "new"];

/// Strict and reserved Rust keywords (edition 2024). None of these can name a
/// generated module or const.
const RUST_KEYWORDS: &[&str] = &[
    "_", "abstract", "as", "async", "await", "become", "box", "break", "const", "continue",
    "crate", "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if",
    "impl", "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "try",
    "type", "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Parsed and validated constants configuration.
#[derive(Debug, Clone)]
pub struct ConstantsConfig {
    /// Module name for the generated `constants!` root
    pub module_name: String,
    /// Every valued constant, frozen
    registry: RegistryNode,
    /// Declaration tree in file order, placeholders included
    items: Vec<ConstantItem>,
    /// Placeholder paths and their declared types
    placeholders: IndexMap<String, String>,
}

/// One named member of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantItem {
    pub name: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// `name: ty = literal;`
    Value { ty: String, literal: String },
    /// `name: ty;`
    Placeholder { ty: String },
    /// `name { ... }`
    Group(Vec<ConstantItem>),
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstantsConfig {
    /// Optional module name (defaults to "Constants")
    module_name: Option<String>,
    /// The constant tree
    #[serde(default)]
    constants: Source,
    /// Dotted path -> declared type
    #[serde(default)]
    placeholders: IndexMap<String, String>,
}

impl ConstantsConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BuildError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, BuildError> {
        let raw: RawConstantsConfig = toml::from_str(content)?;

        let module_name = raw.module_name.unwrap_or_else(|| "Constants".to_string());
        validate_identifier(&module_name, &module_name)?;

        let registry = RegistryNode::new(raw.constants)?;
        let mut items = items_from_node(&registry, "")?;

        for (path, ty) in &raw.placeholders {
            insert_placeholder(&mut items, path, ty)?;
        }

        Ok(Self {
            module_name,
            registry,
            items,
            placeholders: raw.placeholders,
        })
    }

    /// The valued constants as a frozen registry.
    pub fn registry(&self) -> &RegistryNode {
        &self.registry
    }

    /// Top-level items in file order.
    pub fn items(&self) -> &[ConstantItem] {
        &self.items
    }

    /// Placeholder paths and their declared types.
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, &str)> {
        self.placeholders.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    /// Number of valued leaf constants, at any depth.
    pub fn len(&self) -> usize {
        fn count(node: &RegistryNode) -> usize {
            node.values()
                .map(|v| match v {
                    Value::Node(child) => count(child),
                    Value::Leaf(_) => 1,
                })
                .sum()
        }
        count(&self.registry)
    }

    /// Check if there is nothing to generate.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check valid identifier (starts with letter/underscore, contains alphanumeric/_).
fn validate_identifier(path: &str, name: &str) -> Result<(), BuildError> {
    let mut chars = name.chars();
    match chars.next() {
        None => {
            return Err(BuildError::Validation(format!(
                "Invalid path '{path}': empty segment"
            )));
        }
        Some(first) if !first.is_alphabetic() && first != '_' => {
            return Err(BuildError::Validation(format!(
                "Invalid path '{path}': segment '{name}' must start with letter or underscore"
            )));
        }
        Some(_) => {}
    }
    for c in chars {
        if !c.is_alphanumeric() && c != '_' {
            return Err(BuildError::Validation(format!(
                "Invalid path '{path}': segment '{name}' contains invalid character '{c}'"
            )));
        }
    }
    if RUST_KEYWORDS.contains(&name) {
        return Err(BuildError::Validation(format!(
            "Invalid path '{path}': '{name}' is a Rust keyword"
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(BuildError::Validation(format!(
            "Invalid path '{path}': '{name}' is reserved by the generated code"
        )));
    }
    Ok(())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn items_from_node(node: &RegistryNode, prefix: &str) -> Result<Vec<ConstantItem>, BuildError> {
    let mut items = Vec::with_capacity(node.len());
    for (name, value) in node.items() {
        let path = join(prefix, name);
        validate_identifier(&path, name)?;

        let kind = match value {
            Value::Node(child) => ItemKind::Group(items_from_node(child, &path)?),
            Value::Leaf(LeafValue::Scalar(scalar)) => ItemKind::Value {
                ty: scalar_type(scalar).to_string(),
                literal: scalar_literal(&path, scalar)?,
            },
            Value::Leaf(LeafValue::Sequence(seq)) => sequence_item(&path, seq)?,
        };
        items.push(ConstantItem {
            name: name.to_string(),
            kind,
        });
    }
    Ok(items)
}

fn scalar_type(scalar: &Scalar) -> &'static str {
    match scalar {
        Scalar::Int(_) => "i64",
        Scalar::Float(_) => "f64",
        Scalar::Bool(_) => "bool",
        Scalar::Str(_) => "&str",
    }
}

fn scalar_literal(path: &str, scalar: &Scalar) -> Result<String, BuildError> {
    Ok(match scalar {
        Scalar::Int(v) => v.to_string(),
        Scalar::Float(v) if !v.is_finite() => {
            return Err(BuildError::Validation(format!(
                "Invalid value at '{path}': {v} cannot be written as a constant"
            )));
        }
        Scalar::Float(v) => format!("{v:?}"),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Str(v) => format!("{v:?}"),
    })
}

/// Arrays must be homogeneous; an empty array is `[i64]`.
fn sequence_item(path: &str, seq: &Sequence) -> Result<ItemKind, BuildError> {
    let element = seq.first().map_or("i64", scalar_type);
    if let Some(odd) = seq.iter().find(|s| scalar_type(s) != element) {
        return Err(BuildError::Validation(format!(
            "Invalid array at '{path}': mixes {element} and {} elements",
            scalar_type(odd)
        )));
    }

    let literals = seq
        .iter()
        .map(|s| scalar_literal(path, s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ItemKind::Value {
        ty: format!("[{element}]"),
        literal: format!("[{}]", literals.join(", ")),
    })
}

fn insert_placeholder(items: &mut Vec<ConstantItem>, path: &str, ty: &str) -> Result<(), BuildError> {
    if ty.trim().is_empty() {
        return Err(BuildError::Validation(format!(
            "Placeholder '{path}' needs a type"
        )));
    }
    if path.starts_with('.') || path.ends_with('.') || path.contains("..") {
        return Err(BuildError::Validation(format!(
            "Invalid path '{path}': empty segment"
        )));
    }

    let segments: Vec<&str> = path.split('.').collect();
    for seg in &segments {
        validate_identifier(path, seg)?;
    }
    let Some((field, groups)) = segments.split_last() else {
        return Err(BuildError::Validation("Empty path not allowed".into()));
    };

    let mut current = items;
    for group in groups {
        let index = match current.iter().position(|i| i.name == *group) {
            Some(index) => index,
            None => {
                current.push(ConstantItem {
                    name: group.to_string(),
                    kind: ItemKind::Group(Vec::new()),
                });
                current.len() - 1
            }
        };
        current = match &mut current[index].kind {
            ItemKind::Group(children) => children,
            _ => {
                return Err(BuildError::Validation(format!(
                    "Placeholder '{path}': '{group}' is a value, not a group"
                )));
            }
        };
    }

    if current.iter().any(|i| i.name == *field) {
        return Err(BuildError::Validation(format!(
            "Placeholder '{path}' collides with an existing constant"
        )));
    }
    current.push(ConstantItem {
        name: field.to_string(),
        kind: ItemKind::Placeholder { ty: ty.trim().to_string() },
    });
    Ok(())
}
