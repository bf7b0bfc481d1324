//! Error taxonomy for registry construction, lookup and mutation.
//!
//! Every variant describes a configuration-authoring or programming error.
//! None of them are transient, so nothing here is meant to be retried: callers
//! propagate them with `?` until initialisation aborts.

use thiserror::Error;

use crate::guard::Mutation;
use crate::path::Path;

/// Errors raised by [`RegistryNode`](crate::RegistryNode), constant groups and
/// the path resolver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A source mapping used a key that is not a string.
    #[error("registry keys must be strings, found {found}")]
    MalformedKey { found: String },

    /// A source value cannot be represented as a leaf or a child node.
    #[error("unsupported value for key '{key}': {reason}")]
    MalformedValue { key: String, reason: String },

    /// A key or path segment is absent.
    ///
    /// `depth` is the index of `segment` inside `path`; everything from there
    /// on is the unconsumed remainder.
    #[error("'{segment}' not found in {within}{}", path_context(.path, .depth))]
    NotFound {
        segment: String,
        path: Path,
        depth: usize,
        within: String,
    },

    /// Attribute-style access to a missing key.
    #[error("no attribute '{name}' in {within}")]
    AttributeNotFound { name: String, within: String },

    /// A lookup was attempted with a path that has no segments.
    #[error("lookup path must contain at least one segment")]
    EmptyPath,

    /// Any attempt to change a frozen container.
    #[error("{target} is immutable: cannot {op} '{name}'")]
    ImmutableViolation {
        op: Mutation,
        target: String,
        name: String,
    },

    /// A declared field has only a type and no default could be produced.
    #[error("{group}.{field} is only declared as `{type_name}` and has no default value")]
    PlaceholderUnresolved {
        group: String,
        field: String,
        type_name: String,
    },

    /// A typed read found a value of a different kind.
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}

impl RegistryError {
    /// The segments of a `NotFound` path that were never consumed.
    pub fn unconsumed(&self) -> Option<&[String]> {
        match self {
            Self::NotFound { path, depth, .. } => Some(path.segments().get(*depth..).unwrap_or(&[])),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::AttributeNotFound { .. })
    }

    pub fn is_immutable_violation(&self) -> bool {
        matches!(self, Self::ImmutableViolation { .. })
    }
}

fn path_context(path: &Path, depth: &usize) -> String {
    if path.len() <= 1 {
        return String::new();
    }
    let unconsumed = path.segments().get(*depth..).unwrap_or(&[]).join(".");
    format!(" (resolving '{path}', unconsumed '{unconsumed}')")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_remainder_for_multi_segment_paths() {
        let err = RegistryError::NotFound {
            segment: "z".into(),
            path: Path::from(["a", "z", "q"]),
            depth: 1,
            within: "{\"b\": 1}".into(),
        };

        assert_eq!(err.unconsumed().unwrap(), ["z", "q"]);
        let msg = err.to_string();
        assert!(msg.starts_with("'z' not found in {\"b\": 1}"));
        assert!(msg.contains("unconsumed 'z.q'"));
    }

    #[test]
    fn single_segment_message_has_no_path_context() {
        let err = RegistryError::NotFound {
            segment: "x".into(),
            path: Path::from("x"),
            depth: 0,
            within: "{}".into(),
        };
        assert_eq!(err.to_string(), "'x' not found in {}");
    }

    #[test]
    fn immutable_violation_message() {
        let err = RegistryError::ImmutableViolation {
            op: Mutation::SetAttr,
            target: "registry node".into(),
            name: "Interface".into(),
        };
        assert_eq!(
            err.to_string(),
            "registry node is immutable: cannot assign attribute 'Interface'"
        );
        assert!(err.is_immutable_violation());
    }
}
