//! Write-rejection policy shared by every frozen container.
//!
//! Frozen containers expose no `&mut` API, so the type system already rules
//! out mutation. [`ImmutabilityGuard`] keeps the four mutating operations as
//! explicit calls that always fail, so misuse is reported as a
//! [`RegistryError::ImmutableViolation`] naming the operation and the target.

use std::fmt;

use crate::error::RegistryError;
use crate::value::Value;

/// The four mutating operations a frozen container rejects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    /// `container[key] = value`
    SetItem,
    /// `container.name = value`
    SetAttr,
    /// `del container[key]`
    DelItem,
    /// `del container.name`
    DelAttr,
}

impl Mutation {
    pub const ALL: [Mutation; 4] = [
        Mutation::SetItem,
        Mutation::SetAttr,
        Mutation::DelItem,
        Mutation::DelAttr,
    ];
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SetItem => "assign item",
            Self::SetAttr => "assign attribute",
            Self::DelItem => "delete item",
            Self::DelAttr => "delete attribute",
        })
    }
}

/// Rejects every mutation with [`RegistryError::ImmutableViolation`].
///
/// Implementors only name themselves; the rejecting operations are provided
/// and leave the container untouched.
pub trait ImmutabilityGuard {
    /// Human-readable name of the guarded container.
    fn guard_target(&self) -> String;

    /// Build the violation for `op` on `name`.
    fn reject(&self, op: Mutation, name: &str) -> RegistryError {
        let target = self.guard_target();
        tracing::debug!(%op, %target, name, "rejected mutation of frozen registry");
        RegistryError::ImmutableViolation {
            op,
            target,
            name: name.to_owned(),
        }
    }

    /// Dispatch on `op`; the value is ignored for deletions.
    fn mutate(&self, op: Mutation, name: &str, value: Option<Value>) -> Result<(), RegistryError> {
        drop(value);
        Err(self.reject(op, name))
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), RegistryError> {
        self.mutate(Mutation::SetItem, key, Some(value))
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<(), RegistryError> {
        self.mutate(Mutation::SetAttr, name, Some(value))
    }

    fn del_item(&self, key: &str) -> Result<(), RegistryError> {
        self.mutate(Mutation::DelItem, key, None)
    }

    fn del_attr(&self, name: &str) -> Result<(), RegistryError> {
        self.mutate(Mutation::DelAttr, name, None)
    }
}
