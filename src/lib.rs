//! # Immutable Hierarchical Configuration (robot-config)
//!
//! Frozen, nested constant registries for robot-style configuration: ports,
//! motor IDs, PID gains. Everything is built once at startup and read from
//! anywhere afterwards.
//!
//! ## Design
//!
//! ```text
//! Source (ordered mapping, any serde format)
//!     │  RegistryNode::new  (eager, recursive, all-or-nothing)
//!     ▼
//! RegistryNode ── "Interface" ──► RegistryNode ── "kDriverControllerPort" ──► Leaf(0)
//!              └─ "Elevator"  ──► RegistryNode ── "kMotorIDs"             ──► Leaf([5, 6])
//! ```
//!
//! - Nested mappings become child nodes; lists become fixed [`Sequence`]s.
//! - Lookup by key, by attribute, or by multi-segment [`Path`].
//! - No `&mut` API exists on any frozen type; explicit mutation calls from
//!   [`ImmutabilityGuard`] fail with [`RegistryError::ImmutableViolation`].
//!
//! ## Declared groups
//!
//! ```ignore
//! use robot_config::{constants, ConstantGroup};
//!
//! constants! {
//!     pub mod Constants {
//!         Interface {
//!             kDriverControllerPort: i64 = 0;
//!             kManipControllerPort: i64 = 1;
//!         }
//!     }
//! }
//!
//! assert_eq!(Constants::Interface::kDriverControllerPort, 0);
//! assert_eq!(Constants::Interface::Group::get("kManipControllerPort")?.as_int(), Some(1));
//! ```

extern crate self as robot_config;

pub mod error;
pub mod group;
pub mod guard;
pub mod node;
pub mod path;
pub mod singleton;
pub mod source;
pub mod value;

pub use error::RegistryError;
pub use group::{
    ConstantGroup, Declaration, Diagnostic, DiagnosticKind, Placeholder, ResolvedGroup, Unresolved,
};
pub use guard::{ImmutabilityGuard, Mutation};
pub use node::{Keys, RegistryNode};
pub use path::{Path, PathResolver};
pub use singleton::{Singleton, SingletonBinding, TrySingleton, TrySingletonBinding};
pub use source::{Source, SourceKey, SourceValue};
pub use value::{LeafValue, Scalar, Sequence, Value};

pub use robot_config_macro::constants;
