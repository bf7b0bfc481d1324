//! Declaration-bound constant groups.
//!
//! A group is a named set of constants declared in code with the
//! [`constants!`](crate::constants) macro. Each group resolves once, on first
//! use, into a frozen [`RegistryNode`] that serves every lookup afterwards.
//!
//! ```text
//! constants! { pub mod Constants { Interface { kPort: i64 = 0; } } }
//!
//! Constants::Interface::Group          ZST, implements ConstantGroup
//!            Interface::kPort          compile-time const
//!            Interface::Group::get("kPort")  runtime lookup via ResolvedGroup
//! ```
//!
//! A field declared with a type but no value is a *placeholder*. Its value
//! comes from [`Placeholder::placeholder_default`]; when the type has none the
//! field stays unresolved, is left out of iteration, and reading it fails with
//! [`RegistryError::PlaceholderUnresolved`].

use std::fmt;

use indexmap::IndexMap;

use crate::error::RegistryError;
use crate::node::{Keys, Pending, RegistryNode};
use crate::path::Path;
use crate::value::{LeafValue, Sequence, Value};

// =============================================================================
// Placeholder defaults
// =============================================================================

/// Supplies the value of a field declared only by its type.
///
/// User types opt in with an empty impl, which means "no default":
///
/// ```
/// use robot_config::Placeholder;
///
/// struct MotorHandle;
/// impl Placeholder for MotorHandle {}
///
/// assert!(MotorHandle::placeholder_default().is_none());
/// ```
pub trait Placeholder {
    fn placeholder_default() -> Option<LeafValue> {
        None
    }
}

macro_rules! placeholder_default {
    ($value:expr => $($ty:ty),+) => {
        $(
            impl Placeholder for $ty {
                fn placeholder_default() -> Option<LeafValue> {
                    Some(LeafValue::from($value))
                }
            }
        )+
    };
}

placeholder_default!(0 => i8, i16, i32, i64, u8, u16, u32, isize, usize, u64);
placeholder_default!(0.0 => f32, f64);
placeholder_default!(false => bool);
placeholder_default!("" => str, &str, String);

impl<T> Placeholder for [T] {
    fn placeholder_default() -> Option<LeafValue> {
        Some(LeafValue::Sequence(Sequence::default()))
    }
}

impl<T> Placeholder for &[T] {
    fn placeholder_default() -> Option<LeafValue> {
        Some(LeafValue::Sequence(Sequence::default()))
    }
}

impl<T> Placeholder for Vec<T> {
    fn placeholder_default() -> Option<LeafValue> {
        Some(LeafValue::Sequence(Sequence::default()))
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// One field of a group, as written in the declaring code.
#[derive(Clone, Debug)]
pub struct Declaration {
    name: &'static str,
    declared: Declared,
}

#[derive(Clone, Debug)]
enum Declared {
    Value(Value),
    Placeholder {
        type_name: &'static str,
        default: Option<LeafValue>,
    },
    Group(fn() -> &'static ResolvedGroup),
}

impl Declaration {
    /// A field with a literal value.
    pub fn value(name: &'static str, value: impl Into<Value>) -> Self {
        Self {
            name,
            declared: Declared::Value(value.into()),
        }
    }

    /// A field declared only as `name: T`.
    pub fn placeholder<T: Placeholder + ?Sized>(name: &'static str, type_name: &'static str) -> Self {
        Self {
            name,
            declared: Declared::Placeholder {
                type_name,
                default: T::placeholder_default(),
            },
        }
    }

    /// A nested group.
    pub fn group<G: ConstantGroup>(name: &'static str) -> Self {
        Self {
            name,
            declared: Declared::Group(G::resolved),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Something noteworthy found while resolving a group.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Dotted path of the declaring group.
    pub group: String,
    pub field: String,
    pub kind: DiagnosticKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    /// A placeholder received the default of its declared type.
    PlaceholderFilled {
        type_name: &'static str,
        value: LeafValue,
    },
    /// A placeholder whose type has no default.
    PlaceholderUnresolved { type_name: &'static str },
    /// The field name collides with the `keys` accessor.
    ReservedName,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { group, field, kind } = self;
        match kind {
            DiagnosticKind::PlaceholderFilled { type_name, value } => write!(
                f,
                "{group}.{field} has no value; using `{type_name}` default {value}"
            ),
            DiagnosticKind::PlaceholderUnresolved { type_name } => write!(
                f,
                "{group}.{field} has no value and `{type_name}` has no default"
            ),
            DiagnosticKind::ReservedName => write!(
                f,
                "{group}.{field} shadows the `keys` accessor; read it with get(\"keys\")"
            ),
        }
    }
}

/// A placeholder left without a value.
#[derive(Clone, Debug, PartialEq)]
pub struct Unresolved {
    /// Dotted path of the declaring group.
    pub group: String,
    pub field: String,
    pub type_name: &'static str,
    /// Location relative to the group that reports it.
    pub path: Path,
}

impl Unresolved {
    pub fn to_error(&self) -> RegistryError {
        RegistryError::PlaceholderUnresolved {
            group: self.group.clone(),
            field: self.field.clone(),
            type_name: self.type_name.to_owned(),
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// The frozen result of resolving a group's declarations.
#[derive(Clone, Debug)]
pub struct ResolvedGroup {
    name: &'static str,
    path: Path,
    node: RegistryNode,
    unresolved: Vec<Unresolved>,
    diagnostics: Vec<Diagnostic>,
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

impl ResolvedGroup {
    pub fn resolve<G: ConstantGroup>() -> Self {
        Self::from_declarations(G::NAME, Path::dotted(G::PATH), G::declarations())
    }

    /// Resolve `declarations` in order.
    ///
    /// Nested groups contribute their node as a child and bubble their
    /// unresolved placeholders and diagnostics up, re-rooted at this group.
    pub fn from_declarations(name: &'static str, path: Path, declarations: Vec<Declaration>) -> Self {
        let span = tracing::debug_span!("resolve_group", group = %path);
        let _enter = span.enter();

        let group = path.to_string();
        let mut entries = IndexMap::with_capacity(declarations.len());
        let mut pending = IndexMap::new();
        let mut unresolved = Vec::new();
        let mut diagnostics = Vec::new();

        for Declaration { name: field, declared } in declarations {
            if is_dunder(field) {
                continue;
            }

            if field == "keys" {
                let diagnostic = Diagnostic {
                    group: group.clone(),
                    field: field.to_owned(),
                    kind: DiagnosticKind::ReservedName,
                };
                tracing::warn!("{diagnostic}");
                diagnostics.push(diagnostic);
            }

            match declared {
                Declared::Value(value) => {
                    entries.insert(field.to_owned(), value);
                }
                Declared::Placeholder {
                    type_name,
                    default: Some(value),
                } => {
                    let diagnostic = Diagnostic {
                        group: group.clone(),
                        field: field.to_owned(),
                        kind: DiagnosticKind::PlaceholderFilled {
                            type_name,
                            value: value.clone(),
                        },
                    };
                    tracing::warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                    entries.insert(field.to_owned(), Value::Leaf(value));
                }
                Declared::Placeholder {
                    type_name,
                    default: None,
                } => {
                    let diagnostic = Diagnostic {
                        group: group.clone(),
                        field: field.to_owned(),
                        kind: DiagnosticKind::PlaceholderUnresolved { type_name },
                    };
                    tracing::warn!("{diagnostic}");
                    diagnostics.push(diagnostic);
                    pending.insert(
                        field.to_owned(),
                        Pending {
                            group: group.clone(),
                            type_name,
                        },
                    );
                    unresolved.push(Unresolved {
                        group: group.clone(),
                        field: field.to_owned(),
                        type_name,
                        path: Path::from(field),
                    });
                }
                Declared::Group(resolve) => {
                    let child = resolve();
                    entries.insert(field.to_owned(), Value::Node(child.node.clone()));
                    unresolved.extend(child.unresolved.iter().map(|u| Unresolved {
                        path: u.path.prefixed(field),
                        ..u.clone()
                    }));
                    diagnostics.extend(child.diagnostics.iter().cloned());
                }
            }
        }

        let node = RegistryNode::from_entries(entries, pending);
        tracing::debug!(
            fields = node.len(),
            unresolved = unresolved.len(),
            "constant group resolved"
        );

        Self {
            name,
            path,
            node,
            unresolved,
            diagnostics,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn node(&self) -> &RegistryNode {
        &self.node
    }

    pub fn unresolved(&self) -> &[Unresolved] {
        &self.unresolved
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Lookup that reports unresolved placeholders by name instead of as
    /// missing keys, at any depth.
    pub fn get_path(&self, path: &Path) -> Result<&Value, RegistryError> {
        self.node.get_path(path)
    }

    pub fn attr(&self, name: &str) -> Result<&Value, RegistryError> {
        self.node.attr(name)
    }

    pub fn validate(&self) -> Result<&RegistryNode, RegistryError> {
        match self.unresolved.first() {
            Some(hole) => Err(hole.to_error()),
            None => Ok(&self.node),
        }
    }
}

/// `Name(k=v, ...)`
impl fmt::Display for ResolvedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (key, value)) in self.node.items().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str(")")
    }
}

// =============================================================================
// ConstantGroup
// =============================================================================

/// Static access to a group generated by [`constants!`](crate::constants).
///
/// Every accessor is an associated function: the group *is* its type, and
/// the zero-sized instance carries no state.
pub trait ConstantGroup: Copy + Default + 'static {
    /// Group name as declared, e.g. `"Interface"`.
    const NAME: &'static str;
    /// Dotted path from the root module, e.g. `"Constants.Interface"`.
    const PATH: &'static str;

    /// Fields in declaration order.
    fn declarations() -> Vec<Declaration>;

    /// The resolved group, computed on first call.
    fn resolved() -> &'static ResolvedGroup;

    fn node() -> &'static RegistryNode {
        Self::resolved().node()
    }

    fn get(key: &str) -> Result<&'static Value, RegistryError> {
        Self::get_path(key)
    }

    fn try_get(key: &str) -> Option<&'static Value> {
        Self::node().try_get(key)
    }

    fn get_path(path: impl Into<Path>) -> Result<&'static Value, RegistryError> {
        Self::resolved().get_path(&path.into())
    }

    fn attr(name: &str) -> Result<&'static Value, RegistryError> {
        Self::resolved().attr(name)
    }

    fn get_as<T>(path: impl Into<Path>) -> Result<T, RegistryError>
    where
        T: for<'v> TryFrom<&'v Value, Error = RegistryError>,
    {
        T::try_from(Self::get_path(path)?)
    }

    fn keys() -> Keys<'static> {
        Self::node().keys()
    }

    fn values() -> indexmap::map::Values<'static, String, Value> {
        Self::node().values()
    }

    fn items() -> impl ExactSizeIterator<Item = (&'static str, &'static Value)> {
        Self::node().items()
    }

    fn contains(key: &str) -> bool {
        Self::node().contains(key)
    }

    fn diagnostics() -> &'static [Diagnostic] {
        Self::resolved().diagnostics()
    }

    fn unresolved() -> &'static [Unresolved] {
        Self::resolved().unresolved()
    }

    /// Fail on the first unresolved placeholder, anywhere below this group.
    fn validate() -> Result<&'static RegistryNode, RegistryError> {
        Self::resolved().validate()
    }

    fn render() -> String {
        Self::resolved().to_string()
    }

    fn instance() -> Self {
        Self::default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Opaque;
    impl Placeholder for Opaque {}

    fn resolve(decls: Vec<Declaration>) -> ResolvedGroup {
        ResolvedGroup::from_declarations("Drivetrain", Path::dotted("Constants.Drivetrain"), decls)
    }

    #[test]
    fn values_keep_declaration_order() {
        let group = resolve(vec![
            Declaration::value("kRightMotorIDs", [1, 2]),
            Declaration::value("kLeftMotorIDs", [3, 4]),
            Declaration::value("kTrackWidth", 0.6),
        ]);

        assert_eq!(
            group.node().keys().collect::<Vec<_>>(),
            ["kRightMotorIDs", "kLeftMotorIDs", "kTrackWidth"]
        );
        assert!(group.diagnostics().is_empty());
        assert!(group.validate().is_ok());
    }

    #[test]
    fn placeholder_with_default_is_filled_and_reported() {
        let group = resolve(vec![Declaration::placeholder::<[i64]>("kGyroIDs", "[i64]")]);

        assert_eq!(
            group.node().get("kGyroIDs").unwrap(),
            &Value::Leaf(LeafValue::Sequence(Sequence::default()))
        );
        assert!(matches!(
            group.diagnostics(),
            [Diagnostic {
                kind: DiagnosticKind::PlaceholderFilled { type_name: "[i64]", .. },
                ..
            }]
        ));
    }

    #[test]
    fn placeholder_without_default_is_absent_but_named() {
        let group = resolve(vec![
            Declaration::value("kTrackWidth", 0.6),
            Declaration::placeholder::<Opaque>("kGyro", "Opaque"),
        ]);

        assert_eq!(group.node().keys().collect::<Vec<_>>(), ["kTrackWidth"]);
        assert_eq!(
            group.get_path(&Path::from("kGyro")).unwrap_err(),
            RegistryError::PlaceholderUnresolved {
                group: "Constants.Drivetrain".into(),
                field: "kGyro".into(),
                type_name: "Opaque".into(),
            }
        );
        assert!(matches!(
            group.attr("kGyro"),
            Err(RegistryError::PlaceholderUnresolved { .. })
        ));
        assert!(group.validate().is_err());
        assert_eq!(group.to_string(), "Drivetrain(kTrackWidth=0.6)");
    }

    #[test]
    fn nested_placeholder_is_named_by_every_notation() {
        let child = ResolvedGroup::from_declarations(
            "Elevator",
            Path::dotted("Constants.Elevator"),
            vec![
                Declaration::value("kMotorIDs", [5, 6]),
                Declaration::placeholder::<Opaque>("kMotor", "Opaque"),
            ],
        );
        let mut entries = IndexMap::new();
        entries.insert("Elevator".to_owned(), Value::Node(child.node().clone()));
        let root = RegistryNode::from_entries(entries, IndexMap::new());

        let expected = RegistryError::PlaceholderUnresolved {
            group: "Constants.Elevator".into(),
            field: "kMotor".into(),
            type_name: "Opaque".into(),
        };
        assert_eq!(root.get_path(["Elevator", "kMotor"]).unwrap_err(), expected);
        assert_eq!(
            root.get("Elevator").unwrap().get("kMotor").unwrap_err(),
            expected
        );
        assert_eq!(
            root.attr("Elevator").unwrap().attr("kMotor").unwrap_err(),
            expected
        );
    }

    #[test]
    fn pending_keys_do_not_affect_equality() {
        let group = resolve(vec![
            Declaration::value("kTrackWidth", 0.6),
            Declaration::placeholder::<Opaque>("kGyro", "Opaque"),
        ]);
        let plain = RegistryNode::from_pairs([("kTrackWidth", 0.6)]).unwrap();
        assert_eq!(group.node(), &plain);
        assert!(plain.get("kGyro").unwrap_err().is_not_found());
    }

    #[test]
    fn dunder_names_are_skipped() {
        let group = resolve(vec![
            Declaration::value("__doc__", "hidden"),
            Declaration::value("kPort", 1),
        ]);
        assert_eq!(group.to_string(), "Drivetrain(kPort=1)");
    }

    #[test]
    fn keys_field_is_kept_and_reported() {
        let group = resolve(vec![Declaration::value("keys", [1, 2])]);
        assert!(group.node().contains("keys"));
        assert_eq!(group.diagnostics()[0].kind, DiagnosticKind::ReservedName);
        assert!(group.diagnostics()[0].to_string().contains("Constants.Drivetrain.keys"));
    }

    #[test]
    fn builtin_placeholder_defaults() {
        assert_eq!(i64::placeholder_default(), Some(LeafValue::from(0)));
        assert_eq!(f64::placeholder_default(), Some(LeafValue::from(0.0)));
        assert_eq!(bool::placeholder_default(), Some(LeafValue::from(false)));
        assert_eq!(String::placeholder_default(), Some(LeafValue::from("")));
        assert_eq!(
            Vec::<i64>::placeholder_default(),
            Some(LeafValue::Sequence(Sequence::default()))
        );
        assert_eq!(Opaque::placeholder_default(), None);
    }

    #[test]
    fn rendering_quotes_strings_and_nests_nodes() {
        let child = RegistryNode::from_pairs([("Kp", 0.5)]).unwrap();
        let group = resolve(vec![
            Declaration::value("kName", "left"),
            Declaration::value("kPID", child),
        ]);
        assert_eq!(group.to_string(), r#"Drivetrain(kName="left", kPID={"Kp": 0.5})"#);
    }
}
