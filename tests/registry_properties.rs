//! Property tests for frozen registries, plus the canonical lookup scenarios.

use std::collections::HashSet;

use proptest::prelude::*;
use robot_config::*;

// =============================================================================
// Strategies
// =============================================================================

fn key() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,6}"
}

fn scalar() -> impl Strategy<Value = SourceValue> {
    prop_oneof![
        any::<i64>().prop_map(SourceValue::Int),
        (-1.0e6f64..1.0e6).prop_map(SourceValue::Float),
        prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY), Just(-0.0)]
            .prop_map(SourceValue::Float),
        any::<bool>().prop_map(SourceValue::Bool),
        "[a-z ]{0,8}".prop_map(SourceValue::Str),
    ]
}

fn leaf() -> impl Strategy<Value = SourceValue> {
    prop_oneof![
        3 => scalar(),
        1 => prop::collection::vec(scalar(), 0..4).prop_map(SourceValue::List),
    ]
}

/// Unsorted pairs with unique keys, in generation order.
fn mapping<S>(value: S, size: std::ops::Range<usize>) -> impl Strategy<Value = Source>
where
    S: Strategy<Value = SourceValue>,
{
    prop::collection::vec((key(), value), size).prop_map(|pairs| {
        let mut seen = HashSet::new();
        Source::from_pairs(pairs.into_iter().filter(|(k, _)| seen.insert(k.clone())))
    })
}

fn tree() -> impl Strategy<Value = SourceValue> {
    leaf().prop_recursive(3, 32, 4, |inner| mapping(inner, 0..4).prop_map(SourceValue::Map))
}

fn source() -> impl Strategy<Value = Source> {
    mapping(tree(), 0..6)
}

/// Every leaf of `src` with its full path.
fn leaves(src: &Source, prefix: &[String], out: &mut Vec<(Vec<String>, SourceValue)>) {
    for (key, value) in src.entries() {
        let SourceKey::Str(key) = key else {
            unreachable!("strategies only produce string keys");
        };
        let mut path = prefix.to_vec();
        path.push(key.clone());
        match value {
            SourceValue::Map(child) => leaves(child, &path, out),
            leaf => out.push((path, leaf.clone())),
        }
    }
}

fn expected(leaf: &SourceValue) -> Value {
    fn scalar(v: &SourceValue) -> Scalar {
        match v {
            SourceValue::Int(i) => Scalar::Int(*i),
            SourceValue::Float(f) => Scalar::Float(*f),
            SourceValue::Bool(b) => Scalar::Bool(*b),
            SourceValue::Str(s) => Scalar::Str(s.clone()),
            other => unreachable!("not a scalar: {other:?}"),
        }
    }
    match leaf {
        SourceValue::List(items) => Value::from(items.iter().map(scalar).collect::<Sequence>()),
        other => Value::from(scalar(other)),
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn every_leaf_path_reads_back_its_value(src in source()) {
        let reg = RegistryNode::new(src.clone()).unwrap();

        let mut all = Vec::new();
        leaves(&src, &[], &mut all);
        for (path, leaf) in all {
            let found = reg.get_path(Path::from(path.clone())).unwrap();
            prop_assert_eq!(found, &expected(&leaf), "at {:?}", path);
        }
    }

    #[test]
    fn mutations_are_rejected_and_content_unchanged(src in source(), name in key()) {
        let reg = RegistryNode::new(src).unwrap();
        let before = reg.clone();

        for op in Mutation::ALL {
            let err = reg.mutate(op, &name, Some(Value::from(1))).unwrap_err();
            let is_rejected =
                matches!(err, RegistryError::ImmutableViolation { op: rejected, .. } if rejected == op);
            prop_assert!(is_rejected);
        }
        prop_assert_eq!(&reg, &before);
        prop_assert_eq!(reg.to_string(), before.to_string());
    }

    #[test]
    fn two_level_paths_agree_with_chained_lookups(src in source()) {
        let reg = RegistryNode::new(src).unwrap();

        for (outer, value) in reg.items() {
            let Some(child) = value.as_node() else { continue };
            for inner in child.keys() {
                let by_path = reg.get_path([outer, inner]).unwrap();
                let chained = reg.get(outer).unwrap().get(inner).unwrap();
                let by_attr = reg.attr(outer).unwrap().attr(inner).unwrap();
                prop_assert_eq!(by_path, chained);
                prop_assert_eq!(chained, by_attr);
            }
        }
    }

    #[test]
    fn registry_equals_its_canonical_mapping(src in source()) {
        let reg = RegistryNode::new(src.clone()).unwrap();
        let canonical = Source::from(reg.clone());

        prop_assert!(reg == canonical);
        prop_assert!(reg == src);
        prop_assert!(reg == *reg.as_map());
        prop_assert_eq!(RegistryNode::new(canonical).unwrap(), reg);
    }

    #[test]
    fn keys_follow_source_order(src in source()) {
        let reg = RegistryNode::new(src.clone()).unwrap();
        let source_keys: Vec<String> = src.entries().iter().map(|(k, _)| match k {
            SourceKey::Str(s) => s.clone(),
            other => unreachable!("{other}"),
        }).collect();

        prop_assert_eq!(reg.keys().collect::<Vec<_>>(), source_keys);
        prop_assert_eq!(reg.keys().len(), reg.len());
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn interface_ports_read_through_every_notation() {
    let reg = RegistryNode::new(source! {
        "Interface" => { "kDriverControllerPort" => 0, "kManipControllerPort" => 1 },
    })
    .unwrap();

    assert_eq!(reg.get_path(["Interface", "kDriverControllerPort"]).unwrap(), &Value::from(0));
    assert_eq!(
        reg.attr("Interface").unwrap().attr("kManipControllerPort").unwrap().as_int(),
        Some(1)
    );

    let err = reg
        .set_attr("Interface", Value::from(RegistryNode::empty()))
        .unwrap_err();
    assert!(err.is_immutable_violation());
    assert_eq!(reg.get_as::<i64>(["Interface", "kDriverControllerPort"]).unwrap(), 0);
}

#[test]
fn nan_registry_equals_itself_and_its_canonical_mapping() {
    let reg = RegistryNode::new(source! { "kLimit" => (f64::NAN), "kMax" => (f64::INFINITY) })
        .unwrap();
    let canonical = Source::from(reg.clone());

    assert_eq!(reg, reg.clone());
    assert!(reg == canonical);
    assert_eq!(reg.to_string(), r#"{"kLimit": NaN, "kMax": inf}"#);
}

#[test]
fn non_string_key_produces_no_registry() {
    let result = RegistryNode::new(Source::new().entry(1, "x"));
    assert!(matches!(result, Err(RegistryError::MalformedKey { .. })));
}

#[test]
fn lists_are_fixed_sequences() {
    let reg = RegistryNode::new(source! { "ids" => [5, 6, 7] }).unwrap();

    let ids = reg.get("ids").unwrap().as_sequence().unwrap();
    assert_eq!(ids.as_slice(), [Scalar::Int(5), Scalar::Int(6), Scalar::Int(7)]);
    assert_eq!(ids, &Sequence::new([5, 6, 7]));

    let err = ids.set(0, 9).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::ImmutableViolation { op: Mutation::SetItem, .. }
    ));
    assert_eq!(reg.get_as::<Vec<i64>>("ids").unwrap(), [5, 6, 7]);
}

#[test]
fn missing_segment_is_named() {
    let reg = RegistryNode::new(source! { "a" => { "b" => 1 } }).unwrap();

    let err = reg.get_path(["a", "z"]).unwrap_err();
    match &err {
        RegistryError::NotFound { segment, depth, .. } => {
            assert_eq!(segment, "z");
            assert_eq!(*depth, 1);
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(err.unconsumed().unwrap(), ["z"]);
}

#[test]
fn path_through_a_leaf_is_not_found() {
    let reg = RegistryNode::new(source! { "a" => { "b" => 1 } }).unwrap();
    let err = reg.get_path(["a", "b", "c"]).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.unconsumed().unwrap(), ["c"]);
}

#[test]
fn empty_path_is_rejected() {
    let reg = RegistryNode::new(source! { "a" => 1 }).unwrap();
    assert_eq!(
        reg.get_path(Vec::<String>::new()).unwrap_err(),
        RegistryError::EmptyPath
    );
}

#[test]
fn keyword_overrides_layer_on_positional_mapping() {
    let positional = Source::from_pairs([("kP", 0.1), ("kI", 0.0)]);
    let reg = RegistryNode::new(positional.extend_with(source! { "kP" => 0.5, "kD" => 0.01 }))
        .unwrap();

    assert_eq!(reg.keys().collect::<Vec<_>>(), ["kP", "kI", "kD"]);
    assert_eq!(reg.get_as::<f64>("kP").unwrap(), 0.5);
}

#[test]
fn json_and_toml_sources_build_equal_registries() {
    let json: Source = serde_json::from_str(
        r#"{"Elevator": {"kMotorIDs": [5, 6], "kPIDConstants": {"Kp": 0, "Ki": 0, "Kd": 0}}}"#,
    )
    .unwrap();
    let toml: Source = toml::from_str(
        r#"
[Elevator]
kMotorIDs = [5, 6]
kPIDConstants = { Kp = 0, Ki = 0, Kd = 0 }
"#,
    )
    .unwrap();

    let from_json = RegistryNode::new(json).unwrap();
    let from_toml = RegistryNode::new(toml).unwrap();
    pretty_assertions::assert_eq!(from_json, from_toml);
    assert_eq!(from_json.get_as::<i64>(["Elevator", "kPIDConstants", "Kd"]).unwrap(), 0);
}
