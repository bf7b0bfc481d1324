//! Integration tests for robot-config-build.

use robot_config_build::{generate, BuildError, ConstantsConfig};
use std::fs;
use tempfile::TempDir;

/// Create a temp directory with constants.toml
fn setup_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("constants.toml");
    fs::write(&config_path, content).unwrap();
    (dir, config_path)
}

const ROBOT: &str = r#"
[constants.Interface]
kDriverControllerPort = 0
kManipControllerPort = 1

[constants.Drivetrain]
kRightMotorIDs = [1, 2]
kLeftMotorIDs = [3, 4]

[constants.Elevator]
kMotorIDs = [5, 6]
kPIDConstants = { Kp = 0.0, Ki = 0.0, Kd = 0.0 }

[placeholders]
"Drivetrain.kGyroIDs" = "[i64]"
"#;

#[test]
fn generate_writes_constants_invocation() {
    let (dir, config_path) = setup_config(ROBOT);
    let output_path = dir.path().join("generated.rs");

    generate(&config_path, &output_path).unwrap();

    let code = fs::read_to_string(&output_path).unwrap();
    assert!(code.starts_with("// @generated"));
    assert!(code.contains("::robot_config::constants! {"));
    assert!(code.contains("pub mod Constants {"));
    assert!(code.contains("kRightMotorIDs: [i64] = [1, 2];"));
    assert!(code.contains("kGyroIDs: [i64];"));
    assert!(code.contains("kPIDConstants {"));
}

#[test]
fn generated_code_follows_file_order() {
    let (dir, config_path) = setup_config(ROBOT);
    let output_path = dir.path().join("generated.rs");

    generate(&config_path, &output_path).unwrap();
    let code = fs::read_to_string(&output_path).unwrap();

    let interface = code.find("Interface {").unwrap();
    let drivetrain = code.find("Drivetrain {").unwrap();
    let elevator = code.find("Elevator {").unwrap();
    assert!(interface < drivetrain && drivetrain < elevator);
}

#[test]
fn regenerating_is_deterministic() {
    let (dir, config_path) = setup_config(ROBOT);
    let first = dir.path().join("first.rs");
    let second = dir.path().join("second.rs");

    generate(&config_path, &first).unwrap();
    generate(&config_path, &second).unwrap();

    assert_eq!(
        fs::read_to_string(first).unwrap(),
        fs::read_to_string(second).unwrap()
    );
}

#[test]
fn custom_module_name_is_used() {
    let (dir, config_path) = setup_config(
        r#"
module_name = "RobotMap"

[constants]
kLoopPeriod = 0.02
"#,
    );
    let output_path = dir.path().join("generated.rs");

    generate(&config_path, &output_path).unwrap();
    let code = fs::read_to_string(&output_path).unwrap();
    assert!(code.contains("pub mod RobotMap {"));
    assert!(code.contains("kLoopPeriod: f64 = 0.02;"));
}

#[test]
fn missing_config_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = generate(dir.path().join("absent.toml"), dir.path().join("out.rs"));

    match result.unwrap_err() {
        BuildError::Io { path, .. } => assert!(path.ends_with("absent.toml")),
        other => panic!("Expected Io, got: {:?}", other),
    }
}

#[test]
fn invalid_config_writes_nothing() {
    let (dir, config_path) = setup_config(
        r#"
[constants]
kIDs = [1, 2.5]
"#,
    );
    let output_path = dir.path().join("generated.rs");

    let err = generate(&config_path, &output_path).unwrap_err();
    assert!(matches!(err, BuildError::Validation(_)));
    assert!(!output_path.exists());
}

#[test]
fn malformed_toml_is_parse_error() {
    let (_dir, config_path) = setup_config("[constants\nkPort = 0\n");
    assert!(matches!(
        ConstantsConfig::from_file(&config_path),
        Err(BuildError::Parse(_))
    ));
}

#[test]
fn registry_view_matches_file() {
    let (_dir, config_path) = setup_config(ROBOT);
    let config = ConstantsConfig::from_file(&config_path).unwrap();

    let ids: Vec<i64> = config
        .registry()
        .get_as(["Drivetrain", "kLeftMotorIDs"])
        .unwrap();
    assert_eq!(ids, [3, 4]);

    // the placeholder has no value
    assert_eq!(config.len(), 8);
    assert!(config.registry().get_path(["Drivetrain", "kGyroIDs"]).is_err());
}
