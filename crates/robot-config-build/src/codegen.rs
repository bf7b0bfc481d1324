//! Rust source generation for a parsed constants file.

use std::fmt::Write;

use crate::toml_parser::{ConstantItem, ConstantsConfig, ItemKind};

const INDENT: &str = "    ";

/// Render `config` as a `constants!` invocation.
///
/// ```text
/// // @generated by robot-config-build. Do not edit.
/// ::robot_config::constants! {
///     pub mod Constants {
///         Interface {
///             kDriverControllerPort: i64 = 0;
///         }
///     }
/// }
/// ```
pub fn generate_constants_code(config: &ConstantsConfig) -> String {
    let mut out = String::new();
    out.push_str("// @generated by robot-config-build. Do not edit.\n");
    out.push_str("::robot_config::constants! {\n");
    let _ = writeln!(out, "{INDENT}pub mod {} {{", config.module_name);
    write_items(&mut out, config.items(), 2);
    let _ = writeln!(out, "{INDENT}}}");
    out.push_str("}\n");
    out
}

fn write_items(out: &mut String, items: &[ConstantItem], depth: usize) {
    let pad = INDENT.repeat(depth);
    for item in items {
        let name = &item.name;
        match &item.kind {
            ItemKind::Value { ty, literal } => {
                let _ = writeln!(out, "{pad}{name}: {ty} = {literal};");
            }
            ItemKind::Placeholder { ty } => {
                let _ = writeln!(out, "{pad}{name}: {ty};");
            }
            ItemKind::Group(children) => {
                let _ = writeln!(out, "{pad}{name} {{");
                write_items(out, children, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_groups_in_file_order() {
        let config = ConstantsConfig::from_str(
            r#"
[constants.Interface]
kDriverControllerPort = 0

[constants.Elevator]
kMotorIDs = [5, 6]

[constants.Elevator.kPIDConstants]
Kp = 0.0

[placeholders]
"Elevator.kGyro" = "MotorHandle"
"#,
        )
        .unwrap();

        let expected = "\
// @generated by robot-config-build. Do not edit.
::robot_config::constants! {
    pub mod Constants {
        Interface {
            kDriverControllerPort: i64 = 0;
        }
        Elevator {
            kMotorIDs: [i64] = [5, 6];
            kPIDConstants {
                Kp: f64 = 0.0;
            }
            kGyro: MotorHandle;
        }
    }
}
";
        assert_eq!(generate_constants_code(&config), expected);
    }

    #[test]
    fn empty_config_renders_empty_module() {
        let config = ConstantsConfig::from_str("module_name = \"Empty\"\n").unwrap();
        let code = generate_constants_code(&config);
        assert!(code.contains("pub mod Empty {\n    }"));
    }
}
