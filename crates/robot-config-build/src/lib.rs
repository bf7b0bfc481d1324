//! Build-time utilities for robot-config.
//!
//! This crate provides tools for:
//! - Parsing `constants.toml` files into a validated declaration tree
//! - Generating Rust code with the `constants!` macro
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("constants.rs");
//!     robot_config_build::generate("constants.toml", out)
//!         .expect("Failed to generate constants");
//! }
//!
//! // src/lib.rs
//! include!(concat!(env!("OUT_DIR"), "/constants.rs"));
//! ```
//!
//! # File format
//!
//! ```toml
//! module_name = "Constants"
//!
//! [constants.Elevator]
//! kMotorIDs = [5, 6]
//! kPIDConstants = { Kp = 0.0, Ki = 0.0, Kd = 0.0 }
//!
//! [placeholders]
//! "Elevator.kGyroIDs" = "[i64]"
//! ```
//!
//! Keys must be Rust identifiers and arrays must be homogeneous. Placeholders
//! are reported as `cargo:warning` lines since their values are only known
//! once the generated groups resolve.

mod codegen;
mod toml_parser;

pub use codegen::generate_constants_code;
pub use toml_parser::{ConstantItem, ConstantsConfig, ItemKind};

use robot_config::RegistryError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main entry point for build.rs integration.
///
/// Reads the constants file and writes the generated `constants!`
/// invocation to `output_path`.
///
/// # Errors
///
/// Returns an error if:
/// - the constants file cannot be read or parsed
/// - a key, array or placeholder fails validation
/// - the output file cannot be written
pub fn generate(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), BuildError> {
    let config_path = config_path.as_ref();
    let output_path = output_path.as_ref();

    println!("cargo:rerun-if-changed={}", config_path.display());

    let config = ConstantsConfig::from_file(config_path)?;
    for (path, ty) in config.placeholders() {
        println!(
            "cargo:warning=robot-config: {}.{path} is declared as `{ty}` without a value",
            config.module_name
        );
    }

    let code = generate_constants_code(&config);
    std::fs::write(output_path, code).map_err(|source| BuildError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Errors that can occur during generation.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to read the config or write the output
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to parse the TOML
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Well-formed TOML that cannot become constants
    #[error("Validation error: {0}")]
    Validation(String),
    /// The constant tree was rejected by the registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}
