//! Robot constants declared with `constants!`, read by a singleton subsystem.
//!
//! Run with `RUST_LOG=debug` to see group resolution and singleton setup.

use robot_config::{
    constants, source, ConstantGroup, ImmutabilityGuard, LeafValue, Placeholder, RegistryError,
    RegistryNode, TrySingletonBinding, Value,
};

/// Stand-in for a hardware gyro handle; defaults to CAN port 0.
pub struct GyroHandle;

impl Placeholder for GyroHandle {
    fn placeholder_default() -> Option<LeafValue> {
        Some(LeafValue::from(0))
    }
}

constants! {
    pub mod Constants {
        Interface {
            kDriverControllerPort: i64 = 0;
            kManipControllerPort: i64 = 1;
        }
        Drivetrain {
            kLeftMotorIDs: [i64] = [3, 4];
            kRightMotorIDs: [i64] = [1, 2];
            kGyro: GyroHandle;
        }
        Elevator {
            kMotorIDs: [i64] = [5, 6];
            kPIDConstants {
                Kp: f64 = 0.8;
                Ki: f64 = 0.0;
                Kd: f64 = 0.05;
            }
        }
    }
}

mod subsystems {
    use super::Constants;
    use robot_config::{bind_try_singleton, ConstantGroup, RegistryError};

    /// The elevator exists exactly once; `Elevator::try_instance()` is the only way in.
    pub struct Elevator {
        motor_ids: Vec<i64>,
        gains: (f64, f64, f64),
    }

    impl Elevator {
        pub fn motor_ids(&self) -> &[i64] {
            &self.motor_ids
        }

        pub fn gains(&self) -> (f64, f64, f64) {
            self.gains
        }

        fn from_constants() -> Result<Self, RegistryError> {
            use Constants::Elevator::Group as Config;
            Ok(Self {
                motor_ids: Config::get_as("kMotorIDs")?,
                gains: (
                    Config::get_as(["kPIDConstants", "Kp"])?,
                    Config::get_as(["kPIDConstants", "Ki"])?,
                    Config::get_as(["kPIDConstants", "Kd"])?,
                ),
            })
        }
    }

    bind_try_singleton!(Elevator, RegistryError, Elevator::from_constants);
}

fn main() -> Result<(), RegistryError> {
    tracing_subscriber::fmt::init();

    // Refuse to start with an incomplete configuration.
    Constants::Group::validate()?;
    for diagnostic in Constants::Group::diagnostics() {
        println!("diagnostic: {diagnostic}");
    }

    // Declared groups: consts at compile time, lookups at runtime.
    println!("driver port (const): {}", Constants::Interface::kDriverControllerPort);
    println!("{}", Constants::Interface::Group);
    println!("{}", Constants::Elevator::kPIDConstants::Group);

    let kp: f64 = Constants::Group::get_as(["Elevator", "kPIDConstants", "Kp"])?;
    println!("Elevator.kPIDConstants.Kp = {kp}");

    // Ad hoc registries built from a literal mapping.
    let overrides = RegistryNode::new(source! {
        "Interface" => { "kDriverControllerPort" => 2 },
    })?;
    println!("override: {overrides}");

    if let Err(err) = overrides.set_attr("Interface", Value::from(RegistryNode::empty())) {
        println!("rejected: {err}");
    }

    // One elevator, however many callers.
    let elevator = subsystems::Elevator::try_instance()?;
    println!(
        "elevator motors {:?} gains {:?} (same instance: {})",
        elevator.motor_ids(),
        elevator.gains(),
        std::ptr::eq(elevator, subsystems::Elevator::try_instance()?)
    );

    Ok(())
}
