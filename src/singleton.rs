//! Process-wide single instances.
//!
//! A subsystem that must exist exactly once keeps its constructor and at
//! least one field private, and hands out `&'static Self` through
//! [`SingletonBinding::instance`]. Outside code has no way to build a second
//! value.
//!
//! ```
//! mod drivetrain {
//!     use robot_config::bind_singleton;
//!
//!     pub struct Drivetrain {
//!         track_width: f64,
//!     }
//!
//!     impl Drivetrain {
//!         fn new() -> Self {
//!             Self { track_width: 0.6 }
//!         }
//!
//!         pub fn track_width(&self) -> f64 {
//!             self.track_width
//!         }
//!     }
//!
//!     bind_singleton!(Drivetrain, Drivetrain::new);
//! }
//!
//! use robot_config::SingletonBinding;
//! use drivetrain::Drivetrain;
//!
//! assert!(std::ptr::eq(Drivetrain::instance(), Drivetrain::instance()));
//! assert_eq!(Drivetrain::instance().track_width(), 0.6);
//! ```
//!
//! A struct literal outside the owning module does not compile:
//!
//! ```compile_fail
//! mod drivetrain {
//!     pub struct Drivetrain {
//!         track_width: f64,
//!     }
//!
//!     impl Drivetrain {
//!         fn new() -> Self {
//!             Self { track_width: 0.6 }
//!         }
//!     }
//!
//!     robot_config::bind_singleton!(Drivetrain, Drivetrain::new);
//! }
//!
//! let second = drivetrain::Drivetrain { track_width: 9.9 };
//! ```
//!
//! Subsystems whose construction reads configuration use
//! [`bind_try_singleton!`](crate::bind_try_singleton), so a missing value
//! reaches the caller as an error instead of a half-built instance:
//!
//! ```
//! mod elevator {
//!     use robot_config::{bind_try_singleton, RegistryError, RegistryNode};
//!
//!     pub struct Elevator {
//!         kp: f64,
//!     }
//!
//!     impl Elevator {
//!         fn from_constants() -> Result<Self, RegistryError> {
//!             let reg = RegistryNode::from_pairs([("Kp", 0.8)])?;
//!             Ok(Self { kp: reg.get_as("Kp")? })
//!         }
//!
//!         pub fn kp(&self) -> f64 {
//!             self.kp
//!         }
//!     }
//!
//!     bind_try_singleton!(Elevator, RegistryError, Elevator::from_constants);
//! }
//!
//! use robot_config::TrySingletonBinding;
//!
//! let elevator = elevator::Elevator::try_instance()?;
//! assert_eq!(elevator.kp(), 0.8);
//! # Ok::<(), robot_config::RegistryError>(())
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

/// A lazily built value, created at most once.
pub struct Singleton<T> {
    cell: OnceLock<T>,
    init: fn() -> T,
}

impl<T> Singleton<T> {
    pub const fn new(init: fn() -> T) -> Self {
        Self {
            cell: OnceLock::new(),
            init,
        }
    }

    /// The instance, built on first call. Concurrent first calls block until
    /// one initialiser finishes; all callers see the same value.
    pub fn get(&self) -> &T {
        self.cell.get_or_init(|| {
            tracing::debug!(ty = type_name::<T>(), "initialising singleton");
            (self.init)()
        })
    }

    /// The instance if it has already been built.
    pub fn try_get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for Singleton<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Singleton")
            .field("value", &self.cell.get())
            .finish_non_exhaustive()
    }
}

/// A lazily built value whose construction can fail.
///
/// A failed initialisation leaves the cell empty and hands the error to the
/// caller; the next call tries again. Initialisers never run concurrently,
/// so at most one value is ever built.
pub struct TrySingleton<T, E> {
    cell: OnceLock<T>,
    init_lock: Mutex<()>,
    init: fn() -> Result<T, E>,
}

impl<T, E> TrySingleton<T, E> {
    pub const fn new(init: fn() -> Result<T, E>) -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
            init,
        }
    }

    /// The instance, built on the first successful call.
    pub fn get(&self) -> Result<&T, E> {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        tracing::debug!(ty = type_name::<T>(), "initialising singleton");
        let value = (self.init)().inspect_err(|_| {
            tracing::debug!(ty = type_name::<T>(), "singleton initialisation failed");
        })?;
        Ok(self.cell.get_or_init(|| value))
    }

    /// The instance if it has already been built.
    pub fn try_get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: fmt::Debug, E> fmt::Debug for TrySingleton<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrySingleton")
            .field("value", &self.cell.get())
            .finish_non_exhaustive()
    }
}

/// Types reachable only through one shared instance.
pub trait SingletonBinding: Sync + 'static {
    fn instance() -> &'static Self;
}

/// Implement [`SingletonBinding`] for `$ty` using `$init` as the only
/// constructor call site.
///
/// Invoke it in the module that owns the private constructor.
#[macro_export]
macro_rules! bind_singleton {
    ($ty:ty, $init:expr) => {
        impl $crate::SingletonBinding for $ty {
            fn instance() -> &'static Self {
                static INSTANCE: $crate::Singleton<$ty> = $crate::Singleton::new($init);
                INSTANCE.get()
            }
        }
    };
}

/// Types reachable only through one shared instance whose construction can
/// fail.
pub trait TrySingletonBinding: Sync + 'static {
    type Error;

    fn try_instance() -> Result<&'static Self, Self::Error>;
}

/// Implement [`TrySingletonBinding`] for `$ty` with error type `$err`, using
/// the fallible `$init` as the only constructor call site.
#[macro_export]
macro_rules! bind_try_singleton {
    ($ty:ty, $err:ty, $init:expr) => {
        impl $crate::TrySingletonBinding for $ty {
            type Error = $err;

            fn try_instance() -> ::std::result::Result<&'static Self, $err> {
                static INSTANCE: $crate::TrySingleton<$ty, $err> = $crate::TrySingleton::new($init);
                INSTANCE.get()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Elevator {
        motor_ids: [i64; 2],
    }

    impl Elevator {
        fn new() -> Self {
            BUILDS.fetch_add(1, Ordering::SeqCst);
            Self { motor_ids: [5, 6] }
        }
    }

    crate::bind_singleton!(Elevator, Elevator::new);

    #[test]
    fn singleton_is_built_lazily_once() {
        static CELL: Singleton<Vec<i64>> = Singleton::new(|| vec![1, 2, 3]);

        assert!(!CELL.is_initialized());
        assert!(CELL.try_get().is_none());
        assert_eq!(CELL.get(), &[1, 2, 3]);
        assert!(CELL.is_initialized());
        assert!(std::ptr::eq(CELL.get(), CELL.try_get().unwrap()));
    }

    #[test]
    fn concurrent_first_access_yields_one_instance() {
        let addresses: Vec<usize> = (0..8)
            .map(|_| std::thread::spawn(|| Elevator::instance() as *const Elevator as usize))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(Elevator::instance().motor_ids, [5, 6]);
    }

    // =========================================================================
    // Fallible construction
    // =========================================================================

    #[test]
    fn failed_initialisation_is_reported_and_retried() {
        static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);
        static CELL: TrySingleton<i64, String> = TrySingleton::new(|| {
            match ATTEMPTS.fetch_add(1, Ordering::SeqCst) {
                0 => Err("gyro port missing".to_owned()),
                _ => Ok(7),
            }
        });

        assert_eq!(CELL.get(), Err("gyro port missing".to_owned()));
        assert!(!CELL.is_initialized());

        assert_eq!(CELL.get(), Ok(&7));
        assert_eq!(CELL.get(), Ok(&7));
        assert_eq!(ATTEMPTS.load(Ordering::SeqCst), 2);
    }

    static WRIST_BUILDS: AtomicUsize = AtomicUsize::new(0);

    struct Wrist {
        angle: f64,
    }

    impl Wrist {
        fn from_constants() -> Result<Self, crate::RegistryError> {
            WRIST_BUILDS.fetch_add(1, Ordering::SeqCst);
            let reg = crate::RegistryNode::from_pairs([("kAngle", 0.25)])?;
            Ok(Self {
                angle: reg.get_as("kAngle")?,
            })
        }
    }

    crate::bind_try_singleton!(Wrist, crate::RegistryError, Wrist::from_constants);

    #[test]
    fn concurrent_fallible_access_builds_once() {
        let addresses: Vec<usize> = (0..8)
            .map(|_| {
                std::thread::spawn(|| Wrist::try_instance().unwrap() as *const Wrist as usize)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(WRIST_BUILDS.load(Ordering::SeqCst), 1);
        assert_eq!(Wrist::try_instance().unwrap().angle, 0.25);
    }

    #[derive(Debug)]
    struct Arm;

    crate::bind_try_singleton!(Arm, crate::RegistryError, || {
        crate::RegistryNode::empty().get("kMissing").map(|_| Arm)
    });

    #[test]
    fn configuration_errors_reach_the_caller() {
        assert!(Arm::try_instance().unwrap_err().is_not_found());
    }
}
