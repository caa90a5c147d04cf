//! # horizon_attitude - BNO08x attitude and horizon ladder overlay
//!
//! Reads the rotation vector from a BNO08x over I2C and turns it into the
//! geometry of a pitch/roll horizon ladder for a camera overlay:
//! - SHTP frame scanning and Q14 quaternion decoding
//! - Quaternion to pitch/roll/heading with gimbal-lock handling and a
//!   configurable sensor-to-camera remap
//! - A background poller publishing last-known-good attitude
//! - Ladder projection and a C FFI for overlay renderers
//!
//! ## Quick Start
//! ```no_run
//! use horizon_attitude::{projector, AttitudeSensor, CameraCalibration, SensorConfig};
//! use horizon_attitude::ANGLE_LINE_SETTINGS;
//!
//! let sensor = AttitudeSensor::open(SensorConfig::from_env()).unwrap();
//! let poller = sensor.start_polling().unwrap();
//! let attitude = poller.handle();
//!
//! // In the render callback:
//! let lines = projector::project_horizon_lines(
//!     &attitude.load(),
//!     &CameraCalibration::default(),
//!     ANGLE_LINE_SETTINGS,
//! );
//! println!("{} ladder lines", lines.len());
//! ```

pub mod error;
pub mod types;
pub mod protocol;
pub mod transport;
pub mod solver;
pub mod sensor;
pub mod poller;
pub mod projector;
pub mod ffi;

pub use error::AttitudeError;
pub use types::*;
pub use transport::BusTransport;
#[cfg(target_os = "linux")]
pub use transport::I2cTransport;
pub use solver::{AttitudeCell, OrientationSolver};
pub use sensor::{AttitudeSensor, SensorConfig};
pub use poller::AttitudePoller;

/// Result type alias for attitude subsystem operations.
pub type Result<T> = std::result::Result<T, AttitudeError>;
