//! C FFI layer for the overlay renderer.
//!
//! Provides an opaque handle-based API for C/C++ consumers such as a
//! GStreamer cairooverlay draw callback. The generated C header is written
//! to `include/horizon_attitude.h` by cbindgen.

use crate::error::LastError;
use crate::poller::AttitudePoller;
use crate::projector;
use crate::sensor::SensorConfig;
use crate::types::{Attitude, CameraCalibration, ReportVariant, ScreenLine, ANGLE_LINE_SETTINGS};
use crate::{AttitudeError, Result};
use std::ffi::{c_char, c_int};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque handle to a running attitude subsystem.
pub struct HzAttitudeSubsystem(AttitudePoller);

/// Longest label text including the terminating NUL.
pub const HZ_LABEL_LEN: usize = 8;

/// One projected ladder line in C-compatible layout.
#[repr(C)]
pub struct HzScreenLine {
    pub angle: i32,
    /// Rotation about `center`, radians, clockwise positive.
    pub rotation_rad: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Vertical translation applied after the rotation.
    pub y_offset: f64,
    pub half_width: f64,
    /// Absolute line ends [x0, y0, x1, y1].
    pub endpoints: [f64; 4],
    pub has_label: bool,
    /// Null-terminated label text.
    pub label_text: [c_char; HZ_LABEL_LEN],
    /// Label position in the rotated line frame.
    pub label_x: f64,
    pub label_y: f64,
}

fn str_to_fixed<const N: usize>(s: &str) -> [c_char; N] {
    let mut buf = [0 as c_char; N];
    let bytes = s.as_bytes();
    let len = bytes.len().min(N - 1);
    for (i, &b) in bytes[..len].iter().enumerate() {
        buf[i] = b as c_char;
    }
    buf
}

impl From<&ScreenLine> for HzScreenLine {
    fn from(line: &ScreenLine) -> Self {
        let [[x0, y0], [x1, y1]] = line.endpoints();
        let (label_text, label_x, label_y) = match &line.label {
            Some(label) => (str_to_fixed(&label.text), label.x, label.y),
            None => ([0 as c_char; HZ_LABEL_LEN], 0.0, 0.0),
        };
        HzScreenLine {
            angle: line.angle,
            rotation_rad: line.rotation_rad,
            center_x: line.center[0],
            center_y: line.center[1],
            y_offset: line.y_offset,
            half_width: line.half_width,
            endpoints: [x0, y0, x1, y1],
            has_label: line.label.is_some(),
            label_text,
            label_x,
            label_y,
        }
    }
}

#[cfg(target_os = "linux")]
fn start_subsystem(config: SensorConfig) -> Result<AttitudePoller> {
    crate::sensor::AttitudeSensor::open(config)?.start_polling()
}

#[cfg(not(target_os = "linux"))]
fn start_subsystem(_config: SensorConfig) -> Result<AttitudePoller> {
    Err(AttitudeError::TransportUnavailable(
        "I2C transport is only available on Linux".into(),
    ))
}

fn into_handle(result: Result<AttitudePoller>) -> *mut HzAttitudeSubsystem {
    match result {
        Ok(poller) => {
            LAST_ERROR.clear();
            Box::into_raw(Box::new(HzAttitudeSubsystem(poller)))
        }
        Err(e) => {
            log::error!("Attitude subsystem failed to start: {}", e);
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Open the sensor with `HORIZON_*` environment settings and start polling.
/// Returns NULL on error (check hz_last_error()).
#[no_mangle]
pub extern "C" fn hz_initialize() -> *mut HzAttitudeSubsystem {
    into_handle(start_subsystem(SensorConfig::from_env()))
}

/// Open the sensor with explicit settings and start polling.
/// `report_id`: 0x05 fused rotation vector, 0x08 game rotation vector.
/// Returns NULL on error.
#[no_mangle]
pub extern "C" fn hz_initialize_with(
    bus: u8,
    address: u16,
    report_id: u8,
    report_interval_us: u32,
) -> *mut HzAttitudeSubsystem {
    let Some(variant) = ReportVariant::from_report_id(report_id) else {
        LAST_ERROR.set(&AttitudeError::InvalidConfig(format!(
            "unsupported rotation report 0x{:02x}",
            report_id
        )));
        return std::ptr::null_mut();
    };
    let config = SensorConfig {
        bus,
        address,
        variant,
        report_interval_us,
        remap: variant.default_remap(),
        ..SensorConfig::default()
    };
    into_handle(start_subsystem(config))
}

/// Copy the current (possibly stale) attitude into `out`.
/// Returns 0 on success, -1 on a null argument.
///
/// # Safety
/// `subsystem` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn hz_get_attitude(
    subsystem: *const HzAttitudeSubsystem,
    out: *mut Attitude,
) -> c_int {
    if subsystem.is_null() || out.is_null() {
        return -1;
    }
    let subsystem = &*subsystem;
    out.write(subsystem.0.attitude());
    0
}

/// Camera calibration of the forward camera.
#[no_mangle]
pub extern "C" fn hz_default_calibration() -> CameraCalibration {
    CameraCalibration::default()
}

/// Project the default horizon ladder.
///
/// Writes up to `max` lines into `out` and returns how many the ladder has,
/// or -1 on error. With a null `out` only the count is returned.
///
/// # Safety
/// `attitude` and `calibration` must be valid pointers. `out` must point to
/// at least `max` `HzScreenLine` elements, or be null.
#[no_mangle]
pub unsafe extern "C" fn hz_project_horizon_lines(
    attitude: *const Attitude,
    calibration: *const CameraCalibration,
    out: *mut HzScreenLine,
    max: c_int,
) -> c_int {
    if attitude.is_null() || calibration.is_null() {
        return -1;
    }
    let calibration = &*calibration;
    if let Err(e) = calibration.validate() {
        LAST_ERROR.set(&e);
        return -1;
    }

    let lines = projector::project_horizon_lines(&*attitude, calibration, ANGLE_LINE_SETTINGS);
    if !out.is_null() {
        let count = lines.len().min(max.max(0) as usize);
        for (i, line) in lines.iter().take(count).enumerate() {
            out.add(i).write(HzScreenLine::from(line));
        }
    }
    lines.len() as c_int
}

/// Stop polling and free the subsystem.
///
/// # Safety
/// `subsystem` must be a pointer returned by `hz_initialize*`, or null.
#[no_mangle]
pub unsafe extern "C" fn hz_shutdown(subsystem: *mut HzAttitudeSubsystem) {
    if !subsystem.is_null() {
        drop(Box::from_raw(subsystem));
    }
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next horizon_attitude API call.
#[no_mangle]
pub extern "C" fn hz_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
