//! Horizon ladder geometry for the camera overlay.
//!
//! All output is in pixels with the origin at the top-left of the frame
//! and y pointing down. Rotations follow the screen convention, clockwise
//! positive.

use crate::types::{AngleLineSpec, Attitude, CameraCalibration, ScreenLine, TextLabel};

/// Label start relative to the right end of its line.
pub const LABEL_OFFSET_X: f64 = 10.0;
/// Label baseline below the line.
pub const LABEL_OFFSET_Y: f64 = 7.0;

pub const DEBUG_TEXT_X: f64 = 20.0;
/// Baselines of the pitch, roll and yaw readouts, measured up from the bottom edge.
pub const DEBUG_TEXT_BOTTOM_OFFSETS: [f64; 3] = [70.0, 45.0, 20.0];

/// Pixels per degree of pitch.
pub fn height_per_degree(calibration: &CameraCalibration) -> f64 {
    calibration.height as f64 / calibration.vertical_fov_deg
}

/// Vertical shift of the horizon for the current attitude, in pixels.
///
/// The camera's fixed tilt-up only acts on the vertical axis when the
/// boat is level, so it is scaled by cos(roll).
pub fn vertical_pitch_offset(attitude: &Attitude, calibration: &CameraCalibration) -> f64 {
    let roll_rad = attitude.roll.to_radians();
    (attitude.pitch + calibration.vertical_mount_offset_deg * roll_rad.cos())
        * height_per_degree(calibration)
}

/// Project every ladder rung for the current attitude.
///
/// `calibration` is expected to have passed [`CameraCalibration::validate`].
pub fn project_horizon_lines(
    attitude: &Attitude,
    calibration: &CameraCalibration,
    table: &[AngleLineSpec],
) -> Vec<ScreenLine> {
    let per_degree = height_per_degree(calibration);
    let pitch_offset = vertical_pitch_offset(attitude, calibration);
    let center = [
        calibration.width as f64 / 2.0,
        calibration.height as f64 / 2.0,
    ];
    // Screen rotation is clockwise, physical roll counter-clockwise.
    let rotation_rad = -attitude.roll.to_radians();

    table
        .iter()
        .map(|rung| {
            let half_width = calibration.width as f64 * rung.width_ratio / 2.0;
            let label = rung.display_text.then(|| TextLabel {
                text: rung.angle.to_string(),
                x: half_width + LABEL_OFFSET_X,
                y: LABEL_OFFSET_Y,
            });
            ScreenLine {
                angle: rung.angle,
                rotation_rad,
                center,
                y_offset: pitch_offset - rung.angle as f64 * per_degree,
                half_width,
                label,
            }
        })
        .collect()
}

impl ScreenLine {
    /// Map a point in this line's frame (origin at the line midpoint,
    /// x along the line) to absolute screen coordinates.
    pub fn to_screen(&self, x: f64, y: f64) -> [f64; 2] {
        let (sin, cos) = self.rotation_rad.sin_cos();
        let y = y + self.y_offset;
        [
            self.center[0] + x * cos - y * sin,
            self.center[1] + x * sin + y * cos,
        ]
    }

    /// Left and right ends of the line on screen.
    pub fn endpoints(&self) -> [[f64; 2]; 2] {
        [
            self.to_screen(-self.half_width, 0.0),
            self.to_screen(self.half_width, 0.0),
        ]
    }

    /// Screen position of the label baseline start, if the line has one.
    pub fn label_anchor(&self) -> Option<[f64; 2]> {
        self.label.as_ref().map(|l| self.to_screen(l.x, l.y))
    }
}

/// Fixed, non-rotating numeric readout in the lower-left corner.
pub fn debug_readout(attitude: &Attitude, calibration: &CameraCalibration) -> [TextLabel; 3] {
    let bottom = calibration.height as f64;
    let [pitch_y, roll_y, yaw_y] = DEBUG_TEXT_BOTTOM_OFFSETS.map(|dy| bottom - dy);
    [
        TextLabel {
            text: format!("Pitch: {:.6}", attitude.pitch),
            x: DEBUG_TEXT_X,
            y: pitch_y,
        },
        TextLabel {
            text: format!("Roll:  {:.6}", attitude.roll),
            x: DEBUG_TEXT_X,
            y: roll_y,
        },
        TextLabel {
            text: format!("Yaw:   {:.6}", attitude.heading),
            x: DEBUG_TEXT_X,
            y: yaw_y,
        },
    ]
}
