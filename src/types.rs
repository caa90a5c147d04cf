use std::str::FromStr;

/// Unit quaternion decoded from a rotation-vector report.
///
/// Components are passed through exactly as the sensor reported them;
/// nothing here re-normalizes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Euclidean norm, useful for spotting transport corruption.
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

/// Camera-frame attitude in degrees.
///
/// `heading` is in [0, 360), `pitch` in [-90, 90]. `roll` has no hard bound
/// once the mount offset has been applied.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    pub pitch: f64,
    pub roll: f64,
    pub heading: f64,
}

/// Which SH-2 rotation report the sensor is asked to produce.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportVariant {
    /// Magnetometer-fused rotation vector. Absolute heading, subject to
    /// magnetic interference.
    #[default]
    RotationVector = 0x05,
    /// Gyro + accelerometer only ("game" rotation vector). Relative yaw that
    /// drifts, but no magnetic jumps.
    GameRotationVector = 0x08,
}

impl ReportVariant {
    /// Report id byte used both on the wire and in the enable command.
    pub fn report_id(self) -> u8 {
        self as u8
    }

    pub fn from_report_id(id: u8) -> Option<Self> {
        match id {
            0x05 => Some(Self::RotationVector),
            0x08 => Some(Self::GameRotationVector),
            _ => None,
        }
    }

    /// Word order of the quaternion fields inside the 8-byte payload.
    pub fn field_order(self) -> FieldOrder {
        match self {
            // Both SH-2 rotation reports carry i, j, k, real.
            Self::RotationVector => FieldOrder::IJKR,
            Self::GameRotationVector => FieldOrder::IJKR,
        }
    }

    /// Sensor-to-camera remap for the forward camera mount.
    pub fn default_remap(self) -> MountRemap {
        match self {
            Self::RotationVector => MountRemap::FORWARD_CAMERA,
            // Game yaw is relative, so the same offsets only rotate the origin.
            Self::GameRotationVector => MountRemap::FORWARD_CAMERA,
        }
    }
}

impl FromStr for ReportVariant {
    type Err = crate::AttitudeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rotation" | "fused" | "rotation_vector" | "0x05" | "5" => Ok(Self::RotationVector),
            "game" | "gaming" | "game_rotation_vector" | "0x08" | "8" => {
                Ok(Self::GameRotationVector)
            }
            other => Err(crate::AttitudeError::InvalidConfig(format!(
                "unknown rotation report '{}' (supported: rotation|game)",
                other
            ))),
        }
    }
}

/// Position (in 16-bit words) of each quaternion component in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOrder {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub w: usize,
}

impl FieldOrder {
    /// i, j, k, real.
    pub const IJKR: FieldOrder = FieldOrder {
        x: 0,
        y: 1,
        z: 2,
        w: 3,
    };
}

/// Linear remap from sensor-frame Euler angles to camera-frame angles:
/// `out = offset + sign * angle` per axis. Pitch has no offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MountRemap {
    pub pitch_sign: f64,
    pub roll_sign: f64,
    pub roll_offset_deg: f64,
    pub heading_sign: f64,
    pub heading_offset_deg: f64,
}

impl MountRemap {
    /// Sensor mounted on its side behind the forward camera:
    /// roll = 90 - roll, heading = yaw - 90.
    pub const FORWARD_CAMERA: MountRemap = MountRemap {
        pitch_sign: 1.0,
        roll_sign: -1.0,
        roll_offset_deg: 90.0,
        heading_sign: 1.0,
        heading_offset_deg: -90.0,
    };

    /// Identity mapping, sensor axes equal camera axes.
    pub const IDENTITY: MountRemap = MountRemap {
        pitch_sign: 1.0,
        roll_sign: 1.0,
        roll_offset_deg: 0.0,
        heading_sign: 1.0,
        heading_offset_deg: 0.0,
    };

    pub fn validate(&self) -> crate::Result<()> {
        let values = [
            self.pitch_sign,
            self.roll_sign,
            self.roll_offset_deg,
            self.heading_sign,
            self.heading_offset_deg,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(crate::AttitudeError::InvalidConfig(
                "mount remap contains a non-finite value".into(),
            ));
        }
        for (axis, sign) in [
            ("pitch", self.pitch_sign),
            ("roll", self.roll_sign),
            ("heading", self.heading_sign),
        ] {
            if sign != 1.0 && sign != -1.0 {
                return Err(crate::AttitudeError::InvalidConfig(format!(
                    "{} sign must be 1 or -1, got {}",
                    axis, sign
                )));
            }
        }
        // A single +/-360 correction only covers offsets within half a turn.
        if !(-180.0..=180.0).contains(&self.heading_offset_deg) {
            return Err(crate::AttitudeError::InvalidConfig(format!(
                "heading offset {} outside [-180, 180]",
                self.heading_offset_deg
            )));
        }
        Ok(())
    }
}

impl Default for MountRemap {
    fn default() -> Self {
        Self::FORWARD_CAMERA
    }
}

/// One rung of the horizon ladder.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleLineSpec {
    /// Pitch angle of the rung in degrees, positive above the horizon.
    pub angle: i32,
    /// Line length as a fraction of the screen width.
    pub width_ratio: f64,
    /// Draw the angle value next to the line.
    pub display_text: bool,
}

impl AngleLineSpec {
    pub const fn new(angle: i32, width_ratio: f64, display_text: bool) -> Self {
        Self {
            angle,
            width_ratio,
            display_text,
        }
    }
}

/// Ladder drawn on the forward camera.
pub const ANGLE_LINE_SETTINGS: &[AngleLineSpec] = &[
    AngleLineSpec::new(-10, 0.3, true),
    AngleLineSpec::new(-5, 0.3, true),
    AngleLineSpec::new(0, 0.8, true),
    AngleLineSpec::new(1, 0.1, false),
    AngleLineSpec::new(2, 0.1, false),
    AngleLineSpec::new(3, 0.1, false),
    AngleLineSpec::new(4, 0.1, false),
    AngleLineSpec::new(5, 0.3, true),
    AngleLineSpec::new(10, 0.3, true),
    AngleLineSpec::new(15, 0.3, true),
];

/// Fixed optical and mechanical parameters of one camera.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraCalibration {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    pub vertical_fov_deg: f64,
    /// How far the camera is pitched up relative to the sensor, in degrees.
    pub vertical_mount_offset_deg: f64,
}

impl CameraCalibration {
    pub fn validate(&self) -> crate::Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(crate::AttitudeError::InvalidConfig(format!(
                "camera frame {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        if !self.vertical_fov_deg.is_finite() || self.vertical_fov_deg <= 0.0 {
            return Err(crate::AttitudeError::InvalidConfig(format!(
                "vertical FOV must be positive, got {}",
                self.vertical_fov_deg
            )));
        }
        if !self.vertical_mount_offset_deg.is_finite() {
            return Err(crate::AttitudeError::InvalidConfig(
                "vertical mount offset is not finite".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CameraCalibration {
    /// Forward camera on the boat: 1280x1080, 41 deg vertical FOV,
    /// tilted up 10 deg.
    fn default() -> Self {
        Self {
            width: 1280,
            height: 1080,
            vertical_fov_deg: 41.0,
            vertical_mount_offset_deg: 10.0,
        }
    }
}

/// Text placed in overlay coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub text: String,
    /// Baseline start, in the coordinate frame of its owner.
    pub x: f64,
    pub y: f64,
}

/// One projected ladder line, ready for a renderer with a transform stack:
/// translate to `center`, rotate by `rotation_rad`, translate down by
/// `y_offset`, then stroke from `-half_width` to `half_width` on y = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenLine {
    pub angle: i32,
    /// Screen rotation, clockwise positive (already negated roll).
    pub rotation_rad: f64,
    /// Screen center the rotation is applied about, in pixels.
    pub center: [f64; 2],
    /// Vertical translation in the rotated frame, in pixels.
    pub y_offset: f64,
    pub half_width: f64,
    /// Label in the rotated, translated line frame.
    pub label: Option<TextLabel>,
}
