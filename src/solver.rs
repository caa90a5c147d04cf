//! Quaternion to camera-frame attitude, and the shared attitude cell.

use crate::protocol::{self, ReportHeader};
use crate::types::{Attitude, MountRemap, Quaternion, ReportVariant};
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};

/// |sin(pitch)| at or above which roll and yaw are treated as degenerate.
pub const SINGULARITY_THRESHOLD: f64 = 0.999;

/// Z-Y-X Euler angles in the sensor frame, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Convert a unit quaternion to Z-Y-X Euler angles.
///
/// Near the poles roll is pinned to zero and the whole rotation about the
/// vertical goes into yaw, which keeps the readout from spinning when the
/// atan2 denominators approach zero.
pub fn quaternion_to_euler(q: &Quaternion) -> EulerAngles {
    let (w, x, y, z) = (q.w as f64, q.x as f64, q.y as f64, q.z as f64);

    let sinp = 2.0 * (w * y - z * x);
    if sinp.abs() >= SINGULARITY_THRESHOLD {
        let mut yaw = (2.0 * x.atan2(w)).to_degrees();
        // 2*atan2 spans a full turn each way; fold it back into one.
        if yaw > 180.0 {
            yaw -= 360.0;
        } else if yaw <= -180.0 {
            yaw += 360.0;
        }
        return EulerAngles {
            pitch: 90.0_f64.copysign(sinp),
            roll: 0.0,
            yaw,
        };
    }

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = sinp.asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    EulerAngles {
        pitch: pitch.to_degrees(),
        roll: roll.to_degrees(),
        yaw: yaw.to_degrees(),
    }
}

/// Bring a heading into [0, 360) with one correction.
///
/// Callers guarantee the input is within a turn of the target range.
pub fn wrap_heading(heading: f64) -> f64 {
    let wrapped = if heading < 0.0 {
        heading + 360.0
    } else if heading >= 360.0 {
        heading - 360.0
    } else {
        heading
    };
    // -1e-14 + 360 rounds to exactly 360.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

impl MountRemap {
    /// Map sensor-frame angles onto the camera.
    pub fn apply(&self, euler: EulerAngles) -> Attitude {
        Attitude {
            pitch: self.pitch_sign * euler.pitch,
            roll: self.roll_offset_deg + self.roll_sign * euler.roll,
            heading: wrap_heading(self.heading_offset_deg + self.heading_sign * euler.yaw),
        }
    }
}

/// Shared, last-known-good attitude.
///
/// Writers replace the whole value under one lock, so readers always see a
/// pitch/roll/heading triple from the same update.
#[derive(Debug, Clone, Default)]
pub struct AttitudeCell {
    inner: Arc<Mutex<Attitude>>,
}

impl AttitudeCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> Attitude {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store(&self, attitude: Attitude) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = attitude;
    }
}

/// Turns rotation reports of one variant into camera-frame attitude.
#[derive(Debug, Clone)]
pub struct OrientationSolver {
    variant: ReportVariant,
    remap: MountRemap,
    cell: AttitudeCell,
}

impl OrientationSolver {
    pub fn new(variant: ReportVariant, remap: MountRemap) -> Result<Self> {
        Self::with_cell(variant, remap, AttitudeCell::new())
    }

    /// Solver publishing into an existing cell.
    pub fn with_cell(variant: ReportVariant, remap: MountRemap, cell: AttitudeCell) -> Result<Self> {
        remap.validate()?;
        Ok(Self {
            variant,
            remap,
            cell,
        })
    }

    pub fn variant(&self) -> ReportVariant {
        self.variant
    }

    /// Report id this solver decodes.
    pub fn report_id(&self) -> u8 {
        self.variant.report_id()
    }

    pub fn remap(&self) -> &MountRemap {
        &self.remap
    }

    /// Handle to the attitude cell for the render path.
    pub fn handle(&self) -> AttitudeCell {
        self.cell.clone()
    }

    /// Camera-frame attitude for `q`, without touching the cell.
    pub fn solve(&self, q: &Quaternion) -> Attitude {
        self.remap.apply(quaternion_to_euler(q))
    }

    pub fn update(&self, q: Quaternion) {
        self.cell.store(self.solve(&q));
    }

    /// Current attitude, possibly stale.
    pub fn read(&self) -> Attitude {
        self.cell.load()
    }

    /// Decode one frame and update the cell if it held a rotation report.
    ///
    /// Returns the header of the report that was applied.
    pub fn process_frame(&self, frame: &[u8], len: usize) -> Option<ReportHeader> {
        let report = protocol::find_rotation_report(frame, len, self.report_id())?;
        let payload = report.payload(frame)?;
        let q = protocol::decode_quaternion(payload, self.variant.field_order());
        log::debug!(
            "rotation report 0x{:02x} seq={} accuracy={} q=[{:+.4}, {:+.4}, {:+.4}, {:+.4}]",
            report.header.report_id,
            report.header.sequence,
            report.header.accuracy(),
            q.w,
            q.x,
            q.y,
            q.z
        );
        self.update(q);
        Some(report.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn solver() -> OrientationSolver {
        OrientationSolver::new(ReportVariant::RotationVector, MountRemap::FORWARD_CAMERA).unwrap()
    }

    #[test]
    fn test_identity_quaternion_after_remap() {
        let attitude = solver().solve(&Quaternion::IDENTITY);
        assert_eq!(attitude.pitch, 0.0);
        assert_eq!(attitude.roll, 90.0);
        assert_eq!(attitude.heading, 270.0);
    }

    #[test]
    fn test_identity_quaternion_without_remap() {
        let euler = quaternion_to_euler(&Quaternion::IDENTITY);
        assert_eq!(euler.pitch, 0.0);
        assert_eq!(euler.roll, 0.0);
        assert_eq!(euler.yaw, 0.0);
    }

    #[test]
    fn test_x_axis_quarter_turn() {
        let q = Quaternion::new(0.7071, 0.7071, 0.0, 0.0);
        let euler = quaternion_to_euler(&q);
        assert!((euler.roll - 90.0).abs() < 0.01, "roll {}", euler.roll);
        assert!(euler.pitch.abs() < 1e-9);

        let attitude = solver().solve(&q);
        assert!(attitude.roll.abs() < 0.01, "roll {}", attitude.roll);
        assert!(attitude.pitch.abs() < 1e-9);
    }

    #[test]
    fn test_singularity_forces_zero_roll() {
        let cases = [
            // Pure pitch up / down.
            (Quaternion::new(FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2, 0.0), 90.0),
            (Quaternion::new(FRAC_1_SQRT_2, 0.0, -FRAC_1_SQRT_2, 0.0), -90.0),
            // Near the pole with x and z mixed in.
            (Quaternion::new(0.7, 0.1, 0.7, -0.1), 90.0),
            (Quaternion::new(0.7, -0.1, -0.7, -0.1), -90.0),
            (Quaternion::new(0.1, 0.7, 0.1, -0.7), 90.0),
        ];
        for (q, pitch) in cases {
            let euler = quaternion_to_euler(&q);
            assert_eq!(euler.roll, 0.0, "q={:?}", q);
            assert_eq!(euler.pitch, pitch, "q={:?}", q);
            assert!(euler.yaw > -180.0 && euler.yaw <= 180.0, "yaw {}", euler.yaw);
        }
    }

    #[test]
    fn test_below_threshold_uses_asin() {
        // sinp = 0.99, just under the threshold.
        let half = 0.99_f64.asin() / 2.0;
        let q = Quaternion::new(half.cos() as f32, 0.0, half.sin() as f32, 0.0);
        let euler = quaternion_to_euler(&q);
        assert!((euler.pitch - 0.99_f64.asin().to_degrees()).abs() < 1e-3);
        assert!(euler.roll.abs() < 1e-3);
    }

    #[test]
    fn test_wrap_heading_bounds() {
        assert_eq!(wrap_heading(-90.0), 270.0);
        assert_eq!(wrap_heading(0.0), 0.0);
        assert_eq!(wrap_heading(360.0), 0.0);
        assert_eq!(wrap_heading(450.0), 90.0);
        assert_eq!(wrap_heading(-1e-14), 0.0);
        assert_eq!(wrap_heading(359.5), 359.5);
    }

    #[test]
    fn test_heading_always_in_range() {
        // Deterministic pseudo-random unit quaternions, plus the remap
        // with both heading signs.
        let remaps = [
            MountRemap::FORWARD_CAMERA,
            MountRemap {
                heading_sign: -1.0,
                heading_offset_deg: 180.0,
                ..MountRemap::FORWARD_CAMERA
            },
            MountRemap::IDENTITY,
        ];
        let mut state: u32 = 0x1234_5678;
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };
        for remap in remaps {
            let solver = OrientationSolver::new(ReportVariant::RotationVector, remap).unwrap();
            for _ in 0..2000 {
                let (w, x, y, z) = (next(), next(), next(), next());
                let q = Quaternion::new(w, x, y, z);
                let n = q.norm();
                if n < 1e-3 {
                    continue;
                }
                let q = Quaternion::new(w / n, x / n, y / n, z / n);
                let attitude = solver.solve(&q);
                assert!(
                    (0.0..360.0).contains(&attitude.heading),
                    "heading {} for {:?}",
                    attitude.heading,
                    q
                );
                assert!((-90.0..=90.0).contains(&attitude.pitch));
            }
        }
    }

    #[test]
    fn test_process_frame_updates_and_keeps_last_good() {
        let solver = solver();
        let mut frame = [0u8; 24];
        frame[..4].copy_from_slice(&[24, 0, 3, 1]);
        frame[4..8].copy_from_slice(&[0x05, 0x10, 0x03, 0x00]);
        // i=0, j=0, k=0, real=1
        frame[14..16].copy_from_slice(&16384i16.to_le_bytes());

        let header = solver.process_frame(&frame, frame.len()).unwrap();
        assert_eq!(header.sequence, 0x10);
        let good = solver.read();
        assert_eq!(good.heading, 270.0);

        // Control-channel frame: nothing decoded, attitude unchanged.
        let mut junk = frame;
        junk[2] = 2;
        assert!(solver.process_frame(&junk, junk.len()).is_none());
        assert!(solver.process_frame(&frame, 4).is_none());
        assert_eq!(solver.read(), good);
    }

    #[test]
    fn test_game_solver_ignores_fused_reports() {
        let solver =
            OrientationSolver::new(ReportVariant::GameRotationVector, MountRemap::IDENTITY).unwrap();
        assert_eq!(solver.report_id(), 0x08);

        let mut frame = [0u8; 24];
        frame[..4].copy_from_slice(&[24, 0, 3, 1]);
        frame[4] = 0x05;
        frame[14..16].copy_from_slice(&16384i16.to_le_bytes());
        assert!(solver.process_frame(&frame, frame.len()).is_none());

        frame[4] = 0x08;
        assert!(solver.process_frame(&frame, frame.len()).is_some());
        assert_eq!(solver.read(), Attitude::default());
    }

    #[test]
    fn test_invalid_remap_rejected() {
        let remap = MountRemap {
            heading_offset_deg: 270.0,
            ..MountRemap::FORWARD_CAMERA
        };
        assert!(OrientationSolver::new(ReportVariant::RotationVector, remap).is_err());

        let remap = MountRemap {
            roll_sign: 0.5,
            ..MountRemap::FORWARD_CAMERA
        };
        assert!(OrientationSolver::new(ReportVariant::RotationVector, remap).is_err());
    }

    #[test]
    fn test_cell_snapshots_are_never_torn() {
        let cell = AttitudeCell::new();
        let writer = {
            let cell = cell.clone();
            std::thread::spawn(move || {
                for i in 0..20_000 {
                    let v = i as f64;
                    cell.store(Attitude {
                        pitch: v,
                        roll: v,
                        heading: v,
                    });
                }
            })
        };
        for _ in 0..20_000 {
            let a = cell.load();
            assert_eq!(a.pitch, a.roll);
            assert_eq!(a.roll, a.heading);
        }
        writer.join().unwrap();
    }
}
