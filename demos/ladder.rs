//! Print the horizon ladder geometry for a given attitude.
//!
//! Usage: cargo run --example ladder -- <pitch> <roll>

use horizon_attitude::projector;
use horizon_attitude::{Attitude, CameraCalibration, ANGLE_LINE_SETTINGS};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let mut next_angle = |name: &str| -> f64 {
        match args.next().map(|v| v.parse::<f64>()) {
            None => 0.0,
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                eprintln!("Invalid {}: {}", name, e);
                std::process::exit(1);
            }
        }
    };
    let attitude = Attitude {
        pitch: next_angle("pitch"),
        roll: next_angle("roll"),
        heading: 0.0,
    };

    let calibration = CameraCalibration::default();
    if let Err(e) = calibration.validate() {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    println!(
        "{}x{}  vfov={}  mount={}  pitch={}  roll={}",
        calibration.width,
        calibration.height,
        calibration.vertical_fov_deg,
        calibration.vertical_mount_offset_deg,
        attitude.pitch,
        attitude.roll
    );

    for line in projector::project_horizon_lines(&attitude, &calibration, ANGLE_LINE_SETTINGS) {
        let [[x0, y0], [x1, y1]] = line.endpoints();
        let label = match line.label_anchor() {
            Some([lx, ly]) => format!("  label@({:.1}, {:.1})", lx, ly),
            None => String::new(),
        };
        println!(
            "{:+4}  ({:7.1}, {:7.1}) -> ({:7.1}, {:7.1}){}",
            line.angle, x0, y0, x1, y1, label
        );
    }

    for text in projector::debug_readout(&attitude, &calibration) {
        println!("{:>6.1},{:>7.1}  {}", text.x, text.y, text.text);
    }
}
