//! Stream pitch/roll/heading from the BNO08x to stdout.
//!
//! Usage: cargo run --example attitude
//! Settings come from HORIZON_* environment variables. Press Ctrl+C to stop.

#[cfg(target_os = "linux")]
use std::time::{Duration, Instant};

#[cfg(target_os = "linux")]
fn main() {
    env_logger::init();

    let config = horizon_attitude::SensorConfig::from_env();
    println!("Bus:      /dev/i2c-{} @ 0x{:02x}", config.bus, config.address);
    println!("Report:   {:?}", config.variant);
    println!("Interval: {} us", config.report_interval_us);
    println!();

    let sensor = match horizon_attitude::AttitudeSensor::open(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open sensor: {}", e);
            std::process::exit(1);
        }
    };

    let poller = match sensor.start_polling() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to start polling: {}", e);
            std::process::exit(1);
        }
    };

    println!("Streaming attitude (Ctrl+C to stop)...");

    let start = Instant::now();
    let mut last = poller.attitude();
    let mut changes: u64 = 0;
    let mut last_report = Instant::now();

    while poller.is_active() {
        std::thread::sleep(Duration::from_millis(50));
        let a = poller.attitude();
        if a != last {
            changes += 1;
            last = a;
        }

        println!(
            "pitch={:+7.2}  roll={:+7.2}  heading={:6.2}",
            a.pitch, a.roll, a.heading
        );

        // Report update rate every 3 seconds
        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(3) {
            let elapsed = start.elapsed().as_secs_f64();
            println!(
                "--- {} updates in {:.1}s ({:.1} Hz) ---",
                changes,
                elapsed,
                changes as f64 / elapsed
            );
            last_report = now;
        }
    }

    eprintln!("Poller stopped");
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("The I2C transport is only available on Linux");
    std::process::exit(1);
}
