use crate::poller::AttitudePoller;
use crate::protocol::{self, ReportHeader, MAX_FRAME_LEN};
use crate::solver::{AttitudeCell, OrientationSolver};
use crate::transport::BusTransport;
use crate::types::{Attitude, MountRemap, ReportVariant};
use crate::{AttitudeError, Result};
use std::time::Duration;

#[cfg(target_os = "linux")]
use crate::transport::I2cTransport;

/// Startup parameters for the attitude sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// I2C bus number, `/dev/i2c-<bus>`.
    pub bus: u8,
    /// 7-bit device address.
    pub address: u16,
    pub variant: ReportVariant,
    /// Interval the sensor is asked to report at, in microseconds.
    pub report_interval_us: u32,
    /// Pause between polls in the background poller.
    pub poll_interval: Duration,
    /// Reads issued at startup to drain advertisement and reset messages.
    pub boot_flush_reads: usize,
    pub boot_flush_delay_ms: u32,
    pub remap: MountRemap,
}

impl Default for SensorConfig {
    fn default() -> Self {
        let variant = ReportVariant::default();
        Self {
            bus: 1,
            address: 0x4A,
            variant,
            report_interval_us: protocol::DEFAULT_REPORT_INTERVAL_US,
            poll_interval: Duration::from_millis(10),
            boot_flush_reads: 10,
            boot_flush_delay_ms: 10,
            remap: variant.default_remap(),
        }
    }
}

impl SensorConfig {
    /// Defaults overridden by `HORIZON_*` environment variables.
    ///
    /// - `HORIZON_I2C_BUS` (default 1)
    /// - `HORIZON_I2C_ADDR` (decimal or 0x-prefixed hex, default 0x4A)
    /// - `HORIZON_ROTATION_REPORT` (`rotation` | `game`, default rotation)
    /// - `HORIZON_REPORT_INTERVAL_US` (default 50000)
    /// - `HORIZON_POLL_INTERVAL_MS` (default 10)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let variant = match lookup("HORIZON_ROTATION_REPORT") {
            Some(v) if !v.trim().is_empty() => v.parse().unwrap_or_else(|e| {
                log::warn!("{}, using {:?}", e, defaults.variant);
                defaults.variant
            }),
            _ => defaults.variant,
        };

        Self {
            bus: Self::read_number(&lookup, "HORIZON_I2C_BUS", defaults.bus),
            address: Self::read_number(&lookup, "HORIZON_I2C_ADDR", defaults.address),
            variant,
            report_interval_us: Self::read_number(
                &lookup,
                "HORIZON_REPORT_INTERVAL_US",
                defaults.report_interval_us,
            ),
            poll_interval: Duration::from_millis(Self::read_number(
                &lookup,
                "HORIZON_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )),
            remap: variant.default_remap(),
            ..defaults
        }
    }

    fn read_number<N>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: N) -> N
    where
        N: TryFrom<u64> + Copy + std::fmt::Debug,
    {
        let Some(raw) = lookup(name) else {
            return default;
        };
        let raw = raw.trim().to_ascii_lowercase();
        let parsed = match raw.strip_prefix("0x") {
            Some(hex) => u64::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u64>().ok(),
        };
        match parsed.and_then(|v| N::try_from(v).ok()) {
            Some(value) => value,
            None => {
                log::warn!("Ignoring {}='{}', using {:?}", name, raw, default);
                default
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_interval_us == 0 {
            return Err(AttitudeError::InvalidConfig(
                "report interval must be non-zero".into(),
            ));
        }
        if self.address > 0x7F {
            return Err(AttitudeError::InvalidConfig(format!(
                "I2C address 0x{:x} is not a 7-bit address",
                self.address
            )));
        }
        self.remap.validate()
    }
}

/// An initialised BNO08x streaming one rotation report.
pub struct AttitudeSensor<T: BusTransport> {
    transport: T,
    solver: OrientationSolver,
    config: SensorConfig,
    buf: [u8; MAX_FRAME_LEN],
}

#[cfg(target_os = "linux")]
impl AttitudeSensor<I2cTransport> {
    /// Open the sensor on Linux i2c-dev and enable its rotation report.
    pub fn open(config: SensorConfig) -> Result<Self> {
        config.validate()?;
        let transport = I2cTransport::open(config.bus, config.address)?;
        Self::with_transport(transport, config)
    }

    /// Open with [`SensorConfig::from_env`].
    pub fn open_default() -> Result<Self> {
        Self::open(SensorConfig::from_env())
    }
}

impl<T: BusTransport> AttitudeSensor<T> {
    /// Initialise the sensor over an already opened transport.
    pub fn with_transport(transport: T, config: SensorConfig) -> Result<Self> {
        config.validate()?;
        let solver = OrientationSolver::new(config.variant, config.remap)?;

        let mut sensor = Self {
            transport,
            solver,
            config,
            buf: [0u8; MAX_FRAME_LEN],
        };
        sensor.initialize()?;
        Ok(sensor)
    }

    fn initialize(&mut self) -> Result<()> {
        // Drain the advertisement and reset reports the hub sends after boot.
        for _ in 0..self.config.boot_flush_reads {
            if let Err(e) = self.transport.read(&mut self.buf) {
                log::debug!("Boot flush read failed: {}", e);
            }
            self.transport.delay_ms(self.config.boot_flush_delay_ms);
        }

        let cmd = protocol::build_enable_rotation_cmd(
            self.config.variant,
            self.config.report_interval_us,
            0,
        );
        let written = self.transport.write(&cmd)?;
        if written != cmd.len() {
            return Err(AttitudeError::Bus(format!(
                "enable command truncated: wrote {} of {} bytes",
                written,
                cmd.len()
            )));
        }

        log::info!(
            "Enabled {:?} (report 0x{:02x}) every {} us",
            self.config.variant,
            self.config.variant.report_id(),
            self.config.report_interval_us
        );
        Ok(())
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    pub fn solver(&self) -> &OrientationSolver {
        &self.solver
    }

    /// Handle to the attitude cell this sensor publishes into.
    pub fn handle(&self) -> AttitudeCell {
        self.solver.handle()
    }

    /// Read one frame from the bus and apply it.
    ///
    /// `Ok(None)` means the frame held no rotation report.
    pub fn poll_once(&mut self) -> Result<Option<ReportHeader>> {
        let read = self.transport.read(&mut self.buf)?;
        let len = protocol::valid_frame_len(&self.buf, read);
        let applied = self.solver.process_frame(&self.buf, len);
        if applied.is_none() {
            log::trace!("No rotation report in {} byte frame", len);
        }
        Ok(applied)
    }

    /// Poll once and return the current attitude. Bus errors are logged and
    /// the last known attitude is returned unchanged.
    pub fn poll(&mut self) -> Attitude {
        if let Err(e) = self.poll_once() {
            log::warn!("Attitude poll failed: {}", e);
        }
        self.solver.read()
    }

    /// Current attitude without touching the bus.
    pub fn attitude(&self) -> Attitude {
        self.solver.read()
    }
}

impl<T: BusTransport + 'static> AttitudeSensor<T> {
    /// Move the sensor into a background polling thread.
    pub fn start_polling(self) -> Result<AttitudePoller> {
        AttitudePoller::start(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{rotation_frame, ScriptedBus};
    use std::collections::HashMap;

    fn quiet_config() -> SensorConfig {
        SensorConfig {
            boot_flush_reads: 0,
            ..SensorConfig::default()
        }
    }

    #[test]
    fn test_initialize_flushes_then_enables() {
        let bus = ScriptedBus::new();
        let log = bus.log.clone();
        let sensor = AttitudeSensor::with_transport(bus, SensorConfig::default()).unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.reads, 10);
        assert_eq!(log.delays, vec![10; 10]);
        assert_eq!(log.writes.len(), 1);
        assert_eq!(
            log.writes[0],
            protocol::build_enable_rotation_cmd(ReportVariant::RotationVector, 50_000, 0).to_vec()
        );
        assert_eq!(sensor.attitude(), Attitude::default());
    }

    #[test]
    fn test_game_variant_enables_report_8() {
        let bus = ScriptedBus::new();
        let log = bus.log.clone();
        let config = SensorConfig {
            variant: ReportVariant::GameRotationVector,
            ..quiet_config()
        };
        let sensor = AttitudeSensor::with_transport(bus, config).unwrap();
        assert_eq!(sensor.solver().report_id(), 0x08);
        assert_eq!(log.lock().unwrap().writes[0][5], 0x08);
    }

    #[test]
    fn test_boot_flush_errors_are_ignored() {
        let bus = ScriptedBus::new().error("nack").error("nack");
        let config = SensorConfig {
            boot_flush_reads: 3,
            ..SensorConfig::default()
        };
        assert!(AttitudeSensor::with_transport(bus, config).is_ok());
    }

    #[test]
    fn test_short_enable_write_fails() {
        let bus = ScriptedBus::new().short_writes();
        match AttitudeSensor::with_transport(bus, quiet_config()) {
            Err(AttitudeError::Bus(msg)) => assert!(msg.contains("10 of 21")),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("short write accepted"),
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_bus_use() {
        let bus = ScriptedBus::new();
        let log = bus.log.clone();
        let config = SensorConfig {
            report_interval_us: 0,
            ..quiet_config()
        };
        assert!(matches!(
            AttitudeSensor::with_transport(bus, config),
            Err(AttitudeError::InvalidConfig(_))
        ));
        assert!(log.lock().unwrap().writes.is_empty());
    }

    #[test]
    fn test_poll_keeps_last_good_attitude() {
        let mut junk = rotation_frame(0x05, [0, 0, 0, 16384]);
        junk[2] = 0x02;
        let bus = ScriptedBus::new()
            .frame(rotation_frame(0x05, [0, 0, 0, 16384]))
            .frame(junk)
            .error("bus glitch")
            .frame(vec![0x01, 0x00]);
        let mut sensor = AttitudeSensor::with_transport(bus, quiet_config()).unwrap();

        let good = sensor.poll();
        assert_eq!(good.roll, 90.0);
        assert_eq!(good.heading, 270.0);

        assert_eq!(sensor.poll(), good);
        assert_eq!(sensor.poll(), good);
        assert_eq!(sensor.poll(), good);
        // Script exhausted: empty reads.
        assert!(sensor.poll_once().unwrap().is_none());
        assert_eq!(sensor.attitude(), good);
    }

    #[test]
    fn test_poll_once_reports_bus_errors() {
        let bus = ScriptedBus::new().error("gone");
        let mut sensor = AttitudeSensor::with_transport(bus, quiet_config()).unwrap();
        assert!(matches!(sensor.poll_once(), Err(AttitudeError::Bus(_))));
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("HORIZON_I2C_BUS", "3"),
            ("HORIZON_I2C_ADDR", "0x4b"),
            ("HORIZON_ROTATION_REPORT", "game"),
            ("HORIZON_REPORT_INTERVAL_US", "20000"),
            ("HORIZON_POLL_INTERVAL_MS", "5"),
        ]
        .into_iter()
        .collect();
        let config = SensorConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.bus, 3);
        assert_eq!(config.address, 0x4B);
        assert_eq!(config.variant, ReportVariant::GameRotationVector);
        assert_eq!(config.report_interval_us, 20_000);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.boot_flush_reads, 10);
    }

    #[test]
    fn test_config_bad_values_fall_back() {
        let env: HashMap<&str, &str> = [
            ("HORIZON_I2C_BUS", "300"),
            ("HORIZON_I2C_ADDR", "zz"),
            ("HORIZON_ROTATION_REPORT", "compass"),
        ]
        .into_iter()
        .collect();
        let config = SensorConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config, SensorConfig::default());
    }
}
