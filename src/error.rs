use std::fmt;

/// Errors raised by the attitude subsystem.
///
/// A poll that yields no rotation report is not an error; the decoder
/// returns `None` and the last attitude is kept.
#[derive(Debug, thiserror::Error)]
pub enum AttitudeError {
    #[error("I2C error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Sensor bus unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Bus transfer failed: {0}")]
    Bus(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn polling thread: {0}")]
    ThreadSpawn(String),
}

#[cfg(target_os = "linux")]
impl From<rppal::i2c::Error> for AttitudeError {
    fn from(e: rppal::i2c::Error) -> Self {
        AttitudeError::Transport(Box::new(e))
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &AttitudeError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
