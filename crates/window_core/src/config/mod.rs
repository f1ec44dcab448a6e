//! Configuration system
//!
//! [`WindowConfig`] replaces process-wide debug/property switches: it is an
//! explicit value handed to [`Display::open`](crate::display::Display::open)
//! and shared by every screen and window on that display.

use std::time::Duration;

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        // Try different formats
        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of its valid range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// # Window System Configuration
///
/// Timing constants, driver selection and test switches for one display
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Platform key looked up in the [`DriverRegistry`](crate::driver::DriverRegistry)
    pub driver: String,
    /// Run operations on a dedicated serialization thread per display.
    /// When disabled, operations execute on the calling thread.
    pub edt_enabled: bool,
    /// Idle pump period of the serialization thread and sleep interval of
    /// the convergence waits, in milliseconds
    pub poll_interval_ms: u64,
    /// Upper bound for visibility/size/position convergence, in milliseconds
    pub native_timeout_ms: u64,
    /// Age after which a coalesced RESIZED/REPAINT event is discarded
    pub queued_event_timeout_ms: u64,
    /// Maximum delay between presses (and press→release) counted as one click sequence
    pub click_timeout_ms: u64,
    /// Grace period after hiding a window before native reparenting,
    /// for compositing window managers that report invisibility early
    pub reparent_settle_ms: u64,
    /// Force destroy/create on every reparent, even between compatible screens
    pub force_reparent_recreation: bool,
    /// Default log filter used by [`foundation::logging::init_with_level`](crate::foundation::logging::init_with_level)
    pub log_level: String,
}

impl WindowConfig {
    /// Create a configuration for the given driver with default timings
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// Enable or disable the serialization thread
    pub fn with_edt(mut self, enabled: bool) -> Self {
        self.edt_enabled = enabled;
        self
    }

    /// Set the convergence timeout
    pub fn with_native_timeout_ms(mut self, millis: u64) -> Self {
        self.native_timeout_ms = millis;
        self
    }

    /// Set the click timeout
    pub fn with_click_timeout_ms(mut self, millis: u64) -> Self {
        self.click_timeout_ms = millis;
        self
    }

    /// Set the reparent settle time
    pub fn with_reparent_settle_ms(mut self, millis: u64) -> Self {
        self.reparent_settle_ms = millis;
        self
    }

    /// Force recreation on every reparent
    pub fn with_forced_reparent_recreation(mut self, enabled: bool) -> Self {
        self.force_reparent_recreation = enabled;
        self
    }

    /// Poll interval as a [`Duration`]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Convergence timeout as a [`Duration`]
    pub const fn native_timeout(&self) -> Duration {
        Duration::from_millis(self.native_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::Invalid("driver key cannot be empty".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll interval must be at least 1ms".to_string()));
        }
        if self.native_timeout_ms < self.poll_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "native timeout {}ms is shorter than the poll interval {}ms",
                self.native_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            driver: crate::driver::HEADLESS_DRIVER.to_string(),
            edt_enabled: true,
            poll_interval_ms: 10,
            native_timeout_ms: 1000,
            queued_event_timeout_ms: 1200,
            click_timeout_ms: 300,
            reparent_settle_ms: 100,
            force_reparent_recreation: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config for WindowConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WindowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queued_event_timeout_ms, 1200);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = WindowConfig::new("");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.driver = "x11".to_string();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        config.poll_interval_ms = 50;
        config.native_timeout_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.toml");
        let path = path.to_str().unwrap();

        let config = WindowConfig::new("glfw")
            .with_edt(false)
            .with_click_timeout_ms(450);
        config.save_to_file(path).unwrap();

        let loaded = WindowConfig::load_from_file(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.ron");
        std::fs::write(&path, "(driver: \"glfw\", native_timeout_ms: 2000)").unwrap();

        let loaded = WindowConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.driver, "glfw");
        assert_eq!(loaded.native_timeout_ms, 2000);
        assert_eq!(loaded.click_timeout_ms, 300);
    }

    #[test]
    fn test_unknown_extension() {
        let err = WindowConfig::load_from_file("window.ini").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_) | ConfigError::UnsupportedFormat(_)));
    }
}
