//! Configuration for the telemetry agent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How often the analyzers are polled for a report
    #[serde(with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Capacity of each ingestion channel
    pub channel_capacity: usize,

    /// Path for exported reports
    pub export_path: PathBuf,

    /// Path for the ingestion journal
    pub data_path: PathBuf,

    /// Synthetic source settings used by `monitor`
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("phonestats");

        Self {
            poll_interval: Duration::from_secs(1),
            channel_capacity: 1024,
            export_path: data_dir.join("reports"),
            data_path: data_dir,
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("phonestats")
            .join("config.json")
    }

    /// Path of the persisted ingestion journal.
    pub fn journal_path(&self) -> PathBuf {
        self.data_path.join("journal.json")
    }

    /// Human-readable listing of the effective settings.
    pub fn describe(&self) -> String {
        let sim = &self.simulation;
        format!(
            "Polling:\n\
             \x20 interval: {}ms\n\
             \x20 channel capacity: {} events\n\
             \n\
             Storage:\n\
             \x20 reports: {:?}\n\
             \x20 journal: {:?}\n\
             \n\
             Simulated sources:\n\
             \x20 camera: {:.2} fps, {:.0}% jitter\n\
             \x20 gnss: fix every {}ms, {:.3} ppm drift",
            self.poll_interval.as_millis(),
            self.channel_capacity,
            self.export_path,
            self.journal_path(),
            sim.target_fps,
            sim.jitter_fraction * 100.0,
            sim.fix_interval.as_millis(),
            sim.drift_ppm
        )
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Settings for the synthetic camera and GNSS sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub target_fps: f64,
    /// Peak frame-interval jitter as a fraction of the nominal interval
    pub jitter_fraction: f64,
    /// System clock drift against GNSS time, parts per million
    pub drift_ppm: f64,
    #[serde(with = "duration_ms_serde")]
    pub fix_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            jitter_fraction: 0.05,
            drift_ppm: 20.0,
            fix_interval: Duration::from_secs(1),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.channel_capacity > 0);
        assert_eq!(config.simulation.target_fps, 30.0);
        assert!(config.journal_path().ends_with("journal.json"));
    }

    #[test]
    fn test_describe_lists_settings() {
        let mut config = Config::default();
        config.channel_capacity = 256;
        config.simulation.target_fps = 59.94;
        config.simulation.drift_ppm = -12.5;

        let text = config.describe();
        assert!(text.contains("  interval: 1000ms"));
        assert!(text.contains("  channel capacity: 256 events"));
        assert!(text.contains("journal.json"));
        assert!(text.contains("  camera: 59.94 fps, 5% jitter"));
        assert!(text.contains("  gnss: fix every 1000ms, -12.500 ppm drift"));
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["poll_interval"], 1000);
        assert_eq!(json["simulation"]["fix_interval"], 1000);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("phonestats-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.channel_capacity = 7;
        config.simulation.drift_ppm = -3.5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.channel_capacity, 7);
        assert_eq!(loaded.simulation.drift_ppm, -3.5);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("phonestats-definitely-missing.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.channel_capacity, Config::default().channel_capacity);
    }
}
