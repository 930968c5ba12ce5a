use serde::{Deserialize, Serialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use mpcycle_common::{Arrangement, MpcycleError, error::ConfigError, Result};

pub mod layout;

pub use layout::resolve_positions;

/// Rotation value meaning "leave the picture as it is".
pub const ROTATE_UNSET: i32 = -1;

// Interval accepts plain milliseconds or a human-readable string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInterval {
    Millis(u64),
    Text(String),
}

fn deserialize_interval<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match RawInterval::deserialize(deserializer)? {
        RawInterval::Millis(ms) => Ok(Duration::from_millis(ms)),
        RawInterval::Text(text) => mpcycle_common::duration::parse_duration(&text)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Explicit `-x`/`-y` pair. Both halves are optional so a partial pair can be reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WindowSize {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: Some(width), height: Some(height) }
    }

    pub fn is_set(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// Player options shared by the `[defaults]` table and every `[[windows]]` entry.
/// Anything left unset on a window falls back to `[defaults]`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_aspect: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_aspect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_border: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<WindowSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_width_no_new_aspect: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_height_no_new_aspect: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtsp_stream_over_tcp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtsp_stream_over_http: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefer_ipv4: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_only_proxy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_output_driver: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_sound: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SlotConfig {
    /// Position in the `windows` list, assigned by [`GlobalConfig::prepare`].
    #[serde(skip)]
    pub index: usize,
    #[serde(default)]
    pub streams: Vec<String>,
    #[serde(flatten)]
    pub options: PlayerOptions,
}

impl SlotConfig {
    pub fn new(index: usize, streams: Vec<String>) -> Self {
        Self {
            index,
            streams,
            options: PlayerOptions::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.streams.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlayerSettings {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_display")]
    pub display: String,
    /// Relaunch a window whose playlist has a single entry on every tick.
    #[serde(default = "default_relaunch_unchanged")]
    pub relaunch_unchanged: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GlobalConfig {
    #[serde(
        default = "default_stream_interval",
        deserialize_with = "deserialize_interval",
        serialize_with = "humantime_serde::serialize"
    )]
    pub stream_interval: Duration,
    #[serde(default)]
    pub layout: Arrangement,
    #[serde(default)]
    pub player: PlayerSettings,
    #[serde(default)]
    pub defaults: PlayerOptions,
    #[serde(default, rename = "windows")]
    pub slots: Vec<SlotConfig>,
}

// Default values
fn default_stream_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_binary() -> String {
    "mplayer".to_string()
}

fn default_display() -> String {
    ":0".to_string()
}

fn default_relaunch_unchanged() -> bool {
    true
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            display: default_display(),
            relaunch_unchanged: default_relaunch_unchanged(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            stream_interval: default_stream_interval(),
            layout: Arrangement::default(),
            player: PlayerSettings::default(),
            defaults: PlayerOptions::default(),
            slots: Vec::new(),
        }
    }
}

impl GlobalConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(MpcycleError::Config(ConfigError::FileRead {
                path: config_path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "File not found"),
            }));
        }

        let content = std::fs::read_to_string(config_path)
            .map_err(|e| MpcycleError::Config(ConfigError::FileRead {
                path: config_path.to_path_buf(),
                source: e,
            }))?;

        let mut config = Self::from_toml_str(&content)?;
        config.prepare()?;

        log::info!("Loaded {} window(s) from {:?}", config.slots.len(), config_path);
        Ok(config)
    }

    /// Parses without preparing; callers run [`GlobalConfig::prepare`] before use.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GlobalConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(MpcycleError::Config(ConfigError::NoConfigDir))?
            .join("mpcycle");

        Ok(config_dir.join("config.toml"))
    }

    /// Assigns window indices, validates, and derives positions for the chosen layout.
    /// Runs once per received configuration, before any rotation.
    pub fn prepare(&mut self) -> Result<()> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            slot.index = index;
        }

        self.validate()?;
        resolve_positions(self)?;

        log::debug!("Configuration prepared: {} window(s), layout {}, interval {}",
            self.slots.len(), self.layout,
            mpcycle_common::format_duration(self.stream_interval));
        Ok(())
    }

    pub fn slot(&self, index: usize) -> Option<&SlotConfig> {
        self.slots.get(index)
    }

    fn validate(&self) -> Result<()> {
        if self.stream_interval.is_zero() {
            return Err(MpcycleError::Config(ConfigError::InvalidValue {
                field: "stream_interval".to_string(),
                value: format!("{:?}", self.stream_interval),
            }));
        }

        if self.player.binary.trim().is_empty() {
            return Err(MpcycleError::Config(ConfigError::InvalidValue {
                field: "player.binary".to_string(),
                value: self.player.binary.clone(),
            }));
        }

        for slot in &self.slots {
            if let Some(pos) = slot.streams.iter().position(|s| s.trim().is_empty()) {
                return Err(MpcycleError::Config(ConfigError::Validation {
                    message: format!("Window {}: stream {} is empty", slot.index, pos),
                }));
            }
        }

        if !self.slots.iter().any(SlotConfig::is_active) {
            log::warn!("No window has any streams configured; nothing will play");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
stream_interval = 30000
layout = "row"

[player]
display = ":1"

[defaults]
no_border = true
rotate = -1
window_position = { x = 5, y = 225 }
window_size = { width = 640, height = 360 }
video_output_driver = ["xv", "gl"]

[[windows]]
streams = ["rtsp://cam1/stream", "rtsp://cam2/stream"]

[[windows]]
streams = ["http://stream.example.com/video2"]
no_sound = true
rtsp_stream_over_tcp = true

[[windows]]
"#;

    #[test]
    fn test_parse_sample_config() {
        let mut config = GlobalConfig::from_toml_str(SAMPLE).unwrap();
        config.prepare().unwrap();

        assert_eq!(config.stream_interval, Duration::from_millis(30000));
        assert_eq!(config.layout, Arrangement::Row);
        assert_eq!(config.player.binary, "mplayer");
        assert_eq!(config.player.display, ":1");
        assert!(config.player.relaunch_unchanged);
        assert_eq!(config.defaults.no_border, Some(true));
        assert_eq!(config.slots.len(), 3);
        assert_eq!(config.slots[1].index, 1);
        assert_eq!(config.slots[1].options.no_sound, Some(true));
        assert!(!config.slots[2].is_active());
    }

    #[test]
    fn test_interval_accepts_humantime() {
        let config = GlobalConfig::from_toml_str("stream_interval = \"1m 30s\"").unwrap();
        assert_eq!(config.stream_interval, Duration::from_secs(90));
    }

    #[test]
    fn test_empty_layout_string_means_none() {
        let config = GlobalConfig::from_toml_str("layout = \"\"").unwrap();
        assert_eq!(config.layout, Arrangement::None);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = GlobalConfig::from_toml_str("stream_interval = 0").unwrap();
        match config.prepare() {
            Err(MpcycleError::Config(ConfigError::InvalidValue { field, .. })) => {
                assert_eq!(field, "stream_interval");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_stream_rejected() {
        let mut config = GlobalConfig::from_toml_str(r#"
[[windows]]
streams = ["rtsp://cam1", " "]
window_position = { x = 0, y = 0 }
"#).unwrap();
        assert!(matches!(
            config.prepare(),
            Err(MpcycleError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_interval_and_options() {
        let mut config = GlobalConfig::from_toml_str(SAMPLE).unwrap();
        config.prepare().unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let mut restored: GlobalConfig = serde_json::from_str(&json).unwrap();
        restored.prepare().unwrap();

        assert_eq!(restored, config);
    }

    #[test]
    fn test_load_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = GlobalConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.slots.len(), 3);
        assert_eq!(config.slots[1].options.window_position, Some(Position { x: 650, y: 225 }));
    }

    #[test]
    fn test_load_missing_file() {
        let result = GlobalConfig::load_from_path(Path::new("/nonexistent/mpcycle.toml"));
        assert!(matches!(result, Err(MpcycleError::Config(ConfigError::FileRead { .. }))));
    }
}
