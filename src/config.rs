//! Feedback configuration
//!
//! Read by the states every tick. The only value the core writes is
//! `screen_fps`, which a starting sequence replaces with its own rate.
//!
//! Persisted as JSON (`seqstim.json`); missing keys take their defaults.
//! Experiment control can update single parameters at runtime through
//! [`FeedbackConfig::set_param`].

use anyhow::{Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::entities::BlockInfo;
use crate::error::ConfigError;

pub use crate::paths::{PathConfig, config_file, data_file, ensure_dirs};

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "seqstim.json";

/// Seconds to whole frames at `fps`, rounding down
///
/// A small epsilon keeps products like `2.3 * 10.0` from landing on 22.
pub fn seconds_to_frames(seconds: f64, fps: f64) -> u64 {
    let frames = seconds * fps;
    if frames.is_nan() || frames <= 0.0 {
        return 0;
    }
    (frames + 1e-9).floor() as u64
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Emit a sync marker every 50 frames of a sequence
    pub sync_markers_enabled: bool,
    /// Seconds between two sequences of the same block
    pub inter_sequence_delay: f64,
    /// Seconds an overlay stays visible after a trigger
    pub overlay_duration: f64,
    pub overlay_color: [u8; 4],
    /// Draw a photodiode patch after frames that sent a marker
    pub optomarker_enabled: bool,
    /// Frames the patch stays visible, counting the marker frame
    pub optomarker_frames: u64,
    /// Minimal delay between `start_playback` and the first frame
    pub playback_delay: f64,
    /// Current tick rate; replaced by each sequence's fps when it starts
    pub screen_fps: f64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub display_debug_information: bool,
    /// Descriptor consumed by the next `start_preload`
    pub next_block_info: BlockInfo,
    /// Prefix for per-block log files
    pub log_prefix_block: String,
    /// Directory for per-block config dumps; disabled when unset
    pub log_dir: Option<PathBuf>,
    /// Wall-clock budget for image loading per preload tick
    pub preload_budget_ms: u64,
    /// Images loaded per `cache_batch` call
    pub cache_batch_size: usize,
    /// Optional JSON stimulus marker table
    pub marker_table: Option<PathBuf>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            sync_markers_enabled: true,
            inter_sequence_delay: 3.0,
            overlay_duration: 1.0,
            overlay_color: [0, 0, 0, 255],
            optomarker_enabled: true,
            optomarker_frames: 2,
            playback_delay: 1.0,
            screen_fps: 60.0,
            screen_width: 1920,
            screen_height: 1080,
            display_debug_information: false,
            next_block_info: BlockInfo::default(),
            log_prefix_block: "defaultblock".to_string(),
            log_dir: None,
            preload_budget_ms: 100,
            cache_batch_size: 5,
            marker_table: None,
        }
    }
}

impl FeedbackConfig {
    /// Load config from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }

    /// Write the active config to `<log_dir>/<log_prefix_block>_config.json`
    ///
    /// Returns the written path, or `None` when `log_dir` is unset.
    pub fn dump_block_settings(&self) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.log_dir else {
            return Ok(None);
        };
        let path = dir.join(format!("{}_config.json", self.log_prefix_block));
        self.save(&path)?;
        Ok(Some(path))
    }

    pub fn preload_budget(&self) -> Duration {
        Duration::from_millis(self.preload_budget_ms)
    }

    /// Real-time duration of one tick at the current `screen_fps`
    pub fn frame_duration(&self) -> Duration {
        if self.screen_fps > 0.0 {
            Duration::from_secs_f64(1.0 / self.screen_fps)
        } else {
            Duration::from_millis(16)
        }
    }

    /// Update a single parameter by name
    ///
    /// `next_block_info` additionally accepts a descriptor string or an array
    /// of character codes; a malformed descriptor is logged and ignored.
    pub fn set_param(&mut self, name: &str, value: serde_json::Value) -> Result<(), ConfigError> {
        if name == "next_block_info" {
            return self.set_block_info(value);
        }

        let mut current = serde_json::to_value(&*self).map_err(|source| ConfigError::InvalidValue {
            name: name.to_string(),
            source,
        })?;
        let Some(slot) = current.get_mut(name) else {
            return Err(ConfigError::UnknownParam(name.to_string()));
        };
        *slot = value;

        *self = serde_json::from_value(current).map_err(|source| ConfigError::InvalidValue {
            name: name.to_string(),
            source,
        })?;
        info!("Config: {} updated", name);
        Ok(())
    }

    fn set_block_info(&mut self, value: serde_json::Value) -> Result<(), ConfigError> {
        let parsed = match &value {
            serde_json::Value::String(s) => BlockInfo::parse(s),
            serde_json::Value::Array(items) if items.iter().all(|v| v.is_number()) => {
                let codes: Vec<f64> = items.iter().filter_map(|v| v.as_f64()).collect();
                BlockInfo::from_char_codes(&codes)
            }
            _ => BlockInfo::parse(&value.to_string()),
        };

        match parsed {
            Ok(block) if !block.is_empty() => {
                info!("Updated block info to {:?}", block);
                self.next_block_info = block;
                Ok(())
            }
            Ok(_) => {
                error!("Ignoring empty block info {}", value);
                Ok(())
            }
            Err(e) => {
                error!("Ignoring malformed block info {}: {}", value, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let c = FeedbackConfig::default();
        assert!(c.sync_markers_enabled);
        assert_eq!(c.inter_sequence_delay, 3.0);
        assert_eq!(c.preload_budget(), Duration::from_millis(100));
        assert!(c.next_block_info.is_empty());
    }

    #[test]
    fn test_seconds_to_frames() {
        assert_eq!(seconds_to_frames(1.0, 10.0), 10);
        assert_eq!(seconds_to_frames(2.3, 10.0), 23);
        assert_eq!(seconds_to_frames(0.25, 10.0), 2);
        assert_eq!(seconds_to_frames(0.0, 60.0), 0);
        assert_eq!(seconds_to_frames(-1.0, 60.0), 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: FeedbackConfig = serde_json::from_str(r#"{"screen_fps": 30}"#).unwrap();
        assert_eq!(c.screen_fps, 30.0);
        assert_eq!(c.cache_batch_size, 5);
    }

    #[test]
    fn test_set_param_generic() {
        let mut c = FeedbackConfig::default();
        c.set_param("overlay_duration", json!(2.5)).unwrap();
        c.set_param("display_debug_information", json!(true)).unwrap();
        assert_eq!(c.overlay_duration, 2.5);
        assert!(c.display_debug_information);
    }

    #[test]
    fn test_set_param_rejects_unknown_and_bad_types() {
        let mut c = FeedbackConfig::default();
        assert!(matches!(
            c.set_param("warp_speed", json!(9)),
            Err(ConfigError::UnknownParam(_))
        ));
        assert!(matches!(
            c.set_param("screen_fps", json!("fast")),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(c, FeedbackConfig::default());
    }

    #[test]
    fn test_set_block_info_variants() {
        let mut c = FeedbackConfig::default();

        c.set_param("next_block_info", json!("[('a.txt', 10)]")).unwrap();
        assert_eq!(c.next_block_info, BlockInfo::from_pairs([("a.txt", 10)]));

        let codes: Vec<u32> = "[('b.txt', 5)]".chars().map(|ch| ch as u32).collect();
        c.set_param("next_block_info", json!(codes)).unwrap();
        assert_eq!(c.next_block_info, BlockInfo::from_pairs([("b.txt", 5)]));

        c.set_param("next_block_info", json!([["c.txt", 25]])).unwrap();
        assert_eq!(c.next_block_info, BlockInfo::from_pairs([("c.txt", 25)]));

        // Malformed descriptor leaves the previous one in place
        assert!(c.set_param("next_block_info", json!("nonsense")).is_err());
        assert_eq!(c.next_block_info, BlockInfo::from_pairs([("c.txt", 25)]));
    }

    #[test]
    fn test_save_load_and_dump() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = FeedbackConfig {
            screen_fps: 30.0,
            log_prefix_block: "block03".into(),
            ..Default::default()
        };
        let path = dir.path().join(CONFIG_FILE);
        c.save(&path).unwrap();
        assert_eq!(FeedbackConfig::load(&path).unwrap(), c);

        assert_eq!(c.dump_block_settings().unwrap(), None);
        c.log_dir = Some(dir.path().to_path_buf());
        let dumped = c.dump_block_settings().unwrap().unwrap();
        assert_eq!(dumped, dir.path().join("block03_config.json"));
        assert!(dumped.is_file());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let c = FeedbackConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(c, FeedbackConfig::default());
    }
}
