// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine configuration.
//!
//! Sets the shape of a new song and the playback parameters of the engine.
//! Files are YAML, or TOML when the path ends in `.toml`. Every field is
//! optional and falls back to its default.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::arrangement::Song;
use crate::sequencer::{check_tempo, DEFAULT_TEMPO};
use crate::synth::DEFAULT_VOLUME;

/// Engine and new-song settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Number of channels
    #[serde(default = "default_channels")]
    pub channels: usize,
    /// Song length in bars
    #[serde(default = "default_length")]
    pub length: usize,
    /// Pattern pool size per channel
    #[serde(default = "default_max_patterns")]
    pub max_patterns: usize,
    /// Tempo in BPM
    #[serde(default = "default_tempo")]
    pub tempo: f64,
    /// Frames per second the engine ticks itself at
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Piano roll grid increment in beats
    #[serde(default = "default_snap")]
    pub snap: f64,
    /// Wrap the playhead at the end of the song; otherwise playback stops there
    #[serde(default = "default_loop_playback")]
    pub loop_playback: bool,
    /// Synthesizer volume (0.0 - 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_channels() -> usize {
    4
}
fn default_length() -> usize {
    16
}
fn default_max_patterns() -> usize {
    4
}
fn default_tempo() -> f64 {
    DEFAULT_TEMPO
}
fn default_frame_rate() -> u32 {
    60
}
fn default_snap() -> f64 {
    1.0
}
fn default_loop_playback() -> bool {
    true
}
fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            length: default_length(),
            max_patterns: default_max_patterns(),
            tempo: default_tempo(),
            frame_rate: default_frame_rate(),
            snap: default_snap(),
            loop_playback: default_loop_playback(),
            volume: default_volume(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            Self::from_toml(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Save to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            bail!("channels must be at least 1");
        }
        if self.length == 0 {
            bail!("length must be at least 1 bar");
        }
        check_tempo(self.tempo).context("tempo must be a finite positive BPM value")?;
        if self.frame_rate == 0 {
            bail!("frame_rate must be positive");
        }
        if !(self.snap.is_finite() && self.snap > 0.0) {
            bail!("snap must be positive, got {}", self.snap);
        }
        if !(0.0..=1.0).contains(&self.volume) {
            bail!("volume must be between 0 and 1, got {}", self.volume);
        }
        Ok(())
    }

    /// Build an empty song with these settings
    pub fn build_song(&self) -> Result<Song> {
        let song = Song::new(self.channels, self.length, self.max_patterns)
            .with_tempo(self.tempo)?
            .with_loop_playback(self.loop_playback);
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.channels, 4);
        assert_eq!(config.length, 16);
        assert_eq!(config.max_patterns, 4);
        assert_eq!(config.tempo, 120.0);
        assert_eq!(config.frame_rate, 60);
        assert!(config.loop_playback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
channels: 2
length: 8
tempo: 90
loop_playback: false
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.channels, 2);
        assert_eq!(config.length, 8);
        assert_eq!(config.tempo, 90.0);
        assert!(!config.loop_playback);
        assert_eq!(config.snap, 1.0);
    }

    #[test]
    fn test_load_toml_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        fs::write(&path, "max_patterns = 8\nsnap = 0.5\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_patterns, 8);
        assert_eq!(config.snap, 0.5);
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        let config = EngineConfig {
            tempo: 150.0,
            frame_rate: 30,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(EngineConfig::load(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.yaml");
        fs::write(&path, "this is not valid yaml: [").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            EngineConfig { channels: 0, ..EngineConfig::default() },
            EngineConfig { length: 0, ..EngineConfig::default() },
            EngineConfig { tempo: 0.0, ..EngineConfig::default() },
            EngineConfig { tempo: f64::NAN, ..EngineConfig::default() },
            EngineConfig { frame_rate: 0, ..EngineConfig::default() },
            EngineConfig { snap: -1.0, ..EngineConfig::default() },
            EngineConfig { volume: 1.5, ..EngineConfig::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_load_rejects_invalid_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zero.yaml");
        fs::write(&path, "channels: 0\n").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }

    #[test]
    fn test_build_song() {
        let config = EngineConfig {
            channels: 3,
            length: 5,
            max_patterns: 2,
            tempo: 140.0,
            loop_playback: false,
            ..EngineConfig::default()
        };
        let song = config.build_song().unwrap();
        assert_eq!(song.channels().len(), 3);
        assert_eq!(song.length(), 5);
        assert_eq!(song.max_patterns(), 2);
        assert_eq!(song.tempo(), 140.0);
        assert!(!song.loop_playback());
    }

    #[test]
    fn test_slow_tempo_reaches_song_unchanged() {
        let config = EngineConfig::from_yaml("tempo: 10\n").unwrap();
        assert!(config.validate().is_ok());

        let mut song = config.build_song().unwrap();
        assert_eq!(song.tempo(), 10.0);
        song.play();
        song.tick(1.0);
        assert!((song.position() - 1.0 / 48.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_song_rejects_invalid_tempo() {
        let config = EngineConfig {
            tempo: -30.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(config.build_song().is_err());
    }
}
