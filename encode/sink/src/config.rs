/*!
    Output target configuration.
*/

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use encode_types::Medium;

use crate::error::Result;
use crate::presets::PresetSelection;

/**
    Where and how to encode.

    Option lists hold `key=value` strings applied in order. The target is
    read-only once handed to a session.
*/
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputTarget {
    /// Output path. Encoding is unavailable without one.
    pub file: Option<String>,
    /// Container name; guessed from the file extension when unset.
    pub format: Option<String>,
    pub format_options: Vec<String>,
    /// Video encoder name; the container default when unset.
    pub video_codec: Option<String>,
    pub video_options: Vec<String>,
    pub video_presets: PresetSelection,
    /// Audio encoder name; the container default when unset.
    pub audio_codec: Option<String>,
    pub audio_options: Vec<String>,
    /// Output frame rate. Values <= 0 mean "not set".
    pub fps: f64,
    /// Use the detected display frame rate when `fps` is not set.
    pub autofps: bool,
    /// Seconds added to video timestamps.
    pub video_offset: f64,
    /// Seconds added to audio timestamps.
    pub audio_offset: f64,
    /// Duplicate frames one tick at a time instead of stretching them.
    pub harddup: bool,
    /// Timestamp output from input presentation time, without hiding A/V skew.
    pub copyts: bool,
    /// Never drop video frames; push late ones forward instead.
    pub neverdrop: bool,
}

impl OutputTarget {
    /**
        Create a target writing to `file`.
    */
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            ..Self::default()
        }
    }

    /**
        Parse a target from JSON. Missing fields take their defaults.
    */
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /**
        Load a target from a JSON file.
    */
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_format_option(mut self, option: impl Into<String>) -> Self {
        self.format_options.push(option.into());
        self
    }

    pub fn with_video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    pub fn with_video_option(mut self, option: impl Into<String>) -> Self {
        self.video_options.push(option.into());
        self
    }

    pub fn with_video_presets(mut self, presets: PresetSelection) -> Self {
        self.video_presets = presets;
        self
    }

    pub fn with_audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn with_audio_option(mut self, option: impl Into<String>) -> Self {
        self.audio_options.push(option.into());
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_autofps(mut self, enabled: bool) -> Self {
        self.autofps = enabled;
        self
    }

    pub fn with_video_offset(mut self, seconds: f64) -> Self {
        self.video_offset = seconds;
        self
    }

    pub fn with_audio_offset(mut self, seconds: f64) -> Self {
        self.audio_offset = seconds;
        self
    }

    pub fn with_harddup(mut self, enabled: bool) -> Self {
        self.harddup = enabled;
        self
    }

    pub fn with_copyts(mut self, enabled: bool) -> Self {
        self.copyts = enabled;
        self
    }

    pub fn with_neverdrop(mut self, enabled: bool) -> Self {
        self.neverdrop = enabled;
        self
    }

    /**
        Requested encoder name for `medium`.
    */
    pub fn codec(&self, medium: Medium) -> Option<&str> {
        match medium {
            Medium::Video => self.video_codec.as_deref(),
            Medium::Audio => self.audio_codec.as_deref(),
        }
    }

    /**
        Option strings for the encoder of `medium`.
    */
    pub fn codec_options(&self, medium: Medium) -> &[String] {
        match medium {
            Medium::Video => &self.video_options,
            Medium::Audio => &self.audio_options,
        }
    }

    /**
        Timestamp offset in seconds for `medium`.
    */
    pub fn offset(&self, medium: Medium) -> f64 {
        match medium {
            Medium::Video => self.video_offset,
            Medium::Audio => self.audio_offset,
        }
    }
}
