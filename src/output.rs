//! Output settings and their render-time resolution.

use std::path::{Path, PathBuf};

use crate::error::{TetoError, TetoResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "21:9")]
    UltraWide,
    #[serde(rename = "4:3")]
    Standard,
}

impl AspectRatio {
    /// Derived frame size: height fixed at 1080 for landscape ratios and
    /// 1920 for portrait.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Landscape => (1920, 1080),
            Self::Portrait => (1080, 1920),
            Self::Square => (1080, 1080),
            Self::UltraWide => (2520, 1080),
            Self::Standard => (1440, 1080),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleMode {
    #[default]
    Burn,
    Srt,
    Vtt,
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFit {
    /// Scale to fit inside the frame, letterboxed with opaque black.
    #[default]
    Contain,
    /// Scale to cover the frame, center-cropping the excess.
    Cover,
    /// Scale to exactly the frame size, distorting if needed.
    Fill,
}

fn default_fps() -> u32 {
    30
}

fn default_codec() -> String {
    "libx264".to_string()
}

fn default_encoder_preset() -> String {
    "medium".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

/// Per-output settings as they appear in a script.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputSettings {
    /// Identifier when a script declares multiple outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_encoder_preset")]
    pub preset: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(default)]
    pub subtitle_mode: SubtitleMode,
    #[serde(default)]
    pub object_fit: ObjectFit,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            name: None,
            aspect_ratio: AspectRatio::default(),
            width: None,
            height: None,
            fps: default_fps(),
            codec: default_codec(),
            preset: default_encoder_preset(),
            audio_codec: default_audio_codec(),
            bitrate: None,
            subtitle_mode: SubtitleMode::default(),
            object_fit: ObjectFit::default(),
        }
    }
}

impl OutputSettings {
    /// Effective frame size: explicit width/height win over the ratio.
    pub fn resolved_dimensions(&self) -> (u32, u32) {
        let (dw, dh) = self.aspect_ratio.dimensions();
        (self.width.unwrap_or(dw), self.height.unwrap_or(dh))
    }

    pub fn validate(&self) -> TetoResult<()> {
        if self.fps == 0 {
            return Err(TetoError::validation("output fps must be > 0"));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(TetoError::validation("output width/height must be > 0"));
        }
        Ok(())
    }
}

/// Settings bound to a concrete target file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: String,
    pub preset: String,
    pub audio_codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    pub subtitle_mode: SubtitleMode,
    pub object_fit: ObjectFit,
}

impl OutputConfig {
    pub fn from_settings(settings: &OutputSettings, path: impl Into<PathBuf>) -> Self {
        let (width, height) = settings.resolved_dimensions();
        Self {
            path: path.into(),
            width,
            height,
            fps: settings.fps,
            codec: settings.codec.clone(),
            preset: settings.preset.clone(),
            audio_codec: settings.audio_codec.clone(),
            bitrate: settings.bitrate.clone(),
            subtitle_mode: settings.subtitle_mode,
            object_fit: settings.object_fit,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Sidecar path for srt/vtt modes, next to the video file.
    pub fn sidecar_path(&self) -> Option<PathBuf> {
        let ext = match self.subtitle_mode {
            SubtitleMode::Srt => "srt",
            SubtitleMode::Vtt => "vtt",
            _ => return None,
        };
        Some(self.path.with_extension(ext))
    }
}

pub fn ensure_parent_dir(path: &Path) -> TetoResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio_derives_dimensions() {
        assert_eq!(AspectRatio::Landscape.dimensions(), (1920, 1080));
        assert_eq!(AspectRatio::Portrait.dimensions(), (1080, 1920));
        assert_eq!(AspectRatio::Square.dimensions(), (1080, 1080));
        assert_eq!(AspectRatio::UltraWide.dimensions(), (2520, 1080));
        assert_eq!(AspectRatio::Standard.dimensions(), (1440, 1080));
    }

    #[test]
    fn explicit_dimensions_win_over_ratio() {
        let settings = OutputSettings {
            aspect_ratio: AspectRatio::Portrait,
            width: Some(720),
            height: Some(1280),
            ..OutputSettings::default()
        };
        assert_eq!(settings.resolved_dimensions(), (720, 1280));
    }

    #[test]
    fn settings_parse_with_defaults() {
        let settings: OutputSettings =
            serde_json::from_str(r#"{"aspect_ratio": "9:16"}"#).unwrap();
        assert_eq!(settings.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.codec, "libx264");
        assert_eq!(settings.subtitle_mode, SubtitleMode::Burn);
        assert_eq!(settings.object_fit, ObjectFit::Contain);
    }

    #[test]
    fn sidecar_path_tracks_mode() {
        let mut config = OutputConfig::from_settings(
            &OutputSettings::default(),
            "out/video.mp4",
        );
        assert_eq!(config.sidecar_path(), None);
        config.subtitle_mode = SubtitleMode::Srt;
        assert_eq!(config.sidecar_path(), Some(PathBuf::from("out/video.srt")));
        config.subtitle_mode = SubtitleMode::Vtt;
        assert_eq!(config.sidecar_path(), Some(PathBuf::from("out/video.vtt")));
    }
}
