//! The compiled, time-explicit project model.
//!
//! A [`Project`] is what the compiler emits and the render pipeline
//! consumes: every layer carries absolute times in seconds, so no relative
//! timing survives compilation. Projects serialize to JSON and can be
//! inspected or re-rendered without the originating script.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{TetoError, TetoResult};
use crate::output::OutputConfig;
use crate::subtitle::{PartialStyle, SubtitleStyleConfig};

/// A named, time-parameterized clip transform. `kind` is resolved against
/// the effect registry at render time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimationEffect {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl AnimationEffect {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            duration: None,
            params: serde_json::Value::Null,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn param_pair(&self, key: &str) -> Option<(f64, f64)> {
        let arr = self.params.get(key)?.as_array()?;
        if arr.len() != 2 {
            return None;
        }
        Some((arr[0].as_f64()?, arr[1].as_f64()?))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    #[default]
    Crossfade,
}

fn default_transition_duration() -> f64 {
    0.5
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionConfig {
    #[serde(default, rename = "type")]
    pub kind: TransitionKind,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            kind: TransitionKind::default(),
            duration: default_transition_duration(),
        }
    }
}

fn default_volume() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

fn default_stamp_margin() -> u32 {
    20
}

/// A video clip on the base track.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoLayer {
    pub path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    /// Playback volume; 0.0 drops the source audio entirely.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Loop the source when it is shorter than the layer span.
    #[serde(default = "default_true", rename = "loop")]
    pub loop_playback: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<AnimationEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionConfig>,
}

/// A still image on the base track, shown for its full span.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageLayer {
    pub path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<AnimationEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionConfig>,
}

/// Base-track layer: exactly one of video or image.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VisualLayer {
    Video(VideoLayer),
    Image(ImageLayer),
}

impl VisualLayer {
    pub fn start_time(&self) -> f64 {
        match self {
            Self::Video(l) => l.start_time,
            Self::Image(l) => l.start_time,
        }
    }

    pub fn end_time(&self) -> f64 {
        match self {
            Self::Video(l) => l.end_time,
            Self::Image(l) => l.end_time,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Video(l) => &l.path,
            Self::Image(l) => &l.path,
        }
    }

    pub fn transition(&self) -> Option<&TransitionConfig> {
        match self {
            Self::Video(l) => l.transition.as_ref(),
            Self::Image(l) => l.transition.as_ref(),
        }
    }
}

/// Narration clips, sound effects, and BGM. Audio layers may overlap freely.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioLayer {
    pub path: PathBuf,
    pub start_time: f64,
    /// Playback window length; `None` plays the source to its natural end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
    /// Loop the source to fill `duration` (BGM shorter than the project).
    #[serde(default, rename = "loop")]
    pub loop_playback: bool,
}

impl AudioLayer {
    pub fn narration(path: impl Into<PathBuf>, start_time: f64, duration: f64) -> Self {
        Self {
            path: path.into(),
            start_time,
            duration: Some(duration),
            volume: 1.0,
            fade_in: 0.0,
            fade_out: 0.0,
            loop_playback: false,
        }
    }

    pub fn end_time(&self) -> Option<f64> {
        self.duration.map(|d| self.start_time + d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionPreset {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Decorative overlay bounded to a time window.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StampLayer {
    pub path: PathBuf,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_preset: Option<PositionPreset>,
    /// Pixel coordinates; preset wins when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(f64, f64)>,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Inset from the frame edge when a preset position is used.
    #[serde(default = "default_stamp_margin")]
    pub margin: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<AnimationEffect>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleItem {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleLayer {
    #[serde(default)]
    pub items: Vec<SubtitleItem>,
    #[serde(default)]
    pub style: SubtitleStyleConfig,
    /// Markup tag name → span-level override.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub partial_styles: BTreeMap<String, PartialStyle>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub video_layers: Vec<VisualLayer>,
    #[serde(default)]
    pub audio_layers: Vec<AudioLayer>,
    #[serde(default)]
    pub subtitle_layers: Vec<SubtitleLayer>,
    #[serde(default)]
    pub stamp_layers: Vec<StampLayer>,
}

impl Timeline {
    /// Total project duration: the last base-track layer's end time.
    pub fn duration(&self) -> f64 {
        self.video_layers
            .last()
            .map(VisualLayer::end_time)
            .unwrap_or(0.0)
    }

    /// Check the structural invariants the compiler guarantees: the base
    /// track is ordered by start time and non-overlapping, and every layer
    /// span is non-negative.
    pub fn validate(&self) -> TetoResult<()> {
        let mut problems = Vec::new();

        for (i, layer) in self.video_layers.iter().enumerate() {
            if layer.end_time() < layer.start_time() {
                problems.push(format!("video layer {i} ends before it starts"));
            }
            if let Some(prev) = i.checked_sub(1).and_then(|p| self.video_layers.get(p)) {
                if layer.start_time() < prev.start_time() {
                    problems.push(format!("video layer {i} starts before layer {}", i - 1));
                }
            }
        }
        for (i, layer) in self.stamp_layers.iter().enumerate() {
            if layer.end_time < layer.start_time {
                problems.push(format!("stamp layer {i} ends before it starts"));
            }
        }
        for (li, layer) in self.subtitle_layers.iter().enumerate() {
            for (ii, item) in layer.items.iter().enumerate() {
                if item.end_time < item.start_time {
                    problems.push(format!(
                        "subtitle layer {li} item {ii} ends before it starts"
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TetoError::validation(problems.join("; ")))
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub output: OutputConfig,
    pub timeline: Timeline,
}

impl Project {
    pub fn from_json_file(path: &Path) -> TetoResult<Self> {
        use anyhow::Context as _;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project '{}'", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| TetoError::validation(format!("invalid project JSON: {e}")))
    }

    pub fn to_json_file(&self, path: &Path) -> TetoResult<()> {
        use anyhow::Context as _;
        crate::output::ensure_parent_dir(path)?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| TetoError::internal(format!("project serialization failed: {e}")))?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write project '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputConfig, OutputSettings};

    fn image_layer(start: f64, end: f64) -> VisualLayer {
        VisualLayer::Image(ImageLayer {
            path: PathBuf::from("a.png"),
            start_time: start,
            end_time: end,
            effects: vec![],
            transition: None,
        })
    }

    #[test]
    fn duration_is_last_video_layer_end() {
        let timeline = Timeline {
            video_layers: vec![image_layer(0.0, 2.0), image_layer(2.0, 5.5)],
            ..Timeline::default()
        };
        assert_eq!(timeline.duration(), 5.5);
        assert_eq!(Timeline::default().duration(), 0.0);
    }

    #[test]
    fn validate_rejects_unordered_base_track() {
        let timeline = Timeline {
            video_layers: vec![image_layer(2.0, 4.0), image_layer(0.0, 2.0)],
            ..Timeline::default()
        };
        let err = timeline.validate().unwrap_err().to_string();
        assert!(err.contains("starts before layer 0"));
    }

    #[test]
    fn validate_rejects_negative_spans() {
        let timeline = Timeline {
            video_layers: vec![image_layer(3.0, 1.0)],
            ..Timeline::default()
        };
        assert!(timeline.validate().is_err());
    }

    #[test]
    fn project_json_round_trip() {
        let project = Project {
            output: OutputConfig::from_settings(&OutputSettings::default(), "out.mp4"),
            timeline: Timeline {
                video_layers: vec![image_layer(0.0, 1.2)],
                audio_layers: vec![AudioLayer::narration("n.mp3", 0.1, 1.0)],
                subtitle_layers: vec![SubtitleLayer {
                    items: vec![SubtitleItem {
                        text: "Hello".to_string(),
                        start_time: 0.0,
                        end_time: 1.2,
                    }],
                    style: Default::default(),
                    partial_styles: Default::default(),
                }],
                stamp_layers: vec![],
            },
        };

        let json = serde_json::to_string_pretty(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
        assert!(json.contains(r#""type": "image""#));
    }

    #[test]
    fn animation_effect_param_accessors() {
        let fx = AnimationEffect::new("kenBurns").with_params(serde_json::json!({
            "start_scale": 1.0,
            "pan_start": [-0.1, 0.0],
            "easing": "linear",
        }));
        assert_eq!(fx.param_f64("start_scale"), Some(1.0));
        assert_eq!(fx.param_pair("pan_start"), Some((-0.1, 0.0)));
        assert_eq!(fx.param_str("easing"), Some("linear"));
        assert_eq!(fx.param_f64("missing"), None);
    }
}
