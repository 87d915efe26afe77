//! The declarative script model: what callers author, in JSON.
//!
//! A [`Script`] is immutable input, parsed once per compile. Validation is
//! pure (no I/O) and reports every violation it finds with its scene or
//! segment location, rather than stopping at the first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{TetoError, TetoResult};
use crate::markup;
use crate::output::OutputSettings;
use crate::presets::{EffectPresetRegistry, ScenePresetRegistry};
use crate::subtitle::{PartialStyle, SubtitleStyleConfig};
use crate::timeline::{AnimationEffect, PositionPreset, TransitionConfig};

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProviderKind {
    #[default]
    Google,
    Openai,
    Voicevox,
    Elevenlabs,
    Gemini,
    /// Offline provider used by tests and dry runs.
    Mock,
}

fn default_language_code() -> String {
    "ja-JP".to_string()
}

fn default_speed() -> f64 {
    1.0
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_output_format() -> String {
    "mp3_44100_128".to_string()
}

fn default_voice_name() -> String {
    "Kore".to_string()
}

fn default_gemini_model_id() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

/// Narration voice settings. These fields — and only these — enter the TTS
/// cache key, so two configs equal on them are interchangeable.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub provider: TtsProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default = "default_language_code")]
    pub language_code: String,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub pitch: f64,
    // ElevenLabs
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    // Gemini
    #[serde(default = "default_voice_name")]
    pub voice_name: String,
    #[serde(default = "default_gemini_model_id")]
    pub gemini_model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_prompt: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            provider: TtsProviderKind::default(),
            voice_id: None,
            language_code: default_language_code(),
            speed: default_speed(),
            pitch: 0.0,
            model_id: default_model_id(),
            output_format: default_output_format(),
            voice_name: default_voice_name(),
            gemini_model_id: default_gemini_model_id(),
            style_prompt: None,
        }
    }
}

impl VoiceConfig {
    fn collect_problems(&self, location: &str, problems: &mut Vec<String>) {
        if !(0.5..=2.0).contains(&self.speed) {
            problems.push(format!("{location}: voice speed must be in [0.5, 2.0]"));
        }
        if !(-20.0..=20.0).contains(&self.pitch) {
            problems.push(format!("{location}: voice pitch must be in [-20, 20]"));
        }
    }
}

// ---------------------------------------------------------------------------
// Visuals
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Image,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v"];

/// AI image generation request, interpreted by the asset resolver.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerateConfig {
    #[serde(default = "default_generate_provider")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

fn default_generate_provider() -> String {
    "stability".to_string()
}

/// The visual of a scene: a local file, or a generation request.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Visual {
    /// Explicit kind; inferred from the path extension when unset.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssetKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Prompt text when `generate` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate: Option<GenerateConfig>,
}

impl Visual {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: None,
            path: Some(path.into()),
            description: None,
            generate: None,
        }
    }

    /// Effective kind: explicit, else by extension, else image.
    pub fn resolved_kind(&self) -> AssetKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        let is_video = self
            .path
            .as_deref()
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video {
            AssetKind::Video
        } else {
            AssetKind::Image
        }
    }

    fn collect_problems(&self, location: &str, problems: &mut Vec<String>) {
        if self.generate.is_some() && self.description.is_none() {
            problems.push(format!(
                "{location}: visual generation requires a description prompt"
            ));
        }
        if self.path.is_none() && self.description.is_none() {
            problems.push(format!(
                "{location}: visual needs either a path or a description"
            ));
        }
        if self.path.is_some() && self.generate.is_some() {
            problems.push(format!(
                "{location}: visual cannot set both path and generate"
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SoundEffect {
    pub path: PathBuf,
    /// Offset from scene start, seconds.
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_unit_volume")]
    pub volume: f64,
}

fn default_unit_volume() -> f64 {
    1.0
}

/// A decorative overlay declared on a scene, compiled to a stamp layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StampConfig {
    pub path: PathBuf,
    /// Offset from scene start, seconds.
    #[serde(default)]
    pub offset: f64,
    /// Visible span; `None` shows the stamp until the scene ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_preset: Option<PositionPreset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(f64, f64)>,
    #[serde(default = "default_unit_volume")]
    pub scale: f64,
    #[serde(default = "default_unit_volume")]
    pub opacity: f64,
    #[serde(default = "default_stamp_margin")]
    pub margin: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<AnimationEffect>,
}

fn default_stamp_margin() -> u32 {
    20
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NarrationSegment {
    /// Subtitle text, possibly with inline markup. TTS receives the
    /// stripped form.
    pub text: String,
    #[serde(default)]
    pub pause_after: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub narrations: Vec<NarrationSegment>,
    pub visual: Visual,
    /// Required when `narrations` is empty; ignored otherwise (the computed
    /// span wins).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub pause_after: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sound_effects: Vec<SoundEffect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stamps: Vec<StampConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default)]
    pub mute_video: bool,
    /// Direction memo for humans; not used by processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_profile: Option<String>,
}

// ---------------------------------------------------------------------------
// Script-level settings
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingConfig {
    /// Default gap between narration segments, seconds.
    #[serde(default = "default_segment_gap")]
    pub default_segment_gap: f64,
    /// Default gap between scenes, seconds.
    #[serde(default = "default_scene_gap")]
    pub default_scene_gap: f64,
    /// Lead-in/lead-out padding around each subtitle, seconds.
    #[serde(default = "default_subtitle_padding")]
    pub subtitle_padding: f64,
}

fn default_segment_gap() -> f64 {
    0.3
}

fn default_scene_gap() -> f64 {
    0.5
}

fn default_subtitle_padding() -> f64 {
    0.1
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_segment_gap: default_segment_gap(),
            default_scene_gap: default_scene_gap(),
            subtitle_padding: default_subtitle_padding(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BgmConfig {
    pub path: PathBuf,
    #[serde(default = "default_bgm_volume")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
}

fn default_bgm_volume() -> f64 {
    0.3
}

/// Inclusive scene index range.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneRange {
    #[serde(rename = "from")]
    pub from: usize,
    pub to: usize,
}

/// BGM bound to a range of scenes. Sections take precedence over the
/// global `bgm`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BgmSection {
    pub path: PathBuf,
    pub scene_range: SceneRange,
    #[serde(default = "default_bgm_volume")]
    pub volume: f64,
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
    #[serde(default = "default_true", rename = "loop")]
    pub loop_playback: bool,
}

fn default_true() -> bool {
    true
}

/// Single or multiple output settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ScriptOutput {
    Single(OutputSettings),
    Multi(Vec<OutputSettings>),
}

impl Default for ScriptOutput {
    fn default() -> Self {
        Self::Single(OutputSettings::default())
    }
}

impl ScriptOutput {
    pub fn as_slice(&self) -> &[OutputSettings] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Multi(v) => v,
        }
    }
}

fn default_effect_name() -> String {
    "default".to_string()
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub title: String,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub voice_profiles: BTreeMap<String, VoiceConfig>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<BgmConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bgm_sections: Vec<BgmSection>,
    #[serde(default)]
    pub output: ScriptOutput,
    #[serde(default)]
    pub subtitle_style: SubtitleStyleConfig,
    /// Markup tag name → partial style for inline spans.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subtitle_styles: BTreeMap<String, PartialStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_preset: Option<String>,
    #[serde(default = "default_effect_name")]
    pub default_effect: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Script {
    pub fn from_json_str(json: &str) -> TetoResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TetoError::validation(format!("invalid script JSON: {e}")))
    }

    pub fn from_json_file(path: &Path) -> TetoResult<Self> {
        use anyhow::Context as _;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script '{}'", path.display()))?;
        Self::from_json_str(&content)
    }

    /// Validate the script against the given registries, collecting every
    /// violation. Runs before any TTS or asset I/O.
    pub fn validate(
        &self,
        effect_presets: &EffectPresetRegistry,
        scene_presets: &ScenePresetRegistry,
    ) -> TetoResult<()> {
        let mut problems = Vec::new();

        if self.scenes.is_empty() {
            problems.push("script must have at least one scene".to_string());
        }
        if self.title.trim().is_empty() {
            problems.push("script title must be non-empty".to_string());
        }

        self.voice.collect_problems("script voice", &mut problems);
        for (name, profile) in &self.voice_profiles {
            profile.collect_problems(&format!("voice profile '{name}'"), &mut problems);
        }

        if self.timing.default_segment_gap < 0.0
            || self.timing.default_scene_gap < 0.0
            || self.timing.subtitle_padding < 0.0
        {
            problems.push("timing values must be >= 0".to_string());
        }

        if let Some(bgm) = &self.bgm {
            if !(0.0..=1.0).contains(&bgm.volume) {
                problems.push("bgm volume must be in [0, 1]".to_string());
            }
            if bgm.fade_in < 0.0 || bgm.fade_out < 0.0 {
                problems.push("bgm fades must be >= 0".to_string());
            }
        }
        for (i, section) in self.bgm_sections.iter().enumerate() {
            if section.scene_range.to < section.scene_range.from {
                problems.push(format!(
                    "bgm section {i}: scene_range 'to' must be >= 'from'"
                ));
            }
            if !(0.0..=1.0).contains(&section.volume) {
                problems.push(format!("bgm section {i}: volume must be in [0, 1]"));
            }
        }

        for settings in self.output.as_slice() {
            if let Err(e) = settings.validate() {
                problems.push(e.to_string());
            }
        }
        if matches!(&self.output, ScriptOutput::Multi(v) if v.is_empty()) {
            problems.push("output list must not be empty".to_string());
        }

        if !effect_presets.contains(&self.default_effect) {
            problems.push(format!(
                "unknown default_effect '{}' (available: {})",
                self.default_effect,
                effect_presets.names().join(", ")
            ));
        }
        if let Some(name) = &self.default_preset {
            if !scene_presets.contains(name) {
                problems.push(format!("unknown default_preset '{name}'"));
            }
        }

        for (i, scene) in self.scenes.iter().enumerate() {
            self.collect_scene_problems(i, scene, effect_presets, scene_presets, &mut problems);
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(TetoError::Validation(problems.join("; ")))
        }
    }

    fn collect_scene_problems(
        &self,
        index: usize,
        scene: &Scene,
        effect_presets: &EffectPresetRegistry,
        scene_presets: &ScenePresetRegistry,
        problems: &mut Vec<String>,
    ) {
        let loc = format!("scene {index}");

        if scene.narrations.is_empty() {
            match scene.duration {
                None => problems.push(format!(
                    "{loc}: a scene without narrations requires an explicit duration"
                )),
                Some(d) if d <= 0.0 => {
                    problems.push(format!("{loc}: duration must be positive"))
                }
                Some(_) => {}
            }
        }
        if scene.pause_after < 0.0 {
            problems.push(format!("{loc}: pause_after must be >= 0"));
        }

        scene.visual.collect_problems(&loc, problems);

        if scene.voice.is_some() && scene.voice_profile.is_some() {
            problems.push(format!(
                "{loc}: voice and voice_profile cannot both be set"
            ));
        }
        if let Some(voice) = &scene.voice {
            voice.collect_problems(&loc, problems);
        }
        if let Some(profile) = &scene.voice_profile {
            if !self.voice_profiles.contains_key(profile) {
                problems.push(format!(
                    "{loc}: unknown voice_profile '{profile}' (define it in voice_profiles)"
                ));
            }
        }

        if let Some(effect) = &scene.effect {
            if !effect_presets.contains(effect) {
                problems.push(format!("{loc}: unknown effect '{effect}'"));
            }
        }
        if let Some(preset) = &scene.preset {
            if !scene_presets.contains(preset) {
                problems.push(format!("{loc}: unknown preset '{preset}'"));
            }
        }

        if let Some(transition) = &scene.transition {
            if transition.duration <= 0.0 {
                problems.push(format!("{loc}: transition duration must be > 0"));
            }
        }

        for (j, se) in scene.sound_effects.iter().enumerate() {
            if se.offset < 0.0 {
                problems.push(format!("{loc} sound effect {j}: offset must be >= 0"));
            }
            if !(0.0..=1.0).contains(&se.volume) {
                problems.push(format!("{loc} sound effect {j}: volume must be in [0, 1]"));
            }
        }
        for (j, stamp) in scene.stamps.iter().enumerate() {
            if !(0.0..=1.0).contains(&stamp.opacity) {
                problems.push(format!("{loc} stamp {j}: opacity must be in [0, 1]"));
            }
            if stamp.scale <= 0.0 {
                problems.push(format!("{loc} stamp {j}: scale must be > 0"));
            }
        }

        for (j, segment) in scene.narrations.iter().enumerate() {
            let seg_loc = format!("{loc} segment {j}");
            if segment.text.trim().is_empty() {
                problems.push(format!("{seg_loc}: narration text must be non-empty"));
            }
            if segment.pause_after < 0.0 {
                problems.push(format!("{seg_loc}: pause_after must be >= 0"));
            }
            for tag in markup::referenced_tags(&segment.text) {
                if !self.subtitle_styles.contains_key(&tag) {
                    problems.push(format!(
                        "{seg_loc}: unknown markup tag '{tag}' (define it in subtitle_styles)"
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{EffectPresetRegistry, ScenePresetRegistry};

    fn registries() -> (EffectPresetRegistry, ScenePresetRegistry) {
        (
            EffectPresetRegistry::builtin(),
            ScenePresetRegistry::builtin(),
        )
    }

    fn minimal_script() -> Script {
        Script {
            title: "t".to_string(),
            scenes: vec![Scene {
                narrations: vec![NarrationSegment {
                    text: "Hello".to_string(),
                    pause_after: 0.0,
                }],
                visual: Visual::from_path("a.png"),
                duration: None,
                pause_after: 0.0,
                transition: None,
                sound_effects: vec![],
                stamps: vec![],
                preset: None,
                effect: None,
                mute_video: false,
                note: None,
                voice: None,
                voice_profile: None,
            }],
            voice: VoiceConfig::default(),
            voice_profiles: BTreeMap::new(),
            timing: TimingConfig::default(),
            bgm: None,
            bgm_sections: vec![],
            output: ScriptOutput::default(),
            subtitle_style: SubtitleStyleConfig::default(),
            subtitle_styles: BTreeMap::new(),
            default_preset: None,
            default_effect: "default".to_string(),
            description: None,
        }
    }

    #[test]
    fn minimal_script_validates() {
        let (fx, presets) = registries();
        minimal_script().validate(&fx, &presets).unwrap();
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = Script::from_json_str(
            r#"{"title": "t", "scenes": [], "surprise": true}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("surprise"));
    }

    #[test]
    fn scene_without_narration_requires_duration() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].narrations.clear();
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("scene 0"));
        assert!(err.contains("requires an explicit duration"));
    }

    #[test]
    fn zero_duration_without_narration_is_rejected() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].narrations.clear();
        script.scenes[0].duration = Some(0.0);
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("duration must be positive"));
    }

    #[test]
    fn voice_and_profile_conflict_is_rejected() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].voice = Some(VoiceConfig::default());
        script.scenes[0].voice_profile = Some("n".to_string());
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("cannot both be set"));
    }

    #[test]
    fn unknown_voice_profile_is_rejected() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].voice_profile = Some("missing".to_string());
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("unknown voice_profile 'missing'"));
    }

    #[test]
    fn unknown_markup_tag_is_rejected() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].narrations[0].text = "a<em>b</em>".to_string();
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("unknown markup tag 'em'"));

        script
            .subtitle_styles
            .insert("em".to_string(), PartialStyle::default());
        script.validate(&fx, &presets).unwrap();
    }

    #[test]
    fn all_violations_are_reported_together() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.scenes[0].voice_profile = Some("missing".to_string());
        script.scenes[0].effect = Some("nope".to_string());
        script.voice.speed = 3.0;
        let err = script.validate(&fx, &presets).unwrap_err().to_string();
        assert!(err.contains("voice_profile"));
        assert!(err.contains("unknown effect 'nope'"));
        assert!(err.contains("speed"));
    }

    #[test]
    fn visual_kind_inference() {
        assert_eq!(Visual::from_path("a.mp4").resolved_kind(), AssetKind::Video);
        assert_eq!(Visual::from_path("a.MOV").resolved_kind(), AssetKind::Video);
        assert_eq!(Visual::from_path("a.png").resolved_kind(), AssetKind::Image);
        let explicit = Visual {
            kind: Some(AssetKind::Video),
            ..Visual::from_path("a.gif")
        };
        assert_eq!(explicit.resolved_kind(), AssetKind::Video);
    }

    #[test]
    fn output_parses_single_or_list() {
        let single: ScriptOutput =
            serde_json::from_str(r#"{"aspect_ratio": "16:9"}"#).unwrap();
        assert_eq!(single.as_slice().len(), 1);

        let multi: ScriptOutput =
            serde_json::from_str(r#"[{"aspect_ratio": "16:9"}, {"aspect_ratio": "9:16"}]"#)
                .unwrap();
        assert_eq!(multi.as_slice().len(), 2);
    }

    #[test]
    fn voice_config_range_checks() {
        let (fx, presets) = registries();
        let mut script = minimal_script();
        script.voice.pitch = 30.0;
        assert!(script.validate(&fx, &presets).is_err());
    }
}
