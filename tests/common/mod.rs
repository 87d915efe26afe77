//! Shared fixtures for the end-to-end tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use teto::{
    AssetResolver, CompositeClip, MediaBackend, MediaInfo, MediaKind, NarrationSegment,
    OutputConfig, Scene, Script, ScriptOutput, SynthesizedAudio, TetoError, TetoResult,
    TimingConfig, TtsProvider, Visual, VoiceConfig,
};

/// Backend that probes from extension tables and records every encode.
#[derive(Default)]
pub struct RecordingBackend {
    pub encoded: Mutex<Vec<(CompositeClip, OutputConfig)>>,
}

impl MediaBackend for RecordingBackend {
    fn probe(&self, path: &Path) -> TetoResult<MediaInfo> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Ok(match ext {
            "mp4" | "mov" => MediaInfo {
                kind: MediaKind::Video,
                duration: Some(10.0),
                width: Some(1920),
                height: Some(1080),
                has_audio: true,
            },
            "mp3" | "wav" => MediaInfo {
                kind: MediaKind::Audio,
                duration: Some(10.0),
                width: None,
                height: None,
                has_audio: true,
            },
            _ => MediaInfo::still_image(1600, 900),
        })
    }

    fn encode(
        &self,
        composite: &CompositeClip,
        output: &OutputConfig,
        _verbose: bool,
    ) -> TetoResult<()> {
        self.encoded
            .lock()
            .unwrap()
            .push((composite.clone(), output.clone()));
        Ok(())
    }
}

/// Provider with a fixed one-second duration that records synthesized text.
#[derive(Default)]
pub struct RecordingTts {
    pub texts: Mutex<Vec<String>>,
}

impl TtsProvider for RecordingTts {
    fn synthesize(&self, text: &str, _: &VoiceConfig) -> TetoResult<SynthesizedAudio> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(SynthesizedAudio {
            bytes: format!("audio:{text}").into_bytes(),
            ext: "mp3".to_string(),
        })
    }

    fn estimate_duration(&self, _: &str, _: &VoiceConfig) -> f64 {
        1.0
    }
}

/// Resolver that trusts paths without touching the filesystem.
pub struct PassthroughResolver;

impl AssetResolver for PassthroughResolver {
    fn resolve(&self, visual: &Visual) -> TetoResult<PathBuf> {
        visual
            .path
            .clone()
            .ok_or_else(|| TetoError::validation("missing path"))
    }
}

pub fn narrated_scene(visual_path: &str, texts: &[&str]) -> Scene {
    Scene {
        narrations: texts
            .iter()
            .map(|t| NarrationSegment {
                text: t.to_string(),
                pause_after: 0.0,
            })
            .collect(),
        visual: Visual::from_path(visual_path),
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
    }
}

pub fn basic_script(scenes: Vec<Scene>) -> Script {
    Script {
        title: "fixture".to_string(),
        scenes,
        voice: VoiceConfig::default(),
        voice_profiles: Default::default(),
        timing: TimingConfig {
            default_segment_gap: 0.3,
            default_scene_gap: 0.5,
            subtitle_padding: 0.1,
        },
        bgm: None,
        bgm_sections: vec![],
        output: ScriptOutput::default(),
        subtitle_style: Default::default(),
        subtitle_styles: Default::default(),
        default_preset: None,
        default_effect: "default".to_string(),
        description: None,
    }
}

pub type SharedBackend = Arc<RecordingBackend>;

pub fn recording_backend() -> SharedBackend {
    Arc::new(RecordingBackend::default())
}
