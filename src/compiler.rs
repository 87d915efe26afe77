//! Script → Project compilation.
//!
//! The compiler validates a script, synthesizes (or retrieves) narration
//! audio, computes the absolute timeline, builds layers, and assembles one
//! [`Project`] per requested output. Compilation is deterministic: scenes
//! and segments are processed in declaration order, and identical input
//! with a warm cache yields byte-identical projects.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assets::AssetResolver;
use crate::cache::TtsCache;
use crate::error::{TetoError, TetoResult};
use crate::markup::strip_markup;
use crate::output::OutputConfig;
use crate::presets::{EffectPresetRegistry, ScenePreset, ScenePresetRegistry};
use crate::script::{AssetKind, Scene, Script, TimingConfig, VoiceConfig};
use crate::subtitle::SubtitleStyleConfig;
use crate::timeline::{
    AudioLayer, ImageLayer, Project, StampLayer, SubtitleItem, SubtitleLayer, Timeline,
    TransitionConfig, VideoLayer, VisualLayer,
};
use crate::tts::{with_retry, TtsProvider};

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentTiming {
    pub segment_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub narration_path: PathBuf,
    /// Original segment text, markup included.
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneTiming {
    pub scene_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub segments: Vec<SegmentTiming>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompileMetadata {
    pub total_duration: f64,
    pub scene_timings: Vec<SceneTiming>,
    pub generated_assets: Vec<PathBuf>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

#[derive(Clone, Debug)]
pub struct CompileResult {
    pub project: Project,
    pub metadata: CompileMetadata,
}

struct NarrationAudio {
    path: PathBuf,
    duration: f64,
}

/// Compiles scripts into projects. One compiler may serve many compiles;
/// it holds no per-script state.
pub struct ScriptCompiler {
    tts: Arc<dyn TtsProvider>,
    assets: Arc<dyn AssetResolver>,
    output_dir: PathBuf,
    cache: Option<TtsCache>,
    effect_presets: EffectPresetRegistry,
    scene_presets: ScenePresetRegistry,
}

impl ScriptCompiler {
    pub fn new(
        tts: Arc<dyn TtsProvider>,
        assets: Arc<dyn AssetResolver>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tts,
            assets,
            output_dir: output_dir.into(),
            cache: Some(TtsCache::default()),
            effect_presets: EffectPresetRegistry::builtin(),
            scene_presets: ScenePresetRegistry::builtin(),
        }
    }

    /// Use a specific cache, or disable caching entirely with `None`.
    pub fn with_cache(mut self, cache: Option<TtsCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_effect_presets(mut self, registry: EffectPresetRegistry) -> Self {
        self.effect_presets = registry;
        self
    }

    pub fn with_scene_presets(mut self, registry: ScenePresetRegistry) -> Self {
        self.scene_presets = registry;
        self
    }

    /// Compile against the script's first output settings.
    pub fn compile(&self, script: &Script, output_path: impl AsRef<Path>) -> TetoResult<CompileResult> {
        let settings = script
            .output
            .as_slice()
            .first()
            .cloned()
            .unwrap_or_default();
        self.compile_with_settings(script, &settings, output_path.as_ref())
    }

    /// Compile once per declared output, in declaration order. File names
    /// come from each output's `name` (else `output_NN`), under the
    /// compiler's output directory.
    pub fn compile_all(&self, script: &Script) -> TetoResult<Vec<CompileResult>> {
        let mut results = Vec::new();
        for (i, settings) in script.output.as_slice().iter().enumerate() {
            let stem = settings
                .name
                .clone()
                .unwrap_or_else(|| format!("output_{i:02}"));
            let path = self.output_dir.join(format!("{stem}.mp4"));
            results.push(self.compile_with_settings(script, settings, &path)?);
        }
        Ok(results)
    }

    fn compile_with_settings(
        &self,
        script: &Script,
        settings: &crate::output::OutputSettings,
        output_path: &Path,
    ) -> TetoResult<CompileResult> {
        // Validation fails fast, before any TTS or asset I/O.
        script.validate(&self.effect_presets, &self.scene_presets)?;

        self.prepare()?;

        let (narrations, cache_hits, cache_misses) = self.generate_narrations(script)?;
        let scene_timings = self.compute_timings(script, &narrations);

        let video_layers = self.build_video_layers(script, &scene_timings)?;
        let audio_layers = self.build_audio_layers(script, &scene_timings, &narrations);
        let subtitle_layers = self.build_subtitle_layers(script, &scene_timings);
        let stamp_layers = self.build_stamp_layers(script, &scene_timings);

        let timeline = Timeline {
            video_layers,
            audio_layers,
            subtitle_layers,
            stamp_layers,
        };
        timeline
            .validate()
            .map_err(|e| TetoError::internal(format!("compiled timeline is inconsistent: {e}")))?;

        let project = Project {
            output: OutputConfig::from_settings(settings, output_path),
            timeline,
        };

        let generated_assets = narrations
            .iter()
            .flatten()
            .map(|n| n.path.clone())
            .collect();
        let total_duration = scene_timings.last().map(|t| t.end_time).unwrap_or(0.0);

        Ok(CompileResult {
            project,
            metadata: CompileMetadata {
                total_duration,
                scene_timings,
                generated_assets,
                cache_hits,
                cache_misses,
            },
        })
    }

    fn prepare(&self) -> TetoResult<()> {
        let narrations_dir = self.output_dir.join("narrations");
        std::fs::create_dir_all(&narrations_dir).map_err(|e| {
            TetoError::cache_io(format!(
                "failed to create narrations directory '{}': {e}",
                narrations_dir.display()
            ))
        })?;
        Ok(())
    }

    /// Scene-level voice resolution: scene override, named profile, then
    /// the script default. Profile names never reach the cache key — only
    /// the resolved config does.
    fn resolve_scene_voice<'a>(
        &self,
        script: &'a Script,
        scene: &'a Scene,
    ) -> TetoResult<&'a VoiceConfig> {
        if let Some(voice) = &scene.voice {
            return Ok(voice);
        }
        if let Some(profile) = &scene.voice_profile {
            return script.voice_profiles.get(profile).ok_or_else(|| {
                TetoError::validation(format!("unknown voice_profile '{profile}'"))
            });
        }
        Ok(&script.voice)
    }

    fn scene_preset_for<'a>(&'a self, script: &Script, scene: &Scene) -> Option<&'a ScenePreset> {
        scene
            .preset
            .as_deref()
            .or(script.default_preset.as_deref())
            .and_then(|name| self.scene_presets.get(name))
    }

    fn timing_for<'a>(&'a self, script: &'a Script, scene: &Scene) -> &'a TimingConfig {
        self.scene_preset_for(script, scene)
            .and_then(|preset| preset.timing_override.as_ref())
            .unwrap_or(&script.timing)
    }

    #[allow(clippy::type_complexity)]
    fn generate_narrations(
        &self,
        script: &Script,
    ) -> TetoResult<(Vec<Vec<NarrationAudio>>, usize, usize)> {
        let mut all = Vec::with_capacity(script.scenes.len());
        let mut hits = 0usize;
        let mut misses = 0usize;

        for (scene_idx, scene) in script.scenes.iter().enumerate() {
            let voice = self.resolve_scene_voice(script, scene)?;
            let ext = self.tts.audio_ext(voice);
            let mut scene_narrations = Vec::with_capacity(scene.narrations.len());

            for (seg_idx, segment) in scene.narrations.iter().enumerate() {
                let plain_text = strip_markup(&segment.text);

                let cached = match &self.cache {
                    Some(cache) => cache.get(&plain_text, voice, ext)?,
                    None => None,
                };

                let (bytes, duration) = match cached {
                    Some(bytes) => {
                        hits += 1;
                        (bytes, self.tts.estimate_duration(&plain_text, voice))
                    }
                    None => {
                        misses += 1;
                        let audio = with_retry(|| self.tts.synthesize(&plain_text, voice))?;
                        if let Some(cache) = &self.cache {
                            cache.put(&plain_text, voice, ext, &audio.bytes)?;
                        }
                        let duration = self.tts.estimate_duration(&plain_text, voice);
                        (audio.bytes, duration)
                    }
                };

                let path = self
                    .output_dir
                    .join("narrations")
                    .join(format!("scene_{scene_idx:03}_seg_{seg_idx:03}.{ext}"));
                std::fs::write(&path, &bytes).map_err(|e| {
                    TetoError::cache_io(format!(
                        "failed to write narration '{}': {e}",
                        path.display()
                    ))
                })?;

                scene_narrations.push(NarrationAudio { path, duration });
            }
            all.push(scene_narrations);
        }

        let total = hits + misses;
        if total > 0 {
            tracing::info!(hits, total, rate_pct = hits * 100 / total, "tts cache");
        }
        Ok((all, hits, misses))
    }

    fn compute_timings(
        &self,
        script: &Script,
        narrations: &[Vec<NarrationAudio>],
    ) -> Vec<SceneTiming> {
        let mut timings = Vec::with_capacity(script.scenes.len());
        let mut t = 0.0f64;

        for (scene_idx, scene) in script.scenes.iter().enumerate() {
            let timing = self.timing_for(script, scene);
            let padding = timing.subtitle_padding;
            let scene_start = t;
            let mut segments = Vec::with_capacity(scene.narrations.len());

            if scene.narrations.is_empty() {
                // Validation guarantees an explicit duration here.
                t += scene.duration.unwrap_or(0.0);
            } else {
                let last = scene.narrations.len() - 1;
                for (seg_idx, segment) in scene.narrations.iter().enumerate() {
                    let duration = narrations[scene_idx][seg_idx].duration;
                    let seg_start = t + padding;
                    let seg_end = seg_start + duration;
                    segments.push(SegmentTiming {
                        segment_index: seg_idx,
                        start_time: seg_start,
                        end_time: seg_end,
                        narration_path: narrations[scene_idx][seg_idx].path.clone(),
                        text: segment.text.clone(),
                    });
                    t = seg_end + padding + segment.pause_after;
                    if seg_idx < last {
                        t += timing.default_segment_gap;
                    }
                }
            }

            let scene_end = t;
            timings.push(SceneTiming {
                scene_index: scene_idx,
                start_time: scene_start,
                end_time: scene_end,
                segments,
            });

            t += scene.pause_after + timing.default_scene_gap;
        }

        timings
    }

    fn build_video_layers(
        &self,
        script: &Script,
        timings: &[SceneTiming],
    ) -> TetoResult<Vec<VisualLayer>> {
        let mut layers = Vec::with_capacity(script.scenes.len());

        for (i, (scene, timing)) in script.scenes.iter().zip(timings).enumerate() {
            let path = self.assets.resolve(&scene.visual)?;
            let preset = self.scene_preset_for(script, scene);

            let effect_name = scene
                .effect
                .as_deref()
                .or_else(|| preset.and_then(|p| p.effect.as_deref()))
                .unwrap_or(&script.default_effect);
            let effect_preset = self.effect_presets.get(effect_name).ok_or_else(|| {
                TetoError::validation(format!("unknown effect '{effect_name}'"))
            })?;

            // `transition` is the crossfade INTO this scene from the
            // previous one; the previous layer is extended below so both
            // sides hold material across the blend window.
            let transition: Option<TransitionConfig> = scene
                .transition
                .clone()
                .or_else(|| preset.and_then(|p| p.transition.clone()));

            // A non-final scene's layer runs to the next scene's start so the
            // inter-scene gap shows this visual, plus the next scene's
            // transition overlap.
            let end_time = if let Some(next) = timings.get(i + 1) {
                let next_scene = &script.scenes[i + 1];
                let next_transition = next_scene
                    .transition
                    .clone()
                    .or_else(|| {
                        self.scene_preset_for(script, next_scene)
                            .and_then(|p| p.transition.clone())
                    });
                let overlap = next_transition.map(|t| t.duration).unwrap_or(0.0);
                next.start_time + overlap
            } else {
                timing.end_time
            };

            let layer = match scene.visual.resolved_kind() {
                AssetKind::Video => VisualLayer::Video(VideoLayer {
                    path,
                    start_time: timing.start_time,
                    end_time,
                    volume: if scene.mute_video { 0.0 } else { 1.0 },
                    loop_playback: true,
                    effects: effect_preset.video_effects.clone(),
                    transition,
                }),
                AssetKind::Image => VisualLayer::Image(ImageLayer {
                    path,
                    start_time: timing.start_time,
                    end_time,
                    effects: effect_preset.image_effects.clone(),
                    transition,
                }),
            };
            layers.push(layer);
        }

        Ok(layers)
    }

    fn build_audio_layers(
        &self,
        script: &Script,
        timings: &[SceneTiming],
        narrations: &[Vec<NarrationAudio>],
    ) -> Vec<AudioLayer> {
        let mut layers = Vec::new();

        // Narrations; the subtitle padding is already inside the timings.
        for (scene_timing, scene_narrations) in timings.iter().zip(narrations) {
            for (segment, audio) in scene_timing.segments.iter().zip(scene_narrations) {
                layers.push(AudioLayer::narration(
                    &audio.path,
                    segment.start_time,
                    audio.duration,
                ));
            }
        }

        // Sound effects, offset from their scene's start.
        for (scene, scene_timing) in script.scenes.iter().zip(timings) {
            for se in &scene.sound_effects {
                layers.push(AudioLayer {
                    path: se.path.clone(),
                    start_time: scene_timing.start_time + se.offset,
                    duration: None,
                    volume: se.volume,
                    fade_in: 0.0,
                    fade_out: 0.0,
                    loop_playback: false,
                });
            }
        }

        let total_duration = timings.last().map(|t| t.end_time).unwrap_or(0.0);

        // BGM: scene-ranged sections win over the global track.
        if !script.bgm_sections.is_empty() {
            for section in &script.bgm_sections {
                let from = section.scene_range.from;
                if from >= timings.len() {
                    tracing::warn!(from, "bgm section starts past the last scene, skipping");
                    continue;
                }
                let to = section.scene_range.to.min(timings.len() - 1);
                let start = timings[from].start_time;
                let end = timings[to].end_time;
                layers.push(AudioLayer {
                    path: section.path.clone(),
                    start_time: start,
                    duration: Some(end - start),
                    volume: section.volume,
                    fade_in: section.fade_in,
                    fade_out: section.fade_out,
                    loop_playback: section.loop_playback,
                });
            }
        } else if let Some(bgm) = &script.bgm {
            layers.push(AudioLayer {
                path: bgm.path.clone(),
                start_time: 0.0,
                duration: Some(total_duration),
                volume: bgm.volume,
                fade_in: bgm.fade_in,
                fade_out: bgm.fade_out,
                // BGM shorter than the project loops to fill its window.
                loop_playback: true,
            });
        }

        layers
    }

    fn build_subtitle_layers(
        &self,
        script: &Script,
        timings: &[SceneTiming],
    ) -> Vec<SubtitleLayer> {
        // Consecutive segments sharing a style collapse into one layer;
        // without per-scene style overrides that is a single layer.
        let mut layers: Vec<SubtitleLayer> = Vec::new();
        let mut current_style: Option<SubtitleStyleConfig> = None;
        let mut current_items: Vec<SubtitleItem> = Vec::new();

        for (scene, scene_timing) in script.scenes.iter().zip(timings) {
            let timing = self.timing_for(script, scene);
            let padding = timing.subtitle_padding;
            let style = self
                .scene_preset_for(script, scene)
                .and_then(|p| p.subtitle_style.clone())
                .unwrap_or_else(|| script.subtitle_style.clone());

            for segment in &scene_timing.segments {
                if current_style.as_ref().is_some_and(|s| *s != style) && !current_items.is_empty()
                {
                    layers.push(SubtitleLayer {
                        items: std::mem::take(&mut current_items),
                        style: current_style.take().unwrap(),
                        partial_styles: script.subtitle_styles.clone(),
                    });
                }
                current_style = Some(style.clone());
                current_items.push(SubtitleItem {
                    text: segment.text.clone(),
                    start_time: (segment.start_time - padding).max(0.0),
                    end_time: segment.end_time + padding,
                });
            }
        }

        if let (Some(style), false) = (current_style, current_items.is_empty()) {
            layers.push(SubtitleLayer {
                items: current_items,
                style,
                partial_styles: script.subtitle_styles.clone(),
            });
        }

        layers
    }

    fn build_stamp_layers(&self, script: &Script, timings: &[SceneTiming]) -> Vec<StampLayer> {
        let mut layers = Vec::new();
        for (scene, scene_timing) in script.scenes.iter().zip(timings) {
            for stamp in &scene.stamps {
                let start = scene_timing.start_time + stamp.offset;
                let end = match stamp.duration {
                    Some(d) => (start + d).min(scene_timing.end_time.max(start)),
                    None => scene_timing.end_time.max(start),
                };
                layers.push(StampLayer {
                    path: stamp.path.clone(),
                    start_time: start,
                    end_time: end,
                    position_preset: stamp.position_preset,
                    position: stamp.position,
                    scale: stamp.scale,
                    opacity: stamp.opacity,
                    margin: stamp.margin,
                    effects: stamp.effects.clone(),
                });
            }
        }
        layers
    }
}
