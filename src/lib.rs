#![forbid(unsafe_code)]

//! teto: compile declarative video scripts into time-explicit projects and
//! render them through a layered ffmpeg pipeline.
//!
//! The two cores are [`ScriptCompiler`] (script → project: TTS with
//! content-addressed caching, deterministic timing, layer building) and the
//! render [`Pipeline`] (project → encoded file: per-layer clip plans,
//! effect strategies, subtitle burn-in or sidecars, ffmpeg encode).
//! [`ParallelDriver`] fans multiple outputs across a bounded thread pool.

mod assets;
mod cache;
mod clip;
mod compiler;
mod ease;
mod encode_ffmpeg;
mod error;
mod fx;
mod generator;
mod markup;
mod media;
mod output;
mod parallel;
mod pipeline;
mod presets;
mod processors;
mod script;
mod steps;
mod subtitle;
mod timeline;
mod tts;

pub use assets::{AssetResolver, LocalAssetResolver};
pub use cache::{cache_key, CacheInfo, TtsCache, CACHE_DIR_ENV};
pub use clip::{Clip, ClipOp, ClipSource, CompositeClip, SlideDirection};
pub use compiler::{
    CompileMetadata, CompileResult, SceneTiming, ScriptCompiler, SegmentTiming,
};
pub use ease::Easing;
pub use encode_ffmpeg::{build_encode_plan, is_ffmpeg_on_path, EncodePlan, FfmpegBackend};
pub use error::{TetoError, TetoResult, TtsErrorKind};
pub use fx::{EffectRegistry, EffectStrategy};
pub use generator::VideoGenerator;
pub use markup::{has_markup, parse_styled_text, referenced_tags, strip_markup, Span};
pub use media::{MediaBackend, MediaInfo, MediaKind};
pub use output::{
    ensure_parent_dir, AspectRatio, ObjectFit, OutputConfig, OutputSettings, SubtitleMode,
};
pub use parallel::{OutputProgress, ParallelDriver};
pub use pipeline::{Pipeline, ProcessingStep, ProgressSink, RenderContext};
pub use presets::{EffectPreset, EffectPresetRegistry, ScenePreset, ScenePresetRegistry};
pub use processors::{
    calc_contain_size, calc_cover_size, AudioLayerProcessor, ImageLayerProcessor,
    StampLayerProcessor, VideoLayerProcessor,
};
pub use script::{
    AssetKind, BgmConfig, BgmSection, GenerateConfig, NarrationSegment, Scene, SceneRange,
    Script, ScriptOutput, SoundEffect, StampConfig, TimingConfig, TtsProviderKind, Visual,
    VoiceConfig,
};
pub use steps::{
    default_pipeline, AudioLayerProcessingStep, AudioMergingStep, CleanupStep,
    StampLayerProcessingStep, SubtitleProcessingStep, VideoLayerProcessingStep, VideoOutputStep,
};
pub use subtitle::{
    export_sidecar, format_srt_time, format_vtt_time, parse_color, parse_sidecar,
    render_sidecar, resolve_font_bytes, FontSize, FontWeight, NamedSize, PartialStyle,
    SidecarFormat, SubtitleAppearance, SubtitlePosition, SubtitleRaster, SubtitleRenderer,
    SubtitleStyleConfig,
};
pub use timeline::{
    AnimationEffect, AudioLayer, ImageLayer, PositionPreset, Project, StampLayer, SubtitleItem,
    SubtitleLayer, Timeline, TransitionConfig, TransitionKind, VideoLayer, VisualLayer,
};
pub use tts::{
    estimate_duration_by_chars, with_retry, MockTtsProvider, SynthesizedAudio, TtsProvider,
};
