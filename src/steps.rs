//! The default processing steps.

use std::sync::Arc;

use crate::clip::{Clip, CompositeClip};
use crate::error::{TetoError, TetoResult};
use crate::fx::EffectRegistry;
use crate::media::MediaBackend;
use crate::output::{ensure_parent_dir, SubtitleMode};
use crate::pipeline::{Pipeline, ProcessingStep, RenderContext};
use crate::processors::{
    AudioLayerProcessor, ImageLayerProcessor, StampLayerProcessor, VideoLayerProcessor,
};
use crate::subtitle::{
    export_sidecar, resolve_font_bytes, SidecarFormat, SubtitleRenderer,
};
use crate::timeline::VisualLayer;

/// Build the default seven-step chain.
pub fn default_pipeline(backend: Arc<dyn MediaBackend>, effects: EffectRegistry) -> Pipeline {
    Pipeline::new(vec![
        Box::new(VideoLayerProcessingStep {
            backend: backend.clone(),
            effects: effects.clone(),
        }),
        Box::new(AudioLayerProcessingStep),
        Box::new(AudioMergingStep),
        Box::new(StampLayerProcessingStep {
            backend: backend.clone(),
            effects: effects.clone(),
        }),
        Box::new(SubtitleProcessingStep),
        Box::new(VideoOutputStep { backend }),
        Box::new(CleanupStep),
    ])
}

/// Builds the base track: one timed clip per video/image layer, in
/// declaration order, composed preserving each clip's start time.
pub struct VideoLayerProcessingStep {
    pub backend: Arc<dyn MediaBackend>,
    pub effects: EffectRegistry,
}

impl ProcessingStep for VideoLayerProcessingStep {
    fn name(&self) -> &'static str {
        "video-layers"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        ctx.report_progress("processing video layers");

        let output = &ctx.project.output;
        let frame = output.size();
        ctx.output_size = Some(frame);

        let mut composite = CompositeClip::new(frame.0, frame.1, output.fps);
        composite.duration = ctx.project.timeline.duration();

        let video = VideoLayerProcessor {
            backend: self.backend.as_ref(),
            effects: &self.effects,
            object_fit: output.object_fit,
            frame,
        };
        let image = ImageLayerProcessor {
            backend: self.backend.as_ref(),
            effects: &self.effects,
            object_fit: output.object_fit,
            frame,
        };

        for layer in &ctx.project.timeline.video_layers {
            let clip = match layer {
                VisualLayer::Video(l) => video.process(l)?,
                VisualLayer::Image(l) => image.process(l)?,
            };
            composite.base.push(clip);
        }

        if composite.base.is_empty() {
            return Err(TetoError::validation(
                "project has no video or image layers",
            ));
        }

        ctx.video_clip = Some(composite);
        Ok(())
    }
}

/// Builds one timed audio clip per audio layer.
pub struct AudioLayerProcessingStep;

impl ProcessingStep for AudioLayerProcessingStep {
    fn name(&self) -> &'static str {
        "audio-layers"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        ctx.report_progress("processing audio layers");
        let processor = AudioLayerProcessor;
        let mut clips = Vec::with_capacity(ctx.project.timeline.audio_layers.len());
        for layer in &ctx.project.timeline.audio_layers {
            clips.push(processor.process(layer)?);
        }
        ctx.audio_clips = clips;
        Ok(())
    }
}

/// Attaches the collected audio clips to the composite as its mix track.
pub struct AudioMergingStep;

impl ProcessingStep for AudioMergingStep {
    fn name(&self) -> &'static str {
        "audio-merge"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        if ctx.audio_clips.is_empty() {
            return Ok(());
        }
        let composite = ctx
            .video_clip
            .as_mut()
            .ok_or_else(|| TetoError::internal("audio merge ran before video layers"))?;
        composite.audio = std::mem::take(&mut ctx.audio_clips);
        Ok(())
    }
}

/// Composes stamp overlays within their time windows.
pub struct StampLayerProcessingStep {
    pub backend: Arc<dyn MediaBackend>,
    pub effects: EffectRegistry,
}

impl ProcessingStep for StampLayerProcessingStep {
    fn name(&self) -> &'static str {
        "stamps"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        if ctx.project.timeline.stamp_layers.is_empty() {
            return Ok(());
        }
        ctx.report_progress("processing stamps");

        let frame = ctx
            .output_size
            .ok_or_else(|| TetoError::internal("stamp step ran before video layers"))?;
        let processor = StampLayerProcessor {
            backend: self.backend.as_ref(),
            effects: &self.effects,
            frame,
        };

        let mut overlays = Vec::with_capacity(ctx.project.timeline.stamp_layers.len());
        for layer in &ctx.project.timeline.stamp_layers {
            overlays.push(processor.process(layer)?);
        }

        let composite = ctx
            .video_clip
            .as_mut()
            .ok_or_else(|| TetoError::internal("stamp step ran before video layers"))?;
        composite.overlays.extend(overlays);
        Ok(())
    }
}

/// Dispatches on the output's subtitle mode: burn-in, sidecar, or nothing.
pub struct SubtitleProcessingStep;

impl ProcessingStep for SubtitleProcessingStep {
    fn name(&self) -> &'static str {
        "subtitles"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        let layers = &ctx.project.timeline.subtitle_layers;
        if layers.is_empty() || layers.iter().all(|l| l.items.is_empty()) {
            return Ok(());
        }

        match ctx.project.output.subtitle_mode {
            SubtitleMode::None => Ok(()),
            SubtitleMode::Srt | SubtitleMode::Vtt => {
                ctx.report_progress("writing subtitle sidecar");
                let format = match ctx.project.output.subtitle_mode {
                    SubtitleMode::Srt => SidecarFormat::Srt,
                    _ => SidecarFormat::Vtt,
                };
                let path = ctx
                    .project
                    .output
                    .sidecar_path()
                    .ok_or_else(|| TetoError::internal("sidecar mode without sidecar path"))?;
                export_sidecar(layers, format, &path)
            }
            SubtitleMode::Burn => {
                ctx.report_progress("rasterizing subtitles");
                let frame = ctx
                    .output_size
                    .ok_or_else(|| TetoError::internal("subtitle step ran before video layers"))?;

                let mut overlays = Vec::new();
                for layer in layers {
                    let font = resolve_font_bytes(&layer.style)?;
                    let renderer = SubtitleRenderer::new(font, frame)?;
                    for item in &layer.items {
                        // One raster per item, reused across its window.
                        let raster = renderer.render_item(item, layer)?;
                        let clip = Clip::raster(
                            raster.width,
                            raster.height,
                            raster.rgba,
                            item.start_time,
                            item.end_time - item.start_time,
                        )
                        .with_op(crate::clip::ClipOp::Position {
                            x: i64::from(raster.x),
                            y: i64::from(raster.y),
                        });
                        overlays.push(clip);
                    }
                }

                let composite = ctx
                    .video_clip
                    .as_mut()
                    .ok_or_else(|| TetoError::internal("subtitle step ran before video layers"))?;
                composite.overlays.extend(overlays);
                Ok(())
            }
        }
    }
}

/// Encodes the composite to the output path.
pub struct VideoOutputStep {
    pub backend: Arc<dyn MediaBackend>,
}

impl ProcessingStep for VideoOutputStep {
    fn name(&self) -> &'static str {
        "encode"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        ctx.report_progress("encoding video");
        let composite = ctx
            .video_clip
            .as_ref()
            .ok_or_else(|| TetoError::internal("encode ran before video layers"))?;
        ensure_parent_dir(&ctx.project.output.path)?;
        self.backend
            .encode(composite, &ctx.project.output, ctx.verbose)
    }
}

/// Releases clip state in reverse order of acquisition.
pub struct CleanupStep;

impl ProcessingStep for CleanupStep {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn process(&self, ctx: &mut RenderContext) -> TetoResult<()> {
        if let Some(composite) = ctx.video_clip.as_mut() {
            composite.overlays.clear();
            composite.audio.clear();
            composite.base.clear();
        }
        ctx.video_clip = None;
        ctx.audio_clips.clear();
        ctx.report_progress("done");
        Ok(())
    }
}
