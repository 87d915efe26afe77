//! Per-layer-kind clip builders.
//!
//! Each processor turns one timeline layer into a [`Clip`] plan: timing,
//! volume, object-fit, and the layer's effect stack. Processors own the
//! clips they produce until the pipeline's compositor takes them.

use crate::clip::{Clip, ClipOp};
use crate::error::{TetoError, TetoResult};
use crate::fx::EffectRegistry;
use crate::media::{MediaBackend, MediaKind};
use crate::output::ObjectFit;
use crate::timeline::{
    AudioLayer, ImageLayer, PositionPreset, StampLayer, VideoLayer,
};

/// Scaled size for `object-fit: contain`: fit inside the target while
/// preserving aspect.
pub fn calc_contain_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0 as f64, source.1 as f64);
    let (tw, th) = (target.0 as f64, target.1 as f64);
    if sw / sh > tw / th {
        (target.0, ((tw * sh / sw).round() as u32).max(1))
    } else {
        (((th * sw / sh).round() as u32).max(1), target.1)
    }
}

/// Scaled size for `object-fit: cover`: fill the target while preserving
/// aspect; the excess is cropped.
pub fn calc_cover_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (source.0 as f64, source.1 as f64);
    let (tw, th) = (target.0 as f64, target.1 as f64);
    if sw / sh > tw / th {
        (((th * sw / sh).round() as u32).max(1), target.1)
    } else {
        (target.0, ((tw * sh / sw).round() as u32).max(1))
    }
}

/// Append the object-fit op sequence for a source of known size.
fn object_fit_ops(clip: Clip, fit: ObjectFit, source: (u32, u32), frame: (u32, u32)) -> Clip {
    match fit {
        ObjectFit::Contain => {
            let (w, h) = calc_contain_size(source, frame);
            let clip = clip.with_op(ClipOp::Resize {
                width: w,
                height: h,
            });
            if (w, h) == frame {
                clip
            } else {
                clip.with_op(ClipOp::Letterbox {
                    width: frame.0,
                    height: frame.1,
                })
            }
        }
        ObjectFit::Cover => {
            let (w, h) = calc_cover_size(source, frame);
            let clip = clip.with_op(ClipOp::Resize {
                width: w,
                height: h,
            });
            if (w, h) == frame {
                clip
            } else {
                clip.with_op(ClipOp::CenterCrop {
                    width: frame.0,
                    height: frame.1,
                })
            }
        }
        ObjectFit::Fill => clip.with_op(ClipOp::Resize {
            width: frame.0,
            height: frame.1,
        }),
    }
}

/// Builds base-track clips from video layers.
pub struct VideoLayerProcessor<'a> {
    pub backend: &'a dyn MediaBackend,
    pub effects: &'a EffectRegistry,
    pub object_fit: ObjectFit,
    pub frame: (u32, u32),
}

impl VideoLayerProcessor<'_> {
    pub fn process(&self, layer: &VideoLayer) -> TetoResult<Clip> {
        let info = self.backend.probe(&layer.path)?;
        if info.kind != MediaKind::Video {
            return Err(TetoError::validation(format!(
                "'{}' is not a video source",
                layer.path.display()
            )));
        }
        let span = layer.end_time - layer.start_time;
        let mut clip = Clip::video(&layer.path, layer.start_time, span);
        clip.transition_in = layer.transition.as_ref().map(|t| t.duration);

        if let Some(source_duration) = info.duration {
            if source_duration < span && layer.loop_playback {
                clip = clip.with_op(ClipOp::LoopTo { duration: span });
            } else if source_duration > span {
                clip = clip.with_op(ClipOp::Trim { duration: span });
            }
        }

        if layer.volume == 0.0 || !info.has_audio {
            clip.has_audio = false;
        } else {
            clip.volume = layer.volume;
        }

        clip = self.effects.apply_stack(clip, &layer.effects, self.frame)?;

        let source = match (info.width, info.height) {
            (Some(w), Some(h)) => (w, h),
            _ => self.frame,
        };
        Ok(object_fit_ops(clip, self.object_fit, source, self.frame))
    }
}

/// Builds base-track clips from image layers.
pub struct ImageLayerProcessor<'a> {
    pub backend: &'a dyn MediaBackend,
    pub effects: &'a EffectRegistry,
    pub object_fit: ObjectFit,
    pub frame: (u32, u32),
}

impl ImageLayerProcessor<'_> {
    pub fn process(&self, layer: &ImageLayer) -> TetoResult<Clip> {
        let info = self.backend.probe(&layer.path)?;
        let span = layer.end_time - layer.start_time;
        let mut clip = Clip::image(&layer.path, layer.start_time, span);
        clip.transition_in = layer.transition.as_ref().map(|t| t.duration);

        let source = match (info.width, info.height) {
            (Some(w), Some(h)) => (w, h),
            _ => self.frame,
        };
        // Stills are fitted first so motion effects operate in frame space.
        let clip = object_fit_ops(clip, self.object_fit, source, self.frame);
        self.effects.apply_stack(clip, &layer.effects, self.frame)
    }
}

/// Builds mix entries from audio layers.
pub struct AudioLayerProcessor;

impl AudioLayerProcessor {
    pub fn process(&self, layer: &AudioLayer) -> TetoResult<Clip> {
        let duration = layer.duration.unwrap_or(0.0);
        let mut clip = Clip::audio(&layer.path, layer.start_time, duration);
        clip.volume = layer.volume;

        if let Some(duration) = layer.duration {
            if layer.loop_playback {
                clip = clip.with_op(ClipOp::AudioLoopTo { duration });
            } else {
                clip = clip.with_op(ClipOp::Trim { duration });
            }
        }
        if layer.fade_in > 0.0 || layer.fade_out > 0.0 {
            clip = clip.with_op(ClipOp::AudioFade {
                fade_in: layer.fade_in,
                fade_out: layer.fade_out,
            });
        }
        Ok(clip)
    }
}

/// Builds timed overlays from stamp layers.
pub struct StampLayerProcessor<'a> {
    pub backend: &'a dyn MediaBackend,
    pub effects: &'a EffectRegistry,
    pub frame: (u32, u32),
}

impl StampLayerProcessor<'_> {
    pub fn process(&self, layer: &StampLayer) -> TetoResult<Clip> {
        let info = self.backend.probe(&layer.path)?;
        let source = match (info.width, info.height) {
            (Some(w), Some(h)) => (w, h),
            _ => (128, 128),
        };
        let scaled = (
            ((source.0 as f64 * layer.scale).round() as u32).max(1),
            ((source.1 as f64 * layer.scale).round() as u32).max(1),
        );

        let span = layer.end_time - layer.start_time;
        let mut clip = Clip::image(&layer.path, layer.start_time, span).with_op(ClipOp::Resize {
            width: scaled.0,
            height: scaled.1,
        });

        let (x, y) = self.placement(layer, scaled);
        clip = clip.with_op(ClipOp::Position { x, y });
        if layer.opacity < 1.0 {
            clip = clip.with_op(ClipOp::Opacity(layer.opacity));
        }
        self.effects.apply_stack(clip, &layer.effects, self.frame)
    }

    fn placement(&self, layer: &StampLayer, scaled: (u32, u32)) -> (i64, i64) {
        let (fw, fh) = (self.frame.0 as i64, self.frame.1 as i64);
        let (w, h) = (scaled.0 as i64, scaled.1 as i64);
        let margin = i64::from(layer.margin);

        if let Some(preset) = layer.position_preset {
            return match preset {
                PositionPreset::TopLeft => (margin, margin),
                PositionPreset::TopRight => (fw - w - margin, margin),
                PositionPreset::BottomLeft => (margin, fh - h - margin),
                PositionPreset::BottomRight => (fw - w - margin, fh - h - margin),
            };
        }

        match layer.position {
            // Coordinates in (0, 1] are frame fractions; larger are pixels.
            Some((x, y)) => {
                let resolve = |v: f64, extent: i64| -> i64 {
                    if v.abs() <= 1.0 {
                        (v * extent as f64).round() as i64
                    } else {
                        v.round() as i64
                    }
                };
                (resolve(x, fw), resolve(y, fh))
            }
            None => (margin, margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaInfo;
    use crate::output::OutputConfig;
    use std::path::Path;

    /// Backend that answers probes from a fixed table and refuses to encode.
    struct StubBackend {
        video_duration: f64,
    }

    impl MediaBackend for StubBackend {
        fn probe(&self, path: &Path) -> TetoResult<MediaInfo> {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            Ok(match ext {
                "mp4" => MediaInfo {
                    kind: MediaKind::Video,
                    duration: Some(self.video_duration),
                    width: Some(1280),
                    height: Some(720),
                    has_audio: true,
                },
                "mp3" => MediaInfo {
                    kind: MediaKind::Audio,
                    duration: Some(10.0),
                    width: None,
                    height: None,
                    has_audio: true,
                },
                _ => MediaInfo::still_image(800, 600),
            })
        }

        fn encode(
            &self,
            _: &crate::clip::CompositeClip,
            _: &OutputConfig,
            _: bool,
        ) -> TetoResult<()> {
            unreachable!("tests never encode")
        }
    }

    #[test]
    fn contain_and_cover_math() {
        // 800x600 into 1920x1080: contain pins height, cover pins width.
        assert_eq!(calc_contain_size((800, 600), (1920, 1080)), (1440, 1080));
        assert_eq!(calc_cover_size((800, 600), (1920, 1080)), (1920, 1440));
        // Wide source into tall frame.
        assert_eq!(calc_contain_size((1920, 1080), (1080, 1920)), (1080, 608));
        assert_eq!(calc_cover_size((1920, 1080), (1080, 1920)), (3413, 1920));
        // Exact match is identity.
        assert_eq!(calc_contain_size((1920, 1080), (1920, 1080)), (1920, 1080));
    }

    fn image_layer() -> ImageLayer {
        ImageLayer {
            path: "a.png".into(),
            start_time: 1.0,
            end_time: 3.5,
            effects: vec![],
            transition: None,
        }
    }

    #[test]
    fn image_contain_letterboxes() {
        let backend = StubBackend {
            video_duration: 10.0,
        };
        let processor = ImageLayerProcessor {
            backend: &backend,
            effects: &EffectRegistry::builtin(),
            object_fit: ObjectFit::Contain,
            frame: (1920, 1080),
        };
        let clip = processor.process(&image_layer()).unwrap();
        assert_eq!(clip.start_time, 1.0);
        assert_eq!(clip.duration, 2.5);
        assert_eq!(
            clip.ops,
            vec![
                ClipOp::Resize {
                    width: 1440,
                    height: 1080
                },
                ClipOp::Letterbox {
                    width: 1920,
                    height: 1080
                },
            ]
        );
    }

    #[test]
    fn image_cover_center_crops() {
        let backend = StubBackend {
            video_duration: 10.0,
        };
        let processor = ImageLayerProcessor {
            backend: &backend,
            effects: &EffectRegistry::builtin(),
            object_fit: ObjectFit::Cover,
            frame: (1920, 1080),
        };
        let clip = processor.process(&image_layer()).unwrap();
        assert_eq!(
            clip.ops,
            vec![
                ClipOp::Resize {
                    width: 1920,
                    height: 1440
                },
                ClipOp::CenterCrop {
                    width: 1920,
                    height: 1080
                },
            ]
        );
    }

    #[test]
    fn short_video_loops_to_span_and_long_video_trims() {
        let effects = EffectRegistry::builtin();
        let layer = VideoLayer {
            path: "a.mp4".into(),
            start_time: 0.0,
            end_time: 8.0,
            volume: 1.0,
            loop_playback: true,
            effects: vec![],
            transition: None,
        };

        let short = StubBackend {
            video_duration: 3.0,
        };
        let clip = VideoLayerProcessor {
            backend: &short,
            effects: &effects,
            object_fit: ObjectFit::Fill,
            frame: (1920, 1080),
        }
        .process(&layer)
        .unwrap();
        assert!(clip.ops.contains(&ClipOp::LoopTo { duration: 8.0 }));

        let long = StubBackend {
            video_duration: 30.0,
        };
        let clip = VideoLayerProcessor {
            backend: &long,
            effects: &effects,
            object_fit: ObjectFit::Fill,
            frame: (1920, 1080),
        }
        .process(&layer)
        .unwrap();
        assert!(clip.ops.contains(&ClipOp::Trim { duration: 8.0 }));
    }

    #[test]
    fn zero_volume_drops_audio() {
        let backend = StubBackend {
            video_duration: 10.0,
        };
        let effects = EffectRegistry::builtin();
        let layer = VideoLayer {
            path: "a.mp4".into(),
            start_time: 0.0,
            end_time: 5.0,
            volume: 0.0,
            loop_playback: true,
            effects: vec![],
            transition: None,
        };
        let clip = VideoLayerProcessor {
            backend: &backend,
            effects: &effects,
            object_fit: ObjectFit::Contain,
            frame: (1920, 1080),
        }
        .process(&layer)
        .unwrap();
        assert!(!clip.has_audio);
    }

    #[test]
    fn audio_layer_scales_and_fades() {
        let layer = AudioLayer {
            path: "bgm.mp3".into(),
            start_time: 0.0,
            duration: Some(42.0),
            volume: 0.3,
            fade_in: 1.0,
            fade_out: 2.0,
            loop_playback: true,
        };
        let clip = AudioLayerProcessor.process(&layer).unwrap();
        assert_eq!(clip.volume, 0.3);
        assert_eq!(
            clip.ops,
            vec![
                ClipOp::AudioLoopTo { duration: 42.0 },
                ClipOp::AudioFade {
                    fade_in: 1.0,
                    fade_out: 2.0
                },
            ]
        );
    }

    #[test]
    fn stamp_preset_positions_respect_margin() {
        let backend = StubBackend {
            video_duration: 0.0,
        };
        let effects = EffectRegistry::builtin();
        let layer = StampLayer {
            path: "s.png".into(),
            start_time: 0.0,
            end_time: 2.0,
            position_preset: Some(PositionPreset::BottomRight),
            position: None,
            scale: 0.5,
            opacity: 0.8,
            margin: 20,
            effects: vec![],
        };
        let clip = StampLayerProcessor {
            backend: &backend,
            effects: &effects,
            frame: (1920, 1080),
        }
        .process(&layer)
        .unwrap();

        // 800x600 at scale 0.5 => 400x300; bottom-right with margin 20.
        assert_eq!(
            clip.ops,
            vec![
                ClipOp::Resize {
                    width: 400,
                    height: 300
                },
                ClipOp::Position { x: 1500, y: 760 },
                ClipOp::Opacity(0.8),
            ]
        );
    }

    #[test]
    fn stamp_fractional_position_resolves_against_frame() {
        let backend = StubBackend {
            video_duration: 0.0,
        };
        let effects = EffectRegistry::builtin();
        let layer = StampLayer {
            path: "s.png".into(),
            start_time: 0.0,
            end_time: 2.0,
            position_preset: None,
            position: Some((0.5, 200.0)),
            scale: 1.0,
            opacity: 1.0,
            margin: 0,
            effects: vec![],
        };
        let clip = StampLayerProcessor {
            backend: &backend,
            effects: &effects,
            frame: (1920, 1080),
        }
        .process(&layer)
        .unwrap();
        assert!(clip.ops.contains(&ClipOp::Position { x: 960, y: 200 }));
    }
}
