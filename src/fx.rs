//! Named clip-transform strategies.
//!
//! An [`EffectStrategy`] is a pure function from a clip plan to a new clip
//! plan; strategies never mutate their input. The registry is built once
//! with every built-in installed and is immutable afterwards — tests and
//! callers derive extended registries with [`EffectRegistry::with_effect`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::clip::{Clip, ClipOp, SlideDirection};
use crate::ease::Easing;
use crate::error::TetoResult;
use crate::timeline::AnimationEffect;

pub trait EffectStrategy: Send + Sync {
    /// Produce a transformed copy of `clip`. `frame_size` is the output
    /// frame, for strategies that move content relative to it.
    fn apply(
        &self,
        clip: &Clip,
        effect: &AnimationEffect,
        frame_size: (u32, u32),
    ) -> TetoResult<Clip>;
}

#[derive(Clone)]
pub struct EffectRegistry {
    strategies: HashMap<String, Arc<dyn EffectStrategy>>,
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EffectRegistry {
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Registry with every built-in strategy installed.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        let entries: [(&str, Arc<dyn EffectStrategy>); 13] = [
            ("fadeIn", Arc::new(FadeIn)),
            ("fadeOut", Arc::new(FadeOut)),
            ("slideIn", Arc::new(Slide { out: false })),
            ("slideOut", Arc::new(Slide { out: true })),
            ("zoom", Arc::new(Zoom)),
            ("kenBurns", Arc::new(KenBurns)),
            ("blur", Arc::new(Blur)),
            ("colorGrade", Arc::new(ColorGrade)),
            ("vignette", Arc::new(Vignette)),
            ("glitch", Arc::new(Glitch)),
            ("parallax", Arc::new(Parallax)),
            ("bounce", Arc::new(Bounce)),
            ("rotate", Arc::new(Rotate)),
        ];
        for (name, strategy) in entries {
            registry.strategies.insert(name.to_string(), strategy);
        }
        registry
    }

    /// Derive a registry with `strategy` under `name`. A duplicate name
    /// replaces the previous strategy silently — last registered wins.
    pub fn with_effect(
        mut self,
        name: impl Into<String>,
        strategy: Arc<dyn EffectStrategy>,
    ) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn EffectStrategy>> {
        self.strategies.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.strategies.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply a layer's effect stack in declared order. Unknown kinds are
    /// skipped with a warning.
    pub fn apply_stack(
        &self,
        clip: Clip,
        effects: &[AnimationEffect],
        frame_size: (u32, u32),
    ) -> TetoResult<Clip> {
        let mut clip = clip;
        for effect in effects {
            match self.get(&effect.kind) {
                Some(strategy) => clip = strategy.apply(&clip, effect, frame_size)?,
                None => {
                    tracing::warn!(kind = %effect.kind, "unknown effect kind, skipping");
                }
            }
        }
        Ok(clip)
    }
}

fn effect_duration(clip: &Clip, effect: &AnimationEffect) -> f64 {
    effect
        .duration
        .or_else(|| effect.param_f64("duration"))
        .unwrap_or(1.0)
        .min(clip.duration)
}

fn effect_easing(effect: &AnimationEffect) -> Easing {
    effect
        .param_str("easing")
        .map(Easing::parse)
        .unwrap_or_default()
}

fn parse_direction(effect: &AnimationEffect) -> SlideDirection {
    match effect.param_str("direction") {
        Some("right") => SlideDirection::Right,
        Some("top") => SlideDirection::Top,
        Some("bottom") => SlideDirection::Bottom,
        Some("left") | None => SlideDirection::Left,
        Some(other) => {
            tracing::warn!(direction = other, "unknown slide direction, using left");
            SlideDirection::Left
        }
    }
}

struct FadeIn;

impl EffectStrategy for FadeIn {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::FadeIn {
            duration: effect_duration(clip, effect),
        }))
    }
}

struct FadeOut;

impl EffectStrategy for FadeOut {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::FadeOut {
            duration: effect_duration(clip, effect),
        }))
    }
}

struct Slide {
    out: bool,
}

impl EffectStrategy for Slide {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::Slide {
            direction: parse_direction(effect),
            duration: effect_duration(clip, effect),
            easing: effect_easing(effect),
            out: self.out,
        }))
    }
}

struct Zoom;

impl EffectStrategy for Zoom {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::ZoomRamp {
            start_scale: effect.param_f64("start_scale").unwrap_or(1.0),
            end_scale: effect.param_f64("end_scale").unwrap_or(1.2),
            duration: effect
                .duration
                .or_else(|| effect.param_f64("duration"))
                .unwrap_or(clip.duration),
            easing: effect_easing(effect),
        }))
    }
}

struct KenBurns;

impl EffectStrategy for KenBurns {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::KenBurns {
            start_scale: effect.param_f64("start_scale").unwrap_or(1.0),
            end_scale: effect.param_f64("end_scale").unwrap_or(1.3),
            pan_start: effect.param_pair("pan_start").unwrap_or((0.0, 0.0)),
            pan_end: effect.param_pair("pan_end").unwrap_or((0.1, 0.1)),
            // Ken Burns spans the whole clip unless narrowed explicitly.
            duration: effect
                .duration
                .or_else(|| effect.param_f64("duration"))
                .unwrap_or(clip.duration),
            easing: effect_easing(effect),
        }))
    }
}

struct Blur;

impl EffectStrategy for Blur {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        let sigma = effect
            .param_f64("sigma")
            .or_else(|| effect.param_f64("blur_amount"))
            .unwrap_or(4.0);
        Ok(clip.clone().with_op(ClipOp::Blur { sigma }))
    }
}

struct ColorGrade;

impl EffectStrategy for ColorGrade {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::ColorGrade {
            temperature: effect
                .param_f64("temperature")
                .or_else(|| effect.param_f64("color_temp"))
                .unwrap_or(0.0),
            saturation: effect.param_f64("saturation").unwrap_or(1.0),
            contrast: effect.param_f64("contrast").unwrap_or(1.0),
            brightness: effect.param_f64("brightness").unwrap_or(1.0),
        }))
    }
}

struct Vignette;

impl EffectStrategy for Vignette {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        let strength = effect
            .param_f64("strength")
            .or_else(|| effect.param_f64("vignette_amount"))
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);
        Ok(clip.clone().with_op(ClipOp::Vignette { strength }))
    }
}

struct Glitch;

impl EffectStrategy for Glitch {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::Glitch {
            intensity: effect
                .param_f64("intensity")
                .or_else(|| effect.param_f64("glitch_intensity"))
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
            frequency: effect.param_f64("frequency").unwrap_or(4.0).max(0.1),
            seed: effect.param_f64("seed").map(|s| s as u64).unwrap_or(0),
        }))
    }
}

struct Parallax;

impl EffectStrategy for Parallax {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::Parallax {
            amplitude_px: effect.param_f64("amplitude").unwrap_or(24.0),
            period: effect.param_f64("period").unwrap_or(6.0).max(0.1),
        }))
    }
}

struct Bounce;

impl EffectStrategy for Bounce {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::Bounce {
            amplitude_px: effect.param_f64("amplitude").unwrap_or(16.0),
            period: effect.param_f64("period").unwrap_or(1.0).max(0.1),
        }))
    }
}

struct Rotate;

impl EffectStrategy for Rotate {
    fn apply(&self, clip: &Clip, effect: &AnimationEffect, _: (u32, u32)) -> TetoResult<Clip> {
        Ok(clip.clone().with_op(ClipOp::Rotate {
            degrees: effect
                .param_f64("rotation_angle")
                .or_else(|| effect.param_f64("degrees"))
                .unwrap_or(360.0),
            duration: effect.duration.or_else(|| effect.param_f64("duration")),
        }))
    }
}
