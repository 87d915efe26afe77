//! Compile-time preset registries.
//!
//! Two kinds of named bundles are resolved while compiling a script:
//!
//! * an *effect preset* (`scene.effect` / `script.default_effect`) supplies
//!   the animation-effect stack attached to a scene's base layer, with
//!   separate stacks for image and video visuals;
//! * a *scene preset* (`scene.preset` / `script.default_preset`) bundles an
//!   effect preset name, a transition, a subtitle style, and a timing
//!   override.
//!
//! Registries are plain values constructed with their built-ins and frozen;
//! `with_*` combinators derive extended registries for callers and tests.

use std::collections::HashMap;

use crate::subtitle::SubtitleStyleConfig;
use crate::script::TimingConfig;
use crate::timeline::{AnimationEffect, TransitionConfig};

/// A named pair of effect stacks, one per visual kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectPreset {
    pub image_effects: Vec<AnimationEffect>,
    pub video_effects: Vec<AnimationEffect>,
}

#[derive(Clone, Debug, Default)]
pub struct EffectPresetRegistry {
    presets: HashMap<String, EffectPreset>,
}

impl EffectPresetRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        // Static scenes.
        registry.insert("default", EffectPreset::default());

        registry.insert(
            "dramatic",
            EffectPreset {
                image_effects: vec![
                    AnimationEffect::new("glitch")
                        .with_duration(0.1)
                        .with_params(serde_json::json!({ "intensity": 0.2 })),
                    AnimationEffect::new("colorGrade")
                        .with_duration(0.5)
                        .with_params(serde_json::json!({
                            "contrast": 1.3, "saturation": 0.8, "brightness": 0.9,
                        })),
                ],
                video_effects: vec![
                    AnimationEffect::new("glitch")
                        .with_duration(0.1)
                        .with_params(serde_json::json!({ "intensity": 0.15 })),
                    AnimationEffect::new("colorGrade")
                        .with_duration(0.5)
                        .with_params(serde_json::json!({
                            "contrast": 1.2, "saturation": 0.85, "brightness": 0.95,
                        })),
                ],
            },
        );

        let slide_in = AnimationEffect::new("slideIn")
            .with_duration(0.5)
            .with_params(serde_json::json!({ "direction": "right", "easing": "easeOut" }));
        registry.insert(
            "slideshow",
            EffectPreset {
                image_effects: vec![slide_in.clone()],
                video_effects: vec![slide_in],
            },
        );

        for (name, pan_start, pan_end, start_scale, end_scale) in [
            ("kenburns-left-to-right", (-0.1, 0.0), (0.1, 0.0), 1.05, 1.12),
            ("kenburns-right-to-left", (0.1, 0.0), (-0.1, 0.0), 1.05, 1.12),
            ("kenburns-top-to-bottom", (0.0, -0.1), (0.0, 0.1), 1.05, 1.12),
            ("kenburns-bottom-to-top", (0.0, 0.1), (0.0, -0.1), 1.05, 1.12),
            ("kenburns-zoom-in", (0.0, 0.0), (0.0, 0.0), 1.0, 1.15),
            ("kenburns-zoom-out", (0.0, 0.0), (0.0, 0.0), 1.15, 1.0),
            ("kenburns-diagonal-lt-rb", (-0.08, -0.08), (0.08, 0.08), 1.05, 1.12),
            ("kenburns-diagonal-rt-lb", (0.08, -0.08), (-0.08, 0.08), 1.05, 1.12),
        ] {
            registry.insert(
                name,
                EffectPreset {
                    image_effects: vec![AnimationEffect::new("kenBurns").with_params(
                        serde_json::json!({
                            "pan_start": [pan_start.0, pan_start.1],
                            "pan_end": [pan_end.0, pan_end.1],
                            "start_scale": start_scale,
                            "end_scale": end_scale,
                            "easing": "linear",
                        }),
                    )],
                    video_effects: vec![],
                },
            );
        }

        registry
    }

    fn insert(&mut self, name: &str, preset: EffectPreset) {
        self.presets.insert(name.to_string(), preset);
    }

    /// Derive a registry with an extra (or replaced) preset.
    pub fn with_preset(mut self, name: impl Into<String>, preset: EffectPreset) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    pub fn get(&self, name: &str) -> Option<&EffectPreset> {
        self.presets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.keys().cloned().collect();
        names.sort();
        names
    }
}

/// A composite scene preset: coarse-grained bundles like "hook" or "cta"
/// that set several scene knobs at once. Scene-level settings win over the
/// preset's.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScenePreset {
    /// Effect preset name, resolved against the effect registry.
    pub effect: Option<String>,
    pub transition: Option<TransitionConfig>,
    pub subtitle_style: Option<SubtitleStyleConfig>,
    pub timing_override: Option<TimingConfig>,
}

#[derive(Clone, Debug, Default)]
pub struct ScenePresetRegistry {
    presets: HashMap<String, ScenePreset>,
}

impl ScenePresetRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// No composite presets ship built in; scripts and tests install their
    /// own via [`ScenePresetRegistry::with_preset`].
    pub fn builtin() -> Self {
        Self::empty()
    }

    pub fn with_preset(mut self, name: impl Into<String>, preset: ScenePreset) -> Self {
        self.presets.insert(name.into(), preset);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScenePreset> {
        self.presets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.presets.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_effect_presets_cover_the_library() {
        let registry = EffectPresetRegistry::builtin();
        for name in [
            "default",
            "dramatic",
            "slideshow",
            "kenburns-left-to-right",
            "kenburns-right-to-left",
            "kenburns-top-to-bottom",
            "kenburns-bottom-to-top",
            "kenburns-zoom-in",
            "kenburns-zoom-out",
            "kenburns-diagonal-lt-rb",
            "kenburns-diagonal-rt-lb",
        ] {
            assert!(registry.contains(name), "missing preset '{name}'");
        }
    }

    #[test]
    fn default_preset_is_static() {
        let registry = EffectPresetRegistry::builtin();
        let preset = registry.get("default").unwrap();
        assert!(preset.image_effects.is_empty());
        assert!(preset.video_effects.is_empty());
    }

    #[test]
    fn kenburns_presets_animate_images_only() {
        let registry = EffectPresetRegistry::builtin();
        let preset = registry.get("kenburns-zoom-in").unwrap();
        assert_eq!(preset.image_effects.len(), 1);
        assert_eq!(preset.image_effects[0].kind, "kenBurns");
        assert!(preset.video_effects.is_empty());
    }

    #[test]
    fn with_preset_replaces_existing_name() {
        let registry = EffectPresetRegistry::builtin().with_preset(
            "default",
            EffectPreset {
                image_effects: vec![AnimationEffect::new("fadeIn")],
                video_effects: vec![],
            },
        );
        assert_eq!(registry.get("default").unwrap().image_effects.len(), 1);
    }

    #[test]
    fn scene_preset_registry_starts_empty() {
        let registry = ScenePresetRegistry::builtin();
        assert!(registry.names().is_empty());

        let registry = registry.with_preset(
            "hook",
            ScenePreset {
                effect: Some("dramatic".to_string()),
                ..ScenePreset::default()
            },
        );
        assert!(registry.contains("hook"));
    }
}
