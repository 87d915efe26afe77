//! Compile-then-render flows against the recording backend.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{basic_script, narrated_scene, recording_backend, PassthroughResolver, RecordingTts};
use teto::{
    BgmConfig, ParallelDriver, ScriptCompiler, SoundEffect, SubtitleMode, VideoGenerator,
};

fn compile(
    script: &teto::Script,
    dir: &std::path::Path,
    out: &std::path::Path,
) -> teto::CompileResult {
    ScriptCompiler::new(
        Arc::new(RecordingTts::default()),
        Arc::new(PassthroughResolver),
        dir,
    )
    .with_cache(None)
    .compile(script, out)
    .unwrap()
}

#[test]
fn overlapping_audio_layers_all_reach_the_mix() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut script = basic_script(vec![narrated_scene("a.png", &["talk"])]);
    script.scenes[0].sound_effects = vec![SoundEffect {
        path: PathBuf::from("ding.wav"),
        offset: 0.0,
        volume: 0.7,
    }];
    script.bgm = Some(BgmConfig {
        path: PathBuf::from("bgm.mp3"),
        volume: 0.3,
        fade_in: 0.0,
        fade_out: 0.0,
    });

    let mut result = compile(&script, dir.path(), &dir.path().join("out.mp4"));
    result.project.output.subtitle_mode = SubtitleMode::None;

    let backend = recording_backend();
    VideoGenerator::new(backend.clone())
        .generate(result.project, None, false)
        .unwrap();

    let encoded = backend.encoded.lock().unwrap();
    let (composite, _) = &encoded[0];
    // Narration, sound effect, and BGM coexist with their own volumes.
    assert_eq!(composite.audio.len(), 3);
    let volumes: Vec<f64> = composite.audio.iter().map(|c| c.volume).collect();
    assert!(volumes.contains(&1.0));
    assert!(volumes.contains(&0.7));
    assert!(volumes.contains(&0.3));
}

#[test]
fn subtitle_mode_none_still_renders_without_sidecar_or_burn() {
    let dir = tempfile::TempDir::new().unwrap();
    let script = basic_script(vec![narrated_scene("a.png", &["words"])]);

    let mut result = compile(&script, dir.path(), &dir.path().join("out.mp4"));
    result.project.output.subtitle_mode = SubtitleMode::None;
    assert!(!result.project.timeline.subtitle_layers[0].items.is_empty());

    let backend = recording_backend();
    VideoGenerator::new(backend.clone())
        .generate(result.project, None, false)
        .unwrap();

    let encoded = backend.encoded.lock().unwrap();
    assert_eq!(encoded.len(), 1);
    assert!(encoded[0].0.overlays.is_empty());
    assert!(!dir.path().join("out.srt").exists());
    assert!(!dir.path().join("out.vtt").exists());
}

#[test]
fn parallel_driver_preserves_declaration_order() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut script = basic_script(vec![narrated_scene("a.png", &["hi"])]);
    script.output = teto::ScriptOutput::Multi(vec![
        teto::OutputSettings {
            name: Some("first".to_string()),
            ..teto::OutputSettings::default()
        },
        teto::OutputSettings {
            name: Some("second".to_string()),
            ..teto::OutputSettings::default()
        },
        teto::OutputSettings {
            name: Some("third".to_string()),
            ..teto::OutputSettings::default()
        },
    ]);

    let results = ScriptCompiler::new(
        Arc::new(RecordingTts::default()),
        Arc::new(PassthroughResolver),
        dir.path(),
    )
    .with_cache(None)
    .compile_all(&script)
    .unwrap();

    let mut projects = Vec::new();
    for mut r in results {
        r.project.output.subtitle_mode = SubtitleMode::None;
        projects.push(r.project);
    }

    let backend = recording_backend();
    let outcomes = ParallelDriver::new(backend)
        .with_max_workers(3)
        .render_all(projects)
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    for (outcome, name) in outcomes.iter().zip(["first", "second", "third"]) {
        let path = outcome.as_ref().unwrap();
        assert!(
            path.ends_with(format!("{name}.mp4")),
            "expected {name}, got {}",
            path.display()
        );
    }
}
