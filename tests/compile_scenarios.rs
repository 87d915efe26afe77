//! End-to-end compile scenarios against the offline provider fixtures.

mod common;

use std::sync::Arc;

use common::{basic_script, narrated_scene, PassthroughResolver, RecordingTts};
use teto::{
    parse_sidecar, render_sidecar, strip_markup, AspectRatio, OutputSettings, PartialStyle,
    ScriptCompiler, ScriptOutput, TetoError, TtsCache,
};

fn compiler(dir: &std::path::Path, tts: Arc<RecordingTts>) -> ScriptCompiler {
    ScriptCompiler::new(tts, Arc::new(PassthroughResolver), dir).with_cache(None)
}

#[test]
fn single_image_single_narration_scenario() {
    let dir = tempfile::TempDir::new().unwrap();
    let tts = Arc::new(RecordingTts::default());
    let script = basic_script(vec![narrated_scene("a.png", &["Hello"])]);

    let result = compiler(dir.path(), tts)
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap();

    let timeline = &result.project.timeline;
    assert_eq!(timeline.video_layers.len(), 1);
    assert!((timeline.video_layers[0].start_time() - 0.0).abs() < 1e-9);
    assert!((timeline.video_layers[0].end_time() - 1.2).abs() < 1e-9);

    assert_eq!(timeline.audio_layers.len(), 1);
    assert!((timeline.audio_layers[0].start_time - 0.1).abs() < 1e-9);

    let items = &timeline.subtitle_layers[0].items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "Hello");
    assert!((items[0].start_time - 0.0).abs() < 1e-9);
    assert!((items[0].end_time - 1.2).abs() < 1e-9);

    // The whole project is exactly the one scene.
    assert!((result.metadata.total_duration - 1.2).abs() < 1e-9);
}

#[test]
fn markup_passes_stripped_text_to_tts_and_keeps_subtitles_verbatim() {
    let dir = tempfile::TempDir::new().unwrap();
    let tts = Arc::new(RecordingTts::default());
    let mut script = basic_script(vec![narrated_scene("a.png", &["a<em>b</em>c"])]);
    script
        .subtitle_styles
        .insert("em".to_string(), PartialStyle {
            font_color: Some("red".to_string()),
            font_weight: None,
            font_size: None,
        });

    let result = compiler(dir.path(), tts.clone())
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap();

    // TTS saw the stripped text.
    assert_eq!(*tts.texts.lock().unwrap(), vec!["abc".to_string()]);

    // The subtitle item keeps the markup verbatim.
    let layer = &result.project.timeline.subtitle_layers[0];
    assert_eq!(layer.items[0].text, "a<em>b</em>c");
    assert_eq!(
        layer.partial_styles.get("em").unwrap().font_color.as_deref(),
        Some("red")
    );

    // Sidecar export strips the markup again.
    let srt = render_sidecar(
        &result.project.timeline.subtitle_layers,
        teto::SidecarFormat::Srt,
    );
    assert!(srt.contains("abc"));
    assert!(!srt.contains("<em>"));
}

#[test]
fn voice_profile_cache_reuse_across_fresh_compilers() {
    let dir = tempfile::TempDir::new().unwrap();
    let cache_dir = tempfile::TempDir::new().unwrap();

    let mut script = basic_script(vec![
        narrated_scene("a.png", &["ok"]),
        narrated_scene("b.png", &["ok"]),
    ]);
    script
        .voice_profiles
        .insert("n".to_string(), Default::default());
    script.scenes[0].voice_profile = Some("n".to_string());
    script.scenes[1].voice_profile = Some("n".to_string());

    let tts = Arc::new(RecordingTts::default());
    let first = ScriptCompiler::new(tts.clone(), Arc::new(PassthroughResolver), dir.path())
        .with_cache(Some(TtsCache::at(cache_dir.path())))
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap();
    assert_eq!(first.metadata.cache_misses, 1);
    assert_eq!(first.metadata.cache_hits, 1);

    // A new provider and compiler over the same cache directory: all hits,
    // zero provider calls.
    let tts2 = Arc::new(RecordingTts::default());
    let second = ScriptCompiler::new(tts2.clone(), Arc::new(PassthroughResolver), dir.path())
        .with_cache(Some(TtsCache::at(cache_dir.path())))
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap();
    assert_eq!(second.metadata.cache_hits, 2);
    assert_eq!(second.metadata.cache_misses, 0);
    assert!(tts2.texts.lock().unwrap().is_empty());

    assert_eq!(first.project, second.project);
}

#[test]
fn scene_without_narration_requires_duration_with_location() {
    let dir = tempfile::TempDir::new().unwrap();
    let tts = Arc::new(RecordingTts::default());
    let script = basic_script(vec![narrated_scene("title.jpg", &[])]);

    let err = compiler(dir.path(), tts)
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap_err();
    match err {
        TetoError::Validation(msg) => {
            assert!(msg.contains("scene 0"), "message was: {msg}");
            assert!(msg.contains("duration"));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn multi_output_projects_share_identical_timings() {
    let dir = tempfile::TempDir::new().unwrap();
    let tts = Arc::new(RecordingTts::default());
    let mut script = basic_script(vec![
        narrated_scene("a.png", &["one", "two"]),
        narrated_scene("b.png", &["three"]),
    ]);
    script.output = ScriptOutput::Multi(vec![
        OutputSettings {
            name: Some("landscape".to_string()),
            ..OutputSettings::default()
        },
        OutputSettings {
            name: Some("portrait".to_string()),
            aspect_ratio: AspectRatio::Portrait,
            ..OutputSettings::default()
        },
    ]);

    let results = compiler(dir.path(), tts).compile_all(&script).unwrap();
    assert_eq!(results.len(), 2);

    // Subtitle items are element-wise equal across outputs.
    let items_a = &results[0].project.timeline.subtitle_layers[0].items;
    let items_b = &results[1].project.timeline.subtitle_layers[0].items;
    assert_eq!(items_a, items_b);

    assert_eq!(
        results[0].project.timeline.video_layers,
        results[1].project.timeline.video_layers
    );
    assert_ne!(
        results[0].project.output.width,
        results[1].project.output.width
    );
}

#[test]
fn sidecar_round_trip_recovers_item_timing_and_text() {
    let dir = tempfile::TempDir::new().unwrap();
    let tts = Arc::new(RecordingTts::default());
    let mut script = basic_script(vec![narrated_scene("a.png", &["x<em>y</em>", "plain"])]);
    script
        .subtitle_styles
        .insert("em".to_string(), PartialStyle::default());

    let result = compiler(dir.path(), tts)
        .compile(&script, dir.path().join("out.mp4"))
        .unwrap();
    let layers = &result.project.timeline.subtitle_layers;

    for format in [teto::SidecarFormat::Srt, teto::SidecarFormat::Vtt] {
        let doc = render_sidecar(layers, format);
        let cues = parse_sidecar(&doc).unwrap();
        let items: Vec<_> = layers.iter().flat_map(|l| l.items.iter()).collect();
        assert_eq!(cues.len(), items.len());
        for (cue, item) in cues.iter().zip(&items) {
            assert!((cue.0 - item.start_time).abs() < 0.001);
            assert!((cue.1 - item.end_time).abs() < 0.001);
            assert_eq!(cue.2, strip_markup(&item.text));
        }
    }
}
