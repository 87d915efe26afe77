//! Media backend over the system `ffmpeg`/`ffprobe` binaries.
//!
//! The composite plan is lowered to one ffmpeg invocation: a filter graph
//! that fits, effects, concatenates (or crossfades) the base track,
//! composites timed overlays, and mixes the audio clips, followed by a
//! single encode with the configured codec. `ffmpeg` must be on `PATH`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::clip::{Clip, ClipOp, ClipSource, CompositeClip, SlideDirection};
use crate::ease::Easing;
use crate::error::{TetoError, TetoResult};
use crate::media::{MediaBackend, MediaInfo, MediaKind};
use crate::output::OutputConfig;

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[derive(Clone, Debug)]
pub struct FfmpegBackend {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    pub fn with_binaries(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> TetoResult<MediaInfo> {
        if !path.exists() {
            return Err(TetoError::AssetNotFound(path.to_path_buf()));
        }
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| TetoError::encoder(format!("failed to run ffprobe: {e}")))?;
        if !output.status.success() {
            return Err(TetoError::encoder(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| TetoError::encoder(format!("unparseable ffprobe output: {e}")))?;
        Ok(parse_probe(&json))
    }

    fn encode(
        &self,
        composite: &CompositeClip,
        output: &OutputConfig,
        verbose: bool,
    ) -> TetoResult<()> {
        // Scratch dir for rasterized overlays; lives until the encode ends.
        let scratch = tempfile::TempDir::new()
            .map_err(|e| TetoError::encoder(format!("failed to create scratch dir: {e}")))?;
        let plan = build_encode_plan(composite, output, scratch.path(), verbose)?;

        tracing::debug!(args = ?plan.args, "ffmpeg encode");
        let result = Command::new(&self.ffmpeg)
            .args(&plan.args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| TetoError::encoder(format!("failed to run ffmpeg: {e}")))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(12)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(TetoError::encoder(format!(
                "ffmpeg exited with {}: {tail}",
                result.status
            )));
        }
        Ok(())
    }
}

const IMAGE_CODECS: &[&str] = &["png", "mjpeg", "bmp", "gif", "tiff", "webp"];

fn parse_probe(json: &serde_json::Value) -> MediaInfo {
    let empty = Vec::new();
    let streams = json
        .get("streams")
        .and_then(|s| s.as_array())
        .unwrap_or(&empty);

    let video = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("video"));
    let has_audio = streams
        .iter()
        .any(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));
    let duration = json
        .get("format")
        .and_then(|f| f.get("duration"))
        .and_then(|d| d.as_str())
        .and_then(|d| d.parse::<f64>().ok());

    match video {
        Some(stream) => {
            let codec = stream
                .get("codec_name")
                .and_then(|c| c.as_str())
                .unwrap_or("");
            let kind = if IMAGE_CODECS.contains(&codec) {
                MediaKind::Image
            } else {
                MediaKind::Video
            };
            MediaInfo {
                kind,
                duration: if kind == MediaKind::Image {
                    None
                } else {
                    duration
                },
                width: stream.get("width").and_then(|w| w.as_u64()).map(|w| w as u32),
                height: stream
                    .get("height")
                    .and_then(|h| h.as_u64())
                    .map(|h| h as u32),
                has_audio,
            }
        }
        None => MediaInfo {
            kind: MediaKind::Audio,
            duration,
            width: None,
            height: None,
            has_audio,
        },
    }
}

#[derive(Clone, Debug)]
pub struct EncodePlan {
    /// Full ffmpeg argument vector, binary excluded.
    pub args: Vec<String>,
    /// The assembled `-filter_complex` graph, kept for inspection.
    pub filter_graph: String,
}

/// Shortest decimal rendering; ffmpeg accepts plain floats everywhere.
fn fnum(x: f64) -> String {
    format!("{x}")
}

/// Lower a composite plan to an ffmpeg argv.
pub fn build_encode_plan(
    composite: &CompositeClip,
    output: &OutputConfig,
    scratch: &Path,
    verbose: bool,
) -> TetoResult<EncodePlan> {
    if composite.base.is_empty() {
        return Err(TetoError::validation("nothing to encode: empty base track"));
    }

    let mut inputs: Vec<Vec<String>> = Vec::new();
    let mut filters: Vec<String> = Vec::new();
    let frame = composite.size();
    let fps = composite.fps;

    // --- base track -------------------------------------------------------
    let mut base_labels = Vec::new();
    let mut base_input_idx = Vec::new();
    for (i, clip) in composite.base.iter().enumerate() {
        let idx = inputs.len();
        base_input_idx.push(idx);
        inputs.push(source_input_args(clip)?);

        let (mut chain, motions) = translate_ops(clip, frame, fps, false);
        if matches!(clip.source, ClipSource::Video { .. }) {
            // Normalize timestamps and bound the (possibly looped) stream.
            chain.insert(0, format!("trim=duration={}", fnum(clip.duration)));
            chain.insert(1, "setpts=PTS-STARTPTS".to_string());
        } else {
            chain.insert(0, "setpts=PTS-STARTPTS".to_string());
        }
        chain.insert(0, format!("fps={fps}"));
        chain.push("setsar=1".to_string());

        if motions.is_empty() {
            chain.push("format=yuv420p".to_string());
            filters.push(format!("[{idx}:v]{}[v{i}]", chain.join(",")));
        } else {
            filters.push(format!("[{idx}:v]{}[v{i}raw]", chain.join(",")));
            filters.push(format!(
                "color=c=black:s={}x{}:r={fps}:d={}[bg{i}]",
                frame.0,
                frame.1,
                fnum(clip.duration)
            ));
            let (x, y) = motion_position_exprs(&motions, clip, frame);
            filters.push(format!(
                "[bg{i}][v{i}raw]overlay=x='{x}':y='{y}':shortest=1,setsar=1,format=yuv420p[v{i}]"
            ));
        }
        base_labels.push(format!("v{i}"));
    }

    // Join base clips: plain concat, or xfade where a transition joins a
    // clip with its predecessor.
    let base_out = join_base_track(composite, &base_labels, &mut filters);

    // --- overlays ---------------------------------------------------------
    let mut current = base_out;
    for (j, overlay) in composite.overlays.iter().enumerate() {
        let idx = inputs.len();
        inputs.push(overlay_input_args(overlay, scratch, j)?);

        let (mut chain, _) = translate_ops(overlay, frame, fps, true);
        chain.insert(0, "format=rgba".to_string());
        filters.push(format!("[{idx}:v]{}[ov{j}]", chain.join(",")));

        let (x, y) = overlay_position(overlay);
        let next = format!("o{j}");
        filters.push(format!(
            "[{current}][ov{j}]overlay=x={x}:y={y}:enable='between(t\\,{}\\,{})'[{next}]",
            fnum(overlay.start_time),
            fnum(overlay.end_time()),
        ));
        current = next;
    }

    // --- audio ------------------------------------------------------------
    let mut audio_labels = Vec::new();
    for (i, clip) in composite.base.iter().enumerate() {
        if !clip.has_audio {
            continue;
        }
        let idx = base_input_idx[i];
        let label = format!("ab{i}");
        let delay_ms = (clip.start_time * 1000.0).round() as i64;
        filters.push(format!(
            "[{idx}:a]atrim=duration={},volume={},adelay={delay_ms}:all=1[{label}]",
            fnum(clip.duration),
            fnum(clip.volume),
        ));
        audio_labels.push(label);
    }
    for (j, clip) in composite.audio.iter().enumerate() {
        let idx = inputs.len();
        inputs.push(source_input_args(clip)?);
        let label = format!("am{j}");
        filters.push(format!(
            "[{idx}:a]{}[{label}]",
            translate_audio_ops(clip).join(",")
        ));
        audio_labels.push(label);
    }

    let audio_out = if audio_labels.is_empty() {
        None
    } else if audio_labels.len() == 1 {
        Some(audio_labels[0].clone())
    } else {
        let joined: String = audio_labels
            .iter()
            .map(|l| format!("[{l}]"))
            .collect();
        filters.push(format!(
            "{joined}amix=inputs={}:duration=longest:normalize=0[amix]",
            audio_labels.len()
        ));
        Some("amix".to_string())
    };

    // --- argv -------------------------------------------------------------
    let mut args: Vec<String> = Vec::new();
    if !verbose {
        args.extend(["-loglevel", "error", "-nostats"].map(str::to_string));
    }
    args.push("-y".to_string());
    for input in &inputs {
        args.extend(input.iter().cloned());
    }
    let filter_graph = filters.join(";");
    args.extend(["-filter_complex".to_string(), filter_graph.clone()]);
    args.extend(["-map".to_string(), format!("[{current}]")]);
    if let Some(audio) = &audio_out {
        args.extend(["-map".to_string(), format!("[{audio}]")]);
        args.extend(["-c:a".to_string(), output.audio_codec.clone()]);
    } else {
        args.push("-an".to_string());
    }
    args.extend(["-r".to_string(), fps.to_string()]);
    args.extend(["-c:v".to_string(), output.codec.clone()]);
    args.extend(["-preset".to_string(), output.preset.clone()]);
    if let Some(bitrate) = &output.bitrate {
        args.extend(["-b:v".to_string(), bitrate.clone()]);
    }
    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    args.extend(["-t".to_string(), fnum(composite.duration)]);
    args.push(output.path.to_string_lossy().into_owned());

    Ok(EncodePlan { args, filter_graph })
}

fn join_base_track(
    composite: &CompositeClip,
    labels: &[String],
    filters: &mut Vec<String>,
) -> String {
    if labels.len() == 1 {
        return labels[0].clone();
    }

    let any_transition = composite.base.iter().skip(1).any(|c| {
        c.transition_in.map(|d| d > 0.0).unwrap_or(false)
    });
    if !any_transition {
        let joined: String = labels.iter().map(|l| format!("[{l}]")).collect();
        filters.push(format!(
            "{joined}concat=n={}:v=1:a=0[vbase]",
            labels.len()
        ));
        return "vbase".to_string();
    }

    // Mixed chain: xfade where a crossfade joins two clips, concat
    // elsewhere. Offsets are relative to the accumulated chain.
    let mut current = labels[0].clone();
    let mut elapsed = composite.base[0].duration;
    for (i, clip) in composite.base.iter().enumerate().skip(1) {
        let next = format!("x{i}");
        match clip.transition_in.filter(|d| *d > 0.0) {
            Some(d) => {
                filters.push(format!(
                    "[{current}][{label}]xfade=transition=fade:duration={}:offset={}[{next}]",
                    fnum(d),
                    fnum(elapsed - d),
                    label = labels[i],
                ));
                elapsed += clip.duration - d;
            }
            None => {
                filters.push(format!(
                    "[{current}][{label}]concat=n=2:v=1:a=0[{next}]",
                    label = labels[i],
                ));
                elapsed += clip.duration;
            }
        }
        current = next;
    }
    current
}

fn source_input_args(clip: &Clip) -> TetoResult<Vec<String>> {
    let loops = clip.ops.iter().any(|op| {
        matches!(op, ClipOp::LoopTo { .. } | ClipOp::AudioLoopTo { .. })
    });
    match &clip.source {
        ClipSource::Image { path } => Ok(vec![
            "-loop".to_string(),
            "1".to_string(),
            "-t".to_string(),
            fnum(clip.duration),
            "-i".to_string(),
            path.to_string_lossy().into_owned(),
        ]),
        ClipSource::Video { path } | ClipSource::Audio { path } => {
            let mut args = Vec::new();
            if loops {
                args.extend(["-stream_loop".to_string(), "-1".to_string()]);
            }
            args.extend(["-i".to_string(), path.to_string_lossy().into_owned()]);
            Ok(args)
        }
        ClipSource::Raster { .. } => Err(TetoError::internal(
            "raster sources enter through overlay_input_args",
        )),
    }
}

fn overlay_input_args(clip: &Clip, scratch: &Path, index: usize) -> TetoResult<Vec<String>> {
    let path: PathBuf = match &clip.source {
        ClipSource::Raster {
            width,
            height,
            rgba,
        } => {
            let path = scratch.join(format!("overlay_{index:03}.png"));
            image::save_buffer(
                &path,
                rgba,
                *width,
                *height,
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| TetoError::encoder(format!("failed to write overlay png: {e}")))?;
            path
        }
        ClipSource::Image { path } => path.clone(),
        _ => {
            return Err(TetoError::internal(
                "only image and raster sources can be overlays",
            ))
        }
    };
    Ok(vec![
        "-loop".to_string(),
        "1".to_string(),
        "-t".to_string(),
        fnum(clip.duration),
        "-i".to_string(),
        path.to_string_lossy().into_owned(),
    ])
}

/// Motion ops that are realized as overlay position expressions.
enum MotionOp {
    Slide {
        direction: SlideDirection,
        duration: f64,
        easing: Easing,
        out: bool,
    },
    Bounce { amplitude_px: f64, period: f64 },
    Parallax { amplitude_px: f64, period: f64 },
}

/// Translate a clip's op stack to filter strings, splitting out motion ops.
/// `alpha` selects alpha-preserving fades for overlay chains.
fn translate_ops(clip: &Clip, frame: (u32, u32), fps: u32, alpha: bool) -> (Vec<String>, Vec<MotionOp>) {
    let mut chain = Vec::new();
    let mut motions = Vec::new();
    let span = clip.duration;
    let alpha_suffix = if alpha { ":alpha=1" } else { "" };

    for op in &clip.ops {
        match op {
            // Handled at the input/args layer.
            ClipOp::Trim { .. } | ClipOp::LoopTo { .. } => {}
            ClipOp::AudioFade { .. } | ClipOp::AudioLoopTo { .. } => {}
            // Handled by the overlay compositor.
            ClipOp::Position { .. } => {}

            ClipOp::Resize { width, height } => chain.push(format!("scale={width}:{height}")),
            ClipOp::CenterCrop { width, height } => chain.push(format!("crop={width}:{height}")),
            ClipOp::Letterbox { width, height } => chain.push(format!(
                "pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black"
            )),
            ClipOp::Opacity(a) => chain.push(format!(
                "format=rgba,colorchannelmixer=aa={}",
                fnum(*a)
            )),
            ClipOp::FadeIn { duration } => chain.push(format!(
                "fade=t=in:st=0:d={}{alpha_suffix}",
                fnum(*duration)
            )),
            ClipOp::FadeOut { duration } => chain.push(format!(
                "fade=t=out:st={}:d={}{alpha_suffix}",
                fnum((span - duration).max(0.0)),
                fnum(*duration)
            )),
            ClipOp::Blur { sigma } => chain.push(format!("gblur=sigma={}", fnum(*sigma))),
            ClipOp::ColorGrade {
                temperature,
                saturation,
                contrast,
                brightness,
            } => {
                chain.push(format!(
                    "eq=contrast={}:brightness={}:saturation={}",
                    fnum(*contrast),
                    fnum(brightness - 1.0),
                    fnum(*saturation)
                ));
                if *temperature != 0.0 {
                    let kelvin = (6500.0 + temperature * 1500.0).clamp(1000.0, 40000.0);
                    chain.push(format!("colortemperature=temperature={}", kelvin.round()));
                }
            }
            ClipOp::Vignette { strength } => {
                let angle = (strength * std::f64::consts::FRAC_PI_2).clamp(0.0, 1.5);
                chain.push(format!("vignette=angle={}", fnum(angle)));
            }
            ClipOp::Glitch {
                intensity,
                frequency,
                seed: _,
            } => {
                let shift = (intensity * 10.0).round().max(1.0);
                let period = 1.0 / frequency;
                let window = (period / 2.0).min(0.08);
                chain.push(format!(
                    "rgbashift=rh={}:bh=-{}:enable='lt(mod(t\\,{})\\,{})'",
                    shift,
                    shift,
                    fnum(period),
                    fnum(window)
                ));
            }
            ClipOp::Rotate { degrees, duration } => {
                let d = duration.unwrap_or(span).max(1e-6);
                chain.push(format!(
                    "rotate=a={}*PI/180*min(t/{}\\,1):fillcolor=black",
                    fnum(*degrees),
                    fnum(d)
                ));
            }
            ClipOp::ZoomRamp {
                start_scale,
                end_scale,
                duration,
                easing,
            } => {
                let frames = (duration * f64::from(fps)).max(1.0);
                let eased = easing.expr(&format!("min(on/{},1)", fnum(frames)));
                chain.push(format!(
                    "zoompan=z='min({}+({}-{})*{eased},10)':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d=1:s={}x{}:fps={fps}",
                    fnum(*start_scale),
                    fnum(*end_scale),
                    fnum(*start_scale),
                    frame.0,
                    frame.1,
                ));
            }
            ClipOp::KenBurns {
                start_scale,
                end_scale,
                pan_start,
                pan_end,
                duration,
                easing,
            } => {
                let frames = (duration * f64::from(fps)).max(1.0);
                let eased = easing.expr(&format!("min(on/{},1)", fnum(frames)));
                let pan_x = format!(
                    "({}+({}-{})*{eased})",
                    fnum(pan_start.0),
                    fnum(pan_end.0),
                    fnum(pan_start.0)
                );
                let pan_y = format!(
                    "({}+({}-{})*{eased})",
                    fnum(pan_start.1),
                    fnum(pan_end.1),
                    fnum(pan_start.1)
                );
                chain.push(format!(
                    "zoompan=z='min({}+({}-{})*{eased},10)':x='iw/2-(iw/zoom/2)+{pan_x}*iw':y='ih/2-(ih/zoom/2)+{pan_y}*ih':d=1:s={}x{}:fps={fps}",
                    fnum(*start_scale),
                    fnum(*end_scale),
                    fnum(*start_scale),
                    frame.0,
                    frame.1,
                ));
            }
            ClipOp::Slide {
                direction,
                duration,
                easing,
                out,
            } => motions.push(MotionOp::Slide {
                direction: *direction,
                duration: *duration,
                easing: *easing,
                out: *out,
            }),
            ClipOp::Bounce {
                amplitude_px,
                period,
            } => motions.push(MotionOp::Bounce {
                amplitude_px: *amplitude_px,
                period: *period,
            }),
            ClipOp::Parallax {
                amplitude_px,
                period,
            } => motions.push(MotionOp::Parallax {
                amplitude_px: *amplitude_px,
                period: *period,
            }),
        }
    }

    (chain, motions)
}

/// Build overlay x/y expressions realizing the clip's motion ops.
fn motion_position_exprs(motions: &[MotionOp], clip: &Clip, frame: (u32, u32)) -> (String, String) {
    let mut x_terms = vec!["0".to_string()];
    let mut y_terms = vec!["0".to_string()];
    let span = clip.duration;

    for motion in motions {
        match motion {
            MotionOp::Slide {
                direction,
                duration,
                easing,
                out,
            } => {
                // Slide-in covers [0, d]; slide-out covers [span-d, span].
                // The eased progress drives the remaining offset directly.
                let progress = if *out {
                    format!(
                        "min(max((t-{})/{},0),1)",
                        fnum(span - duration),
                        fnum(*duration)
                    )
                } else {
                    format!("min(t/{},1)", fnum(*duration))
                };
                let eased = easing.expr(&progress);
                let offset = if *out {
                    format!("({eased})")
                } else {
                    format!("(1-{eased})")
                };
                let (axis_terms, extent) = match direction {
                    SlideDirection::Left => (&mut x_terms, -(frame.0 as f64)),
                    SlideDirection::Right => (&mut x_terms, frame.0 as f64),
                    SlideDirection::Top => (&mut y_terms, -(frame.1 as f64)),
                    SlideDirection::Bottom => (&mut y_terms, frame.1 as f64),
                };
                axis_terms.push(format!("({}*{offset})", fnum(extent)));
            }
            MotionOp::Bounce {
                amplitude_px,
                period,
            } => {
                y_terms.push(format!(
                    "(-{}*abs(sin(2*PI*t/{})))",
                    fnum(*amplitude_px),
                    fnum(*period)
                ));
            }
            MotionOp::Parallax {
                amplitude_px,
                period,
            } => {
                x_terms.push(format!(
                    "({}*sin(2*PI*t/{}))",
                    fnum(*amplitude_px),
                    fnum(*period)
                ));
            }
        }
    }

    (x_terms.join("+"), y_terms.join("+"))
}

fn overlay_position(clip: &Clip) -> (i64, i64) {
    for op in &clip.ops {
        if let ClipOp::Position { x, y } = op {
            return (*x, *y);
        }
    }
    (0, 0)
}

fn translate_audio_ops(clip: &Clip) -> Vec<String> {
    let mut chain = Vec::new();
    let mut window = None;
    let mut fades = None;
    for op in &clip.ops {
        match op {
            ClipOp::Trim { duration } | ClipOp::AudioLoopTo { duration } => {
                window = Some(*duration)
            }
            ClipOp::AudioFade { fade_in, fade_out } => fades = Some((*fade_in, *fade_out)),
            _ => {}
        }
    }

    if let Some(duration) = window {
        chain.push(format!("atrim=duration={}", fnum(duration)));
        chain.push("asetpts=PTS-STARTPTS".to_string());
    }
    chain.push(format!("volume={}", fnum(clip.volume)));
    if let Some((fade_in, fade_out)) = fades {
        if fade_in > 0.0 {
            chain.push(format!("afade=t=in:st=0:d={}", fnum(fade_in)));
        }
        if fade_out > 0.0 {
            let duration = window.unwrap_or(clip.duration);
            chain.push(format!(
                "afade=t=out:st={}:d={}",
                fnum((duration - fade_out).max(0.0)),
                fnum(fade_out)
            ));
        }
    }
    let delay_ms = (clip.start_time * 1000.0).round() as i64;
    chain.push(format!("adelay={delay_ms}:all=1"));
    chain
}
