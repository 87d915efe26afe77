//! Media backend interface.
//!
//! The encoder and compositing engine sit behind [`MediaBackend`]: the
//! pipeline builds a [`CompositeClip`] plan and hands it over whole. The
//! crate ships the ffmpeg-based backend; tests substitute a recording
//! fake.

use std::path::Path;

use crate::clip::CompositeClip;
use crate::error::TetoResult;
use crate::output::OutputConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

/// What a backend learned about a source file.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    /// Source duration in seconds; `None` for stills.
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn still_image(width: u32, height: u32) -> Self {
        Self {
            kind: MediaKind::Image,
            duration: None,
            width: Some(width),
            height: Some(height),
            has_audio: false,
        }
    }
}

pub trait MediaBackend: Send + Sync {
    /// Inspect a source file (dimensions, duration, audio presence).
    fn probe(&self, path: &Path) -> TetoResult<MediaInfo>;

    /// Render the composite plan into `output.path`. `verbose=false`
    /// suppresses encoder chatter.
    fn encode(
        &self,
        composite: &CompositeClip,
        output: &OutputConfig,
        verbose: bool,
    ) -> TetoResult<()>;
}
