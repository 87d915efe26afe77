//! TTS provider interface.
//!
//! Vendor SDKs live behind [`TtsProvider`]; the crate ships only the
//! offline [`MockTtsProvider`]. Duration estimation must be cheap and
//! deterministic — it is used for cached audio too, so a cache hit and a
//! fresh synthesis report the same length.

use std::time::Duration;

use crate::error::{TetoError, TetoResult, TtsErrorKind};
use crate::script::{TtsProviderKind, VoiceConfig};

/// Synthesized audio plus the container format the provider produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    /// File extension without the dot, e.g. `mp3`.
    pub ext: String,
}

pub trait TtsProvider: Send + Sync {
    /// Synthesize speech for already markup-stripped text.
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TetoResult<SynthesizedAudio>;

    /// Estimated speech length in seconds. Deterministic given its inputs.
    fn estimate_duration(&self, text: &str, voice: &VoiceConfig) -> f64;

    /// Container extension for audio produced with `voice`.
    fn audio_ext(&self, voice: &VoiceConfig) -> &'static str {
        match voice.provider {
            TtsProviderKind::Gemini => "wav",
            _ => "mp3",
        }
    }
}

/// Character-rate duration heuristic: CJK text runs ~5 chars/s, Latin ~15,
/// scaled by the configured speaking speed.
pub fn estimate_duration_by_chars(text: &str, voice: &VoiceConfig) -> f64 {
    let mut cjk = 0usize;
    let mut total = 0usize;
    for c in text.chars() {
        if c.is_whitespace() {
            continue;
        }
        total += 1;
        if is_cjk(c) {
            cjk += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    let latin = total - cjk;
    let seconds = cjk as f64 / 5.0 + latin as f64 / 15.0;
    seconds / voice.speed.max(0.1)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303f}'
        | '\u{3040}'..='\u{30ff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{4e00}'..='\u{9fff}'
        | '\u{f900}'..='\u{faff}'
        | '\u{ff00}'..='\u{ffef}'
        | '\u{ac00}'..='\u{d7af}'
    )
}

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_INITIAL: Duration = Duration::from_millis(500);
const RETRY_CAP: Duration = Duration::from_secs(8);

/// Run `op`, retrying transient TTS failures with bounded exponential
/// backoff (3 attempts, 500 ms initial delay, 8 s cap). Non-retryable
/// errors surface immediately.
pub fn with_retry<T>(mut op: impl FnMut() -> TetoResult<T>) -> TetoResult<T> {
    let mut delay = RETRY_INITIAL;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < RETRY_ATTEMPTS => {
                tracing::warn!(attempt, error = %e, "transient tts failure, retrying");
                std::thread::sleep(delay);
                delay = (delay * 2).min(RETRY_CAP);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Offline provider for tests and dry runs: deterministic duration, tiny
/// placeholder audio payloads, and call counting for cache assertions.
#[derive(Debug, Default)]
pub struct MockTtsProvider {
    calls: std::sync::atomic::AtomicUsize,
    /// When set, every `synthesize` call fails with this kind.
    fail_with: Option<TtsErrorKind>,
}

impl MockTtsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_with(kind: TtsErrorKind) -> Self {
        Self {
            calls: std::sync::atomic::AtomicUsize::new(0),
            fail_with: Some(kind),
        }
    }

    /// Number of `synthesize` calls made so far.
    pub fn synthesize_calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl TtsProvider for MockTtsProvider {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> TetoResult<SynthesizedAudio> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(kind) = self.fail_with {
            return Err(TetoError::tts(kind, "mock provider failure"));
        }
        // A minimal MP3 frame header followed by the text keeps payloads
        // distinguishable in cache tests.
        let mut bytes = vec![0xff, 0xfb, 0x90, 0x00];
        bytes.extend_from_slice(text.as_bytes());
        Ok(SynthesizedAudio {
            bytes,
            ext: self.audio_ext(voice).to_string(),
        })
    }

    fn estimate_duration(&self, text: &str, voice: &VoiceConfig) -> f64 {
        estimate_duration_by_chars(text, voice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_heuristic_distinguishes_scripts() {
        let voice = VoiceConfig::default();
        // 15 Latin chars ~ 1s; 5 CJK chars ~ 1s.
        assert!((estimate_duration_by_chars("abcdefghijklmno", &voice) - 1.0).abs() < 1e-9);
        assert!((estimate_duration_by_chars("日本語です。", &voice) - 1.0).abs() < 1e-9);
        assert_eq!(estimate_duration_by_chars("", &voice), 0.0);
    }

    #[test]
    fn duration_scales_inversely_with_speed() {
        let mut voice = VoiceConfig::default();
        let slow = estimate_duration_by_chars("hello world", &voice);
        voice.speed = 2.0;
        let fast = estimate_duration_by_chars("hello world", &voice);
        assert!((slow / fast - 2.0).abs() < 1e-9);
    }

    #[test]
    fn mock_counts_calls_and_round_trips() {
        let provider = MockTtsProvider::new();
        let voice = VoiceConfig::default();
        let audio = provider.synthesize("hi", &voice).unwrap();
        assert_eq!(audio.ext, "mp3");
        assert_eq!(provider.synthesize_calls(), 1);
    }

    #[test]
    fn gemini_voices_produce_wav() {
        let provider = MockTtsProvider::new();
        let mut voice = VoiceConfig::default();
        voice.provider = TtsProviderKind::Gemini;
        assert_eq!(provider.audio_ext(&voice), "wav");
    }

    #[test]
    fn retry_gives_up_on_non_retryable_errors() {
        let provider = MockTtsProvider::failing_with(TtsErrorKind::Auth);
        let voice = VoiceConfig::default();
        let err = with_retry(|| provider.synthesize("x", &voice)).unwrap_err();
        assert!(matches!(
            err,
            TetoError::Tts {
                kind: TtsErrorKind::Auth,
                ..
            }
        ));
        assert_eq!(provider.synthesize_calls(), 1);
    }

    #[test]
    fn retry_exhausts_attempts_on_transient_errors() {
        let provider = MockTtsProvider::failing_with(TtsErrorKind::Network);
        let voice = VoiceConfig::default();
        let err = with_retry(|| provider.synthesize("x", &voice)).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.synthesize_calls(), 3);
    }
}
