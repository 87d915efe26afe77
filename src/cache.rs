//! Content-addressed TTS audio cache.
//!
//! Entries are keyed on the narration's plain text plus the resolved voice
//! configuration — nothing else. Identical text and voice therefore hash to
//! the same key on any machine, and concurrent compiles may share one cache
//! directory: writes are atomic (temp file + rename) and content-addressed,
//! so racing writers produce byte-identical files.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::Digest as _;

use crate::error::{TetoError, TetoResult};
use crate::script::VoiceConfig;

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "TETO_CACHE_DIR";

/// Compute the cache key: the first 16 hex chars of SHA-256 over a
/// canonical JSON encoding (sorted keys, no insignificant whitespace) of
/// the text and the cache-relevant voice fields.
pub fn cache_key(plain_text: &str, voice: &VoiceConfig) -> String {
    // serde_json maps are BTreeMap-backed, so object keys come out sorted.
    let canonical = serde_json::json!({
        "config": {
            "provider": voice.provider,
            "voice_id": voice.voice_id,
            "language_code": voice.language_code,
            "speed": voice.speed,
            "pitch": voice.pitch,
            "model_id": voice.model_id,
            "output_format": voice.output_format,
            "voice_name": voice.voice_name,
            "gemini_model_id": voice.gemini_model_id,
            "style_prompt": voice.style_prompt,
        },
        "text": plain_text,
    });
    use std::fmt::Write as _;
    let encoded = canonical.to_string();
    let digest = sha2::Sha256::digest(encoded.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheInfo {
    pub entry_count: u64,
    pub bytes_used: u64,
    pub cache_dir: PathBuf,
}

/// File-backed cache under `<root>/<key[0:2]>/<key>.<ext>`.
#[derive(Clone, Debug)]
pub struct TtsCache {
    root: PathBuf,
}

impl TtsCache {
    /// Cache at an explicit root directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default cache root: `$TETO_CACHE_DIR`, else the platform user cache
    /// directory (`XDG_CACHE_HOME/teto/tts` on Unix, `LOCALAPPDATA` on
    /// Windows).
    pub fn default_root() -> PathBuf {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("teto")
            .join("tts")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str, ext: &str) -> PathBuf {
        let shard = &key[..2.min(key.len())];
        self.root.join(shard).join(format!("{key}.{ext}"))
    }

    /// Retrieve cached audio bytes, or `None` on a miss.
    pub fn get(
        &self,
        plain_text: &str,
        voice: &VoiceConfig,
        ext: &str,
    ) -> TetoResult<Option<Vec<u8>>> {
        let path = self.entry_path(&cache_key(plain_text, voice), ext);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TetoError::cache_io(format!(
                "failed to read cache entry '{}': {e}",
                path.display()
            ))),
        }
    }

    /// Store audio bytes. The write lands atomically: a temp file in the
    /// target shard directory is renamed into place, so readers never see a
    /// partial entry and the last of two racing writers wins.
    pub fn put(
        &self,
        plain_text: &str,
        voice: &VoiceConfig,
        ext: &str,
        bytes: &[u8],
    ) -> TetoResult<PathBuf> {
        let path = self.entry_path(&cache_key(plain_text, voice), ext);
        let shard = path
            .parent()
            .ok_or_else(|| TetoError::internal("cache entry path has no parent"))?;
        std::fs::create_dir_all(shard).map_err(|e| {
            TetoError::cache_io(format!(
                "failed to create cache directory '{}': {e}",
                shard.display()
            ))
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(shard).map_err(|e| {
            TetoError::cache_io(format!("failed to create cache temp file: {e}"))
        })?;
        std::io::Write::write_all(&mut tmp, bytes).map_err(|e| {
            TetoError::cache_io(format!("failed to write cache temp file: {e}"))
        })?;
        tmp.persist(&path).map_err(|e| {
            TetoError::cache_io(format!(
                "failed to persist cache entry '{}': {e}",
                path.display()
            ))
        })?;
        Ok(path)
    }

    pub fn info(&self) -> TetoResult<CacheInfo> {
        let mut entry_count = 0;
        let mut bytes_used = 0;
        for file in self.walk_entries()? {
            entry_count += 1;
            bytes_used += std::fs::metadata(&file)
                .map_err(|e| {
                    TetoError::cache_io(format!("failed to stat '{}': {e}", file.display()))
                })?
                .len();
        }
        Ok(CacheInfo {
            entry_count,
            bytes_used,
            cache_dir: self.root.clone(),
        })
    }

    /// Delete cache entries, optionally only those older than `older_than`.
    /// Returns the number of files removed.
    pub fn clear(&self, older_than: Option<Duration>) -> TetoResult<u64> {
        let cutoff = older_than.map(|age| SystemTime::now() - age);
        let mut removed = 0;
        for file in self.walk_entries()? {
            if let Some(cutoff) = cutoff {
                let modified = std::fs::metadata(&file)
                    .and_then(|m| m.modified())
                    .map_err(|e| {
                        TetoError::cache_io(format!("failed to stat '{}': {e}", file.display()))
                    })?;
                if modified >= cutoff {
                    continue;
                }
            }
            std::fs::remove_file(&file).map_err(|e| {
                TetoError::cache_io(format!("failed to remove '{}': {e}", file.display()))
            })?;
            removed += 1;
        }

        // Drop shard directories that emptied out; racing writers may
        // repopulate them, so failures here are fine.
        if let Ok(entries) = std::fs::read_dir(&self.root) {
            for entry in entries.flatten() {
                let _ = std::fs::remove_dir(entry.path());
            }
        }
        Ok(removed)
    }

    fn walk_entries(&self) -> TetoResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let shards = match std::fs::read_dir(&self.root) {
            Ok(shards) => shards,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => {
                return Err(TetoError::cache_io(format!(
                    "failed to read cache root '{}': {e}",
                    self.root.display()
                )))
            }
        };
        for shard in shards.flatten() {
            if !shard.path().is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(shard.path()).map_err(|e| {
                TetoError::cache_io(format!(
                    "failed to read cache shard '{}': {e}",
                    shard.path().display()
                ))
            })?;
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    files.push(entry.path());
                }
            }
        }
        Ok(files)
    }
}

impl Default for TtsCache {
    fn default() -> Self {
        Self::at(Self::default_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::TtsProviderKind;

    fn voice() -> VoiceConfig {
        VoiceConfig::default()
    }

    #[test]
    fn key_is_16_hex_chars_and_deterministic() {
        let key = cache_key("hello", &voice());
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, cache_key("hello", &voice()));
    }

    #[test]
    fn key_changes_with_text_and_cache_relevant_fields() {
        let base = cache_key("hello", &voice());
        assert_ne!(base, cache_key("hello!", &voice()));

        let mut speedy = voice();
        speedy.speed = 1.5;
        assert_ne!(base, cache_key("hello", &speedy));

        let mut provider = voice();
        provider.provider = TtsProviderKind::Gemini;
        assert_ne!(base, cache_key("hello", &provider));

        let mut styled = voice();
        styled.style_prompt = Some("cheerful".to_string());
        assert_ne!(base, cache_key("hello", &styled));
    }

    #[test]
    fn identical_configs_share_a_key() {
        // Two configs equal on all cache-relevant fields are the same voice,
        // however the script referred to them.
        assert_eq!(cache_key("ok", &voice()), cache_key("ok", &voice()));
    }

    #[test]
    fn put_then_get_returns_exact_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = TtsCache::at(dir.path());

        assert_eq!(cache.get("hello", &voice(), "mp3").unwrap(), None);
        cache.put("hello", &voice(), "mp3", b"audio-bytes").unwrap();
        assert_eq!(
            cache.get("hello", &voice(), "mp3").unwrap().as_deref(),
            Some(b"audio-bytes".as_slice())
        );
    }

    #[test]
    fn layout_shards_by_key_prefix() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = TtsCache::at(dir.path());
        let path = cache.put("hello", &voice(), "mp3", b"x").unwrap();

        let key = cache_key("hello", &voice());
        assert_eq!(
            path,
            dir.path().join(&key[..2]).join(format!("{key}.mp3"))
        );
    }

    #[test]
    fn info_and_clear() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = TtsCache::at(dir.path());
        cache.put("a", &voice(), "mp3", b"aaaa").unwrap();
        cache.put("b", &voice(), "mp3", b"bb").unwrap();

        let info = cache.info().unwrap();
        assert_eq!(info.entry_count, 2);
        assert_eq!(info.bytes_used, 6);

        assert_eq!(cache.clear(None).unwrap(), 2);
        assert_eq!(cache.info().unwrap().entry_count, 0);
    }

    #[test]
    fn clear_with_age_keeps_fresh_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = TtsCache::at(dir.path());
        cache.put("a", &voice(), "mp3", b"x").unwrap();

        assert_eq!(cache.clear(Some(Duration::from_secs(3600))).unwrap(), 0);
        assert_eq!(cache.info().unwrap().entry_count, 1);
    }

    #[test]
    fn info_on_missing_root_is_empty() {
        let cache = TtsCache::at("/nonexistent/teto-test-cache");
        let info = cache.info().unwrap();
        assert_eq!(info.entry_count, 0);
    }
}
