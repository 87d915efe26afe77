use std::path::PathBuf;

pub type TetoResult<T> = Result<T, TetoError>;

/// Classification of a TTS provider failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsErrorKind {
    Auth,
    Quota,
    Network,
    Invalid,
    Server,
}

impl TtsErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Network => "network",
            Self::Invalid => "invalid",
            Self::Server => "server",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TetoError {
    /// Malformed script, invalid reference, or broken timeline invariant.
    /// The message enumerates every violation found, not just the first.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),

    #[error("tts {} error: {message}", kind.as_str())]
    Tts { kind: TtsErrorKind, message: String },

    #[error("cache io error: {0}")]
    CacheIo(String),

    #[error("encoder error: {0}")]
    EncoderIo(String),

    #[error("internal error: {0}")]
    InternalBug(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TetoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn tts(kind: TtsErrorKind, msg: impl Into<String>) -> Self {
        Self::Tts {
            kind,
            message: msg.into(),
        }
    }

    pub fn cache_io(msg: impl Into<String>) -> Self {
        Self::CacheIo(msg.into())
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::EncoderIo(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalBug(msg.into())
    }

    /// Whether retrying the failed operation can succeed without caller
    /// intervention. Only transient TTS failures qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Tts { kind, .. } => kind.is_retryable(),
            _ => false,
        }
    }
}
