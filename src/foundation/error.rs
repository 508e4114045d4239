pub type CollabResult<T> = Result<T, CollabError>;

#[derive(thiserror::Error, Debug)]
pub enum CollabError {
    #[error("validation error: {0}")]
    Validation(String),

    /// A logo's source image could not be fetched or decoded.
    #[error("image load error for '{source_url}': {reason}")]
    ImageLoad { source_url: String, reason: String },

    #[error("image load timed out for '{0}'")]
    Timeout(String),

    #[error("image load cancelled for '{0}'")]
    Cancelled(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CollabError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn image_load(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageLoad {
            source_url: source_url.into(),
            reason: reason.into(),
        }
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that exclude a single logo rather than the whole strip.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::ImageLoad { .. } | Self::Timeout(_) | Self::Cancelled(_)
        )
    }
}
