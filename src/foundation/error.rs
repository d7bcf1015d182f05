use std::fmt;

/// Convenience result type used across fightframe.
pub type FightframeResult<T> = Result<T, FightframeError>;

/// Render pipeline stage that produced a [`FightframeError::Render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStage {
    /// Keyframe generation from the scene description.
    Keyframes,
    /// Linear interpolation between consecutive keyframes.
    Interpolation,
    /// Post-processing effects applied to every frame.
    Effects,
    /// Writing frames to the output target.
    Encoding,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Keyframes => "keyframe generation",
            Self::Interpolation => "frame interpolation",
            Self::Effects => "effect post-processing",
            Self::Encoding => "encoding",
        })
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum FightframeError {
    /// Invalid or missing user-provided data. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// A render pipeline stage failed; `source` is the causal error.
    #[error("render error during {stage}: {source}")]
    Render {
        /// Stage that failed.
        stage: RenderStage,
        /// Underlying failure.
        source: Box<FightframeError>,
    },

    /// The move library produced no eligible move, or the loop guard tripped.
    #[error("choreography exhausted: {0}")]
    ChoreographyExhausted(String),

    /// A frame sink or external encoder failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Persistence is unavailable or rejected the write.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record or task does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with current state (duplicate render, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller does not own the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The job was cancelled before it finished.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FightframeError {
    /// Build a [`FightframeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap `source` as a failure of `stage`.
    pub fn render(stage: RenderStage, source: FightframeError) -> Self {
        Self::Render {
            stage,
            source: Box::new(source),
        }
    }

    /// Build a [`FightframeError::ChoreographyExhausted`] value.
    pub fn exhausted(msg: impl Into<String>) -> Self {
        Self::ChoreographyExhausted(msg.into())
    }

    /// Build a [`FightframeError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`FightframeError::Storage`] value.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Build a [`FightframeError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`FightframeError::Conflict`] value.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Build a [`FightframeError::Forbidden`] value.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Build a [`FightframeError::Cancelled`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Build a [`FightframeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Innermost error once every `Render` layer is unwrapped.
    pub fn root_cause(&self) -> &FightframeError {
        match self {
            Self::Render { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// `true` when the root cause is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self.root_cause(), Self::Validation(_))
    }

    /// Stage of the outermost render failure, if any.
    pub fn render_stage(&self) -> Option<RenderStage> {
        match self {
            Self::Render { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FightframeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
