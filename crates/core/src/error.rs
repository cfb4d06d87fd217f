use thiserror::Error;

/// Failure talking to the captioning backend.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("{message}")]
    Transport { message: String, timed_out: bool },

    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
            timed_out: true,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { timed_out: true, .. })
    }

    /// Text worth showing to a user: the server-reported detail when there is
    /// one, the transport message otherwise.
    pub fn user_detail(&self) -> String {
        match self {
            ApiError::Status { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::timeout(format!("request timed out: {err}"))
        } else if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::transport(err.to_string())
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum CaptionError {
    #[error("Model catalog unavailable: {reason}")]
    CatalogUnavailable { reason: String },

    #[error("Video list unavailable: {reason}")]
    RepositoryUnavailable { reason: String },

    #[error("Caption generation failed for {filename} with {model_key}: {detail}")]
    GenerationFailed {
        filename: String,
        model_key: String,
        detail: String,
    },

    #[error("A caption generation is already in progress")]
    OrchestratorBusy,

    #[error("Captions for {filename} could not be loaded: {reason}")]
    MatrixLoadFailed { filename: String, reason: String },

    #[error("No video is waiting for a model choice")]
    NoPendingSelection,

    #[error("Unknown model: {model_key}")]
    UnknownModel { model_key: String },

    #[error("{model_key} is already generating a caption for {filename}")]
    SlotBusy { filename: String, model_key: String },

    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CaptionError>;
