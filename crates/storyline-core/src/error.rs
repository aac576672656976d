use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("invalid window {window} for series of length {len}: {reason}")]
    InvalidWindow {
        window: usize,
        len: usize,
        reason: &'static str,
    },

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("no point at {0} in series")]
    PointNotFound(String),

    #[error("unknown feature type: {0}")]
    UnknownFeatureType(String),

    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("unknown condition operator: {0}")]
    UnknownOperator(String),

    #[error("{kind} does not support {op}")]
    UnsupportedOperation { kind: String, op: &'static str },

    #[error("{0} is not attached to a canvas")]
    NotAttached(String),

    #[error("{0} is already attached to a canvas")]
    AlreadyAttached(String),

    #[error("invalid transition from {from} via {op}")]
    InvalidTransition { from: String, op: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoryError>;
