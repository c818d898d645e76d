// Error module - Typed errors for the animation engine

use thiserror::Error;

/// Engine errors. Bad ids never abort a frame: the caller gets the error back
/// and the engine falls back to a safe default.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown pattern id {0}")]
    UnknownPattern(u8),

    #[error("unknown overlay id {0}")]
    UnknownOverlay(u8),

    #[error("unknown heading id {0}")]
    UnknownHeading(u8),

    #[error("unknown layer kind {0}")]
    UnknownLayerKind(u8),

    #[error("unknown info display id {0}")]
    UnknownInfo(u8),

    #[error("layer is not a {0} layer")]
    WrongLayerKind(&'static str),

    #[error("image layers need an image loader")]
    NoImageLoader,

    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
