use sbsource::{SourceError, SourceFailure};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("the queue is empty")]
    EmptyQueue,

    #[error("index out of bound {index} >= {len}")]
    IndexOutOfBound { index: usize, len: usize },

    #[error("{title}: {description}")]
    PageFailed { title: String, description: String },

    #[error("the operation was cancelled")]
    Cancelled,

    #[error("playback transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl From<SourceFailure> for PlaybackError {
    fn from(failure: SourceFailure) -> Self {
        PlaybackError::PageFailed {
            title: failure.title,
            description: failure.description,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
