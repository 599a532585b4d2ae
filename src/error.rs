use thiserror::Error;

/// Broad failure category, used by the UI to decide how to surface an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ErrorKind {
    /// Requested game is missing. Terminal for the session.
    NotFound,
    /// Malformed game or question. Blocks play.
    InvalidData,
    /// Score submission failed. Non-blocking.
    SinkDelivery,
    /// Reading or decoding a backing file failed.
    Storage,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("game '{0}' not found")]
    NotFound(String),
    #[error("game '{0}' has no questions")]
    EmptyGame(String),
    #[error("question {question_id} is invalid: {reason}")]
    InvalidQuestion { question_id: u32, reason: String },
    #[error("question id {0} appears more than once")]
    DuplicateQuestion(u32),
    #[error("no playable game loaded")]
    NotReady,
    #[error("game '{game_id}' cannot be played: {reason}")]
    Unplayable { game_id: String, reason: String },
    #[error("score delivery failed: {0}")]
    SinkDelivery(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Parse(#[from] serde_json::Error),
}

impl QuizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::NotFound(_) => ErrorKind::NotFound,
            QuizError::EmptyGame(_)
            | QuizError::InvalidQuestion { .. }
            | QuizError::DuplicateQuestion(_)
            | QuizError::NotReady
            | QuizError::Unplayable { .. } => ErrorKind::InvalidData,
            QuizError::SinkDelivery(_) => ErrorKind::SinkDelivery,
            QuizError::Io(_) | QuizError::Parse(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn invalid(question_id: u32, reason: impl Into<String>) -> Self {
        QuizError::InvalidQuestion {
            question_id,
            reason: reason.into(),
        }
    }
}
