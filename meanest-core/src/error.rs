use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("participant id is required")]
    MissingParticipant,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("input source closed while waiting for {waiting_for}")]
    InputClosed { waiting_for: &'static str },

    #[error("session already finalized")]
    AlreadyFinalized,

    #[error("render error: {0}")]
    Render(String),

    #[error("persistence failed: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExperimentError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ExperimentError::InvalidConfiguration(msg.into())
    }
}
