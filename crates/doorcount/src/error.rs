use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration for door '{door}': {reason}")]
    InvalidConfig { door: String, reason: String },

    #[error("door '{0}' is already registered")]
    DuplicateDoor(String),

    #[error("no door named '{0}'")]
    UnknownDoor(String),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
