use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Timed out after {waited:?} acquiring {resource} for {owner}")]
    AcquireTimeout { resource: String, owner: String, waited: Duration },

    #[error("Invalid lock manager configuration: {0}")]
    InvalidConfig(String),

    #[error("No tokio runtime to run the lock sweeper: {0}")]
    NoRuntime(String),
}

pub type Result<T> = std::result::Result<T, LockError>;
