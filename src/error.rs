//! Recovery error types
//!
//! Nothing here propagates above the driver: per-order failures are counted
//! and logged, publish failures are swallowed after an ERROR, and the only
//! fatal condition is `initialize` itself failing.

use crate::client::PublishError;
use crate::codec::CodecError;
use crate::log_entry::EntryBuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("log entry error: {0}")]
    Entry(#[from] EntryBuildError),

    #[error("order rebuild failed: {0}")]
    Rebuild(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
