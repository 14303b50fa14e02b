//! Error types for the backup plugin.

use std::path::PathBuf;
use thiserror::Error;

/// Classification of a [`ServiceError`], used by hosts to decide how to
/// surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NoPriorBackup,
    CorruptChainState,
    MalformedChain,
    StagingIo,
    Transfer,
    DataMover,
    Interrupted,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code the host reports back for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidRequest => 400,
            ErrorKind::NoPriorBackup => 409,
            ErrorKind::Interrupted => 499,
            ErrorKind::Transfer => 502,
            ErrorKind::CorruptChainState
            | ErrorKind::MalformedChain
            | ErrorKind::StagingIo
            | ErrorKind::DataMover
            | ErrorKind::Internal => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Incremental backup requires previous backup in the chain")]
    NoPriorBackup,

    #[error("Report to administrator: {0}")]
    CorruptChainState(String),

    #[error("Malformed incremental chain: {0}")]
    MalformedChain(String),

    #[error("Staging I/O error on {}: {source}", path.display())]
    StagingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Data mover error: {0}")]
    DataMover(String),

    #[error("Operation interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ServiceError::NoPriorBackup => ErrorKind::NoPriorBackup,
            ServiceError::CorruptChainState(_) => ErrorKind::CorruptChainState,
            ServiceError::MalformedChain(_) => ErrorKind::MalformedChain,
            ServiceError::StagingIo { .. } => ErrorKind::StagingIo,
            ServiceError::Transfer(_) => ErrorKind::Transfer,
            ServiceError::DataMover(_) => ErrorKind::DataMover,
            ServiceError::Interrupted => ErrorKind::Interrupted,
            ServiceError::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServiceError::StagingIo {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
