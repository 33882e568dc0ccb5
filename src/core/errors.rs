//! Session error taxonomy and the status line shown to the user.

use serde::{Deserialize, Serialize};

use crate::core::chain::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WalletUnavailable,
    UserRejected,
    NetworkMismatch,
    NetworkRegistrationFailed,
    ConnectionFailed,
    NotConnected,
    ValidationError,
    TransactionReverted,
    SubmissionFailed,
    ReadFailed,
    Superseded,
    ReloadRequired,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no wallet detected, install a browser wallet extension")]
    WalletUnavailable,
    #[error("request rejected by user")]
    UserRejected,
    #[error("wallet is on chain {actual}, switch to chain {expected} manually")]
    NetworkMismatch { expected: ChainId, actual: ChainId },
    #[error("failed to add network: {0}")]
    NetworkRegistrationFailed(String),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("wallet not connected")]
    NotConnected,
    #[error("{0}")]
    Validation(String),
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
    #[error("submission failed: {0}")]
    SubmissionFailed(String),
    #[error("failed to load entries: {0}")]
    ReadFailed(String),
    #[error("result discarded, the wallet changed while the request was in flight")]
    Superseded,
    #[error("network changed, reload required")]
    ReloadRequired,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::WalletUnavailable => ErrorKind::WalletUnavailable,
            SessionError::UserRejected => ErrorKind::UserRejected,
            SessionError::NetworkMismatch { .. } => ErrorKind::NetworkMismatch,
            SessionError::NetworkRegistrationFailed(_) => ErrorKind::NetworkRegistrationFailed,
            SessionError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            SessionError::NotConnected => ErrorKind::NotConnected,
            SessionError::Validation(_) => ErrorKind::ValidationError,
            SessionError::TransactionReverted(_) => ErrorKind::TransactionReverted,
            SessionError::SubmissionFailed(_) => ErrorKind::SubmissionFailed,
            SessionError::ReadFailed(_) => ErrorKind::ReadFailed,
            SessionError::Superseded => ErrorKind::Superseded,
            SessionError::ReloadRequired => ErrorKind::ReloadRequired,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Last user-visible status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self { Self { kind: StatusKind::Info, error: None, text: text.into() } }
    pub fn success(text: impl Into<String>) -> Self { Self { kind: StatusKind::Success, error: None, text: text.into() } }

    pub fn error(err: &SessionError) -> Self {
        Self { kind: StatusKind::Error, error: Some(err.kind()), text: err.to_string() }
    }
}
