//! Session error taxonomy.
//!
//! Every failure a command handler can hit falls into one of two classes:
//! remote failures (language server RPC, bootstrap) which the user must see
//! in a dialog, and invalid local state (a picker index that no longer
//! resolves, a stale event) which is logged and silently aborted. The class
//! is a property of the error, not of the call site, so every handler reports
//! through the same path.

use thiserror::Error;

/// How a [`SessionError`] is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error dialog plus log entry
    Error,
    /// Warning dialog plus log entry
    Warning,
    /// Log entry only, no dialog
    Internal,
}

/// Errors recovered at the command-handler boundary. None of these are fatal;
/// the session stays usable after any of them.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to create account: {0:#}")]
    CreateAccount(#[source] anyhow::Error),

    #[error("Failed to switch active account")]
    SwitchAccount(#[source] anyhow::Error),

    #[error("Failed to create default accounts")]
    Bootstrap(#[source] anyhow::Error),

    #[error("Failed to restart language server: {0:#}")]
    ServerRestart(#[source] anyhow::Error),

    #[error("no account with index {index}")]
    UnknownAccount { index: usize },
}

impl SessionError {
    pub fn severity(&self) -> Severity {
        match self {
            SessionError::CreateAccount(_) => Severity::Error,
            SessionError::SwitchAccount(_) => Severity::Warning,
            SessionError::Bootstrap(_) => Severity::Warning,
            SessionError::ServerRestart(_) => Severity::Warning,
            SessionError::UnknownAccount { .. } => Severity::Internal,
        }
    }
}
