//! Unified error handling for groupwarden.
//!
//! This module provides the error hierarchy for the moderation engine:
//! transport errors from the action interface, persistence errors, and
//! command-execution errors with chat-reply generation.

use thiserror::Error;

// ============================================================================
// Action errors (invocation interface)
// ============================================================================

/// Errors raised by the action-invocation interface.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Transport-level failure reported by the collaborating host.
    #[error("transport error on {action}: {message}")]
    Transport { action: String, message: String },

    /// The host rejected the action (bad parameters, unknown action).
    #[error("action {action} rejected: {message}")]
    Rejected { action: String, message: String },
}

impl ActionError {
    /// Whether this is the known-benign "no data returned" transport quirk.
    ///
    /// Some actions legitimately return no payload and the transport reports
    /// that as an error; callers treat it as a successful no-op result.
    pub fn is_no_data(&self) -> bool {
        match self {
            Self::Transport { message, .. } => message.contains("No data returned"),
            Self::Rejected { .. } => false,
        }
    }
}

// ============================================================================
// Store errors (persistence interface)
// ============================================================================

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document encode/decode error: {0}")]
    Codec(#[from] serde_json::Error),
}

// ============================================================================
// Command errors (dispatch)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The caller lacks the permission the command requires.
    #[error("permission denied: {0}")]
    Denied(String),

    /// The command arguments are missing or malformed.
    #[error("invalid command: {0}")]
    Invalid(String),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Denied(_) => "denied",
            Self::Invalid(_) => "invalid",
            Self::Action(_) => "action",
            Self::Store(_) => "store",
        }
    }

    /// Convert to a chat reply shown to the group.
    ///
    /// Returns `None` for errors that must not leak detail to the group
    /// (transport and persistence failures); the dispatcher sends a generic
    /// failure notice for those instead.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::Denied(text) | Self::Invalid(text) => Some(text),
            Self::Action(_) | Self::Store(_) => None,
        }
    }
}

/// Result type for command handlers.
pub type CommandResult = Result<(), CommandError>;
