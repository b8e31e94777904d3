//! Transient success/error notices
//!
//! Every user-triggered action ends in exactly one notice. Failures are logged
//! where they are caught and then turned into a short message here.

use crate::error::KitError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    /// Map an error to the message shown to the operator.
    ///
    /// Validation and extraction errors already read as sentences; transport
    /// errors are summarised so raw response bodies stay in the log.
    pub fn from_error(context: &str, err: &KitError) -> Self {
        let message = match err {
            KitError::Validation(msg) | KitError::Custom(msg) => msg.clone(),
            KitError::Network(_) => format!("{context}: network unavailable"),
            KitError::Backend { status, .. } => format!("{context}: server returned {status}"),
            KitError::Ai { status, .. } => format!("{context}: AI service returned {status}"),
            other => format!("{context}: {other}"),
        };
        Self::error(message)
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }

    /// One-line rendering for terminal output.
    pub fn render(&self) -> String {
        match self.kind {
            NoticeKind::Success => format!("✓ {}", self.message),
            NoticeKind::Error => format!("✗ {}", self.message),
        }
    }
}
