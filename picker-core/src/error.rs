//! Core error handling module
//!
//! • One error enum for the loader, the picker builder and item sources
//! • `CompactString` payloads keep the common variants off the heap
//! • First-class `tracing` integration through [`CoreError::trace`]
//! • `#[non_exhaustive]` for forward-compatible extension
use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};
use thiserror::Error;
use tracing::{Level, event};

/// Convenient alias carrying our unified error type
pub type CoreResult<T> = Result<T, CoreError>;

/// Primary error enumeration (grouped by concern)
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ────────────────────────────────────────────────────────────
    // Construction
    // ────────────────────────────────────────────────────────────
    #[error("{field} is required")]
    MissingArgument { field: CompactString },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput {
        field: CompactString,
        message: CompactString,
    },

    // ------------------------------------------------------------
    // Invalid State
    // ------------------------------------------------------------
    #[error("Invalid state: {message}")]
    InvalidState { message: CompactString },

    // ────────────────────────────────────────────────────────────
    // Item source
    // ────────────────────────────────────────────────────────────
    #[error("Item source unavailable during {operation}: {reason}")]
    SourceUnavailable {
        operation: CompactString,
        reason: CompactString,
    },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(CompactString),
}

// ────────────────────────────────────────────────────────────────────────────
// Fast classification helpers
// ────────────────────────────────────────────────────────────────────────────
impl CoreError {
    /// Whether the picker can keep running after this error
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::InvalidState { .. }
        )
    }

    /// The loader never retries on its own; hosts may use this to offer a
    /// manual retry.
    #[inline]
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }

    // ────────────────────────────────────────────────────────────
    // Attribute helpers – used for JSON log grouping
    // ────────────────────────────────────────────────────────────
    #[inline]
    #[must_use]
    pub const fn operation_type(&self) -> &'static str {
        match self {
            Self::MissingArgument { .. } | Self::InvalidInput { .. } => "construction",

            Self::InvalidState { .. } => "invalid_state",

            Self::SourceUnavailable { .. } => "item_source",

            Self::Other(_) => "unknown_error",
        }
    }

    #[inline]
    #[must_use]
    pub fn extract_trace_fields(&self) -> SmallVec<[(&'static str, CompactString); 4]> {
        match self {
            Self::MissingArgument { field } => smallvec![("field", field.clone())],

            Self::InvalidInput { field, message } => {
                smallvec![("field", field.clone()), ("message", message.clone())]
            }

            Self::SourceUnavailable { operation, reason } => smallvec![
                ("operation", operation.clone()),
                ("reason", reason.clone()),
            ],

            _ => smallvec![],
        }
    }

    /// Emit a single structured `tracing` event and hand the error back.
    #[must_use]
    pub fn trace(self) -> Self {
        let extra: SmallVec<[(&'static str, CompactString); 4]> = self.extract_trace_fields();

        event!(
            Level::ERROR,
            marker = self.error_marker(),
            op_type = self.operation_type(),
            error = %self,
            recoverable = self.is_recoverable(),
            retry = self.should_retry(),
            extra_len = extra.len(),
            extra = ?extra,
        );

        self
    }

    // ────────────────────────────────────────────────────────────
    // Smart constructors
    // ────────────────────────────────────────────────────────────
    #[inline]
    #[must_use]
    pub fn missing_argument(field: &str) -> Self {
        Self::MissingArgument {
            field: CompactString::new(field),
        }
    }

    #[inline]
    #[must_use]
    pub fn invalid_input(field: &str, message: &str) -> Self {
        Self::InvalidInput {
            field: CompactString::new(field),
            message: CompactString::new(message),
        }
    }

    #[inline]
    #[must_use]
    pub fn invalid_state(message: &str) -> Self {
        Self::InvalidState {
            message: CompactString::new(message),
        }
    }

    #[inline]
    #[must_use]
    pub fn source_unavailable(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            operation: CompactString::new(operation),
            reason: CompactString::new(reason.to_string()),
        }
    }

    #[inline]
    #[must_use]
    const fn error_marker(&self) -> &'static str {
        match self {
            Self::MissingArgument { .. } => "ERROR_MISSING_ARGUMENT",

            Self::InvalidInput { .. } => "ERROR_INPUT_VALIDATION",

            Self::InvalidState { .. } => "ERROR_INVALID_STATE",

            Self::SourceUnavailable { .. } => "ERROR_SOURCE_UNAVAILABLE",

            Self::Other(_) => "ERROR_UNKNOWN",
        }
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for CoreError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(CompactString::new(e.to_string()))
    }
}
