//! # Error Handling
//!
//! A hierarchical error type for the stitcher core, carrying rich context
//! (timestamp, operation, free-form context, recovery suggestion, severity)
//! alongside classification traits so callers can decide whether to retry,
//! fall back, or surface the error to a user.
//!
//! `Bypass` (a legitimate no-op, e.g. a duplicate frame) is *not* an error —
//! see [`crate::StitchOutcome`]. Everything here models a genuine failure.

use std::{error::Error as StdError, fmt};

/// Severity levels for errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
}

/// Metadata about when, where, and under what operation an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub context: Option<String>,
    pub recovery_suggestion: Option<String>,
    pub severity: Option<ErrorSeverity>,
    pub retryable: bool,
    pub recoverable: bool,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_recovery_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.recovery_suggestion = Some(suggestion.into());
        self
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }

    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }
}

/// The stitcher core's error set (§6/§7: `{Param, Mem, File, Protocol,
/// Unknown}` — `Ok` and `Bypass` are not errors and live in
/// [`crate::StitchOutcome`]).
#[derive(Debug, Clone)]
pub enum StitchError {
    /// Bad configuration: non-aligned rectangles, zero sizes, pyramid levels
    /// outside `[1,4]`, scale factors ≤ 0, an empty table on first frame.
    Param {
        field: String,
        reason: String,
        context: Box<ErrorContext>,
    },
    /// Buffer-pool exhaustion that cannot be resolved by waiting, or
    /// allocation failure during setup.
    Mem {
        resource: String,
        reason: String,
        context: Box<ErrorContext>,
    },
    /// Calibration parse failure, with file/line context.
    File {
        path: String,
        line: Option<u32>,
        reason: String,
        context: Box<ErrorContext>,
    },
    /// Contradictory inputs, e.g. frame format mismatches across cameras.
    Protocol {
        reason: String,
        context: Box<ErrorContext>,
    },
    /// A debug-only consistency assertion tripped; release builds route the
    /// violation here rather than panicking (§7 "Fatal" maps to `Unknown`
    /// outside debug assertions).
    Unknown {
        reason: String,
        context: Box<ErrorContext>,
    },
}

impl StitchError {
    pub fn param(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Param {
            field: field.into(),
            reason: reason.into(),
            context: Box::new(ErrorContext::new().with_severity(ErrorSeverity::Error)),
        }
    }

    pub fn mem(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mem {
            resource: resource.into(),
            reason: reason.into(),
            context: Box::new(ErrorContext::new().with_severity(ErrorSeverity::Critical)),
        }
    }

    pub fn file(path: impl Into<String>, line: Option<u32>, reason: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            line,
            reason: reason.into(),
            context: Box::new(ErrorContext::new().with_severity(ErrorSeverity::Error)),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
            context: Box::new(ErrorContext::new().with_severity(ErrorSeverity::Error)),
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
            context: Box::new(ErrorContext::new().with_severity(ErrorSeverity::Fatal)),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Param { context, .. }
            | Self::Mem { context, .. }
            | Self::File { context, .. }
            | Self::Protocol { context, .. }
            | Self::Unknown { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Param { context, .. }
            | Self::Mem { context, .. }
            | Self::File { context, .. }
            | Self::Protocol { context, .. }
            | Self::Unknown { context, .. } => context,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Param { .. } => "param",
            Self::Mem { .. } => "mem",
            Self::File { .. } => "file",
            Self::Protocol { .. } => "protocol",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for StitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param { field, reason, .. } => write!(f, "invalid parameter `{field}`: {reason}"),
            Self::Mem { resource, reason, .. } => write!(f, "memory error ({resource}): {reason}"),
            Self::File { path, line: Some(l), reason, .. } => {
                write!(f, "calibration parse error in {path}:{l}: {reason}")
            }
            Self::File { path, line: None, reason, .. } => {
                write!(f, "calibration parse error in {path}: {reason}")
            }
            Self::Protocol { reason, .. } => write!(f, "protocol error: {reason}"),
            Self::Unknown { reason, .. } => write!(f, "internal error: {reason}"),
        }?;
        if let Some(ctx) = &self.context().context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl StdError for StitchError {}

/// Errors that may be worth retrying (e.g. transient pool exhaustion).
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for StitchError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Mem { .. })
    }
}

/// Errors a caller can recover from without tearing down the stitcher.
pub trait Recoverable {
    fn is_recoverable(&self) -> bool;
}

impl Recoverable for StitchError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unknown { .. })
    }
}
