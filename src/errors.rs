//! Error types shared by every quilldb subsystem
//!
//! Error codes:
//! - QUILL_FORMAT_ERROR (FATAL)
//! - QUILL_TYPE_MISMATCH (ERROR)
//! - QUILL_NOT_FOUND (ERROR)
//! - QUILL_CONSISTENCY_VIOLATION (FATAL)
//! - QUILL_EVAL_ERROR (ERROR)
//! - QUILL_IO_ERROR (ERROR)
//! - QUILL_ALREADY_EXISTS (ERROR)
//! - QUILL_CONFLICT (ERROR)
//! - QUILL_READ_ONLY (ERROR)
//! - QUILL_CONFIG_ERROR (ERROR)
//!
//! FATAL is about the data, not the process: a fatal error is still
//! returned to the caller, the current operation is simply unrecoverable.

use std::fmt;
use std::io;

/// Severity levels for database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but the data is healthy
    Error,
    /// Data is malformed or inconsistent
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed or truncated binary data, unknown marker or extension code
    FormatError,
    /// Tag and payload disagree, or a conversion is undefined
    TypeMismatch,
    /// Table, index, document or parameter does not exist
    NotFound,
    /// An index references a primary key that the table does not hold
    ConsistencyViolation,
    /// Filter expression evaluation failed
    EvalError,
    /// Underlying sink or source failed
    IoError,
    /// Table, index or unique value already exists
    AlreadyExists,
    /// Concurrent write detected at commit
    Conflict,
    /// Write attempted in a read-only transaction
    ReadOnly,
    /// Database configuration is unparsable or inconsistent
    ConfigError,
}

impl ErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::FormatError => "QUILL_FORMAT_ERROR",
            ErrorCode::TypeMismatch => "QUILL_TYPE_MISMATCH",
            ErrorCode::NotFound => "QUILL_NOT_FOUND",
            ErrorCode::ConsistencyViolation => "QUILL_CONSISTENCY_VIOLATION",
            ErrorCode::EvalError => "QUILL_EVAL_ERROR",
            ErrorCode::IoError => "QUILL_IO_ERROR",
            ErrorCode::AlreadyExists => "QUILL_ALREADY_EXISTS",
            ErrorCode::Conflict => "QUILL_CONFLICT",
            ErrorCode::ReadOnly => "QUILL_READ_ONLY",
            ErrorCode::ConfigError => "QUILL_CONFIG_ERROR",
        }
    }

    /// Returns the severity level for this code
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::FormatError | ErrorCode::ConsistencyViolation => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Database error with full context
#[derive(Debug)]
pub struct DbError {
    /// Error code
    code: ErrorCode,
    /// Human-readable message
    message: String,
    /// Underlying cause, if any
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DbError {
    fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a format error (FATAL)
    pub fn format(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::FormatError, reason)
    }

    /// Create a truncation error (FATAL)
    pub fn truncated(needed: usize, offset: usize) -> Self {
        Self::new(
            ErrorCode::FormatError,
            format!("Unexpected end of data: needed {} bytes at offset {}", needed, offset),
        )
    }

    /// Create a type mismatch error
    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeMismatch, reason)
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, what)
    }

    /// Create a consistency violation (FATAL)
    pub fn consistency_violation(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConsistencyViolation, reason)
    }

    /// Create an evaluation error
    pub fn eval(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::EvalError, reason)
    }

    /// Create an I/O error keeping the original as source
    pub fn io(err: io::Error) -> Self {
        Self {
            code: ErrorCode::IoError,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create an already-exists error
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, what)
    }

    /// Create a conflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, reason)
    }

    /// Create a read-only error
    pub fn read_only(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ReadOnly, reason)
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, reason)
    }

    /// Returns the error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether this error has the given code
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for DbError {
    fn from(err: io::Error) -> Self {
        DbError::io(err)
    }
}

impl From<rmp::encode::ValueWriteError> for DbError {
    fn from(err: rmp::encode::ValueWriteError) -> Self {
        match err {
            rmp::encode::ValueWriteError::InvalidMarkerWrite(e)
            | rmp::encode::ValueWriteError::InvalidDataWrite(e) => DbError::io(e),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
