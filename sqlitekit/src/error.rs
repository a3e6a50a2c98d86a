//! Error taxonomy for the wrapper.
//!
//! The engine reports outcomes as numeric status codes. [`ErrorCode`] names
//! the primary ones; [`Error`] combines them with the engine's diagnostic
//! message where one is available and adds the handful of errors this layer
//! raises on its own (closed handles, arity mismatches, scan conversions).

use std::fmt;

use thiserror::Error as ThisError;

/// Result type for wrapper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine status kinds, plus the two row-iteration pseudo-statuses.
///
/// Codes 12 and 15 are unused by the engine and deliberately unmapped; they
/// render through the [`ErrorCode::Unknown`] fallback like any other
/// unrecognized code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// SQL error or missing database.
    Error,
    /// Internal logic error in SQLite.
    Internal,
    /// Access permission denied.
    Perm,
    /// Callback routine requested an abort.
    Abort,
    /// The database file is locked.
    Busy,
    /// A table in the database is locked.
    Locked,
    /// A malloc() failed.
    NoMem,
    /// Attempt to write a readonly database.
    ReadOnly,
    /// Operation terminated by sqlite3_interrupt().
    Interrupt,
    /// Some kind of disk I/O error occurred.
    IoErr,
    /// The database disk image is malformed.
    Corrupt,
    /// Insertion failed because database is full.
    Full,
    /// Unable to open the database file.
    CantOpen,
    /// Database is empty.
    Empty,
    /// The database schema changed.
    Schema,
    /// String or BLOB exceeds size limit.
    TooBig,
    /// Abort due to constraint violation.
    Constraint,
    /// Data type mismatch.
    Mismatch,
    /// Library used incorrectly.
    Misuse,
    /// Uses OS features not supported on host.
    NoLfs,
    /// Authorization denied.
    Auth,
    /// Auxiliary database format error.
    Format,
    /// 2nd parameter to sqlite3_bind out of range.
    Range,
    /// File opened that is not a database file.
    NotADatabase,
    /// sqlite3_step() has another row ready.
    Row,
    /// sqlite3_step() has finished executing.
    Done,
    /// A status this layer does not map.
    Unknown(i32),
}

impl ErrorCode {
    /// Maps a raw engine status to its named kind.
    #[must_use]
    pub fn from_raw(code: i32) -> Self {
        match code {
            1 => Self::Error,
            2 => Self::Internal,
            3 => Self::Perm,
            4 => Self::Abort,
            5 => Self::Busy,
            6 => Self::Locked,
            7 => Self::NoMem,
            8 => Self::ReadOnly,
            9 => Self::Interrupt,
            10 => Self::IoErr,
            11 => Self::Corrupt,
            13 => Self::Full,
            14 => Self::CantOpen,
            16 => Self::Empty,
            17 => Self::Schema,
            18 => Self::TooBig,
            19 => Self::Constraint,
            20 => Self::Mismatch,
            21 => Self::Misuse,
            22 => Self::NoLfs,
            23 => Self::Auth,
            24 => Self::Format,
            25 => Self::Range,
            26 => Self::NotADatabase,
            100 => Self::Row,
            101 => Self::Done,
            other => Self::Unknown(other),
        }
    }

    /// The raw numeric status for this kind.
    #[must_use]
    pub fn raw(self) -> i32 {
        match self {
            Self::Error => 1,
            Self::Internal => 2,
            Self::Perm => 3,
            Self::Abort => 4,
            Self::Busy => 5,
            Self::Locked => 6,
            Self::NoMem => 7,
            Self::ReadOnly => 8,
            Self::Interrupt => 9,
            Self::IoErr => 10,
            Self::Corrupt => 11,
            Self::Full => 13,
            Self::CantOpen => 14,
            Self::Empty => 16,
            Self::Schema => 17,
            Self::TooBig => 18,
            Self::Constraint => 19,
            Self::Mismatch => 20,
            Self::Misuse => 21,
            Self::NoLfs => 22,
            Self::Auth => 23,
            Self::Format => 24,
            Self::Range => 25,
            Self::NotADatabase => 26,
            Self::Row => 100,
            Self::Done => 101,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Error => "SQL error or missing database",
            Self::Internal => "Internal logic error in SQLite",
            Self::Perm => "Access permission denied",
            Self::Abort => "Callback routine requested an abort",
            Self::Busy => "The database file is locked",
            Self::Locked => "A table in the database is locked",
            Self::NoMem => "A malloc() failed",
            Self::ReadOnly => "Attempt to write a readonly database",
            Self::Interrupt => "Operation terminated by sqlite3_interrupt()",
            Self::IoErr => "Some kind of disk I/O error occurred",
            Self::Corrupt => "The database disk image is malformed",
            Self::Full => "Insertion failed because database is full",
            Self::CantOpen => "Unable to open the database file",
            Self::Empty => "Database is empty",
            Self::Schema => "The database schema changed",
            Self::TooBig => "String or BLOB exceeds size limit",
            Self::Constraint => "Abort due to constraint violation",
            Self::Mismatch => "Data type mismatch",
            Self::Misuse => "Library used incorrectly",
            Self::NoLfs => "Uses OS features not supported on host",
            Self::Auth => "Authorization denied",
            Self::Format => "Auxiliary database format error",
            Self::Range => "2nd parameter to sqlite3_bind out of range",
            Self::NotADatabase => "File opened that is not a database file",
            Self::Row => "sqlite3_step() has another row ready",
            Self::Done => "sqlite3_step() has finished executing",
            Self::Unknown(code) => return write!(f, "errno {code}"),
        };
        f.write_str(text)
    }
}

/// Error returned by wrapper operations.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// Nonzero engine status together with the connection's diagnostic
    /// message at the time of the failure.
    #[error("{code}: {message}")]
    Engine {
        /// Named engine status kind.
        code: ErrorCode,
        /// Diagnostic message from `sqlite3_errmsg`.
        message: String,
    },

    /// Bare engine status. Used for misuse (status 21), where asking the
    /// engine for a diagnostic message is itself unreliable.
    #[error("{0}")]
    Status(ErrorCode),

    /// Operation attempted on a connection whose handle has been closed.
    #[error("no open database")]
    Closed,

    /// The linked engine build does not serialize access internally.
    #[error("sqlite library was not compiled for thread-safe operation")]
    NotThreadSafe,

    /// The engine reported success without handing back a handle.
    #[error("sqlite reported success without returning a handle")]
    NoHandle,

    /// A string destined for the engine contains an interior nul byte.
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// Bind or scan called with the wrong number of arguments.
    #[error("incorrect argument count: have {have}, want {want}")]
    ArgumentCount {
        /// Number of arguments supplied by the caller.
        have: usize,
        /// Number the statement expects.
        want: usize,
    },

    /// A column reported a nonzero length but returned no data pointer.
    #[error("column {column}: null blob with nonzero length")]
    NullBlob {
        /// Zero-based column index.
        column: usize,
    },

    /// A column's bytes could not be converted to the requested target type.
    #[error("column {column} as {target}: {message}")]
    Conversion {
        /// Zero-based column index.
        column: usize,
        /// Name of the requested target type.
        target: &'static str,
        /// Underlying parse failure.
        message: String,
    },

    /// A column's declared storage class is not one this layer understands.
    #[error("column {column}: unsupported column type {code}")]
    UnsupportedColumnType {
        /// Zero-based column index.
        column: usize,
        /// Raw storage class reported by the engine.
        code: i32,
    },

    /// Operation attempted on a backup session that was already closed.
    #[error("backup session already closed")]
    BackupClosed,

    /// A backup run was stopped through its cancellation token.
    #[error("backup cancelled")]
    Cancelled,
}
