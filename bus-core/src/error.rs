//! Stable error vocabulary.
//!
//! [`ErrorCode`] is the integer code returned across the external surfaces
//! (§6/§7 of the spec). Internally, fallible core operations return
//! [`BusError`] so call sites can use `?`; the conversion to [`ErrorCode`]
//! happens once, at the surface boundary.

use std::fmt;

/// A stable, `i32`-backed result code. Non-negative values are success or
/// informational; negative values are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const OK: ErrorCode = ErrorCode(0);
    pub const PENDING: ErrorCode = ErrorCode(1);
    pub const CACHE_PULLED: ErrorCode = ErrorCode(2);
    pub const FAIL: ErrorCode = ErrorCode(-1);
    pub const TIMEOUT: ErrorCode = ErrorCode(-2);
    pub const NOMEM: ErrorCode = ErrorCode(-3);
    pub const NOTFOUND: ErrorCode = ErrorCode(-4);
    pub const NOSUPPORT: ErrorCode = ErrorCode(-5);
    pub const BUSY: ErrorCode = ErrorCode(-6);
    pub const INVALID: ErrorCode = ErrorCode(-7);
    pub const ACCESS: ErrorCode = ErrorCode(-8);
    pub const EXIST: ErrorCode = ErrorCode(-9);
    pub const NODATA: ErrorCode = ErrorCode(-10);
    pub const INITIALIZED: ErrorCode = ErrorCode(-11);
    pub const NOTINITIALIZED: ErrorCode = ErrorCode(-12);
    pub const SIZE_MISMATCH: ErrorCode = ErrorCode(-13);
    pub const NULL_POINTER: ErrorCode = ErrorCode(-14);

    /// True for `OK` and the informational positives (`PENDING`, `CACHE_PULLED`).
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }

    pub fn is_err(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", error_string(*self))
    }
}

/// Human-readable string for a code. Unknown codes map to `"Unknown"`.
pub fn error_string(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::OK => "Success",
        ErrorCode::PENDING => "Pending",
        ErrorCode::CACHE_PULLED => "Pulled from cache",
        ErrorCode::FAIL => "General failure",
        ErrorCode::TIMEOUT => "Timeout",
        ErrorCode::NOMEM => "No memory",
        ErrorCode::NOTFOUND => "Not found",
        ErrorCode::NOSUPPORT => "Not supported",
        ErrorCode::BUSY => "Busy",
        ErrorCode::INVALID => "Invalid argument",
        ErrorCode::ACCESS => "Access denied",
        ErrorCode::EXIST => "Already exists",
        ErrorCode::NODATA => "No data available",
        ErrorCode::INITIALIZED => "Already initialized",
        ErrorCode::NOTINITIALIZED => "Not initialized",
        ErrorCode::SIZE_MISMATCH => "Size mismatch",
        ErrorCode::NULL_POINTER => "Null pointer",
        _ => "Unknown",
    }
}

/// Errors produced by `bus-core`'s fallible operations.
///
/// This does not attempt to cover the full [`ErrorCode`] vocabulary: codes
/// like `BUSY`, `ACCESS`, `TIMEOUT`, `NODATA` and `NULL_POINTER` describe
/// failure modes of the original's C storage (malloc failure, null
/// pointers) that don't arise in safe Rust, or states this core never
/// enters (no cancellation, no access control). They remain valid
/// [`ErrorCode`] values for `error_string` and for surfaces layered on top
/// that do have a use for them (e.g. the procedural surface's
/// init/deinit lifecycle uses `INITIALIZED`/`NOTINITIALIZED` directly).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("node or instance not found")]
    NotFound,
    #[error("node does not support this operation")]
    NoSupport,
    #[error("already exists")]
    Exist,
    #[error("invalid argument")]
    Invalid,
    #[error("size mismatch")]
    SizeMismatch,
}

impl From<BusError> for ErrorCode {
    fn from(e: BusError) -> Self {
        match e {
            BusError::NotFound => ErrorCode::NOTFOUND,
            BusError::NoSupport => ErrorCode::NOSUPPORT,
            BusError::Exist => ErrorCode::EXIST,
            BusError::Invalid => ErrorCode::INVALID,
            BusError::SizeMismatch => ErrorCode::SIZE_MISMATCH,
        }
    }
}

pub type BusResult<T> = Result<T, BusError>;
