use std::fmt;
use std::io;

use modelcompat_core::CompatError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn compat_error(context: &str, err: CompatError) -> CliError {
    let code = match &err {
        CompatError::UnsupportedLibraryVersion(_) => FAILURE,
        CompatError::InvalidOverride { .. } => USAGE,
        CompatError::Validation(_)
        | CompatError::Construction(_)
        | CompatError::InvalidJson(_) => DATA_INVALID,
        CompatError::Definition { .. } | CompatError::FrozenInstance { .. } => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}
