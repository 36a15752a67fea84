//! Exit code definitions for kmstool
//!
//! Scripts and CI jobs branch on these values; changing one is a breaking
//! change.

use kmstool_core::Error;

/// Exit codes for the kmstool application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,

    /// General/unspecified error, including local I/O failures
    GeneralError = 1,

    /// User input error: missing parameter, malformed path, bad configuration
    UsageError = 2,

    /// Object store or client failure, or the deadline passed
    NetworkError = 3,

    /// The key management service refused or failed the request
    CryptoError = 4,

    /// Local source file does not exist
    NotFound = 5,

    /// Operation was interrupted (e.g., Ctrl+C)
    Interrupted = 130,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            4 => Some(Self::CryptoError),
            5 => Some(Self::NotFound),
            130 => Some(Self::Interrupted),
            _ => None,
        }
    }

    /// Exit code for a failed run
    pub fn from_error(error: &Error) -> Self {
        Self::from_i32(error.exit_code()).unwrap_or(Self::GeneralError)
    }
}
