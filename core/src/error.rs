//! Error types for image loading and execution.

use std::fmt;

/// Errors that can occur while loading a binary image.
#[derive(Debug)]
pub enum LoadError {
    /// The 4-byte header did not match `0x1DEADFAD`.
    BadMagic,

    /// A block's origin, size, or data was shorter than expected.
    TruncatedImage,

    /// Underlying I/O error (file not found, permission denied, etc.)
    Io(std::io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "image header is not the IJVM magic number"),
            Self::TruncatedImage => write!(f, "image ended before a block was fully read"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Errors that halt a running machine.
///
/// Unlike [`LoadError`], these do not abort execution with a `Result` —
/// they are recorded on the machine (see `Machine::last_error`) and the
/// machine transitions to its halted state, matching the fetch-execute
/// loop's "no retries" contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// `text[pc]` did not match any known opcode.
    UnknownOpcode(u8),

    /// A push would have exceeded the backing stack array.
    StackOverflow,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode(b) => write!(f, "unknown opcode 0x{b:02X}"),
            Self::StackOverflow => write!(f, "operand stack overflow"),
        }
    }
}

impl std::error::Error for RuntimeError {}
