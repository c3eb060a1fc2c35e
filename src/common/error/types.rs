//! Unified error types for gdi-canvas.
//!
//! The engine itself only fails on resource-kind mismatches at the protocol
//! boundary and on malformed bitmap input. The remaining variants cover
//! handle lookups, encoding and file access.
use crate::gdi::objects::ObjectId;
use crate::gdi::session::DcId;
use thiserror::Error;

/// Main error type for gdi-canvas operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A resource-kind tag that names no selectable object
    #[error("Unsupported resource kind: {0:#04x}")]
    UnsupportedResource(u8),

    /// Indexed pixel or palette data does not match its declared geometry
    #[error("Malformed bitmap: {0}")]
    MalformedBitmap(String),

    /// Encoded image bytes could not be decoded
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// A surface could not be encoded
    #[error("Encode error: {0}")]
    EncodeError(String),

    /// Surface dimensions out of range
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Object handle not present in the object table
    #[error("Unknown object handle: {0}")]
    InvalidHandle(ObjectId),

    /// Device context handle not present in the session
    #[error("Unknown device context: {0}")]
    InvalidDc(DcId),

    /// Every handle value has been handed out once already
    #[error("Handle space exhausted")]
    HandlesExhausted,

    /// Command opcode outside the protocol
    #[error("Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),
}

/// Result type for gdi-canvas operations.
pub type Result<T> = std::result::Result<T, Error>;
