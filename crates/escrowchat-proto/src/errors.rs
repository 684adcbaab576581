//! Wire-level errors.
//!
//! These describe structurally malformed input only. A well-formed envelope
//! can still be forged; that is reported by the crypto layer.

use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors produced while encoding or decoding wire types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer ended before a full header and tag could be read
    #[error("envelope too short: expected at least {expected} bytes, got {actual}")]
    EnvelopeTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Ciphertext exceeds the protocol maximum
    #[error("ciphertext too large: {size} bytes (max {max})")]
    CiphertextTooLarge {
        /// Actual ciphertext size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Username is empty or too long
    #[error("invalid username: {length} bytes (allowed 1..={max})")]
    InvalidUsername {
        /// Username length in bytes
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Encoded certificate exceeds the protocol maximum
    #[error("certificate too large: {size} bytes (max {max})")]
    CertificateTooLarge {
        /// Actual encoded size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// CBOR serialization failed
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}
