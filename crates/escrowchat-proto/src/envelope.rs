//! Envelope type combining header and ciphertext.
//!
//! An `Envelope` is the unit handed to the transport:
//! - 144-byte raw binary header (Big Endian)
//! - Variable-length AEAD ciphertext (including the 16-byte tag)
//!
//! The relay treats envelopes as opaque bytes and may drop, duplicate or
//! reorder them.

use bytes::{BufMut, Bytes};

use crate::{
    MessageHeader,
    errors::{Result, WireError},
};

/// AES-GCM tag size; no valid ciphertext is shorter than this
pub const TAG_SIZE: usize = 16;

/// Complete protocol message (transport layer)
///
/// Layout on the wire:
/// `[MessageHeader: 144 bytes, raw binary] + [ciphertext: rest of buffer]`
///
/// # Invariants
///
/// - Size Limit: `ciphertext.len()` MUST NOT exceed
///   [`Envelope::MAX_CIPHERTEXT_SIZE`]. Violations are rejected during encoding
///   and decoding.
///
/// # Security
///
/// Provides structural validity only. The header is bound to the ciphertext
/// by the AEAD; nothing here is authenticated until the receiver opens it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message header (144 bytes)
    pub header: MessageHeader,

    /// AEAD ciphertext with trailing tag
    pub ciphertext: Bytes,
}

impl Envelope {
    /// Maximum ciphertext size (16 MB)
    pub const MAX_CIPHERTEXT_SIZE: usize = 16 * 1024 * 1024;

    /// Create an envelope from a header and ciphertext.
    #[must_use]
    pub fn new(header: MessageHeader, ciphertext: impl Into<Bytes>) -> Self {
        Self { header, ciphertext: ciphertext.into() }
    }

    /// Per-peer sequence number carried in the header.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        self.header.sequence_number()
    }

    /// Size of the encoded envelope in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        MessageHeader::SIZE + self.ciphertext.len()
    }

    /// Encode envelope into buffer
    ///
    /// Writes: `[header (144 bytes)] + [ciphertext (variable)]`
    ///
    /// # Errors
    ///
    /// - `WireError::CiphertextTooLarge` if ciphertext exceeds
    ///   `MAX_CIPHERTEXT_SIZE` (16 MB)
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.ciphertext.len() > Self::MAX_CIPHERTEXT_SIZE {
            return Err(WireError::CiphertextTooLarge {
                size: self.ciphertext.len(),
                max: Self::MAX_CIPHERTEXT_SIZE,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.ciphertext);

        Ok(())
    }

    /// Encode envelope into a fresh vector.
    ///
    /// # Errors
    ///
    /// Same as [`Envelope::encode`].
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode envelope from wire format
    ///
    /// # Errors
    ///
    /// - `WireError::EnvelopeTooShort` if the buffer cannot hold a header and
    ///   a tag
    /// - `WireError::CiphertextTooLarge` if the ciphertext exceeds 16 MB
    ///
    /// # Security
    ///
    /// All size validation happens before the ciphertext is copied.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let min_size = MessageHeader::SIZE + TAG_SIZE;
        if bytes.len() < min_size {
            return Err(WireError::EnvelopeTooShort { expected: min_size, actual: bytes.len() });
        }

        let header = MessageHeader::from_bytes(bytes)?;

        let ciphertext = bytes.get(MessageHeader::SIZE..).unwrap_or_default();
        if ciphertext.len() > Self::MAX_CIPHERTEXT_SIZE {
            return Err(WireError::CiphertextTooLarge {
                size: ciphertext.len(),
                max: Self::MAX_CIPHERTEXT_SIZE,
            });
        }

        Ok(Self { header: *header, ciphertext: Bytes::copy_from_slice(ciphertext) })
    }
}
