//! Message header with zero-copy parsing.
//!
//! The `MessageHeader` is a fixed 144-byte structure serialized as raw binary
//! (Big Endian). Both peers must produce byte-identical headers because the
//! serialized header is the associated data of the message AEAD.

use std::fmt;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{Result, WireError};

/// Size of a raw X25519 public key on the wire
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce on the wire
pub const IV_SIZE: usize = 12;

/// Size of the escrowed message key: 32-byte key plus 16-byte GCM tag
pub const ESCROW_CIPHERTEXT_SIZE: usize = 48;

/// Fixed 144-byte message header (Big Endian network byte order)
///
/// Field order is part of the protocol. Every field is authenticated as
/// associated data, so flipping any bit makes the message undecryptable.
///
/// # Security
///
/// The `#[repr(C, packed)]` layout with zerocopy traits ensures this struct can
/// be safely cast from untrusted network bytes: every 144-byte pattern is a
/// valid header. Parsing never implies authenticity.
#[repr(C, packed)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct MessageHeader {
    // Escrow channel (bytes 0-91)
    gov_ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
    escrow_ciphertext: [u8; ESCROW_CIPHERTEXT_SIZE],

    // Nonces (bytes 92-115)
    message_iv: [u8; IV_SIZE],
    escrow_iv: [u8; IV_SIZE],

    // Session binding (bytes 116-143)
    sender_ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
    sequence_number: [u8; 8],
}

impl MessageHeader {
    /// Size of the serialized header (144 bytes)
    pub const SIZE: usize = 144;

    /// Assemble a header from its fields.
    #[must_use]
    pub fn new(
        gov_ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
        escrow_ciphertext: [u8; ESCROW_CIPHERTEXT_SIZE],
        message_iv: [u8; IV_SIZE],
        escrow_iv: [u8; IV_SIZE],
        sender_ephemeral_public_key: [u8; PUBLIC_KEY_SIZE],
        sequence_number: u64,
    ) -> Self {
        Self {
            gov_ephemeral_public_key,
            escrow_ciphertext,
            message_iv,
            escrow_iv,
            sender_ephemeral_public_key,
            sequence_number: sequence_number.to_be_bytes(),
        }
    }

    /// Parse header from network bytes (zero-copy, safe)
    ///
    /// Only the first [`Self::SIZE`] bytes are read; trailing bytes belong to
    /// the caller.
    ///
    /// # Errors
    ///
    /// - `WireError::EnvelopeTooShort` if the buffer is shorter than 144 bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        Self::ref_from_prefix(bytes)
            .map(|(header, _)| header)
            .map_err(|_| WireError::EnvelopeTooShort { expected: Self::SIZE, actual: bytes.len() })
    }

    /// Serialize header to bytes (zero-copy)
    ///
    /// This is the exact associated data bound into the message AEAD.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Ephemeral public key generated for this message's escrow entry.
    #[must_use]
    pub fn gov_ephemeral_public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.gov_ephemeral_public_key
    }

    /// Message key encrypted for the escrow holder.
    #[must_use]
    pub fn escrow_ciphertext(&self) -> &[u8; ESCROW_CIPHERTEXT_SIZE] {
        &self.escrow_ciphertext
    }

    /// Nonce for the payload AEAD.
    #[must_use]
    pub fn message_iv(&self) -> &[u8; IV_SIZE] {
        &self.message_iv
    }

    /// Nonce for the escrow AEAD.
    #[must_use]
    pub fn escrow_iv(&self) -> &[u8; IV_SIZE] {
        &self.escrow_iv
    }

    /// Sender's per-peer ephemeral public key used in the handshake.
    #[must_use]
    pub fn sender_ephemeral_public_key(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.sender_ephemeral_public_key
    }

    /// Per-peer sequence number, starting at 1.
    #[must_use]
    pub fn sequence_number(&self) -> u64 {
        u64::from_be_bytes(self.sequence_number)
    }
}

impl fmt::Debug for MessageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sender = self.sender_ephemeral_public_key;
        f.debug_struct("MessageHeader")
            .field("sequence_number", &self.sequence_number())
            .field("sender_ephemeral_public_key", &KeyPrefix(&sender))
            .finish_non_exhaustive()
    }
}

/// Debug helper printing the first bytes of a key.
struct KeyPrefix<'a>(&'a [u8; PUBLIC_KEY_SIZE]);

impl fmt::Debug for KeyPrefix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        f.write_str("..")
    }
}
