//! AEAD message codec.
//!
//! Seals the payload under a one-time message key. The serialized header is
//! passed as associated data, so any change to any header field, or to the
//! ciphertext, makes [`open`] fail.

use crate::{IV_SIZE, error::AuthError, provider::CryptoProvider, ratchet::MessageKey};

/// Encrypt `plaintext`, binding `associated_data`.
pub fn seal(
    provider: &impl CryptoProvider,
    message_key: &MessageKey,
    plaintext: &[u8],
    iv: &[u8; IV_SIZE],
    associated_data: &[u8],
) -> Vec<u8> {
    provider.aead_seal(message_key.key(), iv, plaintext, associated_data)
}

/// Decrypt `ciphertext`, checking `associated_data`.
///
/// # Errors
///
/// - `AuthError::Forged` if key, iv, ciphertext or associated data do not
///   match what was sealed. No plaintext is returned in that case.
pub fn open(
    provider: &impl CryptoProvider,
    message_key: &MessageKey,
    ciphertext: &[u8],
    iv: &[u8; IV_SIZE],
    associated_data: &[u8],
) -> Result<Vec<u8>, AuthError> {
    provider.aead_open(message_key.key(), iv, ciphertext, associated_data)
}
