//! Escrow encoder: per-message key wrapping for a fixed third party.
//!
//! Every message key is encrypted a second time, for the holder of the
//! escrow secret key:
//!
//! 1. Generate a fresh ephemeral keypair (one per message)
//! 2. `DH(ephemeral, escrow_public)`
//! 3. `HMAC(shared_secret, "AES-generation")` → escrow AEAD key
//! 4. AES-GCM encrypt the raw message key under a fresh IV
//!
//! The escrow key derivation label differs from the ratchet labels, and each
//! entry uses its own ephemeral, so one recovered entry exposes one message.

use zeroize::Zeroizing;

use crate::{
    IV_SIZE, KEY_SIZE, TAG_SIZE,
    error::CryptoError,
    keys::{PublicKey, SecretKey},
    provider::CryptoProvider,
    ratchet::MessageKey,
};

/// Label for deriving the escrow AEAD key
pub const ESCROW_KEY_LABEL: &[u8] = b"AES-generation";

/// Size of a wrapped message key: key plus GCM tag
pub const ESCROW_CIPHERTEXT_SIZE: usize = KEY_SIZE + TAG_SIZE;

/// Caller-provided randomness for one escrow entry.
pub struct EscrowEntropy {
    /// Seed for the per-message ephemeral keypair
    pub ephemeral_seed: Zeroizing<[u8; KEY_SIZE]>,
    /// Escrow AEAD nonce
    pub iv: [u8; IV_SIZE],
}

/// A message key wrapped for the escrow holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowedKey {
    /// Public half of the per-message ephemeral keypair
    pub ephemeral_public: PublicKey,
    /// Encrypted message key
    pub ciphertext: [u8; ESCROW_CIPHERTEXT_SIZE],
    /// Nonce used for `ciphertext`
    pub iv: [u8; IV_SIZE],
}

/// Wrap `message_key` for the holder of `escrow_public`.
///
/// # Errors
///
/// - `CryptoError::WeakPublicKey` if the escrow key is low-order
/// - `CryptoError::MalformedEscrow` if the provider violates the AEAD length
///   contract
pub fn wrap(
    provider: &impl CryptoProvider,
    escrow_public: &PublicKey,
    message_key: &MessageKey,
    entropy: EscrowEntropy,
) -> Result<EscrowedKey, CryptoError> {
    let ephemeral = provider.generate_keypair(*entropy.ephemeral_seed);
    let shared = provider.diffie_hellman(&ephemeral.secret, escrow_public)?;
    let escrow_key = provider.derive_symmetric_key(shared.as_bytes(), ESCROW_KEY_LABEL);

    let sealed = provider.aead_seal(&escrow_key, &entropy.iv, message_key.key(), &[]);
    let ciphertext: [u8; ESCROW_CIPHERTEXT_SIZE] =
        sealed.as_slice().try_into().map_err(|_| CryptoError::MalformedEscrow {
            expected: ESCROW_CIPHERTEXT_SIZE,
            actual: sealed.len(),
        })?;

    Ok(EscrowedKey { ephemeral_public: ephemeral.public, ciphertext, iv: entropy.iv })
}

/// Recover the message key from an escrow entry.
///
/// Only the holder of the escrow secret key can call this meaningfully.
///
/// # Errors
///
/// - `CryptoError::WeakPublicKey` if the entry's ephemeral key is low-order
/// - `CryptoError::EscrowRejected` if the entry does not decrypt
pub fn recover(
    provider: &impl CryptoProvider,
    escrow_secret: &SecretKey,
    escrowed: &EscrowedKey,
) -> Result<MessageKey, CryptoError> {
    let shared = provider.diffie_hellman(escrow_secret, &escrowed.ephemeral_public)?;
    let escrow_key = provider.derive_symmetric_key(shared.as_bytes(), ESCROW_KEY_LABEL);

    let opened = Zeroizing::new(
        provider
            .aead_open(&escrow_key, &escrowed.iv, &escrowed.ciphertext, &[])
            .map_err(|_| CryptoError::EscrowRejected)?,
    );

    if opened.len() != KEY_SIZE {
        return Err(CryptoError::EscrowRejected);
    }
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&opened);

    Ok(MessageKey::from_recovered(key))
}
