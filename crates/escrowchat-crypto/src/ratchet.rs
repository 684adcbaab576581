//! Symmetric Ratchet for forward-secure message key derivation
//!
//! # Security Properties
//!
//! - Forward Secrecy: the next chain key is `HMAC(chain_key, "ck-str")`, so a
//!   captured chain key reveals nothing about earlier chain or message keys
//! - Key Separation: message keys use a distinct label (`"mk-str"`), so a
//!   message key never equals any chain key
//! - Determinism: same chain key always produces the same step
//!
//! Advancing is non-destructive: [`ChainKey::advance`] returns the successor
//! and leaves the caller to commit it. Receivers rely on this to keep their
//! chain untouched when a message fails authentication.

use zeroize::Zeroizing;

use crate::{KEY_SIZE, provider::CryptoProvider};

/// Label for deriving the next chain key
pub const CHAIN_LABEL: &[u8] = b"ck-str";

/// Label for deriving a message key
pub const MESSAGE_LABEL: &[u8] = b"mk-str";

/// Current position of one direction's ratchet.
///
/// Not `Clone`: a chain key has exactly one owner, and the old value is
/// zeroized when the owner replaces it.
pub struct ChainKey(Zeroizing<[u8; KEY_SIZE]>);

impl ChainKey {
    /// Wrap raw key material, e.g. the output of key agreement.
    pub fn from_bytes(bytes: Zeroizing<[u8; KEY_SIZE]>) -> Self {
        Self(bytes)
    }

    /// Take one ratchet step.
    ///
    /// Returns `(next_chain_key, message_key)`. Both are derived from this
    /// chain key with distinct labels; neither can be inverted to recover it.
    pub fn advance(&self, provider: &impl CryptoProvider) -> (ChainKey, MessageKey) {
        let next = provider.derive_symmetric_key(self.0.as_slice(), CHAIN_LABEL);
        let message = provider.derive_symmetric_key(self.0.as_slice(), MESSAGE_LABEL);

        (ChainKey(next), MessageKey(message))
    }
}

/// A message key derived from the ratchet.
///
/// Used for exactly one encryption or decryption, then dropped (and
/// zeroized).
pub struct MessageKey(Zeroizing<[u8; KEY_SIZE]>);

impl MessageKey {
    /// 32-byte symmetric key for the message AEAD.
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Rebuild a message key recovered from an escrow entry.
    pub(crate) fn from_recovered(bytes: Zeroizing<[u8; KEY_SIZE]>) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::RustCryptoProvider;

    const PROVIDER: RustCryptoProvider = RustCryptoProvider;

    fn test_chain() -> ChainKey {
        let mut seed = [0u8; 32];
        for (i, byte) in seed.iter_mut().enumerate() {
            *byte = i as u8;
        }
        ChainKey::from_bytes(Zeroizing::new(seed))
    }

    #[test]
    fn advance_produces_unique_keys() {
        let chain0 = test_chain();
        let (chain1, key0) = chain0.advance(&PROVIDER);
        let (chain2, key1) = chain1.advance(&PROVIDER);
        let (_, key2) = chain2.advance(&PROVIDER);

        assert_ne!(key0.key(), key1.key(), "keys must be unique");
        assert_ne!(key1.key(), key2.key(), "keys must be unique");
        assert_ne!(key0.key(), key2.key(), "keys must be unique");
    }

    #[test]
    fn message_key_differs_from_next_chain_key() {
        let (next, message) = test_chain().advance(&PROVIDER);
        assert_ne!(next.0.as_slice(), message.key().as_slice());
    }

    #[test]
    fn advance_is_deterministic() {
        let (next_a, key_a) = test_chain().advance(&PROVIDER);
        let (next_b, key_b) = test_chain().advance(&PROVIDER);

        assert_eq!(key_a.key(), key_b.key(), "same chain must produce same message key");
        assert_eq!(*next_a.0, *next_b.0, "same chain must produce same successor");
    }

    #[test]
    fn advance_does_not_mutate_current_chain() {
        let chain = test_chain();
        let before = *chain.0;

        let _ = chain.advance(&PROVIDER);
        let _ = chain.advance(&PROVIDER);

        assert_eq!(*chain.0, before);
    }

    #[test]
    fn different_chains_produce_different_keys() {
        let a = ChainKey::from_bytes(Zeroizing::new([1u8; 32]));
        let b = ChainKey::from_bytes(Zeroizing::new([2u8; 32]));

        let (_, key_a) = a.advance(&PROVIDER);
        let (_, key_b) = b.advance(&PROVIDER);

        assert_ne!(key_a.key(), key_b.key(), "different chains must produce different keys");
    }

    /// Walking forward from the post-advance chain key never reproduces the
    /// message key that was consumed before it.
    #[test]
    fn successor_chain_cannot_rederive_previous_message_key() {
        let (chain_n, previous_key) = test_chain().advance(&PROVIDER);

        let mut chain = chain_n;
        for _ in 0..64 {
            let (next, key) = chain.advance(&PROVIDER);
            assert_ne!(key.key(), previous_key.key());
            assert_ne!(next.0.as_slice(), previous_key.key().as_slice());

            let relabelled = PROVIDER.derive_symmetric_key(next.0.as_slice(), MESSAGE_LABEL);
            assert_ne!(*relabelled, *previous_key.key());
            chain = next;
        }
    }
}
