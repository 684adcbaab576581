//! Key agreement: from long-term identities to a ratchet seed.
//!
//! Both peers combine two Diffie-Hellman terms:
//!
//! - identity term: `DH(identity_A, identity_B)`, used as the HKDF salt
//! - ephemeral term: `DH(ephemeral_A, identity_B)`, used as HKDF input
//!
//! The initiator knows `identity_A` and `ephemeral_A`; the responder computes
//! the same values from `identity_B` and the public halves. Only the holder of
//! a certified identity secret can reproduce the identity term, so a message
//! that authenticates under the derived chain came from the certified peer.

use zeroize::Zeroizing;

use crate::{
    KEY_SIZE,
    error::CryptoError,
    keys::{Keypair, PublicKey, SecretKey, SharedSecret},
    provider::CryptoProvider,
    ratchet::ChainKey,
};

/// HKDF info label for session key derivation
pub const RATCHET_SALT_LABEL: &[u8] = b"ratchet-salt";

/// Post-handshake shared secret.
///
/// Retained in the session but not used for messages after the initial
/// derivation.
pub struct RootKey(Zeroizing<[u8; KEY_SIZE]>);

impl RootKey {
    /// Raw root key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Output of key agreement.
pub struct SessionKeys {
    /// Root key of the session direction
    pub root_key: RootKey,
    /// First chain key of the ratchet
    pub chain_key: ChainKey,
}

/// Derive session keys from the two DH terms.
pub fn derive_session_keys(
    provider: &impl CryptoProvider,
    identity_term: &SharedSecret,
    ephemeral_term: &SharedSecret,
) -> SessionKeys {
    let (root_key, chain_key) =
        provider.derive_keys(ephemeral_term.as_bytes(), identity_term.as_bytes(), RATCHET_SALT_LABEL);

    SessionKeys { root_key: RootKey(root_key), chain_key: ChainKey::from_bytes(chain_key) }
}

/// Sender side: derive keys for messages to `peer_identity`.
///
/// `ephemeral` is the per-peer keypair whose public half travels in every
/// header.
///
/// # Errors
///
/// - `CryptoError::WeakPublicKey` if the peer identity key is low-order
pub fn initiate(
    provider: &impl CryptoProvider,
    local_identity: &SecretKey,
    ephemeral: &Keypair,
    peer_identity: &PublicKey,
) -> Result<SessionKeys, CryptoError> {
    let identity_term = provider.diffie_hellman(local_identity, peer_identity)?;
    let ephemeral_term = provider.diffie_hellman(&ephemeral.secret, peer_identity)?;

    Ok(derive_session_keys(provider, &identity_term, &ephemeral_term))
}

/// Receiver side: derive keys for messages from `peer_identity`, which
/// advertised `peer_ephemeral` in its headers.
///
/// # Errors
///
/// - `CryptoError::WeakPublicKey` if either peer key is low-order
pub fn respond(
    provider: &impl CryptoProvider,
    local_identity: &SecretKey,
    peer_identity: &PublicKey,
    peer_ephemeral: &PublicKey,
) -> Result<SessionKeys, CryptoError> {
    let identity_term = provider.diffie_hellman(local_identity, peer_identity)?;
    let ephemeral_term = provider.diffie_hellman(local_identity, peer_ephemeral)?;

    Ok(derive_session_keys(provider, &identity_term, &ephemeral_term))
}
