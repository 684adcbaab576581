//! Escrow holder: decrypts any message from its header alone.
//!
//! The header carries the message key wrapped for the escrow public key. The
//! holder of the matching secret key unwraps it and opens the ciphertext
//! without any session state and without either peer's cooperation.

use escrowchat_crypto::{
    CryptoProvider, EscrowedKey, MessageKey, PublicKey, RustCryptoProvider, SecretKey, codec,
    escrow,
};
use escrowchat_proto::{Envelope, MessageHeader};
use tracing::debug;

use crate::error::ProtocolError;

/// Holder of the escrow secret key.
pub struct EscrowAuthority<P: CryptoProvider = RustCryptoProvider> {
    provider: P,
    secret: SecretKey,
}

impl EscrowAuthority {
    /// Create an authority with the default crypto provider.
    pub fn new(secret: SecretKey) -> Self {
        Self::with_provider(RustCryptoProvider, secret)
    }
}

impl<P: CryptoProvider> EscrowAuthority<P> {
    /// Create an authority with a custom crypto provider.
    pub fn with_provider(provider: P, secret: SecretKey) -> Self {
        Self { provider, secret }
    }

    /// Unwrap the message key carried in `header`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::EscrowRejected` if the escrow fields do not decrypt
    /// - `CryptoError::WeakPublicKey` if the escrow ephemeral key is low-order
    pub fn recover_message_key(&self, header: &MessageHeader) -> Result<MessageKey, ProtocolError> {
        let escrowed = EscrowedKey {
            ephemeral_public: PublicKey::from_bytes(*header.gov_ephemeral_public_key()),
            ciphertext: *header.escrow_ciphertext(),
            iv: *header.escrow_iv(),
        };

        Ok(escrow::recover(&self.provider, &self.secret, &escrowed)?)
    }

    /// Decrypt an envelope addressed to anyone.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Crypto` if the escrow entry cannot be unwrapped
    /// - `ProtocolError::Auth` if the ciphertext or header was tampered with
    pub fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, ProtocolError> {
        let header = &envelope.header;
        let message_key = self.recover_message_key(header)?;

        let plaintext = codec::open(
            &self.provider,
            &message_key,
            &envelope.ciphertext,
            header.message_iv(),
            &header.to_bytes(),
        )?;

        debug!(sequence_number = header.sequence_number(), "escrow decryption succeeded");
        Ok(plaintext)
    }
}
