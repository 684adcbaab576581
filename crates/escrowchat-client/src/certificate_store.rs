//! Accepted peer certificates.
//!
//! A certificate enters the store only after the authority signature over its
//! canonical CBOR bytes verifies. Entries are never modified afterwards.

use std::collections::HashMap;

use escrowchat_crypto::{CryptoProvider, PublicKey, provider::AUTHORITY_KEY_SIZE};
use escrowchat_proto::Certificate;
use tracing::{info, warn};

use crate::error::CertificateError;

/// Username to certified public key, pinned to one authority.
///
/// # Invariants
///
/// - Every entry carried a valid authority signature when it was inserted
#[derive(Debug, Clone)]
pub struct CertificateStore {
    authority_key: [u8; AUTHORITY_KEY_SIZE],
    certificates: HashMap<String, Certificate>,
}

impl CertificateStore {
    /// Create an empty store trusting `authority_key`.
    pub fn new(authority_key: [u8; AUTHORITY_KEY_SIZE]) -> Self {
        Self { authority_key, certificates: HashMap::new() }
    }

    /// Verify and store a peer certificate.
    ///
    /// Accepting a certificate for a username already present replaces the
    /// entry; sessions established under the old key stay bound to it.
    ///
    /// # Errors
    ///
    /// - `CertificateError::InvalidSignature` if the signature does not verify
    /// - `CertificateError::Wire` if the certificate cannot be encoded
    pub fn accept(
        &mut self,
        provider: &impl CryptoProvider,
        certificate: Certificate,
        signature: &[u8],
    ) -> Result<(), CertificateError> {
        let signed_bytes = certificate.to_signing_bytes()?;
        if !provider.verify_signature(&self.authority_key, &signed_bytes, signature) {
            warn!(peer = %certificate.username, "rejected certificate with invalid signature");
            return Err(CertificateError::InvalidSignature);
        }

        info!(peer = %certificate.username, "accepted certificate");
        self.certificates.insert(certificate.username.clone(), certificate);
        Ok(())
    }

    /// Certified public key for `username`.
    pub fn lookup(&self, username: &str) -> Option<PublicKey> {
        self.certificates.get(username).map(|c| PublicKey::from_bytes(c.public_key))
    }

    /// Full certificate for `username`.
    pub fn get(&self, username: &str) -> Option<&Certificate> {
        self.certificates.get(username)
    }

    /// Number of accepted certificates.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Returns true if no certificate has been accepted.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::{Signer, SigningKey};
    use escrowchat_crypto::RustCryptoProvider;

    use super::*;

    const PROVIDER: RustCryptoProvider = RustCryptoProvider;

    fn authority() -> SigningKey {
        SigningKey::from_bytes(&[7; 32])
    }

    fn signed(username: &str, key_byte: u8) -> (Certificate, Vec<u8>) {
        let certificate = Certificate::new(username, [key_byte; 32]).unwrap();
        let signature = authority().sign(&certificate.to_signing_bytes().unwrap());
        (certificate, signature.to_bytes().to_vec())
    }

    fn store() -> CertificateStore {
        CertificateStore::new(authority().verifying_key().to_bytes())
    }

    #[test]
    fn accepts_authority_signed_certificate() {
        let mut store = store();
        let (certificate, signature) = signed("bob", 9);

        store.accept(&PROVIDER, certificate.clone(), &signature).unwrap();

        assert_eq!(store.lookup("bob"), Some(PublicKey::from_bytes([9; 32])));
        assert_eq!(store.get("bob"), Some(&certificate));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rejects_forged_signature() {
        let mut store = store();
        let (certificate, mut signature) = signed("bob", 9);
        signature[0] ^= 0x01;

        let result = store.accept(&PROVIDER, certificate, &signature);

        assert_eq!(result, Err(CertificateError::InvalidSignature));
        assert!(store.is_empty());
        assert!(store.lookup("bob").is_none());
    }

    #[test]
    fn rejects_signature_over_other_certificate() {
        let mut store = store();
        let (_, signature) = signed("bob", 9);
        let substituted = Certificate::new("bob", [10; 32]).unwrap();

        let result = store.accept(&PROVIDER, substituted, &signature);
        assert_eq!(result, Err(CertificateError::InvalidSignature));
    }

    #[test]
    fn rejects_other_authority() {
        let mut store = store();
        let certificate = Certificate::new("bob", [9; 32]).unwrap();
        let rogue = SigningKey::from_bytes(&[8; 32]);
        let signature = rogue.sign(&certificate.to_signing_bytes().unwrap()).to_bytes();

        let result = store.accept(&PROVIDER, certificate, &signature);
        assert_eq!(result, Err(CertificateError::InvalidSignature));
    }
}
