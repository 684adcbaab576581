//! Primitive provider seam.
//!
//! The protocol never calls a cipher directly. Everything goes through
//! [`CryptoProvider`], so deployments can substitute an audited or hardware
//! backed implementation. [`RustCryptoProvider`] is the default, built on the
//! RustCrypto and dalek crates.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use ed25519_dalek::{Signature, VerifyingKey};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use x25519_dalek::StaticSecret;
use zeroize::Zeroizing;

use crate::{
    IV_SIZE, KEY_SIZE,
    error::{AuthError, CryptoError},
    keys::{Keypair, PublicKey, SecretKey, SharedSecret},
};

type HmacSha256 = Hmac<Sha256>;

/// Size of an Ed25519 authority public key
pub const AUTHORITY_KEY_SIZE: usize = 32;

/// Primitive operations the protocol is built from.
///
/// # Contract
///
/// Implementations MUST guarantee:
///
/// - `generate_keypair` is a deterministic function of `entropy`
/// - `diffie_hellman` is symmetric: `DH(a, B) == DH(b, A)`
/// - `derive_symmetric_key` is one-way in `ikm`
/// - `aead_seal` output is plaintext length plus a 16-byte tag
/// - `aead_open` fails if any byte of key, iv, ciphertext or `aad` differs
pub trait CryptoProvider: Send + Sync {
    /// Derive a keypair from 32 bytes of caller-supplied entropy.
    fn generate_keypair(&self, entropy: [u8; KEY_SIZE]) -> Keypair;

    /// Compute a Diffie-Hellman shared secret.
    ///
    /// # Errors
    ///
    /// - `CryptoError::WeakPublicKey` if `public` is a low-order point
    fn diffie_hellman(
        &self,
        secret: &SecretKey,
        public: &PublicKey,
    ) -> Result<SharedSecret, CryptoError>;

    /// HKDF extract-and-expand into two independent keys.
    fn derive_keys(
        &self,
        ikm: &[u8],
        salt: &[u8],
        label: &[u8],
    ) -> (Zeroizing<[u8; KEY_SIZE]>, Zeroizing<[u8; KEY_SIZE]>);

    /// HMAC-derived symmetric key: `HMAC(ikm, label)`.
    fn derive_symmetric_key(&self, ikm: &[u8], label: &[u8]) -> Zeroizing<[u8; KEY_SIZE]>;

    /// Authenticated encryption.
    fn aead_seal(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Vec<u8>;

    /// Authenticated decryption.
    ///
    /// # Errors
    ///
    /// - `AuthError::Forged` if the tag does not verify
    fn aead_open(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, AuthError>;

    /// Verify an authority signature. Malformed keys or signatures verify as
    /// `false`.
    fn verify_signature(
        &self,
        authority_key: &[u8; AUTHORITY_KEY_SIZE],
        message: &[u8],
        signature: &[u8],
    ) -> bool;
}

/// Default provider: X25519, HKDF-SHA256, HMAC-SHA256, AES-256-GCM, Ed25519.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCryptoProvider;

impl CryptoProvider for RustCryptoProvider {
    fn generate_keypair(&self, entropy: [u8; KEY_SIZE]) -> Keypair {
        let secret = StaticSecret::from(entropy);
        let public = x25519_dalek::PublicKey::from(&secret);

        Keypair {
            public: PublicKey::from_bytes(public.to_bytes()),
            secret: SecretKey::from_bytes(secret.to_bytes()),
        }
    }

    fn diffie_hellman(
        &self,
        secret: &SecretKey,
        public: &PublicKey,
    ) -> Result<SharedSecret, CryptoError> {
        let secret = StaticSecret::from(*secret.as_bytes());
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(public.to_bytes()));

        if !shared.was_contributory() {
            return Err(CryptoError::WeakPublicKey);
        }

        Ok(SharedSecret::from_bytes(shared.to_bytes()))
    }

    fn derive_keys(
        &self,
        ikm: &[u8],
        salt: &[u8],
        label: &[u8],
    ) -> (Zeroizing<[u8; KEY_SIZE]>, Zeroizing<[u8; KEY_SIZE]>) {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);

        let mut okm = Zeroizing::new([0u8; 2 * KEY_SIZE]);
        let Ok(()) = hkdf.expand(label, &mut okm[..]) else {
            unreachable!("64 bytes is a valid HKDF-SHA256 output length");
        };

        let mut first = Zeroizing::new([0u8; KEY_SIZE]);
        let mut second = Zeroizing::new([0u8; KEY_SIZE]);
        first.copy_from_slice(&okm[..KEY_SIZE]);
        second.copy_from_slice(&okm[KEY_SIZE..]);

        (first, second)
    }

    fn derive_symmetric_key(&self, ikm: &[u8], label: &[u8]) -> Zeroizing<[u8; KEY_SIZE]> {
        let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(ikm) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(label);

        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        key.copy_from_slice(&mac.finalize().into_bytes());
        key
    }

    fn aead_seal(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Vec<u8> {
        let cipher = Aes256Gcm::new(key.into());

        let Ok(ciphertext) =
            cipher.encrypt(Nonce::from_slice(iv), Payload { msg: plaintext, aad })
        else {
            unreachable!("AES-GCM encryption cannot fail below the 64 GiB plaintext limit");
        };

        ciphertext
    }

    fn aead_open(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>, AuthError> {
        let cipher = Aes256Gcm::new(key.into());

        cipher
            .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad })
            .map_err(|_| AuthError::Forged)
    }

    fn verify_signature(
        &self,
        authority_key: &[u8; AUTHORITY_KEY_SIZE],
        message: &[u8],
        signature: &[u8],
    ) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(authority_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };

        verifying_key.verify_strict(message, &signature).is_ok()
    }
}
