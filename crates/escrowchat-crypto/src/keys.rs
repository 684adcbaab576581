//! Asymmetric key material.
//!
//! Public keys are raw 32-byte X25519 encodings, the fixed export format both
//! peers agree on. Secret material is zeroized on drop and never printed.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::KEY_SIZE;

/// Size of a raw X25519 public key
pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PublicKey(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        f.write_str("..)")
    }
}

/// X25519 secret scalar.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw secret bytes. Only providers should need this.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Public and secret halves of an X25519 keypair.
#[derive(Debug)]
pub struct Keypair {
    /// Shareable half
    pub public: PublicKey,
    /// Secret half
    pub secret: SecretKey,
}

/// Raw Diffie-Hellman output. Input keying material only; never used as a
/// key directly.
pub struct SharedSecret(Zeroizing<[u8; KEY_SIZE]>);

impl SharedSecret {
    /// Wrap a DH output.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Borrow the shared secret bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_debug_is_truncated() {
        let key = PublicKey::from_bytes([0xAB; 32]);
        assert_eq!(format!("{key:?}"), "PublicKey(abababababababab..)");
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key = SecretKey::from_bytes([0x42; 32]);
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("42"));
    }
}
