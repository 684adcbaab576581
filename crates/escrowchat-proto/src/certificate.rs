//! CBOR-encoded identity certificates.
//!
//! A [`Certificate`] binds a username to a long-term X25519 public key. The
//! certificate authority signs the exact CBOR encoding produced by
//! [`Certificate::to_signing_bytes`]; clients verify that same byte string.
//!
//! CBOR encoding of a struct is deterministic here: fields are emitted in
//! declaration order and byte arrays have a fixed length, so the same
//! certificate always produces the same bytes.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{Result, WireError},
    header::PUBLIC_KEY_SIZE,
};

/// Maximum username length in bytes
pub const MAX_USERNAME_LEN: usize = 255;

/// Upper bound on an encoded [`SignedCertificate`]
pub const MAX_CERTIFICATE_SIZE: usize = 4096;

/// Username bound to a long-term public key.
///
/// Immutable once accepted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Peer name, 1..=255 bytes of UTF-8
    pub username: String,
    /// Long-term X25519 public key
    pub public_key: [u8; PUBLIC_KEY_SIZE],
}

impl Certificate {
    /// Create a certificate, validating the username.
    ///
    /// # Errors
    ///
    /// - `WireError::InvalidUsername` if the username is empty or longer than
    ///   255 bytes
    pub fn new(username: impl Into<String>, public_key: [u8; PUBLIC_KEY_SIZE]) -> Result<Self> {
        let certificate = Self { username: username.into(), public_key };
        certificate.validate()?;
        Ok(certificate)
    }

    /// The byte string the certificate authority signs.
    ///
    /// # Errors
    ///
    /// - `WireError::CborEncode` if serialization fails
    pub fn to_signing_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.username.len() + 2 * PUBLIC_KEY_SIZE + 32);
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| WireError::CborEncode(e.to_string()))?;
        Ok(buf)
    }

    fn validate(&self) -> Result<()> {
        let length = self.username.len();
        if length == 0 || length > MAX_USERNAME_LEN {
            return Err(WireError::InvalidUsername { length, max: MAX_USERNAME_LEN });
        }
        Ok(())
    }
}

/// Certificate plus authority signature, as distributed out of band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCertificate {
    /// The signed certificate
    pub certificate: Certificate,
    /// Authority signature over [`Certificate::to_signing_bytes`]
    pub signature: Vec<u8>,
}

impl SignedCertificate {
    /// Pair a certificate with its signature.
    #[must_use]
    pub fn new(certificate: Certificate, signature: Vec<u8>) -> Self {
        Self { certificate, signature }
    }

    /// Encode to CBOR.
    ///
    /// # Errors
    ///
    /// - `WireError::CborEncode` if serialization fails
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| WireError::CborEncode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    ///
    /// # Errors
    ///
    /// - `WireError::CertificateTooLarge` if input exceeds 4 KiB (checked
    ///   before parsing)
    /// - `WireError::CborDecode` if the input is not a signed certificate
    /// - `WireError::InvalidUsername` if the embedded username is invalid
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_CERTIFICATE_SIZE {
            return Err(WireError::CertificateTooLarge {
                size: bytes.len(),
                max: MAX_CERTIFICATE_SIZE,
            });
        }

        let signed: Self =
            ciborium::de::from_reader(bytes).map_err(|e| WireError::CborDecode(e.to_string()))?;
        signed.certificate.validate()?;
        Ok(signed)
    }
}
