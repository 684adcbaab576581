//! Escrowchat Cryptographic Primitives
//!
//! Cryptographic building blocks for escrowchat. Pure functions with
//! deterministic outputs. Callers provide random bytes for deterministic
//! testing.
//!
//! # Key Lifecycle
//!
//! ```text
//! DH(identity, peer identity) ──salt──┐
//! DH(ephemeral, peer identity) ──ikm──┤
//!                                     ▼
//!                HKDF "ratchet-salt" → (Root Key, Chain Key)
//!                                               │
//!                                               ▼
//!                      HMAC "ck-str" / "mk-str" → (Next Chain Key, Message Key)
//!                                                                   │
//!                              ┌────────────────────────────────────┤
//!                              ▼                                    ▼
//!            AES-GCM(message key, header as AAD)     Escrow: DH(fresh ephemeral,
//!                      → Ciphertext                   escrow key) → "AES-generation"
//!                                                     → AES-GCM(message key)
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - Chain keys advance through HMAC, a one-way function
//! - Chain keys and message keys are zeroized on drop
//!
//! Authenticity:
//! - The static-static DH term means only the certified peer can derive a
//!   session's chain keys
//! - AES-GCM authenticates the full header as associated data
//!
//! Exceptional Access:
//! - Every message key is independently wrapped for a fixed escrow public key
//!   under a fresh ephemeral key, so escrow entries do not share secrets

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agreement;
pub mod codec;
pub mod error;
pub mod escrow;
pub mod keys;
pub mod provider;
pub mod ratchet;

pub use agreement::{RootKey, SessionKeys};
pub use error::{AuthError, CryptoError};
pub use escrow::{EscrowEntropy, EscrowedKey};
pub use keys::{Keypair, PublicKey, SecretKey, SharedSecret};
pub use provider::{CryptoProvider, RustCryptoProvider};
pub use ratchet::{ChainKey, MessageKey};

/// Symmetric key size (AES-256, HMAC-SHA256 output)
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size
pub const IV_SIZE: usize = 12;

/// AES-GCM authentication tag size
pub const TAG_SIZE: usize = 16;
