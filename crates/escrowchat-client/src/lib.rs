//! Escrowchat client
//!
//! End-to-end encrypted one-to-one messaging between certificate-holding
//! peers, where every message key is also wrapped for a fixed escrow
//! authority.
//!
//! # Architecture
//!
//! ```text
//!   issue_certificate ──► identity keypair (generated once)
//!   accept_certificate ─► CertificateStore (authority-signed only)
//!
//!   send_message(peer) ──► Session ─► send ratchet step ─► escrow wrap ─► AEAD seal
//!   receive_message(peer) ► Session ─► replay check ─► reorder buffer
//!                                   └► receive ratchet step ─► AEAD open ─► drain
//! ```
//!
//! # Components
//!
//! - [`Messenger`]: top-level client, one identity and many peer sessions
//! - [`CertificateStore`]: verified username to public key bindings
//! - [`EscrowAuthority`]: decrypts any envelope from its header
//! - [`Environment`]: randomness source, seeded in tests
//!
//! The transport is the caller's concern: envelopes are plain values that
//! may be carried, reordered, duplicated or dropped by anything in between.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod certificate_store;
mod config;
mod delivery;
mod env;
mod error;
mod escrow_authority;
mod messenger;
mod reorder;
mod session;

pub use certificate_store::CertificateStore;
pub use config::{FirstContactPolicy, MessengerConfig};
pub use delivery::{Delivery, ReceivedMessage, SessionState};
pub use env::{Environment, SeededEnv, SystemEnv};
pub use error::{CertificateError, ProtocolError};
pub use escrow_authority::EscrowAuthority;
pub use escrowchat_crypto::{
    AuthError, CryptoError, CryptoProvider, Keypair, PublicKey, RustCryptoProvider, SecretKey,
};
pub use escrowchat_proto::{Certificate, Envelope, MessageHeader, SignedCertificate};
pub use messenger::Messenger;
