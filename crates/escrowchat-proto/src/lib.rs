//! Escrowchat wire types
//!
//! Everything that crosses the transport between two clients, or between a
//! client and the certificate authority:
//!
//! - [`MessageHeader`]: fixed 144-byte binary header. Its exact byte image is
//!   the associated data of the message AEAD, so the layout is frozen.
//! - [`Envelope`]: header plus ciphertext, the opaque unit the relay carries.
//! - [`Certificate`] / [`SignedCertificate`]: CBOR-encoded identity bindings
//!   distributed out of band.
//!
//! Nothing in this crate performs cryptography. Parsing accepts any byte
//! pattern of the right size; authenticity is established by the caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod certificate;
pub mod envelope;
pub mod errors;
pub mod header;

pub use certificate::{Certificate, SignedCertificate};
pub use envelope::Envelope;
pub use errors::{Result, WireError};
pub use header::MessageHeader;
