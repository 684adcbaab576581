//! Fuzz target for certificate CBOR decoding
//!
//! Certificates arrive out of band from an untrusted channel and are decoded
//! before their signature is checked.
//!
//! # Strategy
//!
//! - Random bytes: arbitrary CBOR data
//! - Deeply nested: arrays nested to arbitrary depth (stack overflow)
//! - Huge lengths: CBOR claiming massive byte/string lengths (memory)
//! - Field mutation: valid certificate with one byte changed
//!
//! # Invariants
//!
//! - NEVER panic on malformed CBOR
//! - Huge claimed lengths rejected (not allocated)
//! - Anything that decodes has a valid username length

#![no_main]

use arbitrary::Arbitrary;
use escrowchat_proto::{Certificate, SignedCertificate};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum CborAttack {
    RandomBytes { bytes: Vec<u8> },
    DeeplyNested { depth: u8 },
    HugeLength { claimed_len_exponent: u8 },
    Mutated { username: String, public_key: [u8; 32], position: u16, value: u8 },
}

fuzz_target!(|attack: CborAttack| {
    let bytes = match attack {
        CborAttack::RandomBytes { bytes } => bytes,
        CborAttack::DeeplyNested { depth } => {
            let mut bytes = vec![0x81; depth as usize];
            bytes.push(0x01);
            bytes
        }
        CborAttack::HugeLength { claimed_len_exponent } => {
            let claimed = 1u32 << (claimed_len_exponent % 32);
            let mut bytes = vec![0xA2, 0x6B];
            bytes.extend_from_slice(b"certificate");
            bytes.push(0x5A);
            bytes.extend_from_slice(&claimed.to_be_bytes());
            bytes.extend_from_slice(&[0xAA; 8]);
            bytes
        }
        CborAttack::Mutated { username, public_key, position, value } => {
            let Ok(certificate) = Certificate::new(username, public_key) else {
                return;
            };
            let Ok(mut bytes) = SignedCertificate::new(certificate, vec![0; 64]).encode() else {
                return;
            };
            let index = position as usize % bytes.len();
            bytes[index] = value;
            bytes
        }
    };

    if let Ok(signed) = SignedCertificate::decode(&bytes) {
        let length = signed.certificate.username.len();
        assert!((1..=255).contains(&length), "decoded certificate with invalid username");
    }
});
