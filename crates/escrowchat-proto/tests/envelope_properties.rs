//! Property-based tests for envelope encoding/decoding
//!
//! The header's byte image doubles as AEAD associated data, so the properties
//! that matter are layout stability and decoding totality on arbitrary input.

use escrowchat_proto::{Envelope, MessageHeader, SignedCertificate, WireError};
use proptest::prelude::*;

/// Strategy for generating arbitrary message headers
fn arbitrary_header() -> impl Strategy<Value = MessageHeader> {
    (
        any::<[u8; 32]>(),
        prop::collection::vec(any::<u8>(), 48),
        any::<[u8; 12]>(),
        any::<[u8; 12]>(),
        any::<[u8; 32]>(),
        any::<u64>(),
    )
        .prop_map(|(gov, escrow, message_iv, escrow_iv, sender, sequence_number)| {
            let mut escrow_ciphertext = [0u8; 48];
            escrow_ciphertext.copy_from_slice(&escrow);
            MessageHeader::new(gov, escrow_ciphertext, message_iv, escrow_iv, sender, sequence_number)
        })
}

/// Strategy for generating envelopes with a plausible ciphertext
fn arbitrary_envelope() -> impl Strategy<Value = Envelope> {
    (arbitrary_header(), prop::collection::vec(any::<u8>(), 16..1024))
        .prop_map(|(header, ciphertext)| Envelope::new(header, ciphertext))
}

#[test]
fn prop_envelope_decode_inverts_encode() {
    proptest!(|(envelope in arbitrary_envelope())| {
        let bytes = envelope.to_vec().expect("encode should succeed");
        let decoded = Envelope::decode(&bytes).expect("decode should succeed");

        prop_assert_eq!(decoded, envelope);
    });
}

#[test]
fn prop_header_bytes_are_stable() {
    proptest!(|(header in arbitrary_header())| {
        let bytes = header.to_bytes();
        let reparsed = MessageHeader::from_bytes(&bytes).expect("144 bytes always parse");

        // PROPERTY: associated data computed by either peer is identical
        prop_assert_eq!(reparsed.to_bytes(), bytes);
        prop_assert_eq!(&bytes[136..144], &header.sequence_number().to_be_bytes()[..]);
    });
}

#[test]
fn prop_single_bit_flip_changes_header_bytes() {
    proptest!(|(header in arbitrary_header(), bit in 0usize..MessageHeader::SIZE * 8)| {
        let mut bytes = header.to_bytes();
        bytes[bit / 8] ^= 1 << (bit % 8);

        let flipped = MessageHeader::from_bytes(&bytes).expect("144 bytes always parse");
        prop_assert_ne!(flipped, &header);
    });
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..512))| {
        match Envelope::decode(&bytes) {
            Ok(envelope) => prop_assert_eq!(envelope.encoded_len(), bytes.len()),
            Err(WireError::EnvelopeTooShort { actual, .. }) => prop_assert_eq!(actual, bytes.len()),
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    });
}

#[test]
fn prop_certificate_decode_never_panics() {
    proptest!(|(bytes in prop::collection::vec(any::<u8>(), 0..256))| {
        let _ = SignedCertificate::decode(&bytes);
    });
}

#[test]
fn header_layout_snapshot() {
    let header = MessageHeader::new([0x11; 32], [0x22; 48], [0x33; 12], [0x44; 12], [0x55; 32], 1);
    let encoded = hex::encode(header.to_bytes());

    let expected = format!(
        "{}{}{}{}{}{}",
        "11".repeat(32),
        "22".repeat(48),
        "33".repeat(12),
        "44".repeat(12),
        "55".repeat(32),
        "0000000000000001"
    );
    assert_eq!(encoded, expected);
}
