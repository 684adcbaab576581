//! Fuzz target for Envelope::decode
//!
//! Feeds arbitrary byte sequences to the envelope parser to find:
//! - Parser crashes or panics
//! - Length arithmetic that over- or under-reads
//! - Inputs that decode but do not re-encode to the same bytes
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use escrowchat_proto::Envelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(envelope) = Envelope::decode(data) {
        let encoded = envelope.to_vec().expect("decoded envelope must re-encode");
        assert_eq!(encoded, data, "decode/encode must be lossless");
    }
});
