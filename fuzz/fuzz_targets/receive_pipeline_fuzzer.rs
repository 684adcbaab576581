//! Fuzz target for the receive pipeline (replay check → reorder → open → drain)
//!
//! # Strategy
//!
//! - Valid envelopes delivered in arbitrary order, with duplicates
//! - Tampered envelopes: one bit flipped anywhere in the encoding
//! - Raw bytes decoded as envelopes
//!
//! # Invariants
//!
//! - Delivered sequence numbers are exactly 1, 2, 3, ... with no gaps
//! - Every delivered plaintext is the one the sender sealed at that number
//! - The receive watermark never decreases
//! - The pipeline never panics

#![no_main]

use arbitrary::Arbitrary;
use ed25519_dalek::{Signer, SigningKey};
use escrowchat_client::{
    CryptoProvider, Envelope, Messenger, MessengerConfig, RustCryptoProvider, SeededEnv,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    seed: u64,
    message_count: u8,
    reorder_capacity: u8,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Deliver(u8),
    Tamper { index: u8, position: u16, bit: u8 },
    Raw(Vec<u8>),
}

fuzz_target!(|scenario: Scenario| {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    runtime.block_on(run(scenario));
});

async fn run(scenario: Scenario) {
    let authority = SigningKey::from_bytes(&[0xCA; 32]);
    let authority_key = authority.verifying_key().to_bytes();
    let escrow = RustCryptoProvider.generate_keypair([0xE5; 32]);
    let config = MessengerConfig {
        reorder_capacity: (scenario.reorder_capacity as usize).max(1),
        ..MessengerConfig::default()
    };

    let alice = Messenger::new(SeededEnv::new(scenario.seed), authority_key, escrow.public);
    let bob = Messenger::with_config(
        SeededEnv::new(!scenario.seed),
        authority_key,
        escrow.public,
        config,
    );
    for (subject, name, peer) in [(&alice, "alice", &bob), (&bob, "bob", &alice)] {
        let certificate = subject.issue_certificate(name).await.expect("issue");
        let signature = authority.sign(&certificate.to_signing_bytes().expect("cbor"));
        peer.accept_certificate(certificate, &signature.to_bytes()).await.expect("accept");
    }

    let count = (scenario.message_count % 32).max(1) as usize;
    let mut sent: Vec<(Envelope, Vec<u8>)> = Vec::with_capacity(count);
    for i in 0..count {
        let plaintext = format!("message {i}").into_bytes();
        let envelope = alice.send_message("bob", &plaintext).await.expect("send");
        sent.push((envelope, plaintext));
    }

    let mut next_expected = 1u64;
    let mut watermark = 0u64;

    for step in scenario.steps {
        let envelope = match step {
            Step::Deliver(index) => sent[index as usize % count].0.clone(),
            Step::Tamper { index, position, bit } => {
                let mut bytes = sent[index as usize % count].0.to_vec().expect("encode");
                let at = position as usize % bytes.len();
                bytes[at] ^= 1 << (bit % 8);
                let Ok(envelope) = Envelope::decode(&bytes) else {
                    continue;
                };
                envelope
            }
            Step::Raw(bytes) => {
                let Ok(envelope) = Envelope::decode(&bytes) else {
                    continue;
                };
                envelope
            }
        };

        if let Ok(Some(delivery)) = bob.receive_message("alice", envelope).await {
            for message in delivery.into_messages() {
                assert_eq!(message.sequence_number, next_expected, "gap or reorder in delivery");
                let original = &sent[(message.sequence_number - 1) as usize].1;
                assert_eq!(&message.plaintext, original, "delivered forged plaintext");
                next_expected += 1;
            }
        }

        if let Some(state) = bob.session_state("alice").await {
            assert!(state.last_received_seq >= watermark, "watermark decreased");
            watermark = state.last_received_seq;
        }
    }
}
