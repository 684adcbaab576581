//! Property-based tests for delivery ordering and authentication.
//!
//! 1. **Reordering**: any arrival order delivers every message exactly once,
//!    in sequence order
//! 2. **Duplication**: duplicates never produce a second delivery
//! 3. **Integrity**: a single flipped bit anywhere in an envelope is never
//!    delivered and never moves the watermark

use ed25519_dalek::{Signer, SigningKey};
use escrowchat_client::{CryptoProvider, Envelope, Messenger, RustCryptoProvider, SeededEnv};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().unwrap()
}

async fn alice_and_bob(seed: u64) -> (Messenger<SeededEnv>, Messenger<SeededEnv>) {
    let authority = SigningKey::from_bytes(&[0xCA; 32]);
    let escrow = RustCryptoProvider.generate_keypair([0xE5; 32]);
    let authority_key = authority.verifying_key().to_bytes();

    let alice = Messenger::new(SeededEnv::new(seed), authority_key, escrow.public);
    let bob = Messenger::new(SeededEnv::new(seed ^ 0xFFFF), authority_key, escrow.public);

    for (subject, name, peer) in [(&alice, "alice", &bob), (&bob, "bob", &alice)] {
        let certificate = subject.issue_certificate(name).await.unwrap();
        let signature = authority.sign(&certificate.to_signing_bytes().unwrap()).to_bytes();
        peer.accept_certificate(certificate, &signature).await.unwrap();
    }

    (alice, bob)
}

async fn send_many(alice: &Messenger<SeededEnv>, count: usize) -> Vec<Envelope> {
    let mut envelopes = Vec::with_capacity(count);
    for i in 0..count {
        envelopes.push(alice.send_message("bob", &i.to_be_bytes()).await.unwrap());
    }
    envelopes
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_any_order_delivers_in_sequence(
        seed in any::<u64>(),
        order in Just((0..12usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let delivered = runtime().block_on(async {
            let (alice, bob) = alice_and_bob(seed).await;
            let envelopes = send_many(&alice, order.len()).await;

            let mut delivered = Vec::new();
            for &index in &order {
                if let Some(delivery) =
                    bob.receive_message("alice", envelopes[index].clone()).await.unwrap()
                {
                    delivered.extend(delivery.into_messages());
                }
            }
            delivered
        });

        let sequence: Vec<u64> = delivered.iter().map(|m| m.sequence_number).collect();
        prop_assert_eq!(sequence, (1..=12).collect::<Vec<u64>>());
        for message in &delivered {
            let index = (message.sequence_number - 1) as usize;
            prop_assert_eq!(&message.plaintext, &index.to_be_bytes().to_vec());
        }
    }

    #[test]
    fn prop_duplicates_deliver_once(
        seed in any::<u64>(),
        order in Just((0..16usize).map(|i| i % 8).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let count = runtime().block_on(async {
            let (alice, bob) = alice_and_bob(seed).await;
            let envelopes = send_many(&alice, 8).await;

            let mut count = 0;
            for &index in &order {
                // Second copies are either replays or re-buffered; both are fine
                if let Ok(Some(delivery)) =
                    bob.receive_message("alice", envelopes[index].clone()).await
                {
                    count += delivery.message_count();
                }
            }
            count
        });

        prop_assert_eq!(count, 8);
    }

    #[test]
    fn prop_bit_flip_never_delivers(
        seed in any::<u64>(),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        runtime().block_on(async {
            let (alice, bob) = alice_and_bob(seed).await;
            let envelope = alice.send_message("bob", b"bit flip target").await.unwrap();

            let mut bytes = envelope.to_vec().unwrap();
            let index = position.index(bytes.len());
            bytes[index] ^= 1 << bit;
            let tampered = Envelope::decode(&bytes).unwrap();

            let result = bob.receive_message("alice", tampered).await;
            assert!(!matches!(result, Ok(Some(_))), "tampered envelope delivered");
            assert_eq!(bob.session_state("alice").await.unwrap().last_received_seq, 0);

            let delivery = bob.receive_message("alice", envelope).await.unwrap().unwrap();
            assert_eq!(delivery.plaintext(), b"bit flip target");
        });
    }
}
