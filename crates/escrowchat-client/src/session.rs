//! Per-peer session state.
//!
//! A session holds two independent ratchets. The send chain is derived on the
//! first send from a fresh ephemeral keypair whose public half travels in
//! every header. The receive chain is derived from the sender ephemeral key
//! in the peer's first in-order message and committed only once that message
//! authenticates.
//!
//! # Invariants
//!
//! - `last_sent_seq` and `last_received_seq` never decrease
//! - A chain key is replaced only after the message under its successor key
//!   has been sealed, or has authenticated
//! - A failed receive leaves the session byte-for-byte unchanged, apart from
//!   the reorder buffer when the envelope was ahead of the watermark

use escrowchat_crypto::{
    AuthError, ChainKey, CryptoProvider, Keypair, MessageKey, PublicKey, RootKey, agreement,
    codec,
};
use escrowchat_proto::Envelope;
use tracing::{debug, warn};

use crate::{
    config::MessengerConfig,
    delivery::{Delivery, ReceivedMessage, SessionState},
    env::Environment,
    error::ProtocolError,
    reorder::ReorderBuffer,
};

struct SendChain {
    // Retained for the lifetime of the session, zeroized on drop.
    #[allow(dead_code)]
    root_key: RootKey,
    chain_key: ChainKey,
    ephemeral: Keypair,
}

struct RecvChain {
    #[allow(dead_code)]
    root_key: RootKey,
    chain_key: ChainKey,
    sender_ephemeral: PublicKey,
}

/// Keys for one outgoing message, computed but not yet committed.
pub(crate) struct Outgoing {
    pub(crate) sequence_number: u64,
    pub(crate) sender_ephemeral: PublicKey,
    pub(crate) message_key: MessageKey,
    pub(crate) next_chain: ChainKey,
}

/// Ratchet state shared with one peer.
pub(crate) struct Session {
    peer: String,
    send: Option<SendChain>,
    recv: Option<RecvChain>,
    last_sent_seq: u64,
    last_received_seq: u64,
    pending: ReorderBuffer,
    max_sequence_gap: u64,
}

impl Session {
    pub(crate) fn new(peer: &str, config: &MessengerConfig) -> Self {
        Self {
            peer: peer.to_string(),
            send: None,
            recv: None,
            last_sent_seq: 0,
            last_received_seq: 0,
            pending: ReorderBuffer::new(config.reorder_capacity),
            max_sequence_gap: config.max_sequence_gap,
        }
    }

    /// Compute the keys for the next outgoing message.
    ///
    /// Establishes the send chain on first use. Nothing else changes until
    /// [`Self::commit_send`].
    pub(crate) fn prepare_send(
        &mut self,
        provider: &impl CryptoProvider,
        env: &impl Environment,
        local_identity: &Keypair,
        peer_identity: &PublicKey,
    ) -> Result<Outgoing, ProtocolError> {
        let sequence_number =
            self.last_sent_seq.checked_add(1).ok_or(ProtocolError::SequenceExhausted)?;

        let chain = match self.send.take() {
            Some(chain) => chain,
            None => {
                let ephemeral = provider.generate_keypair(env.random_array());
                let keys =
                    agreement::initiate(provider, &local_identity.secret, &ephemeral, peer_identity)?;
                debug!(peer = %self.peer, "send chain established");
                SendChain { root_key: keys.root_key, chain_key: keys.chain_key, ephemeral }
            },
        };
        let chain = self.send.insert(chain);

        let (next_chain, message_key) = chain.chain_key.advance(provider);
        Ok(Outgoing {
            sequence_number,
            sender_ephemeral: chain.ephemeral.public,
            message_key,
            next_chain,
        })
    }

    /// Advance the send ratchet past a sealed message.
    pub(crate) fn commit_send(&mut self, sequence_number: u64, next_chain: ChainKey) {
        if let Some(chain) = self.send.as_mut() {
            chain.chain_key = next_chain;
            self.last_sent_seq = sequence_number;
        }
    }

    /// Process one envelope from the peer.
    ///
    /// Returns `Ok(None)` when the envelope was buffered for later.
    pub(crate) fn receive(
        &mut self,
        provider: &impl CryptoProvider,
        local_identity: &Keypair,
        peer_identity: &PublicKey,
        envelope: Envelope,
    ) -> Result<Option<Delivery>, ProtocolError> {
        let sequence_number = envelope.sequence_number();
        let watermark = self.last_received_seq;

        if sequence_number <= watermark {
            warn!(peer = %self.peer, sequence_number, watermark, "rejected duplicate or replay");
            return Err(ProtocolError::DuplicateOrReplay { sequence_number, watermark });
        }

        let gap = sequence_number - watermark;
        if gap > 1 {
            if gap > self.max_sequence_gap {
                warn!(peer = %self.peer, sequence_number, watermark, "sequence gap too large");
                return Err(ProtocolError::ReorderBufferFull { capacity: self.pending.capacity() });
            }
            self.pending.insert(envelope)?;
            debug!(peer = %self.peer, sequence_number, watermark, "buffered out-of-order message");
            return Ok(None);
        }

        let plaintext = self.open_next(provider, local_identity, peer_identity, &envelope)?;
        let mut delivery = Delivery::new(sequence_number, plaintext);
        self.drain(provider, local_identity, peer_identity, &mut delivery);
        if !delivery.released.is_empty() {
            debug!(peer = %self.peer, released = delivery.released.len(), "drained reorder buffer");
        }

        Ok(Some(delivery))
    }

    /// Authenticate and decrypt the envelope at `last_received_seq + 1`,
    /// committing the receive ratchet on success.
    fn open_next(
        &mut self,
        provider: &impl CryptoProvider,
        local_identity: &Keypair,
        peer_identity: &PublicKey,
        envelope: &Envelope,
    ) -> Result<Vec<u8>, ProtocolError> {
        let header = &envelope.header;
        let sender_ephemeral = PublicKey::from_bytes(*header.sender_ephemeral_public_key());

        let (next_chain, message_key, fresh_root) = match &self.recv {
            Some(chain) => {
                if chain.sender_ephemeral != sender_ephemeral {
                    warn!(peer = %self.peer, "sender ephemeral key changed mid-session");
                    return Err(ProtocolError::Auth(AuthError::Forged));
                }
                let (next, key) = chain.chain_key.advance(provider);
                (next, key, None)
            },
            None => {
                // The ephemeral key is unauthenticated here; a weak key is a forgery.
                let keys = agreement::respond(
                    provider,
                    &local_identity.secret,
                    peer_identity,
                    &sender_ephemeral,
                )
                .map_err(|error| {
                    warn!(peer = %self.peer, %error, "rejected sender ephemeral key");
                    AuthError::Forged
                })?;
                let (next, key) = keys.chain_key.advance(provider);
                (next, key, Some(keys.root_key))
            },
        };

        let plaintext = codec::open(
            provider,
            &message_key,
            &envelope.ciphertext,
            header.message_iv(),
            &header.to_bytes(),
        )
        .inspect_err(|_| {
            warn!(peer = %self.peer, sequence_number = header.sequence_number(), "forged message");
        })?;

        if let Some(root_key) = fresh_root {
            debug!(peer = %self.peer, "receive chain established");
            self.recv = Some(RecvChain { root_key, chain_key: next_chain, sender_ephemeral });
        } else if let Some(chain) = self.recv.as_mut() {
            chain.chain_key = next_chain;
        }
        self.last_received_seq = header.sequence_number();

        Ok(plaintext)
    }

    /// Release buffered envelopes that are now in order.
    ///
    /// A buffered envelope that fails authentication is discarded and the
    /// drain stops; later entries stay buffered until a valid copy of the
    /// missing sequence number arrives.
    fn drain(
        &mut self,
        provider: &impl CryptoProvider,
        local_identity: &Keypair,
        peer_identity: &PublicKey,
        delivery: &mut Delivery,
    ) {
        while let Some(next) = self.last_received_seq.checked_add(1) {
            let Some(envelope) = self.pending.take(next) else {
                break;
            };

            match self.open_next(provider, local_identity, peer_identity, &envelope) {
                Ok(plaintext) => {
                    delivery.released.push(ReceivedMessage { sequence_number: next, plaintext });
                },
                Err(error) => {
                    warn!(peer = %self.peer, sequence_number = next, %error, "dropped buffered message");
                    break;
                },
            }
        }
    }

    /// Returns true once this side has derived a send chain for the peer.
    pub(crate) fn send_established(&self) -> bool {
        self.send.is_some()
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState {
            last_sent_seq: self.last_sent_seq,
            last_received_seq: self.last_received_seq,
            pending: self.pending.sequence_numbers(),
            send_established: self.send_established(),
            recv_established: self.recv.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use escrowchat_crypto::{EscrowEntropy, RustCryptoProvider, escrow};
    use escrowchat_proto::MessageHeader;
    use zeroize::Zeroizing;

    use super::*;
    use crate::env::SeededEnv;

    const PROVIDER: RustCryptoProvider = RustCryptoProvider;

    struct Pair {
        alice: Keypair,
        bob: Keypair,
        escrow: Keypair,
        env: SeededEnv,
        sender: Session,
        receiver: Session,
    }

    fn pair(config: &MessengerConfig) -> Pair {
        Pair {
            alice: PROVIDER.generate_keypair([1; 32]),
            bob: PROVIDER.generate_keypair([2; 32]),
            escrow: PROVIDER.generate_keypair([3; 32]),
            env: SeededEnv::new(42),
            sender: Session::new("bob", config),
            receiver: Session::new("alice", config),
        }
    }

    impl Pair {
        fn send(&mut self, plaintext: &[u8]) -> Envelope {
            let outgoing =
                self.sender.prepare_send(&PROVIDER, &self.env, &self.alice, &self.bob.public).unwrap();
            let entropy = EscrowEntropy {
                ephemeral_seed: Zeroizing::new(self.env.random_array()),
                iv: self.env.random_array(),
            };
            let escrowed =
                escrow::wrap(&PROVIDER, &self.escrow.public, &outgoing.message_key, entropy).unwrap();
            let iv: [u8; 12] = self.env.random_array();
            let header = MessageHeader::new(
                escrowed.ephemeral_public.to_bytes(),
                escrowed.ciphertext,
                iv,
                escrowed.iv,
                outgoing.sender_ephemeral.to_bytes(),
                outgoing.sequence_number,
            );
            let ciphertext =
                codec::seal(&PROVIDER, &outgoing.message_key, plaintext, &iv, &header.to_bytes());
            self.sender.commit_send(outgoing.sequence_number, outgoing.next_chain);
            Envelope::new(header, ciphertext)
        }

        fn receive(&mut self, envelope: Envelope) -> Result<Option<Delivery>, ProtocolError> {
            self.receiver.receive(&PROVIDER, &self.bob, &self.alice.public, envelope)
        }
    }

    #[test]
    fn in_order_messages_decrypt() {
        let mut pair = pair(&MessengerConfig::default());

        for i in 1..=3u64 {
            let envelope = pair.send(format!("message {i}").as_bytes());
            assert_eq!(envelope.sequence_number(), i);

            let delivery = pair.receive(envelope).unwrap().unwrap();
            assert_eq!(delivery.plaintext(), format!("message {i}").as_bytes());
        }

        assert_eq!(pair.receiver.state().last_received_seq, 3);
        assert_eq!(pair.sender.state().last_sent_seq, 3);
    }

    #[test]
    fn prepare_without_commit_reuses_sequence() {
        let mut pair = pair(&MessengerConfig::default());

        let first = pair.sender.prepare_send(&PROVIDER, &pair.env, &pair.alice, &pair.bob.public);
        let second = pair.sender.prepare_send(&PROVIDER, &pair.env, &pair.alice, &pair.bob.public);

        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.sequence_number, 1);
        assert_eq!(second.sequence_number, 1);
        assert_eq!(first.message_key.key(), second.message_key.key());
        assert_eq!(pair.sender.state().last_sent_seq, 0);
    }

    #[test]
    fn gap_buffers_then_drains() {
        let mut pair = pair(&MessengerConfig::default());
        let envelopes: Vec<Envelope> = (1..=3).map(|i| pair.send(&[i])).collect();

        assert!(pair.receive(envelopes[2].clone()).unwrap().is_none());
        assert!(pair.receive(envelopes[1].clone()).unwrap().is_none());
        assert_eq!(pair.receiver.state().pending, vec![2, 3]);

        let delivery = pair.receive(envelopes[0].clone()).unwrap().unwrap();
        let plaintexts: Vec<Vec<u8>> =
            delivery.into_messages().into_iter().map(|m| m.plaintext).collect();
        assert_eq!(plaintexts, vec![vec![1], vec![2], vec![3]]);
        assert!(pair.receiver.state().pending.is_empty());
    }

    #[test]
    fn forged_first_message_commits_nothing() {
        let mut pair = pair(&MessengerConfig::default());
        let mut envelope = pair.send(b"hello");
        let mut ciphertext = envelope.ciphertext.to_vec();
        ciphertext[0] ^= 0x01;
        envelope.ciphertext = ciphertext.into();

        let result = pair.receive(envelope);

        assert_eq!(result, Err(ProtocolError::Auth(AuthError::Forged)));
        let state = pair.receiver.state();
        assert!(!state.recv_established);
        assert_eq!(state.last_received_seq, 0);
    }

    #[test]
    fn weak_sender_ephemeral_is_forgery() {
        let mut pair = pair(&MessengerConfig::default());
        let envelope = pair.send(b"hello");

        let mut bytes = envelope.header.to_bytes();
        bytes[104..136].fill(0);
        let header = *MessageHeader::from_bytes(&bytes).unwrap();
        let result = pair.receive(Envelope::new(header, envelope.ciphertext.clone()));

        assert_eq!(result, Err(ProtocolError::Auth(AuthError::Forged)));
        assert!(!pair.receiver.state().recv_established);
        assert!(pair.receive(envelope).unwrap().is_some());
    }

    #[test]
    fn gap_beyond_limit_rejected() {
        let config = MessengerConfig { max_sequence_gap: 2, ..MessengerConfig::default() };
        let mut pair = pair(&config);
        let envelopes: Vec<Envelope> = (1..=3).map(|i| pair.send(&[i])).collect();

        assert!(pair.receive(envelopes[1].clone()).unwrap().is_none());
        assert!(matches!(
            pair.receive(envelopes[2].clone()),
            Err(ProtocolError::ReorderBufferFull { .. })
        ));
    }

    #[test]
    fn buffered_forgery_is_dropped_during_drain() {
        let mut pair = pair(&MessengerConfig::default());
        let envelopes: Vec<Envelope> = (1..=3).map(|i| pair.send(&[i])).collect();

        let mut forged = envelopes[1].clone();
        let mut ciphertext = forged.ciphertext.to_vec();
        ciphertext[0] ^= 0x01;
        forged.ciphertext = ciphertext.into();

        pair.receive(forged).unwrap();
        pair.receive(envelopes[2].clone()).unwrap();
        let delivery = pair.receive(envelopes[0].clone()).unwrap().unwrap();

        assert!(delivery.released.is_empty());
        assert_eq!(pair.receiver.state().last_received_seq, 1);
        assert_eq!(pair.receiver.state().pending, vec![3]);

        // A genuine copy of 2 releases 3
        let delivery = pair.receive(envelopes[1].clone()).unwrap().unwrap();
        assert_eq!(delivery.released.len(), 1);
        assert_eq!(pair.receiver.state().last_received_seq, 3);
    }
}
