//! The messenger: one local identity talking to many certified peers.
//!
//! # Concurrency
//!
//! A `Messenger` is shared across tasks by reference (or `Arc`). Identity
//! and certificate store sit behind read-write locks. Each peer session has
//! its own mutex, so the ratchet step and sequence increment for one peer are
//! atomic while different peers proceed in parallel.

use std::{collections::HashMap, sync::Arc};

use escrowchat_crypto::{
    CryptoProvider, EscrowEntropy, Keypair, MessageKey, PublicKey, RustCryptoProvider, codec,
    escrow,
};
use escrowchat_proto::{Certificate, Envelope, MessageHeader, SignedCertificate};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};
use zeroize::Zeroizing;

use crate::{
    certificate_store::CertificateStore,
    config::{FirstContactPolicy, MessengerConfig},
    delivery::{Delivery, SessionState},
    env::Environment,
    error::{CertificateError, ProtocolError},
    session::Session,
};

type SessionHandle = Arc<Mutex<Session>>;

/// Certificate-authenticated ratchet messenger with per-message key escrow.
///
/// Generic over the environment (randomness source) and the crypto provider.
pub struct Messenger<E: Environment, P: CryptoProvider = RustCryptoProvider> {
    env: E,
    provider: P,
    config: MessengerConfig,
    escrow_public_key: PublicKey,
    identity: RwLock<Option<Arc<Keypair>>>,
    certificates: RwLock<CertificateStore>,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl<E: Environment> Messenger<E> {
    /// Create a messenger with default configuration.
    ///
    /// `authority_key` is the certificate authority's Ed25519 public key;
    /// `escrow_public_key` is the X25519 key every message key is wrapped for.
    pub fn new(env: E, authority_key: [u8; 32], escrow_public_key: PublicKey) -> Self {
        Self::with_config(env, authority_key, escrow_public_key, MessengerConfig::default())
    }

    /// Create a messenger with explicit configuration.
    pub fn with_config(
        env: E,
        authority_key: [u8; 32],
        escrow_public_key: PublicKey,
        config: MessengerConfig,
    ) -> Self {
        Self::with_provider(env, RustCryptoProvider, authority_key, escrow_public_key, config)
    }
}

impl<E: Environment, P: CryptoProvider> Messenger<E, P> {
    /// Create a messenger with a custom crypto provider.
    pub fn with_provider(
        env: E,
        provider: P,
        authority_key: [u8; 32],
        escrow_public_key: PublicKey,
        config: MessengerConfig,
    ) -> Self {
        Self {
            env,
            provider,
            config,
            escrow_public_key,
            identity: RwLock::new(None),
            certificates: RwLock::new(CertificateStore::new(authority_key)),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// Produce an unsigned certificate for `username`, to be signed by the
    /// authority.
    ///
    /// Generates the identity keypair on the first call and reuses it after
    /// that, so re-issuing never invalidates existing sessions.
    ///
    /// # Errors
    ///
    /// - `CertificateError::Wire` if the username is empty or longer than 255
    ///   bytes
    #[instrument(skip(self), level = "debug")]
    pub async fn issue_certificate(&self, username: &str) -> Result<Certificate, CertificateError> {
        let mut identity = self.identity.write().await;
        let keypair = match identity.as_ref() {
            Some(keypair) => Arc::clone(keypair),
            None => {
                let keypair = Arc::new(self.provider.generate_keypair(self.env.random_array()));
                info!("generated identity keypair");
                *identity = Some(Arc::clone(&keypair));
                keypair
            },
        };
        drop(identity);

        Ok(Certificate::new(username, keypair.public.to_bytes())?)
    }

    /// Local identity public key, once generated.
    pub async fn identity_public_key(&self) -> Option<PublicKey> {
        self.identity.read().await.as_ref().map(|keypair| keypair.public)
    }

    /// Verify and store a peer certificate.
    ///
    /// # Errors
    ///
    /// - `CertificateError::InvalidSignature` if the authority signature does
    ///   not verify. The store is unchanged.
    pub async fn accept_certificate(
        &self,
        certificate: Certificate,
        signature: &[u8],
    ) -> Result<(), CertificateError> {
        self.certificates.write().await.accept(&self.provider, certificate, signature)
    }

    /// Decode and accept a CBOR-encoded signed certificate.
    ///
    /// # Errors
    ///
    /// - `CertificateError::Wire` if the bytes do not decode
    /// - `CertificateError::InvalidSignature` as for
    ///   [`Self::accept_certificate`]
    pub async fn accept_signed_certificate(&self, encoded: &[u8]) -> Result<(), CertificateError> {
        let SignedCertificate { certificate, signature } = SignedCertificate::decode(encoded)?;
        self.accept_certificate(certificate, &signature).await
    }

    /// Accepted certificate for `peer`.
    pub async fn certificate(&self, peer: &str) -> Option<Certificate> {
        self.certificates.read().await.get(peer).cloned()
    }

    /// Encrypt `plaintext` for `peer`.
    ///
    /// The returned envelope carries a fresh sequence number, a fresh message
    /// IV, and the message key wrapped for the escrow authority. If any step
    /// fails the session is left as it was.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::IdentityNotInitialized` before `issue_certificate`
    /// - `ProtocolError::UnknownPeer` without an accepted certificate
    /// - `ProtocolError::Crypto` if the peer or escrow key is low-order
    /// - `ProtocolError::SequenceExhausted` after `u64::MAX` messages
    #[instrument(skip(self, plaintext), fields(len = plaintext.len()), level = "debug")]
    pub async fn send_message(&self, peer: &str, plaintext: &[u8]) -> Result<Envelope, ProtocolError> {
        let identity = self.identity().await?;
        let peer_identity = self.peer_identity(peer).await?;
        let session = self.session(peer).await;

        let mut session = session.lock().await;
        let outgoing =
            session.prepare_send(&self.provider, &self.env, &identity, &peer_identity)?;
        let envelope = self.seal(
            outgoing.sequence_number,
            &outgoing.sender_ephemeral,
            &outgoing.message_key,
            plaintext,
        )?;
        session.commit_send(outgoing.sequence_number, outgoing.next_chain);
        drop(session);

        debug!(sequence_number = envelope.sequence_number(), "message sealed");
        Ok(envelope)
    }

    /// Authenticate and decrypt an envelope from `peer`.
    ///
    /// Returns `Ok(None)` if the envelope is ahead of the next expected
    /// sequence number and was buffered. Otherwise returns the decrypted
    /// message together with any buffered messages it released.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::IdentityNotInitialized` before `issue_certificate`
    /// - `ProtocolError::UnknownPeer` without an accepted certificate
    /// - `ProtocolError::NoSession` on first contact under
    ///   [`FirstContactPolicy::RequireSession`]
    /// - `ProtocolError::DuplicateOrReplay` at or below the watermark
    /// - `ProtocolError::ReorderBufferFull` if the envelope cannot be buffered
    /// - `ProtocolError::Auth` if the envelope does not authenticate
    #[instrument(
        skip(self, envelope),
        fields(sequence_number = envelope.sequence_number()),
        level = "debug"
    )]
    pub async fn receive_message(
        &self,
        peer: &str,
        envelope: Envelope,
    ) -> Result<Option<Delivery>, ProtocolError> {
        let identity = self.identity().await?;
        let peer_identity = self.peer_identity(peer).await?;

        let session = match self.config.first_contact {
            FirstContactPolicy::Authenticated => self.session(peer).await,
            FirstContactPolicy::RequireSession => self
                .sessions
                .lock()
                .await
                .get(peer)
                .cloned()
                .ok_or_else(|| ProtocolError::NoSession { peer: peer.to_string() })?,
        };

        let mut session = session.lock().await;
        // A failed first send leaves an entry behind without a send chain.
        if self.config.first_contact == FirstContactPolicy::RequireSession
            && !session.send_established()
        {
            return Err(ProtocolError::NoSession { peer: peer.to_string() });
        }
        session.receive(&self.provider, &identity, &peer_identity, envelope)
    }

    /// Snapshot of the session with `peer`, if one exists.
    pub async fn session_state(&self, peer: &str) -> Option<SessionState> {
        let session = self.sessions.lock().await.get(peer).cloned()?;
        let state = session.lock().await.state();
        Some(state)
    }

    async fn identity(&self) -> Result<Arc<Keypair>, ProtocolError> {
        self.identity.read().await.clone().ok_or(ProtocolError::IdentityNotInitialized)
    }

    async fn peer_identity(&self, peer: &str) -> Result<PublicKey, ProtocolError> {
        self.certificates
            .read()
            .await
            .lookup(peer)
            .ok_or_else(|| ProtocolError::UnknownPeer { peer: peer.to_string() })
    }

    async fn session(&self, peer: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(
            sessions
                .entry(peer.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(peer, &self.config)))),
        )
    }

    /// Build the header and ciphertext for one message.
    fn seal(
        &self,
        sequence_number: u64,
        sender_ephemeral: &PublicKey,
        message_key: &MessageKey,
        plaintext: &[u8],
    ) -> Result<Envelope, ProtocolError> {
        let entropy = EscrowEntropy {
            ephemeral_seed: Zeroizing::new(self.env.random_array()),
            iv: self.env.random_array(),
        };
        let escrowed = escrow::wrap(&self.provider, &self.escrow_public_key, message_key, entropy)?;

        let message_iv = self.env.random_array();
        let header = MessageHeader::new(
            escrowed.ephemeral_public.to_bytes(),
            escrowed.ciphertext,
            message_iv,
            escrowed.iv,
            sender_ephemeral.to_bytes(),
            sequence_number,
        );
        let ciphertext =
            codec::seal(&self.provider, message_key, plaintext, &message_iv, &header.to_bytes());

        Ok(Envelope::new(header, ciphertext))
    }
}
