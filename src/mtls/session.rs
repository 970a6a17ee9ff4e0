//! Negotiated TLS session parameters exposed to request handlers.
//!
//! [`SessionAcceptor`] drives the rustls handshake through axum-server's
//! `RustlsAcceptor` and, once it completes, attaches a [`TlsSession`] to
//! every request on that connection as an `Extension`. Handlers read it with
//! `Option<Extension<TlsSession>>`.

use std::fmt;
use std::io;
use std::sync::Arc;

use axum::Extension;
use axum::middleware::AddExtension;
use axum_server::accept::Accept;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures::future::BoxFuture;
use rustls::{CommonState, HandshakeKind, ServerConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tower::Layer;

use crate::mtls::identity::PeerIdentity;
use crate::mtls::verifier::{HandshakeState, log_transition};

/// What was negotiated on one TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSession {
    /// e.g. `TLSv1_3`.
    pub protocol_version: String,
    /// e.g. `TLS13_AES_256_GCM_SHA384`.
    pub cipher_suite: String,
    /// ALPN protocol, if one was agreed.
    pub alpn_protocol: Option<String>,
    /// Whether the session was resumed from a ticket.
    pub resumed: bool,
    /// Verified peer chain, leaf first. Empty when the peer sent none.
    pub peer_chain: Vec<PeerIdentity>,
}

impl TlsSession {
    /// Snapshot the negotiated parameters of a finished handshake.
    ///
    /// Certificates that fail to parse are left out of `peer_chain`; by this
    /// point rustls has already verified them, so that only happens for
    /// extensions `x509-parser` does not understand.
    #[must_use]
    pub fn from_state(state: &CommonState) -> Self {
        let peer_chain = state
            .peer_certificates()
            .unwrap_or_default()
            .iter()
            .filter_map(|der| PeerIdentity::from_der(der).ok())
            .collect();

        Self {
            protocol_version: state
                .protocol_version()
                .map_or_else(|| "unknown".to_owned(), |v| format!("{v:?}")),
            cipher_suite: state
                .negotiated_cipher_suite()
                .map_or_else(|| "unknown".to_owned(), |s| format!("{:?}", s.suite())),
            alpn_protocol: state
                .alpn_protocol()
                .map(|p| String::from_utf8_lossy(p).into_owned()),
            resumed: state.handshake_kind() == Some(HandshakeKind::Resumed),
            peer_chain,
        }
    }

    /// Leaf of the peer chain.
    #[must_use]
    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.peer_chain.first()
    }
}

impl fmt::Display for TlsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} alpn={} resumed={}",
            self.protocol_version,
            self.cipher_suite,
            self.alpn_protocol.as_deref().unwrap_or("-"),
            self.resumed
        )
    }
}

/// axum-server acceptor: rustls handshake, then `Extension(TlsSession)`.
#[derive(Clone)]
pub struct SessionAcceptor {
    inner: RustlsAcceptor,
}

impl fmt::Debug for SessionAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAcceptor").finish_non_exhaustive()
    }
}

impl SessionAcceptor {
    /// Acceptor for a finished `rustls::ServerConfig`.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            inner: RustlsAcceptor::new(RustlsConfig::from_config(config)),
        }
    }
}

impl<I, S> Accept<I, S> for SessionAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, TlsSession>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let acceptor = self.inner.clone();
        Box::pin(async move {
            log_transition(HandshakeState::Listening, HandshakeState::Handshaking, None, None);

            let (stream, service) = match acceptor.accept(stream, service).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Only this connection is dropped
                    log_transition(
                        HandshakeState::Handshaking,
                        HandshakeState::Rejected,
                        None,
                        Some(&e.to_string()),
                    );
                    return Err(e);
                }
            };

            let session = TlsSession::from_state(stream.get_ref().1);
            let peer = session.peer().map(|p| p.display_name.clone());
            log_transition(
                HandshakeState::ChainVerified,
                HandshakeState::Established,
                peer.as_deref(),
                None,
            );
            tracing::debug!(session = %session, "TLS session established");

            Ok((stream, Extension(session).layer(service)))
        })
    }
}
