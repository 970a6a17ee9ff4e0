//! Client-certificate verification with handshake auditing.
//!
//! Every inbound TLS connection walks
//!
//! ```text
//! Listening → Handshaking → ClientCertRequested → ChainVerified → Established
//!                 │                  │                  │
//!                 └──────────────────┴──────────────────┴──→ Rejected
//! ```
//!
//! [`AuditingClientVerifier`] owns the middle of that walk: it delegates the
//! actual chain check to rustls' WebPKI verifier and logs the outcome. The
//! edges (`Handshaking`, `Established`, `Rejected` on I/O failure) are logged
//! by the session acceptor.

use std::fmt;
use std::sync::Arc;

use rustls::DistinguishedName;
use rustls::client::danger::HandshakeSignatureValid;
use rustls::pki_types::{CertificateDer, UnixTime};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tracing::{debug, info, warn};

use crate::mtls::identity::PeerIdentity;

/// Per-connection handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    /// Socket accepted, nothing read yet.
    Listening,
    /// TLS negotiation has begun.
    Handshaking,
    /// Server demanded a client certificate.
    ClientCertRequested,
    /// Client chain validated against the trust store.
    ChainVerified,
    /// Application data may flow.
    Established,
    /// Handshake aborted. Terminal.
    Rejected,
}

impl HandshakeState {
    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use HandshakeState::{
            ChainVerified, ClientCertRequested, Established, Handshaking, Listening, Rejected,
        };
        matches!(
            (self, next),
            (Listening, Handshaking)
                | (Handshaking, ClientCertRequested)
                | (ClientCertRequested, ChainVerified)
                | (ChainVerified, Established)
                | (Handshaking | ClientCertRequested | ChainVerified, Rejected)
        )
    }

    /// `Established` and `Rejected` end the walk.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Established | Self::Rejected)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Listening => "listening",
            Self::Handshaking => "handshaking",
            Self::ClientCertRequested => "client_cert_requested",
            Self::ChainVerified => "chain_verified",
            Self::Established => "established",
            Self::Rejected => "rejected",
        })
    }
}

/// Log the step `from → to`. `Rejected` goes out at `warn!`, everything else
/// at `debug!`. A step the state machine does not allow is logged as such
/// and reported as `false`.
pub(crate) fn log_transition(
    from: HandshakeState,
    to: HandshakeState,
    peer: Option<&str>,
    reason: Option<&str>,
) -> bool {
    let peer = peer.unwrap_or("-");
    let legal = from.can_advance_to(to);
    if !legal {
        warn!(from = %from, state = %to, peer, "Unexpected TLS handshake transition");
    }
    if to == HandshakeState::Rejected {
        warn!(from = %from, state = %to, peer, reason = reason.unwrap_or("-"), "TLS handshake rejected");
    } else if to.is_terminal() {
        debug!(from = %from, state = %to, peer, "TLS handshake complete");
    } else {
        debug!(from = %from, state = %to, peer, "TLS handshake state");
    }
    legal
}

/// Wraps a rustls client verifier and logs each decision.
///
/// Client authentication is always mandatory: the wrapped verifier must be
/// built without `allow_unauthenticated`.
#[derive(Debug)]
pub struct AuditingClientVerifier {
    inner: Arc<dyn ClientCertVerifier>,
}

impl AuditingClientVerifier {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn ClientCertVerifier>) -> Self {
        Self { inner }
    }
}

impl ClientCertVerifier for AuditingClientVerifier {
    fn offer_client_auth(&self) -> bool {
        true
    }

    fn client_auth_mandatory(&self) -> bool {
        true
    }

    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        log_transition(
            HandshakeState::Handshaking,
            HandshakeState::ClientCertRequested,
            None,
            None,
        );
        self.inner.root_hint_subjects()
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        let peer = PeerIdentity::from_der(end_entity).ok();
        let label = peer.as_ref().map(|p| p.display_name.as_str());

        match self.inner.verify_client_cert(end_entity, intermediates, now) {
            Ok(verified) => {
                log_transition(
                    HandshakeState::ClientCertRequested,
                    HandshakeState::ChainVerified,
                    label,
                    None,
                );
                if let Some(p) = &peer {
                    info!(
                        cn = %p.display_name,
                        serial = %p.serial,
                        issuer = %p.issuer,
                        "Client certificate verified"
                    );
                }
                Ok(verified)
            }
            Err(e) => {
                log_transition(
                    HandshakeState::ClientCertRequested,
                    HandshakeState::Rejected,
                    label,
                    Some(&e.to_string()),
                );
                Err(e)
            }
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtls::TrustStore;
    use crate::pki::{CertificateAuthority, IssuancePolicy, LeafRequest};
    use pki_model::{Identity, RoleUsage};

    fn verifier_for(ca: &CertificateAuthority) -> AuditingClientVerifier {
        let store = TrustStore::from_der([ca.cert_der().clone()]).unwrap();
        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        AuditingClientVerifier::new(store.client_verifier(provider).unwrap())
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use HandshakeState::*;
        let walk = [Listening, Handshaking, ClientCertRequested, ChainVerified, Established];
        for pair in walk.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(Established.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_successor() {
        use HandshakeState::*;
        for next in [Listening, Handshaking, ClientCertRequested, ChainVerified, Established, Rejected] {
            assert!(!Established.can_advance_to(next));
            assert!(!Rejected.can_advance_to(next));
        }
    }

    #[test]
    fn cannot_skip_chain_verification() {
        assert!(!HandshakeState::ClientCertRequested.can_advance_to(HandshakeState::Established));
        assert!(!HandshakeState::Listening.can_advance_to(HandshakeState::Rejected));
    }

    #[test]
    fn log_transition_reports_whether_the_step_is_allowed() {
        use HandshakeState::*;
        // GIVEN: the steps the acceptor and verifier log
        for (from, to) in [
            (Listening, Handshaking),
            (Handshaking, ClientCertRequested),
            (ClientCertRequested, ChainVerified),
            (ClientCertRequested, Rejected),
            (Handshaking, Rejected),
            (ChainVerified, Established),
        ] {
            // THEN: each is accepted by the state machine
            assert!(log_transition(from, to, Some("Client A"), None), "{from} -> {to}");
        }
        // AND: a skipped verification is flagged
        assert!(!log_transition(Handshaking, Established, None, None));
        assert!(!log_transition(Rejected, Established, None, Some("late")));
    }

    #[test]
    fn client_auth_is_mandatory() {
        let ca = CertificateAuthority::issue_root(&Identity::new("CA"), &IssuancePolicy::default())
            .unwrap();
        let v = verifier_for(&ca);
        assert!(v.offer_client_auth());
        assert!(v.client_auth_mandatory());
        assert!(!v.supported_verify_schemes().is_empty());
    }

    #[test]
    fn verify_delegates_to_inner_verifier() {
        // GIVEN: a root, a client leaf under it and a server-only leaf under it
        let mut ca =
            CertificateAuthority::issue_root(&Identity::new("CA"), &IssuancePolicy::default())
                .unwrap();
        let client = ca
            .issue_leaf(&LeafRequest::new(Identity::new("Client A"), RoleUsage::Client))
            .unwrap();
        let server = ca
            .issue_leaf(&LeafRequest::new(Identity::new("Server"), RoleUsage::Server))
            .unwrap();
        let v = verifier_for(&ca);

        // THEN: client leaf accepted, server-only leaf rejected
        assert!(v.verify_client_cert(client.cert_der(), &[], UnixTime::now()).is_ok());
        assert!(v.verify_client_cert(server.cert_der(), &[], UnixTime::now()).is_err());
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(HandshakeState::ClientCertRequested.to_string(), "client_cert_requested");
        assert_eq!(HandshakeState::Rejected.to_string(), "rejected");
    }
}
