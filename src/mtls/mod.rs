//! Mutual TLS: trust anchors, handshake policy and session exposure.
//!
//! # Architecture
//!
//! ```text
//! TCP connection
//!   → TLS handshake  (rustls verifies client cert against the TrustStore,
//!                     AuditingClientVerifier logs each HandshakeState)
//!   → TlsSession extracted from the finished connection
//!   → Injected into request extensions
//!   → Handler
//! ```
//!
//! # Modules
//!
//! - [`config`] — YAML configuration types (`MtlsConfig`, `MinProtocolVersion`)
//! - [`trust_store`] — immutable root set (`TrustStore`)
//! - [`verifier`] — `HandshakeState` and the auditing client verifier
//! - [`tls_config`] — rustls server/client config building (`TlsPolicy`, `TlsIdentity`)
//! - [`identity`] — X.509 peer identity extraction (`PeerIdentity`)
//! - [`session`] — negotiated parameters and the axum-server acceptor
//!
//! # Quick start
//!
//! ```yaml
//! tls:
//!   ca_cert: "./certs/ca.crt"
//!   strict_trust_store: false
//!   min_protocol_version: "1.2"
//! ```

pub mod config;
pub mod identity;
pub mod session;
pub mod tls_config;
pub mod trust_store;
pub mod verifier;

pub use config::{MinProtocolVersion, MtlsConfig};
pub use identity::PeerIdentity;
pub use session::{SessionAcceptor, TlsSession};
pub use tls_config::{TlsIdentity, TlsPolicy, build_client_config, build_server_config};
pub use trust_store::TrustStore;
pub use verifier::{AuditingClientVerifier, HandshakeState};
