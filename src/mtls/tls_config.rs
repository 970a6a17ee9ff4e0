//! rustls config building and PEM identity loading.
//!
//! Provides:
//! - [`TlsPolicy`] — protocol floor, cipher suite and key-exchange preference
//! - [`TlsIdentity`] — a certificate chain plus private key loaded from PEM
//! - [`build_server_config`] — mandatory client auth against a [`TrustStore`]
//! - [`build_client_config`] — server verification against the same store,
//!   optionally presenting a client identity
//!
//! All certificate and key files are expected in **PEM format**.

use std::path::Path;
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::crypto::aws_lc_rs::{cipher_suite, kx_group};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, ServerConfig, SupportedCipherSuite, SupportedProtocolVersion};
use tracing::debug;

use crate::mtls::config::MinProtocolVersion;
use crate::mtls::trust_store::TrustStore;
use crate::mtls::verifier::AuditingClientVerifier;
use crate::pki::artifacts::read_bytes;
use crate::pki::issuer::IssuedCertificate;
use crate::{Error, Result};

/// ALPN protocols offered by the server, in preference order.
pub const SERVER_ALPN: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// ALPN protocols offered by the client.
pub const CLIENT_ALPN: [&[u8]; 1] = [b"http/1.1"];

/// Forward-secret AEAD suites, strongest first. TLS 1.2 entries are ECDHE only.
static CIPHER_SUITES: &[SupportedCipherSuite] = &[
    cipher_suite::TLS13_AES_256_GCM_SHA384,
    cipher_suite::TLS13_AES_128_GCM_SHA256,
    cipher_suite::TLS13_CHACHA20_POLY1305_SHA256,
    cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
    cipher_suite::TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
    cipher_suite::TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
    cipher_suite::TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
    cipher_suite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
    cipher_suite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
];

static TLS12_AND_13: &[&SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Handshake policy shared by server and client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlsPolicy {
    /// Lowest protocol version negotiated.
    pub min_version: MinProtocolVersion,
}

impl TlsPolicy {
    /// Policy with the given floor.
    #[must_use]
    pub fn new(min_version: MinProtocolVersion) -> Self {
        Self { min_version }
    }

    /// aws-lc-rs provider restricted to [`CIPHER_SUITES`] and the
    /// P-384, P-256, X25519 key exchange groups (in that order).
    #[must_use]
    pub fn crypto_provider(&self) -> Arc<CryptoProvider> {
        Arc::new(CryptoProvider {
            cipher_suites: CIPHER_SUITES.to_vec(),
            kx_groups: vec![kx_group::SECP384R1, kx_group::SECP256R1, kx_group::X25519],
            ..rustls::crypto::aws_lc_rs::default_provider()
        })
    }

    /// Enabled protocol versions.
    #[must_use]
    pub fn protocol_versions(&self) -> &'static [&'static SupportedProtocolVersion] {
        match self.min_version {
            MinProtocolVersion::Tls12 => TLS12_AND_13,
            MinProtocolVersion::Tls13 => TLS13_ONLY,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity presented during the handshake
// ─────────────────────────────────────────────────────────────────────────────

/// Certificate chain (leaf first) plus its private key.
#[derive(Debug)]
pub struct TlsIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
}

impl Clone for TlsIdentity {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            key: self.key.clone_key(),
        }
    }
}

impl TlsIdentity {
    /// Parse a PEM certificate chain and a PEM private key.
    ///
    /// Supports PKCS#8 (`PRIVATE KEY`), SEC1 (`EC PRIVATE KEY`) and
    /// `RSA PRIVATE KEY` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if either input holds no usable block.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let chain = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Encoding(format!("Failed to parse certificate chain: {e}")))?;
        if chain.is_empty() {
            return Err(Error::Encoding("No certificates found in chain".into()));
        }

        let key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| Error::Encoding(format!("Failed to parse private key: {e}")))?
            .ok_or_else(|| Error::Encoding("No private key found".into()))?;

        Ok(Self { chain, key })
    }

    /// Read `cert_path` and `key_path` and parse them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a file cannot be read, otherwise as
    /// [`TlsIdentity::from_pem`].
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert = read_bytes(cert_path)?;
        let key = read_bytes(key_path)?;
        Self::from_pem(&cert, &key).map_err(|e| {
            Error::Encoding(format!(
                "{e} ('{}', '{}')",
                cert_path.display(),
                key_path.display()
            ))
        })
    }

    /// Identity of a freshly issued leaf, without going through PEM.
    #[must_use]
    pub fn from_issued(issued: &IssuedCertificate) -> Self {
        Self {
            chain: vec![issued.cert_der().clone()],
            key: issued.private_key_der(),
        }
    }

    /// The chain, leaf first.
    #[must_use]
    pub fn chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config builders
// ─────────────────────────────────────────────────────────────────────────────

/// Build a `rustls::ServerConfig` that demands a client certificate chained
/// to `trust` and carrying `clientAuth`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the protocol versions are unsupported by the
/// provider or the server key does not match its certificate.
pub fn build_server_config(
    trust: &TrustStore,
    identity: &TlsIdentity,
    policy: &TlsPolicy,
) -> Result<ServerConfig> {
    let provider = policy.crypto_provider();
    let verifier = Arc::new(AuditingClientVerifier::new(
        trust.client_verifier(Arc::clone(&provider))?,
    ));

    let mut cfg = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(policy.protocol_versions())
        .map_err(|e| Error::Config(format!("Unsupported TLS protocol versions: {e}")))?
        .with_client_cert_verifier(verifier)
        .with_single_cert(identity.chain.clone(), identity.key.clone_key())
        .map_err(|e| Error::Config(format!("TLS config error (cert/key mismatch?): {e}")))?;

    // Server-preferred suite order
    cfg.ignore_client_order = true;
    cfg.alpn_protocols = SERVER_ALPN.iter().map(|p| p.to_vec()).collect();

    debug!(
        anchors = trust.len(),
        min_version = ?policy.min_version,
        "mTLS server config built"
    );

    Ok(cfg)
}

/// Build a `rustls::ClientConfig` that verifies the server against `trust`.
///
/// With `identity = None` the client offers no certificate, which a server
/// built by [`build_server_config`] rejects.
///
/// # Errors
///
/// Returns [`Error::Config`] if the verifier cannot be built or the client
/// key does not match its certificate.
pub fn build_client_config(
    trust: &TrustStore,
    identity: Option<&TlsIdentity>,
    policy: &TlsPolicy,
) -> Result<ClientConfig> {
    let provider = policy.crypto_provider();
    let verifier = trust.server_verifier(Arc::clone(&provider))?;

    let builder = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(policy.protocol_versions())
        .map_err(|e| Error::Config(format!("Unsupported TLS protocol versions: {e}")))?
        .with_webpki_verifier(verifier);

    let mut cfg = match identity {
        Some(id) => builder
            .with_client_auth_cert(id.chain.clone(), id.key.clone_key())
            .map_err(|e| Error::Config(format!("Client cert/key rejected: {e}")))?,
        None => builder.with_no_client_auth(),
    };
    cfg.alpn_protocols = CLIENT_ALPN.iter().map(|p| p.to_vec()).collect();

    debug!(
        anchors = trust.len(),
        client_auth = identity.is_some(),
        "mTLS client config built"
    );

    Ok(cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
