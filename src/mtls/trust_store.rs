//! Trust anchors.
//!
//! A [`TrustStore`] is built once from PEM bytes at process start and is
//! immutable afterwards. Server and client both take it by reference; the
//! underlying `RootCertStore` is shared behind an `Arc`.
//!
//! Parsing comes in two flavours:
//!
//! - [`TrustStore::from_pem`] skips malformed blocks (logging each one) and
//!   only fails when nothing usable remains.
//! - [`TrustStore::from_pem_strict`] fails on the first malformed block.

use std::path::Path;
use std::sync::Arc;

use rustls::RootCertStore;
use rustls::client::danger::ServerCertVerifier;
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::server::danger::ClientCertVerifier;
use tracing::{debug, warn};

use crate::pki::artifacts::read_bytes;
use crate::{Error, Result};

/// Immutable set of root certificates used as the anchor for chain
/// verification.
#[derive(Debug, Clone)]
pub struct TrustStore {
    roots: Arc<RootCertStore>,
    anchors: Arc<[CertificateDer<'static>]>,
}

impl TrustStore {
    /// Parse every `CERTIFICATE` block, skipping malformed ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrustStore`] if no certificate could be added.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Self::parse(pem, false)
    }

    /// Parse every `CERTIFICATE` block; any malformed block is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrustStore`] naming the first malformed block, or if
    /// the input holds no certificate at all.
    pub fn from_pem_strict(pem: &[u8]) -> Result<Self> {
        Self::parse(pem, true)
    }

    /// Read a PEM bundle from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, otherwise as
    /// [`TrustStore::from_pem`] / [`TrustStore::from_pem_strict`].
    pub fn from_file(path: &Path, strict: bool) -> Result<Self> {
        let pem = read_bytes(path)?;
        let store = Self::parse(&pem, strict)?;
        debug!(path = %path.display(), anchors = store.len(), "Trust store loaded");
        Ok(store)
    }

    /// Build directly from DER anchors (e.g. a freshly issued root).
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrustStore`] if any certificate is unusable as an
    /// anchor or the list is empty.
    pub fn from_der(anchors: impl IntoIterator<Item = CertificateDer<'static>>) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        let mut kept = Vec::new();
        for (index, der) in anchors.into_iter().enumerate() {
            roots.add(der.clone()).map_err(|e| {
                Error::TrustStore(format!("Certificate #{index} is not a usable trust anchor: {e}"))
            })?;
            kept.push(der);
        }
        Self::finish(roots, kept)
    }

    fn parse(pem: &[u8], strict: bool) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        let mut kept = Vec::new();

        for (index, block) in rustls_pemfile::certs(&mut &pem[..]).enumerate() {
            let der = match block {
                Ok(der) => der,
                Err(e) if strict => {
                    return Err(Error::TrustStore(format!("Malformed PEM block #{index}: {e}")));
                }
                Err(e) => {
                    warn!(block = index, error = %e, "Skipping malformed PEM block in trust bundle");
                    continue;
                }
            };
            match roots.add(der.clone()) {
                Ok(()) => kept.push(der),
                Err(e) if strict => {
                    return Err(Error::TrustStore(format!(
                        "Certificate #{index} is not a usable trust anchor: {e}"
                    )));
                }
                Err(e) => {
                    warn!(block = index, error = %e, "Skipping unparsable certificate in trust bundle");
                }
            }
        }

        Self::finish(roots, kept)
    }

    fn finish(roots: RootCertStore, kept: Vec<CertificateDer<'static>>) -> Result<Self> {
        if roots.is_empty() {
            return Err(Error::TrustStore("No usable certificates in trust bundle".into()));
        }
        Ok(Self {
            roots: Arc::new(roots),
            anchors: kept.into(),
        })
    }

    /// Number of anchors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Always `false` for a constructed store; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Shared handle to the rustls root store.
    #[must_use]
    pub fn roots(&self) -> Arc<RootCertStore> {
        Arc::clone(&self.roots)
    }

    /// The anchors as DER, in bundle order.
    #[must_use]
    pub fn anchors(&self) -> &[CertificateDer<'static>] {
        &self.anchors
    }

    /// rustls client-certificate verifier over these anchors. Client
    /// authentication is mandatory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the verifier cannot be built.
    pub fn client_verifier(
        &self,
        provider: Arc<CryptoProvider>,
    ) -> Result<Arc<dyn ClientCertVerifier>> {
        WebPkiClientVerifier::builder_with_provider(self.roots(), provider)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build client verifier: {e}")))
    }

    /// rustls server-certificate verifier over these anchors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the verifier cannot be built.
    pub fn server_verifier(
        &self,
        provider: Arc<CryptoProvider>,
    ) -> Result<Arc<WebPkiServerVerifier>> {
        WebPkiServerVerifier::builder_with_provider(self.roots(), provider)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build server verifier: {e}")))
    }

    /// Run the client-side handshake check (chain to an anchor, validity,
    /// `clientAuth` usage) on `chain` without a socket. `chain[0]` is the
    /// end entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] carrying the rustls reason on rejection.
    pub fn verify_client_chain(&self, chain: &[CertificateDer<'_>], now: UnixTime) -> Result<()> {
        let (end_entity, intermediates) = split_chain(chain)?;
        self.client_verifier(default_provider())?
            .verify_client_cert(end_entity, intermediates, now)
            .map(|_| ())
            .map_err(|e| Error::Handshake(format!("Client certificate rejected: {e}")))
    }

    /// Run the server-side handshake check (chain to an anchor, validity,
    /// `serverAuth` usage, name match against `server_name`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] carrying the rustls reason on rejection,
    /// [`Error::Config`] if `server_name` is not a valid name.
    pub fn verify_server_chain(
        &self,
        chain: &[CertificateDer<'_>],
        server_name: &str,
        now: UnixTime,
    ) -> Result<()> {
        let (end_entity, intermediates) = split_chain(chain)?;
        let name = ServerName::try_from(server_name)
            .map_err(|e| Error::Config(format!("Invalid server name '{server_name}': {e}")))?;
        self.server_verifier(default_provider())?
            .verify_server_cert(end_entity, intermediates, &name, &[], now)
            .map(|_| ())
            .map_err(|e| Error::Handshake(format!("Server certificate rejected: {e}")))
    }
}

fn split_chain<'a, 'b>(
    chain: &'a [CertificateDer<'b>],
) -> Result<(&'a CertificateDer<'b>, &'a [CertificateDer<'b>])> {
    chain
        .split_first()
        .ok_or_else(|| Error::Handshake("No certificate presented".into()))
}

fn default_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
