//! mTLS client.
//!
//! One `reqwest::Client` per identity, built on a preconfigured rustls
//! config so it trusts exactly the [`TrustStore`] it was given and presents
//! the optional client certificate. Failures are classified so a caller can
//! tell a deadline from a TLS rejection:
//!
//! - [`Error::Timeout`] — the whole-request deadline expired
//! - [`Error::Handshake`] — rustls refused the peer (or was refused); the
//!   rustls reason is carried verbatim
//! - [`Error::Transport`] — anything else (refused connection, HTTP error)

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::mtls::{TlsIdentity, TlsPolicy, TrustStore, build_client_config};
use crate::{Error, Result};

/// Whole-request deadline when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
}

/// HTTPS client that authenticates the server against a [`TrustStore`] and
/// optionally authenticates itself with a client certificate.
#[derive(Debug, Clone)]
pub struct MtlsClient {
    http: reqwest::Client,
    timeout: Duration,
}

impl MtlsClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the TLS config or HTTP client cannot be
    /// built.
    pub fn new(
        trust: &TrustStore,
        identity: Option<&TlsIdentity>,
        timeout: Duration,
        policy: &TlsPolicy,
    ) -> Result<Self> {
        let tls = build_client_config(trust, identity, policy)?;
        let http = reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, timeout })
    }

    /// Configured deadline.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET url` and read the full body.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`], [`Error::Handshake`] or [`Error::Transport`]; see
    /// the module docs.
    pub async fn get(&self, url: &str) -> Result<ClientResponse> {
        debug!(url, timeout = ?self.timeout, "Sending request");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| classify(&e, url))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(&e, url))?;

        info!(url, status, bytes = body.len(), "Response received");
        Ok(ClientResponse { status, body })
    }
}

/// Map a reqwest failure onto [`Error`].
fn classify(err: &reqwest::Error, url: &str) -> Error {
    if err.is_timeout() {
        warn!(url, "Request timed out");
        return Error::Timeout(format!("{url}: {err}"));
    }
    if let Some(tls) = find_rustls_error(err) {
        warn!(url, error = %tls, "TLS handshake failed");
        return Error::Handshake(tls.to_string());
    }
    warn!(url, error = %err, "Request failed");
    Error::Transport(format!("{url}: {}", error_chain(err)))
}

/// Walk the source chain looking for a `rustls::Error`.
///
/// `io::Error::source()` skips the error it wraps, so each `io::Error` is
/// also opened with `get_ref()`.
fn find_rustls_error<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a rustls::Error> {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        if let Some(inner) = e.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
            if let Some(tls) = find_rustls_error(inner) {
                return Some(tls);
            }
        }
        current = e.source();
    }
    None
}

/// `outer: inner: innermost` rendering of an error chain.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(e) = current {
        out.push_str(": ");
        out.push_str(&e.to_string());
        current = e.source();
    }
    out
}
