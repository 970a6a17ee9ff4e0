//! mtls-pki Library
//!
//! A minimal private PKI and a mutual-TLS client/server pair that trusts it.
//!
//! # Features
//!
//! - **Issuance**: one self-signed root, server and client leaves with
//!   scoped extended key usage, written as PEM pairs
//! - **Trust store**: immutable root set, permissive or strict PEM parsing
//! - **mTLS server**: plaintext and TLS listeners, mandatory client
//!   certificates, negotiated session exposed to handlers
//! - **mTLS client**: timeout and handshake failures reported distinctly

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod mtls;
pub mod pki;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` wins over `level` when set. `format` is `json` or anything
/// else for human-readable text.
///
/// # Errors
///
/// Returns [`Error::Config`] if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
