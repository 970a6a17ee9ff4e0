//! Configuration management

use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use pki_model::{CA_ROLE, SERVER_ROLE, client_role};
use serde::{Deserialize, Serialize};

use crate::mtls::{MtlsConfig, TlsIdentity, TlsPolicy, TrustStore};
use crate::pki::artifacts::{DEFAULT_CERT_DIR, cert_path, key_path};
use crate::pki::{BootstrapPlan, IssuancePolicy};
use crate::{Error, Result};

/// Environment variable prefix. `MTLS_PKI_SERVER__HTTPS_PORT=9443` sets
/// `server.https_port`.
pub const ENV_PREFIX: &str = "MTLS_PKI_";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Issuance and artifact layout
    pub pki: PkiConfig,
    /// Trust anchor and handshake policy
    pub tls: MtlsConfig,
    /// Listener configuration
    pub server: ServerConfig,
    /// Client configuration
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (MTLS_PKI_ prefix)
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Trust bundle path: `tls.ca_cert`, else `<pki.dir>/ca.crt`.
    #[must_use]
    pub fn ca_cert_path(&self) -> PathBuf {
        self.tls
            .ca_cert
            .clone()
            .unwrap_or_else(|| cert_path(&self.pki.dir, CA_ROLE))
    }

    /// Load the trust store honouring `tls.strict_trust_store`.
    ///
    /// # Errors
    ///
    /// See [`TrustStore::from_file`].
    pub fn trust_store(&self) -> Result<TrustStore> {
        TrustStore::from_file(&self.ca_cert_path(), self.tls.strict_trust_store)
    }

    /// Handshake policy shared by server and client.
    #[must_use]
    pub fn tls_policy(&self) -> TlsPolicy {
        TlsPolicy::new(self.tls.min_protocol_version)
    }

    /// Server certificate and key: explicit paths, else `<pki.dir>/server.{crt,key}`.
    ///
    /// # Errors
    ///
    /// See [`TlsIdentity::from_files`].
    pub fn server_identity(&self) -> Result<TlsIdentity> {
        let cert = self
            .server
            .cert
            .clone()
            .unwrap_or_else(|| cert_path(&self.pki.dir, SERVER_ROLE));
        let key = self
            .server
            .key
            .clone()
            .unwrap_or_else(|| key_path(&self.pki.dir, SERVER_ROLE));
        TlsIdentity::from_files(&cert, &key)
    }

    /// Client identity `<pki.dir>/client.<name>.{crt,key}`.
    ///
    /// # Errors
    ///
    /// See [`TlsIdentity::from_files`].
    pub fn client_identity(&self, name: &str) -> Result<TlsIdentity> {
        let role = client_role(name);
        TlsIdentity::from_files(&cert_path(&self.pki.dir, &role), &key_path(&self.pki.dir, &role))
    }
}

/// Issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PkiConfig {
    /// Directory holding `<role>.crt` / `<role>.key`
    pub dir: PathBuf,
    /// Key algorithm and validity periods
    pub policy: IssuancePolicy,
    /// Identities issued by `init`
    pub plan: BootstrapPlan,
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CERT_DIR),
            policy: IssuancePolicy::default(),
            plan: BootstrapPlan::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind both listeners to
    pub host: String,
    /// Plaintext port
    pub http_port: u16,
    /// TLS port
    pub https_port: u16,
    /// Server certificate; `None` means `<pki.dir>/server.crt`
    pub cert: Option<PathBuf>,
    /// Server key; `None` means `<pki.dir>/server.key`
    pub key: Option<PathBuf>,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            https_port: 8443,
            cert: None,
            key: None,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// `(plaintext, tls)` socket addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `host` is not an IP address.
    pub fn addrs(&self) -> Result<(SocketAddr, SocketAddr)> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid host '{}': {e}", self.host)))?;
        Ok((
            SocketAddr::new(ip, self.http_port),
            SocketAddr::new(ip, self.https_port),
        ))
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL requested by `mtls-pki client`
    pub url: String,
    /// Whole-request deadline
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Default client identity (`client.<name>`)
    pub name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:8443/hello".to_string(),
            timeout: crate::client::DEFAULT_TIMEOUT,
            name: "a".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mtls::MinProtocolVersion;
    use crate::pki::KeyAlgorithm;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_reference_ports_and_timeout() {
        let config = Config::default();
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.server.https_port, 8443);
        assert_eq!(config.client.timeout, Duration::from_secs(180));
        assert_eq!(config.pki.dir, PathBuf::from("./certs"));
        assert_eq!(config.ca_cert_path(), PathBuf::from("./certs/ca.crt"));
    }

    #[test]
    fn yaml_overrides_nested_sections() {
        let yaml = r#"
pki:
  dir: /var/lib/pki
  policy:
    key_algorithm: ed25519
    leaf_validity_days: 30
tls:
  min_protocol_version: "1.3"
server:
  host: "127.0.0.1"
  https_port: 9443
client:
  timeout: 5s
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pki.policy.key_algorithm, KeyAlgorithm::Ed25519);
        assert_eq!(config.pki.policy.leaf_validity_days, 30);
        assert_eq!(config.tls.min_protocol_version, MinProtocolVersion::Tls13);
        assert_eq!(config.server.https_port, 9443);
        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.client.timeout, Duration::from_secs(5));
        assert_eq!(config.ca_cert_path(), PathBuf::from("/var/lib/pki/ca.crt"));
    }

    #[test]
    fn explicit_ca_cert_wins_over_pki_dir() {
        let mut config = Config::default();
        config.tls.ca_cert = Some(PathBuf::from("/etc/bundle.pem"));
        assert_eq!(config.ca_cert_path(), PathBuf::from("/etc/bundle.pem"));
    }

    #[test]
    fn load_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtls.yaml");
        std::fs::write(&path, "server:\n  http_port: 18080\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.server.http_port, 18080);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/mtls.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn addrs_reject_hostnames() {
        let server = ServerConfig {
            host: "localhost".into(),
            ..Default::default()
        };
        assert!(server.addrs().is_err());
        let (http, https) = ServerConfig::default().addrs().unwrap();
        assert_eq!(http.port(), 8080);
        assert_eq!(https.port(), 8443);
    }

    #[test]
    fn identities_resolve_under_pki_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.pki.dir = dir.path().to_path_buf();
        crate::pki::bootstrap(dir.path(), &config.pki.plan, &config.pki.policy).unwrap();

        assert_eq!(config.trust_store().unwrap().len(), 1);
        config.server_identity().unwrap();
        config.client_identity("b").unwrap();
        assert!(config.client_identity("zz").is_err());
    }
}
