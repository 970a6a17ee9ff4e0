//! mTLS configuration types.
//!
//! Where the trust anchor lives, how strictly it is parsed, and the protocol
//! floor for both the server and the client.
//!
//! # Example YAML
//!
//! ```yaml
//! tls:
//!   ca_cert: "./certs/ca.crt"
//!   strict_trust_store: false
//!   min_protocol_version: "1.2"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level mTLS config
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level mTLS configuration block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MtlsConfig {
    /// PEM bundle of trusted roots. `None` means `<pki.dir>/ca.crt`.
    pub ca_cert: Option<PathBuf>,

    /// When `true`, a single malformed PEM block in the trust bundle fails
    /// startup. When `false` (default) malformed blocks are skipped with a
    /// warning and startup only fails if no anchor survives.
    pub strict_trust_store: bool,

    /// Lowest TLS protocol version either side will negotiate.
    pub min_protocol_version: MinProtocolVersion,
}

/// Protocol floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinProtocolVersion {
    /// TLS 1.2 and 1.3.
    #[default]
    #[serde(rename = "1.2")]
    Tls12,
    /// TLS 1.3 only.
    #[serde(rename = "1.3")]
    Tls13,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_permissive_tls12() {
        // GIVEN: default-constructed config
        let cfg = MtlsConfig::default();
        // THEN: TLS 1.2 floor, permissive bundle parsing, CA from the pki dir
        assert_eq!(cfg.min_protocol_version, MinProtocolVersion::Tls12);
        assert!(!cfg.strict_trust_store);
        assert!(cfg.ca_cert.is_none());
    }

    #[test]
    fn min_protocol_version_parses_from_yaml() {
        let cfg: MtlsConfig = serde_yaml::from_str("min_protocol_version: \"1.3\"").unwrap();
        assert_eq!(cfg.min_protocol_version, MinProtocolVersion::Tls13);
    }

    #[test]
    fn unknown_protocol_version_is_rejected() {
        let res: Result<MtlsConfig, _> = serde_yaml::from_str("min_protocol_version: \"1.0\"");
        assert!(res.is_err());
    }

    #[test]
    fn strict_mode_and_ca_path_override() {
        let yaml = "ca_cert: /etc/pki/bundle.pem\nstrict_trust_store: true";
        let cfg: MtlsConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.strict_trust_store);
        assert_eq!(cfg.ca_cert, Some(PathBuf::from("/etc/pki/bundle.pem")));
    }
}
