//! Peer certificate identity.
//!
//! The fields of a verified peer certificate that are worth putting in an
//! audit line: subject and issuer names, serial and DNS SANs.

use std::fmt;

use pki_model::{Identity, SerialNumber};

use crate::Result;
use crate::pki::certificate::CertificateInfo;

/// Identity of one certificate in a verified peer chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    /// Subject name.
    pub subject: Identity,

    /// Issuer name.
    pub issuer: Identity,

    /// Serial number.
    pub serial: SerialNumber,

    /// Subject Alternative Name — DNS entries.
    pub san_dns_names: Vec<String>,

    /// Pre-computed human-readable label for logs/audit events.
    pub display_name: String,
}

impl PeerIdentity {
    /// Parse a DER-encoded certificate and extract its identity fields.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if the certificate cannot be parsed.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let info = CertificateInfo::from_der(der)?;
        let display_name = info.subject.display_name().to_owned();
        Ok(Self {
            subject: info.subject,
            issuer: info.issuer,
            serial: info.serial,
            san_dns_names: info.dns_names,
            display_name,
        })
    }
}

impl fmt::Display for PeerIdentity {
    /// `subject=/C=.../CN=... issuer=/C=.../CN=...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subject={} issuer={}", self.subject, self.issuer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::{CertificateAuthority, IssuancePolicy, LeafRequest};
    use pki_model::RoleUsage;
    use pretty_assertions::assert_eq;

    fn ca() -> CertificateAuthority {
        let id = Identity::new("CA").with_organization("CA Company");
        CertificateAuthority::issue_root(&id, &IssuancePolicy::default()).unwrap()
    }

    #[test]
    fn from_der_extracts_subject_and_issuer() {
        // GIVEN: a client leaf issued by "CA"
        let mut ca = ca();
        let leaf = ca
            .issue_leaf(&LeafRequest::new(
                Identity::new("Client A").with_organizational_unit("Engineering"),
                RoleUsage::Client,
            ))
            .unwrap();
        // WHEN: parsing
        let id = PeerIdentity::from_der(leaf.cert_der()).unwrap();
        // THEN: both names and the serial are carried
        assert_eq!(id.subject.common_name.as_deref(), Some("Client A"));
        assert_eq!(id.subject.organizational_unit.as_deref(), Some("Engineering"));
        assert_eq!(id.issuer.organization.as_deref(), Some("CA Company"));
        assert_eq!(id.serial, leaf.serial);
        assert_eq!(id.display_name, "Client A");
    }

    #[test]
    fn from_der_extracts_san_dns_name() {
        let mut ca = ca();
        let leaf = ca
            .issue_leaf(
                &LeafRequest::new(Identity::new("Server"), RoleUsage::Server)
                    .with_dns_names(vec!["hello.internal".into()]),
            )
            .unwrap();
        let id = PeerIdentity::from_der(leaf.cert_der()).unwrap();
        assert_eq!(id.san_dns_names, vec!["hello.internal"]);
    }

    #[test]
    fn display_renders_slash_separated_names() {
        let ca = ca();
        let id = PeerIdentity::from_der(ca.cert_der()).unwrap();
        assert_eq!(id.to_string(), "subject=/O=CA Company/CN=CA issuer=/O=CA Company/CN=CA");
    }

    #[test]
    fn from_der_invalid_bytes_returns_error() {
        assert!(PeerIdentity::from_der(b"not a cert").is_err());
    }
}
