//! mtls-pki data model — the primitives shared by the issuer and the TLS layer.
//!
//! Nothing in here touches key material or performs I/O. The types describe
//! *who* a certificate is for ([`Identity`]), *what* it may be used for
//! ([`RoleUsage`]), how it is numbered ([`SerialNumber`]) and where its PEM
//! artifacts live on disk ([`cert_file_name`], [`key_file_name`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role name of the root certificate authority artifacts (`ca.crt` / `ca.key`).
pub const CA_ROLE: &str = "ca";

/// Role name of the server leaf artifacts (`server.crt` / `server.key`).
pub const SERVER_ROLE: &str = "server";

/// Role name for a named client, e.g. `client.a`.
#[must_use]
pub fn client_role(name: &str) -> String {
    format!("client.{name}")
}

/// File name of the PEM certificate for `role`.
#[must_use]
pub fn cert_file_name(role: &str) -> String {
    format!("{role}.crt")
}

/// File name of the PEM private key for `role`.
#[must_use]
pub fn key_file_name(role: &str) -> String {
    format!("{role}.key")
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Structured subject name a certificate asserts.
///
/// Every attribute is a free-form single value. The common name should be
/// unique per issued certificate inside one trust domain so audit logs stay
/// unambiguous, but nothing enforces that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Identity {
    /// Country (C).
    pub country: Option<String>,
    /// State or province (ST).
    pub province: Option<String>,
    /// Locality (L).
    pub locality: Option<String>,
    /// Street address.
    pub street_address: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Organization (O).
    pub organization: Option<String>,
    /// Organizational unit (OU).
    pub organizational_unit: Option<String>,
    /// Common name (CN).
    pub common_name: Option<String>,
}

impl Identity {
    /// Identity carrying only a common name.
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: Some(common_name.into()),
            ..Self::default()
        }
    }

    /// Replace the common name.
    #[must_use]
    pub fn with_common_name(mut self, cn: impl Into<String>) -> Self {
        self.common_name = Some(cn.into());
        self
    }

    /// Replace the organization.
    #[must_use]
    pub fn with_organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Replace the organizational unit.
    #[must_use]
    pub fn with_organizational_unit(mut self, ou: impl Into<String>) -> Self {
        self.organizational_unit = Some(ou.into());
        self
    }

    /// Replace the country.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Replace the locality.
    #[must_use]
    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    /// Replace the state / province.
    #[must_use]
    pub fn with_province(mut self, province: impl Into<String>) -> Self {
        self.province = Some(province.into());
        self
    }

    /// Replace the street address.
    #[must_use]
    pub fn with_street_address(mut self, street: impl Into<String>) -> Self {
        self.street_address = Some(street.into());
        self
    }

    /// Replace the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    /// Label used in logs: the CN, or `"<unknown>"`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.common_name.as_deref().unwrap_or("<unknown>")
    }
}

/// OpenSSL-style one-line rendering: `/C=Earth/ST=Asia/L=Mountain/O=../OU=../CN=..`.
///
/// Absent attributes are omitted.
impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            ("C", &self.country),
            ("ST", &self.province),
            ("L", &self.locality),
            ("O", &self.organization),
            ("OU", &self.organizational_unit),
            ("CN", &self.common_name),
        ];
        let mut wrote = false;
        for (label, value) in parts {
            if let Some(v) = value {
                write!(f, "/{label}={v}")?;
                wrote = true;
            }
        }
        if !wrote {
            f.write_str("/")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Role usage
// ─────────────────────────────────────────────────────────────────────────────

/// Extended-key-usage scope of a leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleUsage {
    /// TLS client authentication only.
    Client,
    /// TLS server authentication only.
    Server,
    /// Both client and server authentication.
    Both,
}

impl RoleUsage {
    /// Whether the usage includes client authentication.
    #[must_use]
    pub fn client_auth(self) -> bool {
        matches!(self, Self::Client | Self::Both)
    }

    /// Whether the usage includes server authentication.
    #[must_use]
    pub fn server_auth(self) -> bool {
        matches!(self, Self::Server | Self::Both)
    }
}

impl fmt::Display for RoleUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::Both => "both",
        })
    }
}

/// Error returned when parsing an unknown [`RoleUsage`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role usage '{0}' (expected client, server or both)")]
pub struct UnknownRoleUsage(pub String);

impl FromStr for RoleUsage {
    type Err = UnknownRoleUsage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            "both" => Ok(Self::Both),
            other => Err(UnknownRoleUsage(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serial number
// ─────────────────────────────────────────────────────────────────────────────

/// Certificate serial number as the big-endian magnitude bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    /// Wrap raw big-endian bytes. Leading zero bytes are stripped so two
    /// encodings of the same integer compare equal.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let mut bytes = bytes.into();
        let first_non_zero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        bytes.drain(..first_non_zero);
        Self(bytes)
    }

    /// Raw big-endian bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Colon separated upper-case hex, e.g. `1F:A0:03`.
impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("00");
        }
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
