//! Certificate inspection and PEM encoding.
//!
//! [`CertificateInfo`] is the decoded view of a DER certificate: subject,
//! issuer, serial, validity window and the usage flags the mTLS layer cares
//! about. Parsing is done with `x509-parser`; the same crate checks issuer
//! signatures in [`verify_signed_by`].

use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pki_model::{Identity, SerialNumber};
use rustls::pki_types::CertificateDer;
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;
use x509_parser::x509::X509Name;

use crate::{Error, Result};

const PEM_CERT_LABEL: &str = "CERTIFICATE";
const PEM_LINE_WIDTH: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Usage flags
// ─────────────────────────────────────────────────────────────────────────────

/// Key-usage bits relevant to this PKI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyUsageFlags {
    /// digitalSignature
    pub digital_signature: bool,
    /// keyCertSign
    pub key_cert_sign: bool,
}

/// Extended-key-usage purposes relevant to this PKI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtKeyUsageFlags {
    /// id-kp-clientAuth
    pub client_auth: bool,
    /// id-kp-serverAuth
    pub server_auth: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoded certificate
// ─────────────────────────────────────────────────────────────────────────────

/// Decoded fields of an X.509 certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Subject name.
    pub subject: Identity,
    /// Issuer name.
    pub issuer: Identity,
    /// Serial number.
    pub serial: SerialNumber,
    /// Start of the validity window.
    pub not_before: OffsetDateTime,
    /// End of the validity window.
    pub not_after: OffsetDateTime,
    /// basicConstraints cA flag.
    pub is_ca: bool,
    /// Key usage bits.
    pub key_usage: KeyUsageFlags,
    /// Extended key usage purposes.
    pub ext_key_usage: ExtKeyUsageFlags,
    /// DNS subject alternative names.
    pub dns_names: Vec<String>,
    /// Issuer DN is byte-identical to the subject DN.
    pub self_issued: bool,
}

impl CertificateInfo {
    /// Decode a DER certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if the bytes are not a valid certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = parse(der)?;

        let key_usage = match cert.key_usage() {
            Ok(Some(ku)) => KeyUsageFlags {
                digital_signature: ku.value.digital_signature(),
                key_cert_sign: ku.value.key_cert_sign(),
            },
            Ok(None) => KeyUsageFlags::default(),
            Err(e) => return Err(Error::Encoding(format!("Malformed key usage extension: {e}"))),
        };

        let ext_key_usage = match cert.extended_key_usage() {
            Ok(Some(eku)) => ExtKeyUsageFlags {
                client_auth: eku.value.client_auth,
                server_auth: eku.value.server_auth,
            },
            Ok(None) => ExtKeyUsageFlags::default(),
            Err(e) => {
                return Err(Error::Encoding(format!(
                    "Malformed extended key usage extension: {e}"
                )));
            }
        };

        let mut dns_names = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                if let GeneralName::DNSName(dns) = name {
                    dns_names.push((*dns).to_owned());
                }
            }
        }

        Ok(Self {
            subject: identity_from_name(cert.subject()),
            issuer: identity_from_name(cert.issuer()),
            serial: SerialNumber::from_bytes(cert.raw_serial().to_vec()),
            not_before: cert.validity().not_before.to_datetime(),
            not_after: cert.validity().not_after.to_datetime(),
            is_ca: cert.is_ca(),
            key_usage,
            ext_key_usage,
            dns_names,
            self_issued: cert.subject().as_raw() == cert.issuer().as_raw(),
        })
    }

    /// Decode the first certificate in a PEM buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if no certificate block can be decoded.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let der = pem_decode_certificates(pem)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Encoding("No certificate found in PEM input".into()))?;
        Self::from_der(&der)
    }

    /// Whether `at` falls inside the validity window.
    #[must_use]
    pub fn is_valid_at(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signature verification
// ─────────────────────────────────────────────────────────────────────────────

/// Check that `cert_der` carries a valid signature made by the key in
/// `issuer_der`. Self-verification is `verify_signed_by(c, c)`.
///
/// Only the signature is checked; chain building, validity and usage are the
/// trust store's job.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if either input fails to parse and
/// [`Error::Handshake`] if the signature does not verify.
pub fn verify_signed_by(cert_der: &[u8], issuer_der: &[u8]) -> Result<()> {
    let cert = parse(cert_der)?;
    let issuer = parse(issuer_der)?;
    cert.verify_signature(Some(issuer.public_key()))
        .map_err(|e| Error::Handshake(format!("Signature verification failed: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// PEM
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a DER certificate as a PEM `CERTIFICATE` block.
#[must_use]
pub fn pem_encode_certificate(der: &[u8]) -> String {
    let b64 = STANDARD.encode(der);
    let mut out = String::with_capacity(b64.len() + b64.len() / PEM_LINE_WIDTH + 64);
    let _ = writeln!(out, "-----BEGIN {PEM_CERT_LABEL}-----");
    for chunk in b64.as_bytes().chunks(PEM_LINE_WIDTH) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    let _ = writeln!(out, "-----END {PEM_CERT_LABEL}-----");
    out
}

/// Decode every `CERTIFICATE` block in a PEM buffer, failing on the first
/// malformed one. Other PEM block types are ignored.
///
/// # Errors
///
/// Returns [`Error::Encoding`] on a malformed block.
pub fn pem_decode_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    rustls_pemfile::certs(&mut &pem[..])
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Encoding(format!("Failed to parse PEM certificates: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn parse(der: &[u8]) -> Result<X509Certificate<'_>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::Encoding(format!("Failed to parse certificate: {e}")))?;
    Ok(cert)
}

/// Map an X.509 distinguished name onto an [`Identity`].
///
/// Only the first value of each attribute is kept; unknown attributes are
/// ignored.
pub(crate) fn identity_from_name(name: &X509Name<'_>) -> Identity {
    let mut id = Identity::default();
    for attr in name.iter_attributes() {
        let Ok(value) = attr.as_str() else { continue };
        let slot = match attr.attr_type().to_id_string().as_str() {
            "2.5.4.3" => &mut id.common_name,
            "2.5.4.6" => &mut id.country,
            "2.5.4.7" => &mut id.locality,
            "2.5.4.8" => &mut id.province,
            "2.5.4.9" => &mut id.street_address,
            "2.5.4.10" => &mut id.organization,
            "2.5.4.11" => &mut id.organizational_unit,
            "2.5.4.17" => &mut id.postal_code,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.to_owned());
        }
    }
    id
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
