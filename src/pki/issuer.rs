//! Certificate authority issuer.
//!
//! A [`CertificateAuthority`] is the single root of trust: a self-signed CA
//! certificate plus the key that signed it. Leaves are issued under it with
//! [`CertificateAuthority::issue_leaf`]. Issuance is pure: certificates and
//! keys come back as DER/PEM values and nothing is written to disk here
//! (see [`crate::pki::artifacts`] for that).

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use pki_model::{Identity, RoleUsage, SerialNumber};
use rcgen::string::Ia5String;
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    Issuer, KeyPair, KeyUsagePurpose, SanType,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::pki::certificate::{CertificateInfo, pem_decode_certificates, verify_signed_by};
use crate::pki::keys::{KeyAlgorithm, generate_key_pair, load_key_pair, private_key_der};
use crate::pki::serial::SerialAllocator;
use crate::{Error, Result};

/// Root validity horizon: ten years.
pub const DEFAULT_CA_VALIDITY_DAYS: u32 = 3650;

/// Leaf validity horizon; always clamped to the root's `NotAfter`.
pub const DEFAULT_LEAF_VALIDITY_DAYS: u32 = 3650;

const SECONDS_PER_DAY: i64 = 86_400;

// ─────────────────────────────────────────────────────────────────────────────
// Policy and requests
// ─────────────────────────────────────────────────────────────────────────────

/// Knobs applied to every certificate a CA issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuancePolicy {
    /// Algorithm for newly generated key pairs.
    pub key_algorithm: KeyAlgorithm,
    /// Root validity in days.
    pub ca_validity_days: u32,
    /// Default leaf validity in days.
    pub leaf_validity_days: u32,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            key_algorithm: KeyAlgorithm::default(),
            ca_validity_days: DEFAULT_CA_VALIDITY_DAYS,
            leaf_validity_days: DEFAULT_LEAF_VALIDITY_DAYS,
        }
    }
}

/// A `NotBefore` / `NotAfter` pair with whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    /// Start of the window.
    pub not_before: OffsetDateTime,
    /// End of the window.
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Explicit window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if `not_after` is not after `not_before`.
    pub fn new(not_before: OffsetDateTime, not_after: OffsetDateTime) -> Result<Self> {
        if not_after <= not_before {
            return Err(Error::Signing(format!(
                "Validity window is empty: {not_before} .. {not_after}"
            )));
        }
        Ok(Self {
            not_before: truncate_to_second(not_before),
            not_after: truncate_to_second(not_after),
        })
    }

    /// Window starting now and lasting `days`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] on a clock error, a zero-length window or
    /// an end date past the representable range.
    pub fn starting_now(days: u32) -> Result<Self> {
        let now = now_utc()?;
        let not_after = now
            .checked_add(time::Duration::seconds(i64::from(days) * SECONDS_PER_DAY))
            .ok_or_else(|| {
                Error::Signing(format!("Validity of {days} days is out of range"))
            })?;
        Self::new(now, not_after)
    }
}

/// Request for one leaf certificate.
#[derive(Debug, Clone)]
pub struct LeafRequest {
    /// Subject of the leaf.
    pub identity: Identity,
    /// Extended key usage scope.
    pub usage: RoleUsage,
    /// DNS subject alternative names.
    pub dns_names: Vec<String>,
    /// IP subject alternative names.
    pub ip_addresses: Vec<IpAddr>,
    /// Explicit validity; `None` uses the policy default starting now.
    pub validity: Option<Validity>,
}

impl LeafRequest {
    /// Request with the default SAN (`localhost`) and default validity.
    pub fn new(identity: Identity, usage: RoleUsage) -> Self {
        Self {
            identity,
            usage,
            dns_names: vec!["localhost".to_owned()],
            ip_addresses: Vec::new(),
            validity: None,
        }
    }

    /// Replace the DNS SANs.
    #[must_use]
    pub fn with_dns_names(mut self, names: Vec<String>) -> Self {
        self.dns_names = names;
        self
    }

    /// Replace the IP SANs.
    #[must_use]
    pub fn with_ip_addresses(mut self, ips: Vec<IpAddr>) -> Self {
        self.ip_addresses = ips;
        self
    }

    /// Use an explicit validity window.
    #[must_use]
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Issued certificate
// ─────────────────────────────────────────────────────────────────────────────

/// A signed leaf certificate and the key pair it binds.
#[derive(Debug)]
pub struct IssuedCertificate {
    /// Subject the certificate asserts.
    pub subject: Identity,
    /// Serial allocated by the issuing CA.
    pub serial: SerialNumber,
    /// Effective validity (after clamping to the CA).
    pub validity: Validity,
    /// Extended key usage scope.
    pub usage: RoleUsage,
    cert_der: CertificateDer<'static>,
    cert_pem: String,
    key: KeyPair,
}

impl IssuedCertificate {
    /// DER certificate.
    #[must_use]
    pub fn cert_der(&self) -> &CertificateDer<'static> {
        &self.cert_der
    }

    /// PEM certificate.
    #[must_use]
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// PEM PKCS#8 private key.
    #[must_use]
    pub fn key_pem(&self) -> String {
        self.key.serialize_pem()
    }

    /// Private key in the form rustls consumes.
    #[must_use]
    pub fn private_key_der(&self) -> PrivateKeyDer<'static> {
        private_key_der(&self.key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Certificate authority
// ─────────────────────────────────────────────────────────────────────────────

/// The root of trust: self-signed CA certificate plus its signing key.
///
/// The root key is only read after creation; `issue_leaf` takes `&mut self`
/// solely to advance the serial allocator.
pub struct CertificateAuthority {
    identity: Identity,
    serial: SerialNumber,
    validity: Validity,
    cert_der: CertificateDer<'static>,
    cert_pem: String,
    key_pem: String,
    issuer: Issuer<'static, KeyPair>,
    serials: SerialAllocator,
    policy: IssuancePolicy,
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("identity", &self.identity)
            .field("serial", &self.serial)
            .field("validity", &self.validity)
            .finish_non_exhaustive()
    }
}

impl CertificateAuthority {
    /// Generate a key pair and a self-signed root certificate for `identity`.
    ///
    /// The root is flagged `cA=TRUE`, carries `digitalSignature | keyCertSign`
    /// and `clientAuth | serverAuth`.
    ///
    /// # Errors
    ///
    /// [`Error::KeyGeneration`] if the key cannot be generated,
    /// [`Error::Signing`] if the certificate cannot be built.
    pub fn issue_root(identity: &Identity, policy: &IssuancePolicy) -> Result<Self> {
        let key = generate_key_pair(policy.key_algorithm)?;
        let validity = Validity::starting_now(policy.ca_validity_days)?;
        let mut serials = SerialAllocator::new();
        let serial = serials.allocate();

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(identity);
        params.serial_number = Some(rcgen::SerialNumber::from_slice(serial.as_bytes()));
        params.not_before = validity.not_before;
        params.not_after = validity.not_after;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature, KeyUsagePurpose::KeyCertSign];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ClientAuth,
            ExtendedKeyUsagePurpose::ServerAuth,
        ];

        let cert = params
            .self_signed(&key)
            .map_err(|e| Error::Signing(format!("CA cert generation failed: {e}")))?;

        info!(
            cn = identity.display_name(),
            serial = %serial,
            not_after = %validity.not_after,
            "Issued root certificate"
        );

        let key_pem = key.serialize_pem();
        Ok(Self {
            identity: identity.clone(),
            serial,
            validity,
            cert_der: cert.der().clone(),
            cert_pem: cert.pem(),
            key_pem,
            issuer: Issuer::new(params, key),
            serials,
            policy: policy.clone(),
        })
    }

    /// Reopen a persisted root so more leaves can be issued under it.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if either PEM cannot be parsed, [`Error::Signing`]
    /// if the certificate is not a CA or the key does not belong to it.
    pub fn from_pem(cert_pem: &str, key_pem: &str, policy: &IssuancePolicy) -> Result<Self> {
        let key = load_key_pair(key_pem)?;
        let cert_der = pem_decode_certificates(cert_pem.as_bytes())?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Encoding("No CA certificate found in PEM input".into()))?;
        let info = CertificateInfo::from_der(&cert_der)?;
        if !info.is_ca {
            return Err(Error::Signing(format!(
                "'{}' is not a CA certificate",
                info.subject.display_name()
            )));
        }

        let issuer = Issuer::from_ca_cert_der(&cert_der, key)
            .map_err(|e| Error::Signing(format!("Failed to rebuild CA for signing: {e}")))?;

        let mut serials = SerialAllocator::new();
        serials.reserve(info.serial.clone());

        let ca = Self {
            identity: info.subject,
            serial: info.serial,
            validity: Validity {
                not_before: info.not_before,
                not_after: info.not_after,
            },
            cert_der,
            cert_pem: cert_pem.to_owned(),
            key_pem: key_pem.to_owned(),
            issuer,
            serials,
            policy: policy.clone(),
        };
        ca.check_key_matches_certificate()?;
        Ok(ca)
    }

    /// Generate a key pair for `request.identity` and sign a leaf for it.
    ///
    /// The leaf carries `digitalSignature` only, `cA=FALSE`, and the EKUs of
    /// `request.usage`. Its `NotAfter` never exceeds the root's.
    ///
    /// # Errors
    ///
    /// [`Error::KeyGeneration`] if the leaf key cannot be generated,
    /// [`Error::Signing`] on a malformed template or signing failure.
    pub fn issue_leaf(&mut self, request: &LeafRequest) -> Result<IssuedCertificate> {
        let requested = match request.validity {
            Some(v) => v,
            None => Validity::starting_now(self.policy.leaf_validity_days)?,
        };
        let validity = Validity::new(
            requested.not_before,
            requested.not_after.min(self.validity.not_after),
        )?;

        let key = generate_key_pair(self.policy.key_algorithm)?;
        let serial = self.serials.allocate();

        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(&request.identity);
        params.serial_number = Some(rcgen::SerialNumber::from_slice(serial.as_bytes()));
        params.not_before = validity.not_before;
        params.not_after = validity.not_after;
        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
        params.extended_key_usages = extended_key_usages(request.usage);
        params.subject_alt_names = subject_alt_names(request)?;
        params.use_authority_key_identifier_extension = true;

        let cert = params
            .signed_by(&key, &self.issuer)
            .map_err(|e| Error::Signing(format!("Leaf cert signing failed: {e}")))?;

        info!(
            cn = request.identity.display_name(),
            usage = %request.usage,
            serial = %serial,
            issuer = self.identity.display_name(),
            "Issued leaf certificate"
        );

        Ok(IssuedCertificate {
            subject: request.identity.clone(),
            serial,
            validity,
            usage: request.usage,
            cert_der: cert.der().clone(),
            cert_pem: cert.pem(),
            key,
        })
    }

    /// Subject (== issuer) of the root.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Root serial.
    #[must_use]
    pub fn serial(&self) -> &SerialNumber {
        &self.serial
    }

    /// Root validity.
    #[must_use]
    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// DER root certificate.
    #[must_use]
    pub fn cert_der(&self) -> &CertificateDer<'static> {
        &self.cert_der
    }

    /// PEM root certificate.
    #[must_use]
    pub fn cert_pem(&self) -> &str {
        &self.cert_pem
    }

    /// PEM root private key.
    #[must_use]
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// Sign a throwaway certificate and check it against the stored root
    /// certificate. Catches a CA key / certificate pair that do not match.
    fn check_key_matches_certificate(&self) -> Result<()> {
        let probe_key = load_key_pair(&self.key_pem)?;
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(&Identity::new("key-match-probe"));
        let probe = params
            .signed_by(&probe_key, &self.issuer)
            .map_err(|e| Error::Signing(format!("Probe signing failed: {e}")))?;
        verify_signed_by(probe.der(), &self.cert_der)
            .map_err(|_| Error::Signing("CA private key does not match CA certificate".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────────────────────────

fn distinguished_name(identity: &Identity) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    let attrs = [
        (DnType::CountryName, &identity.country),
        (DnType::StateOrProvinceName, &identity.province),
        (DnType::LocalityName, &identity.locality),
        (DnType::CustomDnType(vec![2, 5, 4, 9]), &identity.street_address),
        (DnType::CustomDnType(vec![2, 5, 4, 17]), &identity.postal_code),
        (DnType::OrganizationName, &identity.organization),
        (DnType::OrganizationalUnitName, &identity.organizational_unit),
        (DnType::CommonName, &identity.common_name),
    ];
    for (ty, value) in attrs {
        if let Some(v) = value {
            dn.push(ty, v.as_str());
        }
    }
    dn
}

fn extended_key_usages(usage: RoleUsage) -> Vec<ExtendedKeyUsagePurpose> {
    let mut ekus = Vec::with_capacity(2);
    if usage.client_auth() {
        ekus.push(ExtendedKeyUsagePurpose::ClientAuth);
    }
    if usage.server_auth() {
        ekus.push(ExtendedKeyUsagePurpose::ServerAuth);
    }
    ekus
}

fn subject_alt_names(request: &LeafRequest) -> Result<Vec<SanType>> {
    let mut sans = Vec::with_capacity(request.dns_names.len() + request.ip_addresses.len());
    for dns in &request.dns_names {
        let ia5 = Ia5String::try_from(dns.as_str())
            .map_err(|e| Error::Signing(format!("Invalid DNS SAN '{dns}': {e}")))?;
        sans.push(SanType::DnsName(ia5));
    }
    sans.extend(request.ip_addresses.iter().copied().map(SanType::IpAddress));
    Ok(sans)
}

fn now_utc() -> Result<OffsetDateTime> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Signing(format!("System time error: {e}")))?
        .as_secs();
    OffsetDateTime::from_unix_timestamp(i64::try_from(secs).unwrap_or(i64::MAX))
        .map_err(|e| Error::Signing(format!("Date calculation error: {e}")))
}

fn truncate_to_second(t: OffsetDateTime) -> OffsetDateTime {
    t.replace_nanosecond(0).unwrap_or(t)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn root(cn: &str) -> CertificateAuthority {
        CertificateAuthority::issue_root(&Identity::new(cn), &IssuancePolicy::default()).unwrap()
    }

    // ─── root ─────────────────────────────────────────────────────────────────

    #[test]
    fn root_issuer_equals_subject_and_is_ca() {
        let id = Identity::new("CA").with_organization("CA Company");
        let ca = CertificateAuthority::issue_root(&id, &IssuancePolicy::default()).unwrap();
        let info = CertificateInfo::from_der(ca.cert_der()).unwrap();
        assert_eq!(info.subject, id);
        assert_eq!(info.issuer, id);
        assert!(info.is_ca);
        assert_eq!(ca.identity(), &id);
    }

    #[test]
    fn root_validity_is_ten_years() {
        let ca = root("CA");
        let v = ca.validity();
        assert_eq!(
            (v.not_after - v.not_before).whole_days(),
            i64::from(DEFAULT_CA_VALIDITY_DAYS)
        );
    }

    #[test]
    fn root_pem_outputs_are_populated() {
        let ca = root("CA");
        assert!(ca.cert_pem().contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem().contains("PRIVATE KEY"));
    }

    #[test]
    fn two_roots_have_distinct_keys_and_serials() {
        let a = root("CA");
        let b = root("CA");
        assert_ne!(a.key_pem(), b.key_pem());
        assert_ne!(a.serial(), b.serial());
    }

    // ─── leaves ───────────────────────────────────────────────────────────────

    #[test]
    fn client_leaf_has_client_auth_only_and_no_cert_sign() {
        let mut ca = root("CA");
        let leaf = ca
            .issue_leaf(&LeafRequest::new(Identity::new("Client A"), RoleUsage::Client))
            .unwrap();
        let info = CertificateInfo::from_der(leaf.cert_der()).unwrap();
        assert!(!info.is_ca);
        assert!(info.key_usage.digital_signature);
        assert!(!info.key_usage.key_cert_sign);
        assert!(info.ext_key_usage.client_auth);
        assert!(!info.ext_key_usage.server_auth);
        assert_eq!(info.issuer, *ca.identity());
        assert!(!info.self_issued);
    }

    #[test]
    fn server_leaf_carries_requested_sans() {
        let mut ca = root("CA");
        let leaf = ca
            .issue_leaf(
                &LeafRequest::new(Identity::new("Server"), RoleUsage::Server)
                    .with_dns_names(vec!["localhost".into(), "server.internal".into()])
                    .with_ip_addresses(vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]),
            )
            .unwrap();
        let info = CertificateInfo::from_der(leaf.cert_der()).unwrap();
        assert!(info.ext_key_usage.server_auth);
        assert!(!info.ext_key_usage.client_auth);
        assert_eq!(info.dns_names, vec!["localhost", "server.internal"]);
    }

    #[test]
    fn leaf_serials_are_unique_within_a_ca() {
        let mut ca = root("CA");
        let a = ca
            .issue_leaf(&LeafRequest::new(Identity::new("a"), RoleUsage::Client))
            .unwrap();
        let b = ca
            .issue_leaf(&LeafRequest::new(Identity::new("b"), RoleUsage::Client))
            .unwrap();
        assert_ne!(a.serial, b.serial);
        assert_ne!(&a.serial, ca.serial());
    }

    #[test]
    fn leaf_not_after_is_clamped_to_root() {
        let policy = IssuancePolicy {
            ca_validity_days: 30,
            leaf_validity_days: 365,
            ..IssuancePolicy::default()
        };
        let mut ca = CertificateAuthority::issue_root(&Identity::new("CA"), &policy).unwrap();
        let leaf = ca
            .issue_leaf(&LeafRequest::new(Identity::new("x"), RoleUsage::Both))
            .unwrap();
        assert!(leaf.validity.not_after <= ca.validity().not_after);
    }

    #[test]
    fn explicit_validity_in_the_past_is_honoured() {
        let mut ca = root("CA");
        let now = now_utc().unwrap();
        let window = Validity::new(now - time::Duration::days(10), now - time::Duration::days(1))
            .unwrap();
        let leaf = ca
            .issue_leaf(
                &LeafRequest::new(Identity::new("expired"), RoleUsage::Client).with_validity(window),
            )
            .unwrap();
        let info = CertificateInfo::from_der(leaf.cert_der()).unwrap();
        assert_eq!(info.not_after, window.not_after);
        assert!(!info.is_valid_at(now));
    }

    #[test]
    fn empty_validity_window_is_a_signing_error() {
        let now = now_utc().unwrap();
        let err = Validity::new(now, now).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn out_of_range_validity_days_is_a_signing_error() {
        // GIVEN: a policy whose root validity runs past the year 9999
        let policy = IssuancePolicy {
            ca_validity_days: 4_000_000,
            ..IssuancePolicy::default()
        };
        // WHEN: issuing the root
        let err = CertificateAuthority::issue_root(&Identity::new("CA"), &policy).unwrap_err();
        // THEN: an error, not a panic
        assert!(matches!(err, Error::Signing(_)), "{err:?}");
    }

    #[test]
    fn out_of_range_leaf_validity_days_is_a_signing_error() {
        let mut ca = root("CA");
        ca.policy.leaf_validity_days = u32::MAX;
        let err = ca
            .issue_leaf(&LeafRequest::new(Identity::new("x"), RoleUsage::Client))
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)), "{err:?}");
    }

    #[test]
    fn invalid_dns_san_is_a_signing_error() {
        let mut ca = root("CA");
        let err = ca
            .issue_leaf(
                &LeafRequest::new(Identity::new("x"), RoleUsage::Server)
                    .with_dns_names(vec!["bad\u{e9}name".into()]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn every_key_algorithm_issues_a_verifiable_chain() {
        for alg in [KeyAlgorithm::EcdsaP256, KeyAlgorithm::EcdsaP384, KeyAlgorithm::Ed25519] {
            let policy = IssuancePolicy {
                key_algorithm: alg,
                ..IssuancePolicy::default()
            };
            let mut ca = CertificateAuthority::issue_root(&Identity::new("CA"), &policy).unwrap();
            let leaf = ca
                .issue_leaf(&LeafRequest::new(Identity::new("leaf"), RoleUsage::Client))
                .unwrap();
            verify_signed_by(leaf.cert_der(), ca.cert_der()).unwrap();
        }
    }

    // ─── reopen from PEM ──────────────────────────────────────────────────────

    #[test]
    fn reopened_ca_issues_leaves_that_chain_to_original_root() {
        let ca = root("CA");
        let mut reopened =
            CertificateAuthority::from_pem(ca.cert_pem(), ca.key_pem(), &IssuancePolicy::default())
                .unwrap();
        assert_eq!(reopened.identity(), ca.identity());
        assert_eq!(reopened.serial(), ca.serial());

        let leaf = reopened
            .issue_leaf(&LeafRequest::new(Identity::new("Client B"), RoleUsage::Client))
            .unwrap();
        verify_signed_by(leaf.cert_der(), ca.cert_der()).unwrap();
    }

    #[test]
    fn reopening_with_foreign_key_is_rejected() {
        let ca = root("CA");
        let other = root("Other");
        let err =
            CertificateAuthority::from_pem(ca.cert_pem(), other.key_pem(), &IssuancePolicy::default())
                .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn reopening_a_leaf_as_ca_is_rejected() {
        let mut ca = root("CA");
        let leaf = ca
            .issue_leaf(&LeafRequest::new(Identity::new("leaf"), RoleUsage::Client))
            .unwrap();
        let err = CertificateAuthority::from_pem(
            leaf.cert_pem(),
            &leaf.key_pem(),
            &IssuancePolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn reopening_with_garbage_key_is_an_encoding_error() {
        let ca = root("CA");
        let err = CertificateAuthority::from_pem(ca.cert_pem(), "nope", &IssuancePolicy::default())
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
