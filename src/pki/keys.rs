//! Key material generation.
//!
//! Every identity (the root and each leaf) gets its own freshly generated
//! key pair. Private keys never leave the process except as PEM written by
//! [`crate::pki::artifacts`].

use std::fmt;

use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256, PKCS_ECDSA_P384_SHA384, PKCS_ED25519, SignatureAlgorithm};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Asymmetric algorithm used for newly generated key pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    /// ECDSA over NIST P-256 with SHA-256.
    #[default]
    EcdsaP256,
    /// ECDSA over NIST P-384 with SHA-384.
    EcdsaP384,
    /// Ed25519.
    Ed25519,
}

impl KeyAlgorithm {
    fn signature_algorithm(self) -> &'static SignatureAlgorithm {
        match self {
            Self::EcdsaP256 => &PKCS_ECDSA_P256_SHA256,
            Self::EcdsaP384 => &PKCS_ECDSA_P384_SHA384,
            Self::Ed25519 => &PKCS_ED25519,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EcdsaP256 => "ecdsa-p256",
            Self::EcdsaP384 => "ecdsa-p384",
            Self::Ed25519 => "ed25519",
        })
    }
}

/// Generate a fresh key pair.
///
/// # Errors
///
/// Returns [`Error::KeyGeneration`] when the system RNG or the algorithm
/// implementation fails.
pub fn generate_key_pair(algorithm: KeyAlgorithm) -> Result<KeyPair> {
    let key = KeyPair::generate_for(algorithm.signature_algorithm())
        .map_err(|e| Error::KeyGeneration(format!("{algorithm} key generation failed: {e}")))?;
    debug!(%algorithm, "Generated key pair");
    Ok(key)
}

/// Parse a PEM private key (PKCS#8, SEC1 or PKCS#1) into a signing key pair.
///
/// # Errors
///
/// Returns [`Error::Encoding`] when the PEM cannot be parsed or the key type
/// is not supported for signing.
pub fn load_key_pair(pem: &str) -> Result<KeyPair> {
    KeyPair::from_pem(pem).map_err(|e| Error::Encoding(format!("Failed to parse private key: {e}")))
}

/// Convert a key pair into the DER form rustls expects.
#[must_use]
pub fn private_key_der(key: &KeyPair) -> PrivateKeyDer<'static> {
    PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_pem_for_every_algorithm() {
        for alg in [KeyAlgorithm::EcdsaP256, KeyAlgorithm::EcdsaP384, KeyAlgorithm::Ed25519] {
            let key = generate_key_pair(alg).unwrap();
            assert!(key.serialize_pem().contains("BEGIN PRIVATE KEY"), "{alg}");
        }
    }

    #[test]
    fn each_generation_is_unique() {
        let a = generate_key_pair(KeyAlgorithm::default()).unwrap();
        let b = generate_key_pair(KeyAlgorithm::default()).unwrap();
        assert_ne!(a.serialize_der(), b.serialize_der());
    }

    #[test]
    fn load_key_pair_round_trips_key_bytes() {
        let key = generate_key_pair(KeyAlgorithm::EcdsaP384).unwrap();
        let loaded = load_key_pair(&key.serialize_pem()).unwrap();
        assert_eq!(key.serialize_der(), loaded.serialize_der());
    }

    #[test]
    fn load_key_pair_rejects_garbage() {
        let err = load_key_pair("not a pem key").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn private_key_der_is_pkcs8() {
        let key = generate_key_pair(KeyAlgorithm::Ed25519).unwrap();
        assert!(matches!(private_key_der(&key), PrivateKeyDer::Pkcs8(_)));
    }

    #[test]
    fn algorithm_deserialises_from_kebab_case() {
        let alg: KeyAlgorithm = serde_yaml::from_str("ecdsa-p384").unwrap();
        assert_eq!(alg, KeyAlgorithm::EcdsaP384);
    }
}
