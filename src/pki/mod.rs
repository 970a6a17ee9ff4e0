//! Private PKI: key generation, a single-root certificate authority and the
//! PEM artifacts it produces.
//!
//! ```text
//! keys::generate_key_pair
//!   → issuer::CertificateAuthority::issue_root     (self-signed, cA=TRUE)
//!   → issuer::CertificateAuthority::issue_leaf     (server / client leaves)
//!   → artifacts::write_pair                        (<role>.crt / <role>.key)
//! ```
//!
//! # Modules
//!
//! - [`keys`] — key pair generation and PEM key loading
//! - [`serial`] — per-CA unique serial allocation
//! - [`issuer`] — root and leaf issuance (`CertificateAuthority`)
//! - [`certificate`] — decoding (`CertificateInfo`), signature checks, PEM
//! - [`artifacts`] — on-disk layout and the bootstrap pass

pub mod artifacts;
pub mod certificate;
pub mod issuer;
pub mod keys;
pub mod serial;

pub use artifacts::{BootstrapPlan, Bootstrapped, ClientPlan, bootstrap, issue_additional};
pub use certificate::{
    CertificateInfo, ExtKeyUsageFlags, KeyUsageFlags, pem_decode_certificates,
    pem_encode_certificate, verify_signed_by,
};
pub use issuer::{CertificateAuthority, IssuancePolicy, IssuedCertificate, LeafRequest, Validity};
pub use keys::{KeyAlgorithm, generate_key_pair, load_key_pair};
pub use serial::SerialAllocator;
