//! PEM artifacts on disk and the bootstrap issuance pass.
//!
//! Layout is fixed: one directory (default `./certs/`) holding
//! `<role>.crt` / `<role>.key` for `ca`, `server` and each `client.<name>`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pki_model::{CA_ROLE, Identity, RoleUsage, SERVER_ROLE, cert_file_name, client_role, key_file_name};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pki::issuer::{CertificateAuthority, IssuancePolicy, IssuedCertificate, LeafRequest};
use crate::{Error, Result};

/// Default artifact directory.
pub const DEFAULT_CERT_DIR: &str = "./certs";

/// Path of `<role>.crt` under `dir`.
#[must_use]
pub fn cert_path(dir: &Path, role: &str) -> PathBuf {
    dir.join(cert_file_name(role))
}

/// Path of `<role>.key` under `dir`.
#[must_use]
pub fn key_path(dir: &Path, role: &str) -> PathBuf {
    dir.join(key_file_name(role))
}

/// Write `<role>.crt` (0644) and `<role>.key` (0600 on unix) under `dir`,
/// creating the directory if needed.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or either file cannot be written.
pub fn write_pair(dir: &Path, role: &str, cert_pem: &str, key_pem: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    write_with_mode(&cert_path(dir, role), cert_pem.as_bytes(), 0o644)?;
    write_with_mode(&key_path(dir, role), key_pem.as_bytes(), 0o600)?;
    info!(role, dir = %dir.display(), "Wrote certificate and key");
    Ok(())
}

/// Read `<role>.crt` and `<role>.key` from `dir`.
///
/// # Errors
///
/// Returns [`Error::Config`] naming the missing file.
pub fn read_pair(dir: &Path, role: &str) -> Result<(String, String)> {
    let cert = read_to_string(&cert_path(dir, role))?;
    let key = read_to_string(&key_path(dir, role))?;
    Ok((cert, key))
}

/// Read a file into a string, naming it in the error.
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read '{}': {e}", path.display())))
}

/// Read a file as raw bytes, naming it in the error.
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Config(format!("Cannot read '{}': {e}", path.display())))
}

#[cfg(unix)]
fn write_with_mode(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)?;
    // mode() only applies on creation
    file.set_permissions(fs::Permissions::from_mode(mode))?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_with_mode(path: &Path, contents: &[u8], _mode: u32) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap
// ─────────────────────────────────────────────────────────────────────────────

/// One client leaf in the bootstrap plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientPlan {
    /// Short name; artifacts are written as `client.<name>`.
    pub name: String,
    /// Subject of the client certificate.
    pub identity: Identity,
}

/// Identities issued by `mtls-pki init`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapPlan {
    /// Root subject.
    pub ca: Identity,
    /// Server leaf subject.
    pub server: Identity,
    /// DNS names for the server leaf.
    pub server_dns_names: Vec<String>,
    /// Client leaves.
    pub clients: Vec<ClientPlan>,
}

impl Default for BootstrapPlan {
    fn default() -> Self {
        let base = Identity::default()
            .with_country("Earth")
            .with_organizational_unit("Engineering")
            .with_locality("Mountain")
            .with_province("Asia")
            .with_street_address("Bridge")
            .with_postal_code("123456");
        let ca = base.clone().with_common_name("CA").with_organization("CA Company");
        Self {
            clients: vec![client_plan(&ca, "a"), client_plan(&ca, "b")],
            server: base
                .with_common_name("Server")
                .with_organization("Server Company"),
            server_dns_names: vec!["localhost".to_owned()],
            ca,
        }
    }
}

impl BootstrapPlan {
    /// Replace the client list with one client per name. Subjects copy the
    /// root's location fields with `CN=Client <NAME>`, `O=Client <NAME> Company`.
    #[must_use]
    pub fn with_client_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.clients = names
            .iter()
            .map(|name| client_plan(&self.ca, name.as_ref()))
            .collect();
        self
    }
}

fn client_plan(template: &Identity, name: &str) -> ClientPlan {
    let cn = format!("Client {}", name.to_uppercase());
    ClientPlan {
        name: name.to_owned(),
        identity: template
            .clone()
            .with_organization(format!("{cn} Company"))
            .with_common_name(cn),
    }
}

/// Everything produced by one bootstrap pass.
#[derive(Debug)]
pub struct Bootstrapped {
    /// The root.
    pub ca: CertificateAuthority,
    /// Server leaf (ServerAuth).
    pub server: IssuedCertificate,
    /// Client leaves (ClientAuth) keyed by short name.
    pub clients: Vec<(String, IssuedCertificate)>,
}

/// Run the full issuance pass and persist every artifact under `dir`.
///
/// Root first, then the server leaf, then each client in order. The first
/// failure aborts the pass; files already written are left in place but the
/// pass is reported as failed so the trust domain is not used.
///
/// # Errors
///
/// Any issuance or I/O error.
pub fn bootstrap(dir: &Path, plan: &BootstrapPlan, policy: &IssuancePolicy) -> Result<Bootstrapped> {
    let mut ca = CertificateAuthority::issue_root(&plan.ca, policy)?;
    write_pair(dir, CA_ROLE, ca.cert_pem(), ca.key_pem())?;

    let server = ca.issue_leaf(
        &LeafRequest::new(plan.server.clone(), RoleUsage::Server)
            .with_dns_names(plan.server_dns_names.clone()),
    )?;
    write_pair(dir, SERVER_ROLE, server.cert_pem(), &server.key_pem())?;

    let mut clients = Vec::with_capacity(plan.clients.len());
    for client in &plan.clients {
        let issued = ca.issue_leaf(&LeafRequest::new(client.identity.clone(), RoleUsage::Client))?;
        write_pair(dir, &client_role(&client.name), issued.cert_pem(), &issued.key_pem())?;
        clients.push((client.name.clone(), issued));
    }

    info!(
        dir = %dir.display(),
        clients = clients.len(),
        "Bootstrap issuance pass complete"
    );

    Ok(Bootstrapped { ca, server, clients })
}

/// Issue one more leaf under the root persisted in `dir` and write it as `role`.
///
/// # Errors
///
/// Returns [`Error::Config`] if `role` is the root's own role or is not a
/// plain file stem, otherwise an error if the root cannot be reopened or
/// issuance fails.
pub fn issue_additional(
    dir: &Path,
    role: &str,
    request: &LeafRequest,
    policy: &IssuancePolicy,
) -> Result<IssuedCertificate> {
    if role == CA_ROLE {
        return Err(Error::Config(format!(
            "Role '{CA_ROLE}' is reserved for the root; pick another role name"
        )));
    }
    if role.is_empty() || role.contains(['/', '\\']) || role.starts_with('.') {
        return Err(Error::Config(format!("Invalid role name '{role}'")));
    }

    let (ca_cert, ca_key) = read_pair(dir, CA_ROLE)?;
    let mut ca = CertificateAuthority::from_pem(&ca_cert, &ca_key, policy)?;
    let issued = ca.issue_leaf(request)?;
    write_pair(dir, role, issued.cert_pem(), &issued.key_pem())?;
    Ok(issued)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
