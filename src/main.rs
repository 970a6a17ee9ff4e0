//! mtls-pki - private PKI bootstrap and mutual-TLS hello-world
//!
//! `init` issues a root and its leaves, `serve` runs the plaintext and mTLS
//! listeners, `client` calls them with a client identity.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mtls_pki::{
    Result,
    cli::{Cli, Command},
    client::MtlsClient,
    config::Config,
    pki::{CertificateInfo, LeafRequest, bootstrap, issue_additional},
    server::MtlsServer,
    setup_tracing,
};
use pki_model::{Identity, RoleUsage};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Load configuration
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = cli.dir {
        config.pki.dir = dir;
    }

    let result = match cli.command {
        Command::Init { clients } => run_init(config, &clients),
        Command::Issue {
            role,
            cn,
            usage,
            org,
            dns_names,
        } => run_issue(&config, &role, &cn, usage, org, dns_names),
        Command::Serve {
            host,
            http_port,
            https_port,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = http_port {
                config.server.http_port = port;
            }
            if let Some(port) = https_port {
                config.server.https_port = port;
            }
            run_server(&config).await
        }
        Command::Client {
            name,
            url,
            anonymous,
        } => {
            let name = (!anonymous).then(|| name.unwrap_or_else(|| config.client.name.clone()));
            let url = url.unwrap_or_else(|| config.client.url.clone());
            run_client(&config, name.as_deref(), &url).await
        }
        Command::Inspect { file } => run_inspect(&file),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = e.kind(), "{e}");
            ExitCode::FAILURE
        }
    }
}

/// Run the bootstrap issuance pass
fn run_init(mut config: Config, clients: &[String]) -> Result<()> {
    if !clients.is_empty() {
        config.pki.plan = config.pki.plan.with_client_names(clients);
    }

    let out = bootstrap(&config.pki.dir, &config.pki.plan, &config.pki.policy)?;

    println!("✅ Trust domain written to {}", config.pki.dir.display());
    println!("   ca       serial {}", out.ca.serial());
    println!("   server   serial {}", out.server.serial);
    for (name, issued) in &out.clients {
        println!("   client.{name} serial {}", issued.serial);
    }
    Ok(())
}

/// Issue one more leaf under the persisted root
fn run_issue(
    config: &Config,
    role: &str,
    cn: &str,
    usage: RoleUsage,
    org: Option<String>,
    dns_names: Vec<String>,
) -> Result<()> {
    let mut identity = Identity::new(cn);
    identity.organization = org;

    let mut request = LeafRequest::new(identity, usage);
    if !dns_names.is_empty() {
        request = request.with_dns_names(dns_names);
    }

    let issued = issue_additional(&config.pki.dir, role, &request, &config.pki.policy)?;
    println!(
        "✅ {role} ({usage}) serial {} written to {}",
        issued.serial,
        config.pki.dir.display()
    );
    Ok(())
}

/// Run both listeners until a signal or a fatal listener error
async fn run_server(config: &Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        http_port = config.server.http_port,
        https_port = config.server.https_port,
        ca_cert = %config.ca_cert_path().display(),
        "Starting mtls-pki server"
    );

    MtlsServer::from_config(config)?.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// GET `url`, print the body
async fn run_client(config: &Config, name: Option<&str>, url: &str) -> Result<()> {
    let trust = config.trust_store()?;
    let identity = name.map(|n| config.client_identity(n)).transpose()?;
    let client = MtlsClient::new(
        &trust,
        identity.as_ref(),
        config.client.timeout,
        &config.tls_policy(),
    )?;

    let response = client.get(url).await?;
    print!("{}", response.body);
    if (200..300).contains(&response.status) {
        Ok(())
    } else {
        Err(mtls_pki::Error::Transport(format!(
            "{url} returned HTTP {}",
            response.status
        )))
    }
}

/// Print the decoded fields of a certificate file
fn run_inspect(path: &Path) -> Result<()> {
    let pem = std::fs::read(path)?;
    let info = CertificateInfo::from_pem(&pem)?;

    println!("Subject:     {}", info.subject);
    println!("Issuer:      {}", info.issuer);
    println!("Serial:      {}", info.serial);
    println!("Not before:  {}", info.not_before);
    println!("Not after:   {}", info.not_after);
    println!("CA:          {}", info.is_ca);
    println!("Self-issued: {}", info.self_issued);
    println!(
        "Key usage:   digitalSignature={} keyCertSign={}",
        info.key_usage.digital_signature, info.key_usage.key_cert_sign
    );
    println!(
        "Ext usage:   clientAuth={} serverAuth={}",
        info.ext_key_usage.client_auth, info.ext_key_usage.server_auth
    );
    if !info.dns_names.is_empty() {
        println!("DNS names:   {}", info.dns_names.join(", "));
    }
    Ok(())
}
