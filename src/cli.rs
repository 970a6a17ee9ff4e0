//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pki_model::RoleUsage;

/// Minimal private PKI and a mutual-TLS client/server pair that trusts it
#[derive(Parser, Debug)]
#[command(name = "mtls-pki")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(long, env = "MTLS_PKI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Certificate directory (overrides `pki.dir`)
    #[arg(long, env = "MTLS_PKI_DIR", global = true)]
    pub dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "MTLS_PKI_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MTLS_PKI_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Issue the root, the server leaf and the client leaves
    Init {
        /// Client short names (overrides the configured plan)
        #[arg(long, value_delimiter = ',')]
        clients: Vec<String>,
    },

    /// Issue one more leaf under the persisted root
    Issue {
        /// Artifact role name, e.g. `client.c` or `server`
        #[arg(long, required = true)]
        role: String,

        /// Subject common name
        #[arg(long, required = true)]
        cn: String,

        /// Extended key usage: client, server or both
        #[arg(long, default_value = "client")]
        usage: RoleUsage,

        /// Subject organisation
        #[arg(long)]
        org: Option<String>,

        /// DNS subject alternative names
        #[arg(long = "dns", value_delimiter = ',')]
        dns_names: Vec<String>,
    },

    /// Run the plaintext and mTLS listeners
    Serve {
        /// Host to bind to
        #[arg(long, env = "MTLS_PKI_HOST")]
        host: Option<String>,

        /// Plaintext port
        #[arg(long)]
        http_port: Option<u16>,

        /// mTLS port
        #[arg(long)]
        https_port: Option<u16>,
    },

    /// GET a URL presenting `client.<name>`
    Client {
        /// Client short name
        #[arg(short = 'c', long = "client")]
        name: Option<String>,

        /// URL to request
        #[arg(long)]
        url: Option<String>,

        /// Send no client certificate
        #[arg(long, conflicts_with = "name")]
        anonymous: bool,
    },

    /// Print the decoded fields of a PEM certificate
    Inspect {
        /// Path to a `.crt` file
        #[arg(required = true)]
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_parses_comma_separated_clients() {
        let cli = Cli::parse_from(["mtls-pki", "init", "--clients", "a,b,c"]);
        match cli.command {
            Command::Init { clients } => assert_eq!(clients, vec!["a", "b", "c"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn issue_parses_usage() {
        let cli = Cli::parse_from([
            "mtls-pki", "issue", "--role", "server2", "--cn", "Server 2", "--usage", "both",
        ]);
        match cli.command {
            Command::Issue { role, usage, .. } => {
                assert_eq!(role, "server2");
                assert_eq!(usage, RoleUsage::Both);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn issue_rejects_unknown_usage() {
        let res = Cli::try_parse_from([
            "mtls-pki", "issue", "--role", "x", "--cn", "x", "--usage", "signing",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn client_short_flag_and_global_options() {
        let cli = Cli::parse_from(["mtls-pki", "client", "-c", "b", "--log-level", "debug"]);
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Client { name, anonymous, .. } => {
                assert_eq!(name.as_deref(), Some("b"));
                assert!(!anonymous);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        // Catches duplicate short flags between global and subcommand args
        Cli::command().debug_assert();
    }

    #[test]
    fn client_short_flag_coexists_with_global_config() {
        let cli = Cli::parse_from([
            "mtls-pki", "client", "-c", "a", "--config", "pki.yaml",
        ]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("pki.yaml")));
        match cli.command {
            Command::Client { name, .. } => assert_eq!(name.as_deref(), Some("a")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn anonymous_conflicts_with_name() {
        assert!(Cli::try_parse_from(["mtls-pki", "client", "-c", "a", "--anonymous"]).is_err());
    }
}
