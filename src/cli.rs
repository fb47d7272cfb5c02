use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Top-level CLI with subcommands.
#[derive(Parser, Debug)]
#[command(name = "certs", version, about = "Attach TLS certificates to hosted applications")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add an SSL certificate to an app
    Add(AddArgs),
    /// Resolve and verify a certificate chain locally without uploading it
    Resolve(ResolveArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Legacy IP-based SSL endpoint
    Endpoint,
    /// Server Name Indication
    Sni,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Certificate chain file (PEM)
    #[arg(value_name = "CRT")]
    pub crt: PathBuf,

    /// Private key file (PEM)
    #[arg(value_name = "KEY")]
    pub key: PathBuf,

    /// App to add the certificate to
    #[arg(short = 'a', long = "app", env = "HEROKU_APP")]
    pub app: Option<String>,

    /// Bypass the trust chain completion step
    #[arg(long)]
    pub bypass: bool,

    /// Type to create, either 'sni' or 'endpoint'
    #[arg(long = "type", value_enum)]
    pub kind: Option<EndpointKind>,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// API token for the hosting platform
    #[arg(long = "api-key", env = "HEROKU_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the hosting platform API
    #[arg(long = "api-url", env = "HEROKU_API_URL", default_value = "https://api.heroku.com")]
    pub api_url: String,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Certificate chain file (PEM)
    #[arg(value_name = "CRT")]
    pub crt: PathBuf,

    /// Private key file (PEM)
    #[arg(value_name = "KEY")]
    pub key: PathBuf,

    #[command(flatten)]
    pub resolver: ResolverArgs,

    /// Write the resolved chain here instead of standard output
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Print the resolution result (chain, key, warnings) as JSON
    #[arg(long, conflicts_with = "output")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResolverArgs {
    /// Domain the certificate must cover (repeatable)
    #[arg(short = 'd', long = "domain")]
    pub domains: Vec<String>,

    /// Extra trusted root certificates (PEM bundle)
    #[arg(long = "ca-file")]
    pub ca_file: Option<PathBuf>,

    /// Trust only the roots in --ca-file, not the system trust store
    #[arg(long = "no-system-roots", requires = "ca_file")]
    pub no_system_roots: bool,

    /// Known intermediate certificates consulted before fetching (PEM bundle)
    #[arg(long = "intermediates")]
    pub intermediates: Option<PathBuf>,

    /// Do not fetch missing intermediates from AIA caIssuers URLs
    #[arg(long = "no-fetch")]
    pub no_fetch: bool,

    /// Network timeout in seconds
    #[arg(long = "timeout", default_value_t = 15)]
    pub timeout: u64,
}
