use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{AddArgs, EndpointKind, ResolveArgs, ResolverArgs};
use crate::error::UsageError;

/// How the chain resolver finds roots and missing intermediates.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub domains: Vec<String>,
    pub ca_file: Option<PathBuf>,
    pub system_roots: bool,
    pub intermediates: Option<PathBuf>,
    pub fetch_aia: bool,
    pub timeout: Duration,
}

impl From<ResolverArgs> for ResolverConfig {
    fn from(args: ResolverArgs) -> Self {
        Self {
            domains: args.domains,
            ca_file: args.ca_file,
            system_roots: !args.no_system_roots,
            intermediates: args.intermediates,
            fetch_aia: !args.no_fetch,
            timeout: Duration::from_secs(args.timeout),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Everything `certs add` needs, fixed once parsed.
#[derive(Debug, Clone)]
pub struct Config {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub bypass: bool,
    pub kind: Option<EndpointKind>,
    pub app: String,
    pub api: ApiConfig,
    pub resolver: ResolverConfig,
}

impl Config {
    pub fn from_add_args(args: AddArgs) -> Result<Self, UsageError> {
        let app = args.app.ok_or(UsageError::Missing("--app"))?;
        let api_key = args.api_key.ok_or(UsageError::Missing("--api-key"))?;
        let resolver = ResolverConfig::from(args.resolver);
        Ok(Self {
            cert_path: args.crt,
            key_path: args.key,
            bypass: args.bypass,
            kind: args.kind,
            app,
            api: ApiConfig {
                base_url: args.api_url,
                api_key,
                timeout: resolver.timeout,
            },
            resolver,
        })
    }
}

/// Configuration of the local-only `certs resolve` command.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub resolver: ResolverConfig,
}

impl From<ResolveArgs> for ResolveConfig {
    fn from(args: ResolveArgs) -> Self {
        Self {
            cert_path: args.crt,
            key_path: args.key,
            output: args.output,
            json: args.json,
            resolver: args.resolver.into(),
        }
    }
}
