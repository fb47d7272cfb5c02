use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use termcolor::{ColorChoice, StandardStream, WriteColor};

mod chain;
mod cli;
mod config;
mod doctor;
mod endpoint;
mod error;
mod files;
mod platform;
mod print;
mod source;
mod trust;
mod util;

use crate::cli::{Cli, Command};
use crate::config::{Config, ResolveConfig, ResolverConfig};
use crate::doctor::{Doctor, ResolutionResult};
use crate::endpoint::select_endpoint;
use crate::files::load_pair;
use crate::platform::{CertificateUpload, HerokuApi, Platform};
use crate::print::{print_warnings, report_upload};
use crate::source::{AiaSource, BundleSource, IntermediateSource, SourceChain};
use crate::trust::TrustStore;

/// Entry point wiring CLI, chain resolution, upload and reporting.

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certs_add=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let code = usage_exit_code(&err);
        if code == 0 {
            err.exit();
        }
        let _ = err.print();
        std::process::exit(code);
    });

    match cli.command {
        Command::Add(args) => run_add(Config::from_add_args(args)?)?,
        Command::Resolve(args) => run_resolve(ResolveConfig::from(args))?,
    }

    Ok(())
}

/// Help and version requests exit 0; every other argument error is a usage error and exits 1.
fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn build_resolver(config: &ResolverConfig) -> Result<(TrustStore, SourceChain)> {
    let trust = TrustStore::load(config.system_roots, config.ca_file.as_deref())?;
    let mut sources = SourceChain::default();
    if let Some(path) = &config.intermediates {
        sources.push(BundleSource::from_pem_file(path)?);
    }
    if config.fetch_aia {
        sources.push(AiaSource::new(config.timeout)?);
    }
    Ok((trust, sources))
}

fn run_add(config: Config) -> Result<()> {
    let platform = HerokuApi::new(&config.api)?;
    let (trust, sources) = build_resolver(&config.resolver)?;
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    add_certificate(&config, &platform, &trust, &sources, &mut stdout)
}

/// Select the endpoint, load and resolve the files, upload once, report.
/// Every failure before the upload leaves the platform untouched.
fn add_certificate(
    config: &Config,
    platform: &dyn Platform,
    trust: &TrustStore,
    source: &dyn IntermediateSource,
    out: &mut dyn WriteColor,
) -> Result<()> {
    let meta = select_endpoint(&config.app, config.kind, platform)?;
    let raw = load_pair(&config.cert_path, &config.key_path)?;

    let resolved = if config.bypass {
        ResolutionResult::bypass(raw.crt, raw.key)
    } else {
        Doctor::new(trust, source)
            .with_domains(&config.resolver.domains)
            .resolve(&raw.crt, &raw.key)?
    };

    tracing::info!(app = %config.app, kind = ?meta.kind, path = %meta.path, "adding SSL certificate");
    let upload = CertificateUpload {
        certificate_chain: &resolved.pem,
        private_key: &resolved.key,
    };
    write!(out, "Adding SSL certificate to {}... ", config.app)?;
    out.flush()?;
    let record = platform
        .add_certificate(&meta, &upload)
        .with_context(|| format!("Adding SSL certificate to {} failed", config.app))?;
    writeln!(out, "done")?;

    report_upload(out, &config.app, &record, &resolved.pem, &resolved.warnings)
}

fn run_resolve(config: ResolveConfig) -> Result<()> {
    let (trust, sources) = build_resolver(&config.resolver)?;
    let raw = load_pair(&config.cert_path, &config.key_path)?;
    let resolved = Doctor::new(&trust, &sources)
        .with_domains(&config.resolver.domains)
        .resolve(&raw.crt, &raw.key)?;

    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    if config.json {
        writeln!(&mut stdout, "{}", serde_json::to_string_pretty(&resolved)?)?;
        return Ok(());
    }
    match &config.output {
        Some(path) => {
            std::fs::write(path, &resolved.pem)
                .with_context(|| format!("failed to write bundle to {}", path.display()))?;
            writeln!(&mut stdout, "wrote resolved chain to {}", path.display())?;
        }
        None => write!(&mut stdout, "{}", resolved.pem)?,
    }
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    print_warnings(&mut stderr, &resolved.warnings)?;
    Ok(())
}
