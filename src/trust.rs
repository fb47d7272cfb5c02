use anyhow::{Context, Result};
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509, X509StoreContext};
use std::path::Path;

use crate::util::format_name_human;

// Raw X509_V_ERR_* codes the resolver reacts to.
const ERR_UNABLE_TO_GET_ISSUER_CERT: i32 = 2;
const ERR_CERT_NOT_YET_VALID: i32 = 9;
const ERR_CERT_HAS_EXPIRED: i32 = 10;
const ERR_DEPTH_ZERO_SELF_SIGNED_CERT: i32 = 18;
const ERR_SELF_SIGNED_CERT_IN_CHAIN: i32 = 19;
const ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY: i32 = 20;
const ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE: i32 = 21;

/// Outcome of one path validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Trusted,
    /// The issuer of some certificate is neither supplied nor a trust anchor.
    MissingIssuer,
    /// The path ends in a self-signed certificate the store does not trust.
    UntrustedRoot(String),
    /// Validity window failure; reported separately by the resolver.
    OutsideValidity,
    Failed(String),
}

/// Roots the resolved path must terminate at.
pub struct TrustStore {
    store: X509Store,
}

impl TrustStore {
    /// `extra_roots` on top of OpenSSL's default CA locations (system trust store),
    /// or on their own when `system` is false.
    pub fn new(system: bool, extra_roots: &[X509]) -> Result<Self> {
        let mut builder = X509StoreBuilder::new()?;
        if system {
            builder.set_default_paths()?;
        }
        for root in extra_roots {
            builder.add_cert(root.clone())?;
        }
        Ok(Self { store: builder.build() })
    }

    pub fn load(system: bool, ca_file: Option<&Path>) -> Result<Self> {
        let roots = match ca_file {
            Some(path) => {
                let data = std::fs::read(path)
                    .with_context(|| format!("failed to read CA file {}", path.display()))?;
                X509::stack_from_pem(&data)
                    .with_context(|| format!("failed to parse CA file {}", path.display()))?
            }
            None => Vec::new(),
        };
        Self::new(system, &roots)
    }

    /// Validate `chain` (leaf first) against the store.
    pub fn verify(&self, chain: &[X509]) -> Result<Verdict> {
        let Some((leaf, rest)) = chain.split_first() else {
            return Ok(Verdict::Failed("empty chain".to_string()));
        };
        let mut stack: Stack<X509> = Stack::new()?;
        for c in rest { stack.push(c.clone())?; }

        let mut ctx = X509StoreContext::new()?;
        let outcome = ctx.init(&self.store, leaf, &stack, |c| {
            let ok = c.verify_cert()?;
            if ok {
                return Ok(Verdict::Trusted);
            }
            let subject = c
                .current_cert()
                .map(|cc| format_name_human(cc.subject_name()))
                .unwrap_or_else(|| "<unknown certificate>".to_string());
            let err = c.error();
            let verdict = match err.as_raw() {
                ERR_UNABLE_TO_GET_ISSUER_CERT
                | ERR_UNABLE_TO_GET_ISSUER_CERT_LOCALLY
                | ERR_UNABLE_TO_VERIFY_LEAF_SIGNATURE => Verdict::MissingIssuer,
                ERR_DEPTH_ZERO_SELF_SIGNED_CERT | ERR_SELF_SIGNED_CERT_IN_CHAIN => {
                    Verdict::UntrustedRoot(subject)
                }
                ERR_CERT_NOT_YET_VALID | ERR_CERT_HAS_EXPIRED => Verdict::OutsideValidity,
                _ => Verdict::Failed(format!(
                    "{} (depth {} on {})",
                    err.error_string(),
                    c.error_depth(),
                    subject
                )),
            };
            Ok(verdict)
        })?;
        Ok(outcome)
    }
}
