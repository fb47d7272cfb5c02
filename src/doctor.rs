//! Chain resolution: turns a possibly incomplete, possibly misordered bundle and its
//! private key into a verified leaf-first chain, collecting non-fatal warnings.

use openssl::asn1::Asn1Time;
use openssl::nid::Nid;
use openssl::pkey::{Id as KeyId, PKey, Private};
use openssl::x509::{X509Ref, X509};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::chain::order_chain_leaf_to_root;
use crate::error::{ResolveError, ResolveResult};
use crate::source::{is_issuer_of, IntermediateSource};
use crate::trust::{TrustStore, Verdict};
use crate::util::{cert_label, dns_names, format_name_human, hostname_matches, is_self_issued};

const MAX_FETCHES: usize = 16;
const MIN_RSA_BITS: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Duplicate,
    Unrelated,
    Misordered,
    IncompleteChain,
    UntrustedRoot,
    Expired,
    NotYetValid,
    WeakSignature,
    WeakKey,
    DomainMismatch,
    Verification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What gets uploaded: chain text, key text and anything worth telling the operator.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionResult {
    pub pem: String,
    pub key: String,
    pub warnings: Vec<Warning>,
}

impl ResolutionResult {
    /// Operator-asserted bundle: the raw file contents, untouched.
    pub fn bypass(crt: String, key: String) -> Self {
        Self { pem: crt, key, warnings: Vec::new() }
    }
}

pub struct Doctor<'a> {
    trust: &'a TrustStore,
    source: &'a dyn IntermediateSource,
    domains: &'a [String],
}

impl<'a> Doctor<'a> {
    pub fn new(trust: &'a TrustStore, source: &'a dyn IntermediateSource) -> Self {
        Self { trust, source, domains: &[] }
    }

    /// Domains the leaf is expected to cover; uncovered ones become warnings.
    pub fn with_domains(mut self, domains: &'a [String]) -> Self {
        self.domains = domains;
        self
    }

    pub fn resolve(&self, crt: &str, key: &str) -> ResolveResult<ResolutionResult> {
        let certs = X509::stack_from_pem(crt.as_bytes())
            .map_err(|e| ResolveError::Certificate(e.to_string()))?;
        if certs.is_empty() {
            return Err(ResolveError::Certificate("no PEM certificate found".to_string()));
        }
        let pkey = PKey::private_key_from_pem(key.as_bytes())
            .map_err(|e| ResolveError::Key(e.to_string()))?;

        let mut warnings = Vec::new();
        let ordered = order_chain_leaf_to_root(&certs, Some(&pkey));
        for dup in &ordered.duplicates {
            warnings.push(Warning::new(
                WarningKind::Duplicate,
                format!("certificate {} appears more than once; duplicate removed", cert_label(dup)),
            ));
        }
        if ordered.reordered {
            warnings.push(Warning::new(
                WarningKind::Misordered,
                "certificates were not in leaf-to-root order and have been reordered",
            ));
        }

        let mut chain = ordered.chain;
        let mut spare = ordered.unrelated;
        check_key(&chain[0], &pkey)?;
        self.complete(&mut chain, &mut spare, &mut warnings)?;
        for other in &spare {
            warnings.push(Warning::new(
                WarningKind::Unrelated,
                format!("certificate {} is not part of the chain and was removed", cert_label(other)),
            ));
        }

        warnings.extend(validity_warnings(&chain)?);
        warnings.extend(weakness_warnings(&chain)?);
        warnings.extend(domain_warnings(&chain[0], self.domains));

        let mut pem = String::new();
        for cert in &chain {
            pem.push_str(&pem_string(&cert.to_pem()?));
        }
        let key = pem_string(&pkey.private_key_to_pem_pkcs8()?);
        tracing::info!(certificates = chain.len(), warnings = warnings.len(), "chain resolved");
        Ok(ResolutionResult { pem, key, warnings })
    }

    // Verify, fetch the missing issuer of the last certificate, repeat. Supplied
    // certificates left off the path (`spare`) rejoin it once a gap above them is filled.
    fn complete(
        &self,
        chain: &mut Vec<X509>,
        spare: &mut Vec<X509>,
        warnings: &mut Vec<Warning>,
    ) -> ResolveResult<()> {
        let mut fetched = 0;
        loop {
            attach_supplied(chain, spare);
            let verdict = self
                .trust
                .verify(chain.as_slice())
                .map_err(|e| ResolveError::Certificate(format!("path validation failed: {:#}", e)))?;
            tracing::debug!(?verdict, length = chain.len(), "path validation");
            match verdict {
                Verdict::Trusted | Verdict::OutsideValidity => return Ok(()),
                Verdict::UntrustedRoot(subject) => {
                    warnings.push(Warning::new(
                        WarningKind::UntrustedRoot,
                        format!("chain ends at {}, which is not a trusted root", subject),
                    ));
                    return Ok(());
                }
                Verdict::Failed(msg) => {
                    warnings.push(Warning::new(WarningKind::Verification, msg));
                    return Ok(());
                }
                Verdict::MissingIssuer => {}
            }

            let Some(last) = chain.last().cloned() else { return Ok(()) };
            if is_self_issued(&last) || fetched >= MAX_FETCHES {
                warnings.push(incomplete(&last));
                return Ok(());
            }
            let found = self.source.find_issuer(&last).map_err(|e| ResolveError::Fetch {
                subject: cert_label(&last),
                reason: format!("{:#}", e),
            })?;
            match found {
                Some(root) if is_self_issued(&root) => {
                    warnings.push(Warning::new(
                        WarningKind::UntrustedRoot,
                        format!(
                            "chain ends at {}, which is not a trusted root",
                            format_name_human(root.subject_name())
                        ),
                    ));
                    return Ok(());
                }
                Some(issuer) if !chain.iter().any(|c| same_cert(c, &issuer)) => {
                    tracing::info!(issuer = %cert_label(&issuer), "added missing intermediate");
                    chain.push(issuer);
                    fetched += 1;
                }
                _ => {
                    warnings.push(incomplete(&last));
                    return Ok(());
                }
            }
        }
    }
}

fn attach_supplied(chain: &mut Vec<X509>, spare: &mut Vec<X509>) {
    while let Some(last) = chain.last() {
        if is_self_issued(last) {
            return;
        }
        let Some(pos) = spare.iter().position(|c| is_issuer_of(c, last)) else { return };
        chain.push(spare.remove(pos));
    }
}

fn incomplete(last: &X509Ref) -> Warning {
    let issuer = crate::util::issuer_cn(last)
        .map(|cn| format!("CN={}", cn))
        .unwrap_or_else(|| format_name_human(last.issuer_name()));
    Warning::new(
        WarningKind::IncompleteChain,
        format!("chain incomplete: missing issuer {}", issuer),
    )
}

fn same_cert(a: &X509Ref, b: &X509Ref) -> bool {
    a.to_der().ok() == b.to_der().ok()
}

fn pem_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn check_key(leaf: &X509Ref, key: &PKey<Private>) -> ResolveResult<()> {
    let public = leaf.public_key()?;
    if public.public_eq(key) {
        Ok(())
    } else {
        Err(ResolveError::KeyMismatch(cert_label(leaf)))
    }
}

fn validity_warnings(chain: &[X509]) -> ResolveResult<Vec<Warning>> {
    let now = Asn1Time::days_from_now(0)?;
    let mut out = Vec::new();
    for cert in chain {
        if cert.not_after().compare(&now)? == Ordering::Less {
            out.push(Warning::new(
                WarningKind::Expired,
                format!("certificate {} expired on {}", cert_label(cert), cert.not_after()),
            ));
        }
        if cert.not_before().compare(&now)? == Ordering::Greater {
            out.push(Warning::new(
                WarningKind::NotYetValid,
                format!("certificate {} is not valid until {}", cert_label(cert), cert.not_before()),
            ));
        }
    }
    Ok(out)
}

fn weakness_warnings(chain: &[X509]) -> ResolveResult<Vec<Warning>> {
    let mut out = Vec::new();
    for cert in chain.iter().filter(|c| !is_self_issued(c)) {
        let nid = cert.signature_algorithm().object().nid();
        if matches!(
            nid,
            Nid::MD5WITHRSAENCRYPTION | Nid::SHA1WITHRSAENCRYPTION | Nid::ECDSA_WITH_SHA1 | Nid::DSAWITHSHA1
        ) {
            let alg = nid.long_name().unwrap_or("unknown");
            out.push(Warning::new(
                WarningKind::WeakSignature,
                format!("certificate {} is signed with weak algorithm {}", cert_label(cert), alg),
            ));
        }
    }
    if let Some(leaf) = chain.first() {
        let pk = leaf.public_key()?;
        if pk.id() == KeyId::RSA && pk.bits() < MIN_RSA_BITS {
            out.push(Warning::new(
                WarningKind::WeakKey,
                format!("certificate {} uses a {}-bit RSA key", cert_label(leaf), pk.bits()),
            ));
        }
    }
    Ok(out)
}

fn domain_warnings(leaf: &X509Ref, domains: &[String]) -> Vec<Warning> {
    let names = dns_names(leaf);
    domains
        .iter()
        .filter(|d| !names.iter().any(|n| hostname_matches(n, d)))
        .map(|d| {
            Warning::new(
                WarningKind::DomainMismatch,
                format!("certificate {} does not cover domain {}", cert_label(leaf), d),
            )
        })
        .collect()
}
