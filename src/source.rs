use anyhow::{bail, Context, Result};
use openssl::x509::{X509Ref, X509};
use reqwest::blocking::Client;
use std::path::Path;
use std::time::Duration;
use x509_parser::prelude::*;

/// Somewhere missing intermediate certificates can be looked up.
///
/// `Ok(None)` means the source has nothing for this certificate; `Err` means the
/// source itself could not be reached and resolution must stop.
pub trait IntermediateSource {
    fn find_issuer(&self, cert: &X509Ref) -> Result<Option<X509>>;
}

/// True when `candidate` carries `cert`'s issuer name and its key verifies `cert`'s signature.
pub fn is_issuer_of(candidate: &X509Ref, cert: &X509Ref) -> bool {
    let names_match = candidate.subject_name().to_der().ok() == cert.issuer_name().to_der().ok();
    names_match
        && candidate
            .public_key()
            .and_then(|pk| cert.verify(&pk))
            .unwrap_or(false)
}

/// A fixed set of known intermediates held in memory.
pub struct BundleSource {
    certs: Vec<X509>,
}

impl BundleSource {
    pub fn new(certs: Vec<X509>) -> Self {
        Self { certs }
    }

    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read intermediates from {}", path.display()))?;
        let certs = X509::stack_from_pem(&data)
            .with_context(|| format!("failed to parse intermediates from {}", path.display()))?;
        Ok(Self::new(certs))
    }
}

impl IntermediateSource for BundleSource {
    fn find_issuer(&self, cert: &X509Ref) -> Result<Option<X509>> {
        Ok(self.certs.iter().find(|c| is_issuer_of(c, cert)).cloned())
    }
}

/// Follows AIA caIssuers URIs to fetch the issuing certificate online.
pub struct AiaSource {
    client: Client,
}

impl AiaSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("certs-add/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    fn fetch(&self, url: &str) -> Result<Vec<X509>> {
        let resp = self.client.get(url).send().with_context(|| format!("GET {} failed", url))?;
        if !resp.status().is_success() {
            bail!("{}: HTTP {}", url, resp.status());
        }
        let bytes = resp.bytes()?.to_vec();
        parse_der_or_pem(&bytes).with_context(|| format!("unrecognized certificate format from {}", url))
    }
}

impl IntermediateSource for AiaSource {
    fn find_issuer(&self, cert: &X509Ref) -> Result<Option<X509>> {
        let urls = aia_ca_issuers_urls(cert);
        let mut last_err = None;
        let mut reached = false;
        for url in urls {
            tracing::debug!(%url, "fetching issuer certificate");
            match self.fetch(&url) {
                Ok(candidates) => {
                    reached = true;
                    if let Some(found) = candidates.into_iter().find(|c| is_issuer_of(c, cert)) {
                        return Ok(Some(found));
                    }
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "issuer fetch failed");
                    last_err = Some(e);
                }
            }
        }
        match last_err {
            Some(e) if !reached => Err(e),
            _ => Ok(None),
        }
    }
}

/// Tries each source in order and returns the first hit.
#[derive(Default)]
pub struct SourceChain {
    sources: Vec<Box<dyn IntermediateSource>>,
}

impl SourceChain {
    pub fn push(&mut self, source: impl IntermediateSource + 'static) {
        self.sources.push(Box::new(source));
    }
}

impl IntermediateSource for SourceChain {
    fn find_issuer(&self, cert: &X509Ref) -> Result<Option<X509>> {
        for source in &self.sources {
            if let Some(found) = source.find_issuer(cert)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

fn parse_der_or_pem(bytes: &[u8]) -> Result<Vec<X509>> {
    if let Ok(cert) = X509::from_der(bytes) {
        return Ok(vec![cert]);
    }
    let stack = X509::stack_from_pem(bytes)?;
    if stack.is_empty() {
        bail!("no certificates in payload");
    }
    Ok(stack)
}

fn aia_ca_issuers_urls(cert: &X509Ref) -> Vec<String> {
    // Use x509-parser for robust AIA parsing
    let der = match cert.to_der() { Ok(d) => d, Err(_) => return vec![] };
    let Ok((_, parsed)) = X509Certificate::from_der(&der) else { return vec![] };
    let mut urls = Vec::new();
    for ext in parsed.extensions() {
        if let ParsedExtension::AuthorityInfoAccess(aia) = ext.parsed_extension() {
            for ad in &aia.accessdescs {
                // 1.3.6.1.5.5.7.48.2 = id-ad-caIssuers
                if ad.access_method.to_id_string() == "1.3.6.1.5.5.7.48.2" {
                    if let GeneralName::URI(uri) = &ad.access_location {
                        urls.push(uri.to_string());
                    }
                }
            }
        }
    }
    urls
}
