//! The hosting platform API: legacy add-on check and certificate registration.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ApiConfig;
use crate::endpoint::EndpointMeta;
use crate::error::{UploadError, UploadResult};

const DEFAULT_VARIANT: &str = "application/vnd.heroku+json; version=3";

#[derive(Debug, Clone, Serialize)]
pub struct CertificateUpload<'a> {
    pub certificate_chain: &'a str,
    pub private_key: &'a str,
}

/// Certificate details as the platform reports them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SslCert {
    #[serde(default)]
    pub cert_domains: Vec<String>,
    pub starts_at: Option<String>,
    pub expires_at: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "ca_signed?")]
    pub ca_signed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CertificateRecord {
    pub cname: String,
    pub ssl_cert: Option<SslCert>,
    /// Field-keyed advisories returned by the platform.
    #[serde(default)]
    pub warnings: BTreeMap<String, Vec<String>>,
}

pub trait Platform {
    /// Whether the app still has the legacy IP-based SSL add-on attached.
    fn has_legacy_addon(&self, app: &str) -> UploadResult<bool>;

    /// Register the chain and key. Called at most once per invocation.
    fn add_certificate(
        &self,
        meta: &EndpointMeta,
        upload: &CertificateUpload<'_>,
    ) -> UploadResult<CertificateRecord>;
}

#[derive(Debug, Deserialize)]
struct Addon {
    addon_service: AddonService,
}

#[derive(Debug, Deserialize)]
struct AddonService {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

pub fn accept_header(variant: &str) -> String {
    format!("{}.{}", DEFAULT_VARIANT, variant)
}

/// Human message for a failed response: the platform's `message` field, or the raw body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

pub struct HerokuApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HerokuApi {
    pub fn new(config: &ApiConfig) -> UploadResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("certs-add/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder, accept: &str) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(ACCEPT, accept)
    }

    fn check(response: Response) -> UploadResult<Response> {
        let status = response.status();
        tracing::debug!(%status, url = %response.url(), "platform response");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text()?;
        Err(UploadError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

impl Platform for HerokuApi {
    fn has_legacy_addon(&self, app: &str) -> UploadResult<bool> {
        let url = format!("{}/apps/{}/addons", self.base_url, app);
        let response = self.authorized(self.client.get(&url), DEFAULT_VARIANT).send()?;
        let addons: Vec<Addon> = Self::check(response)?
            .json()
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        Ok(addons.iter().any(|a| a.addon_service.name == "ssl"))
    }

    fn add_certificate(
        &self,
        meta: &EndpointMeta,
        upload: &CertificateUpload<'_>,
    ) -> UploadResult<CertificateRecord> {
        let url = format!("{}{}", self.base_url, meta.path);
        let accept = accept_header(meta.variant);
        let response = self
            .authorized(self.client.post(&url), &accept)
            .json(upload)
            .send()?;
        Self::check(response)?
            .json()
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }
}
