use anyhow::Result;

use crate::cli::EndpointKind;
use crate::error::UsageError;
use crate::platform::Platform;

/// Where and how a certificate of a given kind is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMeta {
    pub path: String,
    /// Protocol variant pinned in the `Accept` header.
    pub variant: &'static str,
    pub kind: EndpointKind,
}

impl EndpointMeta {
    pub fn for_kind(app: &str, kind: EndpointKind) -> Self {
        match kind {
            EndpointKind::Endpoint => Self {
                path: format!("/apps/{}/ssl-endpoints", app),
                variant: "ssl_cert",
                kind,
            },
            EndpointKind::Sni => Self {
                path: format!("/apps/{}/sni-endpoints", app),
                variant: "sni_ssl_cert",
                kind,
            },
        }
    }
}

/// Pick the endpoint type. An explicit `--type` wins; otherwise SNI, unless the app
/// still carries the legacy SSL add-on, in which case the operator must choose.
pub fn select_endpoint(
    app: &str,
    requested: Option<EndpointKind>,
    platform: &dyn Platform,
) -> Result<EndpointMeta> {
    let kind = match requested {
        Some(kind) => kind,
        None => {
            if platform.has_legacy_addon(app)? {
                return Err(UsageError::AmbiguousType.into());
            }
            EndpointKind::Sni
        }
    };
    tracing::debug!(?kind, app, "selected endpoint type");
    Ok(EndpointMeta::for_kind(app, kind))
}
