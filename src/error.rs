use thiserror::Error;

/// Problems with how the command was invoked. Raised before any network call.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Must pass either --type with either 'endpoint' or 'sni'")]
    AmbiguousType,
    #[error("missing required option: {0}")]
    Missing(&'static str),
    #[error("unable to read {what} file {path}: {source}")]
    Unreadable {
        what: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Fatal failures of the chain resolver. Nothing is uploaded when one of these occurs.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("unable to parse certificate: {0}")]
    Certificate(String),
    #[error("unable to parse private key: {0}")]
    Key(String),
    #[error("private key does not match the public key of certificate {0}")]
    KeyMismatch(String),
    #[error("unable to fetch intermediate certificate for {subject}: {reason}")]
    Fetch { subject: String, reason: String },
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),
}

/// Failures reported by (or while talking to) the hosting platform.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Rejected { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
pub type UploadResult<T> = std::result::Result<T, UploadError>;
