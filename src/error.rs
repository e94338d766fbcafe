use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of a fetch run. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read credentials file {}: {source}", .path.display())]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid credentials file {}: {source}", .path.display())]
    CredentialsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token exchange with {url} failed: {reason}")]
    Token { url: String, reason: String },

    #[error("no project id configured; pass --project or set GOOGLE_CLOUD_PROJECT")]
    MissingProject,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for URL: {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
