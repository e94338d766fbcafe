//! Google credentials and OAuth access tokens for the Firestore REST API.

use crate::error::FetchError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Root of the GCE / Cloud Run metadata server API
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

const METADATA_TOKEN_PATH: &str = "/instance/service-accounts/default/token";
const METADATA_PROJECT_PATH: &str = "/project/project-id";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const EMULATOR_TOKEN: &str = "owner";
const TOKEN_LIFETIME_SECS: u64 = 3600;

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccountKey {
    fn encoding_key(&self) -> Result<EncodingKey, FetchError> {
        Ok(EncodingKey::from_rsa_pem(self.private_key.as_bytes())?)
    }

    /// RS256 JWT asserting this account's identity to its token endpoint
    fn signed_assertion(&self, issued_at: u64) -> Result<String, FetchError> {
        let claims = JwtClaims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };
        Ok(encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key()?,
        )?)
    }
}

/// gcloud user credentials, as written by `gcloud auth application-default login`
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub quota_project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("quota_project_id", &self.quota_project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Where access tokens come from
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    /// GCE / Cloud Run metadata server
    Metadata,
    /// Local Firestore emulator, which accepts a fixed bearer token
    Emulator,
}

impl Credentials {
    /// Load a key file. Service-account keys are checked for a usable private
    /// key here so a bad file fails before any query is made.
    pub fn from_file(path: &Path) -> Result<Self, FetchError> {
        let raw = fs::read_to_string(path).map_err(|source| FetchError::CredentialsRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: CredentialsFile =
            serde_json::from_str(&raw).map_err(|source| FetchError::CredentialsParse {
                path: path.to_path_buf(),
                source,
            })?;

        let credentials = match parsed {
            CredentialsFile::ServiceAccount(key) => {
                key.encoding_key()?;
                info!("Loaded service account {}", key.client_email);
                Self::ServiceAccount(key)
            }
            CredentialsFile::AuthorizedUser(user) => {
                info!("Loaded authorized user credentials");
                Self::AuthorizedUser(user)
            }
        };
        Ok(credentials)
    }

    /// Application default credentials: `GOOGLE_APPLICATION_CREDENTIALS`, then
    /// the gcloud well-known file, then the metadata server.
    pub fn discover() -> Result<Self, FetchError> {
        Self::discover_with(|key| std::env::var(key).ok(), dirs::config_dir())
    }

    fn discover_with(
        env: impl Fn(&str) -> Option<String>,
        config_dir: Option<PathBuf>,
    ) -> Result<Self, FetchError> {
        let env = |key: &str| env(key).filter(|value| !value.is_empty());

        if let Some(path) = env("GOOGLE_APPLICATION_CREDENTIALS") {
            info!("Using GOOGLE_APPLICATION_CREDENTIALS: {}", path);
            return Self::from_file(Path::new(&path));
        }

        let gcloud_dir = env("CLOUDSDK_CONFIG")
            .map(PathBuf::from)
            .or_else(|| config_dir.map(|dir| dir.join("gcloud")));
        if let Some(well_known) = gcloud_dir
            .map(|dir| dir.join("application_default_credentials.json"))
            .filter(|path| path.is_file())
        {
            info!("Using gcloud credentials: {}", well_known.display());
            return Self::from_file(&well_known);
        }

        info!("No credentials file found, using the metadata server");
        Ok(Self::Metadata)
    }

    /// Project the credentials belong to, if they name one
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::ServiceAccount(key) => key.project_id.as_deref(),
            Self::AuthorizedUser(user) => user.quota_project_id.as_deref(),
            Self::Metadata | Self::Emulator => None,
        }
    }

    /// Obtain a bearer token for the Firestore API
    pub async fn access_token(&self, client: &reqwest::Client) -> Result<String, FetchError> {
        match self {
            Self::Emulator => Ok(EMULATOR_TOKEN.to_string()),
            Self::ServiceAccount(key) => {
                debug!("Exchanging signed assertion at {}", key.token_uri);
                let assertion = key.signed_assertion(unix_now())?;
                let request = client.post(&key.token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ]);
                exchange(request, &key.token_uri).await
            }
            Self::AuthorizedUser(user) => {
                debug!("Refreshing user token at {}", user.token_uri);
                let request = client.post(&user.token_uri).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ]);
                exchange(request, &user.token_uri).await
            }
            Self::Metadata => {
                debug!("Requesting token from the metadata server");
                let url = format!("{METADATA_BASE_URL}{METADATA_TOKEN_PATH}");
                let request = client.get(&url).header("Metadata-Flavor", "Google");
                exchange(request, &url).await
            }
        }
    }
}

/// Project the metadata server at `base_url` reports for this instance
pub async fn metadata_project_id(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<String, FetchError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), METADATA_PROJECT_PATH);
    debug!("Asking the metadata server for the project: {}", url);

    let response = client
        .get(&url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: url.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status { url, status });
    }

    let body = response
        .text()
        .await
        .map_err(|source| FetchError::Http { url, source })?;
    let project_id = body.trim();
    if project_id.is_empty() {
        return Err(FetchError::MissingProject);
    }
    Ok(project_id.to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

async fn exchange(request: reqwest::RequestBuilder, url: &str) -> Result<String, FetchError> {
    let response = request.send().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::Token {
            url: url.to_string(),
            reason: format!("HTTP {}: {}", status, body.trim()),
        });
    }

    let token: TokenResponse = response.json().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(token.access_token)
}
