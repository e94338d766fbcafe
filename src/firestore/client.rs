use super::auth::{metadata_project_id, Credentials, METADATA_BASE_URL};
use super::{StoreConfig, EMULATOR_PROJECT, FIRESTORE_BASE_URL};
use crate::error::FetchError;
use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const PAGE_SIZE: u32 = 300;

/// A Firestore document as returned by the REST API
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// Full resource name, `projects/../documents/<collection>/<id>`
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Non-empty string value of `field`
    pub fn string_field(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)?
            .get("stringValue")?
            .as_str()
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    #[serde(default)]
    pub documents: Vec<Document>,
    pub next_page_token: Option<String>,
}

enum PageCursor {
    First,
    Next(String),
    Done,
}

pub struct FirestoreClient {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    credentials: Credentials,
    // Fetched on the first request, then reused for the rest of the run
    token: OnceCell<String>,
}

impl FirestoreClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            credentials,
            token: OnceCell::new(),
        }
    }

    /// Resolve credentials and project from `config`. Key files are read here,
    /// before any query; tokens are requested lazily.
    pub async fn connect(http: reqwest::Client, config: &StoreConfig) -> Result<Self, FetchError> {
        if let Some(host) = &config.emulator_host {
            let project_id = config
                .project_id
                .clone()
                .unwrap_or_else(|| EMULATOR_PROJECT.to_string());
            info!("Using Firestore emulator at {} ({})", host, project_id);
            return Ok(Self::new(
                http,
                format!("http://{host}"),
                project_id,
                Credentials::Emulator,
            ));
        }

        let credentials = match &config.credentials_path {
            Some(path) => Credentials::from_file(path)?,
            None => Credentials::discover()?,
        };
        let project_id = resolve_project(
            &http,
            config.project_id.as_deref(),
            &credentials,
            METADATA_BASE_URL,
        )
        .await?;

        info!("Using Firestore project {}", project_id);
        Ok(Self::new(http, FIRESTORE_BASE_URL, project_id, credentials))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.base_url, self.project_id, collection
        )
    }

    async fn bearer_token(&self) -> Result<&str, FetchError> {
        let token = self
            .token
            .get_or_try_init(|| self.credentials.access_token(&self.http))
            .await?;
        Ok(token.as_str())
    }

    /// Fetch one page of `collection`, limited to the fields cards use
    pub async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<DocumentPage, FetchError> {
        let url = self.collection_url(collection);
        let token = self.bearer_token().await?;

        let mut query = vec![
            ("pageSize", PAGE_SIZE.to_string()),
            ("mask.fieldPaths", "name".to_string()),
            ("mask.fieldPaths", "image_url".to_string()),
        ];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }

        debug!("Listing {} (page token: {:?})", url, page_token);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&query)
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

        response
            .json()
            .await
            .map_err(|source| FetchError::Http { url, source })
    }

    /// Every document of `collection`, following page tokens until exhausted
    pub fn documents<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Stream<Item = Result<Document, FetchError>> + 'a {
        stream::try_unfold(PageCursor::First, move |cursor| async move {
            let page_token = match cursor {
                PageCursor::Done => return Ok(None),
                PageCursor::First => None,
                PageCursor::Next(token) => Some(token),
            };

            let page = self.list_page(collection, page_token.as_deref()).await?;
            debug!("Received {} documents", page.documents.len());
            let next = match page.next_page_token {
                Some(token) if !token.is_empty() => PageCursor::Next(token),
                _ => PageCursor::Done,
            };

            let documents = stream::iter(
                page.documents
                    .into_iter()
                    .map(Ok::<Document, FetchError>),
            );
            Ok::<_, FetchError>(Some((documents, next)))
        })
        .try_flatten()
    }
}

/// Explicit project, then the one named by the credentials, then the one the
/// metadata server reports when running on Google Cloud.
async fn resolve_project(
    http: &reqwest::Client,
    explicit: Option<&str>,
    credentials: &Credentials,
    metadata_base: &str,
) -> Result<String, FetchError> {
    if let Some(project_id) = explicit.or_else(|| credentials.project_id()) {
        return Ok(project_id.to_string());
    }

    if !matches!(credentials, Credentials::Metadata) {
        return Err(FetchError::MissingProject);
    }
    metadata_project_id(http, metadata_base)
        .await
        .map_err(|e| {
            warn!("Metadata server did not report a project: {}", e);
            FetchError::MissingProject
        })
}
