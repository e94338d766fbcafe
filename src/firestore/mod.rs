//! Read access to Cloud Firestore collections over its REST API.

use std::path::PathBuf;

pub mod auth;
pub mod client;

pub use auth::Credentials;
pub use client::{Document, FirestoreClient};

/// Production endpoint of the Firestore REST API
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

/// Project assumed when talking to the emulator without `--project`
pub const EMULATOR_PROJECT: &str = "google-cloud-firestore-emulator";

/// How to reach the store: which project, which credentials, or the emulator
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub project_id: Option<String>,
    /// Explicit service-account key; `None` means application default credentials
    pub credentials_path: Option<PathBuf>,
    /// `host:port` of a local emulator (`FIRESTORE_EMULATOR_HOST`)
    pub emulator_host: Option<String>,
}

// One card as stored in the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub image_url: &'a str,
}

impl<'a> CardRecord<'a> {
    /// `None` when `name` or `image_url` is missing, empty, or not a string
    pub fn from_document(document: &'a Document) -> Option<Self> {
        Some(Self {
            id: document.id(),
            name: document.string_field("name")?,
            image_url: document.string_field("image_url")?,
        })
    }
}
