use crate::error::FetchError;
use crate::firestore::{CardRecord, FirestoreClient};
use crate::utils::http::download_image;
use crate::utils::names::{extension_from_url, sanitize_filename, NameRegistry};
use futures::TryStreamExt;
use std::path::Path;
use tracing::debug;

/// Outcome of one fetch run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    pub saved: usize,
    pub skipped: usize,
}

/// Download the image of every card in `collection` into `output_dir`.
///
/// Documents without a `name` or `image_url` are skipped. The first failing
/// download or write aborts the run; files saved before it stay on disk.
pub async fn download_cards(
    store: &FirestoreClient,
    http: &reqwest::Client,
    collection: &str,
    output_dir: &Path,
) -> Result<FetchReport, FetchError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| FetchError::Write {
            path: output_dir.to_path_buf(),
            source,
        })?;

    println!("Project: {}", store.project_id());
    println!("Collection: {}", collection);
    println!("Output: {}", output_dir.display());

    let documents = store.documents(collection);
    futures::pin_mut!(documents);

    let mut names = NameRegistry::new();
    let mut report = FetchReport::default();

    while let Some(document) = documents.try_next().await? {
        let Some(card) = CardRecord::from_document(&document) else {
            println!("Skipping {}: missing name or image_url", document.id());
            report.skipped += 1;
            continue;
        };

        let base_name = sanitize_filename(card.name);
        let extension = extension_from_url(card.image_url);
        let file_name = names.claim(&base_name, &extension, card.id);
        let destination = output_dir.join(&file_name);

        let size = download_image(http, card.image_url, &destination).await?;
        debug!("{} -> {} ({} bytes)", card.image_url, file_name, size);

        println!("Saved {}", destination.display());
        report.saved += 1;
    }

    println!(
        "\nDone. Saved {} images, skipped {} documents",
        report.saved, report.skipped
    );
    Ok(report)
}
