use crate::error::FetchError;
use std::path::Path;
use std::time::Duration;

/// Timeout applied to every request, image downloads included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Get standard user agent string
pub fn get_user_agent() -> &'static str {
    "CardAssets"
}

/// Build the HTTP client shared by the store client and the image downloads
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(get_user_agent())
        .build()
        .map_err(FetchError::Client)
}

/// Download `url` and write the body to `destination`, overwriting it.
/// Returns the number of bytes written.
pub async fn download_image(
    client: &reqwest::Client,
    url: &str,
    destination: &Path,
) -> Result<usize, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
        });
    }

    let bytes = response.bytes().await.map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
    })?;

    tokio::fs::write(destination, &bytes)
        .await
        .map_err(|source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        })?;

    Ok(bytes.len())
}
