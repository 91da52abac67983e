// Dataset retrieval: a remote URL over HTTP or a local file.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use hometown_core::dataset::{self, DatasetError, DatasetFormat, PlayerRecord};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the dataset lives. Anything starting with `http://` or `https://`
/// is fetched; everything else is treated as a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Url(String),
    Path(PathBuf),
}

impl DatasetSource {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DatasetSource::Url(trimmed.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(trimmed))
        }
    }

    pub fn format(&self) -> DatasetFormat {
        match self {
            DatasetSource::Url(url) => DatasetFormat::from_name(url),
            DatasetSource::Path(path) => DatasetFormat::from_name(&path.to_string_lossy()),
        }
    }
}

impl std::fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetSource::Url(url) => f.write_str(url),
            DatasetSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to fetch dataset from {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

async fn fetch_url(url: &str) -> Result<String, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

/// Retrieve and parse the dataset.
pub async fn fetch_dataset(source: &DatasetSource) -> Result<Vec<PlayerRecord>, FetchError> {
    let text = match source {
        DatasetSource::Url(url) => fetch_url(url).await.map_err(|source| FetchError::Http {
            url: url.clone(),
            source,
        })?,
        DatasetSource::Path(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| FetchError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    let records = dataset::parse(&text, source.format())?;
    info!("Loaded {} player records from {}", records.len(), source);
    Ok(records)
}
