// Application state and the top-level run sequence.
//
// The directory is built once and never mutated afterwards. Enrichment runs
// as a background task; its results are merged into the view when it
// finishes, and the view is written out both before and after the merge so
// the page has something to render while lookups are in flight.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use hometown_core::config::Config;
use hometown_core::pipeline::{build_directory, CityDirectory, PipelineOptions};
use hometown_places::{enrich_cities, CityEnrichment, Geocoder, MapsClient, PlaceFinder, PlaceQuery};

use crate::fetch::{fetch_dataset, DatasetSource};
use crate::present::{self, MapView};

/// Everything the running app owns.
pub struct AppState<S = MapsClient> {
    pub config: Config,
    pub directory: Arc<CityDirectory>,
    pub maps: Arc<S>,
    pub view: MapView,
}

impl<S> AppState<S>
where
    S: Geocoder + PlaceFinder + 'static,
{
    pub fn new(config: Config, directory: CityDirectory, maps: Arc<S>) -> Self {
        let view = present::build_view(&directory, &config, Utc::now());
        AppState {
            config,
            directory: Arc::new(directory),
            maps,
            view,
        }
    }

    /// Spawn enrichment for every city in the background.
    pub fn spawn_enrichment(&self) -> JoinHandle<Vec<CityEnrichment>> {
        let keys: Vec<_> = self.directory.cities.keys().cloned().collect();
        let query = PlaceQuery::from_config(&self.config.enrichment);
        tokio::spawn(enrich_cities(Arc::clone(&self.maps), keys, query))
    }

    pub fn apply_enrichment(&mut self, results: &[CityEnrichment]) {
        present::apply_enrichment(&mut self.view, results);
        self.view.generated_at = Utc::now();
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.config.output.path)
    }

    /// Write the current view as pretty JSON, creating parent directories.
    pub async fn write_view(&self) -> anyhow::Result<()> {
        write_view(&self.output_path(), &self.view).await
    }
}

pub async fn write_view(path: &Path, view: &MapView) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(view).context("failed to serialize map view")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote map view to {}", path.display());
    Ok(())
}

/// Run the enrichment task and fold its results in, then write the view.
pub async fn enrich_and_write<S>(state: &mut AppState<S>) -> anyhow::Result<()>
where
    S: Geocoder + PlaceFinder + 'static,
{
    let results = state
        .spawn_enrichment()
        .await
        .context("enrichment task failed")?;
    state.apply_enrichment(&results);
    state.write_view().await
}

/// Fetch the dataset, build the directory, write the base view, enrich it
/// and write it again.
pub async fn run(config: Config) -> anyhow::Result<MapView> {
    let source = DatasetSource::parse(&config.dataset.source);
    let records = fetch_dataset(&source)
        .await
        .with_context(|| format!("failed to load dataset from {source}"))?;

    let options = PipelineOptions::from_config(&config);
    let directory = build_directory(&records, &config.fields, &options);
    info!(
        "Built directory: {} cities, {} players, {} top cities",
        directory.cities.len(),
        directory.total_players(),
        directory.top_cities.len()
    );

    // A disabled client fails every lookup with `NotConfigured`.
    let maps = MapsClient::from_config(&config).context("failed to build maps client")?;
    match &maps {
        MapsClient::Active(_) => info!("Maps client initialized (API key configured)"),
        MapsClient::Disabled => {
            warn!("Maps client disabled; markers will have no position or photo")
        }
    }

    let mut state = AppState::new(config, directory, Arc::new(maps));
    state.write_view().await?;
    enrich_and_write(&mut state).await?;
    Ok(state.view)
}
