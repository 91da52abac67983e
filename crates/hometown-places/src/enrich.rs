// Per-city enrichment: geocode each city and look up a nearby-place photo.
//
// Every city runs as its own tokio task. There is no ordering between cities,
// no concurrency cap, no retry and no cancellation. A failed lookup only
// affects that city's outcome.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use hometown_core::dataset::CityKey;

use crate::lookup::{Geocoder, LatLng, PlaceFinder, PlaceQuery};

/// Result of enriching one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Location and photo both resolved.
    Complete { location: LatLng, photo_url: String },
    /// Geocoded, but no photo could be found.
    LocationOnly { location: LatLng, reason: String },
    /// The city could not be geocoded.
    Failed { reason: String },
}

impl EnrichmentOutcome {
    pub fn location(&self) -> Option<LatLng> {
        match self {
            EnrichmentOutcome::Complete { location, .. }
            | EnrichmentOutcome::LocationOnly { location, .. } => Some(*location),
            EnrichmentOutcome::Failed { .. } => None,
        }
    }

    pub fn photo_url(&self) -> Option<&str> {
        match self {
            EnrichmentOutcome::Complete { photo_url, .. } => Some(photo_url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityEnrichment {
    pub key: CityKey,
    pub outcome: EnrichmentOutcome,
}

/// Geocode `key` and, if that succeeds, search for a nearby photo.
pub async fn enrich_city<S>(service: &S, key: &CityKey, query: &PlaceQuery) -> EnrichmentOutcome
where
    S: Geocoder + PlaceFinder + ?Sized,
{
    let address = key.to_string();
    let location = match service.geocode(&address).await {
        Ok(location) => location,
        Err(e) => {
            warn!("Geocode failed for {}: {}", address, e);
            return EnrichmentOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    match service.nearby_photo(location, query).await {
        Ok(photo_url) => EnrichmentOutcome::Complete {
            location,
            photo_url,
        },
        Err(e) => {
            warn!("No place photo for {}: {}", address, e);
            EnrichmentOutcome::LocationOnly {
                location,
                reason: e.to_string(),
            }
        }
    }
}

/// Enrich every city concurrently and return the outcomes in `keys` order.
pub async fn enrich_cities<S>(
    service: Arc<S>,
    keys: Vec<CityKey>,
    query: PlaceQuery,
) -> Vec<CityEnrichment>
where
    S: Geocoder + PlaceFinder + 'static,
{
    let query = Arc::new(query);
    let mut tasks = JoinSet::new();
    for (index, key) in keys.iter().cloned().enumerate() {
        let service = Arc::clone(&service);
        let query = Arc::clone(&query);
        tasks.spawn(async move {
            let outcome = enrich_city(service.as_ref(), &key, &query).await;
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<EnrichmentOutcome>> = vec![None; keys.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(e) => warn!("Enrichment task did not complete: {}", e),
        }
    }

    let results: Vec<CityEnrichment> = keys
        .into_iter()
        .zip(outcomes)
        .map(|(key, outcome)| CityEnrichment {
            key,
            outcome: outcome.unwrap_or_else(|| EnrichmentOutcome::Failed {
                reason: "enrichment task aborted".into(),
            }),
        })
        .collect();

    let complete = results
        .iter()
        .filter(|r| matches!(r.outcome, EnrichmentOutcome::Complete { .. }))
        .count();
    info!("Enriched {}/{} cities with location and photo", complete, results.len());

    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// In-memory provider. Cities absent from `locations` fail to geocode;
    /// cities absent from `photos` have no photo. `delays_ms` staggers
    /// geocode completion.
    #[derive(Default)]
    struct FakeMaps {
        locations: HashMap<String, LatLng>,
        photos: HashMap<String, String>,
        delays_ms: HashMap<String, u64>,
        panic_on: Option<String>,
    }

    impl FakeMaps {
        fn with_city(mut self, address: &str, lat: f64, lng: f64, photo: Option<&str>) -> Self {
            self.locations.insert(address.into(), LatLng { lat, lng });
            if let Some(p) = photo {
                self.photos.insert(format!("{lat},{lng}"), p.into());
            }
            self
        }
    }

    #[async_trait]
    impl Geocoder for FakeMaps {
        async fn geocode(&self, address: &str) -> Result<LatLng, LookupError> {
            if self.panic_on.as_deref() == Some(address) {
                panic!("provider blew up");
            }
            if let Some(ms) = self.delays_ms.get(address) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.locations.get(address).copied().ok_or(LookupError::NoResults)
        }
    }

    #[async_trait]
    impl PlaceFinder for FakeMaps {
        async fn nearby_photo(
            &self,
            location: LatLng,
            _query: &PlaceQuery,
        ) -> Result<String, LookupError> {
            self.photos
                .get(&format!("{},{}", location.lat, location.lng))
                .cloned()
                .ok_or(LookupError::NoPhoto)
        }
    }

    fn query() -> PlaceQuery {
        PlaceQuery {
            radius_m: 1000,
            place_types: vec!["stadium".into()],
            photo_max_width: 500,
        }
    }

    fn key(city: &str) -> CityKey {
        CityKey::new(city, "NC")
    }

    #[tokio::test]
    async fn complete_location_only_and_failed() {
        let maps = FakeMaps::default()
            .with_city("Raleigh, NC", 35.78, -78.64, Some("https://photo/raleigh"))
            .with_city("Durham, NC", 35.99, -78.90, None);

        let results = enrich_cities(
            Arc::new(maps),
            vec![key("Raleigh"), key("Durham"), key("Nowhere")],
            query(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].outcome,
            EnrichmentOutcome::Complete {
                location: LatLng { lat: 35.78, lng: -78.64 },
                photo_url: "https://photo/raleigh".into(),
            }
        );
        assert!(matches!(results[1].outcome, EnrichmentOutcome::LocationOnly { .. }));
        assert_eq!(results[1].outcome.location(), Some(LatLng { lat: 35.99, lng: -78.90 }));
        assert_eq!(results[1].outcome.photo_url(), None);
        assert!(matches!(results[2].outcome, EnrichmentOutcome::Failed { .. }));
        assert_eq!(results[2].outcome.location(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn results_keep_input_order_regardless_of_completion() {
        let mut maps = FakeMaps::default()
            .with_city("Slow, NC", 1.0, 1.0, Some("slow"))
            .with_city("Fast, NC", 2.0, 2.0, Some("fast"));
        maps.delays_ms.insert("Slow, NC".into(), 500);

        let results = enrich_cities(Arc::new(maps), vec![key("Slow"), key("Fast")], query()).await;
        assert_eq!(results[0].key, key("Slow"));
        assert_eq!(results[0].outcome.photo_url(), Some("slow"));
        assert_eq!(results[1].key, key("Fast"));
        assert_eq!(results[1].outcome.photo_url(), Some("fast"));
    }

    #[tokio::test]
    async fn panicking_task_reported_as_failed_without_affecting_others() {
        let mut maps = FakeMaps::default().with_city("Cary, NC", 3.0, 3.0, Some("cary"));
        maps.panic_on = Some("Apex, NC".into());

        let results = enrich_cities(Arc::new(maps), vec![key("Apex"), key("Cary")], query()).await;
        assert_eq!(
            results[0].outcome,
            EnrichmentOutcome::Failed {
                reason: "enrichment task aborted".into()
            }
        );
        assert_eq!(results[1].outcome.photo_url(), Some("cary"));
    }

    #[tokio::test]
    async fn no_cities_no_tasks() {
        let results = enrich_cities(Arc::new(FakeMaps::default()), Vec::new(), query()).await;
        assert!(results.is_empty());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = EnrichmentOutcome::Failed {
            reason: "no results".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "no results");
    }
}
