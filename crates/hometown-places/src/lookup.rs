// Lookup seams for the external maps provider.

use async_trait::async_trait;
use hometown_core::config::EnrichmentConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Parameters for the nearby-place photo search around a city.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub radius_m: u32,
    /// Tried in order; the first place type with a photo wins.
    pub place_types: Vec<String>,
    pub photo_max_width: u32,
}

impl PlaceQuery {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        PlaceQuery {
            radius_m: config.search_radius_m,
            place_types: config.place_types.clone(),
            photo_max_width: config.photo_max_width,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {message}")]
    Status { status: String, message: String },

    #[error("no results")]
    NoResults,

    #[error("no photo available")]
    NoPhoto,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("maps client not configured")]
    NotConfigured,
}

/// Resolves a free-form address to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<LatLng, LookupError>;
}

/// Finds a photo URL for a notable place near a coordinate.
#[async_trait]
pub trait PlaceFinder: Send + Sync {
    async fn nearby_photo(
        &self,
        location: LatLng,
        query: &PlaceQuery,
    ) -> Result<String, LookupError>;
}
