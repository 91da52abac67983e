// Maps provider integration: geocoding and nearby-place photos, plus the
// concurrent per-city enrichment built on top of them.

pub mod client;
pub mod enrich;
pub mod lookup;

pub use client::MapsClient;
pub use enrich::{enrich_cities, CityEnrichment, EnrichmentOutcome};
pub use lookup::{Geocoder, LatLng, LookupError, PlaceFinder, PlaceQuery};
