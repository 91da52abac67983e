// Google Maps web-service client (Geocoding + Places Nearby Search).
//
// Plain JSON GETs through reqwest. Responses carry their own `status` field;
// anything other than "OK" is turned into a `LookupError`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use hometown_core::config::Config;

use crate::lookup::{Geocoder, LatLng, LookupError, PlaceFinder, PlaceQuery};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const NEARBY_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";
const PHOTO_URL: &str = "https://maps.googleapis.com/maps/api/place/photo";

// ---------------------------------------------------------------------------
// GoogleMapsClient
// ---------------------------------------------------------------------------

/// Low-level Google Maps client.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, api_key })
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<String, LookupError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    fn photo_url(&self, photo_reference: &str, max_width: u32) -> String {
        format!(
            "{PHOTO_URL}?maxwidth={max_width}&photo_reference={photo_reference}&key={}",
            self.api_key
        )
    }
}

#[async_trait]
impl Geocoder for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<LatLng, LookupError> {
        let body = self
            .get_json(GEOCODE_URL, &[("address", address.to_string())])
            .await?;
        let location = parse_geocode_response(&body)?;
        debug!(address, lat = location.lat, lng = location.lng, "geocoded");
        Ok(location)
    }
}

#[async_trait]
impl PlaceFinder for GoogleMapsClient {
    async fn nearby_photo(
        &self,
        location: LatLng,
        query: &PlaceQuery,
    ) -> Result<String, LookupError> {
        let base = vec![
            ("location", format!("{},{}", location.lat, location.lng)),
            ("radius", query.radius_m.to_string()),
        ];

        // The API takes one type per request, so walk the list.
        let types: Vec<Option<&str>> = if query.place_types.is_empty() {
            vec![None]
        } else {
            query.place_types.iter().map(|t| Some(t.as_str())).collect()
        };

        let mut last_err = LookupError::NoResults;
        for place_type in types {
            let mut params = base.clone();
            if let Some(t) = place_type {
                params.push(("type", t.to_string()));
            }
            let body = self.get_json(NEARBY_SEARCH_URL, &params).await?;
            match parse_nearby_photo_reference(&body) {
                Ok(reference) => return Ok(self.photo_url(&reference, query.photo_max_width)),
                Err(e @ (LookupError::NoResults | LookupError::NoPhoto)) => {
                    debug!(?place_type, "no usable place photo: {e}");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }
}

// ---------------------------------------------------------------------------
// MapsClient wrapper
// ---------------------------------------------------------------------------

/// Either a live Google client or a disabled stand-in that fails every lookup.
pub enum MapsClient {
    Active(GoogleMapsClient),
    Disabled,
}

impl MapsClient {
    /// `Active` when enrichment is enabled and an API key is configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if !config.enrichment.enabled {
            return Ok(MapsClient::Disabled);
        }
        match &config.credentials.maps_api_key {
            Some(key) if !key.is_empty() => {
                let timeout = Duration::from_secs(config.enrichment.request_timeout_secs);
                Ok(MapsClient::Active(GoogleMapsClient::new(key.clone(), timeout)?))
            }
            _ => Ok(MapsClient::Disabled),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MapsClient::Active(_))
    }
}

#[async_trait]
impl Geocoder for MapsClient {
    async fn geocode(&self, address: &str) -> Result<LatLng, LookupError> {
        match self {
            MapsClient::Active(client) => client.geocode(address).await,
            MapsClient::Disabled => Err(LookupError::NotConfigured),
        }
    }
}

#[async_trait]
impl PlaceFinder for MapsClient {
    async fn nearby_photo(
        &self,
        location: LatLng,
        query: &PlaceQuery,
    ) -> Result<String, LookupError> {
        match self {
            MapsClient::Active(client) => client.nearby_photo(location, query).await,
            MapsClient::Disabled => Err(LookupError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// JSON parsing helpers
// ---------------------------------------------------------------------------

/// Map a non-OK `status` to an error. `ZERO_RESULTS` is `NoResults`.
fn check_status(v: &Value) -> Result<(), LookupError> {
    let status = v
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| LookupError::Malformed("missing status".into()))?;
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" => Err(LookupError::NoResults),
        other => Err(LookupError::Status {
            status: other.to_string(),
            message: v
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("no error message")
                .to_string(),
        }),
    }
}

/// Extract `results[0].geometry.location` from a Geocoding API response.
pub(crate) fn parse_geocode_response(body: &str) -> Result<LatLng, LookupError> {
    let v: Value = serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
    check_status(&v)?;
    let first = v
        .get("results")
        .and_then(|r| r.get(0))
        .ok_or(LookupError::NoResults)?;
    let location = first
        .get("geometry")
        .and_then(|g| g.get("location"))
        .ok_or_else(|| LookupError::Malformed("result has no geometry.location".into()))?;
    let (Some(lat), Some(lng)) = (
        location.get("lat").and_then(Value::as_f64),
        location.get("lng").and_then(Value::as_f64),
    ) else {
        return Err(LookupError::Malformed("location lat/lng not numeric".into()));
    };
    Ok(LatLng { lat, lng })
}

/// Extract `results[0].photos[0].photo_reference` from a Nearby Search
/// response. Only the first place is considered.
pub(crate) fn parse_nearby_photo_reference(body: &str) -> Result<String, LookupError> {
    let v: Value = serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
    check_status(&v)?;
    let first = v
        .get("results")
        .and_then(|r| r.get(0))
        .ok_or(LookupError::NoResults)?;
    first
        .get("photos")
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("photo_reference"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(LookupError::NoPhoto)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocode_ok_response() {
        let body = r#"{
            "results": [
                {
                    "formatted_address": "Raleigh, NC, USA",
                    "geometry": { "location": { "lat": 35.7796, "lng": -78.6382 } }
                }
            ],
            "status": "OK"
        }"#;
        let loc = parse_geocode_response(body).unwrap();
        assert!((loc.lat - 35.7796).abs() < 1e-9);
        assert!((loc.lng + 78.6382).abs() < 1e-9);
    }

    #[test]
    fn geocode_zero_results() {
        let body = r#"{ "results": [], "status": "ZERO_RESULTS" }"#;
        assert!(matches!(parse_geocode_response(body), Err(LookupError::NoResults)));
    }

    #[test]
    fn geocode_request_denied_carries_message() {
        let body = r#"{
            "results": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }"#;
        match parse_geocode_response(body) {
            Err(LookupError::Status { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("expected Status error, got {other:?}"),
        }
    }

    #[test]
    fn geocode_missing_geometry_is_malformed() {
        let body = r#"{ "results": [ { "formatted_address": "x" } ], "status": "OK" }"#;
        assert!(matches!(parse_geocode_response(body), Err(LookupError::Malformed(_))));
    }

    #[test]
    fn geocode_invalid_json_is_malformed() {
        assert!(matches!(parse_geocode_response("<html>"), Err(LookupError::Malformed(_))));
    }

    #[test]
    fn nearby_first_photo_reference() {
        let body = r#"{
            "results": [
                { "name": "Arena", "photos": [ { "photo_reference": "ref-1", "width": 800 } ] },
                { "name": "College", "photos": [ { "photo_reference": "ref-2" } ] }
            ],
            "status": "OK"
        }"#;
        assert_eq!(parse_nearby_photo_reference(body).unwrap(), "ref-1");
    }

    #[test]
    fn nearby_first_result_without_photo() {
        let body = r#"{
            "results": [
                { "name": "Arena" },
                { "name": "College", "photos": [ { "photo_reference": "ref-2" } ] }
            ],
            "status": "OK"
        }"#;
        assert!(matches!(parse_nearby_photo_reference(body), Err(LookupError::NoPhoto)));
    }

    #[test]
    fn nearby_zero_results() {
        let body = r#"{ "results": [], "status": "ZERO_RESULTS" }"#;
        assert!(matches!(parse_nearby_photo_reference(body), Err(LookupError::NoResults)));
    }

    #[test]
    fn missing_status_is_malformed() {
        assert!(matches!(
            parse_nearby_photo_reference(r#"{ "results": [] }"#),
            Err(LookupError::Malformed(_))
        ));
    }

    #[test]
    fn photo_url_includes_reference_and_width() {
        let client = GoogleMapsClient::new("k".into(), Duration::from_secs(1)).unwrap();
        let url = client.photo_url("abc", 500);
        assert!(url.starts_with(PHOTO_URL));
        assert!(url.contains("maxwidth=500"));
        assert!(url.contains("photo_reference=abc"));
    }

    #[tokio::test]
    async fn disabled_client_fails_lookups() {
        let client = MapsClient::Disabled;
        assert!(!client.is_active());
        assert!(matches!(
            client.geocode("Raleigh, NC").await,
            Err(LookupError::NotConfigured)
        ));
    }
}
