// Presentation binder: turns the city directory (plus enrichment results)
// into the JSON view model the map page renders.
//
// One marker per city, in first-seen order. The city list follows the
// top-city ordering. Marker icons come from each city's position in the
// top-city list; info windows call out every field the city ranks in the
// top `highlight_rank_threshold` for.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hometown_core::aggregate::CityAggregate;
use hometown_core::config::{Config, IconSize, MarkerConfig};
use hometown_core::dataset::CityKey;
use hometown_core::pipeline::CityDirectory;
use hometown_core::stats::{FieldKind, FieldSpec};
use hometown_places::{CityEnrichment, EnrichmentOutcome, LatLng};

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub generated_at: DateTime<Utc>,
    pub map: MapSettings,
    pub columns: Vec<ColumnView>,
    pub markers: Vec<MarkerView>,
    pub city_list: Vec<CityListEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSettings {
    pub center: LatLng,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerIcon {
    pub url: String,
    pub size: IconSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub city_key: CityKey,
    pub title: String,
    pub anchor_id: String,
    /// 1-based position in the top-city list, if the city made it.
    pub top_position: Option<usize>,
    pub icon: MarkerIcon,
    /// Unset until the city is geocoded.
    pub position: Option<LatLng>,
    pub info_window: InfoWindowView,
    /// Why enrichment came back incomplete, if it did.
    pub enrichment_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoWindowView {
    pub heading: String,
    pub player_count_line: String,
    pub highlights: Vec<String>,
    pub read_more_href: String,
    pub photo_url: Option<String>,
    pub photo_alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityListEntry {
    pub anchor_id: String,
    pub city_name: String,
    pub total_players: usize,
    pub players: Vec<PlayerRow>,
    pub stat_lines: Vec<StatLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRow {
    pub name: String,
    /// One entry per column; `None` where the player has no value.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
    pub label: String,
    pub value: Option<f64>,
    pub display: String,
    pub rank: Option<usize>,
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Totals print as-is; averages to two decimals. Invalid values print "n/a".
pub fn format_value(value: Option<f64>, kind: FieldKind) -> String {
    match (value, kind) {
        (None, _) => "n/a".to_string(),
        (Some(v), FieldKind::Sum) => format!("{v}"),
        (Some(v), FieldKind::Average) => format!("{v:.2}"),
    }
}

/// Icon for a city at `top_position` in the top-city list.
pub fn marker_icon(top_position: Option<usize>, markers: &MarkerConfig) -> MarkerIcon {
    let top_icon = top_position
        .and_then(|pos| pos.checked_sub(1))
        .and_then(|i| markers.top_icons.get(i));
    match top_icon {
        Some(url) => MarkerIcon {
            url: url.clone(),
            size: markers.top_size,
        },
        None => MarkerIcon {
            url: markers.default_icon.clone(),
            size: markers.default_size,
        },
    }
}

/// "Is top R in Total F" / "Is top R in Average F" for every field where
/// the city ranks at or above `threshold`.
pub fn highlight_lines(city: &CityAggregate, fields: &FieldSpec, threshold: usize) -> Vec<String> {
    fields
        .iter()
        .filter_map(|(field, kind)| {
            let rank = city.rank(field)?;
            (rank <= threshold).then(|| format!("Is top {rank} in {} {field}", kind.label()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn build_marker(city: &CityAggregate, directory: &CityDirectory, config: &Config) -> MarkerView {
    let key = &city.key;
    let anchor_id = key.anchor_id();
    let top_position = directory.top_cities.position(key);

    MarkerView {
        city_key: key.clone(),
        title: key.city.clone(),
        anchor_id: anchor_id.clone(),
        top_position,
        icon: marker_icon(top_position, &config.markers),
        position: None,
        info_window: InfoWindowView {
            heading: key.city.clone(),
            player_count_line: format!("Has {} Players", city.player_count()),
            highlights: highlight_lines(
                city,
                &directory.fields,
                config.ranking.highlight_rank_threshold,
            ),
            read_more_href: format!("#{anchor_id}"),
            photo_url: None,
            photo_alt: format!("Image of {}", key.city),
        },
        enrichment_error: None,
    }
}

fn build_list_entry(city: &CityAggregate, fields: &FieldSpec) -> CityListEntry {
    let players = city
        .players
        .iter()
        .map(|p| PlayerRow {
            name: p.name.clone(),
            values: fields.iter().map(|(field, _)| p.value(field)).collect(),
        })
        .collect();

    let stat_lines = fields
        .iter()
        .map(|(field, kind)| {
            let value = city.value(field);
            StatLine {
                label: format!("{field} {}", kind.label()),
                value,
                display: format_value(value, kind),
                rank: city.rank(field),
            }
        })
        .collect();

    CityListEntry {
        anchor_id: city.key.anchor_id(),
        city_name: city.key.city.clone(),
        total_players: city.player_count(),
        players,
        stat_lines,
    }
}

/// Build the view without any enrichment: markers have no position or photo.
pub fn build_view(
    directory: &CityDirectory,
    config: &Config,
    generated_at: DateTime<Utc>,
) -> MapView {
    let columns = directory
        .fields
        .iter()
        .map(|(name, kind)| ColumnView {
            name: name.to_string(),
            kind,
        })
        .collect();

    let markers = directory
        .cities
        .values()
        .map(|city| build_marker(city, directory, config))
        .collect();

    let city_list = directory
        .top_cities
        .iter()
        .filter_map(|key| directory.city(key))
        .map(|city| build_list_entry(city, &directory.fields))
        .collect();

    MapView {
        generated_at,
        map: MapSettings {
            center: LatLng {
                lat: config.map.center_lat,
                lng: config.map.center_lng,
            },
            zoom: config.map.zoom,
        },
        columns,
        markers,
        city_list,
    }
}

/// Fold enrichment outcomes into the matching markers.
pub fn apply_enrichment(view: &mut MapView, results: &[CityEnrichment]) {
    for result in results {
        let Some(marker) = view.markers.iter_mut().find(|m| m.city_key == result.key) else {
            continue;
        };
        marker.position = result.outcome.location();
        marker.info_window.photo_url = result.outcome.photo_url().map(str::to_string);
        marker.enrichment_error = match &result.outcome {
            EnrichmentOutcome::Complete { .. } => None,
            EnrichmentOutcome::LocationOnly { reason, .. }
            | EnrichmentOutcome::Failed { reason } => Some(reason.clone()),
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
