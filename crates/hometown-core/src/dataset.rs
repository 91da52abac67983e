// Player dataset loading.
//
// Accepts either a JSON array of player objects or a CSV file with a header
// row. Identity columns (Player/City/Region) are required per row and kept
// verbatim, whitespace included; every other column is treated as a stat.
// Stat values that are missing, null, non-numeric, or non-finite are
// recorded as absent.

use crate::stats::FieldSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Composite grouping key: exact `city` + `region`, displayed "City, Region".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityKey {
    pub city: String,
    pub region: String,
}

impl CityKey {
    pub fn new(city: impl Into<String>, region: impl Into<String>) -> Self {
        CityKey {
            city: city.into(),
            region: region.into(),
        }
    }

    /// Anchor-safe identifier: every non-alphanumeric character becomes `_`.
    pub fn anchor_id(&self) -> String {
        self.to_string()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.region)
    }
}

impl Serialize for CityKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of input data. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub name: String,
    pub city: String,
    pub region: String,
    /// Stat values by field name. A field that is not present is absent.
    pub stats: BTreeMap<String, f64>,
}

impl PlayerRecord {
    pub fn city_key(&self) -> CityKey {
        CityKey::new(self.city.clone(), self.region.clone())
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.stats.get(field).copied()
    }

    /// Declared fields this record has no usable value for.
    pub fn missing_fields<'a>(&self, field_spec: &'a FieldSpec) -> Vec<&'a str> {
        field_spec
            .iter()
            .map(|(name, _)| name)
            .filter(|name| !self.stats.contains_key(*name))
            .collect()
    }
}

/// On-disk / on-wire format of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Json,
    Csv,
}

impl DatasetFormat {
    /// Infer the format from a path or URL suffix. Anything that is not
    /// `.csv` is read as JSON.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let stem = lower.split(['?', '#']).next().unwrap_or_default();
        if stem.ends_with(".csv") {
            DatasetFormat::Csv
        } else {
            DatasetFormat::Json
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset JSON must be an array of player objects")]
    NotAnArray,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset produced zero valid player rows")]
    Empty,
}

// ---------------------------------------------------------------------------
// Raw serde structs (private)
// ---------------------------------------------------------------------------

/// One JSON player object. Any key besides the identity columns lands in
/// `stats` and is interpreted as a stat value.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(rename = "Player", alias = "name", alias = "Name", default)]
    name: Option<String>,
    #[serde(rename = "City", alias = "city", default)]
    city: Option<String>,
    #[serde(rename = "Region", alias = "region", alias = "State", default)]
    region: Option<String>,
    #[serde(flatten)]
    stats: HashMap<String, Value>,
}

const NAME_COLUMNS: &[&str] = &["Player", "name", "Name"];
const CITY_COLUMNS: &[&str] = &["City", "city"];
const REGION_COLUMNS: &[&str] = &["Region", "region", "State"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Interpret a JSON value as a stat. Numbers and numeric strings are accepted;
/// everything else (null, bool, non-finite, garbage) is absent.
fn stat_value(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Keep the value exactly as given unless it is missing or all whitespace.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn find_column(headers: &csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| candidates.contains(&h.trim()))
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

fn load_json_rows(text: &str) -> Result<Vec<PlayerRecord>, DatasetError> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Array(rows) = root else {
        return Err(DatasetError::NotAnArray);
    };

    let mut players = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let raw: RawPlayer = match serde_json::from_value(row) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed player row {}: {}", index, e);
                continue;
            }
        };
        let (Some(name), Some(city), Some(region)) =
            (non_blank(raw.name), non_blank(raw.city), non_blank(raw.region))
        else {
            warn!("skipping player row {}: missing Player, City or Region", index);
            continue;
        };
        let stats = raw
            .stats
            .iter()
            .filter_map(|(k, v)| stat_value(v).map(|v| (k.clone(), v)))
            .collect();
        players.push(PlayerRecord {
            name,
            city,
            region,
            stats,
        });
    }
    Ok(players)
}

fn load_csv_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();

    let (Some(name_col), Some(city_col), Some(region_col)) = (
        find_column(&headers, NAME_COLUMNS),
        find_column(&headers, CITY_COLUMNS),
        find_column(&headers, REGION_COLUMNS),
    ) else {
        warn!("CSV header lacks one of Player/City/Region columns; no rows loaded");
        return Ok(Vec::new());
    };

    let mut players = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed CSV row {}: {}", index, e);
                continue;
            }
        };
        let cell = |col: usize| non_blank(record.get(col).map(str::to_string));
        let (Some(name), Some(city), Some(region)) =
            (cell(name_col), cell(city_col), cell(region_col))
        else {
            warn!("skipping CSV row {}: missing Player, City or Region", index);
            continue;
        };

        let mut stats = BTreeMap::new();
        for (col, header) in headers.iter().enumerate() {
            if col == name_col || col == city_col || col == region_col {
                continue;
            }
            let parsed = record
                .get(col)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite());
            if let Some(v) = parsed {
                stats.insert(header.trim().to_string(), v);
            }
        }
        players.push(PlayerRecord {
            name,
            city,
            region,
            stats,
        });
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// Public loaders
// ---------------------------------------------------------------------------

/// Parse a dataset body in the given format. Fails if no valid rows remain.
pub fn parse(text: &str, format: DatasetFormat) -> Result<Vec<PlayerRecord>, DatasetError> {
    let players = match format {
        DatasetFormat::Json => load_json_rows(text)?,
        DatasetFormat::Csv => load_csv_from_reader(text.as_bytes())?,
    };
    if players.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(players)
}

/// Drop records that lack any declared field, logging each one.
pub fn retain_complete(records: &[PlayerRecord], field_spec: &FieldSpec) -> Vec<PlayerRecord> {
    records
        .iter()
        .filter(|r| {
            let missing = r.missing_fields(field_spec);
            if !missing.is_empty() {
                warn!(
                    "rejecting player '{}' ({}): missing {}",
                    r.name,
                    r.city_key(),
                    missing.join(", ")
                );
            }
            missing.is_empty()
        })
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_rows_parsed() {
        let json = r#"[
            {"Player": "Avery Lane", "City": "Raleigh", "Region": "NC", "PTS": 10, "FG%": 0.5},
            {"Player": "Bo Hart", "City": "Durham", "Region": "NC", "PTS": 30, "FG%": 0.9}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Avery Lane");
        assert_eq!(players[0].city_key().to_string(), "Raleigh, NC");
        assert_eq!(players[0].value("PTS"), Some(10.0));
        assert_eq!(players[1].value("FG%"), Some(0.9));
    }

    #[test]
    fn json_null_and_text_stats_are_absent() {
        let json = r#"[
            {"Player": "Avery Lane", "City": "Raleigh", "Region": "NC",
             "PTS": "12.5", "3P%": null, "FT%": "", "Pos": "G"}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players[0].value("PTS"), Some(12.5));
        assert_eq!(players[0].value("3P%"), None);
        assert_eq!(players[0].value("FT%"), None);
        assert_eq!(players[0].value("Pos"), None);
    }

    #[test]
    fn json_lowercase_aliases() {
        let json = r#"[{"name": "Avery Lane", "city": "Cary", "region": "NC", "PTS": 1}]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players[0].city_key(), CityKey::new("Cary", "NC"));
    }

    #[test]
    fn json_rows_without_identity_skipped() {
        let json = r#"[
            {"Player": "No City", "Region": "NC", "PTS": 5},
            {"Player": "  ", "City": "Cary", "Region": "NC", "PTS": 5},
            {"Player": 42, "City": "Cary", "Region": "NC"},
            {"Player": "Kept", "City": "Cary", "Region": "NC", "PTS": 5}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Kept");
    }

    #[test]
    fn json_must_be_array() {
        let err = parse(r#"{"Player": "x"}"#, DatasetFormat::Json).unwrap_err();
        assert!(matches!(err, DatasetError::NotAnArray));
    }

    #[test]
    fn json_syntax_error() {
        let err = parse("[{", DatasetFormat::Json).unwrap_err();
        assert!(matches!(err, DatasetError::Json(_)));
    }

    #[test]
    fn empty_dataset_is_error() {
        let err = parse("[]", DatasetFormat::Json).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn city_and_region_not_normalized() {
        let json = r#"[
            {"Player": "A", "City": "Raleigh", "Region": "NC"},
            {"Player": "B", "City": "raleigh", "Region": "NC"}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_ne!(players[0].city_key(), players[1].city_key());
    }

    #[test]
    fn csv_rows_parsed() {
        let csv_data = "\
Player,City,Region,PTS,FG%
Avery Lane,Raleigh,NC,10,0.5
Bo Hart,Durham,NC,30,";

        let players = load_csv_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].value("FG%"), Some(0.5));
        assert_eq!(players[1].value("PTS"), Some(30.0));
        assert_eq!(players[1].value("FG%"), None);
    }

    #[test]
    fn csv_without_identity_columns_loads_nothing() {
        let csv_data = "\
Name,Town,PTS
Avery Lane,Raleigh,10";
        let players = load_csv_from_reader(csv_data.as_bytes()).unwrap();
        assert!(players.is_empty());
    }

    #[test]
    fn csv_identity_whitespace_kept() {
        let csv_data = "\
Player,City,Region,PTS
Avery Lane,Raleigh ,NC,10
Bo Hart,Raleigh,NC,4";
        let players = load_csv_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(players[0].city, "Raleigh ");
        assert_eq!(players[0].city_key().to_string(), "Raleigh , NC");
        assert_ne!(players[0].city_key(), players[1].city_key());
    }

    #[test]
    fn json_identity_whitespace_kept() {
        let json = r#"[
            {"Player": "A", "City": "Raleigh", "Region": "NC"},
            {"Player": "B", "City": "Raleigh ", "Region": "NC"},
            {"Player": "C", "City": "Raleigh", "Region": " NC"}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players.len(), 3);
        assert_eq!(players[1].city, "Raleigh ");
        assert_eq!(players[2].region, " NC");
        assert_ne!(players[0].city_key(), players[1].city_key());
        assert_ne!(players[0].city_key(), players[2].city_key());
    }

    #[test]
    fn format_from_name() {
        assert_eq!(DatasetFormat::from_name("data/players.CSV"), DatasetFormat::Csv);
        assert_eq!(DatasetFormat::from_name("data/players.json"), DatasetFormat::Json);
        assert_eq!(
            DatasetFormat::from_name("https://example.test/p.csv?v=2"),
            DatasetFormat::Csv
        );
        assert_eq!(DatasetFormat::from_name("https://example.test/players"), DatasetFormat::Json);
    }

    #[test]
    fn anchor_id_replaces_punctuation() {
        let key = CityKey::new("Winston-Salem", "NC");
        assert_eq!(key.anchor_id(), "Winston_Salem__NC");
    }

    #[test]
    fn retain_complete_drops_records_missing_fields() {
        let field_spec = FieldSpec::new(["PTS"], ["FG%"]).unwrap();
        let json = r#"[
            {"Player": "Full", "City": "Cary", "Region": "NC", "PTS": 1, "FG%": 0.4},
            {"Player": "Partial", "City": "Cary", "Region": "NC", "PTS": 1}
        ]"#;
        let players = parse(json, DatasetFormat::Json).unwrap();
        assert_eq!(players[1].missing_fields(&field_spec), vec!["FG%"]);

        let kept = retain_complete(&players, &field_spec);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "Full");
    }
}
