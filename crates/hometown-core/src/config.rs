// Configuration loading and parsing (hometown.toml, credentials.toml).

use crate::aggregate::MissingFieldPolicy;
use crate::pipeline::DEFAULT_TOP_CITY_LIMIT;
use crate::stats::FieldSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("cannot seed {path} from defaults: {message}")]
    SeedFailed { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub fields: FieldSpec,
    pub ranking: RankingConfig,
    pub map: MapConfig,
    pub markers: MarkerConfig,
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// hometown.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire hometown.toml file.
#[derive(Debug, Clone, Deserialize)]
struct HometownFile {
    dataset: DatasetConfig,
    fields: FieldsSection,
    #[serde(default)]
    ranking: RankingConfig,
    map: MapConfig,
    markers: MarkerConfig,
    enrichment: EnrichmentConfig,
    output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct FieldsSection {
    summable: Vec<String>,
    averageable: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    /// Filesystem path or `http(s)://` URL of the player dataset.
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_top_city_limit")]
    pub top_city_limit: usize,
    /// Ranks at or above this position are called out in info windows.
    #[serde(default = "default_highlight_rank_threshold")]
    pub highlight_rank_threshold: usize,
    #[serde(default)]
    pub missing_field: MissingFieldPolicy,
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            top_city_limit: default_top_city_limit(),
            highlight_rank_threshold: default_highlight_rank_threshold(),
            missing_field: MissingFieldPolicy::default(),
        }
    }
}

fn default_top_city_limit() -> usize {
    DEFAULT_TOP_CITY_LIMIT
}

fn default_highlight_rank_threshold() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub default_icon: String,
    pub default_size: IconSize,
    pub top_size: IconSize,
    /// Icon for top-city position `i + 1`.
    #[serde(default)]
    pub top_icons: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub enabled: bool,
    pub search_radius_m: u32,
    pub place_types: Vec<String>,
    pub photo_max_width: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub path: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub maps_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/hometown.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This does not copy defaults; `load_config()` does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- hometown.toml (required) ---
    let main_path = config_dir.join("hometown.toml");
    let main_text = read_file(&main_path)?;
    let file: HometownFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    let fields = FieldSpec::new(file.fields.summable, file.fields.averageable).map_err(|e| {
        ConfigError::ValidationError {
            field: "fields".into(),
            message: e.to_string(),
        }
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        dataset: file.dataset,
        fields,
        ranking: file.ranking,
        map: file.map,
        markers: file.markers,
        enrichment: file.enrichment,
        output: file.output,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/` with any file from `defaults/` that is not there yet.
///
/// Files already in `config/` are never overwritten and `*.example` templates
/// are left behind. Returns the paths written on this call. Without a
/// `defaults/` directory an existing `config/` is used as-is.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(seed_error(
            base_dir,
            "no defaults/ or config/ directory here; start hometown from the workspace root",
        ));
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| seed_error(&config_dir, e))?;
    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| seed_error(&defaults_dir, e))?;

    let mut seeded = Vec::new();
    for entry in entries {
        let source = entry.map_err(|e| seed_error(&defaults_dir, e))?.path();
        let Some(file_name) = source.file_name().filter(|_| source.is_file()) else {
            continue;
        };
        if Path::new(file_name).extension().is_some_and(|ext| ext == "example") {
            continue;
        }

        let target = config_dir.join(file_name);
        let mut dest = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(dest) => dest,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(seed_error(&target, e)),
        };
        let mut src = std::fs::File::open(&source).map_err(|e| seed_error(&source, e))?;
        std::io::copy(&mut src, &mut dest).map_err(|e| seed_error(&target, e))?;
        info!("Seeded {} from defaults", target.display());
        seeded.push(target);
    }

    Ok(seeded)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn seed_error(path: &Path, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::SeedFailed {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.dataset.source.trim().is_empty() {
        return Err(invalid("dataset.source", "must not be empty"));
    }

    if config.fields.is_empty() {
        return Err(invalid("fields", "at least one field must be declared"));
    }

    let counts: &[(&str, usize)] = &[
        ("ranking.top_city_limit", config.ranking.top_city_limit),
        (
            "ranking.highlight_rank_threshold",
            config.ranking.highlight_rank_threshold,
        ),
    ];
    for (name, val) in counts {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    let map = &config.map;
    if !(-90.0..=90.0).contains(&map.center_lat) {
        return Err(invalid(
            "map.center_lat",
            format!("must be between -90 and 90, got {}", map.center_lat),
        ));
    }
    if !(-180.0..=180.0).contains(&map.center_lng) {
        return Err(invalid(
            "map.center_lng",
            format!("must be between -180 and 180, got {}", map.center_lng),
        ));
    }
    if map.zoom <= 0.0 {
        return Err(invalid("map.zoom", format!("must be > 0, got {}", map.zoom)));
    }

    if config.enrichment.request_timeout_secs == 0 {
        return Err(invalid("enrichment.request_timeout_secs", "must be > 0"));
    }

    if config.output.path.trim().is_empty() {
        return Err(invalid("output.path", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
