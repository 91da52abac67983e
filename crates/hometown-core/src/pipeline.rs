// Aggregation pipeline: records -> city aggregates -> rank tables -> top cities.
//
// Pure function of its inputs; runs to completion in one pass.

use crate::aggregate::{aggregate, CityAggregate, CityMap, MissingFieldPolicy};
use crate::config::Config;
use crate::dataset::{retain_complete, CityKey, PlayerRecord};
use crate::rank::{rank_all, RankTables};
use crate::stats::FieldSpec;
use crate::top_cities::{select_top_cities, TopCityList};
use serde::Serialize;
use std::borrow::Cow;
use tracing::info;

/// Default cap on the top-city list; far above any regional dataset.
pub const DEFAULT_TOP_CITY_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub top_city_limit: usize,
    pub missing_field: MissingFieldPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            top_city_limit: DEFAULT_TOP_CITY_LIMIT,
            missing_field: MissingFieldPolicy::default(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        PipelineOptions {
            top_city_limit: config.ranking.top_city_limit,
            missing_field: config.ranking.missing_field,
        }
    }
}

/// Everything the presentation layer needs: aggregates, rank tables and the
/// top-city ordering. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityDirectory {
    pub fields: FieldSpec,
    pub cities: CityMap,
    pub rank_tables: RankTables,
    pub top_cities: TopCityList,
}

impl CityDirectory {
    pub fn city(&self, key: &CityKey) -> Option<&CityAggregate> {
        self.cities.get(key)
    }

    pub fn total_players(&self) -> usize {
        self.cities.values().map(CityAggregate::player_count).sum()
    }
}

/// Run aggregation, ranking and top-city selection over `records`.
pub fn build_directory(
    records: &[PlayerRecord],
    fields: &FieldSpec,
    options: &PipelineOptions,
) -> CityDirectory {
    let records: Cow<'_, [PlayerRecord]> = match options.missing_field {
        MissingFieldPolicy::Reject => Cow::Owned(retain_complete(records, fields)),
        _ => Cow::Borrowed(records),
    };

    let mut cities = aggregate(&records, fields, options.missing_field);
    let rank_tables = rank_all(&mut cities, fields);
    let top_cities = select_top_cities(&cities, options.top_city_limit);

    info!(
        "Aggregated {} players into {} cities ({} fields ranked, {} top cities)",
        records.len(),
        cities.len(),
        rank_tables.len(),
        top_cities.len()
    );

    CityDirectory {
        fields: fields.clone(),
        cities,
        rank_tables,
        top_cities,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
