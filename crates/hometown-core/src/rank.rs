// Per-field city rankings.
//
// Ranks are consecutive positions 1..=N in descending value order. Ties keep the
// cities' first-seen order (the sort is stable), so every table is a
// permutation of 1..=N. Invalid aggregates rank after every valid one.

use crate::aggregate::CityMap;
use crate::dataset::CityKey;
use crate::stats::{FieldKind, FieldSpec};
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// Ranking of every city for a single field, ordered from rank 1 down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankTable {
    pub field: String,
    pub kind: FieldKind,
    ranks: IndexMap<CityKey, usize>,
}

impl RankTable {
    pub fn rank_of(&self, key: &CityKey) -> Option<usize> {
        self.ranks.get(key).copied()
    }

    /// City keys from rank 1 to rank N.
    pub fn ordered(&self) -> impl Iterator<Item = &CityKey> {
        self.ranks.keys()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// One rank table per declared field, in `FieldSpec` order.
pub type RankTables = IndexMap<String, RankTable>;

/// Descending by value; `None` sorts last.
fn compare_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rank every city by `field`, highest aggregate first.
///
/// `kind` does not change the ordering; sums and averages both rank
/// descending. It is carried on the table for labeling.
pub fn rank_cities_by_field(cities: &CityMap, field: &str, kind: FieldKind) -> RankTable {
    let mut sorted: Vec<(&CityKey, Option<f64>)> = cities
        .iter()
        .map(|(key, city)| (key, city.value(field)))
        .collect();
    sorted.sort_by(|a, b| compare_desc(a.1, b.1));

    let ranks = sorted
        .into_iter()
        .enumerate()
        .map(|(index, (key, _))| (key.clone(), index + 1))
        .collect();

    RankTable {
        field: field.to_string(),
        kind,
        ranks,
    }
}

/// Build a rank table for every field and write each city's ranks back onto
/// its aggregate.
pub fn rank_all(cities: &mut CityMap, field_spec: &FieldSpec) -> RankTables {
    let tables: RankTables = field_spec
        .iter()
        .map(|(field, kind)| (field.to_string(), rank_cities_by_field(cities, field, kind)))
        .collect();

    for (key, city) in cities.iter_mut() {
        city.ranks = tables
            .iter()
            .filter_map(|(field, table)| table.rank_of(key).map(|r| (field.clone(), r)))
            .collect();
    }

    tables
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
