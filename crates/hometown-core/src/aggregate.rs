// City aggregation: group players by city key and fold their stats into
// per-city sums and averages.

use crate::dataset::{CityKey, PlayerRecord};
use crate::stats::{FieldKind, FieldSpec};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What to do when a player has no usable value for a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// The city's aggregate for that field becomes invalid (`None`).
    #[default]
    Invalidate,
    /// The value is left out; averages divide by the players that reported it.
    Skip,
    /// Records missing any declared field are dropped before aggregation.
    Reject,
}

/// Per-city totals, averages and ranks.
///
/// `values` and `ranks` are keyed by field name in `FieldSpec` order. A
/// `None` value marks an aggregate that could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAggregate {
    pub key: CityKey,
    pub players: Vec<PlayerRecord>,
    pub values: IndexMap<String, Option<f64>>,
    pub ranks: IndexMap<String, usize>,
}

impl CityAggregate {
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }

    pub fn rank(&self, field: &str) -> Option<usize> {
        self.ranks.get(field).copied()
    }
}

/// City aggregates in first-seen order.
pub type CityMap = IndexMap<CityKey, CityAggregate>;

// ---------------------------------------------------------------------------
// Accumulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct FieldAccumulator {
    sum: f64,
    reported: usize,
    missing: usize,
}

struct CityBuilder {
    players: Vec<PlayerRecord>,
    fields: IndexMap<String, FieldAccumulator>,
}

impl CityBuilder {
    fn new(field_spec: &FieldSpec) -> Self {
        CityBuilder {
            players: Vec::new(),
            fields: field_spec
                .iter()
                .map(|(name, _)| (name.to_string(), FieldAccumulator::default()))
                .collect(),
        }
    }

    fn fold(&mut self, player: &PlayerRecord) {
        for (name, acc) in self.fields.iter_mut() {
            match player.value(name) {
                Some(v) => {
                    acc.sum += v;
                    acc.reported += 1;
                }
                None => acc.missing += 1,
            }
        }
        self.players.push(player.clone());
    }

    fn finish(
        self,
        key: CityKey,
        field_spec: &FieldSpec,
        policy: MissingFieldPolicy,
    ) -> CityAggregate {
        let mut values = IndexMap::with_capacity(self.fields.len());
        for (name, kind) in field_spec.iter() {
            let acc = self.fields.get(name).copied().unwrap_or_default();
            let invalid = match policy {
                MissingFieldPolicy::Skip => acc.reported == 0,
                MissingFieldPolicy::Invalidate | MissingFieldPolicy::Reject => acc.missing > 0,
            };
            if invalid {
                warn!(
                    "{} aggregate for {} is invalid: {} of {} players lack a value",
                    name,
                    key,
                    acc.missing,
                    self.players.len()
                );
                values.insert(name.to_string(), None);
                continue;
            }
            let value = match kind {
                FieldKind::Sum => acc.sum,
                FieldKind::Average => acc.sum / acc.reported as f64,
            };
            values.insert(name.to_string(), Some(value));
        }

        CityAggregate {
            key,
            players: self.players,
            values,
            ranks: IndexMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Group `records` by exact city key and compute each city's sums and means.
///
/// Cities appear in the order their first player appears. Every city has at
/// least one player, so averages never divide by zero. Ranks are left empty
/// for the ranker to fill.
pub fn aggregate(
    records: &[PlayerRecord],
    field_spec: &FieldSpec,
    policy: MissingFieldPolicy,
) -> CityMap {
    let mut builders: IndexMap<CityKey, CityBuilder> = IndexMap::new();
    for record in records {
        builders
            .entry(record.city_key())
            .or_insert_with(|| CityBuilder::new(field_spec))
            .fold(record);
    }

    builders
        .into_iter()
        .map(|(key, builder)| {
            let city = builder.finish(key.clone(), field_spec, policy);
            (key, city)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
