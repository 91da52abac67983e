// Stat schema: which fields are summed and which are averaged per city.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum FieldSpecError {
    #[error("field name must not be empty")]
    EmptyName,

    #[error("field `{0}` is declared more than once")]
    Duplicate(String),

    #[error("field `{0}` is declared as both summable and averageable")]
    Overlap(String),
}

// ---------------------------------------------------------------------------
// FieldKind / FieldSpec
// ---------------------------------------------------------------------------

/// How a field is folded into a city aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Added across the city's players.
    Sum,
    /// Summed, then divided by the city's player count.
    Average,
}

impl FieldKind {
    pub fn is_average(self) -> bool {
        matches!(self, FieldKind::Average)
    }

    /// Label used in list and info-window text ("Total" / "Average").
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Sum => "Total",
            FieldKind::Average => "Average",
        }
    }
}

/// The two disjoint, ordered field groups shared by every pipeline stage.
///
/// A field belongs to exactly one group. Order is preserved so that table
/// columns and stat lines come out in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    summable: Vec<String>,
    averageable: Vec<String>,
}

impl FieldSpec {
    pub fn new<S, A>(summable: S, averageable: A) -> Result<Self, FieldSpecError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let summable: Vec<String> = summable.into_iter().map(Into::into).collect();
        let averageable: Vec<String> = averageable.into_iter().map(Into::into).collect();

        let mut seen_sum = HashSet::new();
        for name in &summable {
            if name.trim().is_empty() {
                return Err(FieldSpecError::EmptyName);
            }
            if !seen_sum.insert(name.as_str()) {
                return Err(FieldSpecError::Duplicate(name.clone()));
            }
        }

        let mut seen_avg = HashSet::new();
        for name in &averageable {
            if name.trim().is_empty() {
                return Err(FieldSpecError::EmptyName);
            }
            if seen_sum.contains(name.as_str()) {
                return Err(FieldSpecError::Overlap(name.clone()));
            }
            if !seen_avg.insert(name.as_str()) {
                return Err(FieldSpecError::Duplicate(name.clone()));
            }
        }

        Ok(FieldSpec {
            summable,
            averageable,
        })
    }

    pub fn summable(&self) -> &[String] {
        &self.summable
    }

    pub fn averageable(&self) -> &[String] {
        &self.averageable
    }

    /// All fields with their kind: summable first, then averageable.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.summable
            .iter()
            .map(|f| (f.as_str(), FieldKind::Sum))
            .chain(self.averageable.iter().map(|f| (f.as_str(), FieldKind::Average)))
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.iter().find(|(name, _)| *name == field).map(|(_, kind)| kind)
    }

    pub fn len(&self) -> usize {
        self.summable.len() + self.averageable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
