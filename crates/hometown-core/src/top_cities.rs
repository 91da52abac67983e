// Top-city selection: cities ordered by how many players they produced.

use crate::aggregate::CityMap;
use crate::dataset::CityKey;
use serde::Serialize;

/// City keys by descending player count, capped at the configured limit.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct TopCityList(Vec<CityKey>);

impl TopCityList {
    /// 1-based position of `key`, or `None` if it did not make the list.
    pub fn position(&self, key: &CityKey) -> Option<usize> {
        self.0.iter().position(|k| k == key).map(|i| i + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[CityKey] {
        &self.0
    }
}

/// Order cities by player count (descending) and keep at most `limit`.
/// Equal counts keep first-seen city order.
pub fn select_top_cities(cities: &CityMap, limit: usize) -> TopCityList {
    let mut sorted: Vec<(&CityKey, usize)> = cities
        .iter()
        .map(|(key, city)| (key, city.player_count()))
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));

    TopCityList(
        sorted
            .into_iter()
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, MissingFieldPolicy};
    use crate::dataset::PlayerRecord;
    use crate::stats::FieldSpec;

    fn records(cities: &[&str]) -> Vec<PlayerRecord> {
        cities
            .iter()
            .enumerate()
            .map(|(i, city)| PlayerRecord {
                name: format!("P{i}"),
                city: city.to_string(),
                region: "NC".into(),
                stats: [("PTS".to_string(), 1.0)].into_iter().collect(),
            })
            .collect()
    }

    fn city_map(cities: &[&str]) -> CityMap {
        let field_spec = FieldSpec::new(["PTS"], Vec::<String>::new()).unwrap();
        aggregate(&records(cities), &field_spec, MissingFieldPolicy::Invalidate)
    }

    fn names(list: &TopCityList) -> Vec<&str> {
        list.iter().map(|k| k.city.as_str()).collect()
    }

    #[test]
    fn ordered_by_player_count() {
        let cities = city_map(&["Cary", "Apex", "Apex", "Wake", "Apex", "Wake"]);
        let top = select_top_cities(&cities, 100);
        assert_eq!(names(&top), vec!["Apex", "Wake", "Cary"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let cities = city_map(&["Cary", "Apex", "Wake", "Apex", "Cary"]);
        let top = select_top_cities(&cities, 100);
        assert_eq!(names(&top), vec!["Cary", "Apex", "Wake"]);
    }

    #[test]
    fn truncated_to_limit() {
        let cities = city_map(&["Cary", "Apex", "Apex", "Wake"]);
        let top = select_top_cities(&cities, 2);
        assert_eq!(names(&top), vec!["Apex", "Cary"]);
    }

    #[test]
    fn position_is_one_based() {
        let cities = city_map(&["Cary", "Apex", "Apex"]);
        let top = select_top_cities(&cities, 1);
        assert_eq!(top.position(&CityKey::new("Apex", "NC")), Some(1));
        assert_eq!(top.position(&CityKey::new("Cary", "NC")), None);
    }

    #[test]
    fn counts_never_increase() {
        let cities = city_map(&["A", "B", "B", "C", "C", "C", "D", "B", "E"]);
        let top = select_top_cities(&cities, 100);
        let counts: Vec<usize> = top.iter().map(|k| cities[k].player_count()).collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(top.len(), cities.len());
    }
}
