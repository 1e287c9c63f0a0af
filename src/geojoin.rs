//! Left join of per-region aggregates onto a geometry table.
//!
//! The geometry table anchors the join: every geometry appears exactly once,
//! in table order, whether or not the aggregate has a value for it. Missing
//! values become a sentinel, never a dropped row.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{RegionCategory, RegionStatistic};
use crate::geometry::GeometryTable;
use crate::levels::{color_for, NO_DATA_COLOR, NO_DATA_LABEL};
use crate::normalize::RegionAliases;

// ---

/// Value given to geometries without a numeric statistic.
pub const NUMERIC_SENTINEL: f64 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericMapRow {
    /// Join key, matching the feature `id` of the geometry layer.
    pub region: String,
    pub name: String,
    pub value: f64,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMapRow {
    pub region: String,
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub has_data: bool,
}

/// Re-key an aggregate through normalization and the alias table. Aggregates
/// built by [`crate::aggregate`] are already keyed by resolved id, so this is
/// the identity for them; hand-built statistics are resolved here.
fn rekey<'a, V: Copy + 'a>(
    entries: impl Iterator<Item = (&'a String, V)>,
    aliases: &RegionAliases,
) -> HashMap<String, V> {
    // ---
    entries
        .map(|(region, value)| (aliases.resolve(region), value))
        .collect()
}

/// Join a numeric statistic; unmatched geometries get [`NUMERIC_SENTINEL`].
pub fn join_numeric(
    stat: &RegionStatistic,
    table: &GeometryTable,
    aliases: &RegionAliases,
) -> Vec<NumericMapRow> {
    // ---
    let values = rekey(stat.values.iter().map(|(k, v)| (k, *v)), aliases);

    let rows: Vec<NumericMapRow> = table
        .records()
        .iter()
        .map(|geometry| {
            let value = values.get(&geometry.id).copied();
            NumericMapRow {
                region: geometry.id.clone(),
                name: geometry.name.clone(),
                value: value.unwrap_or(NUMERIC_SENTINEL),
                has_data: value.is_some(),
            }
        })
        .collect();

    log_unmatched(values.keys(), table);
    rows
}

/// Join a categorical statistic; unmatched geometries get the
/// [`NO_DATA_LABEL`] sentinel and its fixed colour.
pub fn join_categorical(
    stat: &RegionCategory,
    table: &GeometryTable,
    aliases: &RegionAliases,
) -> Vec<CategoryMapRow> {
    // ---
    let labels = rekey(stat.values.iter().map(|(k, v)| (k, v.as_str())), aliases);

    let rows: Vec<CategoryMapRow> = table
        .records()
        .iter()
        .map(|geometry| match labels.get(&geometry.id) {
            Some(label) => CategoryMapRow {
                region: geometry.id.clone(),
                name: geometry.name.clone(),
                label: label.to_string(),
                color: color_for(label),
                has_data: true,
            },
            None => CategoryMapRow {
                region: geometry.id.clone(),
                name: geometry.name.clone(),
                label: NO_DATA_LABEL.to_string(),
                color: Some(NO_DATA_COLOR),
                has_data: false,
            },
        })
        .collect();

    log_unmatched(labels.keys(), table);
    rows
}

fn log_unmatched<'a>(keys: impl Iterator<Item = &'a String>, table: &GeometryTable) {
    // ---
    let unmatched: Vec<&String> = keys
        .filter(|key| !table.records().iter().any(|g| &g.id == *key))
        .collect();
    if !unmatched.is_empty() {
        tracing::debug!(
            "{} aggregated regions have no geometry: {:?}",
            unmatched.len(),
            unmatched
        );
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::aggregate::{region_counts, region_statistic, Reducer};
    use crate::filter::{apply, FilterSpec};
    use crate::geometry::tests::STATES;
    use crate::models::NumericField;
    use crate::store::RecordStore;
    use crate::test_support::assessment;

    fn states() -> GeometryTable {
        GeometryTable::from_geojson_str(STATES, "sigla", &RegionAliases::new()).unwrap()
    }

    #[test]
    fn test_numeric_join_fills_sentinel() {
        // ---
        let table = states();
        let stat: RegionStatistic = [("SP", 120.0), ("mg", 7.0)].into_iter().collect();
        let rows = join_numeric(&stat, &table, &RegionAliases::new());

        let got: Vec<_> = rows
            .iter()
            .map(|r| (r.region.as_str(), r.value, r.has_data))
            .collect();
        assert_eq!(
            got,
            vec![("SP", 120.0, true), ("RJ", 0.0, false), ("MG", 7.0, true)]
        );
    }

    #[test]
    fn test_join_cardinality_matches_geometry_table() {
        // ---
        let table = states();
        let aliases = RegionAliases::new();

        let empty = RegionStatistic::default();
        assert_eq!(join_numeric(&empty, &table, &aliases).len(), table.len());

        let extra: RegionStatistic = [("SP", 1.0), ("BA", 2.0), ("PE", 3.0), ("RS", 4.0)]
            .into_iter()
            .collect();
        assert_eq!(join_numeric(&extra, &table, &aliases).len(), table.len());

        let categories: RegionCategory = [("XX", "Básico")].into_iter().collect();
        assert_eq!(join_categorical(&categories, &table, &aliases).len(), table.len());
    }

    #[test]
    fn test_categorical_join_uses_no_data_label() {
        // ---
        let table = states();
        let stat: RegionCategory = [("RJ", "Adequado")].into_iter().collect();
        let rows = join_categorical(&stat, &table, &RegionAliases::new());

        assert_eq!(rows[0].label, NO_DATA_LABEL);
        assert_eq!(rows[0].color, Some(NO_DATA_COLOR));
        assert!(!rows[0].has_data);

        assert_eq!(rows[1].label, "Adequado");
        assert_eq!(rows[1].color, Some("#a6d96a"));
        assert!(rows[1].has_data);
    }

    #[test]
    fn test_aliases_resolve_aggregate_keys() {
        // ---
        let municipalities = r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature", "properties": {"name": "Mogi Mirim"},
             "geometry": {"type": "Point", "coordinates": [-46.9, -22.4]}},
            {"type": "Feature", "properties": {"name": "Embu das Artes"},
             "geometry": {"type": "Point", "coordinates": [-46.8, -23.6]}}
          ]
        }"#;
        let aliases = RegionAliases::with_defaults();
        let table = GeometryTable::from_geojson_str(municipalities, "name", &aliases).unwrap();

        let stat: RegionStatistic = [("MOJI MIRIM", 5.5), ("EMBU", 6.0)].into_iter().collect();
        let rows = join_numeric(&stat, &table, &aliases);

        assert!(rows.iter().all(|r| r.has_data), "rows: {rows:?}");
        assert_eq!(rows[0].value, 5.5);
        assert_eq!(rows[1].value, 6.0);
    }

    #[test]
    fn test_alias_and_canonical_rows_share_one_region() {
        // ---
        let municipalities = r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature", "properties": {"name": "Embu das Artes"},
             "geometry": {"type": "Point", "coordinates": [-46.8, -23.6]}}
          ]
        }"#;
        let aliases = RegionAliases::with_defaults();
        let table = GeometryTable::from_geojson_str(municipalities, "name", &aliases).unwrap();
        let store = RecordStore::new(vec![
            assessment("a", 2021, "EMBU", Some(4.0), None, None),
            assessment("b", 2021, "Embu", Some(6.0), None, None),
            assessment("c", 2021, "Embu das Artes", Some(11.0), None, None),
        ]);
        let view = apply(&store, &FilterSpec::new());

        let counts = join_numeric(&region_counts(&view, &aliases), &table, &aliases);
        assert_eq!(counts.len(), 1);
        assert_eq!((counts[0].region.as_str(), counts[0].value), ("EMBU DAS ARTES", 3.0));

        let mean = region_statistic(&view, NumericField::MathScore, Reducer::Mean, &aliases);
        let rows = join_numeric(&mean, &table, &aliases);
        assert_eq!(rows[0].value, 7.0);
    }
}
