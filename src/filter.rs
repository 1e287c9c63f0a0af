//! The filter engine: a pure function from (store, filter) to a view.
//!
//! Every dimension is independent and the result is their logical AND. A
//! dimension that is absent (or an empty selection) places no restriction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::{CategoricalField, NumericField, Tabular, UnknownField};
use crate::store::RecordStore;

// ---

/// Inclusive `[lo, hi]` range. Serialized as a two-element array, the shape a
/// range slider reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "[T; 2]",
    into = "[T; 2]",
    bound(serialize = "T: Copy + Serialize", deserialize = "T: Deserialize<'de>")
)]
pub struct Range<T> {
    pub lo: T,
    pub hi: T,
}

impl<T> From<[T; 2]> for Range<T> {
    fn from([lo, hi]: [T; 2]) -> Self {
        Self { lo, hi }
    }
}

impl<T> From<Range<T>> for [T; 2] {
    fn from(range: Range<T>) -> Self {
        [range.lo, range.hi]
    }
}

impl<T: Copy + PartialOrd> Range<T> {
    pub fn new(lo: T, hi: T) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, value: T) -> bool {
        self.lo <= value && value <= self.hi
    }
}

/// The current combination of user-selected predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Categorical membership: value must be one of the selected set.
    pub members: BTreeMap<CategoricalField, BTreeSet<String>>,
    /// Numeric range per field; null values never match.
    pub ranges: BTreeMap<NumericField, Range<f64>>,
    /// Inclusive year range.
    pub years: Option<Range<i32>>,
}

impl FilterSpec {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members<I, S>(mut self, field: CategoricalField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_range(mut self, field: NumericField, lo: f64, hi: f64) -> Self {
        self.ranges.insert(field, Range::new(lo, hi));
        self
    }

    pub fn with_years(mut self, lo: i32, hi: i32) -> Self {
        self.years = Some(Range::new(lo, hi));
        self
    }

    /// Number of active predicates.
    pub fn len(&self) -> usize {
        // ---
        self.members.values().filter(|set| !set.is_empty()).count()
            + self.ranges.len()
            + usize::from(self.years.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject fields that the record kind `R` does not carry.
    pub fn validate_for<R: Tabular>(&self) -> Result<(), UnknownField> {
        // ---
        if let Some(field) = self.members.keys().find(|f| !R::CATEGORICAL.contains(f)) {
            return Err(UnknownField(field.to_string()));
        }
        if let Some(field) = self.ranges.keys().find(|f| !R::NUMERIC.contains(f)) {
            return Err(UnknownField(field.to_string()));
        }
        Ok(())
    }

    /// True when `record` satisfies every active predicate.
    pub fn matches<R: Tabular>(&self, record: &R) -> bool {
        // ---
        let members_ok = self.members.iter().all(|(field, selected)| {
            selected.is_empty()
                || record
                    .categorical(*field)
                    .is_some_and(|value| selected.contains(value))
        });

        let ranges_ok = self.ranges.iter().all(|(field, range)| {
            record
                .numeric(*field)
                .is_some_and(|value| range.contains(value))
        });

        let years_ok = self
            .years
            .map_or(true, |range| range.contains(record.year()));

        members_ok && ranges_ok && years_ok
    }
}

/// Borrowed subset of a store, in the store's load order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a, R> {
    records: Vec<&'a R>,
}

impl<'a, R> FilteredView<'a, R> {
    // ---
    pub fn from_records(records: Vec<&'a R>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a R> + '_ {
        self.records.iter().copied()
    }

    /// Narrow this view further without touching the store.
    pub fn refine(&self, mut keep: impl FnMut(&R) -> bool) -> FilteredView<'a, R> {
        FilteredView {
            records: self.records.iter().copied().filter(|r| keep(r)).collect(),
        }
    }
}

/// Apply `spec` to `store`. Total: an empty store or an unsatisfiable spec
/// yields an empty view.
pub fn apply<'a, R: Tabular>(store: &'a RecordStore<R>, spec: &FilterSpec) -> FilteredView<'a, R> {
    // ---
    let records: Vec<&R> = store.records().iter().filter(|r| spec.matches(*r)).collect();
    tracing::debug!(
        "Filter with {} predicates kept {} of {} records",
        spec.len(),
        records.len(),
        store.len()
    );
    FilteredView { records }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::test_support::{complaint, complaint_store};

    fn sp_and_others() -> RecordStore<crate::models::ComplaintRecord> {
        // ---
        let mut records = Vec::new();
        for i in 0..150 {
            let state = if i % 3 == 2 { "RJ" } else { "SP" };
            let status = if i % 2 == 0 { "Resolvido" } else { "Não respondida" };
            let month = (i % 12) as u32 + 1;
            let year = 2021 + (i % 3);
            records.push(complaint(&i.to_string(), year, month, state, status, (i % 40) as u32));
        }
        RecordStore::new(records)
    }

    #[test]
    fn test_region_scenario_keeps_exactly_matching_records() {
        // ---
        let store = sp_and_others();
        let spec = FilterSpec::new().with_members(CategoricalField::State, ["SP"]);
        let view = apply(&store, &spec);
        assert_eq!(view.len(), 100);
        assert!(view.iter().all(|r| r.state == "SP"));
    }

    #[test]
    fn test_empty_selection_means_no_restriction() {
        // ---
        let store = sp_and_others();
        let spec = FilterSpec::new().with_members(CategoricalField::Status, Vec::<String>::new());
        assert!(spec.is_empty());
        assert_eq!(apply(&store, &spec).len(), 150);
    }

    #[test]
    fn test_view_is_ordered_subset() {
        // ---
        let store = sp_and_others();
        let spec = FilterSpec::new()
            .with_members(CategoricalField::Status, ["Resolvido"])
            .with_range(NumericField::TextLength, 5.0, 20.0);
        let view = apply(&store, &spec);

        let positions: Vec<usize> = view
            .iter()
            .map(|r| {
                store
                    .records()
                    .iter()
                    .position(|s| std::ptr::eq(s, r))
                    .expect("record must come from the store")
            })
            .collect();
        assert!(!positions.is_empty());
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_adding_predicates_never_grows_the_view() {
        // ---
        let store = sp_and_others();
        let specs = [
            FilterSpec::new(),
            FilterSpec::new().with_years(2021, 2022),
            FilterSpec::new()
                .with_years(2021, 2022)
                .with_members(CategoricalField::State, ["SP"]),
            FilterSpec::new()
                .with_years(2021, 2022)
                .with_members(CategoricalField::State, ["SP"])
                .with_range(NumericField::TextLength, 0.0, 10.0),
            FilterSpec::new()
                .with_years(2021, 2022)
                .with_members(CategoricalField::State, ["SP"])
                .with_range(NumericField::TextLength, 0.0, 10.0)
                .with_members(CategoricalField::Status, ["Resolvido"]),
        ];

        let sizes: Vec<usize> = specs.iter().map(|s| apply(&store, s).len()).collect();
        assert_eq!(sizes[0], 150);
        assert!(sizes.windows(2).all(|w| w[0] >= w[1]), "sizes: {sizes:?}");
    }

    #[test]
    fn test_ranges_are_inclusive() {
        // ---
        let store = complaint_store(&[
            complaint("a", 2020, 1, "SP", "Resolvido", 5),
            complaint("b", 2021, 1, "SP", "Resolvido", 10),
            complaint("c", 2022, 1, "SP", "Resolvido", 15),
        ]);
        let spec = FilterSpec::new()
            .with_range(NumericField::TextLength, 5.0, 10.0)
            .with_years(2021, 2022);
        let ids: Vec<_> = apply(&store, &spec).iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn test_empty_store_yields_empty_view() {
        // ---
        let store = complaint_store(&[]);
        let spec = FilterSpec::new().with_members(CategoricalField::State, ["SP"]);
        assert!(apply(&store, &spec).is_empty());
    }

    #[test]
    fn test_validate_rejects_foreign_fields() {
        // ---
        use crate::models::{AssessmentRecord, ComplaintRecord};

        let spec = FilterSpec::new().with_members(CategoricalField::Municipality, ["CAMPINAS"]);
        assert!(spec.validate_for::<AssessmentRecord>().is_ok());
        assert_eq!(
            spec.validate_for::<ComplaintRecord>(),
            Err(UnknownField("MUNICIPIO".to_string()))
        );

        let spec = FilterSpec::new().with_range(NumericField::Ideb, 0.0, 10.0);
        assert!(spec.validate_for::<ComplaintRecord>().is_err());
    }

    #[test]
    fn test_spec_deserializes_from_ui_payload() {
        // ---
        let json = r#"{
            "members": {"ESTADO": ["SP", "RJ"], "STATUS": []},
            "ranges": {"TAMANHO_TEXTO": [0, 200]},
            "years": [2020, 2023]
        }"#;
        let spec: FilterSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.years, Some(Range::new(2020, 2023)));
        assert_eq!(
            spec.ranges.get(&NumericField::TextLength),
            Some(&Range::new(0.0, 200.0))
        );

        let unknown = r#"{"members": {"CIDADE": ["Recife"]}}"#;
        assert!(serde_json::from_str::<FilterSpec>(unknown).is_err());

        let empty: FilterSpec = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
