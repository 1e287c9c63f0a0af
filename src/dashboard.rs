//! The reactive pipeline behind each dashboard.
//!
//! A filter change arrives as a request, the filter engine recomputes the
//! view from the immutable store, and every chart's aggregate is derived from
//! that view independently. Nothing is cached between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{
    self, CategoryCount, CorrelationMatrix, Histogram, Reducer, TermFrequency, TimeSeriesPoint,
    MAX_BINS, SCORE_BINS, TEXT_LENGTH_BINS,
};
use crate::filter::{self, FilterSpec, Range};
use crate::geojoin::{self, CategoryMapRow, NumericMapRow};
use crate::geometry::GeometryTable;
use crate::levels::{self, LegendEntry, PerformanceLevel};
use crate::models::{
    AssessmentRecord, CategoricalField, ComplaintRecord, NumericField, Tabular, UnknownField,
};
use crate::normalize::RegionAliases;
use crate::store::{AssessmentStore, ComplaintStore, FilterOptions};

// ---

/// Chart identifiers, matching the element ids of the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChartId {
    #[serde(rename = "grafico-serie-temporal")]
    ComplaintsOverTime,
    #[serde(rename = "grafico-status")]
    StatusDistribution,
    #[serde(rename = "grafico-estados")]
    ComplaintsByState,
    #[serde(rename = "grafico-tamanho-texto")]
    TextLengthHistogram,
    #[serde(rename = "wordcloud-img")]
    TopTerms,
    #[serde(rename = "mapa-reclamacoes")]
    ComplaintsMap,
    #[serde(rename = "grafico-avaliacoes-ano")]
    AssessmentsOverTime,
    #[serde(rename = "grafico-niveis")]
    PerformanceLevels,
    #[serde(rename = "grafico-notas")]
    ScoreHistogram,
    #[serde(rename = "grafico-correlacao")]
    ScoreCorrelation,
    #[serde(rename = "mapa-notas")]
    ScoreMap,
    #[serde(rename = "mapa-niveis")]
    LevelMap,
}

/// Choropleth data for a numeric statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<NumericField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<Reducer>,
    /// `[lon, lat]` viewport centre.
    pub center: Option<[f64; 2]>,
    pub rows: Vec<NumericMapRow>,
}

/// Choropleth data for a categorical statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMap {
    pub field: CategoricalField,
    pub center: Option<[f64; 2]>,
    pub legend: Vec<LegendEntry>,
    pub rows: Vec<CategoryMapRow>,
}

/// Chart-ready data for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Aggregate {
    TimeSeries(Vec<TimeSeriesPoint>),
    CategoryCounts(Vec<CategoryCount>),
    Histogram(Histogram),
    Correlation(CorrelationMatrix),
    Terms(Vec<TermFrequency>),
    NumericMap(NumericMap),
    CategoryMap(CategoryMap),
    /// The chart cannot be produced at all (e.g. its geometry layer failed to
    /// load). Empty data is never reported this way.
    Unavailable { reason: String },
}

pub type Charts = BTreeMap<ChartId, Aggregate>;

/// Why a chart request was rejected before any computation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    UnknownField(#[from] UnknownField),

    #[error("bins must be between 1 and {max}, got {bins}")]
    BinsOutOfRange { bins: usize, max: usize },
}

/// A dashboard: a record store plus the charts computed from it.
pub trait Dashboard: Send + Sync + 'static {
    type Request: for<'de> Deserialize<'de> + Send + 'static;

    /// Values for the filter controls.
    fn options(&self) -> FilterOptions;

    /// Reject requests naming fields this dashboard's records do not carry,
    /// or asking for chart parameters out of range.
    fn validate(&self, request: &Self::Request) -> Result<(), RequestError>;

    /// Recompute every chart for the given request.
    fn on_filter_change(&self, request: &Self::Request) -> Charts;
}

fn unavailable(reason: impl Into<String>) -> Aggregate {
    Aggregate::Unavailable {
        reason: reason.into(),
    }
}

// --- complaints

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComplaintsRequest {
    pub filter: FilterSpec,
    /// Year shown on the map; defaults to the latest year in the data.
    pub map_year: Option<i32>,
}

#[derive(Debug)]
pub struct ComplaintsDashboard {
    store: ComplaintStore,
    states: Option<GeometryTable>,
    aliases: RegionAliases,
    top_terms: usize,
}

impl ComplaintsDashboard {
    // ---
    pub fn new(
        store: ComplaintStore,
        states: Option<GeometryTable>,
        aliases: RegionAliases,
        top_terms: usize,
    ) -> Self {
        Self {
            store,
            states,
            aliases,
            top_terms,
        }
    }

    pub fn store(&self) -> &ComplaintStore {
        &self.store
    }

    pub fn geometry(&self) -> Option<&GeometryTable> {
        self.states.as_ref()
    }

    fn latest_year(&self) -> Option<i32> {
        self.store.records().iter().map(Tabular::year).max()
    }

    fn complaints_map(&self, request: &ComplaintsRequest) -> Aggregate {
        // ---
        let Some(states) = &self.states else {
            return unavailable("state boundaries are not loaded");
        };
        let year = request.map_year.or_else(|| self.latest_year());

        // The map has its own year selector; the chart year range does not apply.
        let spec = FilterSpec {
            years: year.map(|y| Range::new(y, y)),
            ..request.filter.clone()
        };
        let view = filter::apply(&self.store, &spec);
        let counts = aggregate::region_counts(&view, &self.aliases);

        Aggregate::NumericMap(NumericMap {
            year,
            field: None,
            reducer: None,
            center: states.center(),
            rows: geojoin::join_numeric(&counts, states, &self.aliases),
        })
    }
}

impl Dashboard for ComplaintsDashboard {
    type Request = ComplaintsRequest;

    fn options(&self) -> FilterOptions {
        self.store.filter_options()
    }

    fn validate(&self, request: &ComplaintsRequest) -> Result<(), RequestError> {
        Ok(request.filter.validate_for::<ComplaintRecord>()?)
    }

    fn on_filter_change(&self, request: &ComplaintsRequest) -> Charts {
        // ---
        let view = filter::apply(&self.store, &request.filter);
        tracing::info!(
            "Complaints: {} predicates, {} of {} records in view",
            request.filter.len(),
            view.len(),
            self.store.len()
        );

        let mut charts = Charts::new();
        charts.insert(
            ChartId::ComplaintsOverTime,
            Aggregate::TimeSeries(aggregate::time_series(&view)),
        );
        charts.insert(
            ChartId::StatusDistribution,
            Aggregate::CategoryCounts(aggregate::category_counts(
                &view,
                CategoricalField::Status,
                None,
            )),
        );
        charts.insert(
            ChartId::ComplaintsByState,
            Aggregate::CategoryCounts(aggregate::category_counts(
                &view,
                CategoricalField::State,
                None,
            )),
        );
        charts.insert(
            ChartId::TextLengthHistogram,
            Aggregate::Histogram(aggregate::histogram(
                &view,
                NumericField::TextLength,
                TEXT_LENGTH_BINS,
            )),
        );
        charts.insert(
            ChartId::TopTerms,
            Aggregate::Terms(aggregate::term_frequencies(&view, self.top_terms)),
        );
        charts.insert(ChartId::ComplaintsMap, self.complaints_map(request));
        charts
    }
}

// --- assessments

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssessmentsRequest {
    pub filter: FilterSpec,
    /// Score shown in the histogram and the score map (default: mathematics).
    pub stat_field: Option<NumericField>,
    /// Reducer name for the score map; unknown names fall back to mean.
    pub reducer: Option<String>,
    /// Histogram bin count (default 20, at most [`MAX_BINS`]).
    pub bins: Option<usize>,
    /// Columns offered to the correlation chart (default: every score).
    pub correlation_fields: Option<Vec<NumericField>>,
}

impl AssessmentsRequest {
    // ---
    fn stat_field(&self) -> NumericField {
        self.stat_field.unwrap_or(NumericField::MathScore)
    }

    fn reducer(&self) -> Reducer {
        self.reducer
            .as_deref()
            .map_or_else(Reducer::default, Reducer::parse_or_default)
    }
}

#[derive(Debug)]
pub struct AssessmentsDashboard {
    store: AssessmentStore,
    municipalities: Option<GeometryTable>,
    aliases: RegionAliases,
}

impl AssessmentsDashboard {
    // ---
    pub fn new(
        store: AssessmentStore,
        municipalities: Option<GeometryTable>,
        aliases: RegionAliases,
    ) -> Self {
        Self {
            store,
            municipalities,
            aliases,
        }
    }

    pub fn store(&self) -> &AssessmentStore {
        &self.store
    }

    pub fn geometry(&self) -> Option<&GeometryTable> {
        self.municipalities.as_ref()
    }
}

impl Dashboard for AssessmentsDashboard {
    type Request = AssessmentsRequest;

    fn options(&self) -> FilterOptions {
        self.store.filter_options()
    }

    fn validate(&self, request: &AssessmentsRequest) -> Result<(), RequestError> {
        // ---
        request.filter.validate_for::<AssessmentRecord>()?;

        let fields = std::iter::once(request.stat_field())
            .chain(request.correlation_fields.iter().flatten().copied());
        for field in fields {
            if !AssessmentRecord::NUMERIC.contains(&field) {
                return Err(UnknownField(field.to_string()).into());
            }
        }

        if let Some(bins) = request.bins.filter(|b| !(1..=MAX_BINS).contains(b)) {
            return Err(RequestError::BinsOutOfRange {
                bins,
                max: MAX_BINS,
            });
        }
        Ok(())
    }

    fn on_filter_change(&self, request: &AssessmentsRequest) -> Charts {
        // ---
        let view = filter::apply(&self.store, &request.filter);
        let field = request.stat_field();
        let reducer = request.reducer();
        tracing::info!(
            "Assessments: {} predicates, {} of {} records in view, {} by {:?}",
            request.filter.len(),
            view.len(),
            self.store.len(),
            field,
            reducer
        );

        let levels = PerformanceLevel::labels();
        let whitelist = request
            .correlation_fields
            .as_deref()
            .unwrap_or(AssessmentRecord::NUMERIC);

        let mut charts = Charts::new();
        charts.insert(
            ChartId::AssessmentsOverTime,
            Aggregate::TimeSeries(aggregate::time_series(&view)),
        );
        charts.insert(
            ChartId::PerformanceLevels,
            Aggregate::CategoryCounts(aggregate::category_counts(
                &view,
                CategoricalField::PerformanceLevel,
                Some(levels.as_slice()),
            )),
        );
        charts.insert(
            ChartId::ScoreHistogram,
            Aggregate::Histogram(aggregate::histogram(
                &view,
                field,
                request.bins.unwrap_or(SCORE_BINS),
            )),
        );
        charts.insert(
            ChartId::ScoreCorrelation,
            Aggregate::Correlation(aggregate::correlation(&view, whitelist)),
        );

        match &self.municipalities {
            Some(table) => {
                let scores = aggregate::region_statistic(&view, field, reducer, &self.aliases);
                charts.insert(
                    ChartId::ScoreMap,
                    Aggregate::NumericMap(NumericMap {
                        year: None,
                        field: Some(field),
                        reducer: Some(reducer),
                        center: table.center(),
                        rows: geojoin::join_numeric(&scores, table, &self.aliases),
                    }),
                );

                let dominant = aggregate::region_mode(
                    &view,
                    CategoricalField::PerformanceLevel,
                    &levels,
                    &self.aliases,
                );
                charts.insert(
                    ChartId::LevelMap,
                    Aggregate::CategoryMap(CategoryMap {
                        field: CategoricalField::PerformanceLevel,
                        center: table.center(),
                        legend: levels::legend(),
                        rows: geojoin::join_categorical(&dominant, table, &self.aliases),
                    }),
                );
            }
            None => {
                let reason = "municipality boundaries are not loaded";
                charts.insert(ChartId::ScoreMap, unavailable(reason));
                charts.insert(ChartId::LevelMap, unavailable(reason));
            }
        }
        charts
    }
}
