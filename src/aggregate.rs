//! Aggregation functions: each reduces a [`FilteredView`] to the exact shape
//! one chart needs.
//!
//! All functions are pure, total and independent of each other. An empty view
//! always produces a well-defined empty (or placeholder) result.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use strum::{EnumString, IntoStaticStr};

use crate::filter::FilteredView;
use crate::levels::color_for;
use crate::models::{CategoricalField, NumericField, Tabular};
use crate::normalize::{normalize_region, RegionAliases};

// ---

/// Default bin count for free-text length histograms.
pub const TEXT_LENGTH_BINS: usize = 50;

/// Default bin count for bounded score histograms.
pub const SCORE_BINS: usize = 20;

/// Largest bin count a histogram will allocate; requests above it are clamped.
pub const MAX_BINS: usize = 200;

/// Label of the degenerate correlation matrix.
pub const NO_CORRELATION_LABEL: &str = "Sem dados";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    /// `YYYY-MM` for monthly buckets, `YYYY` for yearly ones.
    pub period: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
    /// Fixed colour for canonical categories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub field: NumericField,
    pub bins: Vec<HistogramBin>,
    /// Records in the view whose value was null.
    pub nulls: u64,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major; `None` where the coefficient is undefined.
    pub values: Vec<Vec<Option<f64>>>,
    pub placeholder: bool,
}

impl CorrelationMatrix {
    // ---
    /// 1x1 stand-in returned when no usable numeric column remains.
    pub fn placeholder() -> Self {
        Self {
            columns: vec![NO_CORRELATION_LABEL.to_string()],
            values: vec![vec![None]],
            placeholder: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermFrequency {
    pub term: String,
    pub count: u64,
}

/// One scalar per normalized region identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RegionStatistic {
    pub values: BTreeMap<String, f64>,
}

impl RegionStatistic {
    pub fn get(&self, region: &str) -> Option<f64> {
        self.values.get(region).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RegionStatistic {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// One category label per normalized region identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegionCategory {
    pub values: BTreeMap<String, String>,
}

impl RegionCategory {
    pub fn get(&self, region: &str) -> Option<&str> {
        self.values.get(region).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RegionCategory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// How a region's values are reduced to one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, EnumString, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Reducer {
    #[default]
    #[strum(to_string = "mean", serialize = "media", serialize = "average")]
    Mean,
    #[strum(to_string = "median", serialize = "mediana")]
    Median,
    #[strum(to_string = "max", serialize = "maximo")]
    Max,
    #[strum(to_string = "min", serialize = "minimo")]
    Min,
}

impl Reducer {
    // ---
    /// Parse a reducer name (English or Portuguese, any case or accents).
    /// Unrecognized names fall back to [`Reducer::Mean`].
    pub fn parse_or_default(name: &str) -> Self {
        // ---
        normalize_region(name).parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown reducer '{}', falling back to mean", name);
            Self::default()
        })
    }

    /// Reduce `values`; `None` for an empty slice. Reorders the slice.
    pub fn reduce(self, values: &mut [f64]) -> Option<f64> {
        // ---
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        Some(match self {
            Self::Mean => values.iter().sum::<f64>() / n as f64,
            Self::Median => {
                values.sort_by(f64::total_cmp);
                if n % 2 == 0 {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                } else {
                    values[n / 2]
                }
            }
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        })
    }
}

// --- aggregations

/// Record counts per calendar month, or per year when any record in the view
/// lacks a month. Chronological; empty buckets are not emitted.
pub fn time_series<R: Tabular>(view: &FilteredView<'_, R>) -> Vec<TimeSeriesPoint> {
    // ---
    let monthly = view.iter().all(|r| r.month().is_some());

    let mut buckets: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for record in view.iter() {
        let month = if monthly { record.month().unwrap_or(0) } else { 0 };
        *buckets.entry((record.year(), month)).or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|((year, month), count)| TimeSeriesPoint {
            period: if monthly {
                format!("{year:04}-{month:02}")
            } else {
                format!("{year:04}")
            },
            count,
        })
        .collect()
}

/// Counts per value of `field`, in order of first appearance. With a
/// `canonical` order, its categories come first in that order (zero-filled)
/// followed by any other values in appearance order.
pub fn category_counts<R: Tabular>(
    view: &FilteredView<'_, R>,
    field: CategoricalField,
    canonical: Option<&[&str]>,
) -> Vec<CategoryCount> {
    // ---
    let mut order: Vec<String> = canonical
        .unwrap_or_default()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let mut counts: HashMap<String, u64> = order.iter().map(|c| (c.clone(), 0)).collect();

    for value in view.iter().filter_map(|r| r.categorical(field)) {
        match counts.get_mut(value) {
            Some(count) => *count += 1,
            None => {
                order.push(value.to_string());
                counts.insert(value.to_string(), 1);
            }
        }
    }

    order
        .into_iter()
        .map(|category| CategoryCount {
            count: counts.get(&category).copied().unwrap_or_default(),
            color: color_for(&category),
            category,
        })
        .collect()
}

/// Equal-width histogram over the observed range of `field` in this view.
/// Constant data is centred in a unit-wide span; nulls are counted apart.
/// `bins` is capped at [`MAX_BINS`]; zero bins gives an empty histogram.
pub fn histogram<R: Tabular>(
    view: &FilteredView<'_, R>,
    field: NumericField,
    bins: usize,
) -> Histogram {
    // ---
    let bins = bins.min(MAX_BINS);
    let values: Vec<f64> = view
        .iter()
        .filter_map(|r| r.numeric(field))
        .filter(|v| v.is_finite())
        .collect();
    let nulls = (view.len() - values.len()) as u64;

    let bounds = values.iter().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    });
    let Some((min, max)) = bounds.filter(|_| bins > 0) else {
        return Histogram {
            field,
            bins: Vec::new(),
            nulls,
        };
    };

    let (lo, hi) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0u64; bins];
    for v in &values {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + width * i as f64,
            end: if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            },
            count,
        })
        .collect();

    Histogram { field, bins, nulls }
}

/// Pairwise Pearson correlation across the whitelisted columns that the record
/// kind carries and that have at least two non-null values in this view.
pub fn correlation<R: Tabular>(
    view: &FilteredView<'_, R>,
    whitelist: &[NumericField],
) -> CorrelationMatrix {
    // ---
    let columns: Vec<NumericField> = whitelist
        .iter()
        .copied()
        .filter(|f| R::NUMERIC.contains(f))
        .filter(|&f| view.iter().filter(|r| r.numeric(f).is_some()).count() >= 2)
        .collect();

    if columns.is_empty() {
        return CorrelationMatrix::placeholder();
    }

    let values = columns
        .iter()
        .map(|&a| {
            columns
                .iter()
                .map(|&b| {
                    let pairs: Vec<(f64, f64)> = view
                        .iter()
                        .filter_map(|r| Some((r.numeric(a)?, r.numeric(b)?)))
                        .collect();
                    pearson(&pairs)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        columns: columns.iter().map(|f| f.to_string()).collect(),
        values,
        placeholder: false,
    }
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    // ---
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// `field` reduced per resolved region, so an alias and its canonical name
/// share one group. Regions with only null values are left out (the geo-join
/// fills them with its sentinel).
pub fn region_statistic<R: Tabular>(
    view: &FilteredView<'_, R>,
    field: NumericField,
    reducer: Reducer,
    aliases: &RegionAliases,
) -> RegionStatistic {
    // ---
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in view.iter() {
        let Some(value) = record.numeric(field) else {
            continue;
        };
        let region = aliases.resolve(record.region());
        if !region.is_empty() {
            groups.entry(region).or_default().push(value);
        }
    }

    groups
        .into_iter()
        .filter_map(|(region, mut values)| reducer.reduce(&mut values).map(|v| (region, v)))
        .collect()
}

/// Number of records per resolved region.
pub fn region_counts<R: Tabular>(
    view: &FilteredView<'_, R>,
    aliases: &RegionAliases,
) -> RegionStatistic {
    // ---
    let mut counts: BTreeMap<String, f64> = BTreeMap::new();
    for record in view.iter() {
        let region = aliases.resolve(record.region());
        if !region.is_empty() {
            *counts.entry(region).or_default() += 1.0;
        }
    }
    RegionStatistic { values: counts }
}

/// Most frequent value of `field` per resolved region. Ties go to the
/// earlier canonical category, then to the alphabetically smaller label.
pub fn region_mode<R: Tabular>(
    view: &FilteredView<'_, R>,
    field: CategoricalField,
    canonical: &[&str],
    aliases: &RegionAliases,
) -> RegionCategory {
    // ---
    let mut groups: BTreeMap<String, HashMap<&str, u64>> = BTreeMap::new();
    for record in view.iter() {
        let Some(value) = record.categorical(field).filter(|v| !v.is_empty()) else {
            continue;
        };
        let region = aliases.resolve(record.region());
        if !region.is_empty() {
            *groups.entry(region).or_default().entry(value).or_default() += 1;
        }
    }

    let rank = |label: &str| {
        canonical
            .iter()
            .position(|c| *c == label)
            .unwrap_or(usize::MAX)
    };

    groups
        .into_iter()
        .filter_map(|(region, counts)| {
            counts
                .into_iter()
                .min_by_key(|&(label, count)| (Reverse(count), rank(label), label))
                .map(|(label, _)| (region, label.to_string()))
        })
        .collect()
}

/// The `top_n` most frequent description tokens, most frequent first.
pub fn term_frequencies<R: Tabular>(view: &FilteredView<'_, R>, top_n: usize) -> Vec<TermFrequency> {
    // ---
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for token in view.iter().flat_map(|r| r.tokens()) {
        *counts.entry(token.as_str()).or_default() += 1;
    }

    let mut terms: Vec<(&str, u64)> = counts.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    terms
        .into_iter()
        .take(top_n)
        .map(|(term, count)| TermFrequency {
            term: term.to_string(),
            count,
        })
        .collect()
}
