//! Record types for the two dashboards and the field references that select
//! their columns.
//!
//! Raw CSV rows are converted exactly once, at load time, into immutable
//! records. Column names arriving from the UI are resolved into
//! [`CategoricalField`] / [`NumericField`] values before any filtering runs,
//! so an unknown name fails fast instead of surfacing mid-aggregation.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::levels::PerformanceLevel;
use crate::normalize::normalize_region;
use crate::store::LoadError;
use crate::text::tokenize;

// ---

/// A column name that does not belong to the known schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field `{0}`")]
pub struct UnknownField(pub String);

/// Categorical columns, named as in the source tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum CategoricalField {
    #[strum(serialize = "ESTADO")]
    State,
    #[strum(serialize = "STATUS")]
    Status,
    #[strum(serialize = "CATEGORIA")]
    Category,
    #[strum(serialize = "MUNICIPIO")]
    Municipality,
    #[strum(serialize = "REDE")]
    Network,
    #[strum(serialize = "ETAPA")]
    Stage,
    #[strum(serialize = "NIVEL_DESEMPENHO")]
    PerformanceLevel,
}

/// Numeric columns, named as in the source tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum NumericField {
    #[strum(serialize = "TAMANHO_TEXTO")]
    TextLength,
    #[strum(serialize = "NOTA_MATEMATICA")]
    MathScore,
    #[strum(serialize = "NOTA_PORTUGUES")]
    PortugueseScore,
    #[strum(serialize = "IDEB")]
    Ideb,
    #[strum(serialize = "TAXA_APROVACAO")]
    ApprovalRate,
}

macro_rules! field_name_conversions {
    ($field:ty) => {
        impl $field {
            /// Resolve a column name against the known schema.
            pub fn resolve(name: &str) -> Result<Self, UnknownField> {
                name.trim()
                    .parse()
                    .map_err(|_| UnknownField(name.to_string()))
            }

            pub fn name(self) -> &'static str {
                self.into()
            }
        }

        impl TryFrom<String> for $field {
            type Error = UnknownField;

            fn try_from(name: String) -> Result<Self, Self::Error> {
                Self::resolve(&name)
            }
        }

        impl std::fmt::Display for $field {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

field_name_conversions!(CategoricalField);
field_name_conversions!(NumericField);

/// Uniform read access to a record, so filtering and aggregation are written
/// once for both dashboards.
pub trait Tabular {
    /// Categorical columns this record kind carries.
    const CATEGORICAL: &'static [CategoricalField];
    /// Numeric columns this record kind carries.
    const NUMERIC: &'static [NumericField];
    /// Column holding the region identifier used by the map.
    const REGION: CategoricalField;

    fn id(&self) -> &str;
    fn categorical(&self, field: CategoricalField) -> Option<&str>;
    fn numeric(&self, field: NumericField) -> Option<f64>;
    fn year(&self) -> i32;
    fn month(&self) -> Option<u32>;

    fn region(&self) -> &str {
        self.categorical(Self::REGION).unwrap_or_default()
    }

    fn tokens(&self) -> &[String] {
        &[]
    }
}

// --- complaints

/// Raw complaint row as it appears in the source CSV.
#[derive(Debug, Deserialize)]
pub struct RawComplaint {
    // ---
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "TEMPO")]
    pub tempo: String,
    /// `"City - UF"`; the state is the last segment.
    #[serde(rename = "LOCAL", default)]
    pub local: String,
    #[serde(rename = "DESCRICAO", default)]
    pub description: String,
    #[serde(rename = "STATUS", default)]
    pub status: String,
    #[serde(rename = "CATEGORIA", default)]
    pub category: Option<String>,
}

/// One complaint, with its derived fields computed at load time.
#[derive(Debug, Clone, Serialize)]
pub struct ComplaintRecord {
    // ---
    pub id: String,
    pub timestamp: NaiveDateTime,
    pub year: i32,
    pub description: String,
    pub state: String,
    pub status: String,
    pub category: Option<String>,
    pub text_length: u32,
    pub tokens: Vec<String>,
}

impl RawComplaint {
    // ---
    /// Convert into a [`ComplaintRecord`]. `row` is 1-based and doubles as
    /// the identifier when the file has no `ID` column.
    pub fn to_record(&self, row: usize) -> Result<ComplaintRecord, LoadError> {
        // ---
        let timestamp = parse_timestamp(&self.tempo).ok_or_else(|| LoadError::InvalidDate {
            row,
            value: self.tempo.clone(),
        })?;

        let state = self
            .local
            .rsplit(" - ")
            .next()
            .map(normalize_region)
            .unwrap_or_default();

        let text_length = self.description.split_whitespace().count() as u32;

        Ok(ComplaintRecord {
            id: non_empty_id(self.id.as_deref(), row),
            timestamp,
            year: timestamp.year(),
            description: self.description.clone(),
            state,
            status: self.status.trim().to_string(),
            category: self
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            text_length,
            tokens: tokenize(&self.description),
        })
    }
}

impl Tabular for ComplaintRecord {
    const CATEGORICAL: &'static [CategoricalField] = &[
        CategoricalField::State,
        CategoricalField::Status,
        CategoricalField::Category,
    ];
    const NUMERIC: &'static [NumericField] = &[NumericField::TextLength];
    const REGION: CategoricalField = CategoricalField::State;

    fn id(&self) -> &str {
        &self.id
    }

    fn categorical(&self, field: CategoricalField) -> Option<&str> {
        // ---
        match field {
            CategoricalField::State => Some(&self.state),
            CategoricalField::Status => Some(&self.status),
            CategoricalField::Category => self.category.as_deref(),
            _ => None,
        }
    }

    fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::TextLength => Some(f64::from(self.text_length)),
            _ => None,
        }
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn month(&self) -> Option<u32> {
        Some(self.timestamp.month())
    }

    fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

// --- assessments

/// Raw assessment row as it appears in the source CSV.
#[derive(Debug, Deserialize)]
pub struct RawAssessment {
    // ---
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(rename = "ANO")]
    pub year: String,
    #[serde(rename = "MUNICIPIO")]
    pub municipality: String,
    #[serde(rename = "REDE", default)]
    pub network: String,
    #[serde(rename = "ETAPA", default)]
    pub stage: String,
    #[serde(rename = "NIVEL_DESEMPENHO", default)]
    pub performance_level: Option<String>,
    #[serde(rename = "NOTA_MATEMATICA", default)]
    pub math_score: Option<String>,
    #[serde(rename = "NOTA_PORTUGUES", default)]
    pub portuguese_score: Option<String>,
    #[serde(rename = "IDEB", default)]
    pub ideb: Option<String>,
    #[serde(rename = "TAXA_APROVACAO", default)]
    pub approval_rate: Option<String>,
}

/// One school/municipality assessment result.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentRecord {
    // ---
    pub id: String,
    pub year: i32,
    /// Normalized municipality name.
    pub municipality: String,
    pub network: String,
    pub stage: String,
    /// Canonical level label when recognized, the trimmed raw value otherwise.
    pub performance_level: Option<String>,
    pub math_score: Option<f64>,
    pub portuguese_score: Option<f64>,
    pub ideb: Option<f64>,
    pub approval_rate: Option<f64>,
}

impl RawAssessment {
    // ---
    pub fn to_record(&self, row: usize) -> Result<AssessmentRecord, LoadError> {
        // ---
        let year = parse_year(&self.year).ok_or_else(|| LoadError::InvalidDate {
            row,
            value: self.year.clone(),
        })?;

        let performance_level = self
            .performance_level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| {
                PerformanceLevel::parse(l)
                    .map(|level| level.label().to_string())
                    .unwrap_or_else(|| l.to_string())
            });

        let number = |value: &Option<String>, column: &'static str| match value {
            Some(v) => parse_optional_number(v, row, column),
            None => Ok(None),
        };

        Ok(AssessmentRecord {
            id: non_empty_id(self.id.as_deref(), row),
            year,
            municipality: normalize_region(&self.municipality),
            network: self.network.trim().to_string(),
            stage: self.stage.trim().to_string(),
            performance_level,
            math_score: number(&self.math_score, "NOTA_MATEMATICA")?,
            portuguese_score: number(&self.portuguese_score, "NOTA_PORTUGUES")?,
            ideb: number(&self.ideb, "IDEB")?,
            approval_rate: number(&self.approval_rate, "TAXA_APROVACAO")?,
        })
    }
}

impl Tabular for AssessmentRecord {
    const CATEGORICAL: &'static [CategoricalField] = &[
        CategoricalField::Municipality,
        CategoricalField::Network,
        CategoricalField::Stage,
        CategoricalField::PerformanceLevel,
    ];
    const NUMERIC: &'static [NumericField] = &[
        NumericField::MathScore,
        NumericField::PortugueseScore,
        NumericField::Ideb,
        NumericField::ApprovalRate,
    ];
    const REGION: CategoricalField = CategoricalField::Municipality;

    fn id(&self) -> &str {
        &self.id
    }

    fn categorical(&self, field: CategoricalField) -> Option<&str> {
        // ---
        match field {
            CategoricalField::Municipality => Some(&self.municipality),
            CategoricalField::Network => Some(&self.network),
            CategoricalField::Stage => Some(&self.stage),
            CategoricalField::PerformanceLevel => self.performance_level.as_deref(),
            _ => None,
        }
    }

    fn numeric(&self, field: NumericField) -> Option<f64> {
        // ---
        match field {
            NumericField::MathScore => self.math_score,
            NumericField::PortugueseScore => self.portuguese_score,
            NumericField::Ideb => self.ideb,
            NumericField::ApprovalRate => self.approval_rate,
            NumericField::TextLength => None,
        }
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn month(&self) -> Option<u32> {
        None
    }
}

// --- coercion helpers

fn non_empty_id(id: Option<&str>, row: usize) -> String {
    // ---
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => row.to_string(),
    }
}

/// Calendar years a record may carry.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Parse an `ANO` cell. Spreadsheet exports sometimes write `2019.0`.
fn parse_year(raw: &str) -> Option<i32> {
    // ---
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|y| y.fract() == 0.0 && f64::from(*YEARS.end()) >= y.abs())
                .map(|y| y as i32)
        })
        .filter(|y| YEARS.contains(y))
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse the timestamp layouts seen in exported complaint tables.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    // ---
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Coerce a cell into a number. Blank and the usual null markers become
/// `None`; a comma decimal separator is accepted.
pub fn parse_optional_number(
    raw: &str,
    row: usize,
    column: &'static str,
) -> Result<Option<f64>, LoadError> {
    // ---
    let trimmed = raw.trim();
    if trimmed.is_empty() || matches!(trimmed, "NA" | "N/A" | "NaN" | "nan" | "-") {
        return Ok(None);
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| LoadError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        })
}
