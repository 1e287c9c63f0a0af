//! Immutable in-memory record stores.
//!
//! Loaded once on startup from `main.rs` (EMBP: single gateway call per
//! dataset) and then shared read-only behind an `Arc` for the lifetime of the
//! process. Any failure here is fatal: the service does not start without its
//! data.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{
    AssessmentRecord, CategoricalField, ComplaintRecord, NumericField, RawAssessment,
    RawComplaint, Tabular,
};

// ---

/// Errors raised while loading a source table.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The source file does not exist.
    #[error("data file not found at '{0}'")]
    NotFound(String),

    /// The file could not be read or is not valid delimited text.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A timestamp or year cell could not be parsed.
    #[error("row {row}: unparseable date '{value}'")]
    InvalidDate { row: usize, value: String },

    /// A numeric cell could not be coerced.
    #[error("row {row}: column {column} has non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },
}

impl LoadError {
    // ---
    /// Classify an error from opening `path`, singling out a missing file.
    pub fn from_csv(path: &Path, err: csv::Error) -> Self {
        // ---
        if let csv::ErrorKind::Io(io) = err.kind() {
            if io.kind() == std::io::ErrorKind::NotFound {
                return Self::NotFound(path.display().to_string());
            }
        }
        Self::Csv(err)
    }
}

/// Row conversion shared by the raw CSV row types.
pub trait RawRow: DeserializeOwned {
    type Record: Tabular;

    fn convert(&self, row: usize) -> Result<Self::Record, LoadError>;
}

impl RawRow for RawComplaint {
    type Record = ComplaintRecord;

    fn convert(&self, row: usize) -> Result<ComplaintRecord, LoadError> {
        self.to_record(row)
    }
}

impl RawRow for RawAssessment {
    type Record = AssessmentRecord;

    fn convert(&self, row: usize) -> Result<AssessmentRecord, LoadError> {
        self.to_record(row)
    }
}

/// Read-only table of records, in source order.
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    records: Vec<R>,
}

pub type ComplaintStore = RecordStore<ComplaintRecord>;
pub type AssessmentStore = RecordStore<AssessmentRecord>;

impl<R: Tabular> RecordStore<R> {
    // ---
    pub fn new(records: Vec<R>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values the UI offers for its dropdowns and sliders.
    pub fn filter_options(&self) -> FilterOptions {
        // ---
        let categorical = R::CATEGORICAL
            .iter()
            .map(|&field| {
                let values: BTreeSet<&str> = self
                    .records
                    .iter()
                    .filter_map(|r| r.categorical(field))
                    .filter(|v| !v.is_empty())
                    .collect();
                FieldValues {
                    field,
                    values: values.into_iter().map(str::to_string).collect(),
                }
            })
            .collect();

        let numeric = R::NUMERIC
            .iter()
            .map(|&field| {
                let (min, max) = self
                    .records
                    .iter()
                    .filter_map(|r| r.numeric(field))
                    .fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), v| {
                        (
                            Some(lo.map_or(v, |lo| lo.min(v))),
                            Some(hi.map_or(v, |hi| hi.max(v))),
                        )
                    });
                FieldRange { field, min, max }
            })
            .collect();

        let years: BTreeSet<i32> = self.records.iter().map(Tabular::year).collect();
        let default_map_year = years.iter().next_back().copied();

        FilterOptions {
            categorical,
            numeric,
            years: years.into_iter().collect(),
            default_map_year,
        }
    }
}

/// Distinct values of one categorical field, sorted.
#[derive(Debug, Clone, Serialize)]
pub struct FieldValues {
    pub field: CategoricalField,
    pub values: Vec<String>,
}

/// Observed bounds of one numeric field; `None` when every value is null.
#[derive(Debug, Clone, Serialize)]
pub struct FieldRange {
    pub field: NumericField,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Everything the UI needs to populate its filter controls.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub categorical: Vec<FieldValues>,
    pub numeric: Vec<FieldRange>,
    pub years: Vec<i32>,
    /// Latest year, preselected in the map's year dropdown.
    pub default_map_year: Option<i32>,
}

// ---

/// Load the complaint table from `path`.
pub fn load_complaints(path: &Path) -> Result<ComplaintStore, LoadError> {
    load_from_path::<RawComplaint>(path)
}

/// Load the assessment table from `path`.
pub fn load_assessments(path: &Path) -> Result<AssessmentStore, LoadError> {
    load_from_path::<RawAssessment>(path)
}

fn load_from_path<T: RawRow>(path: &Path) -> Result<RecordStore<T::Record>, LoadError> {
    // ---
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| LoadError::from_csv(path, e))?;
    let store = read_records::<T, _>(reader)?;
    tracing::info!("Loaded {} records from {}", store.len(), path.display());
    Ok(store)
}

/// Parse a store from any reader holding CSV with a header row.
pub fn from_reader<T: RawRow, Rd: Read>(input: Rd) -> Result<RecordStore<T::Record>, LoadError> {
    // ---
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(input);
    read_records::<T, _>(reader)
}

fn read_records<T: RawRow, Rd: Read>(
    mut reader: csv::Reader<Rd>,
) -> Result<RecordStore<T::Record>, LoadError> {
    // ---
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<T>().enumerate() {
        let raw = row?;
        records.push(raw.convert(i + 1)?);
    }
    Ok(RecordStore::new(records))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    const COMPLAINTS: &str = "\
ID,TEMPO,LOCAL,DESCRICAO,STATUS
1,2023-01-15 10:00:00,Recife - PE,Geladeira quebrada,Resolvido
2,2023-02-01 09:30:00,Natal - RN,Entrega atrasada demais,Não respondida
3,2024-03-20 18:45:00,São Paulo - SP,Cobrança indevida no cartão de crédito,Resolvido
";

    #[test]
    fn test_from_reader_parses_complaints() {
        // ---
        let store = from_reader::<RawComplaint, _>(COMPLAINTS.as_bytes()).unwrap();
        assert_eq!(store.len(), 3);

        let ids: Vec<_> = store.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(store.records()[2].state, "SP");
        assert_eq!(store.records()[2].text_length, 6);
    }

    #[test]
    fn test_bad_date_aborts_load() {
        // ---
        let csv = "TEMPO,LOCAL,DESCRICAO,STATUS\n2023-01-01,Recife - PE,x,Resolvido\nnunca,Natal - RN,y,Resolvido\n";
        match from_reader::<RawComplaint, _>(csv.as_bytes()) {
            Err(LoadError::InvalidDate { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        // ---
        let err = load_complaints(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn test_filter_options() {
        // ---
        let store = from_reader::<RawComplaint, _>(COMPLAINTS.as_bytes()).unwrap();
        let options = store.filter_options();

        let states = options
            .categorical
            .iter()
            .find(|f| f.field == CategoricalField::State)
            .unwrap();
        assert_eq!(states.values, vec!["PE", "RN", "SP"]);

        let statuses = options
            .categorical
            .iter()
            .find(|f| f.field == CategoricalField::Status)
            .unwrap();
        assert_eq!(statuses.values, vec!["Não respondida", "Resolvido"]);

        let text = &options.numeric[0];
        assert_eq!(text.field, NumericField::TextLength);
        assert_eq!((text.min, text.max), (Some(2.0), Some(6.0)));

        assert_eq!(options.years, vec![2023, 2024]);
        assert_eq!(options.default_map_year, Some(2024));
    }

    #[test]
    fn test_empty_store_options() {
        // ---
        let store = from_reader::<RawComplaint, _>("TEMPO,LOCAL,DESCRICAO,STATUS\n".as_bytes()).unwrap();
        assert!(store.is_empty());

        let options = store.filter_options();
        assert!(options.years.is_empty());
        assert_eq!(options.default_map_year, None);
        assert_eq!((options.numeric[0].min, options.numeric[0].max), (None, None));
    }
}
