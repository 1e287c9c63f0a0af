//! Record builders shared by the unit tests.

use chrono::NaiveDate;

use crate::models::{AssessmentRecord, ComplaintRecord};
use crate::store::RecordStore;

// ---

pub fn complaint(
    id: &str,
    year: i32,
    month: u32,
    state: &str,
    status: &str,
    text_length: u32,
) -> ComplaintRecord {
    // ---
    let timestamp = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid test date");

    ComplaintRecord {
        id: id.to_string(),
        timestamp,
        year,
        description: String::new(),
        state: state.to_string(),
        status: status.to_string(),
        category: None,
        text_length,
        tokens: Vec::new(),
    }
}

pub fn complaint_store(records: &[ComplaintRecord]) -> RecordStore<ComplaintRecord> {
    RecordStore::new(records.to_vec())
}

pub fn assessment(
    id: &str,
    year: i32,
    municipality: &str,
    math_score: Option<f64>,
    portuguese_score: Option<f64>,
    level: Option<&str>,
) -> AssessmentRecord {
    // ---
    AssessmentRecord {
        id: id.to_string(),
        year,
        municipality: municipality.to_string(),
        network: "Municipal".to_string(),
        stage: "5º ano".to_string(),
        performance_level: level.map(str::to_string),
        math_score,
        portuguese_score,
        ideb: None,
        approval_rate: None,
    }
}
