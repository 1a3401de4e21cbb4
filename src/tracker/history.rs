//! Measure and improvement history with CSV export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scoring::FeedbackScores;

/// Suggested file name for the export download
pub const EXPORT_FILE_NAME: &str = "improvement_history.csv";

const CSV_HEADER: [&str; 7] = [
    "date",
    "measure",
    "initial_rate",
    "final_rate",
    "rate_change",
    "feedback",
    "feedback_scores",
];

/// Characters of the measure shown in a history entry title
const TITLE_CHARS: usize = 50;

/// One successful recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRecord {
    pub timestamp: DateTime<Utc>,
    /// Reported dropout rate, clamped to [0, 100]
    pub reported_rate: f64,
    /// One entry per non-empty line of the response
    pub measures: Vec<String>,
}

impl MeasureRecord {
    pub fn new(reported_rate: f64, measures: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            reported_rate: clamp_rate(reported_rate),
            measures,
        }
    }
}

/// One analyzed intervention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementRecord {
    pub timestamp: DateTime<Utc>,
    pub measure: String,
    pub initial_rate: f64,
    pub final_rate: f64,
    pub rate_change: f64,
    /// Category feedback sentence, not the narrative report
    pub feedback: String,
    pub feedback_scores: FeedbackScores,
}

/// Sidebar rendering of a history entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntryView {
    pub title: String,
    pub date: String,
    pub initial_rate: String,
    pub final_rate: String,
    pub rate_change: String,
    pub feedback: String,
}

impl ImprovementRecord {
    pub fn view(&self) -> HistoryEntryView {
        let head: String = self.measure.chars().take(TITLE_CHARS).collect();
        HistoryEntryView {
            title: format!("Measure: {}...", head),
            date: self.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            initial_rate: format!("{:.1}%", self.initial_rate),
            final_rate: format!("{:.1}%", self.final_rate),
            rate_change: format!("{:.1}%", self.rate_change),
            feedback: self.feedback.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected CSV header: {0}")]
    Header(String),

    #[error("Invalid value in row {row}, column {column}: {message}")]
    Field { row: usize, column: &'static str, message: String },
}

/// Append-only improvement history, oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<ImprovementRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImprovementRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn records(&self) -> &[ImprovementRecord] {
        &self.records
    }

    /// Records latest first, as shown in the sidebar
    pub fn newest_first(&self) -> impl Iterator<Item = &ImprovementRecord> {
        self.records.iter().rev()
    }

    /// Serialize the full history as CSV with a header row
    pub fn to_csv(&self) -> Result<String, HistoryError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for record in &self.records {
            let scores = serde_json::to_string(&record.feedback_scores)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            writer.write_record([
                record.timestamp.to_rfc3339(),
                record.measure.clone(),
                record.initial_rate.to_string(),
                record.final_rate.to_string(),
                record.rate_change.to_string(),
                record.feedback.clone(),
                scores,
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
    }

    /// Parse a history previously produced by [`History::to_csv`]
    pub fn from_csv(text: &str) -> Result<Self, HistoryError> {
        let mut reader = csv::Reader::from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().ne(CSV_HEADER) {
            return Err(HistoryError::Header(headers.iter().collect::<Vec<_>>().join(",")));
        }

        let mut history = History::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let line = index + 1;
            let cell = |i: usize| row.get(i).unwrap_or_default();
            let number = |i: usize| -> Result<f64, HistoryError> {
                cell(i).parse::<f64>().map_err(|e| HistoryError::Field {
                    row: line,
                    column: CSV_HEADER[i],
                    message: e.to_string(),
                })
            };

            let timestamp = DateTime::parse_from_rfc3339(cell(0))
                .map_err(|e| HistoryError::Field { row: line, column: CSV_HEADER[0], message: e.to_string() })?
                .with_timezone(&Utc);
            let feedback_scores = serde_json::from_str(cell(6))
                .map_err(|e| HistoryError::Field { row: line, column: CSV_HEADER[6], message: e.to_string() })?;

            history.push(ImprovementRecord {
                timestamp,
                measure: cell(1).to_string(),
                initial_rate: number(2)?,
                final_rate: number(3)?,
                rate_change: number(4)?,
                feedback: cell(5).to_string(),
                feedback_scores,
            });
        }

        Ok(history)
    }
}

/// Clamp a dropout rate into [0, 100]; NaN becomes 0
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 100.0)
    }
}
