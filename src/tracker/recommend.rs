//! Measure recommendation step

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use super::history::{clamp_rate, MeasureRecord};
use super::TrackerError;
use crate::llm::prompts::{recommendation_prompt, ADVISOR_SYSTEM_PROMPT};
use crate::llm::CompletionBackend;

static CATEGORY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\]]+)\]").expect("category tag pattern is valid")
});

/// Bracketed category the advisor is asked to prefix each measure with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasureCategory {
    Counseling,
    Mentoring,
    AcademicSupport,
    FinancialAid,
    Engagement,
    Monitoring,
}

impl MeasureCategory {
    pub fn label(self) -> &'static str {
        match self {
            MeasureCategory::Counseling => "Counseling",
            MeasureCategory::Mentoring => "Mentoring",
            MeasureCategory::AcademicSupport => "Academic Support",
            MeasureCategory::FinancialAid => "Financial Aid",
            MeasureCategory::Engagement => "Engagement",
            MeasureCategory::Monitoring => "Monitoring",
        }
    }

    /// Category from the first bracketed tag in a measure line, if any
    pub fn from_measure(measure: &str) -> Option<Self> {
        CATEGORY_TAG
            .captures(measure)
            .and_then(|caps| caps.get(1))
            .and_then(|tag| tag.as_str().parse().ok())
    }
}

impl FromStr for MeasureCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "counseling" | "counselling" => Ok(MeasureCategory::Counseling),
            "mentoring" => Ok(MeasureCategory::Mentoring),
            "academic support" => Ok(MeasureCategory::AcademicSupport),
            "financial aid" => Ok(MeasureCategory::FinancialAid),
            "engagement" => Ok(MeasureCategory::Engagement),
            "monitoring" => Ok(MeasureCategory::Monitoring),
            other => Err(format!("unknown measure category: {}", other)),
        }
    }
}

impl fmt::Display for MeasureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Split a raw response into one measure per non-empty line
pub fn parse_measures(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ask the advisor for measures and build the record to store.
///
/// The rate is clamped to [0, 100] before it is used in the prompt. A failed
/// call or a response without any non-empty line yields an error and no
/// record.
pub async fn recommend(
    backend: &dyn CompletionBackend,
    rate: f64,
    factors: &str,
) -> Result<MeasureRecord, TrackerError> {
    let rate = clamp_rate(rate);
    let prompt = recommendation_prompt(rate, factors.trim());

    debug!("Requesting measures for rate {}%", rate);
    let response = backend.complete(ADVISOR_SYSTEM_PROMPT, &prompt).await?;

    let measures = parse_measures(&response);
    if measures.is_empty() {
        return Err(TrackerError::EmptyRecommendation);
    }

    info!("Received {} measures for rate {}%", measures.len(), rate);
    Ok(MeasureRecord::new(rate, measures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockCompletionBackend;
    use crate::llm::LlmError;

    const SAMPLE: &str = "1. [Counseling] Weekly check-ins with a school counselor\n\n\
        2. [Academic Support] After-school tutoring in math\n   \n\
        3. [Financial Aid] Transport vouchers\n\
        4. [Engagement] Student clubs\n\
        5. [Monitoring] Early-warning attendance dashboard\n";

    #[test]
    fn test_parse_measures_skips_blank_lines() {
        let measures = parse_measures(SAMPLE);
        assert_eq!(measures.len(), 5);
        assert_eq!(measures[1], "2. [Academic Support] After-school tutoring in math");
    }

    #[test]
    fn test_category_from_measure() {
        assert_eq!(
            MeasureCategory::from_measure("2. [Academic Support] tutoring"),
            Some(MeasureCategory::AcademicSupport)
        );
        assert_eq!(MeasureCategory::from_measure("[financial aid] grants"), Some(MeasureCategory::FinancialAid));
        assert_eq!(MeasureCategory::from_measure("[Outreach] home visits"), None);
        assert_eq!(MeasureCategory::from_measure("no tag at all"), None);
    }

    #[tokio::test]
    async fn test_recommend_builds_record() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|system, prompt| {
                system.starts_with("You are a student advisor") && prompt.contains("The dropout rate is 100.0%.")
            })
            .times(1)
            .returning(|_, _| Ok(SAMPLE.to_string()));

        let record = recommend(&backend, 140.0, " poverty ").await.unwrap();
        assert_eq!(record.reported_rate, 100.0);
        assert_eq!(record.measures.len(), 5);
    }

    #[tokio::test]
    async fn test_recommend_propagates_llm_error() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(|_, _| Err(LlmError::Status { status: 500, body: "boom".into() }));

        let err = recommend(&backend, 20.0, "").await.unwrap_err();
        assert!(matches!(err, TrackerError::Llm(LlmError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_recommend_rejects_blank_response() {
        let mut backend = MockCompletionBackend::new();
        backend.expect_complete().returning(|_, _| Ok("  \n\n".to_string()));

        let err = recommend(&backend, 20.0, "attendance").await.unwrap_err();
        assert!(matches!(err, TrackerError::EmptyRecommendation));
    }
}
