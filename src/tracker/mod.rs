//! Dropout prevention tracker
//!
//! The two workflow steps of a session:
//! - recommend: dropout rate + contributing factors → categorized measures
//! - analyze: selected measure + feedback survey → new rate, narrative report,
//!   history entry
//!
//! `Tracker` owns the completion backend and the random source; callers pass
//! the session handle in explicitly. The session lock is never held across a
//! language model call.

pub mod history;
pub mod recommend;
pub mod report;
pub mod scoring;
pub mod session;
pub mod survey;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{CompletionBackend, LlmError};
use history::{ImprovementRecord, MeasureRecord};
use scoring::ScoreOutcome;
use session::Session;
use survey::SurveyResponse;

pub use history::History;
pub use session::SessionStore;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("The language model returned no measures")]
    EmptyRecommendation,

    #[error("No preventive measures yet; request measures first")]
    NoMeasures,

    #[error("Measure {index} does not exist ({available} available)")]
    InvalidSelection { index: usize, available: usize },
}

/// Result of the analyze step
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub measure: String,
    pub score: ScoreOutcome,
    /// Narrative report; absent when the report call failed
    pub report: Option<String>,
    /// Why the report is absent
    pub report_error: Option<String>,
    /// The entry appended to the session history
    pub record: ImprovementRecord,
}

pub struct Tracker {
    backend: Arc<dyn CompletionBackend>,
    rng: Mutex<StdRng>,
}

impl Tracker {
    /// Create a tracker; `seed` fixes the improvement draws, `None` seeds from the OS
    pub fn new(backend: Arc<dyn CompletionBackend>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            backend,
            rng: Mutex::new(rng),
        }
    }

    /// Request measures and record them in the session on success
    pub async fn recommend(
        &self,
        session: &AsyncMutex<Session>,
        rate: f64,
        factors: &str,
    ) -> Result<MeasureRecord, TrackerError> {
        let record = recommend::recommend(self.backend.as_ref(), rate, factors).await?;
        session.lock().await.record_measures(record.clone());
        Ok(record)
    }

    /// Score a survey for one of the latest measures, narrate it, and append
    /// the result to the session history.
    ///
    /// A failed report call does not discard the score; the error is carried
    /// in [`Analysis::report_error`].
    pub async fn analyze(
        &self,
        session: &AsyncMutex<Session>,
        measure_index: usize,
        survey: &SurveyResponse,
    ) -> Result<Analysis, TrackerError> {
        let (measure, initial_rate) = {
            let session = session.lock().await;
            let latest = session.latest_measures().ok_or(TrackerError::NoMeasures)?;
            let measure = latest
                .measures
                .get(measure_index)
                .cloned()
                .ok_or(TrackerError::InvalidSelection {
                    index: measure_index,
                    available: latest.measures.len(),
                })?;
            (measure, latest.reported_rate)
        };

        let score = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            scoring::score(survey, &measure, initial_rate, &mut *rng)
        };

        info!(
            "Measure scored: {:.1}% -> {:.1}% ({}{:.1}%)",
            initial_rate, score.new_rate, score.direction, score.rate_change
        );

        let (report, report_error) = match report::narrate(
            self.backend.as_ref(),
            &measure,
            initial_rate,
            score.rate_change,
            &score.feedback,
        )
        .await
        {
            Ok(text) => (Some(text), None),
            Err(e) => {
                warn!("Report generation failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let record = ImprovementRecord {
            timestamp: Utc::now(),
            measure: measure.clone(),
            initial_rate,
            final_rate: score.new_rate,
            rate_change: score.rate_change,
            feedback: score.feedback.clone(),
            feedback_scores: score.feedback_scores.clone(),
        };
        session.lock().await.record_improvement(record.clone());

        Ok(Analysis {
            measure,
            score,
            report,
            report_error,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockCompletionBackend;
    use survey::Scale;

    const MEASURES: &str = "1. [Counseling] Weekly check-ins\n2. [Academic Support] Tutoring\n";

    fn backend_with(report: Result<&'static str, ()>) -> Arc<MockCompletionBackend> {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|system, _| system.starts_with("You are a student advisor"))
            .returning(|_, _| Ok(MEASURES.to_string()));
        backend
            .expect_complete()
            .withf(|system, _| system.starts_with("You are an analytics bot"))
            .returning(move |_, _| match report {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(LlmError::Status { status: 503, body: "unavailable".into() }),
            });
        Arc::new(backend)
    }

    #[tokio::test]
    async fn test_full_flow_appends_history() {
        let tracker = Tracker::new(backend_with(Ok("Report body")), Some(11));
        let session = AsyncMutex::new(Session::new());

        tracker.recommend(&session, 50.0, "attendance").await.unwrap();
        let survey = SurveyResponse::uniform(true, Scale::new(10).unwrap());
        let analysis = tracker.analyze(&session, 1, &survey).await.unwrap();

        assert_eq!(analysis.measure, "2. [Academic Support] Tutoring");
        assert_eq!(analysis.report.as_deref(), Some("Report body"));
        assert!(analysis.report_error.is_none());
        assert_eq!(analysis.record.feedback, "Academic support services impact observed");
        assert_eq!(analysis.record.initial_rate, 50.0);
        assert_eq!(session.lock().await.history().len(), 1);
        assert_eq!(session.lock().await.history().records()[0], analysis.record);
    }

    #[tokio::test]
    async fn test_same_seed_same_outcome() {
        let survey = SurveyResponse::uniform(false, Scale::new(4).unwrap());
        let mut rates = Vec::new();
        for _ in 0..2 {
            let tracker = Tracker::new(backend_with(Ok("r")), Some(2024));
            let session = AsyncMutex::new(Session::new());
            tracker.recommend(&session, 35.0, "").await.unwrap();
            rates.push(tracker.analyze(&session, 0, &survey).await.unwrap().score.new_rate);
        }
        assert_eq!(rates[0], rates[1]);
    }

    #[tokio::test]
    async fn test_report_failure_keeps_score() {
        let tracker = Tracker::new(backend_with(Err(())), Some(3));
        let session = AsyncMutex::new(Session::new());
        tracker.recommend(&session, 20.0, "").await.unwrap();

        let survey = SurveyResponse::uniform(true, Scale::new(6).unwrap());
        let analysis = tracker.analyze(&session, 0, &survey).await.unwrap();
        assert!(analysis.report.is_none());
        assert!(analysis.report_error.unwrap().contains("503"));
        assert_eq!(session.lock().await.history().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_requires_measures() {
        let tracker = Tracker::new(Arc::new(MockCompletionBackend::new()), None);
        let session = AsyncMutex::new(Session::new());
        let survey = SurveyResponse::uniform(true, Scale::new(5).unwrap());
        let err = tracker.analyze(&session, 0, &survey).await.unwrap_err();
        assert!(matches!(err, TrackerError::NoMeasures));
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_index() {
        let tracker = Tracker::new(backend_with(Ok("r")), Some(1));
        let session = AsyncMutex::new(Session::new());
        tracker.recommend(&session, 20.0, "").await.unwrap();

        let survey = SurveyResponse::uniform(true, Scale::new(5).unwrap());
        let err = tracker.analyze(&session, 7, &survey).await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidSelection { index: 7, available: 2 }));
        assert!(session.lock().await.history().is_empty());
    }

    #[tokio::test]
    async fn test_failed_recommendation_records_nothing() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(|_, _| Err(LlmError::MissingApiKey("GROQ_API_KEY".into())));
        let tracker = Tracker::new(Arc::new(backend), None);
        let session = AsyncMutex::new(Session::new());

        assert!(tracker.recommend(&session, 20.0, "").await.is_err());
        assert!(session.lock().await.latest_measures().is_none());
    }

    #[tokio::test]
    async fn test_session_unlocked_during_model_calls() {
        let session = Arc::new(AsyncMutex::new(Session::new()));
        let mut backend = MockCompletionBackend::new();

        let handle = session.clone();
        backend
            .expect_complete()
            .withf(|system, _| system.starts_with("You are a student advisor"))
            .returning(move |_, _| match handle.try_lock() {
                Ok(_) => Ok(MEASURES.to_string()),
                Err(_) => Err(LlmError::Malformed("session locked".into())),
            });
        let handle = session.clone();
        backend
            .expect_complete()
            .withf(|system, _| system.starts_with("You are an analytics bot"))
            .returning(move |_, _| match handle.try_lock() {
                Ok(_) => Ok("unlocked".to_string()),
                Err(_) => Err(LlmError::Malformed("session locked".into())),
            });

        let tracker = Tracker::new(Arc::new(backend), Some(5));
        tracker.recommend(&session, 25.0, "").await.unwrap();
        let survey = SurveyResponse::uniform(true, Scale::new(7).unwrap());
        let analysis = tracker.analyze(&session, 0, &survey).await.unwrap();

        assert_eq!(analysis.report.as_deref(), Some("unlocked"));
        assert_eq!(session.lock().await.history().len(), 1);
    }
}
