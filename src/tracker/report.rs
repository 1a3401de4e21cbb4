//! Narrative report for a scored intervention

use tracing::debug;

use crate::llm::prompts::{report_prompt, ANALYST_SYSTEM_PROMPT};
use crate::llm::{CompletionBackend, LlmError};

/// Ask the analyst role to narrate a rate change. The text is returned as-is
/// and never stored in the history.
pub async fn narrate(
    backend: &dyn CompletionBackend,
    measure: &str,
    initial_rate: f64,
    rate_change: f64,
    feedback: &str,
) -> Result<String, LlmError> {
    let prompt = report_prompt(measure, initial_rate, rate_change, feedback);
    debug!("Requesting report for measure: {}", crate::truncate_safe(measure, 60));
    backend.complete(ANALYST_SYSTEM_PROMPT, &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockCompletionBackend;

    #[tokio::test]
    async fn test_narrate_uses_analyst_role() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|system, prompt| {
                system.starts_with("You are an analytics bot")
                    && prompt.contains("- Implementation: [Mentoring] Peer mentors")
                    && prompt.contains("- Key Observation: Mentoring program showed varying results")
            })
            .times(1)
            .returning(|_, _| Ok("1. Rate Change Summary\nThe rate fell.".to_string()));

        let report = narrate(&backend, "[Mentoring] Peer mentors", 30.0, 4.5, "Mentoring program showed varying results")
            .await
            .unwrap();
        assert!(report.starts_with("1. Rate Change Summary"));
    }

    #[tokio::test]
    async fn test_narrate_error_is_returned() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .returning(|_, _| Err(LlmError::Malformed("empty".into())));

        assert!(narrate(&backend, "m", 10.0, 1.0, "f").await.is_err());
    }
}
