//! System roles and prompt builders for the two LLM calls

/// System role for the recommendation call
pub const ADVISOR_SYSTEM_PROMPT: &str = r#"You are a student advisor chatbot specialized in dropout prevention.
When providing preventive measures:
1. Always provide exactly 5 measures
2. Each measure must start with a category in square brackets
3. Categories must be one of: [Counseling], [Mentoring], [Academic Support], [Financial Aid], [Engagement], [Monitoring]
4. Each measure must be specific and actionable
5. Format as a numbered list"#;

/// System role for the report narration call
pub const ANALYST_SYSTEM_PROMPT: &str = r#"You are an analytics bot that evaluates student dropout rate changes.
When generating reports:
1. Start with a clear summary of the rate change
2. Analyze whether the change indicates improvement or decline
3. Provide specific observations based on the measure type
4. Give actionable recommendations
5. Include quantitative analysis where possible"#;

/// Build the user prompt asking for preventive measures
pub fn recommendation_prompt(rate: f64, factors: &str) -> String {
    format!(
        r#"The dropout rate is {rate:?}%.
The contributing factors are: {factors}.
Provide 5 specific, actionable preventive measures.
Format each measure as a numbered list with the measure type in brackets.
Example:
1. [Counseling] Implement weekly individual counseling sessions
2. [Academic Support] Provide after-school tutoring"#
    )
}

/// Build the user prompt asking for a structured rate-change analysis
pub fn report_prompt(measure: &str, initial_rate: f64, rate_change: f64, feedback: &str) -> String {
    format!(
        r#"Analyze the following dropout rate changes:

MEASURE DETAILS:
- Implementation: {measure}
- Initial Rate: {initial_rate:?}%
- Rate Change: {rate_change:.1}%
- Key Observation: {feedback}

Please provide a structured analysis following these points:
1. Rate Change Summary
   - Quantify the change
   - Indicate if this is an improvement or decline

2. Measure Effectiveness
   - Analyze why the measure succeeded or failed
   - Compare to expected outcomes

3. Specific Observations
   - Key factors contributing to the change
   - Impact on different aspects of student engagement

4. Recommendations
   - Specific actions to improve or maintain results
   - Risk mitigation strategies if needed

5. Future Outlook
   - Expected trends
   - Key areas to monitor"#
    )
}
