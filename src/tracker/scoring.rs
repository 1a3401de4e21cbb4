//! Improvement scoring
//!
//! Turns a survey response into per-question contributions, folds them into a
//! raw weighted score, blends that with a randomized base improvement drawn
//! for the measure's category, and applies the result to the dropout rate.
//!
//! The random source is always passed in so callers decide between an
//! OS-seeded generator and a fixed seed.

use rand::Rng;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::survey::{Answer, QuestionKind, SurveyField, SurveyResponse};

/// Contribution of a favourable yes/no answer
pub const CHOICE_POSITIVE: i32 = 20;
/// Contribution of an unfavourable yes/no answer
pub const CHOICE_NEGATIVE: i32 = -40;
/// Probability that a category draw is flipped into a decline
pub const NEGATION_PROBABILITY: f64 = 0.4;
/// Divisor applied to the weighted survey score before blending
pub const SURVEY_DIVISOR: f64 = 1.5;

/// Base improvement range for a measure category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryRange {
    /// Lowercase keyword searched for in the measure text
    pub keyword: &'static str,
    pub min: f64,
    pub max: f64,
    pub feedback: &'static str,
}

/// Lookup table, searched in order; the first keyword found wins.
pub static IMPROVEMENT_TABLE: [CategoryRange; 6] = [
    CategoryRange { keyword: "counseling", min: 5.0, max: 30.0, feedback: "Individual counseling sessions impact varied" },
    CategoryRange { keyword: "mentoring", min: 10.0, max: 35.0, feedback: "Mentoring program showed varying results" },
    CategoryRange { keyword: "academic support", min: 15.0, max: 40.0, feedback: "Academic support services impact observed" },
    CategoryRange { keyword: "financial aid", min: 20.0, max: 45.0, feedback: "Financial assistance impact noted" },
    CategoryRange { keyword: "engagement", min: 10.0, max: 35.0, feedback: "Engagement changes affected attendance" },
    CategoryRange { keyword: "monitoring", min: 5.0, max: 30.0, feedback: "Monitoring showed mixed results" },
];

/// Range used when no category keyword matches
pub const GENERAL_RANGE: (f64, f64) = (-25.0, 25.0);
pub const GENERAL_FEEDBACK: &str = "General impact observed";

/// Per-question contributions, kept in form order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedbackScores(Vec<(SurveyField, i32)>);

impl FeedbackScores {
    pub fn get(&self, field: SurveyField) -> Option<i32> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SurveyField, i32)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SurveyField, i32)> for FeedbackScores {
    fn from_iter<I: IntoIterator<Item = (SurveyField, i32)>>(iter: I) -> Self {
        FeedbackScores(iter.into_iter().collect())
    }
}

impl Serialize for FeedbackScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in &self.0 {
            map.serialize_entry(field.score_key(), value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FeedbackScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = FeedbackScores;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of survey score keys to integer contributions")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, i32>()? {
                    let field = SurveyField::from_score_key(&key).ok_or_else(|| {
                        serde::de::Error::custom(format!("unknown survey score key: {}", key))
                    })?;
                    entries.push((field, value));
                }
                Ok(FeedbackScores(entries))
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// Direction of the rate change as displayed next to the magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "-")]
    Down,
    #[serde(rename = "+")]
    Up,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Down => f.write_str("-"),
            Direction::Up => f.write_str("+"),
        }
    }
}

/// Overall verdict shown with the metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Improvement,
    Decline,
}

impl Status {
    /// A higher dropout rate is a decline; unchanged counts as improvement.
    pub fn from_rates(initial_rate: f64, new_rate: f64) -> Self {
        if new_rate > initial_rate {
            Status::Decline
        } else {
            Status::Improvement
        }
    }
}

/// Result of applying an adjusted improvement to a rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateUpdate {
    pub new_rate: f64,
    /// Magnitude of the computed change, always >= 0
    pub rate_change: f64,
    pub direction: Direction,
}

/// Everything produced by one scoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreOutcome {
    pub initial_rate: f64,
    pub new_rate: f64,
    pub rate_change: f64,
    pub direction: Direction,
    pub status: Status,
    pub base_improvement: f64,
    pub weighted_score: f64,
    pub adjusted_improvement: f64,
    pub feedback: String,
    pub feedback_scores: FeedbackScores,
}

/// Contribution of a single answer
pub fn contribution(field: SurveyField, answer: Answer) -> i32 {
    match answer {
        Answer::Choice(value) => {
            let inverted = matches!(field.kind(), QuestionKind::Choice { inverted: true });
            if value != inverted {
                CHOICE_POSITIVE
            } else {
                CHOICE_NEGATIVE
            }
        }
        Answer::Scale(scale) => (i32::from(scale.value()) - 5) * 4,
    }
}

/// Map every survey answer to its contribution, in score order
pub fn feedback_scores(survey: &SurveyResponse) -> FeedbackScores {
    SurveyField::SCORE_ORDER
        .into_iter()
        .map(|field| (field, contribution(field, survey.answer(field))))
        .collect()
}

/// Raw weighted sum of the contributions (not normalized by total weight)
pub fn weighted_score(scores: &FeedbackScores) -> f64 {
    scores
        .iter()
        .map(|(field, value)| field.weight() * f64::from(value))
        .sum()
}

/// First table entry whose keyword occurs in the measure, case-insensitively
pub fn lookup_category(measure: &str) -> Option<&'static CategoryRange> {
    let lower = measure.to_lowercase();
    IMPROVEMENT_TABLE.iter().find(|range| lower.contains(range.keyword))
}

/// Draw the randomized base improvement for a measure
pub fn base_improvement<R: Rng + ?Sized>(measure: &str, rng: &mut R) -> (f64, &'static str) {
    match lookup_category(measure) {
        Some(range) => {
            let mut improvement = rng.random_range(range.min..=range.max);
            if rng.random_bool(NEGATION_PROBABILITY) {
                improvement = -improvement;
            }
            (improvement, range.feedback)
        }
        None => (rng.random_range(GENERAL_RANGE.0..=GENERAL_RANGE.1), GENERAL_FEEDBACK),
    }
}

/// Blend the base draw with the survey score
pub fn adjusted_improvement(base: f64, weighted: f64) -> f64 {
    base + weighted / SURVEY_DIVISOR
}

/// Apply an adjusted improvement (percent of the current rate) to a rate.
///
/// Positive improvement lowers the dropout rate. The new rate is clamped to
/// [0, 100]; the reported change is the unclamped magnitude.
pub fn apply_improvement(initial_rate: f64, adjusted: f64) -> RateUpdate {
    let rate_change = (adjusted / 100.0) * initial_rate;
    let new_rate = (initial_rate - rate_change).clamp(0.0, 100.0);
    let direction = if new_rate < initial_rate { Direction::Down } else { Direction::Up };

    RateUpdate {
        new_rate,
        rate_change: rate_change.abs(),
        direction,
    }
}

/// Run the full scoring pass for one survey
pub fn score<R: Rng + ?Sized>(
    survey: &SurveyResponse,
    measure: &str,
    initial_rate: f64,
    rng: &mut R,
) -> ScoreOutcome {
    let feedback_scores = feedback_scores(survey);
    let weighted = weighted_score(&feedback_scores);
    let (base, feedback) = base_improvement(measure, rng);
    let adjusted = adjusted_improvement(base, weighted);
    let update = apply_improvement(initial_rate, adjusted);

    tracing::debug!(
        base, weighted, adjusted, new_rate = update.new_rate,
        "Scored survey for measure"
    );

    ScoreOutcome {
        initial_rate,
        new_rate: update.new_rate,
        rate_change: update.rate_change,
        direction: update.direction,
        status: Status::from_rates(initial_rate, update.new_rate),
        base_improvement: base,
        weighted_score: weighted,
        adjusted_improvement: adjusted,
        feedback: feedback.to_string(),
        feedback_scores,
    }
}
