//! Integration tests for the HTTP API:
//! - session lifecycle: measures, analysis, history, CSV download
//! - error mapping for unknown sessions and failing model calls
//! - survey validation at the JSON boundary

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use dropout_tracker::llm::prompts::ADVISOR_SYSTEM_PROMPT;
use dropout_tracker::server::{router, ServerState};
use dropout_tracker::tracker::history::History;
use dropout_tracker::tracker::survey::{QuestionKind, SurveyField};
use dropout_tracker::{ChatClient, CompletionBackend, Config, LlmError};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower::ServiceExt;

const MEASURES: &str = "1. [Counseling] Weekly one-on-one check-ins\n\n\
2. [Mentoring] Pair with a senior peer mentor\n\
3. [Academic Support] After-school tutoring in math\n\
4. [Financial Aid] Transport stipend\n\
5. [Monitoring] Daily attendance alerts to guardians\n";

/// Backend that answers from a script instead of the network
struct ScriptedBackend {
    fail: bool,
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, system: &str, _prompt: &str) -> Result<String, LlmError> {
        if self.fail {
            return Err(LlmError::Status { status: 500, body: "upstream down".into() });
        }
        if system == ADVISOR_SYSTEM_PROMPT {
            Ok(MEASURES.to_string())
        } else {
            Ok("1. Rate Change Summary\nThe dropout rate moved.".to_string())
        }
    }
}

fn app(fail: bool) -> Router {
    let mut config = Config::default();
    config.scoring.seed = Some(42);
    router(ServerState::new(config, Arc::new(ScriptedBackend { fail })))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>, Option<String>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec(), content_type)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes, _) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send_json(app, "POST", "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_id"].as_str().unwrap().to_string()
}

/// Survey as the form posts it: "True"/"False" strings and integer scales
fn survey(choice: &str, scale: u8) -> Value {
    let mut map = Map::new();
    for field in SurveyField::ALL {
        let key = serde_json::to_value(field).unwrap().as_str().unwrap().to_string();
        let value = match field.kind() {
            QuestionKind::Choice { .. } => json!(choice),
            QuestionKind::Scale => json!(scale),
        };
        map.insert(key, value);
    }
    Value::Object(map)
}

// =====================================================================
// SESSION LIFECYCLE
// =====================================================================

#[tokio::test]
async fn test_status_and_survey_catalog() {
    let app = app(false);

    let (status, body) = send_json(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send_json(&app, "GET", "/api/survey", None).await;
    assert_eq!(status, StatusCode::OK);
    let questions = body.as_array().unwrap();
    assert_eq!(questions.len(), 23);
    assert_eq!(questions[0]["key"], "attendance_improved");
    assert_eq!(questions[0]["section"], "1. Attendance");
}

#[tokio::test]
async fn test_full_session_flow_and_csv_download() {
    let app = app(false);
    let id = new_session(&app).await;

    let (status, record) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", id),
        Some(json!({ "rate": 50.0, "factors": "long commutes, part-time jobs" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let measures = record["measures"].as_array().unwrap();
    assert_eq!(measures.len(), 5);
    assert_eq!(measures[2], "3. [Academic Support] After-school tutoring in math");
    assert_eq!(record["reported_rate"], 50.0);

    let (status, latest) =
        send_json(&app, "GET", &format!("/api/sessions/{}/measures/latest", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["measures"], record["measures"]);

    let (status, analysis) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/analyze", id),
        Some(json!({ "measure_index": 2, "survey": survey("True", 10) })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["score"]["feedback"], "Academic support services impact observed");
    assert!((analysis["score"]["weighted_score"].as_f64().unwrap() - 51.0).abs() < 1e-9);
    assert!(analysis["report"].as_str().unwrap().starts_with("1. Rate Change Summary"));
    assert!(analysis["report_error"].is_null());

    let new_rate = analysis["score"]["new_rate"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&new_rate));
    assert!(analysis["score"]["rate_change"].as_f64().unwrap() >= 0.0);

    let (status, history) =
        send_json(&app, "GET", &format!("/api/sessions/{}/history", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["title"].as_str().unwrap().starts_with("Measure: 3. [Academic Support]"));
    assert_eq!(entries[0]["initial_rate"], "50.0%");

    let (status, bytes, content_type) =
        send(&app, "GET", &format!("/api/sessions/{}/history.csv", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv"));
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with("date,measure,initial_rate,final_rate,rate_change,feedback,feedback_scores"));

    let parsed = History::from_csv(&text).unwrap();
    assert_eq!(parsed.len(), 1);
    let row = &parsed.records()[0];
    assert_eq!(row.measure, "3. [Academic Support] After-school tutoring in math");
    assert_eq!(row.initial_rate, 50.0);
    assert_eq!(row.feedback_scores.len(), 23);
    let (first, _) = row.feedback_scores.iter().next().unwrap();
    assert_eq!(first, SurveyField::AttendanceConsistency);
}

#[tokio::test]
async fn test_history_is_newest_first_and_per_session() {
    let app = app(false);
    let a = new_session(&app).await;
    let b = new_session(&app).await;

    send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", a),
        Some(json!({ "rate": 30.0, "factors": "" })),
    )
    .await;
    for index in [0, 4] {
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/sessions/{}/analyze", a),
            Some(json!({ "measure_index": index, "survey": survey("False", 3) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, history) = send_json(&app, "GET", &format!("/api/sessions/{}/history", a), None).await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["feedback"], "Monitoring showed mixed results");
    assert_eq!(entries[1]["feedback"], "Individual counseling sessions impact varied");

    let (_, other) = send_json(&app, "GET", &format!("/api/sessions/{}/history", b), None).await;
    assert!(other.as_array().unwrap().is_empty());
}

// =====================================================================
// ERROR MAPPING
// =====================================================================

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = app(false);
    let uri = "/api/sessions/00000000-0000-4000-8000-000000000000/history";
    let (status, body) = send_json(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");
}

#[tokio::test]
async fn test_failing_backend_is_bad_gateway_and_records_nothing() {
    let app = app(true);
    let id = new_session(&app).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", id),
        Some(json!({ "rate": 20.0, "factors": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["details"].as_str().unwrap().contains("500"));

    let (status, _) =
        send_json(&app, "GET", &format!("/api/sessions/{}/measures/latest", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_analyze_before_measures_and_bad_index() {
    let app = app(false);
    let id = new_session(&app).await;
    let uri = format!("/api/sessions/{}/analyze", id);

    let (status, _) = send_json(
        &app,
        "POST",
        &uri,
        Some(json!({ "measure_index": 0, "survey": survey("True", 5) })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", id),
        Some(json!({ "rate": 20.0, "factors": "" })),
    )
    .await;
    let (status, _) = send_json(
        &app,
        "POST",
        &uri,
        Some(json!({ "measure_index": 9, "survey": survey("True", 5) })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_out_of_range_scale_is_rejected() {
    let app = app(false);
    let id = new_session(&app).await;
    send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", id),
        Some(json!({ "rate": 20.0, "factors": "" })),
    )
    .await;

    let mut answers = survey("True", 5);
    answers["overall_progress"] = json!(11);
    let (status, _, _) = send(
        &app,
        "POST",
        &format!("/api/sessions/{}/analyze", id),
        Some(json!({ "measure_index": 0, "survey": answers })),
    )
    .await;
    assert!(status.is_client_error());

    let (_, history) = send_json(&app, "GET", &format!("/api/sessions/{}/history", id), None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_api_key_is_service_unavailable() {
    let mut config = Config::default();
    config.llm.api_key_env = "DROPOUT_TRACKER_TEST_UNSET_KEY".to_string();
    let client = ChatClient::from_config(&config.llm).unwrap();
    let app = router(ServerState::new(config, Arc::new(client)));
    let id = new_session(&app).await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/sessions/{}/measures", id),
        Some(json!({ "rate": 20.0, "factors": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Language model not configured");
    assert!(body["details"].as_str().unwrap().contains("DROPOUT_TRACKER_TEST_UNSET_KEY"));
}
