//! The `/api` routes.
//!
//! Every response body carries `success`. Failures are
//! `{"success": false, "error": "..."}` with a 4xx or 5xx status.

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use promptseq_core::error::Error;
use promptseq_core::prompt::PromptSpec;
use promptseq_sequencer::csv::{self, CsvError};
use promptseq_sequencer::{ExecuteRequest, ExecuteResponse, execute_request};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::SharedState;

pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .route("/template", get(template_handler))
        .route("/csv/import", post(csv_import_handler))
        .route("/csv/export", post(csv_export_handler))
        .with_state(state)
}

/// Error body shared by every `/api` route.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    error: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    }
}

impl From<CsvError> for ApiError {
    fn from(err: CsvError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

#[derive(Serialize)]
struct ExecuteSuccess {
    success: bool,
    #[serde(flatten)]
    response: ExecuteResponse,
}

async fn execute_handler(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecuteSuccess>, ApiError> {
    let Json(body) = payload?;
    let request = ExecuteRequest::from_value(body)?;
    let prompts = request.prompts.len();

    let response = execute_request(state.provider.clone(), request, &state.prompt_defaults())
        .await
        .map_err(|e| {
            error!(error = %e, "Execution error");
            ApiError::from(e)
        })?;

    info!(
        prompts,
        memory_entries = response.memory_log.len(),
        "Sequence executed via API"
    );

    Ok(Json(ExecuteSuccess {
        success: true,
        response,
    }))
}

fn csv_response(body: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

async fn template_handler() -> Response {
    csv_response(csv::template(), "template.csv")
}

#[derive(Serialize)]
struct ImportResponse {
    success: bool,
    prompts: Vec<PromptSpec>,
}

async fn csv_import_handler(
    State(state): State<SharedState>,
    body: String,
) -> Result<Json<ImportResponse>, ApiError> {
    let prompts = csv::parse_prompts(&body, &state.prompt_defaults())?;
    Ok(Json(ImportResponse {
        success: true,
        prompts,
    }))
}

async fn csv_export_handler(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = ExecuteRequest::from_value(body)?;
    let defaults = state.prompt_defaults();

    let prompts = request
        .prompts
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.normalize_with(&defaults).map_err(|e| e.at_prompt(i + 1)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(Error::from)?;

    Ok(csv_response(csv::to_csv(&prompts), "prompts.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::test_support::{MockProvider, state_with};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn execute_returns_results_and_memory() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let body = serde_json::json!({
            "prompts": [
                {"role": "user", "content": "Hi", "useMemory": false},
                {"role": "user", "content": "Follow up", "useMemory": true}
            ],
            "globalContext": "Be brief."
        });

        let (status, body) = send(app, post_json("/api/execute", body)).await;
        assert_eq!(status, StatusCode::OK);

        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["results"][0]["content"], "reply 1");
        assert_eq!(json["results"][1]["sequenceNumber"], 2);
        assert_eq!(json["results"][1]["status"], "complete");
        assert_eq!(json["memoryLog"].as_array().unwrap().len(), 4);
        assert_eq!(json["memoryLog"][1]["role"], "assistant");
    }

    #[tokio::test]
    async fn execute_rejects_missing_prompts() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let (status, body) =
            send(app, post_json("/api/execute", serde_json::json!({"foo": 1}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Validation error: Invalid prompts data");
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_json_error() {
        for uri in ["/api/execute", "/api/csv/export"] {
            let app = build_router(state_with(Arc::new(MockProvider::new())));
            let req = Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap();

            let response = app.oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()["content-type"], "application/json");

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let json: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(json["success"], false);
            assert!(json["error"].as_str().unwrap().starts_with("Invalid request body"));
        }
    }

    #[tokio::test]
    async fn missing_content_type_is_a_json_error() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let req = Request::builder()
            .method("POST")
            .uri("/api/execute")
            .body(Body::from(r#"{"prompts": []}"#))
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn mistyped_prompt_is_bad_request_with_position() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let body = serde_json::json!({"prompts": [{"content": 5}]});

        let (status, body) = send(app, post_json("/api/execute", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Prompt 1:"));
    }

    #[tokio::test]
    async fn execute_rejects_invalid_role_without_calling_provider() {
        let provider = Arc::new(MockProvider::new());
        let app = build_router(state_with(provider.clone()));
        let body = serde_json::json!({"prompts": [{"role": "bogus", "content": "x"}]});

        let (status, body) = send(app, post_json("/api/execute", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("Invalid role: bogus"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn execute_step_failure_is_server_error() {
        let provider = Arc::new(MockProvider::failing_on(2));
        let app = build_router(state_with(provider.clone()));
        let body = serde_json::json!({
            "prompts": [{"content": "1"}, {"content": "2"}, {"content": "3"}]
        });

        let (status, body) = send(app, post_json("/api/execute", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().starts_with("Error in step 2:"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn template_is_csv() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let req = Request::builder()
            .uri("/api/template")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/csv");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), csv::template());
    }

    #[tokio::test]
    async fn csv_import_returns_normalized_prompts() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let req = Request::builder()
            .method("POST")
            .uri("/api/csv/import")
            .header("Content-Type", "text/csv")
            .body(Body::from(
                "Role,Model,Max Tokens,Temperature,useMemory,predecessor,content\n\
                 system,gpt-4,,0.5,false,false,\"Setup\"\n\
                 user,,,,true,false,\"Ask\"\n",
            ))
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["prompts"].as_array().unwrap().len(), 2);
        assert_eq!(json["prompts"][0]["role"], "system");
        assert_eq!(json["prompts"][1]["model"], "gpt-3.5-turbo");
        assert_eq!(json["prompts"][1]["useMemory"], true);
    }

    #[tokio::test]
    async fn csv_import_reports_bad_input() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let req = Request::builder()
            .method("POST")
            .uri("/api/csv/import")
            .body(Body::from("user,gpt-4,,1,false,false,\"open"))
            .unwrap();

        let (status, body) = send(app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("line 1"));
    }

    #[tokio::test]
    async fn csv_export_writes_rows() {
        let app = build_router(state_with(Arc::new(MockProvider::new())));
        let body = serde_json::json!({
            "prompts": [{"role": "assistant", "content": "He said \"hi\"", "maxTokens": 64}]
        });

        let (status, body) = send(app, post_json("/api/csv/export", body)).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text.lines().nth(1),
            Some(r#"assistant,gpt-3.5-turbo,64,1,false,false,"He said ""hi""""#)
        );
    }
}
