//! API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! The blob proxy route exists only in development mode.

use axum::routing::{get, put};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the screening API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn screening_api_router(ctx: ApiContext) -> Router {
    let mut api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/config", get(endpoints::documents::config))
        .route(
            "/analysis",
            get(endpoints::analysis::status)
                .post(endpoints::analysis::start)
                .delete(endpoints::analysis::reset),
        )
        .route("/screening", get(endpoints::screening::snapshot))
        .route(
            "/screening/indicators/:id/locations",
            get(endpoints::screening::locations),
        )
        .route(
            "/screening/indicators/:id/feedback",
            put(endpoints::screening::feedback),
        )
        .route(
            "/screening/indicators/:id/decision",
            put(endpoints::screening::decision),
        )
        .route(
            "/documents/display-url",
            get(endpoints::documents::display_url),
        );

    if ctx.config.proxy.dev_mode {
        api = api.route("/blob/*path", get(endpoints::blob::forward));
    }

    Router::new()
        .nest("/api", api.with_state(ctx))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{AppConfig, ProxySettings};
    use crate::pipeline::analysis::{AnalysisError, AnalysisOrchestrator, ExtractionService};
    use crate::pipeline::runner::ScreeningRunner;
    use crate::pipeline::screening::{RuleBook, ScreeningIndicator, ScreeningResult, ScreeningStatus};
    use crate::pipeline::validation::{
        JudgmentRequest, JudgmentService, RuleValidator, ValidationError, ValidationResult,
    };
    use crate::session::ScreeningSession;

    struct Unreachable;

    #[async_trait]
    impl ExtractionService for Unreachable {
        fn check_configured(&self) -> Result<(), AnalysisError> {
            Ok(())
        }

        fn analyzer_id(&self) -> &str {
            "prefilter"
        }

        async fn submit(&self, _document_url: &str) -> Result<Value, AnalysisError> {
            Err(AnalysisError::Transport("offline".into()))
        }

        async fn fetch_result(&self, _job_id: &str) -> Result<Value, AnalysisError> {
            Err(AnalysisError::Transport("offline".into()))
        }
    }

    #[async_trait]
    impl JudgmentService for Unreachable {
        async fn judge(&self, _request: &JudgmentRequest) -> Result<String, ValidationError> {
            Err(ValidationError::Transport("offline".into()))
        }
    }

    fn context(config: AppConfig) -> ApiContext {
        let runner = ScreeningRunner::new(
            Arc::new(ScreeningSession::new()),
            AnalysisOrchestrator::with_polling(Arc::new(Unreachable), Duration::from_millis(1), 1),
            RuleValidator::new(Arc::new(Unreachable)),
            Arc::new(RuleBook::builtin()),
        );
        ApiContext::new(Arc::new(runner), Arc::new(config)).unwrap()
    }

    fn indicator(id: &str) -> ScreeningIndicator {
        ScreeningIndicator {
            id: id.into(),
            field_name: id.into(),
            display_name: id.into(),
            value: "x".into(),
            status: ScreeningStatus::Pass,
            confidence: Some(0.9),
            rule: Some("rule".into()),
            context: None,
            criteria: String::new(),
            note: None,
            source_locations: vec![],
        }
    }

    /// Context whose session already holds a validated result.
    fn validated_context() -> ApiContext {
        let ctx = context(AppConfig::default());
        let session = ctx.session();
        let generation = session.begin("https://docs/a.pdf").unwrap();
        session
            .store_result(
                generation,
                ScreeningResult {
                    indicators: vec![indicator("gender"), indicator("temperature")],
                    ..ScreeningResult::default()
                },
            )
            .unwrap();
        session
            .store_validations(
                generation,
                HashMap::from([
                    (
                        "gender".to_string(),
                        ValidationResult {
                            status: ScreeningStatus::Pass,
                            reason: "male".into(),
                        },
                    ),
                    ("temperature".to_string(), ValidationResult::warning("check")),
                ]),
            )
            .unwrap();
        ctx
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_response_shape() {
        let app = screening_api_router(context(AppConfig::default()));
        let (status, json) = send(app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["name"], "Prescreen");
        assert!(json["sessionId"].is_string());
    }

    #[tokio::test]
    async fn start_without_url_or_demo_is_rejected() {
        let app = screening_api_router(context(AppConfig::default()));
        let (status, json) = send(app, "POST", "/api/analysis", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]["message"].as_str().unwrap().contains("documentUrl"));
    }

    #[tokio::test]
    async fn start_with_malformed_body_is_rejected() {
        let app = screening_api_router(context(AppConfig::default()));
        let req = Request::builder()
            .method("POST")
            .uri("/api/analysis")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_falls_back_to_demo_url() {
        let config = AppConfig {
            demo_pdf_url: Some("https://docs/demo.pdf".into()),
            ..AppConfig::default()
        };
        let ctx = context(config);
        let app = screening_api_router(ctx.clone());

        let (status, json) = send(app, "POST", "/api/analysis", None).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["documentUrl"], "https://docs/demo.pdf");
        assert_eq!(json["generation"], ctx.session().generation());
    }

    #[tokio::test]
    async fn start_with_explicit_url() {
        let ctx = context(AppConfig::default());
        let app = screening_api_router(ctx);
        let (status, json) = send(
            app,
            "POST",
            "/api/analysis",
            Some(json!({"documentUrl": "https://docs/a.pdf"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["documentUrl"], "https://docs/a.pdf");
    }

    #[tokio::test]
    async fn job_status_and_reset() {
        let ctx = validated_context();
        let app = screening_api_router(ctx.clone());

        let (status, json) = send(app.clone(), "GET", "/api/analysis", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documentUrl"], "https://docs/a.pdf");
        assert_eq!(json["status"], "idle");

        let (status, _) = send(app.clone(), "DELETE", "/api/analysis", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, json) = send(app, "GET", "/api/screening", None).await;
        assert!(json["result"].is_null());
    }

    #[tokio::test]
    async fn screening_snapshot_shape() {
        let app = screening_api_router(validated_context());
        let (status, json) = send(app, "GET", "/api/screening", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["validationPhase"], "complete");
        assert_eq!(json["validations"]["gender"]["status"], "pass");
        assert_eq!(json["aiTally"]["warning"]["count"], 1);
        assert_eq!(json["verdict"]["finalPass"], 1);
        assert_eq!(json["verdict"]["undecided"], 1);
    }

    #[tokio::test]
    async fn feedback_toggles_through_api() {
        let app = screening_api_router(validated_context());
        let uri = "/api/screening/indicators/gender/feedback";

        let (status, json) = send(app.clone(), "PUT", uri, Some(json!({"feedback": "disagree"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["feedback"], "disagree");

        let (_, json) = send(app.clone(), "GET", "/api/screening", None).await;
        assert_eq!(json["verdict"]["finalFail"], 1);

        let (_, json) = send(app, "PUT", uri, Some(json!({"feedback": "disagree"}))).await;
        assert!(json["feedback"].is_null());
    }

    #[tokio::test]
    async fn decision_rejected_for_non_warning() {
        let app = screening_api_router(validated_context());
        let (status, json) = send(
            app,
            "PUT",
            "/api/screening/indicators/gender/decision",
            Some(json!({"decision": "fail"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn decision_accepted_for_warning() {
        let app = screening_api_router(validated_context());
        let (status, json) = send(
            app,
            "PUT",
            "/api/screening/indicators/temperature/decision",
            Some(json!({"decision": "pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["decision"], "pass");
    }

    #[tokio::test]
    async fn unknown_indicator_locations_404() {
        let app = screening_api_router(validated_context());
        let (status, _) = send(app, "GET", "/api/screening/indicators/nope/locations", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn locations_without_result_conflict() {
        let app = screening_api_router(context(AppConfig::default()));
        let (status, json) = send(app, "GET", "/api/screening/indicators/a/locations", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "NO_RESULT");
    }

    #[tokio::test]
    async fn display_url_rewrites_in_dev() {
        let mut config = AppConfig::default();
        config.proxy.dev_mode = true;
        let app = screening_api_router(context(config));
        let (status, json) = send(
            app,
            "GET",
            "/api/documents/display-url?url=https%3A%2F%2Facct.blob.core.windows.net%2Fdocs%2Fa.pdf",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["displayUrl"], "/api/blob/docs/a.pdf");
    }

    #[tokio::test]
    async fn config_reports_demo_urls() {
        let config = AppConfig {
            demo_pdf_url: Some("https://acct.blob.core.windows.net/docs/demo.pdf".into()),
            ..AppConfig::default()
        };
        let app = screening_api_router(context(config));
        let (_, json) = send(app, "GET", "/api/config", None).await;
        assert_eq!(json["devMode"], false);
        assert_eq!(json["demoDisplayUrl"], json["demoPdfUrl"]);
    }

    /// Upstream that answers every request with its own raw path and query.
    async fn echo_upstream() -> std::net::SocketAddr {
        use axum::http::Uri;

        let echo = Router::new().fallback(|uri: Uri| async move {
            (
                [("content-type", "application/pdf")],
                uri.path_and_query().map(|pq| pq.to_string()).unwrap_or_default(),
            )
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, echo).await.unwrap();
        });
        addr
    }

    async fn fetch_blob(target: std::net::SocketAddr, uri: &str) -> (StatusCode, String, String) {
        let config = AppConfig {
            proxy: ProxySettings {
                dev_mode: true,
                blob_target: format!("http://{target}"),
            },
            ..AppConfig::default()
        };
        let app = screening_api_router(context(config));
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn blob_route_forwards_path_and_query() {
        let upstream = echo_upstream().await;
        let (status, content_type, body) =
            fetch_blob(upstream, "/api/blob/docs/record.pdf?sv=2024&sig=a%2Bb").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/pdf");
        assert_eq!(body, "/docs/record.pdf?sv=2024&sig=a%2Bb");
    }

    #[tokio::test]
    async fn blob_route_keeps_encoded_reserved_characters() {
        let upstream = echo_upstream().await;

        let (_, _, body) = fetch_blob(upstream, "/api/blob/docs/a%23b.pdf").await;
        assert_eq!(body, "/docs/a%23b.pdf");

        let (_, _, body) = fetch_blob(upstream, "/api/blob/docs/a%3Fb.pdf?sv=1").await;
        assert_eq!(body, "/docs/a%3Fb.pdf?sv=1");

        let (_, _, body) = fetch_blob(upstream, "/api/blob/docs/record%201.pdf").await;
        assert_eq!(body, "/docs/record%201.pdf");
    }

    #[tokio::test]
    async fn blob_route_reports_unreachable_upstream() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed = listener.local_addr().unwrap();
        drop(listener);

        let (status, _, _) = fetch_blob(closed, "/api/blob/docs/a.pdf").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn blob_route_absent_outside_dev() {
        let app = screening_api_router(context(AppConfig::default()));
        let (status, _) = send(app, "GET", "/api/blob/docs/a.pdf", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
