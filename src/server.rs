//! HTTP surface: the prediction form and a small JSON API

use crate::form::{build_fields, render_page, FormField};
use crate::metrics::{MetricsSnapshot, PredictionMetrics};
use crate::models::inference::{InferenceEngine, ModelInfo};
use crate::presenter::{present_result, Message};
use crate::types::prediction::PredictionOutcome;
use crate::types::record::ClientRecord;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{http::header::ContentType, web, HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// State shared by all workers
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<PredictionMetrics>,
    pub title: String,
    fields: Vec<FormField>,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<PredictionMetrics>, title: String) -> Self {
        let fields = build_fields(engine.schema(), engine.feature_names(), engine.form_mode());
        Self {
            engine,
            metrics,
            title,
            fields,
        }
    }

    fn page(&self, values: &HashMap<String, String>, messages: &[Message]) -> HttpResponse {
        HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(render_page(&self.title, &self.fields, values, messages))
    }
}

/// JSON envelope for API responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
    pub execution_time_ms: Option<u64>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    pub fn error(message: &str) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            execution_time_ms: None,
        }
    }

    fn timed(mut self, start: Instant) -> Self {
        self.execution_time_ms = Some(start.elapsed().as_millis() as u64);
        self
    }
}

/// Body of a successful `/api/predict` call
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub outcome: PredictionOutcome,
    pub messages: Vec<Message>,
}

/// Run a prediction on the blocking pool and record it.
async fn run_prediction<F>(state: &AppState, predict: F) -> anyhow::Result<PredictionOutcome>
where
    F: FnOnce(&InferenceEngine) -> anyhow::Result<PredictionOutcome> + Send + 'static,
{
    let start = Instant::now();
    let engine = state.engine.clone();

    let result = match web::block(move || predict(&engine)).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Blocking prediction task failed");
            Err(anyhow::anyhow!("prediction task failed: {}", e))
        }
    };

    match &result {
        Ok(outcome) => {
            state.metrics.record_prediction(start.elapsed(), outcome);
            info!(
                prediction_id = %outcome.prediction_id,
                label = %outcome.label,
                probability_yes = ?outcome.probability_yes,
                zero_filled = outcome.zero_filled.len(),
                "Prediction served"
            );
        }
        Err(e) => {
            state.metrics.record_failure(start.elapsed());
            warn!(error = %format!("{:#}", e), "Prediction failed");
        }
    }

    result
}

async fn index(state: web::Data<AppState>) -> impl Responder {
    state.page(&HashMap::new(), &[])
}

async fn predict_form(
    state: web::Data<AppState>,
    form: web::Form<HashMap<String, String>>,
) -> impl Responder {
    let values = form.into_inner();
    let inputs = values.clone();

    let result = run_prediction(&state, move |engine| engine.predict_form(inputs)).await;
    state.page(&values, &present_result(&result))
}

async fn predict_api(
    state: web::Data<AppState>,
    record: web::Json<ClientRecord>,
) -> impl Responder {
    let start = Instant::now();
    let record = record.into_inner();

    let result = run_prediction(&state, move |engine| engine.predict_record(record)).await;
    let messages = present_result(&result);

    match result {
        Ok(outcome) => HttpResponse::Ok()
            .json(ApiResponse::success(PredictResponse { outcome, messages }).timed(start)),
        Err(_) => {
            let text = messages.first().map(|m| m.text.as_str()).unwrap_or_default();
            HttpResponse::UnprocessableEntity()
                .json(ApiResponse::<PredictResponse>::error(text).timed(start))
        }
    }
}

async fn model_info(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::<ModelInfo>::success(state.engine.model_info()))
}

async fn metrics(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::<MetricsSnapshot>::success(state.metrics.snapshot()))
}

async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({
        "status": "ok",
        "model": state.engine.model_name(),
    })))
}

/// Bodies the JSON extractor rejects get the same 422 envelope as failed predictions
fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    if let Some(state) = req.app_data::<web::Data<AppState>>() {
        state.metrics.record_failure(std::time::Duration::ZERO);
    }
    warn!(error = %err, "Rejected prediction request body");

    let message = Message::failure(&anyhow::anyhow!("invalid request body: {}", err));
    let response =
        HttpResponse::UnprocessableEntity().json(ApiResponse::<PredictResponse>::error(&message.text));
    InternalError::from_response(err, response).into()
}

/// Register all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/predict", web::post().to(predict_form))
        .service(
            web::resource("/api/predict")
                .app_data(web::JsonConfig::default().error_handler(json_error))
                .route(web::post().to(predict_api)),
        )
        .route("/api/model", web::get().to(model_info))
        .route("/api/metrics", web::get().to(metrics))
        .route("/health", web::get().to(health));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::tests::tree_engine;
    use actix_web::{http::StatusCode, test, App};

    fn state() -> web::Data<AppState> {
        web::Data::new(AppState::new(
            Arc::new(tree_engine()),
            Arc::new(PredictionMetrics::new()),
            "Bank Term Deposit Prediction".to_string(),
        ))
    }

    #[actix_web::test]
    async fn test_index_renders_model_fields() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let html = String::from_utf8(body.to_vec()).unwrap();

        assert!(html.contains(r#"name="age""#));
        assert!(html.contains(r#"name="duration""#));
        assert!(html.contains(r#"name="poutcome""#));
        assert!(!html.contains(r#"name="euribor3m""#));
    }

    #[actix_web::test]
    async fn test_form_prediction() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form([("age", "35"), ("duration", "120"), ("poutcome", "success")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("The client is likely to subscribe to a term deposit."));
        assert!(html.contains("Probability of &#39;yes&#39;: 80.00%"));
        assert!(html.contains(r#"value="120""#));
        assert_eq!(state.metrics.snapshot().predictions, 1);
    }

    #[actix_web::test]
    async fn test_form_failure_is_warning() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form([("age", "35"), ("duration", "120"), ("poutcome", "maybe")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("An error occurred: unknown category"));
        assert_eq!(state.metrics.snapshot().failures, 1);
    }

    #[actix_web::test]
    async fn test_empty_form_is_warning() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_form([("age", ""), ("duration", ""), ("poutcome", "")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("An error occurred: no value given for column &#39;age&#39;"));
        assert!(!html.contains("likely to subscribe"));
        assert!(!html.contains("Probability of"));
        assert_eq!(state.metrics.snapshot().predictions, 0);
        assert_eq!(state.metrics.snapshot().failures, 1);
    }

    #[actix_web::test]
    async fn test_api_predict() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({"age": 60, "duration": 40, "poutcome": "failure"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["outcome"]["label"], "no");
        assert_eq!(
            body["data"]["messages"][0]["text"],
            "The client is not likely to subscribe."
        );
    }

    #[actix_web::test]
    async fn test_api_predict_failure() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({"age": "old", "duration": 40, "poutcome": "failure"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: could not convert 'old'"));
    }

    #[actix_web::test]
    async fn test_api_predict_unreadable_body() {
        let state = state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/predict")
            .set_json(serde_json::json!({"age": true, "duration": 40}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: invalid request body"));
        assert_eq!(state.metrics.snapshot().failures, 1);
    }

    #[actix_web::test]
    async fn test_model_info_and_health() {
        let app = test::init_service(App::new().app_data(state()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/model").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "test_tree");
        assert_eq!(body["data"]["kind"], "decision_tree");
        assert_eq!(body["data"]["predict_proba"], true);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "ok");
    }
}
