//! Serve command - HTTP endpoints for emotion detection and chat.
//!
//! - `POST /detect_emotion`: multipart upload with a `file` field
//! - `POST /chat`: JSON `{ user_input, emotion }`

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use clap::Args;
use moodscan_adapters::{GeminiClient, GeminiConfig};
use moodscan_core::recommend::recommend_detection;
use moodscan_core::{
    ChatError, ChatReply, ChatRequest, ChatResponder, EmotionPipeline, FaceRegion,
    InferenceError, InferenceResult, TextGenerator,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use super::chat::gemini_config;
use super::pipeline::PipelineArgs;
use crate::config::AppConfig;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Arguments for the serve command.
#[derive(Args, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Origin allowed to call the API (repeatable)
    #[arg(long = "cors-origin", value_name = "ORIGIN")]
    pub cors_origins: Vec<String>,

    /// Generative-text settings (populated by `with_config`, not from CLI).
    #[arg(skip)]
    chat: GeminiConfig,
}

impl ServeArgs {
    /// Apply configuration file values, respecting CLI precedence.
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.pipeline = self.pipeline.with_config(config);
        if self.host.is_none() {
            self.host.clone_from(&config.server.host);
        }
        self.port = self.port.or(config.server.port);
        if self.cors_origins.is_empty() {
            self.cors_origins = config.server.cors_origins.clone().unwrap_or_default();
        }
        self.chat = gemini_config(config);
        self
    }

    fn address(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or(DEFAULT_HOST),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }

    fn cors_origins(&self) -> Vec<String> {
        if self.cors_origins.is_empty() {
            vec![DEFAULT_CORS_ORIGIN.to_string()]
        } else {
            self.cors_origins.clone()
        }
    }
}

/// Run the HTTP server until interrupted.
///
/// Chat is optional: without an API key the server still answers
/// detection requests and reports chat as unavailable.
pub fn run(args: &ServeArgs) -> Result<()> {
    let config = args.pipeline.to_pipeline_config()?;
    let pipeline = EmotionPipeline::load(&config).context("Failed to load models")?;

    let chat = match GeminiClient::from_env(args.chat.clone()) {
        Ok(client) => Some(ChatResponder::new(client)),
        Err(e) => {
            warn!("Chat disabled: {e}");
            None
        }
    };

    let app = router(AppState::new(pipeline, chat), cors_layer(&args.cors_origins())?);
    let address = args.address();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;
        info!("Listening on http://{address}");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Shared, read-only server state.
pub struct AppState<G> {
    pipeline: Arc<EmotionPipeline>,
    chat: Option<Arc<ChatResponder<G>>>,
}

impl<G> AppState<G> {
    #[must_use]
    pub fn new(pipeline: EmotionPipeline, chat: Option<ChatResponder<G>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            chat: chat.map(Arc::new),
        }
    }
}

impl<G> Clone for AppState<G> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            chat: self.chat.clone(),
        }
    }
}

/// Builds the application routes.
///
/// Each route also answers with a trailing slash, which is what the web
/// dashboard posts to.
pub fn router<G>(state: AppState<G>, cors: CorsLayer) -> Router
where
    G: TextGenerator + Send + Sync + 'static,
{
    Router::new()
        .route("/detect_emotion", post(detect_emotion::<G>))
        .route("/detect_emotion/", post(detect_emotion::<G>))
        .route("/chat", post(chat::<G>))
        .route("/chat/", post(chat::<G>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// CORS policy allowing exactly `origins`, with credentials.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'")))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// Body of a successful `/detect_emotion` response.
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub detected_emotion: &'static str,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceRegion>,
    pub recommendation: &'static str,
}

impl From<&InferenceResult> for DetectResponse {
    fn from(result: &InferenceResult) -> Self {
        Self {
            detected_emotion: result.detection.as_str(),
            confidence: result.confidence,
            face: result.face,
            recommendation: recommend_detection(result.detection),
        }
    }
}

/// An error answered as `{ "error": message }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[cfg(test)]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::Decode(_) => Self::bad_request(e.to_string()),
            _ => {
                error!("Inference failed: {e}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        warn!("Chat failed: {e}");
        let status = match e {
            ChatError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChatError::Transport(_) | ChatError::Status { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

async fn detect_emotion<G>(
    State(state): State<AppState<G>>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError>
where
    G: Send + Sync + 'static,
{
    let bytes = read_file_field(&mut multipart).await?;
    let pipeline = Arc::clone(&state.pipeline);

    let result = tokio::task::spawn_blocking(move || pipeline.infer(&bytes))
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("inference task failed: {e}"),
            )
        })??;

    Ok(Json(DetectResponse::from(&result)))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::bad_request("missing multipart field 'file'"))
}

async fn chat<G>(
    State(state): State<AppState<G>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError>
where
    G: TextGenerator + Send + Sync + 'static,
{
    let Some(responder) = state.chat.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "chat is not configured",
        ));
    };
    let reply = responder.respond(&request).await?;
    Ok(Json(reply))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use moodscan_core::chat::CHAT_FALLBACK;
    use moodscan_core::{FaceSelection, LabelSet};
    use moodscan_test_support::{
        MockClassifier, MockFaceLocator, MockTextGenerator, SyntheticImageBuilder,
    };
    use serde_json::Value;

    const HAPPY: usize = 4;
    const BOUNDARY: &str = "moodscan-test-boundary";

    fn happy_pipeline() -> EmotionPipeline {
        EmotionPipeline::new(
            Box::new(MockFaceLocator::whole_image()),
            Box::new(MockClassifier::favoring(LabelSet::default(), HAPPY, 0.9)),
            FaceSelection::First,
        )
    }

    fn state(chat: Option<MockTextGenerator>) -> AppState<MockTextGenerator> {
        AppState::new(happy_pipeline(), chat.map(ChatResponder::new))
    }

    async fn spawn(state: AppState<MockTextGenerator>) -> String {
        let cors = cors_layer(&[DEFAULT_CORS_ORIGIN.to_string()]).unwrap();
        let app = router(state, cors);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn multipart(field: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"face.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(base: &str, field: &str, bytes: &[u8]) -> reqwest::Response {
        upload_to(&format!("{base}/detect_emotion"), field, bytes).await
    }

    async fn upload_to(url: &str, field: &str, bytes: &[u8]) -> reqwest::Response {
        reqwest::Client::new()
            .post(url)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart(field, bytes))
            .send()
            .await
            .unwrap()
    }

    fn face_png() -> Vec<u8> {
        SyntheticImageBuilder::png_bytes(SyntheticImageBuilder::horizontal_gradient(64, 64))
            .unwrap()
    }

    #[tokio::test]
    async fn test_detect_emotion_returns_label() {
        let base = spawn(state(None)).await;

        let response = upload(&base, "file", &face_png()).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detected_emotion"], "happy");
        assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-5);
        assert_eq!(body["face"]["width"], 64);
        assert_eq!(
            body["recommendation"],
            "Keep doing what makes you happy and share the joy with others!"
        );
    }

    #[tokio::test]
    async fn test_detect_emotion_no_face() {
        let state = AppState::<MockTextGenerator>::new(
            EmotionPipeline::new(
                Box::new(MockFaceLocator::none()),
                Box::new(MockClassifier::favoring(LabelSet::default(), HAPPY, 0.9)),
                FaceSelection::First,
            ),
            None,
        );
        let base = spawn(state).await;

        let body: Value = upload(&base, "file", &face_png())
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(body["detected_emotion"], "no_face");
        assert_eq!(body["confidence"].as_f64().unwrap(), 0.0);
        assert!(body.get("face").is_none());
    }

    #[tokio::test]
    async fn test_detect_emotion_rejects_non_image() {
        let base = spawn(state(None)).await;

        let response = upload(&base, "file", b"definitely not a png").await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("decode"));
    }

    #[tokio::test]
    async fn test_detect_emotion_requires_file_field() {
        let base = spawn(state(None)).await;

        let response = upload(&base, "image", &face_png()).await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_routes_accept_trailing_slash() {
        let base = spawn(state(Some(MockTextGenerator::replying("Still here.")))).await;

        for path in ["/detect_emotion", "/detect_emotion/"] {
            let response = upload_to(&format!("{base}{path}"), "file", &face_png()).await;
            assert_eq!(response.status(), reqwest::StatusCode::OK, "{path}");
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["detected_emotion"], "happy", "{path}");
        }

        for path in ["/chat", "/chat/"] {
            let response = reqwest::Client::new()
                .post(format!("{base}{path}"))
                .json(&json!({ "user_input": "Long day.", "emotion": "neutral" }))
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK, "{path}");
            let body: Value = response.json().await.unwrap();
            assert_eq!(body["bot_response"], "Still here.", "{path}");
        }
    }

    #[tokio::test]
    async fn test_chat_replies() {
        let state = state(Some(MockTextGenerator::replying("Breathe with me.")));
        let base = spawn(state.clone()).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "user_input": "Nothing feels right.", "emotion": "sad" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["bot_response"], "Breathe with me.");

        let prompts = state.chat.as_ref().unwrap().generator().prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1, "Nothing feels right. (Emotion: sad)");
    }

    #[tokio::test]
    async fn test_chat_empty_reply_uses_fallback() {
        let base = spawn(state(Some(MockTextGenerator::silent()))).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "user_input": "hi", "emotion": "neutral" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["bot_response"], CHAT_FALLBACK);
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_is_bad_gateway() {
        let base = spawn(state(Some(MockTextGenerator::failing(500)))).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "user_input": "hi", "emotion": "happy" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_chat_unconfigured_is_unavailable() {
        let base = spawn(state(None)).await;

        let response = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "user_input": "hi", "emotion": "happy" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let base = spawn(state(None)).await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, format!("{base}/chat"))
            .header("origin", DEFAULT_CORS_ORIGIN)
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            DEFAULT_CORS_ORIGIN
        );
        assert_eq!(response.headers()["access-control-allow-credentials"], "true");
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        assert!(cors_layer(&["http://ok.example".into(), "bad\norigin".into()]).is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let decode = image::load_from_memory(b"nope").unwrap_err();
        assert_eq!(
            ApiError::from(InferenceError::Decode(decode)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(InferenceError::InvalidOutput {
                expected: 8,
                found: 2
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ChatError::Status {
                status: 429,
                body: String::new()
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_serve_args_defaults_and_config() {
        let args = ServeArgs {
            pipeline: PipelineArgs::default(),
            host: None,
            port: None,
            cors_origins: Vec::new(),
            chat: GeminiConfig::default(),
        };
        assert_eq!(args.address(), "0.0.0.0:8000");
        assert_eq!(args.cors_origins(), vec![DEFAULT_CORS_ORIGIN.to_string()]);

        let config: AppConfig = toml::from_str(
            r"
[server]
host = '127.0.0.1'
port = 9100
cors_origins = ['https://app.example']
",
        )
        .unwrap();
        let args = ServeArgs {
            port: Some(9200),
            ..args
        }
        .with_config(&config);
        assert_eq!(args.address(), "127.0.0.1:9200");
        assert_eq!(args.cors_origins(), vec!["https://app.example".to_string()]);
    }
}
