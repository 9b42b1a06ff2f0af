use crate::assistant::{ Assistant, AssistantError, UploadRequest };
use crate::cli::Args;
use crate::llm::chat::GatewayError;
use crate::models::chat::UploadResponse;
use crate::upload::UploadedFile;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    Json,
    extract::{ DefaultBodyLimit, Multipart, State, multipart::{ MultipartError, MultipartRejection } },
    response::{ IntoResponse, Response },
    http::StatusCode,
};
use serde_json::json;
use thiserror::Error;
use axum_server::tls_rustls::RustlsConfig;
use tower_http::cors::{ Any, CorsLayer };
use log::{ debug, info, error };

#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Could not read upload: {message}")]
    Multipart {
        status: StatusCode,
        message: String,
    },

    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::Multipart {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Multipart { status, .. } if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
            ApiError::Multipart { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Assistant(AssistantError::Csv(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_csv")
            }
            ApiError::Assistant(AssistantError::Task(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
            ApiError::Assistant(AssistantError::Gateway(err)) => {
                let status = match err {
                    GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    GatewayError::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, err.kind())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        (status, Json(json!({ "error": self.to_string(), "kind": kind }))).into_response()
    }
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/upload", post(upload_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: &str,
    state: AppState,
    args: Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = addr.parse::<SocketAddr>()?;
    let app = router(state, args.max_body_bytes);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => (cert_path, key_path),
            _ => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
        let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;

        info!("Starting HTTPS API server on: https://{}", addr);
        axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
            e
        })?;
        info!("Starting HTTP API server on: http://{}", addr);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;
    let request = read_upload(&mut multipart).await?;
    let response = state.assistant.handle(request).await?;
    Ok(Json(UploadResponse { response }))
}

/// Collects `file`, `prompt` and `history`; other fields are skipped.
async fn read_upload(multipart: &mut Multipart) -> Result<UploadRequest, ApiError> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part for an empty file input.
                if bytes.is_empty() && file_name.is_empty() {
                    continue;
                }
                request.file = Some(UploadedFile::new(file_name, content_type, bytes.to_vec()));
            }
            "prompt" => {
                request.prompt = Some(field.text().await?);
            }
            "history" => {
                request.history = Some(field.text().await?);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(request)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "model": state.assistant.model(),
        })),
    )
}
