use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{debug, info};

use crate::detections::detections_from_value;
use crate::diff::{self, DiffOutcome};
use crate::extract::{ExtractedPayload, extract_json};
use crate::instructions::{InstructionKind, auto_tabs, studio_tabs};
use crate::media::MediaKind;
use crate::settings;
use crate::viewport::{NaturalSize, OverlayBox, ViewportState, fit_to_container, layout_overlay};

use super::models::{
    DiffRequest, DiffResponse, ErrorResponse, ExtractRequest, FitRequest, InstructionsResponse,
    ProjectRequest, ScaleResponse, WheelRequest,
};
use super::state::ServerState;

type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn run_server(settings: settings::Settings, addr: String) -> Result<()> {
    let app = router(settings);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!(%addr, "workspace server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(settings: settings::Settings) -> Router {
    let state = Arc::new(ServerState::new(settings));
    Router::new()
        .route("/health", get(health))
        .route("/diff", post(diff_texts))
        .route("/extract", post(extract))
        .route("/viewport/fit", post(viewport_fit))
        .route("/viewport/wheel", post(viewport_wheel))
        .route("/overlay/project", post(overlay_project))
        .route("/instructions/:media", get(instructions_info))
        .route("/settings", get(settings_info))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

async fn diff_texts(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<DiffRequest>,
) -> Json<DiffResponse> {
    let original = payload.original.unwrap_or_default();
    let corrected = payload.corrected.unwrap_or_default();
    let outcome = diff::compare_with_ratio(
        &original,
        &corrected,
        state.settings.diff_divergence_ratio,
    );
    debug!(changed = outcome.changed_count(), "diff computed");
    let markers = match &outcome {
        DiffOutcome::Aligned(tokens) => Some(diff::render_markers(tokens)),
        _ => None,
    };
    Json(DiffResponse {
        message: outcome.message().map(str::to_string),
        markers,
        annotated: diff::render_annotated(&outcome),
        changed: outcome.changed_count(),
        outcome,
    })
}

async fn extract(Json(payload): Json<ExtractRequest>) -> Json<ExtractedPayload> {
    Json(extract_json(&payload.text))
}

async fn viewport_fit(Json(payload): Json<FitRequest>) -> Json<ScaleResponse> {
    let scale = fit_to_container(
        payload.natural_width,
        payload.natural_height,
        payload.container_width,
        payload.container_height,
    );
    Json(scale_response(scale))
}

async fn viewport_wheel(Json(payload): Json<WheelRequest>) -> Result<Json<ScaleResponse>, ApiError> {
    if !(payload.scale > 0.0 && payload.scale.is_finite()) {
        return Err(bad_request("scale must be a positive number"));
    }
    let mut viewport = ViewportState::new(payload.media.unwrap_or(MediaKind::Image));
    viewport.scale = payload.scale;
    viewport.wheel(payload.delta_y);
    Ok(Json(scale_response(viewport.scale)))
}

fn scale_response(scale: f64) -> ScaleResponse {
    let mut viewport = ViewportState::default();
    viewport.scale = scale;
    ScaleResponse {
        scale,
        zoom_percent: viewport.zoom_percent(),
    }
}

async fn overlay_project(
    Json(payload): Json<ProjectRequest>,
) -> Result<Json<Vec<OverlayBox>>, ApiError> {
    let boxes = detections_from_value(payload.boxes).map_err(|err| bad_request(format!("{:#}", err)))?;
    let natural = NaturalSize {
        width: payload.natural_width,
        height: payload.natural_height,
    };
    Ok(Json(layout_overlay(&boxes, natural)))
}

async fn instructions_info(
    State(state): State<Arc<ServerState>>,
    Path(media): Path<String>,
) -> Result<Json<InstructionsResponse>, ApiError> {
    let media = MediaKind::parse(&media)
        .ok_or_else(|| bad_request(format!("unknown media kind '{}'", media)))?;
    let kind = InstructionKind::for_media(media, state.settings.image_ocr_enabled);
    let presets = state
        .presets
        .iter()
        .filter(|preset| preset.kind == kind)
        .cloned()
        .collect();
    Ok(Json(InstructionsResponse {
        media,
        kind,
        instruction: state.settings.instructions.get(kind).to_string(),
        presets,
        tabs: studio_tabs(media),
        auto_tabs: auto_tabs(&state.settings, media)
            .into_iter()
            .map(|tab| tab.id)
            .collect(),
    }))
}

async fn settings_info(State(state): State<Arc<ServerState>>) -> Json<settings::Settings> {
    Json(state.settings.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn call(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router(settings::Settings::default())
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, headers, value)
    }

    #[tokio::test]
    async fn health_reports_ok_with_cors() {
        let (status, headers, body) = call(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
        assert_eq!(headers["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn preflight_is_answered_without_routing() {
        let (status, headers, _) = call(Method::OPTIONS, "/diff", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");
    }

    #[tokio::test]
    async fn diff_marks_changed_tokens() {
        let (status, _, body) = call(
            Method::POST,
            "/diff",
            Some(json!({ "original": "the quick brown fox", "corrected": "the quick brawn fox" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["changed"], 1);
        assert_eq!(body["outcome"]["kind"], "aligned");
        assert_eq!(body["outcome"]["value"][4]["text"], "brawn");
        assert_eq!(body["outcome"]["value"][4]["original"], "brown");
        assert_eq!(body["markers"], "          -----");
    }

    #[tokio::test]
    async fn diff_without_original_returns_message() {
        let (status, _, body) = call(Method::POST, "/diff", Some(json!({ "corrected": "text" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"]["kind"], "missing_original");
        assert_eq!(body["message"], diff::NO_ORIGINAL_MESSAGE);
        assert!(body.get("markers").is_none());
    }

    #[tokio::test]
    async fn extract_splits_json_and_note() {
        let (status, _, body) = call(
            Method::POST,
            "/extract",
            Some(json!({ "text": "Here: {\"a\":1} done" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["json"], "{\n  \"a\": 1\n}");
        assert_eq!(body["note"], "Here:  done");
    }

    #[tokio::test]
    async fn viewport_endpoints_compute_scale() {
        let (_, _, fit) = call(
            Method::POST,
            "/viewport/fit",
            Some(json!({
                "natural_width": 2000.0,
                "natural_height": 1000.0,
                "container_width": 1000.0,
                "container_height": 1000.0
            })),
        )
        .await;
        assert_eq!(fit["zoom_percent"], 45);

        let (_, _, wheel) = call(
            Method::POST,
            "/viewport/wheel",
            Some(json!({ "scale": 1.0, "delta_y": -100.0 })),
        )
        .await;
        assert_eq!(wheel["zoom_percent"], 110);

        let (_, _, video) = call(
            Method::POST,
            "/viewport/wheel",
            Some(json!({ "scale": 1.0, "delta_y": -100.0, "media": "video" })),
        )
        .await;
        assert_eq!(video["scale"], 1.0);

        let (status, _, body) = call(
            Method::POST,
            "/viewport/wheel",
            Some(json!({ "scale": 0.0, "delta_y": 1.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "scale must be a positive number");
    }

    #[tokio::test]
    async fn overlay_projection_skips_degenerate_boxes() {
        let (status, _, body) = call(
            Method::POST,
            "/overlay/project",
            Some(json!({
                "natural_width": 800,
                "natural_height": 1000,
                "boxes": [
                    { "bbox": { "x0": 0, "y0": 0, "x1": "500", "y1": 100 }, "text": "title" },
                    { "bbox": { "x0": 10, "y0": 10, "x1": 10, "y1": 20 }, "text": "flat" }
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().expect("array");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], "title");
        assert_eq!(items[0]["placement"]["width_pct"], 50.0);
        let font_size = items[0]["font_size"].as_f64().expect("font size");
        assert!((font_size - 65.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn overlay_projection_rejects_bad_coordinates() {
        let (status, _, body) = call(
            Method::POST,
            "/overlay/project",
            Some(json!({
                "natural_width": 10,
                "natural_height": 10,
                "boxes": [{ "bbox": { "x0": 0, "y0": 0, "x1": "wide", "y1": 1 } }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("error").contains("detection 0"));
    }

    #[tokio::test]
    async fn instructions_follow_media_kind() {
        let (status, _, body) = call(Method::GET, "/instructions/image", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "ocr");
        assert_eq!(body["presets"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["tabs"][0]["id"], "chat");
        assert_eq!(body["auto_tabs"], json!([]));

        let (status, _, body) = call(Method::GET, "/instructions/poster", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown media kind 'poster'");
    }

    #[tokio::test]
    async fn settings_are_exposed() {
        let (status, _, body) = call(Method::GET, "/settings", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["diff_divergence_ratio"], 0.5);
    }
}
