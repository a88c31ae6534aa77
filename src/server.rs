//! Placeholder HTTP inference endpoint. The request/response contract is
//! stable; the classification and detection results behind it are canned
//! until real models are wired in.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Multipart, Path as UrlPath, Query, State},
    routing::get,
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

pub const DEFAULT_PORT: u16 = 4585;

/// Uploads are processed one at a time; the lock also covers the shared
/// output directory.
struct AppState {
    gate: Mutex<()>,
    output_dir: std::path::PathBuf,
}

pub fn serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(async {
        let state = Arc::new(AppState {
            gate: Mutex::new(()),
            output_dir: std::path::PathBuf::from("Output"),
        });

        let app = Router::new()
            .route("/", get(root))
            .route("/api/{method}", get(api_get).post(api_post))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("cannot bind port {port}"))?;
        log::info!("inference endpoint listening on port {port}");
        axum::serve(listener, app).await.context("server failed")
    })
}

async fn root() -> Json<Value> {
    log::info!("request start: GET /");
    let body = json!({ "result": "api", "message": "running" });
    log::info!("request end: GET /");
    Json(body)
}

async fn api_get(UrlPath(method): UrlPath<String>) -> Json<Value> {
    log::info!("request start: GET /api/{method}");
    let body = match method.as_str() {
        "status" => json!({ "result": "status", "message": "I'm ok" }),
        _ => json!({ "result": "fail", "message": "wrong request" }),
    };
    log::info!("request end: GET /api/{method}");
    Json(body)
}

async fn api_post(
    State(state): State<Arc<AppState>>,
    UrlPath(method): UrlPath<String>,
    Query(params): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Json<Value> {
    log::info!("request start: POST /api/{method}");
    let body = match handle_inference(&state, &method, &params, multipart).await {
        Ok(body) => body,
        Err(err) => {
            log::error!("inference request failed: {err:#}");
            json!({ "message": "Error processing request", "error": format!("{err:#}") })
        }
    };
    log::info!("request end: POST /api/{method}");
    Json(body)
}

async fn handle_inference(
    state: &AppState,
    method: &str,
    params: &HashMap<String, String>,
    multipart: Multipart,
) -> Result<Value> {
    if !params.contains_key("model_id") {
        return Ok(json!({ "message": "fail", "result": "model_id required" }));
    }

    match method {
        "CLS" => {
            let _serial = state.gate.lock().await;
            save_upload(multipart, &state.output_dir.join("CLS")).await?;
            Ok(json!({ "message": "success", "result": "NG", "score": 0.987 }))
        }
        "DET" => {
            let _serial = state.gate.lock().await;
            save_upload(multipart, &state.output_dir.join("DET")).await?;
            Ok(json!({
                "message": "success",
                "annotations": canned_detections(),
            }))
        }
        _ => Ok(json!({ "message": "no method" })),
    }
}

/// Persists the first uploaded file field as `output_image.png`.
async fn save_upload(mut multipart: Multipart, dir: &Path) -> Result<()> {
    let field = multipart
        .next_field()
        .await
        .context("malformed multipart body")?
        .context("request carried no file field")?;
    let bytes = field.bytes().await.context("failed to read upload body")?;

    let image = image::load_from_memory(&bytes).context("upload is not a decodable image")?;
    std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    let path = dir.join("output_image.png");
    image
        .save(&path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    log::info!("stored upload at {}", path.display());
    Ok(())
}

fn canned_detections() -> Value {
    json!([
        {
            "box_cx": 150, "box_cy": 150, "box_w": 100, "box_h": 100,
            "label": "apple", "score": 0.964, "rotation": -45
        },
        {
            "box_cx": 550, "box_cy": 550, "box_w": 100, "box_h": 100,
            "label": "car", "score": 1.000, "rotation": 0
        },
        {
            "box_cx": 350, "box_cy": 350, "box_w": 150, "box_h": 150,
            "label": "mobilephone", "score": 0.886, "rotation": 135
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canned_detection_payload_is_stable() {
        let dets = canned_detections();
        let list = dets.as_array().unwrap();
        assert_eq!(list.len(), 3);

        // Fixed contract values consumed by existing clients.
        assert_eq!(list[0]["label"], "apple");
        assert_eq!(list[0]["box_cx"], 150);
        assert_eq!(list[0]["box_cy"], 150);
        assert_eq!(list[0]["rotation"], -45);

        assert_eq!(list[1]["label"], "car");
        assert_eq!(list[1]["box_cx"], 550);
        assert_eq!(list[1]["box_cy"], 550);
        assert_eq!(list[1]["score"], 1.0);

        assert_eq!(list[2]["label"], "mobilephone");
        assert_eq!(list[2]["box_cx"], 350);
        assert_eq!(list[2]["box_cy"], 350);
        assert_eq!(list[2]["box_w"], 150);
        assert_eq!(list[2]["box_h"], 150);
        assert_eq!(list[2]["rotation"], 135);

        for det in list {
            for key in ["box_cx", "box_cy", "box_w", "box_h", "label", "score", "rotation"] {
                assert!(det.get(key).is_some(), "missing {key}");
            }
        }
    }
}
