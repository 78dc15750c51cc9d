use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower::service_fn;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::*;

/// Arguments for running the ayeeye annotation API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "ayeeye serve", about = "Start the ayeeye bias annotation API server.")]
pub struct ServeArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 5225)]
    pub port: u16,

    /// Canvas width used when settling graph layouts.
    #[arg(long = "canvas-width", default_value_t = DEFAULT_CANVAS_WIDTH)]
    pub canvas_width: f32,

    /// Canvas height used when settling graph layouts.
    #[arg(long = "canvas-height", default_value_t = DEFAULT_CANVAS_HEIGHT)]
    pub canvas_height: f32,

    /// Maximum simulation ticks to run before a layout is considered settled.
    #[arg(long = "settle-ticks", default_value_t = 500)]
    pub settle_ticks: usize,

    /// Optional directory of static UI assets to serve alongside the API.
    #[arg(long = "ui")]
    pub ui: Option<PathBuf>,
}

pub struct ServeState {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub settle_ticks: usize,
}

/// The bias-detector boundary: text plus whatever annotations the upstream
/// service produced. An absent or empty annotation list is valid input.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateRequest {
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<BiasAnnotation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatePayload {
    pub text: String,
    pub spans: Vec<LocatedSpan>,
    pub segments: Vec<Segment>,
    pub html: String,
    pub graph: HierarchyGraph,
    pub positions: HashMap<String, NodePosition>,
    pub svg: String,
    pub emphasis: EmphasisMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub text: String,
    pub span: LocatedSpan,
    /// Defaults to the span's recorded suggestion when omitted.
    #[serde(default)]
    pub suggestion: Option<String>,
}

pub fn router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/api/annotate", post(annotate))
        .route("/api/edit", post(edit))
        .route("/api/health", get(health))
        .with_state(state)
}

pub async fn run_serve(args: ServeArgs, ui_root: Option<PathBuf>) -> Result<()> {
    let state = Arc::new(ServeState {
        canvas_width: args.canvas_width,
        canvas_height: args.canvas_height,
        settle_ticks: args.settle_ticks,
    });

    let mut app = router(state);

    if let Some(root) = ui_root.or(args.ui) {
        let static_dir = ServeDir::new(root.clone())
            .append_index_html_on_directories(true)
            .fallback(ServeFile::new(root.join("index.html")));
        let dir_for_service = static_dir.clone();

        let static_service = service_fn(move |req| {
            let svc = dir_for_service.clone();
            async move {
                match svc.oneshot(req).await {
                    Ok(response) => Ok(response.map(axum::body::Body::new)),
                    Err(error) => {
                        let message = format!("Static file error: {error}");
                        Ok((StatusCode::INTERNAL_SERVER_ERROR, message).into_response())
                    }
                }
            }
        });

        app = app.fallback_service(static_service);
    }

    let app = app.layer(CorsLayer::permissive());

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind HTTP server to {addr}"))?;

    println!("ayeeye server listening on http://{addr}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn annotate(
    State(state): State<Arc<ServeState>>,
    Json(request): Json<AnnotateRequest>,
) -> Result<Json<AnnotatePayload>, (StatusCode, String)> {
    let spans = locate(&request.text, &request.annotations);
    let markup = AnnotatedText::render(&request.text, &spans);
    let graph = HierarchyGraph::build(&request.annotations);

    let mut layout = ForceLayout::new(&graph, state.canvas_width, state.canvas_height)
        .map_err(|err| (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()))?;
    layout.run_to_idle(state.settle_ticks);

    let emphasis = EmphasisMap::neutral(&graph);
    let svg = render_graph_svg(&graph, &layout);
    let html = markup.to_html();

    Ok(Json(AnnotatePayload {
        text: request.text,
        spans,
        segments: markup.segments,
        html,
        positions: layout.positions(),
        graph,
        svg,
        emphasis,
    }))
}

async fn edit(
    Json(request): Json<EditRequest>,
) -> Result<Json<EditReceipt>, (StatusCode, String)> {
    let suggestion = request
        .suggestion
        .unwrap_or_else(|| request.span.suggestion.clone());
    match apply_edit(&request.text, &request.span, &suggestion) {
        Ok(receipt) => Ok(Json(receipt)),
        Err(err @ AnnotateError::StaleEdit { .. }) => {
            Err((StatusCode::CONFLICT, err.to_string()))
        }
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
