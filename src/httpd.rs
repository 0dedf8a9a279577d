// HTTP Server Module - Read-only HTML mirror of the dashboard with command links
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta http-equiv="refresh" content="5">
    <title>strandview</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #1a1a1a;
            color: #e0e0e0;
            padding: 20px;
        }
        a { text-decoration: none; color: inherit; }
        .header { display: flex; gap: 20px; align-items: baseline; margin-bottom: 12px; }
        #mqtt_status { font-size: 1.4em; }
        #status { color: #b0b0b0; font-size: 0.9em; }
        select {
            background: #1a1a1a;
            border: 1px solid #505050;
            color: #e0e0e0;
            padding: 6px 10px;
            border-radius: 4px;
            margin-bottom: 12px;
        }
        #color_picker { margin-bottom: 12px; }
        .strand { font-family: monospace; }
    </style>
</head>
"#;

const PAGE_TAIL: &str = "\n</html>\n";

#[derive(Clone)]
struct MirrorState {
    page: watch::Receiver<String>,
    commands: mpsc::Sender<String>,
}

pub fn router(page: watch::Receiver<String>, commands: mpsc::Sender<String>) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/command/*path", get(forward_command))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(MirrorState { page, commands })
}

async fn serve_index(State(state): State<MirrorState>) -> Html<String> {
    let body = state.page.borrow().clone();
    Html(format!("{}{}{}", PAGE_HEAD, body, PAGE_TAIL))
}

// The path is handed to the controller untouched; it owns the dispatch
async fn forward_command(
    State(state): State<MirrorState>,
    Path(path): Path<String>,
) -> Response {
    let path = format!("/{}", path.trim_start_matches('/'));
    match state.commands.try_send(path) {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => {
            warn!(error = %e, "mirror command dropped");
            (StatusCode::SERVICE_UNAVAILABLE, "Command queue unavailable").into_response()
        }
    }
}

// HTTP access logging middleware
async fn logging_middleware(req: Request, next: Next) -> Response {
    debug!(method = %req.method(), path = %req.uri().path(), "mirror request");
    next.run(req).await
}

pub async fn run_http_server(
    ip: String,
    port: u16,
    page: watch::Receiver<String>,
    commands: mpsc::Sender<String>,
) -> Result<()> {
    let addr = format!("{}:{}", ip, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind HTML mirror on {}", addr))?;

    info!("HTML mirror listening on http://{}", addr);
    axum::serve(listener, router(page, commands))
        .await
        .context("HTML mirror stopped")?;
    Ok(())
}
