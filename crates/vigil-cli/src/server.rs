//! Local HTTP transport for the chat service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use vigil_kernel::{ChatService, InferenceMode};

const INDEX_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Vigil</title></head>
<body>
<h1>Vigil - local chat</h1>
<div id="chat" style="white-space:pre-wrap;border:1px solid #ccc;padding:8px;height:300px;overflow:auto"></div>
<input id="msg" style="width:70%" placeholder="Write a message or /command"/>
<select id="mode"><option value="realtime">realtime</option><option value="reflection">reflection</option></select>
<button onclick="send()">Send</button>
<script>
async function send(){
  const m=document.getElementById('msg').value;
  const mode=document.getElementById('mode').value;
  const res=await fetch('/chat',{method:'POST',headers:{'Content-Type':'application/json'},body:JSON.stringify({message:m,mode})});
  const data=await res.json();
  const box=document.getElementById('chat');
  box.textContent += '\nyou: '+m+'\nvigil: '+(data.reply ?? data.error)+'\n';
  document.getElementById('msg').value='';
}
</script>
</body></html>"#;

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<ChatService>>,
    fatal: watch::Sender<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    mode: Option<String>,
}

fn error(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/state", get(get_state))
        .route("/chat", post(post_chat))
        .fallback(not_found)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "not_found")
}

async fn get_state(State(state): State<AppState>) -> Response {
    let service = state.service.lock().await;
    Json(service.state_payload()).into_response()
}

async fn post_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: &[u8] = if body.is_empty() { b"{}" } else { &body };
    let Ok(request) = serde_json::from_slice::<ChatRequest>(raw) else {
        return error(StatusCode::BAD_REQUEST, "invalid_json");
    };
    let message = request.message.trim();
    if message.is_empty() {
        return error(StatusCode::BAD_REQUEST, "message_required");
    }
    let mode = request.mode.as_deref().and_then(InferenceMode::from_name);

    let mut service = state.service.lock().await;
    match service.handle_message(message, mode).await {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "fatal engine error, shutting down");
            state.fatal.send_replace(Some(e.to_string()));
            error(StatusCode::INTERNAL_SERVER_ERROR, "policy_violation")
        }
    }
}

/// Serve until Ctrl-C or a fatal engine error.
pub async fn serve(addr: SocketAddr, service: ChatService) -> Result<()> {
    let (fatal, mut fatal_rx) = watch::channel(None);
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        fatal,
    };
    let app = router(state.clone());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "chat server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = fatal_rx.changed() => {}
            }
        })
        .await?;

    if let Some(reason) = state.fatal.borrow().clone() {
        anyhow::bail!("engine stopped: {reason}");
    }

    let service = state.service.lock().await;
    tracing::info!(tick = service.engine().tick(), "chat server stopped");
    Ok(())
}
