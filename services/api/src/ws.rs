use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use dialogue_core::{ChatModel, Orchestrator};
use dialogue_types::{ServerMessage, ViewerMessage};
use futures_util::{Sink, SinkExt, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

pub type SharedOrchestrator = Arc<Orchestrator<dyn ChatModel>>;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: SharedOrchestrator,
}

/// Websocket endpoint at `/ws` and `/` (plain GETs of `/` go to the viewer
/// page); every other path is served from `web_dir`.
pub fn router(state: AppState, web_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(web_dir))
        .layer(cors)
        .with_state(state)
}

async fn root_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        Err(_) => Redirect::temporary("/index.html").into_response(),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    tracing::debug!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serves one viewer: catch-up, then live events out and playback signals in.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (mut viewer, catch_up) = state.orchestrator.join().await;

    for message in &catch_up {
        if !send_message(&mut sender, message).await {
            return;
        }
    }

    if !state.orchestrator.is_running() {
        let orchestrator = state.orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.start().await {
                tracing::error!("Conversation did not start: {}", e);
            }
        });
    }

    let viewer_id = viewer.id();
    loop {
        tokio::select! {
            outbound = viewer.recv() => {
                let Some(message) = outbound else { break };
                if !send_message(&mut sender, &message).await {
                    break;
                }
            }
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_viewer_text(&state.orchestrator, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Client {} socket error: {}", viewer_id, e);
                    break;
                }
            }
        }
    }
}

/// Returns `false` once the viewer can no longer be written to.
async fn send_message<S>(sender: &mut S, message: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("failed to serialize message: {}", e);
            true
        }
    }
}

/// Applies one text frame from a viewer. Malformed frames are ignored.
pub fn handle_viewer_text(orchestrator: &SharedOrchestrator, text: &str) {
    match serde_json::from_str::<ViewerMessage>(text) {
        Ok(ViewerMessage::AudioDone) => {
            orchestrator.signal_done();
        }
        Err(e) => tracing::debug!("ignoring viewer message: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dialogue_core::{DialogueSettings, Generator, PersonaSet, Transcript};
    use dialogue_types::{ChatRequest, Persona};
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn complete(&self, _request: ChatRequest) -> anyhow::Result<String> {
            Ok("Let's say the past is read-only.".to_string())
        }
    }

    fn orchestrator() -> SharedOrchestrator {
        let model: Arc<dyn ChatModel> = Arc::new(Echo);
        let generator = Generator::new(
            model,
            "test-model",
            PersonaSet::default(),
            Transcript::new("s").shared(),
        );
        Arc::new(Orchestrator::new(generator, DialogueSettings::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn audio_done_frame_advances_turn() {
        let orch = orchestrator();
        let (mut viewer, _) = orch.join().await;
        let runner = orch.clone();
        let task = tokio::spawn(async move { runner.start().await });

        for _ in 0..3 {
            viewer.recv().await;
        }
        handle_viewer_text(&orch, "not json");
        handle_viewer_text(&orch, r#"{"type":"volume"}"#);
        handle_viewer_text(&orch, r#"{"type":"audio-done"}"#);

        let next = tokio::time::timeout(Duration::from_secs(5), viewer.recv()).await;
        assert_eq!(next.unwrap(), Some(ServerMessage::start(Persona::Second)));

        task.abort();
    }
}
