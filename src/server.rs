use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_context::AppContext;
use crate::monitor::assemble;

pub async fn run(app_context: AppContext) -> Result<(), std::io::Error> {
    let addr = app_context
        .config
        .listen_socket_addr()
        .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidInput, error.to_string()))?;

    let listener = TcpListener::bind(addr).await?;
    log::info!("Monitor your system load at http://{}/", addr);

    axum::serve(listener, router(app_context)).await
}

pub fn router(app_context: AppContext) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(&app_context.config.assets_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_context)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_context): State<AppContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscriber(socket, app_context))
}

/// One task pair per subscriber: forward broadcast ticks out, drain the
/// inbound side for the close handshake. A failed send or a close frame
/// tears down this connection only; a subscriber that cannot keep up with
/// the tick rate loses the lagged payloads but never blocks the sampler
/// or its peers.
async fn handle_subscriber(socket: WebSocket, app_context: AppContext) {
    // Subscribe before snapshotting history so no tick lands in between.
    let mut updates = app_context.updates.subscribe();

    let initial = {
        let history = app_context.history.lock().await;
        let payload = assemble(
            &history,
            app_context.config.sample_rate,
            Utc::now().timestamp_millis(),
        );
        serde_json::to_string(&payload)
    };

    let (mut outbound, mut inbound) = socket.split();

    match initial {
        Ok(message) => {
            if outbound.send(Message::Text(message)).await.is_err() {
                return;
            }
        }
        Err(error) => {
            log::error!("payload_serialization_failed error={}", error);
            return;
        }
    }

    let mut forward_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => {
                    if outbound.send(Message::Text(message)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("subscriber_lagged skipped_payloads={}", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut drain_task = tokio::spawn(async move {
        while let Some(Ok(message)) = inbound.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => drain_task.abort(),
        _ = &mut drain_task => forward_task.abort(),
    }
}
