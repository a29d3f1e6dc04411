// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fleetd: the process-orchestration daemon. Wires the registry, supervisor,
//! scheduler, connection hub, knowledge store, fragment store and tool
//! surface together and serves them over HTTP+WebSocket.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use fleet_adapters::HttpEmbedder;
use fleet_core::{Clock, SessionId, SystemClock};
use fleet_daemon::hub::SubscriptionAction;
use fleet_daemon::{Config, FragmentStore, Hub, KnowledgeStore, Tools};
use fleet_engine::{EventBus, ProcessRegistry, Scheduler, Supervisor};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

struct AppState {
    tools: Arc<Tools>,
    hub: Arc<Hub>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();

    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    info!(state_dir = %config.state_dir.display(), "starting fleetd");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let bus = EventBus::new();
    let registry = Arc::new(ProcessRegistry::new());
    let supervisor = Arc::new(Supervisor::new(registry.clone(), bus.clone(), clock.clone()));
    let queue_snapshot_path = config.state_dir.join("queue.json");
    let scheduler = Scheduler::spawn(supervisor.clone(), bus.clone(), clock.clone(), Some(queue_snapshot_path));
    scheduler.set_config(config.scheduler_config()).await;

    let knowledge = Arc::new(KnowledgeStore::new(config.state_dir.join(".knowledge"), clock.clone())?);

    let embedder: Arc<dyn fleet_adapters::Embedder> = match &config.embedding_endpoint {
        Some(endpoint) => Arc::new(HttpEmbedder::new(endpoint.clone())),
        None => Arc::new(HttpEmbedder::new("http://127.0.0.1:4420")),
    };
    let fragments = Arc::new(FragmentStore::new(embedder, clock.clone()));

    let hub = Arc::new(Hub::new(clock.clone()));

    let tools = Arc::new(Tools {
        registry: registry.clone(),
        supervisor: supervisor.clone(),
        scheduler,
        knowledge,
        fragments,
        bus: bus.clone(),
    });

    tokio::spawn(forward_events_to_hub(bus.subscribe(), hub.clone()));

    let state = Arc::new(AppState { tools, hub });
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.ws_addr).await?;
    info!(addr = %config.ws_addr, "listening");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("server error: {e}");
            }
        }
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Forwards every published domain event to the hub, which routes it to
/// subscribed (or all, for unscoped events) sessions (spec §4.8 -> §4.4).
async fn forward_events_to_hub(mut subscription: fleet_engine::Subscription, hub: Arc<Hub>) {
    while let Some(event) = subscription.recv().await {
        let payload = match serde_json::to_value(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to serialize event for hub fan-out: {e}");
                continue;
            }
        };
        hub.route_event(&event, &payload);
    }
}

async fn list_tools() -> Json<Value> {
    Json(json!(fleet_daemon::tools::registry()
        .into_iter()
        .map(|d| json!({"name": d.name, "description": d.description, "schema": d.schema}))
        .collect::<Vec<_>>()))
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(name): axum::extract::Path<String>,
    Json(args): Json<Value>,
) -> impl IntoResponse {
    match state.tools.call(&name, args).await {
        Ok(response) => Json(response.to_json()),
        Err(err) => Json(json!({"error": {"kind": err.kind, "message": err.message}})),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (session_id, outbox) = state.hub.add_connection(json!({}));
    let (mut sender, mut receiver) = socket.split();
    let mut outbox = outbox.0;

    let send_task = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if sender.send(Message::Text(msg.to_string())).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = state.hub.clone();
    let recv_session = session_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else { continue };
            recv_hub.update_activity(&recv_session);
            let Ok(request) = serde_json::from_str::<Value>(&text) else { continue };
            handle_client_message(&recv_hub, &recv_session, &request);
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = recv_task => {}
    }
    state.hub.remove_connection(&session_id);
}

fn handle_client_message(hub: &Hub, session_id: &SessionId, request: &Value) {
    let action = match request.get("action").and_then(Value::as_str) {
        Some(a) => a,
        None => return,
    };
    let process_id = request.get("processId").and_then(Value::as_str);
    match action {
        "subscribe" => hub.update_subscription(session_id, SubscriptionAction::Subscribe, process_id),
        "unsubscribe" => hub.update_subscription(session_id, SubscriptionAction::Unsubscribe, process_id),
        "subscribeAll" => hub.update_subscription(session_id, SubscriptionAction::SubscribeAll, None),
        "unsubscribeAll" => hub.update_subscription(session_id, SubscriptionAction::UnsubscribeAll, None),
        "ping" => {}
        other => warn!("unknown ws action {other:?} from session {session_id}"),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
