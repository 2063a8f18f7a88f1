//! Socket Hub (C3): per-job rooms that bridge the PubSub bus to subscribed
//! WebSocket clients, with a snapshot emitted on subscribe (spec §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use wasmforge_bus::{Bus, BusEvent, BusResult};
use wasmforge_core::job::{JobResult, JobStatus, LogRecord};
use wasmforge_core::ResourceId;

use crate::state::AppState;

/// An event forwarded to every socket currently in a job's room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    Log {
        job_id: ResourceId,
        log: LogRecord,
    },
    Status {
        job_id: ResourceId,
        status: JobStatus,
        result: Option<JobResult>,
    },
}

impl RoomEvent {
    fn to_json(&self) -> serde_json::Value {
        match self {
            RoomEvent::Log { job_id, log } => json!({
                "type": "job:log",
                "job_id": job_id,
                "log": log,
            }),
            RoomEvent::Status {
                job_id,
                status,
                result,
            } => json!({
                "type": "job:status",
                "job_id": job_id,
                "status": status,
                "result": result,
            }),
        }
    }
}

struct Room {
    tx: broadcast::Sender<RoomEvent>,
    subscribers: usize,
    bridge: JoinHandle<()>,
}

/// Holds the socket hub's room membership. One instance per API process
/// (spec §5: "no shared in-process state couples API replicas beyond the
/// Socket Hub's local room membership").
pub struct SocketHub {
    bus: Arc<Bus>,
    rooms: Mutex<HashMap<ResourceId, Room>>,
}

impl SocketHub {
    pub fn new(bus: Arc<Bus>) -> Self {
        Self {
            bus,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Join the room for `job_id`, creating it (and its bus bridge) on the
    /// first subscriber.
    async fn join(&self, job_id: ResourceId) -> BusResult<broadcast::Receiver<RoomEvent>> {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get_mut(&job_id) {
            room.subscribers += 1;
            return Ok(room.tx.subscribe());
        }

        let (tx, rx) = broadcast::channel(256);
        let mut bus_rx = self.bus.subscribe_job(job_id).await?;
        let bridge_tx = tx.clone();
        let bridge = tokio::spawn(async move {
            while let Some(event) = bus_rx.recv().await {
                let room_event = match event {
                    BusEvent::Log(log) => RoomEvent::Log { job_id, log },
                    BusEvent::Status { status, result } => RoomEvent::Status {
                        job_id,
                        status,
                        result,
                    },
                };
                let _ = bridge_tx.send(room_event);
            }
        });

        rooms.insert(
            job_id,
            Room {
                tx,
                subscribers: 1,
                bridge,
            },
        );
        Ok(rx)
    }

    /// Leave the room for `job_id`. Idempotent (spec §5: "unsubscribe MUST
    /// be idempotent").
    async fn leave(&self, job_id: ResourceId) {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get_mut(&job_id) {
            room.subscribers = room.subscribers.saturating_sub(1);
            if room.subscribers == 0 {
                room.bridge.abort();
                rooms.remove(&job_id);
            }
        }
    }

    /// Bridge an in-process emit onto the bus, so other API replicas and
    /// this hub's own bridge task observe it uniformly (spec §4.3).
    pub async fn emit_log(&self, job_id: ResourceId, log: &LogRecord) -> BusResult<()> {
        self.bus.publish_log(job_id, log).await
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WsCommand {
    #[serde(rename = "subscribe:job")]
    SubscribeJob { job_id: ResourceId },
    #[serde(rename = "unsubscribe:job")]
    UnsubscribeJob { job_id: ResourceId },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("socket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<RoomEvent>(256);
    let mut forwarders: HashMap<ResourceId, JoinHandle<()>> = HashMap::new();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<WsCommand>(&text) {
                            Ok(WsCommand::SubscribeJob { job_id }) => {
                                // A repeat subscribe for a job this socket is
                                // already in must leave its old room membership
                                // first, or `join`'s increment below is never
                                // offset by a matching `leave` (subscribers
                                // would climb without bound across repeats).
                                if forwarders.contains_key(&job_id) {
                                    state.socket_hub.leave(job_id).await;
                                }
                                match state.socket_hub.join(job_id).await {
                                    Ok(mut room_rx) => {
                                        if let Ok(job) = state.job_repo.get(job_id).await {
                                            let snapshot = json!({
                                                "type": "snapshot",
                                                "job_id": job_id,
                                                "logs": job.logs,
                                                "status": job.status,
                                            });
                                            if sender.send(Message::Text(snapshot.to_string().into())).await.is_err() {
                                                break;
                                            }
                                        }

                                        let fwd_tx = out_tx.clone();
                                        let handle = tokio::spawn(async move {
                                            while let Ok(event) = room_rx.recv().await {
                                                if fwd_tx.send(event).await.is_err() {
                                                    break;
                                                }
                                            }
                                        });
                                        if let Some(old) = forwarders.insert(job_id, handle) {
                                            old.abort();
                                        }
                                    }
                                    Err(e) => warn!(error = %e, "failed to join room"),
                                }
                            }
                            Ok(WsCommand::UnsubscribeJob { job_id }) => {
                                if let Some(handle) = forwarders.remove(&job_id) {
                                    handle.abort();
                                }
                                state.socket_hub.leave(job_id).await;
                            }
                            Err(e) => {
                                warn!(error = %e, "unrecognized socket command");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("socket closed");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "socket error");
                        break;
                    }
                    _ => {}
                }
            }
            event = out_rx.recv() => {
                match event {
                    Some(event) => {
                        if sender.send(Message::Text(event.to_json().to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    for (job_id, handle) in forwarders {
        handle.abort();
        state.socket_hub.leave(job_id).await;
    }
}
