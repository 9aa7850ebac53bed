use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use channel_shared::Packet;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::client::ChannelClient;
use crate::dispatch::PacketDispatcher;
use crate::send;
use crate::world::{PlayerCreature, WorldManager};

/// Entity ids handed to guest creatures start here.
const GUEST_ENTITY_BASE: u64 = 0x0010_0000_0000_0000;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<PacketDispatcher<ChannelClient>>,
    pub world: Arc<WorldManager>,
    pub start_region: u32,
    pub next_connection_id: Arc<AtomicU64>,
    pub connection_semaphore: Arc<Semaphore>,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let Ok(_permit) = Arc::clone(&app_state.connection_semaphore).try_acquire_owned() else {
        tracing::warn!("Connection limit reached, rejecting client");
        return;
    };

    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Packet>();

    let id = app_state.next_connection_id.fetch_add(1, Ordering::Relaxed);
    let client = ChannelClient::new(id, Arc::clone(&app_state.world), out_tx);
    let creature = spawn_guest(&client, &app_state);
    send::channel_welcome(&client, &creature);

    tracing::info!(
        connection = id,
        region = creature.region_id,
        "Client connected as '{}'",
        creature.name
    );

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                let packet = match msg {
                    Some(Ok(Message::Text(text))) => serde_json::from_str::<Packet>(&text),
                    Some(Ok(Message::Binary(bytes))) => serde_json::from_slice::<Packet>(&bytes),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection = id, "WebSocket error: {}", e);
                        break;
                    }
                    _ => continue, // Ignore ping/pong
                };

                match packet {
                    Ok(packet) => {
                        app_state.dispatcher.dispatch(&client, &packet);
                    }
                    Err(e) => {
                        tracing::warn!(connection = id, "Dropping undecodable frame: {}", e);
                    }
                }

                if client.is_closed() {
                    // Flush whatever the handler queued before closing.
                    while let Ok(packet) = out_rx.try_recv() {
                        if send_packet(&mut sink, &packet).await.is_err() {
                            break;
                        }
                    }
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }

            // Server -> Client
            Some(packet) = out_rx.recv() => {
                if send_packet(&mut sink, &packet).await.is_err() {
                    break;
                }
            }
        }
    }

    // Cleanup on disconnect
    for creature in client.creatures() {
        if let Some(region) = client.world().get_region(creature.region_id) {
            region.remove_player(creature.entity_id);
        }
    }
    tracing::info!(connection = id, "Client disconnected");
}

/// Create the guest creature a new connection controls and place it in the
/// start region, if that region exists.
fn spawn_guest(client: &ChannelClient, app_state: &AppState) -> Arc<PlayerCreature> {
    let creature = Arc::new(PlayerCreature {
        entity_id: GUEST_ENTITY_BASE + client.id(),
        name: format!("Guest{}", client.id()),
        region_id: app_state.start_region,
    });

    match app_state.world.get_region(app_state.start_region) {
        Some(region) => region.add_player(Arc::clone(&creature)),
        None => tracing::warn!(
            connection = client.id(),
            "Start region {} does not exist",
            app_state.start_region
        ),
    }
    client.add_creature(Arc::clone(&creature));
    creature
}

async fn send_packet(
    sink: &mut SplitSink<WebSocket, Message>,
    packet: &Packet,
) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(packet) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode packet 0x{:04X}: {}", packet.op(), e);
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}
