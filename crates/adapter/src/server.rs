//! TCP server for the remote controller
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

use arrayvec::ArrayVec;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::*;
use crate::runtime::{AdapterStatus, ClientCommand, InboundCommand, InboundPayload, OutboundMessage};

fn extract_seq_best_effort(s: &str) -> Option<u64> {
    let start = s.find("\"seq\"")?;
    let after_key = &s[start + 5..];
    let colon = after_key.find(':')?;
    let rest = after_key[colon + 1..].trim_start();
    let end = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<u64>().ok()
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_pending_commands: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
            max_pending_commands: 10,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables.
    ///
    /// - `STACKER_AI_HOST` (default `127.0.0.1`)
    /// - `STACKER_AI_PORT` (default `7777`, `0` picks a free port)
    /// - `STACKER_AI_MAX_PENDING` (default `10`)
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("STACKER_AI_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);
        let port = env::var("STACKER_AI_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);
        let max_pending_commands = env::var("STACKER_AI_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        Self {
            host,
            port,
            max_pending_commands,
        }
    }

    /// Check if remote control is disabled via `STACKER_AI_DISABLED`.
    pub fn is_disabled() -> bool {
        std::env::var("STACKER_AI_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Shared server state
struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<usize>>,
    // Lock-free mirror of the counts for the game loop. Controller 0 = none.
    client_count: AtomicU16,
    streaming_count: AtomicU16,
    controller_id: AtomicUsize,
}

/// Cheap handle to the state shared between the server tasks and the
/// game-loop side of the adapter.
#[derive(Clone)]
pub struct ServerShared(Arc<ServerState>);

impl ServerShared {
    pub fn new(config: ServerConfig) -> Self {
        Self(Arc::new(ServerState {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
            client_count: AtomicU16::new(0),
            streaming_count: AtomicU16::new(0),
            controller_id: AtomicUsize::new(0),
        }))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.0.config
    }

    pub fn status(&self) -> AdapterStatus {
        let s = &self.0;
        let controller = s.controller_id.load(Ordering::Relaxed);
        AdapterStatus {
            client_count: s.client_count.load(Ordering::Relaxed),
            streaming_count: s.streaming_count.load(Ordering::Relaxed),
            controller_id: (controller != 0).then_some(controller),
        }
    }

    fn publish(&self, clients: &[ClientHandle], controller: Option<usize>) {
        let s = &self.0;
        let streaming = clients.iter().filter(|c| c.stream_observations).count();
        s.client_count
            .store(clients.len().min(u16::MAX as usize) as u16, Ordering::Relaxed);
        s.streaming_count
            .store(streaming.min(u16::MAX as usize) as u16, Ordering::Relaxed);
        s.controller_id.store(controller.unwrap_or(0), Ordering::Relaxed);
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        let clients = self.0.clients.read().await;
        clients
            .iter()
            .find(|c| c.id == client_id)
            .map(|c| c.handshaken)
            .unwrap_or(false)
    }

    /// Record `seq` if it is newer than the client's last one.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.0.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };

        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
struct ClientHandle {
    id: usize,
    is_controller: bool,
    stream_observations: bool,
    handshaken: bool,
    last_seq: Option<u64>,
    tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
enum ClientOutbound {
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
    Observation(ObservationMessage),
}

fn send_error(
    tx: &mpsc::UnboundedSender<ClientOutbound>,
    seq: u64,
    code: ErrorCode,
    message: &str,
) {
    let _ = tx.send(ClientOutbound::Error(create_error(seq, code, message)));
}

/// Start the TCP server
pub async fn run_server(
    shared: ServerShared,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let config = shared.config().clone();
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let bound = listener.local_addr()?;
    info!(addr = %bound, "adapter listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let mut client_id_counter = 0usize;

    // Outbound dispatcher.
    {
        let shared = shared.clone();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = shared.0.clients.read().await;
                match msg {
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Ack(ack));
                        }
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Error(err));
                        }
                    }
                    OutboundMessage::ToClientObservation { client_id, obs } => {
                        if let Some(c) = clients.iter().find(|c| c.id == client_id) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs));
                        }
                    }
                    OutboundMessage::BroadcastObservation { obs } => {
                        for c in clients.iter().filter(|c| c.stream_observations) {
                            let _ = c.tx.send(ClientOutbound::Observation(obs));
                        }
                    }
                }
            }
        });
    }

    // Accept incoming connections
    loop {
        let (socket, addr) = listener.accept().await?;
        client_id_counter += 1;
        let client_id = client_id_counter;

        info!(client_id, %addr, "client connected");

        let shared = shared.clone();
        let command_tx = command_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, client_id, shared, command_tx).await {
                warn!(client_id, error = %e, "client error");
            }
            info!(client_id, "client disconnected");
        });
    }
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    client_id: usize,
    shared: ServerShared,
    command_tx: mpsc::Sender<InboundCommand>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    {
        let controller = shared.0.controller.read().await;
        let mut clients = shared.0.clients.write().await;
        clients.push(ClientHandle {
            id: client_id,
            is_controller: false,
            stream_observations: false,
            handshaken: false,
            last_seq: None,
            tx: tx.clone(),
        });
        shared.publish(&clients, *controller);
    }

    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(4096);
        while let Some(msg) = rx.recv().await {
            buf.clear();
            let encoded = match &msg {
                ClientOutbound::Ack(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Error(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Welcome(v) => serde_json::to_writer(&mut buf, v),
                ClientOutbound::Observation(v) => serde_json::to_writer(&mut buf, v),
            };
            if encoded.is_err() {
                continue;
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(client_id, line = trimmed, "recv");

        match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                if shared.is_handshaken(client_id).await
                    && !shared.check_and_update_seq(client_id, hello.seq).await
                {
                    send_error(&tx, hello.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                if !hello.is_compatible() {
                    let message = format!("Protocol version {} not supported", hello.protocol_version);
                    send_error(&tx, hello.seq, ErrorCode::ProtocolMismatch, &message);
                    break;
                }

                // First client to hello becomes controller.
                let (role, controller_id) = {
                    let mut controller = shared.0.controller.write().await;
                    let mut clients = shared.0.clients.write().await;
                    let claim = controller.is_none();
                    if claim {
                        *controller = Some(client_id);
                        info!(client_id, "client is now controller");
                    }
                    if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                        client.handshaken = true;
                        client.last_seq = Some(hello.seq);
                        client.stream_observations = hello.requested.stream_observations;
                        if claim {
                            client.is_controller = true;
                        }
                    }
                    shared.publish(&clients, *controller);
                    let role = if *controller == Some(client_id) {
                        AssignedRole::Controller
                    } else {
                        AssignedRole::Observer
                    };
                    (role, *controller)
                };

                let welcome = create_welcome(
                    hello.seq,
                    client_id as u64,
                    role,
                    controller_id.map(|id| id as u64),
                );
                let _ = tx.send(ClientOutbound::Welcome(welcome));

                if hello.requested.stream_observations {
                    let _ = command_tx.try_send(InboundCommand {
                        client_id,
                        seq: hello.seq,
                        payload: InboundPayload::SnapshotRequest,
                    });
                }
            }

            Ok(ParsedMessage::Command(cmd)) => {
                if !shared.is_handshaken(client_id).await {
                    send_error(&tx, cmd.seq, ErrorCode::HandshakeRequired, "Send hello before command");
                    continue;
                }

                if !shared.check_and_update_seq(client_id, cmd.seq).await {
                    send_error(&tx, cmd.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                let is_controller = {
                    let clients = shared.0.clients.read().await;
                    clients
                        .iter()
                        .find(|c| c.id == client_id)
                        .map(|c| c.is_controller)
                        .unwrap_or(false)
                };
                if !is_controller {
                    send_error(&tx, cmd.seq, ErrorCode::NotController, "Only controller may send commands");
                    continue;
                }

                let mapped = match map_command(&cmd) {
                    Ok(c) => c,
                    Err((code, message)) => {
                        send_error(&tx, cmd.seq, code, message);
                        continue;
                    }
                };

                // Backpressure: bounded queue. The game loop acks after applying.
                if command_tx
                    .try_send(InboundCommand {
                        client_id,
                        seq: cmd.seq,
                        payload: InboundPayload::Command(mapped),
                    })
                    .is_err()
                {
                    send_error(&tx, cmd.seq, ErrorCode::Backpressure, "Command queue is full");
                }
            }

            Ok(ParsedMessage::Control(ctrl)) => {
                if !shared.is_handshaken(client_id).await {
                    send_error(&tx, ctrl.seq, ErrorCode::HandshakeRequired, "Send hello before control");
                    continue;
                }

                if !shared.check_and_update_seq(client_id, ctrl.seq).await {
                    send_error(&tx, ctrl.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }

                let mut controller = shared.0.controller.write().await;
                let mut clients = shared.0.clients.write().await;
                match ctrl.action {
                    ControlAction::Claim => {
                        if controller.is_none() || *controller == Some(client_id) {
                            *controller = Some(client_id);
                            if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                                client.is_controller = true;
                            }
                            info!(client_id, "controller claimed");
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        } else {
                            send_error(&tx, ctrl.seq, ErrorCode::ControllerActive, "Controller already assigned");
                        }
                    }
                    ControlAction::Release => {
                        if *controller == Some(client_id) {
                            *controller = None;
                            if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
                                client.is_controller = false;
                            }
                            info!(client_id, "controller released");
                            let _ = tx.send(ClientOutbound::Ack(create_ack(ctrl.seq)));
                        } else {
                            send_error(&tx, ctrl.seq, ErrorCode::NotController, "Only controller may release");
                        }
                    }
                }
                shared.publish(&clients, *controller);
            }

            Ok(ParsedMessage::Unknown(unknown)) => {
                if shared.is_handshaken(client_id).await
                    && !shared.check_and_update_seq(client_id, unknown.seq).await
                {
                    send_error(&tx, unknown.seq, ErrorCode::InvalidCommand, "seq must be strictly increasing");
                    continue;
                }
                send_error(&tx, unknown.seq, ErrorCode::InvalidCommand, "Unknown message type");
            }

            Err(e) => {
                let seq = extract_seq_best_effort(trimmed).unwrap_or(0);
                send_error(&tx, seq, ErrorCode::InvalidCommand, &format!("JSON parse error: {}", e));
            }
        }
    }

    // Remove the client; promote the lowest handshaken id if it held control.
    {
        let mut controller = shared.0.controller.write().await;
        let mut clients = shared.0.clients.write().await;

        let was_controller = *controller == Some(client_id);
        clients.retain(|c| c.id != client_id);

        if was_controller {
            let next_id = clients.iter().filter(|c| c.handshaken).map(|c| c.id).min();
            *controller = next_id;
            match next_id {
                Some(new_id) => {
                    if let Some(c) = clients.iter_mut().find(|c| c.id == new_id) {
                        c.is_controller = true;
                    }
                    info!(client_id = new_id, "controller promoted");
                }
                None => info!(client_id, "controller released on disconnect"),
            }
        }
        shared.publish(&clients, *controller);
    }

    drop(tx);
    let _ = write_task.await;

    Ok(())
}

/// Map a protocol command into a game-loop command.
fn map_command(cmd: &CommandMessage) -> Result<ClientCommand, (ErrorCode, &'static str)> {
    match cmd.mode {
        CommandMode::Action => {
            let Some(ref list) = cmd.actions else {
                return Err((ErrorCode::InvalidCommand, "Missing actions"));
            };
            let actions: ArrayVec<_, MAX_ACTIONS> = list.0.iter().map(|a| a.0).collect();
            Ok(ClientCommand::Actions(actions))
        }
        CommandMode::Place => {
            let Some(place) = cmd.place else {
                return Err((ErrorCode::InvalidPlace, "Missing place"));
            };
            if !place.offset.is_finite() {
                return Err((ErrorCode::InvalidPlace, "offset must be finite"));
            }
            Ok(ClientCommand::Place {
                offset: place.offset,
            })
        }
    }
}
