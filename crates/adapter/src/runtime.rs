//! Adapter runtime integration.
//!
//! Bridges the synchronous game loop with the async TCP server. The game
//! loop polls [`Adapter::try_recv`] once per tick and answers through
//! [`Adapter::send`]; neither call blocks.

use std::net::SocketAddr;

use arrayvec::ArrayVec;
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::protocol::{AckMessage, ErrorMessage, ObservationMessage, MAX_ACTIONS};
use crate::server::{run_server, ServerConfig, ServerShared};
use crate::types::GameAction;

/// Command delivered to the game loop.
#[derive(Debug, Clone)]
pub struct InboundCommand {
    pub client_id: usize,
    pub seq: u64,
    pub payload: InboundPayload,
}

#[derive(Debug, Clone)]
pub enum InboundPayload {
    Command(ClientCommand),
    /// A client asked for observations; send it one right away.
    SnapshotRequest,
}

/// Command payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Actions(ArrayVec<GameAction, MAX_ACTIONS>),
    Place { offset: f32 },
}

/// Outbound message to be delivered by the server.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    ToClientAck { client_id: usize, ack: AckMessage },
    ToClientError { client_id: usize, err: ErrorMessage },
    ToClientObservation { client_id: usize, obs: ObservationMessage },
    /// Sent to every client that asked for observations.
    BroadcastObservation { obs: ObservationMessage },
}

/// Connection counts for the HUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterStatus {
    pub client_count: u16,
    pub streaming_count: u16,
    pub controller_id: Option<usize>,
}

/// Running adapter instance.
pub struct Adapter {
    _rt: Runtime,
    cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
    shared: ServerShared,
    addr: Option<SocketAddr>,
}

impl Adapter {
    /// Start the adapter from environment variables.
    ///
    /// Returns `None` if `STACKER_AI_DISABLED` is set or no runtime could be
    /// created.
    pub fn start_from_env() -> Option<Self> {
        if ServerConfig::is_disabled() {
            info!("remote control disabled via STACKER_AI_DISABLED");
            return None;
        }
        Self::start(ServerConfig::from_env())
    }

    pub fn start(config: ServerConfig) -> Option<Self> {
        let max_pending = config.max_pending_commands.max(1);
        let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(max_pending);
        let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let (ready_tx, ready_rx) = oneshot::channel::<SocketAddr>();

        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                warn!(error = %e, "could not create tokio runtime; remote control off");
                return None;
            }
        };

        let shared = ServerShared::new(config.clone());
        let server_shared = shared.clone();
        rt.spawn(async move {
            if let Err(e) = run_server(server_shared, cmd_tx, out_rx, Some(ready_tx)).await {
                warn!(error = %e, "adapter server stopped");
            }
        });

        // Bind errors surface here as a dropped sender.
        let addr = rt.block_on(ready_rx).ok();
        if addr.is_none() {
            warn!(host = %config.host, port = config.port, "adapter failed to bind");
        }

        Some(Self {
            _rt: rt,
            cmd_rx,
            out_tx,
            shared,
            addr,
        })
    }

    /// Address the server listens on, if it bound successfully.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn try_recv(&mut self) -> Option<InboundCommand> {
        self.cmd_rx.try_recv().ok()
    }

    pub fn send(&self, msg: OutboundMessage) {
        let _ = self.out_tx.send(msg);
    }

    /// Current connection counts, without waiting on the server.
    pub fn status(&self) -> AdapterStatus {
        self.shared.status()
    }
}
