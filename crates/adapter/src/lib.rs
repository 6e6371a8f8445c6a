//! Adapter module - remote control via TCP socket with JSON protocol
//!
//! Lets an external program play the game: it sends the same discrete
//! `trigger`/`reset` events a keyboard would, or asks for a placement at a
//! chosen offset, and receives observations of the session.
//!
//! # Protocol Overview
//!
//! A **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: client connects (default `127.0.0.1:7777`)
//! 2. **Handshake**: client sends `hello`, server answers `welcome`
//! 3. **Controller Assignment**: the first client to hello controls the game
//! 4. **Observation Streaming**: clients that asked for it get one
//!    observation per frame
//! 5. **Commanding**: the controller sends commands; each is acknowledged
//!    after the game loop applied it
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: handshake with client info and requested capabilities
//! - **command**: `action` mode (`["trigger","reset"]`) or `place` mode
//!   (`{"offset": f}` relative to the block below)
//! - **control**: `claim` or `release` controller status
//!
//! ## Server → Client
//!
//! - **welcome**: assigned client id, role and server capabilities
//! - **observation**: phase, score, tower height, top block, mover, last
//!   placement and a deterministic `state_hash`
//! - **ack**: command applied
//! - **error**: `code` plus a human readable `message`
//!
//! `seq` must strictly increase per client. A full command queue is
//! reported as `backpressure`, never by blocking the socket.
//!
//! # Environment Variables
//!
//! - `STACKER_AI_HOST`: bind address (default: "127.0.0.1")
//! - `STACKER_AI_PORT`: port number (default: 7777)
//! - `STACKER_AI_MAX_PENDING`: command queue length (default: 10)
//! - `STACKER_AI_DISABLED`: "1" or "true" disables the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"bot","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true,"command_mode":"place"}}
//! Server -> Client: {"type":"welcome","seq":1,"ts":...,"protocol_version":"1.0.0","client_id":1,"role":"controller",...}
//! Server -> Client: {"type":"observation","seq":1,"phase":"idle","playable":false,...}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"mode":"action","actions":["trigger"]}
//! Server -> Client: {"type":"ack","seq":2,"ts":...,"status":"ok"}
//! Client -> Server: {"type":"command","seq":3,"ts":0,"mode":"place","place":{"offset":0.0}}
//! Server -> Client: {"type":"ack","seq":3,"ts":...,"status":"ok"}
//! ```
//!
//! Manual testing works with netcat: `nc 127.0.0.1 7777`.

pub mod protocol;
pub mod runtime;
pub mod server;

pub use tui_stacker_core as core;
pub use tui_stacker_types as types;

pub use protocol::*;
pub use runtime::{
    Adapter, AdapterStatus, ClientCommand, InboundCommand, InboundPayload, OutboundMessage,
};
pub use server::{run_server, ServerConfig, ServerShared};
