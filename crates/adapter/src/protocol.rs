//! Protocol module - JSON message types for the remote controller
//!
//! Line-delimited JSON. Every message carries `type`, `seq` (sender sequence
//! number) and `ts` (unix milliseconds).

use serde::{Deserialize, Serialize};

use crate::core::{GameSnapshot, PlaceError};
use crate::types::{Axis, Block, GameAction, LastPlacement, Phase, Placement};

use arrayvec::ArrayVec;

/// Version spoken by this server. Clients must share the major number.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Game identifier announced in `welcome`.
pub const GAME_ID: &str = "tui-stacker";

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelloType {
    #[serde(rename = "hello")]
    Hello,
}

impl Default for HelloType {
    fn default() -> Self {
        Self::Hello
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    #[serde(rename = "command")]
    Command,
}

impl Default for CommandType {
    fn default() -> Self {
        Self::Command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlType {
    #[serde(rename = "control")]
    Control,
}

impl Default for ControlType {
    fn default() -> Self {
        Self::Control
    }
}

/// Client hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    pub requested: RequestedCapabilities,
}

impl HelloMessage {
    /// Whether the client's major version matches ours.
    pub fn is_compatible(&self) -> bool {
        match major(&self.protocol_version) {
            Some(m) => Some(m) == major(PROTOCOL_VERSION),
            None => false,
        }
    }
}

fn major(version: &str) -> Option<&str> {
    let m = version.trim().split('.').next()?;
    if m.is_empty() || !m.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(m)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(rename = "stream_observations")]
    pub stream_observations: bool,
    #[serde(rename = "command_mode")]
    pub command_mode: CommandMode,
}

/// Command message (controller only)
#[derive(Debug, Clone, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    pub mode: CommandMode,
    #[serde(default)]
    pub actions: Option<ActionList>,
    #[serde(default)]
    pub place: Option<PlaceCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandMode {
    Action,
    Place,
}

impl<'de> Deserialize<'de> for CommandMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("action") {
            Ok(Self::Action)
        } else if s.eq_ignore_ascii_case("place") {
            Ok(Self::Place)
        } else {
            Err(serde::de::Error::custom("invalid command mode"))
        }
    }
}

impl Serialize for CommandMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CommandMode::Action => serializer.serialize_str("action"),
            CommandMode::Place => serializer.serialize_str("place"),
        }
    }
}

/// Action names accepted in `action` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionName(pub GameAction);

impl<'de> Deserialize<'de> for ActionName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("trigger") {
            Ok(Self(GameAction::Trigger))
        } else if s.eq_ignore_ascii_case("reset") {
            Ok(Self(GameAction::Reset))
        } else {
            Err(serde::de::Error::custom("unknown action"))
        }
    }
}

impl Serialize for ActionName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

/// Upper bound on actions per command.
pub const MAX_ACTIONS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionList(pub ArrayVec<ActionName, MAX_ACTIONS>);

impl<'de> Deserialize<'de> for ActionList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = ActionList;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of action strings")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<ActionName, MAX_ACTIONS>::new();
                while let Some(a) = seq.next_element::<ActionName>()? {
                    out.try_push(a)
                        .map_err(|_| serde::de::Error::custom("too many actions"))?;
                }
                Ok(ActionList(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// `place` mode payload: signed offset from the block below, along the
/// mover's axis. `0` is a perfect drop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PlaceCommand {
    pub offset: f32,
}

/// Control message (claim/release controller status)
#[derive(Debug, Clone, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: ControlType,
    pub seq: u64,
    pub ts: u64,
    pub action: ControlAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Claim,
    Release,
}

impl<'de> Deserialize<'de> for ControlAction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.eq_ignore_ascii_case("claim") {
            Ok(Self::Claim)
        } else if s.eq_ignore_ascii_case("release") {
            Ok(Self::Release)
        } else {
            Err(serde::de::Error::custom("invalid control action"))
        }
    }
}

impl Serialize for ControlAction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ControlAction::Claim => serializer.serialize_str("claim"),
            ControlAction::Release => serializer.serialize_str("release"),
        }
    }
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "handshake_required")]
    HandshakeRequired,
    #[serde(rename = "protocol_mismatch")]
    ProtocolMismatch,
    #[serde(rename = "not_controller")]
    NotController,
    #[serde(rename = "controller_active")]
    ControllerActive,
    #[serde(rename = "invalid_command")]
    InvalidCommand,
    #[serde(rename = "invalid_place")]
    InvalidPlace,
    #[serde(rename = "not_playable")]
    NotPlayable,
    #[serde(rename = "backpressure")]
    Backpressure,
}

impl From<PlaceError> for ErrorCode {
    fn from(value: PlaceError) -> Self {
        match value {
            PlaceError::NotPlayable => Self::NotPlayable,
            PlaceError::NoMover | PlaceError::InvalidOffset => Self::InvalidPlace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignedRole {
    #[serde(rename = "controller")]
    Controller,
    #[serde(rename = "observer")]
    Observer,
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_id: Option<u64>,
    pub game_id: String,
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(rename = "command_modes")]
    pub command_modes: [CapabilityCommandMode; 2],
    pub actions: [ActionName; 2],
    /// Fields present in every observation.
    pub features: Vec<CapabilityFeature>,
    /// Fields omitted while unknown (no mover, nothing placed yet).
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "features_optional")]
    pub features_optional: Vec<CapabilityFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityCommandMode {
    #[serde(rename = "action")]
    Action,
    #[serde(rename = "place")]
    Place,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityFeature {
    #[serde(rename = "score")]
    Score,
    #[serde(rename = "high_score")]
    HighScore,
    #[serde(rename = "tower")]
    Tower,
    #[serde(rename = "mover")]
    Mover,
    #[serde(rename = "fragments")]
    Fragments,
    #[serde(rename = "last_event")]
    LastEvent,
    #[serde(rename = "state_hash")]
    StateHash,
}

/// Acknowledgment, sent once the command has been applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

/// Error message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

/// Game state observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub phase: PhaseName,
    pub playable: bool,
    #[serde(rename = "game_over")]
    pub game_over: bool,
    pub generation: u64,
    pub score: u32,
    #[serde(rename = "high_score")]
    pub high_score: u32,
    #[serde(rename = "tower_height")]
    pub tower_height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub top: Option<BlockSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub mover: Option<BlockSnapshot>,
    pub fragments: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "last_event")]
    #[serde(default)]
    pub last_event: Option<LastEvent>,
    #[serde(rename = "state_hash")]
    pub state_hash: StateHash,
    #[serde(rename = "clock_ms")]
    pub clock_ms: u64,
}

/// Lowercase wire name of a [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseName(pub Phase);

impl Serialize for PhaseName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for PhaseName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        let phase = [
            Phase::Idle,
            Phase::Running,
            Phase::Placing,
            Phase::Failing,
            Phase::GameOver,
        ]
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| serde::de::Error::custom("invalid phase"))?;
        Ok(Self(phase))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(rename = "size_x")]
    pub size_x: f32,
    #[serde(rename = "size_z")]
    pub size_z: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub axis: Option<AxisLower>,
}

impl From<Block> for BlockSnapshot {
    fn from(b: Block) -> Self {
        Self {
            x: b.position.x,
            y: b.position.y,
            z: b.position.z,
            size_x: b.size_x,
            size_z: b.size_z,
            axis: b.axis.map(AxisLower::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisLower {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "z")]
    Z,
}

impl From<Axis> for AxisLower {
    fn from(value: Axis) -> Self {
        match value {
            Axis::X => Self::X,
            Axis::Z => Self::Z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementLower {
    #[serde(rename = "perfect")]
    Perfect,
    #[serde(rename = "partial")]
    Partial,
    #[serde(rename = "miss")]
    Miss,
}

impl From<Placement> for PlacementLower {
    fn from(value: Placement) -> Self {
        match value {
            Placement::Perfect => Self::Perfect,
            Placement::Partial => Self::Partial,
            Placement::Miss => Self::Miss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastEvent {
    pub placement: PlacementLower,
    pub delta: f32,
    pub overlap: f32,
    pub points: u32,
    #[serde(rename = "tower_height")]
    pub tower_height: u32,
}

impl From<LastPlacement> for LastEvent {
    fn from(value: LastPlacement) -> Self {
        Self {
            placement: value.placement.into(),
            delta: value.delta,
            overlap: value.overlap,
            points: value.points,
            tower_height: value.tower_height,
        }
    }
}

/// Deterministic state hash serialized as lowercase hex (without heap allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateHash(pub u64);

impl Serialize for StateHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut buf = [0u8; 16];
        let mut v = self.0;
        for i in 0..16 {
            buf[15 - i] = HEX[(v & 0x0f) as usize];
            v >>= 4;
        }
        match std::str::from_utf8(&buf) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => Err(serde::ser::Error::custom("hex is not utf8")),
        }
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        let s = s.trim();
        if s.is_empty() || s.len() > 16 {
            return Err(serde::de::Error::custom("invalid hex length"));
        }
        let mut v: u64 = 0;
        for b in s.as_bytes() {
            let d = match b {
                b'0'..=b'9' => (b - b'0') as u64,
                b'a'..=b'f' => (b - b'a' + 10) as u64,
                b'A'..=b'F' => (b - b'A' + 10) as u64,
                _ => return Err(serde::de::Error::custom("invalid hex")),
            };
            v = (v << 4) | d;
        }
        Ok(StateHash(v))
    }
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
        #[serde(rename = "control")]
        Control(ControlMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Ok(InboundMessage::Control(m)) => Ok(ParsedMessage::Control(m)),
        Err(e) => {
            // An unknown type is answered with an error, not dropped.
            #[derive(Debug, Deserialize)]
            struct Envelope<'a> {
                #[serde(rename = "type")]
                #[serde(borrow)]
                msg_type: Option<&'a str>,
                seq: Option<u64>,
            }
            let env = serde_json::from_str::<Envelope>(json)?;
            let msg_type = env.msg_type.unwrap_or("unknown");
            if msg_type != "hello" && msg_type != "command" && msg_type != "control" {
                return Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: env.seq.unwrap_or(0),
                }));
            }
            Err(e)
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Control(ControlMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Utility Functions ==============

/// Create a hello message
pub fn create_hello(seq: u64, client_name: &str, command_mode: CommandMode) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        requested: RequestedCapabilities {
            stream_observations: true,
            command_mode,
        },
    }
}

/// Create a welcome message
pub fn create_welcome(
    seq: u64,
    client_id: u64,
    role: AssignedRole,
    controller_id: Option<u64>,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        client_id,
        role,
        controller_id,
        game_id: GAME_ID.to_string(),
        capabilities: ServerCapabilities {
            command_modes: [CapabilityCommandMode::Action, CapabilityCommandMode::Place],
            actions: [ActionName(GameAction::Trigger), ActionName(GameAction::Reset)],
            features: vec![
                CapabilityFeature::Score,
                CapabilityFeature::HighScore,
                CapabilityFeature::Tower,
                CapabilityFeature::Fragments,
                CapabilityFeature::StateHash,
            ],
            features_optional: vec![CapabilityFeature::Mover, CapabilityFeature::LastEvent],
        },
    }
}

/// Create an acknowledgment
pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

/// Create an error message
pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Build an observation from a session snapshot.
///
/// Allocation-free; `state_hash` covers everything except `seq` and `ts`.
pub fn observation_from_snapshot(snap: &GameSnapshot, seq: u64) -> ObservationMessage {
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        phase: PhaseName(snap.phase),
        playable: snap.playable(),
        game_over: snap.game_over(),
        generation: snap.generation,
        score: snap.score,
        high_score: snap.high_score,
        tower_height: snap.tower_height,
        top: snap.top.map(BlockSnapshot::from),
        mover: snap.mover.map(BlockSnapshot::from),
        fragments: snap.fragments,
        last_event: snap.last_placement.map(LastEvent::from),
        state_hash: state_hash(snap),
        clock_ms: snap.clock_ms,
    }
}

/// 64-bit FNV-1a over explicit little-endian encodings.
///
/// Every field is written at a fixed width, so the hash is identical on
/// every platform and Rust version.
#[derive(Debug, Clone)]
struct Fnv1aHasher {
    state: u64,
}

impl Fnv1aHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state ^= b as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }

    fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        // -0.0 and 0.0 hash alike.
        let v = if v == 0.0 { 0.0f32 } else { v };
        self.write(&v.to_bits().to_le_bytes());
    }

    fn write_block(&mut self, block: Option<Block>) {
        self.write_u8(block.is_some() as u8);
        if let Some(b) = block {
            self.write_f32(b.position.x);
            self.write_f32(b.position.y);
            self.write_f32(b.position.z);
            self.write_f32(b.size_x);
            self.write_f32(b.size_z);
            self.write_u8(match b.axis {
                None => 0,
                Some(Axis::X) => 1,
                Some(Axis::Z) => 2,
            });
        }
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

fn phase_tag(phase: Phase) -> u8 {
    match phase {
        Phase::Idle => 0,
        Phase::Running => 1,
        Phase::Placing => 2,
        Phase::Failing => 3,
        Phase::GameOver => 4,
    }
}

fn placement_tag(placement: Placement) -> u8 {
    match placement {
        Placement::Perfect => 0,
        Placement::Partial => 1,
        Placement::Miss => 2,
    }
}

/// Hash of every gameplay-visible field of a snapshot.
pub fn state_hash(snap: &GameSnapshot) -> StateHash {
    let mut h = Fnv1aHasher::new();
    h.write_u8(phase_tag(snap.phase));
    h.write_u64(snap.generation);
    h.write_u32(snap.score);
    h.write_u32(snap.high_score);
    h.write_u32(snap.tower_height);
    h.write_block(snap.top);
    h.write_block(snap.mover);
    h.write_u32(snap.fragments);
    h.write_u8(snap.last_placement.is_some() as u8);
    if let Some(last) = snap.last_placement {
        h.write_u8(placement_tag(last.placement));
        h.write_f32(last.delta);
        h.write_f32(last.overlap);
        h.write_u32(last.points);
        h.write_u32(last.tower_height);
    }
    h.write_u64(snap.clock_ms);
    StateHash(h.finish())
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    fn running_snapshot() -> GameSnapshot {
        GameSnapshot {
            phase: Phase::Running,
            generation: 1,
            tower_height: 2,
            top: Some(Block::new(Vec3::new(0.0, 1.0, 0.0), 3.0, 3.0, None)),
            mover: Some(Block::new(Vec3::new(-10.0, 2.0, 0.0), 3.0, 3.0, Some(Axis::X))),
            ..GameSnapshot::default()
        }
    }

    #[test]
    fn test_parse_hello() {
        let json = r#"{"type":"hello","seq":1,"ts":1234567890,"client":{"name":"bot","version":"1.0.0"},"protocol_version":"1.0.0","requested":{"stream_observations":true,"command_mode":"place"}}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Hello(msg) => {
                assert_eq!(msg.msg_type, HelloType::Hello);
                assert_eq!(msg.seq, 1);
                assert_eq!(msg.client.name, "bot");
                assert_eq!(msg.requested.command_mode, CommandMode::Place);
                assert!(msg.is_compatible());
            }
            _ => panic!("Expected Hello message"),
        }
    }

    #[test]
    fn test_version_compatibility_is_by_major() {
        let mut hello = create_hello(1, "bot", CommandMode::Action);
        hello.protocol_version = "1.7.2".to_string();
        assert!(hello.is_compatible());
        hello.protocol_version = "2.0.0".to_string();
        assert!(!hello.is_compatible());
        hello.protocol_version = "".to_string();
        assert!(!hello.is_compatible());
    }

    #[test]
    fn test_parse_command_action() {
        let json = r#"{"type":"command","seq":2,"ts":0,"mode":"action","actions":["trigger","Reset"]}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                assert_eq!(msg.mode, CommandMode::Action);
                let a = msg.actions.unwrap();
                assert_eq!(a.0.len(), 2);
                assert_eq!(a.0[0].0, GameAction::Trigger);
                assert_eq!(a.0[1].0, GameAction::Reset);
            }
            _ => panic!("Expected Command message"),
        }
    }

    #[test]
    fn test_parse_command_place() {
        let json = r#"{"type":"command","seq":3,"ts":0,"mode":"place","place":{"offset":-0.25}}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Command(msg) => {
                assert_eq!(msg.mode, CommandMode::Place);
                assert_eq!(msg.place, Some(PlaceCommand { offset: -0.25 }));
                assert!(msg.actions.is_none());
            }
            _ => panic!("Expected Command message"),
        }
    }

    #[test]
    fn test_unknown_action_is_a_parse_error() {
        let json = r#"{"type":"command","seq":4,"ts":0,"mode":"action","actions":["hardDrop"]}"#;
        assert!(parse_message(json).is_err());
    }

    #[test]
    fn test_too_many_actions_is_a_parse_error() {
        let actions = vec!["\"trigger\""; MAX_ACTIONS + 1].join(",");
        let json = format!(
            r#"{{"type":"command","seq":5,"ts":0,"mode":"action","actions":[{}]}}"#,
            actions
        );
        assert!(parse_message(&json).is_err());
    }

    #[test]
    fn test_parse_control() {
        let json = r#"{"type":"control","seq":3,"ts":0,"action":"release"}"#;

        match parse_message(json).unwrap() {
            ParsedMessage::Control(msg) => assert_eq!(msg.action, ControlAction::Release),
            _ => panic!("Expected Control message"),
        }
    }

    #[test]
    fn test_unknown_type_keeps_seq() {
        let json = r#"{"type":"ping","seq":9}"#;
        match parse_message(json).unwrap() {
            ParsedMessage::Unknown(u) => assert_eq!(u.seq, 9),
            _ => panic!("Expected Unknown message"),
        }
    }

    #[test]
    fn test_create_welcome() {
        let welcome = create_welcome(1, 7, AssignedRole::Controller, Some(7));
        assert_eq!(welcome.msg_type, WelcomeType::Welcome);
        assert_eq!(welcome.protocol_version, PROTOCOL_VERSION);
        assert_eq!(welcome.client_id, 7);
        assert_eq!(welcome.role, AssignedRole::Controller);
        assert_eq!(welcome.game_id, GAME_ID);

        let json = serde_json::to_value(&welcome).unwrap();
        assert_eq!(json["capabilities"]["actions"][0], "trigger");
        assert_eq!(json["capabilities"]["command_modes"][1], "place");
    }

    #[test]
    fn test_place_error_maps_to_error_code() {
        assert_eq!(ErrorCode::from(PlaceError::NotPlayable), ErrorCode::NotPlayable);
        assert_eq!(ErrorCode::from(PlaceError::NoMover), ErrorCode::InvalidPlace);
        assert_eq!(ErrorCode::from(PlaceError::InvalidOffset), ErrorCode::InvalidPlace);
        let err = create_error(5, PlaceError::NotPlayable.into(), PlaceError::NotPlayable.message());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], PlaceError::NotPlayable.code());
    }

    #[test]
    fn test_observation_fields() {
        let snap = running_snapshot();
        let obs = observation_from_snapshot(&snap, 11);
        let json = serde_json::to_value(obs).unwrap();

        assert_eq!(json["type"], "observation");
        assert_eq!(json["seq"], 11);
        assert_eq!(json["phase"], "running");
        assert_eq!(json["playable"], true);
        assert_eq!(json["tower_height"], 2);
        assert_eq!(json["mover"]["axis"], "x");
        assert_eq!(json["mover"]["x"], -10.0);
        assert!(json.get("last_event").is_none());
        assert_eq!(json["state_hash"].as_str().unwrap().len(), 16);
    }

    #[test]
    fn test_observation_parses_back() {
        let mut snap = running_snapshot();
        snap.last_placement = Some(LastPlacement {
            placement: Placement::Partial,
            delta: 0.5,
            overlap: 2.5,
            points: 1,
            tower_height: 3,
        });
        let obs = observation_from_snapshot(&snap, 1);
        let line = serde_json::to_string(&obs).unwrap();
        let back: ObservationMessage = serde_json::from_str(&line).unwrap();
        assert_eq!(back.phase, PhaseName(Phase::Running));
        assert_eq!(back.state_hash, obs.state_hash);
        assert_eq!(back.last_event.map(|e| e.placement), Some(PlacementLower::Partial));
    }

    #[test]
    fn test_state_hash_ignores_seq_but_tracks_state() {
        let snap = running_snapshot();
        let a = observation_from_snapshot(&snap, 1);
        let b = observation_from_snapshot(&snap, 2);
        assert_eq!(a.state_hash, b.state_hash);

        let mut moved = snap;
        moved.mover = moved.mover.map(|m| m.with_position_along(Axis::X, -9.5));
        assert_ne!(state_hash(&snap), state_hash(&moved));

        let mut next_run = snap;
        next_run.generation += 1;
        assert_ne!(state_hash(&snap), state_hash(&next_run));
    }

    #[test]
    fn test_fnv1a_matches_reference_vectors() {
        let mut h = Fnv1aHasher::new();
        assert_eq!(h.finish(), 0xcbf29ce484222325);
        h.write(b"a");
        assert_eq!(h.finish(), 0xaf63dc4c8601ec8c);

        let mut h = Fnv1aHasher::new();
        h.write(b"foobar");
        assert_eq!(h.finish(), 0x85944171f73967e8);
    }

    #[test]
    fn test_state_hash_uses_fixed_width_little_endian_fields() {
        let mut snap = GameSnapshot::default();
        snap.generation = 0x0102_0304_0506_0708;
        snap.score = 7;
        snap.clock_ms = 300;

        let mut bytes = Vec::new();
        bytes.push(0u8); // idle
        bytes.extend_from_slice(&snap.generation.to_le_bytes());
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.extend_from_slice(&snap.high_score.to_le_bytes());
        bytes.extend_from_slice(&snap.tower_height.to_le_bytes());
        bytes.push(0); // no top
        bytes.push(0); // no mover
        bytes.extend_from_slice(&snap.fragments.to_le_bytes());
        bytes.push(0); // no last placement
        bytes.extend_from_slice(&300u64.to_le_bytes());

        let mut h = Fnv1aHasher::new();
        h.write(&bytes);
        assert_eq!(state_hash(&snap), StateHash(h.finish()));
    }

    #[test]
    fn test_state_hash_hex_roundtrip() {
        let h = StateHash(0x00ab_cdef_0123_4567);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "\"00abcdef01234567\"");
        let back: StateHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
