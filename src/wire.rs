//! Structured request and response messages exchanged with the streams service.
//!
//! These mirror the service's message schema field for field. Optional
//! sub-messages are `Option`s and one-of groups are enums, so "field absent"
//! stays observable at the decode boundary. Byte-level encoding belongs to the
//! transport and is not modeled here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fully qualified name of the streams service.
pub const STREAMS_SERVICE: &str = "event_store.client.streams.Streams";

/// Metadata key carrying the payload content type.
pub const CONTENT_TYPE_KEY: &str = "content-type";

/// Metadata key carrying the event type label.
pub const EVENT_TYPE_KEY: &str = "type";

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamIdentifier {
    pub stream_name: Vec<u8>,
}

impl StreamIdentifier {
    pub fn from_name(name: &str) -> Self {
        Self {
            stream_name: name.as_bytes().to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uuid {
    Structured {
        most_significant_bits: i64,
        least_significant_bits: i64,
    },
    String(String),
}

impl Uuid {
    /// Canonical hyphenated text form.
    pub fn to_text(&self) -> String {
        match self {
            Uuid::String(s) => s.clone(),
            Uuid::Structured {
                most_significant_bits,
                least_significant_bits,
            } => {
                let mut buf = [0u8; 16];
                buf[..8].copy_from_slice(&most_significant_bits.to_be_bytes());
                buf[8..].copy_from_slice(&least_significant_bits.to_be_bytes());
                uuid::Uuid::from_bytes(buf).hyphenated().to_string()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePosition {
    pub commit_position: u64,
    pub prepare_position: u64,
}

// --- Append ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendReq {
    pub content: Option<AppendContent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AppendContent {
    Options(AppendOptions),
    ProposedMessage(ProposedMessage),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendOptions {
    pub stream_identifier: Option<StreamIdentifier>,
    pub expected_stream_revision: Option<ExpectedStreamRevision>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedStreamRevision {
    Revision(u64),
    NoStream,
    Any,
    StreamExists,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedMessage {
    pub id: Option<Uuid>,
    pub metadata: HashMap<String, String>,
    pub custom_metadata: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppendResp {
    pub result: Option<AppendResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AppendResult {
    Success(AppendSuccess),
    WrongExpectedVersion(WrongExpectedVersion),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppendSuccess {
    /// `None` when the server reports the stream as not existing.
    pub current_revision: Option<u64>,
    pub position: Option<WirePosition>,
}

/// Conflict descriptor. Each field is independently present or absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrongExpectedVersion {
    pub current_revision: Option<u64>,
    pub current_no_stream: bool,
    pub expected_revision: Option<u64>,
    pub expected_any: bool,
    pub expected_stream_exists: bool,
    pub expected_no_stream: bool,
}

// --- Read ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadReq {
    pub options: Option<ReadOptions>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub stream_option: Option<StreamOption>,
    pub read_direction: ReadDirection,
    pub resolve_links: bool,
    pub count_option: Option<CountOption>,
    pub filter_option: Option<FilterOption>,
    pub uuid_option: Option<UuidOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StreamOption {
    All(AllOption),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllOption {
    Start,
    End,
    Position(WirePosition),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadDirection {
    #[default]
    Forwards,
    Backwards,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountOption {
    Count(u64),
    Subscription,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FilterOption {
    Filter(FilterOptions),
    NoFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub filter: Option<FilterExpression>,
    pub window: Option<Window>,
    pub checkpoint_interval_multiplier: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FilterExpression {
    StreamIdentifier(Expression),
    EventType(Expression),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub regex: String,
    pub prefix: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    Max(u32),
    Count,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UuidOption {
    Structured,
    String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadResp {
    pub content: Option<ReadContent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ReadContent {
    Event(ReadEvent),
    Confirmation(SubscriptionConfirmation),
    Checkpoint(Checkpoint),
    StreamNotFound(StreamNotFound),
    CaughtUp,
    FellBehind,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadEvent {
    pub event: Option<RecordedEvent>,
    pub link: Option<RecordedEvent>,
    pub commit_position: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub id: Option<Uuid>,
    pub stream_identifier: Option<StreamIdentifier>,
    pub stream_revision: u64,
    pub prepare_position: u64,
    pub commit_position: u64,
    pub metadata: HashMap<String, String>,
    pub custom_metadata: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfirmation {
    pub subscription_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub commit_position: u64,
    pub prepare_position: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamNotFound {
    pub stream_identifier: Option<StreamIdentifier>,
}
