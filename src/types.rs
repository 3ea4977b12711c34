//! Core value types for appends and subscriptions.

use crate::transport::TransportError;
use crate::wire;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coordinate of an event in the global log.
///
/// Ordering is commit-position-major, then prepare position.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Position {
    pub commit: u64,
    pub prepare: u64,
}

impl Position {
    pub fn new(commit: u64, prepare: u64) -> Self {
        Self { commit, prepare }
    }

    pub(crate) fn to_wire(self) -> wire::WirePosition {
        wire::WirePosition {
            commit_position: self.commit,
            prepare_position: self.prepare,
        }
    }

    pub(crate) fn from_wire(pos: wire::WirePosition) -> Self {
        Self {
            commit: pos.commit_position,
            prepare: pos.prepare_position,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position(C:{}/P:{})", self.commit, self.prepare)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{}/P:{}", self.commit, self.prepare)
    }
}

/// Where a read of the global log starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadPosition {
    /// Beginning of the log.
    Start,
    /// Tail of the log: live events only.
    #[default]
    End,
    /// An exact log coordinate.
    At(Position),
}

impl From<Position> for ReadPosition {
    fn from(position: Position) -> Self {
        ReadPosition::At(position)
    }
}

/// Precondition checked by the server before a write is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedRevision {
    /// No check.
    #[default]
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must exist, at any revision.
    StreamExists,
    /// The stream must be at exactly this revision.
    Exact(u64),
}

impl ExpectedRevision {
    pub(crate) fn to_wire(self) -> wire::ExpectedStreamRevision {
        match self {
            ExpectedRevision::Any => wire::ExpectedStreamRevision::Any,
            ExpectedRevision::NoStream => wire::ExpectedStreamRevision::NoStream,
            ExpectedRevision::StreamExists => wire::ExpectedStreamRevision::StreamExists,
            ExpectedRevision::Exact(rev) => wire::ExpectedStreamRevision::Revision(rev),
        }
    }
}

impl fmt::Display for ExpectedRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedRevision::Any => write!(f, "any"),
            ExpectedRevision::NoStream => write!(f, "no_stream"),
            ExpectedRevision::StreamExists => write!(f, "stream_exists"),
            ExpectedRevision::Exact(rev) => write!(f, "{}", rev),
        }
    }
}

/// Actual stream state reported by the server on a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentRevision {
    NoStream,
    Current(u64),
}

impl fmt::Display for CurrentRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurrentRevision::NoStream => write!(f, "no_stream"),
            CurrentRevision::Current(rev) => write!(f, "{}", rev),
        }
    }
}

/// Event payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    /// Structured value, sent as UTF-8 JSON text.
    Json(serde_json::Value),
    /// Opaque bytes, sent as-is.
    Binary(Vec<u8>),
}

impl EventPayload {
    pub fn content_type(&self) -> &'static str {
        match self {
            EventPayload::Json(_) => wire::CONTENT_TYPE_JSON,
            EventPayload::Binary(_) => wire::CONTENT_TYPE_BINARY,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            EventPayload::Json(value) => serde_json::to_vec(value),
            EventPayload::Binary(bytes) => Ok(bytes.clone()),
        }
    }
}

/// An event to append.
#[derive(Clone, Debug, PartialEq)]
pub struct EventData {
    pub id: String,
    pub event_type: String,
    pub payload: EventPayload,
}

impl EventData {
    /// Create an event with a JSON payload and a fresh identifier.
    pub fn json(
        event_type: impl Into<String>,
        payload: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            payload: EventPayload::Json(serde_json::to_value(payload)?),
        })
    }

    /// Create an event with raw bytes and a fresh identifier.
    pub fn binary(event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            payload: EventPayload::Binary(payload),
        }
    }

    /// Replace the generated identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Check the batch invariant: identifier and type are non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("event id is empty".into());
        }
        if self.event_type.is_empty() {
            return Err("event type is empty".into());
        }
        Ok(())
    }

    pub(crate) fn to_wire(&self) -> Result<wire::ProposedMessage, serde_json::Error> {
        let mut metadata = HashMap::with_capacity(2);
        metadata.insert(
            wire::CONTENT_TYPE_KEY.to_string(),
            self.payload.content_type().to_string(),
        );
        metadata.insert(wire::EVENT_TYPE_KEY.to_string(), self.event_type.clone());

        Ok(wire::ProposedMessage {
            id: Some(wire::Uuid::String(self.id.clone())),
            metadata,
            custom_metadata: Vec::new(),
            data: self.payload.to_bytes()?,
        })
    }
}

/// An event as recorded by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    pub id: String,
    pub stream_id: String,
    pub revision: u64,
    pub position: Position,
    pub event_type: String,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    pub custom_metadata: Vec<u8>,
    pub data: Vec<u8>,
}

impl RecordedEvent {
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref() == Some(wire::CONTENT_TYPE_JSON)
    }

    /// Deserialize the payload as JSON.
    pub fn as_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }

    pub(crate) fn from_wire(event: wire::RecordedEvent) -> Result<Self, String> {
        let id = event
            .id
            .map(|id| id.to_text())
            .ok_or_else(|| "recorded event has no id".to_string())?;

        let stream_name = event
            .stream_identifier
            .ok_or_else(|| format!("recorded event {} has no stream identifier", id))?
            .stream_name;
        let stream_id = String::from_utf8(stream_name)
            .map_err(|_| format!("recorded event {} has a non UTF-8 stream name", id))?;

        let event_type = event
            .metadata
            .get(wire::EVENT_TYPE_KEY)
            .cloned()
            .unwrap_or_default();
        let content_type = event.metadata.get(wire::CONTENT_TYPE_KEY).cloned();

        Ok(Self {
            id,
            stream_id,
            revision: event.stream_revision,
            position: Position::new(event.commit_position, event.prepare_position),
            event_type,
            content_type,
            metadata: event.metadata,
            custom_metadata: event.custom_metadata,
            data: event.data,
        })
    }
}

/// An event delivered by a subscription, possibly reached through a link.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEvent {
    /// The resolved target event (absent if a link could not be resolved).
    pub event: Option<RecordedEvent>,
    /// The link event, when the subscription read a link.
    pub link: Option<RecordedEvent>,
    pub commit_position: Option<u64>,
}

impl ResolvedEvent {
    /// The event as it appears in the subscribed log: the link if any, else the event.
    pub fn original(&self) -> Option<&RecordedEvent> {
        self.link.as_ref().or(self.event.as_ref())
    }

    pub fn is_resolved(&self) -> bool {
        self.link.is_some() && self.event.is_some()
    }

    pub(crate) fn from_wire(read: wire::ReadEvent) -> Result<Self, String> {
        let event = read.event.map(RecordedEvent::from_wire).transpose()?;
        let link = read.link.map(RecordedEvent::from_wire).transpose()?;

        if event.is_none() && link.is_none() {
            return Err("read event carries neither an event nor a link".into());
        }

        Ok(Self {
            event,
            link,
            commit_position: read.commit_position,
        })
    }
}

/// Why a write did not succeed.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteFailure {
    /// The transport failed before a response arrived.
    Transport(TransportError),
    /// The optimistic-concurrency check did not hold.
    WrongExpectedVersion {
        current: CurrentRevision,
        expected: ExpectedRevision,
    },
    /// The server answered with a response carrying no known result.
    UnknownResponse,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteFailure::Transport(e) => write!(f, "transport error: {}", e),
            WriteFailure::WrongExpectedVersion { current, expected } => write!(
                f,
                "wrong expected version: expected {}, current {}",
                expected, current
            ),
            WriteFailure::UnknownResponse => write!(f, "unrecognized append response"),
        }
    }
}

/// Outcome of one append.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteResult {
    Success {
        next_expected_version: u64,
        position: Option<Position>,
    },
    Failure {
        error: WriteFailure,
    },
}

impl WriteResult {
    /// Variant tag: `"success"` or `"failure"`.
    pub fn typename(&self) -> &'static str {
        match self {
            WriteResult::Success { .. } => "success",
            WriteResult::Failure { .. } => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Success { .. })
    }

    pub fn failure(&self) -> Option<&WriteFailure> {
        match self {
            WriteResult::Failure { error } => Some(error),
            WriteResult::Success { .. } => None,
        }
    }

    pub(crate) fn transport(error: TransportError) -> Self {
        WriteResult::Failure {
            error: WriteFailure::Transport(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_commit_major_ordering() {
        let p1 = Position::new(10, 5);
        let p2 = Position::new(20, 1);
        assert!(p1 < p2);
        assert!(Position::new(10, 1) < Position::new(10, 2));
    }

    #[test]
    fn test_event_data_json() {
        let event = EventData::json("order-created", &json!({"total": 12})).unwrap();

        assert_eq!(event.event_type, "order-created");
        assert!(uuid::Uuid::parse_str(&event.id).is_ok());
        assert_eq!(event.payload.content_type(), "application/json");

        let message = event.to_wire().unwrap();
        assert_eq!(message.metadata["type"], "order-created");
        assert_eq!(message.metadata["content-type"], "application/json");
        assert_eq!(message.data, br#"{"total":12}"#.to_vec());
    }

    #[test]
    fn test_event_data_binary_passthrough() {
        let event = EventData::binary("blob", vec![0, 159, 146, 150]).with_id("fixed");
        let message = event.to_wire().unwrap();

        assert_eq!(message.id, Some(wire::Uuid::String("fixed".into())));
        assert_eq!(message.metadata["content-type"], "application/octet-stream");
        assert_eq!(message.data, vec![0, 159, 146, 150]);
    }

    #[test]
    fn test_event_data_validate() {
        assert!(EventData::binary("t", vec![]).validate().is_ok());
        assert!(EventData::binary("", vec![]).validate().is_err());
        assert!(EventData::binary("t", vec![]).with_id("").validate().is_err());
    }

    #[test]
    fn test_resolved_event_original_prefers_link() {
        let recorded = |stream: &str, commit: u64| wire::RecordedEvent {
            id: Some(wire::Uuid::String(format!("{}-{}", stream, commit))),
            stream_identifier: Some(wire::StreamIdentifier::from_name(stream)),
            commit_position: commit,
            prepare_position: commit,
            ..Default::default()
        };

        let resolved = ResolvedEvent::from_wire(wire::ReadEvent {
            event: Some(recorded("target", 1)),
            link: Some(recorded("$ce-target", 7)),
            commit_position: Some(7),
        })
        .unwrap();

        assert!(resolved.is_resolved());
        let original = resolved.original().unwrap();
        assert_eq!(original.stream_id, "$ce-target");
        assert_eq!(original.position, Position::new(7, 7));
    }

    #[test]
    fn test_recorded_event_requires_stream() {
        let result = RecordedEvent::from_wire(wire::RecordedEvent {
            id: Some(wire::Uuid::String("a".into())),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_write_result_typename() {
        let ok = WriteResult::Success {
            next_expected_version: 3,
            position: None,
        };
        assert_eq!(ok.typename(), "success");
        assert!(ok.failure().is_none());

        let failed = WriteResult::Failure {
            error: WriteFailure::UnknownResponse,
        };
        assert_eq!(failed.typename(), "failure");
        assert!(!failed.is_success());
    }
}
