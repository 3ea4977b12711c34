//! Appending a batch of events to one stream.

use crate::error::{ClientError, Result};
use crate::transport::{AppendCall, CallMetadata, Connection, TransportError};
use crate::types::{
    CurrentRevision, EventData, ExpectedRevision, Position, WriteFailure, WriteResult,
};
use crate::wire::{
    AppendContent, AppendOptions, AppendReq, AppendResp, AppendResult, StreamIdentifier,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Append command: one stream, one precondition, an ordered batch of events.
///
/// Configuration methods consume and return the command. `execute` borrows
/// it, so a configured command can be executed more than once.
#[derive(Clone, Debug)]
pub struct WriteEventsToStream {
    stream: String,
    expected_revision: ExpectedRevision,
    events: Vec<EventData>,
    metadata: CallMetadata,
}

impl WriteEventsToStream {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            expected_revision: ExpectedRevision::Any,
            events: Vec::new(),
            metadata: CallMetadata::new(),
        }
    }

    /// Ask the server to check the stream state before writing.
    pub fn expected_revision(mut self, revision: ExpectedRevision) -> Self {
        self.expected_revision = revision;
        self
    }

    /// Add events to the batch. Can be called repeatedly; order is kept.
    pub fn send(mut self, events: impl IntoIterator<Item = EventData>) -> Self {
        self.events.extend(events);
        self
    }

    /// Attach call metadata passed through to the transport.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn events(&self) -> &[EventData] {
        &self.events
    }

    /// Build the header and one message per event, checking local preconditions.
    pub fn encode(&self) -> Result<Vec<AppendReq>> {
        if self.stream.is_empty() {
            return Err(ClientError::EmptyStreamName);
        }
        if self.events.is_empty() {
            return Err(ClientError::EmptyBatch);
        }

        let mut requests = Vec::with_capacity(self.events.len() + 1);
        requests.push(AppendReq {
            content: Some(AppendContent::Options(AppendOptions {
                stream_identifier: Some(StreamIdentifier::from_name(&self.stream)),
                expected_stream_revision: Some(self.expected_revision.to_wire()),
            })),
        });

        for (index, event) in self.events.iter().enumerate() {
            event
                .validate()
                .map_err(|reason| ClientError::InvalidEvent { index, reason })?;
            requests.push(AppendReq {
                content: Some(AppendContent::ProposedMessage(event.to_wire()?)),
            });
        }

        Ok(requests)
    }

    /// Send the batch.
    ///
    /// Fails only on local preconditions, before touching the connection.
    /// Everything else, transport failures included, arrives through the
    /// returned [`PendingWrite`].
    pub fn execute<C>(&self, connection: &C) -> Result<PendingWrite>
    where
        C: Connection + ?Sized,
    {
        let requests = self.encode()?;

        tracing::debug!(
            stream = %self.stream,
            events = self.events.len(),
            expected = %self.expected_revision,
            "appending to stream"
        );

        let client = match connection.streams_client() {
            Ok(client) => client,
            Err(error) => return Ok(PendingWrite::failed(&self.stream, error)),
        };

        let AppendCall { mut sink, response } = match client.append(&self.metadata) {
            Ok(call) => call,
            Err(error) => return Ok(PendingWrite::failed(&self.stream, error)),
        };

        for request in requests {
            if let Err(error) = sink.write(request) {
                return Ok(PendingWrite::failed(&self.stream, error));
            }
        }

        if let Err(error) = sink.end() {
            return Ok(PendingWrite::failed(&self.stream, error));
        }

        Ok(PendingWrite {
            state: Pending::Awaiting(response),
        })
    }
}

enum Pending {
    Ready(WriteResult),
    Awaiting(Receiver<std::result::Result<AppendResp, TransportError>>),
}

/// A write whose outcome has not been collected yet. Resolves exactly once.
pub struct PendingWrite {
    state: Pending,
}

impl PendingWrite {
    fn failed(stream: &str, error: TransportError) -> Self {
        tracing::warn!(stream = %stream, %error, "append failed before response");
        Self {
            state: Pending::Ready(WriteResult::transport(error)),
        }
    }

    /// Block until the outcome is known.
    pub fn wait(self) -> WriteResult {
        match self.state {
            Pending::Ready(result) => result,
            Pending::Awaiting(receiver) => match receiver.recv() {
                Ok(resp) => decode_append_response(resp),
                Err(_) => WriteResult::transport(TransportError::Disconnected),
            },
        }
    }

    /// Wait up to `timeout`; gives the pending write back if still unresolved.
    pub fn wait_timeout(self, timeout: Duration) -> std::result::Result<WriteResult, Self> {
        match self.state {
            Pending::Ready(result) => Ok(result),
            Pending::Awaiting(receiver) => match receiver.recv_timeout(timeout) {
                Ok(resp) => Ok(decode_append_response(resp)),
                Err(RecvTimeoutError::Disconnected) => {
                    Ok(WriteResult::transport(TransportError::Disconnected))
                }
                Err(RecvTimeoutError::Timeout) => Err(Self {
                    state: Pending::Awaiting(receiver),
                }),
            },
        }
    }

    /// Collect the outcome if it is already available.
    pub fn try_result(self) -> std::result::Result<WriteResult, Self> {
        match self.state {
            Pending::Ready(result) => Ok(result),
            Pending::Awaiting(receiver) => match receiver.try_recv() {
                Ok(resp) => Ok(decode_append_response(resp)),
                Err(TryRecvError::Disconnected) => {
                    Ok(WriteResult::transport(TransportError::Disconnected))
                }
                Err(TryRecvError::Empty) => Err(Self {
                    state: Pending::Awaiting(receiver),
                }),
            },
        }
    }
}

/// Map the single append response onto a [`WriteResult`].
pub fn decode_append_response(
    resp: std::result::Result<AppendResp, TransportError>,
) -> WriteResult {
    let resp = match resp {
        Ok(resp) => resp,
        Err(error) => return WriteResult::transport(error),
    };

    match resp.result {
        Some(AppendResult::Success(success)) => WriteResult::Success {
            next_expected_version: success.current_revision.unwrap_or(0),
            position: success.position.map(Position::from_wire),
        },

        Some(AppendResult::WrongExpectedVersion(conflict)) => {
            let current = match (conflict.current_revision, conflict.current_no_stream) {
                (Some(rev), _) => CurrentRevision::Current(rev),
                (None, true) => CurrentRevision::NoStream,
                (None, false) => {
                    tracing::debug!("conflict carries no current revision, assuming no stream");
                    CurrentRevision::NoStream
                }
            };

            let expected = if let Some(rev) = conflict.expected_revision {
                ExpectedRevision::Exact(rev)
            } else if conflict.expected_stream_exists {
                ExpectedRevision::StreamExists
            } else if conflict.expected_no_stream {
                ExpectedRevision::NoStream
            } else {
                if !conflict.expected_any {
                    tracing::debug!("conflict carries no expected revision, assuming any");
                }
                ExpectedRevision::Any
            };

            tracing::debug!(%current, %expected, "append rejected by concurrency check");
            WriteResult::Failure {
                error: WriteFailure::WrongExpectedVersion { current, expected },
            }
        }

        None => {
            tracing::warn!("append response carries no result");
            WriteResult::Failure {
                error: WriteFailure::UnknownResponse,
            }
        }
    }
}
