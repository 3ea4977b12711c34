//! Transport seams consumed by the commands.
//!
//! Channel management, service discovery and payload encoding live behind
//! these traits. A command only needs a [`Connection`] that can hand out a
//! [`StreamsClient`], and the client only needs to open streams.

use crate::wire::{AppendReq, AppendResp, ReadReq, ReadResp, STREAMS_SERVICE};
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Call failed with status {code}: {message}")]
    Status { code: i32, message: String },

    #[error("Stream disconnected before completion")]
    Disconnected,

    #[error("Stream already closed")]
    Closed,
}

/// Per-call metadata (credentials, routing hints) passed through untouched.
pub type CallMetadata = HashMap<String, String>;

/// Per-call options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// `None` means the call never times out.
    pub deadline: Option<Duration>,
}

/// Receiving half of a server stream. A closed channel is end-of-stream.
pub type ReadStream = Receiver<Result<ReadResp, TransportError>>;

/// Send side of an append call.
pub trait AppendSink: Send {
    /// Queue one request message.
    fn write(&mut self, request: AppendReq) -> Result<(), TransportError>;

    /// Close the send side. No further writes are accepted.
    fn end(&mut self) -> Result<(), TransportError>;
}

/// An open append call: a sink for requests and a single-response receiver.
pub struct AppendCall {
    pub sink: Box<dyn AppendSink>,
    /// Yields exactly one item, or disconnects if the call dies.
    pub response: Receiver<Result<AppendResp, TransportError>>,
}

/// Client bound to the streams service.
pub trait StreamsClient: Send + Sync {
    /// Open a client-streaming append call.
    fn append(&self, metadata: &CallMetadata) -> Result<AppendCall, TransportError>;

    /// Open a server-streaming read call.
    fn read(
        &self,
        request: ReadReq,
        metadata: &CallMetadata,
        options: CallOptions,
    ) -> Result<ReadStream, TransportError>;
}

/// Connection capability. Must be callable concurrently from many commands.
pub trait Connection: Send + Sync {
    fn streams_client(&self) -> Result<Arc<dyn StreamsClient>, TransportError>;
}

impl<C: Connection + ?Sized> Connection for Arc<C> {
    fn streams_client(&self) -> Result<Arc<dyn StreamsClient>, TransportError> {
        (**self).streams_client()
    }
}

/// Connection that creates its streams client once and shares it.
pub struct CachedConnection<F> {
    factory: F,
    client: Mutex<Option<Arc<dyn StreamsClient>>>,
}

impl<F> CachedConnection<F>
where
    F: Fn() -> Result<Arc<dyn StreamsClient>, TransportError> + Send + Sync,
{
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            client: Mutex::new(None),
        }
    }

    /// Forget the cached client; the next command creates a new one.
    pub fn invalidate(&self) {
        if self.client.lock().take().is_some() {
            tracing::debug!(service = STREAMS_SERVICE, "dropped cached client");
        }
    }
}

impl<F> Connection for CachedConnection<F>
where
    F: Fn() -> Result<Arc<dyn StreamsClient>, TransportError> + Send + Sync,
{
    fn streams_client(&self) -> Result<Arc<dyn StreamsClient>, TransportError> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = (self.factory)()?;
        tracing::debug!(service = STREAMS_SERVICE, "created client");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }
}
