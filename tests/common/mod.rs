//! In-memory transport shared by the integration tests.

#![allow(dead_code)]

use crossbeam_channel::{bounded, unbounded, Sender};
use eventstore_streams::wire::{AppendReq, AppendResp, ReadReq, ReadResp};
use eventstore_streams::{
    AppendCall, AppendSink, CallMetadata, CallOptions, Connection, ReadStream, StreamsClient,
    TransportError,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Everything the mock client saw.
#[derive(Default)]
pub struct Recorded {
    pub appends: Vec<Vec<AppendReq>>,
    pub append_metadata: Vec<CallMetadata>,
    pub reads: Vec<(ReadReq, CallOptions)>,
}

pub struct MockClient {
    pub recorded: Arc<Mutex<Recorded>>,
    append_response: Mutex<Option<Result<AppendResp, TransportError>>>,
    fail_write_at: Mutex<Option<usize>>,
    read_stream: Mutex<Option<ReadStream>>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            append_response: Mutex::new(None),
            fail_write_at: Mutex::new(None),
            read_stream: Mutex::new(None),
        })
    }

    /// Response delivered once the append sink is ended.
    pub fn respond_with(&self, response: Result<AppendResp, TransportError>) {
        *self.append_response.lock() = Some(response);
    }

    /// Make the n-th write (0-based) of the next append fail.
    pub fn fail_write_at(&self, index: usize) {
        *self.fail_write_at.lock() = Some(index);
    }

    /// Prepare the next read call; push server messages through the sender.
    pub fn feed(&self) -> Sender<Result<ReadResp, TransportError>> {
        let (tx, rx) = unbounded();
        *self.read_stream.lock() = Some(rx);
        tx
    }
}

struct MockSink {
    recorded: Arc<Mutex<Recorded>>,
    written: Vec<AppendReq>,
    fail_write_at: Option<usize>,
    response: Option<Result<AppendResp, TransportError>>,
    responder: Option<Sender<Result<AppendResp, TransportError>>>,
}

impl AppendSink for MockSink {
    fn write(&mut self, request: AppendReq) -> Result<(), TransportError> {
        if self.fail_write_at == Some(self.written.len()) {
            return Err(TransportError::Status {
                code: 14,
                message: "write refused".into(),
            });
        }
        self.written.push(request);
        Ok(())
    }

    fn end(&mut self) -> Result<(), TransportError> {
        let responder = self.responder.take().ok_or(TransportError::Closed)?;
        self.recorded
            .lock()
            .appends
            .push(std::mem::take(&mut self.written));
        if let Some(response) = self.response.take() {
            let _ = responder.send(response);
        }
        Ok(())
    }
}

impl StreamsClient for MockClient {
    fn append(&self, metadata: &CallMetadata) -> Result<AppendCall, TransportError> {
        self.recorded.lock().append_metadata.push(metadata.clone());

        let (responder, response) = bounded(1);
        let sink = MockSink {
            recorded: Arc::clone(&self.recorded),
            written: Vec::new(),
            fail_write_at: self.fail_write_at.lock().take(),
            response: self.append_response.lock().take(),
            responder: Some(responder),
        };

        Ok(AppendCall {
            sink: Box::new(sink),
            response,
        })
    }

    fn read(
        &self,
        request: ReadReq,
        _metadata: &CallMetadata,
        options: CallOptions,
    ) -> Result<ReadStream, TransportError> {
        self.recorded.lock().reads.push((request, options));
        self.read_stream
            .lock()
            .take()
            .ok_or_else(|| TransportError::Unavailable("no read stream prepared".into()))
    }
}

/// Connection handing out one shared mock client, counting lookups.
pub struct MockConnection {
    pub client: Arc<MockClient>,
    pub lookups: AtomicUsize,
    pub unavailable: bool,
}

impl MockConnection {
    pub fn new(client: Arc<MockClient>) -> Self {
        Self {
            client,
            lookups: AtomicUsize::new(0),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            client: MockClient::new(),
            lookups: AtomicUsize::new(0),
            unavailable: true,
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {
    fn streams_client(&self) -> Result<Arc<dyn StreamsClient>, TransportError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(TransportError::Unavailable("no leader".into()));
        }
        Ok(Arc::clone(&self.client) as Arc<dyn StreamsClient>)
    }
}
