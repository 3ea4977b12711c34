//! Live subscription to every stream in the store.

use crate::error::{ClientError, Result};
use crate::filter::Filter;
use crate::subscriptions::{DriverState, DriverStatus, SubscriptionDriver, SubscriptionHandler};
use crate::transport::{CallMetadata, CallOptions, Connection};
use crate::types::{Position, ReadPosition};
use crate::wire::{
    AllOption, CountOption, FilterOption, ReadDirection, ReadOptions, ReadReq, StreamOption,
    UuidOption,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Subscription to the global log, starting anywhere and continuing live.
///
/// The handler is required up front; the command owns it until the
/// subscription ends and [`Subscription::join`] hands it back.
pub struct SubscribeToAll<H> {
    position: ReadPosition,
    resolve_links: bool,
    filter: Option<Filter>,
    metadata: CallMetadata,
    handler: H,
}

impl<H> SubscribeToAll<H>
where
    H: SubscriptionHandler + 'static,
{
    pub fn new(handler: H) -> Self {
        Self {
            position: ReadPosition::End,
            resolve_links: false,
            filter: None,
            metadata: CallMetadata::new(),
            handler,
        }
    }

    /// Start after the given position.
    pub fn from_position(mut self, position: Position) -> Self {
        self.position = ReadPosition::At(position);
        self
    }

    /// Start from the beginning of the log.
    pub fn from_start(mut self) -> Self {
        self.position = ReadPosition::Start;
        self
    }

    /// Start from the end of the log: live events only. Default.
    pub fn from_end(mut self) -> Self {
        self.position = ReadPosition::End;
        self
    }

    /// Deliver the events links point to, not only the links.
    pub fn resolve_links(mut self) -> Self {
        self.resolve_links = true;
        self
    }

    /// Deliver links as-is. Default.
    pub fn do_not_resolve_links(mut self) -> Self {
        self.resolve_links = false;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn position(&self) -> ReadPosition {
        self.position
    }

    /// The read request this subscription sends.
    pub fn request(&self) -> ReadReq {
        let all_option = match self.position {
            ReadPosition::Start => AllOption::Start,
            ReadPosition::End => AllOption::End,
            ReadPosition::At(position) => AllOption::Position(position.to_wire()),
        };

        let filter_option = match &self.filter {
            Some(filter) => FilterOption::Filter(filter.to_wire()),
            None => FilterOption::NoFilter,
        };

        ReadReq {
            options: Some(ReadOptions {
                stream_option: Some(StreamOption::All(all_option)),
                read_direction: ReadDirection::Forwards,
                resolve_links: self.resolve_links,
                count_option: Some(CountOption::Subscription),
                filter_option: Some(filter_option),
                uuid_option: Some(UuidOption::String),
            }),
        }
    }

    /// Open the stream and start delivering to the handler.
    ///
    /// Returns once the stream is open. If it cannot be opened the error is
    /// returned here and the handler is never called.
    pub fn execute<C>(self, connection: &C) -> Result<Subscription<H>>
    where
        C: Connection + ?Sized,
    {
        let request = self.request();

        tracing::debug!(
            position = ?self.position,
            resolve_links = self.resolve_links,
            filtered = self.filter.is_some(),
            "subscribing to all"
        );

        let client = connection.streams_client()?;
        let stream = client.read(request, &self.metadata, CallOptions { deadline: None })?;

        let driver = SubscriptionDriver::new(self.handler);
        let status = driver.status();
        let thread = thread::Builder::new()
            .name("subscribe-to-all".into())
            .spawn(move || driver.run(stream))?;

        Ok(Subscription { status, thread })
    }
}

/// A running subscription.
pub struct Subscription<H> {
    status: Arc<RwLock<DriverStatus>>,
    thread: JoinHandle<H>,
}

impl<H> Subscription<H> {
    pub fn state(&self) -> DriverState {
        self.status.read().state
    }

    /// Server-assigned id, once confirmed.
    pub fn subscription_id(&self) -> Option<String> {
        self.status.read().subscription_id.clone()
    }

    /// True once the terminal callback has run and the driver has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the subscription to end and take the handler back.
    pub fn join(self) -> Result<H> {
        self.thread.join().map_err(|_| ClientError::DriverPanicked)
    }
}
