//! Turns a stream of read responses into handler callbacks.

use crate::transport::{ReadStream, TransportError};
use crate::types::{Position, ResolvedEvent};
use crate::wire::{ReadContent, ReadResp};
use parking_lot::RwLock;
use std::sync::Arc;

use super::types::{SubscriptionError, SubscriptionHandler};

/// Lifecycle state of one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Stream open, nothing received yet.
    Unconfirmed,
    /// Confirmed, or already delivering.
    Active,
    /// Terminal callback delivered. Everything else is ignored.
    Terminated,
}

/// State shared between a driver and whoever observes it.
#[derive(Clone, Debug)]
pub(crate) struct DriverStatus {
    pub state: DriverState,
    pub subscription_id: Option<String>,
}

/// Demultiplexes read responses into [`SubscriptionHandler`] callbacks.
///
/// Holds one message at a time; there is no internal queue.
pub struct SubscriptionDriver<H> {
    handler: H,
    status: Arc<RwLock<DriverStatus>>,
}

impl<H: SubscriptionHandler> SubscriptionDriver<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            status: Arc::new(RwLock::new(DriverStatus {
                state: DriverState::Unconfirmed,
                subscription_id: None,
            })),
        }
    }

    pub fn state(&self) -> DriverState {
        self.status.read().state
    }

    pub fn subscription_id(&self) -> Option<String> {
        self.status.read().subscription_id.clone()
    }

    pub(crate) fn status(&self) -> Arc<RwLock<DriverStatus>> {
        Arc::clone(&self.status)
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Feed one item from the transport. Returns the state afterwards.
    pub fn dispatch(&mut self, item: Result<ReadResp, TransportError>) -> DriverState {
        let state = self.state();
        if state == DriverState::Terminated {
            tracing::warn!("message received after subscription terminated, ignoring");
            return state;
        }

        let resp = match item {
            Ok(resp) => resp,
            Err(error) => {
                tracing::debug!(%error, "subscription transport failed");
                self.terminate();
                self.handler.on_error(error);
                return DriverState::Terminated;
            }
        };

        let content = match resp.content {
            Some(content) => content,
            None => return self.drop_with("read response has no content".into()),
        };

        match content {
            ReadContent::Confirmation(confirmation) => {
                if state == DriverState::Active {
                    let subscription_id = confirmation.subscription_id;
                    let error = if self.subscription_id().is_some() {
                        tracing::warn!(%subscription_id, "duplicate subscription confirmation");
                        SubscriptionError::DuplicateConfirmation { subscription_id }
                    } else {
                        tracing::warn!(%subscription_id, "confirmation after delivery started");
                        SubscriptionError::UnexpectedConfirmation { subscription_id }
                    };
                    self.terminate();
                    self.handler.on_dropped(Some(error));
                    return DriverState::Terminated;
                }

                tracing::debug!(
                    subscription_id = %confirmation.subscription_id,
                    "subscription confirmed"
                );
                {
                    let mut status = self.status.write();
                    status.state = DriverState::Active;
                    status.subscription_id = Some(confirmation.subscription_id.clone());
                }
                self.handler.on_confirmation(&confirmation.subscription_id);
            }

            ReadContent::Event(read) => {
                let event = match ResolvedEvent::from_wire(read) {
                    Ok(event) => event,
                    Err(reason) => return self.drop_with(reason),
                };
                let position = match event.original() {
                    Some(original) => original.position,
                    None => return self.drop_with("event without original".into()),
                };

                self.activate();
                tracing::trace!(%position, "event appeared");
                self.handler.on_event(event, position);
            }

            ReadContent::Checkpoint(checkpoint) => {
                let position =
                    Position::new(checkpoint.commit_position, checkpoint.prepare_position);
                self.activate();
                tracing::trace!(%position, "checkpoint reached");
                self.handler.on_checkpoint(position);
            }

            ReadContent::CaughtUp => {
                self.activate();
                tracing::debug!("subscription caught up");
                self.handler.on_caught_up();
            }

            ReadContent::FellBehind => {
                self.activate();
                tracing::debug!("subscription fell behind");
                self.handler.on_fell_behind();
            }

            ReadContent::StreamNotFound(not_found) => {
                let name = not_found
                    .stream_identifier
                    .map(|s| String::from_utf8_lossy(&s.stream_name).into_owned())
                    .unwrap_or_default();
                self.terminate();
                self.handler.on_dropped(Some(SubscriptionError::StreamNotFound(name)));
                return DriverState::Terminated;
            }
        }

        self.state()
    }

    /// Signal a graceful end of stream.
    pub fn finish(&mut self) {
        if self.state() == DriverState::Terminated {
            return;
        }
        tracing::debug!("subscription stream ended");
        self.terminate();
        self.handler.on_dropped(None);
    }

    /// Drive the handler until the stream terminates, then hand it back.
    pub fn run(mut self, stream: ReadStream) -> H {
        for item in stream.iter() {
            if self.dispatch(item) == DriverState::Terminated {
                break;
            }
        }
        self.finish();
        self.handler
    }

    fn activate(&self) {
        let mut status = self.status.write();
        if status.state == DriverState::Unconfirmed {
            status.state = DriverState::Active;
        }
    }

    fn terminate(&self) {
        self.status.write().state = DriverState::Terminated;
    }

    fn drop_with(&mut self, reason: String) -> DriverState {
        tracing::warn!(%reason, "malformed read response");
        self.terminate();
        self.handler.on_dropped(Some(SubscriptionError::Malformed(reason)));
        DriverState::Terminated
    }
}
