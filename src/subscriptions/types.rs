//! Subscription callbacks and the channel-backed handler.

use crate::transport::TransportError;
use crate::types::{Position, ResolvedEvent};
use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;

/// Why a subscription ended abnormally.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SubscriptionError {
    #[error("Subscription confirmed twice (second id: {subscription_id})")]
    DuplicateConfirmation { subscription_id: String },

    #[error("Subscription confirmed after delivery started (id: {subscription_id})")]
    UnexpectedConfirmation { subscription_id: String },

    #[error("Malformed server message: {0}")]
    Malformed(String),

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Callbacks driven by a subscription.
///
/// Lifecycle: at most one `on_confirmation`, then events, checkpoints and
/// live-state notifications in stream order, then exactly one of
/// `on_dropped` or `on_error`. Nothing is called after that.
pub trait SubscriptionHandler: Send {
    fn on_confirmation(&mut self, _subscription_id: &str) {}

    /// An event, with the log position of the event as subscribed.
    fn on_event(&mut self, event: ResolvedEvent, position: Position);

    fn on_checkpoint(&mut self, _position: Position) {}

    /// The subscription moved from history into live traffic.
    fn on_caught_up(&mut self) {}

    /// The subscription fell back from live traffic into history.
    fn on_fell_behind(&mut self) {}

    /// Terminal: `None` for a graceful end of stream.
    fn on_dropped(&mut self, error: Option<SubscriptionError>);

    /// Terminal: the underlying connection failed.
    fn on_error(&mut self, error: TransportError) {
        self.on_dropped(Some(SubscriptionError::Transport(error)));
    }
}

/// Callbacks as values, for consumers that prefer pulling from a channel.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionEvent {
    Confirmed { subscription_id: String },
    Event { event: ResolvedEvent, position: Position },
    Checkpoint { position: Position },
    CaughtUp,
    FellBehind,
    Dropped { reason: DropReason },
}

/// How a channel-backed subscription ended.
#[derive(Clone, Debug, PartialEq)]
pub enum DropReason {
    /// The server closed the stream.
    EndOfStream,
    /// Protocol failure.
    Error(SubscriptionError),
    /// Connection failure.
    Transport(TransportError),
}

/// Handler that forwards every callback onto a bounded channel.
///
/// A full channel blocks the driver, which stops reading from the transport
/// until the consumer catches up.
pub struct ChannelHandler {
    sender: Sender<SubscriptionEvent>,
}

impl ChannelHandler {
    /// Create a handler and the handle that receives its events.
    pub fn new(buffer_size: usize) -> (Self, SubscriptionHandle) {
        let (sender, receiver) = bounded(buffer_size);
        (Self { sender }, SubscriptionHandle { receiver })
    }

    fn forward(&self, event: SubscriptionEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("subscription handle dropped, discarding event");
        }
    }
}

impl SubscriptionHandler for ChannelHandler {
    fn on_confirmation(&mut self, subscription_id: &str) {
        self.forward(SubscriptionEvent::Confirmed {
            subscription_id: subscription_id.to_string(),
        });
    }

    fn on_event(&mut self, event: ResolvedEvent, position: Position) {
        self.forward(SubscriptionEvent::Event { event, position });
    }

    fn on_checkpoint(&mut self, position: Position) {
        self.forward(SubscriptionEvent::Checkpoint { position });
    }

    fn on_caught_up(&mut self) {
        self.forward(SubscriptionEvent::CaughtUp);
    }

    fn on_fell_behind(&mut self) {
        self.forward(SubscriptionEvent::FellBehind);
    }

    fn on_dropped(&mut self, error: Option<SubscriptionError>) {
        let reason = match error {
            None => DropReason::EndOfStream,
            Some(SubscriptionError::Transport(e)) => DropReason::Transport(e),
            Some(e) => DropReason::Error(e),
        };
        self.forward(SubscriptionEvent::Dropped { reason });
    }

    fn on_error(&mut self, error: TransportError) {
        self.forward(SubscriptionEvent::Dropped {
            reason: DropReason::Transport(error),
        });
    }
}

/// Receiving end of a [`ChannelHandler`].
pub struct SubscriptionHandle {
    pub receiver: Receiver<SubscriptionEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<SubscriptionEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<SubscriptionEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SubscriptionEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
