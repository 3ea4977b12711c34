//! # Event Store Streams
//!
//! Client-side protocol layer for an append-only event log service.
//!
//! ## Core Concepts
//!
//! - **Appends**: a batch of events written to one stream under an
//!   optimistic-concurrency precondition, resolved to a single [`WriteResult`]
//! - **Subscriptions**: a live, ordered feed of the whole log, optionally
//!   filtered, starting anywhere in history and continuing into live traffic
//! - **Transport**: connections and streams are supplied by the caller through
//!   the [`Connection`] and [`StreamsClient`] traits
//!
//! ## Example
//!
//! ```ignore
//! use eventstore_streams::{EventData, ExpectedRevision, WriteEventsToStream};
//!
//! let result = WriteEventsToStream::new("orders-42")
//!     .expected_revision(ExpectedRevision::NoStream)
//!     .send([EventData::json("order-created", &json!({"total": 12}))?])
//!     .execute(&connection)?
//!     .wait();
//!
//! // Follow everything that is not a system event
//! let (handler, handle) = ChannelHandler::new(1000);
//! let subscription = SubscribeToAll::new(handler)
//!     .from_start()
//!     .filter(Filter::exclude_system_events())
//!     .execute(&connection)?;
//! ```

pub mod commands;
pub mod error;
pub mod filter;
pub mod settings;
pub mod subscriptions;
pub mod transport;
pub mod types;
pub mod wire;

// Re-exports
pub use commands::{
    decode_append_response, PendingWrite, SubscribeToAll, Subscription, WriteEventsToStream,
};
pub use error::{ClientError, Result};
pub use filter::{Filter, FilterMatch, FilterScope};
pub use settings::{ConsumerStrategy, PersistentSubscriptionSettings, StartFrom, SubscriberLimit};
pub use subscriptions::{
    ChannelHandler, DriverState, DropReason, SubscriptionDriver, SubscriptionError,
    SubscriptionEvent, SubscriptionHandle, SubscriptionHandler,
};
pub use transport::{
    AppendCall, AppendSink, CachedConnection, CallMetadata, CallOptions, Connection, ReadStream,
    StreamsClient, TransportError,
};
pub use types::*;
