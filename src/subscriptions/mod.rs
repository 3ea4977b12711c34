//! Subscription lifecycle for the global log.
//!
//! A server stream carries confirmations, events, checkpoints and live-state
//! notices. The [`SubscriptionDriver`] turns them into callbacks on a
//! [`SubscriptionHandler`] with a fixed lifecycle:
//!
//! ```text
//! Unconfirmed --confirmation--> Active --end / error--> Terminated
//!      |                          ^
//!      +---event / checkpoint-----+
//! ```
//!
//! Exactly one terminal callback is delivered; anything after it is ignored.
//!
//! # Example
//!
//! ```ignore
//! let (handler, handle) = ChannelHandler::new(1000);
//! let subscription = SubscribeToAll::new(handler)
//!     .from_start()
//!     .execute(&connection)?;
//!
//! loop {
//!     match handle.recv() {
//!         Ok(SubscriptionEvent::Event { event, position }) => println!("{position}: {event:?}"),
//!         Ok(SubscriptionEvent::CaughtUp) => println!("Now live!"),
//!         Ok(SubscriptionEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod driver;
mod types;

pub(crate) use driver::DriverStatus;
pub use driver::{DriverState, SubscriptionDriver};
pub use types::{
    ChannelHandler, DropReason, SubscriptionError, SubscriptionEvent, SubscriptionHandle,
    SubscriptionHandler,
};
