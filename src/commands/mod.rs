//! Commands sent to the streams service.

mod subscribe;
mod write;

pub use subscribe::{SubscribeToAll, Subscription};
pub use write::{decode_append_response, PendingWrite, WriteEventsToStream};
