//! Wire-level contract with the transport.
//!
//! A transport hands the adapter one [`ConnectionScope`] per connection plus
//! two channel halves:
//!
//! ```text
//! transport ──InboundEvent──▶ adapter      http.request / http.disconnect
//! transport ◀─OutboundEvent── adapter      http.response.start, http.response.body
//! ```

mod channel;
mod events;
mod scope;

pub use channel::{Inbound, Outbound};
pub use events::{InboundEvent, OutboundEvent};
pub use scope::{ConnectionScope, HTTP_SCOPE};
