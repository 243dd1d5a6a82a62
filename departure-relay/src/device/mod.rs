//! Messaging with the watch app.
//!
//! Requests arrive as small key/value dictionaries and replies leave the
//! same way. Lists travel as JSON text inside a single value, bounded so
//! they fit the watch's inbox.

mod dispatcher;
mod keys;
mod message;
mod payload;
mod request;

pub use dispatcher::{DepartureReply, DeviceSink, DispatchError, Dispatcher, Outcome, render};
pub use keys::{InboundKey, OutboundKey};
pub use message::{MessageValue, OutboundMessage};
pub use payload::{DepartureRow, MoreInfoSummary, StationRow, departure_rows};
pub use request::{DeviceRequest, RequestError, StationOrigin};
