//! Domain types for the departure relay.
//!
//! Positions arrive ready-made from the host; timestamps arrive as ISO 8601
//! strings from the backend and leave as compact labels for the device.

mod position;
mod station_id;
mod time;

pub use position::Position;
pub use station_id::StationId;
pub use time::{DisplayZone, TimeError, delay_label_from_millis};
