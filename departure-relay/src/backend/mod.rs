//! Departures backend client.
//!
//! The backend exposes four read-only endpoints: nearby stations, departures
//! by location, departures by station, and more-info for a single departure.
//!
//! Key characteristics:
//! - Departure UUIDs are only valid while the departure is upcoming; once it
//!   has left, more-info answers 404
//! - Stations and departures are positional JSON arrays, not objects
//! - Every call is a single attempt with no retry

mod client;
mod error;
mod mock;
mod types;

pub use client::{BackendClient, BackendConfig, DeparturesBackend, Endpoint};
pub use error::BackendError;
pub use mock::{MockBackend, MockReply};
pub use types::{DepartureRecord, LocationDepartures, MoreInfo, StationRef, text_of};
