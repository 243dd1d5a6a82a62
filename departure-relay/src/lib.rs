//! Companion-side relay between a transit watch app and a departures
//! backend.
//!
//! Given a position or a request from the watch, the relay queries the
//! backend, remembers the latest departure board for follow-up lookups, and
//! sends the result back as size-bounded key/value messages.

pub mod backend;
pub mod bridge;
pub mod cache;
pub mod device;
pub mod domain;
pub mod encode;
pub mod router;
pub mod settings;

#[cfg(test)]
mod router_tests;
