//! Scripted backend for testing without a live server.
//!
//! Replies are registered per endpoint as a raw status and body, then run
//! through the same status check and JSON decoding as the real client.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::Position;

use super::client::{DeparturesBackend, Endpoint, check_status, decode};
use super::error::BackendError;
use super::types::{DepartureRecord, LocationDepartures, MoreInfo, StationRef};

/// A canned answer to one request.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// The server answered with this status and body.
    Respond { status: u16, body: String },
    /// No response at all.
    Unreachable,
}

impl MockReply {
    /// 200 with a JSON body.
    pub fn json(value: &Value) -> Self {
        MockReply::Respond {
            status: 200,
            body: value.to_string(),
        }
    }

    /// Arbitrary status and raw body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        MockReply::Respond {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct Scripted {
    reply: MockReply,
    delay: Option<Duration>,
}

/// Mock backend keyed by relative URL (`/pebble/current/812`).
///
/// Replies for the same URL are served in order; the last one repeats.
/// Unscripted URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    replies: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for an endpoint.
    pub fn on(&self, endpoint: Endpoint<'_>, reply: MockReply) -> &Self {
        self.push(endpoint, reply, None)
    }

    /// Queue a reply that is held back for `delay` before it resolves.
    pub fn on_delayed(&self, endpoint: Endpoint<'_>, reply: MockReply, delay: Duration) -> &Self {
        self.push(endpoint, reply, Some(delay))
    }

    fn push(&self, endpoint: Endpoint<'_>, reply: MockReply, delay: Option<Duration>) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies
                .entry(endpoint.relative_url())
                .or_default()
                .push_back(Scripted { reply, delay });
        }
        self
    }

    /// Relative URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.recorded(|(_, url)| url.clone())
    }

    /// Base URL each request was made against, in order.
    pub fn base_urls(&self) -> Vec<String> {
        self.recorded(|(base_url, _)| base_url.clone())
    }

    fn recorded(&self, pick: impl Fn(&(String, String)) -> String) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.iter().map(pick).collect())
            .unwrap_or_default()
    }

    fn next_reply(&self, base_url: &str, url: &str) -> Option<Scripted> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((base_url.to_string(), url.to_string()));
        }

        let mut replies = self.replies.lock().ok()?;
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    async fn answer<T: DeserializeOwned>(
        &self,
        base_url: &str,
        endpoint: Endpoint<'_>,
    ) -> Result<T, BackendError> {
        let url = endpoint.relative_url();

        let Some(scripted) = self.next_reply(base_url, &url) else {
            return Err(BackendError::Status {
                status: 404,
                body: format!("no mock reply for {url}"),
            });
        };

        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }

        match scripted.reply {
            MockReply::Unreachable => Err(BackendError::Transport {
                message: format!("mock: {url} unreachable"),
            }),
            MockReply::Respond { status, body } => decode(&check_status(status, body)?),
        }
    }
}

impl DeparturesBackend for MockBackend {
    async fn fetch_nearby_stations(
        &self,
        base_url: &str,
        position: Position,
        radius_meters: u32,
    ) -> Result<Vec<StationRef>, BackendError> {
        self.answer(
            base_url,
            Endpoint::NearbyStations {
                position,
                radius_meters,
            },
        )
        .await
    }

    async fn fetch_departures_by_location(
        &self,
        base_url: &str,
        position: Position,
        radius_meters: u32,
    ) -> Result<LocationDepartures, BackendError> {
        self.answer(
            base_url,
            Endpoint::DeparturesByLocation {
                position,
                radius_meters,
            },
        )
        .await
    }

    async fn fetch_departures_by_station(
        &self,
        base_url: &str,
        station_id: &str,
    ) -> Result<Vec<DepartureRecord>, BackendError> {
        self.answer(base_url, Endpoint::DeparturesByStation { station_id })
            .await
    }

    async fn fetch_more_info(
        &self,
        base_url: &str,
        station_id: &str,
        departure_uuid: &str,
    ) -> Result<MoreInfo, BackendError> {
        self.answer(
            base_url,
            Endpoint::MoreInfo {
                station_id,
                departure_uuid,
            },
        )
        .await
    }
}
