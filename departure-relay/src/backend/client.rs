//! Departures backend HTTP client.
//!
//! Four GET endpoints under `/pebble/`. Every call is a single attempt with
//! no retry; the only timeout is the one configured on the transport.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::Position;

use super::error::BackendError;
use super::types::{DepartureRecord, LocationDepartures, MoreInfo, StationRef};

/// One backend query, with everything needed to build its URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint<'a> {
    NearbyStations {
        position: Position,
        radius_meters: u32,
    },
    DeparturesByLocation {
        position: Position,
        radius_meters: u32,
    },
    DeparturesByStation {
        station_id: &'a str,
    },
    MoreInfo {
        station_id: &'a str,
        departure_uuid: &'a str,
    },
}

impl Endpoint<'_> {
    /// Path below the base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::NearbyStations { .. } => "/pebble/stations".to_string(),
            Endpoint::DeparturesByLocation { .. } => "/pebble/currentLocation".to_string(),
            Endpoint::DeparturesByStation { station_id } => {
                format!("/pebble/current/{station_id}")
            }
            Endpoint::MoreInfo {
                station_id,
                departure_uuid,
            } => format!("/pebble/moreinfo/{station_id}/{departure_uuid}"),
        }
    }

    /// Query parameters, in the order the backend documents them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::NearbyStations {
                position,
                radius_meters,
            }
            | Endpoint::DeparturesByLocation {
                position,
                radius_meters,
            } => vec![
                ("lat", position.lat.to_string()),
                ("lon", position.lon.to_string()),
                ("radius", radius_meters.to_string()),
            ],
            Endpoint::DeparturesByStation { .. } | Endpoint::MoreInfo { .. } => Vec::new(),
        }
    }

    /// Path plus query string, e.g. `/pebble/stations?lat=1&lon=2&radius=500`.
    pub fn relative_url(&self) -> String {
        let query = self.query();
        if query.is_empty() {
            return self.path();
        }

        let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.path(), pairs.join("&"))
    }

    /// Absolute URL without the query string.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Source of station and departure data.
///
/// The base URL is passed on every call because the user can change it
/// while the relay is running.
pub trait DeparturesBackend {
    /// Stations within `radius_meters` of `position`.
    fn fetch_nearby_stations(
        &self,
        base_url: &str,
        position: Position,
        radius_meters: u32,
    ) -> impl Future<Output = Result<Vec<StationRef>, BackendError>> + Send;

    /// Departures at the station the backend picks for `position`.
    fn fetch_departures_by_location(
        &self,
        base_url: &str,
        position: Position,
        radius_meters: u32,
    ) -> impl Future<Output = Result<LocationDepartures, BackendError>> + Send;

    /// Departures at a known station.
    fn fetch_departures_by_station(
        &self,
        base_url: &str,
        station_id: &str,
    ) -> impl Future<Output = Result<Vec<DepartureRecord>, BackendError>> + Send;

    /// Detail and stop list for one departure.
    ///
    /// A 404 means the departure has already left.
    fn fetch_more_info(
        &self,
        base_url: &str,
        station_id: &str,
        departure_uuid: &str,
    ) -> impl Future<Output = Result<MoreInfo, BackendError>> + Send;
}

/// Turn a status and body into the body text, or a status error.
pub(crate) fn check_status(status: u16, body: String) -> Result<String, BackendError> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(BackendError::Status { status, body })
    }
}

/// Parse a success body into a DTO.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::json(e.to_string(), body))
}

/// Configuration for the backend client.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    /// Request timeout in seconds. `None` leaves the transport default.
    pub timeout_secs: Option<u64>,
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

/// reqwest-backed implementation of [`DeparturesBackend`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
}

impl BackendClient {
    /// Create a new client with the given configuration.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        base_url: &str,
        endpoint: Endpoint<'_>,
    ) -> Result<T, BackendError> {
        let url = endpoint.url(base_url);
        debug!(%url, query = ?endpoint.query(), "backend request");

        let response = self.http.get(&url).query(&endpoint.query()).send().await?;
        let status = response.status().as_u16();

        let body = if response.status().is_success() {
            response.text().await?
        } else {
            response.text().await.unwrap_or_default()
        };

        debug!(%url, status, bytes = body.len(), "backend response");
        decode(&check_status(status, body)?)
    }
}

impl DeparturesBackend for BackendClient {
    async fn fetch_nearby_stations(
        &self,
        base_url: &str,
        position: Position,
        radius_meters: u32,
    ) -> Result<Vec<StationRef>, BackendError> {
        self.get(
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
        self.get(
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
        self.get(base_url, Endpoint::DeparturesByStation { station_id })
            .await
    }

    async fn fetch_more_info(
        &self,
        base_url: &str,
        station_id: &str,
        departure_uuid: &str,
    ) -> Result<MoreInfo, BackendError> {
        self.get(
            base_url,
            Endpoint::MoreInfo {
                station_id,
                departure_uuid,
            },
        )
        .await
    }
}
