//! Request routing.
//!
//! Every trigger (a fresh position, a watch request, or a configuration
//! change) enters here. The router picks the backend call, keeps the
//! session cache up to date, and hands exactly one outcome to the
//! dispatcher.
//!
//! Triggers are handled strictly one at a time: [`RequestRouter::handle`]
//! takes `&mut self` and [`RequestRouter::run`] drains a queue in order. A
//! trigger that arrives while a backend call is in flight waits for it, so
//! the cache always reflects the most recently issued request.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, DepartureRecord, DeparturesBackend, LocationDepartures};
use crate::cache::ResponseCache;
use crate::device::{
    DepartureReply, DeviceRequest, DeviceSink, DispatchError, Dispatcher, MoreInfoSummary,
    Outcome, RequestError, StationOrigin, StationRow, departure_rows,
};
use crate::domain::{DisplayZone, Position, StationId};
use crate::settings::{ConfigUpdate, Settings, SettingsStore};

/// Something that asks the relay to do work.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// The host has a position fix.
    LocationReady(Position),
    /// A decoded watch request.
    Device(DeviceRequest),
    /// A raw watch dictionary, decoded by the router.
    AppMessage(Map<String, Value>),
    /// The configuration page was submitted; the host supplies a fresh fix.
    ConfigurationChanged {
        update: ConfigUpdate,
        position: Position,
    },
}

/// Routes triggers through backend, cache, encoder and dispatcher.
pub struct RequestRouter<B, D> {
    backend: B,
    dispatcher: Dispatcher<D>,
    store: Arc<dyn SettingsStore>,
    settings: Settings,
    zone: DisplayZone,
    session: ResponseCache,
}

fn load_settings(store: &dyn SettingsStore) -> Settings {
    store.load().unwrap_or_else(|e| {
        warn!(error = %e, "could not load settings, using defaults");
        Settings::default()
    })
}

fn unavailable(call: &'static str, error: &BackendError) -> Outcome {
    warn!(call, error = %error, "backend call failed");
    Outcome::Unavailable
}

impl<B: DeparturesBackend, D: DeviceSink> RequestRouter<B, D> {
    /// Create a router, reading settings from `store` once.
    pub fn new(backend: B, sink: D, store: Arc<dyn SettingsStore>) -> Self {
        let settings = load_settings(store.as_ref());
        info!(
            radius_meters = settings.radius_meters,
            backend = %settings.backend_base_url,
            quick_start = settings.quick_start,
            "settings loaded"
        );

        Self {
            backend,
            dispatcher: Dispatcher::new(sink),
            store,
            settings,
            zone: DisplayZone::default(),
            session: ResponseCache::new(),
        }
    }

    /// Render clock labels in `zone` instead of the host's local zone.
    pub fn with_zone(mut self, zone: DisplayZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &ResponseCache {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn dispatcher(&self) -> &Dispatcher<D> {
        &self.dispatcher
    }

    /// Handle queued triggers in arrival order until the queue closes.
    pub async fn run(&mut self, mut triggers: mpsc::Receiver<Trigger>) -> Result<(), DispatchError> {
        while let Some(trigger) = triggers.recv().await {
            self.handle(trigger).await?;
        }
        debug!("trigger queue closed");
        Ok(())
    }

    /// Handle one trigger to completion. Returns how many messages were sent.
    pub async fn handle(&mut self, trigger: Trigger) -> Result<usize, DispatchError> {
        let outcome = match trigger {
            Trigger::LocationReady(position) => self.locate(position).await,
            Trigger::Device(request) => self.device_request(request).await,
            Trigger::AppMessage(payload) => match DeviceRequest::decode(&payload) {
                Ok(request) => self.device_request(request).await,
                Err(e @ RequestError::Unrecognised { .. }) => {
                    debug!(error = %e, "ignoring message without request key");
                    return Ok(0);
                }
                Err(e) => {
                    warn!(error = %e, "malformed watch request");
                    Outcome::Unavailable
                }
            },
            Trigger::ConfigurationChanged { update, position } => {
                self.reconfigure(&update);
                self.locate(position).await
            }
        };

        self.dispatcher.dispatch(outcome)
    }

    fn reconfigure(&mut self, update: &ConfigUpdate) {
        let mut next = self.settings.clone();
        next.apply(update);

        self.settings = match self.store.save(&next).and_then(|()| self.store.load()) {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, "settings not persisted, using submitted values");
                next
            }
        };

        info!(
            radius_meters = self.settings.radius_meters,
            backend = %self.settings.backend_base_url,
            quick_start = self.settings.quick_start,
            "settings changed"
        );
    }

    async fn locate(&mut self, position: Position) -> Outcome {
        let base_url = self.settings.backend_base_url.as_str();
        let radius = self.settings.radius_meters;

        if self.settings.quick_start {
            debug!(?position, radius, "departures by location");
            let result = self
                .backend
                .fetch_departures_by_location(base_url, position, radius)
                .await;
            return match result {
                Ok(response) => self.accept_location_board(response),
                Err(e) => unavailable("departures by location", &e),
            };
        }

        debug!(?position, radius, "nearby stations");
        match self
            .backend
            .fetch_nearby_stations(base_url, position, radius)
            .await
        {
            Ok(stations) => {
                info!(count = stations.len(), "nearby stations");
                Outcome::NearbyStations(stations.iter().map(StationRow::from).collect())
            }
            Err(e) => unavailable("nearby stations", &e),
        }
    }

    async fn device_request(&mut self, request: DeviceRequest) -> Outcome {
        match request {
            DeviceRequest::Station { station_id, origin } => {
                self.station_board(station_id, origin).await
            }
            DeviceRequest::MoreInfo { index } => self.more_info(index).await,
        }
    }

    async fn station_board(&mut self, station_id: StationId, origin: StationOrigin) -> Outcome {
        debug!(%station_id, ?origin, "departures by station");
        let result = self
            .backend
            .fetch_departures_by_station(&self.settings.backend_base_url, &station_id.to_string())
            .await;

        let reply = match origin {
            StationOrigin::List => DepartureReply::Board,
            StationOrigin::Stop => DepartureReply::FromStop,
        };

        match result {
            Ok(records) => self.accept_board(station_id, records, reply),
            Err(e) => unavailable("departures by station", &e),
        }
    }

    fn accept_location_board(&mut self, response: LocationDepartures) -> Outcome {
        let Some(station_id) = response.station_id() else {
            warn!(station = ?response.station, "location response has no station id");
            return Outcome::Unavailable;
        };
        self.accept_board(station_id, response.departures, DepartureReply::Board)
    }

    /// Format a board and, only if that succeeds, make it the cached board.
    fn accept_board(
        &mut self,
        station_id: StationId,
        records: Vec<DepartureRecord>,
        reply: DepartureReply,
    ) -> Outcome {
        match departure_rows(&records, &self.zone) {
            Ok(rows) => {
                info!(%station_id, count = records.len(), "departures");
                self.session.store_departures(station_id, records);
                Outcome::Departures { reply, rows }
            }
            Err(e) => {
                warn!(%station_id, error = %e, "unreadable departure time");
                Outcome::Unavailable
            }
        }
    }

    async fn more_info(&mut self, index: usize) -> Outcome {
        let departure = match self.session.resolve_uuid(index) {
            Ok(departure) => departure,
            Err(e) => {
                warn!(index, error = %e, "more-info for unknown row");
                return Outcome::Unavailable;
            }
        };

        debug!(
            station_id = %departure.station_id,
            uuid = %departure.departure_uuid,
            "more info"
        );
        let result = self
            .backend
            .fetch_more_info(
                &self.settings.backend_base_url,
                &departure.station_id.to_string(),
                &departure.departure_uuid,
            )
            .await;

        match result {
            Ok(info) => match MoreInfoSummary::from_info(&info, &self.zone) {
                Ok(summary) => {
                    let stops = info.stops.clone();
                    self.session.store_more_info(info);
                    Outcome::MoreInfo { summary, stops }
                }
                Err(e) => {
                    warn!(error = %e, "unreadable more-info time");
                    Outcome::Unavailable
                }
            },
            Err(e) if e.is_not_found() => {
                info!(station_id = %departure.station_id, "departure already left");
                Outcome::DepartureGone {
                    station_id: departure.station_id,
                }
            }
            Err(e) => unavailable("more info", &e),
        }
    }
}
