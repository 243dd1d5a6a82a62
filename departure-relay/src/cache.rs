//! Last-response cache for follow-up lookups.
//!
//! The watch refers to departures by their 1-based row on screen. To ask the
//! backend about one, we need the departure UUID and the station it was
//! listed at, so the most recent departure list is kept here together with
//! its station id.
//!
//! The cache is owned by the request router's session and is only touched
//! through `&mut` access, so a store is never visible half-done.

use crate::backend::{DepartureRecord, MoreInfo};
use crate::domain::StationId;

/// Errors resolving a screen index against the cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// No departure list has been fetched yet
    #[error("no departures cached")]
    Empty,

    /// The index does not name a cached row
    #[error("index {index} out of range (1..={len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// The departure list from the latest successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDepartures {
    pub station_id: StationId,
    pub records: Vec<DepartureRecord>,
}

/// A cached departure identified well enough to query more-info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDeparture {
    pub station_id: StationId,
    pub departure_uuid: String,
}

/// Session cache: latest departures plus latest more-info.
#[derive(Debug, Clone, Default)]
pub struct ResponseCache {
    departures: Option<CachedDepartures>,
    more_info: Option<MoreInfo>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached departure list and its station together.
    pub fn store_departures(&mut self, station_id: impl Into<StationId>, records: Vec<DepartureRecord>) {
        self.departures = Some(CachedDepartures {
            station_id: station_id.into(),
            records,
        });
    }

    /// Look up the departure shown at 1-based `index`.
    pub fn resolve_uuid(&self, index: usize) -> Result<ResolvedDeparture, CacheError> {
        let cached = self.departures.as_ref().ok_or(CacheError::Empty)?;

        let record = index
            .checked_sub(1)
            .and_then(|i| cached.records.get(i))
            .ok_or(CacheError::IndexOutOfRange {
                index,
                len: cached.records.len(),
            })?;

        Ok(ResolvedDeparture {
            station_id: cached.station_id.clone(),
            departure_uuid: record.uuid.clone(),
        })
    }

    /// The cached departure list, if any.
    pub fn departures(&self) -> Option<&CachedDepartures> {
        self.departures.as_ref()
    }

    /// Remember the latest more-info payload.
    pub fn store_more_info(&mut self, info: MoreInfo) {
        self.more_info = Some(info);
    }

    /// The latest more-info payload. Nothing in the request flow reads it.
    pub fn last_more_info(&self) -> Option<&MoreInfo> {
        self.more_info.as_ref()
    }
}
