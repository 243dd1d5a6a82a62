//! Row shapes the watch parses.
//!
//! Every row is a JSON array of strings; the watch scans for quoted fields
//! in a fixed order.

use serde::Serialize;

use crate::backend::{DepartureRecord, MoreInfo, StationRef, text_of};
use crate::domain::{DisplayZone, TimeError};

/// `[id, name, distance]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationRow(pub String, pub String, pub String);

impl From<&StationRef> for StationRow {
    fn from(station: &StationRef) -> Self {
        StationRow(
            station.id.clone(),
            station.name.clone(),
            station.distance.clone(),
        )
    }
}

/// `[line, destination, clock, platform]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepartureRow(pub String, pub String, pub String, pub String);

impl DepartureRow {
    pub fn from_record(record: &DepartureRecord, zone: &DisplayZone) -> Result<Self, TimeError> {
        Ok(DepartureRow(
            record.line.clone(),
            record.destination.clone(),
            zone.format_clock(&record.time)?,
            record.platform.clone(),
        ))
    }
}

/// Format a whole board, failing on the first unreadable time.
pub fn departure_rows(
    records: &[DepartureRecord],
    zone: &DisplayZone,
) -> Result<Vec<DepartureRow>, TimeError> {
    records
        .iter()
        .map(|record| DepartureRow::from_record(record, zone))
        .collect()
}

/// `[line, destination, platform, clock, delay, type]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoreInfoSummary(
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
);

impl MoreInfoSummary {
    pub fn from_info(info: &MoreInfo, zone: &DisplayZone) -> Result<Self, TimeError> {
        Ok(MoreInfoSummary(
            text_of(&info.line_name),
            text_of(&info.destination),
            text_of(&info.platform),
            zone.format_clock(&info.time_delayed)?,
            zone.delay_label(&info.time_delayed, &info.time_schedule)?,
            text_of(&info.kind),
        ))
    }
}
