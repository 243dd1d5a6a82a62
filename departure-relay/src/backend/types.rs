//! Backend response DTOs.
//!
//! The backend answers with positional JSON arrays for stations and
//! departures, and a keyed object for more-info. Several fields are sometimes
//! numbers and sometimes strings, so they are kept as JSON values and turned
//! into display text with [`text_of`].

use serde::Deserialize;
use serde_json::Value;

use crate::domain::StationId;

/// Display text for a loosely typed JSON field.
///
/// Strings are used verbatim, null becomes empty, and anything else uses its
/// JSON text (`3`, `2.5`, `true`).
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A station near the requested position, from `[id, name, distance]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct StationRef {
    pub id: String,
    pub name: String,
    /// Distance as the backend rendered it (kilometres).
    pub distance: String,
}

impl TryFrom<Vec<Value>> for StationRef {
    type Error = String;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        match fields.as_slice() {
            [id, name, distance, ..] => Ok(Self {
                id: text_of(id),
                name: text_of(name),
                distance: text_of(distance),
            }),
            _ => Err(format!(
                "station entry needs 3 fields, got {}",
                fields.len()
            )),
        }
    }
}

/// One departure from a station board.
///
/// The wire form is the positional tuple
/// `[uuid, _, line, destination, time, platform]`; position 1 is unused.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct DepartureRecord {
    pub uuid: String,
    pub line: String,
    pub destination: String,
    /// Scheduled or live departure time (ISO 8601).
    pub time: String,
    pub platform: String,
}

impl TryFrom<Vec<Value>> for DepartureRecord {
    type Error = String;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        match fields.as_slice() {
            [uuid, _, line, destination, time, platform, ..] => Ok(Self {
                uuid: text_of(uuid),
                line: text_of(line),
                destination: text_of(destination),
                time: text_of(time),
                platform: text_of(platform),
            }),
            _ => Err(format!(
                "departure entry needs 6 fields, got {}",
                fields.len()
            )),
        }
    }
}

/// Response from the departures-by-location endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationDepartures {
    /// Descriptor of the chosen station; the identifier sits at index 2.
    pub station: Vec<Value>,
    pub departures: Vec<DepartureRecord>,
}

impl LocationDepartures {
    /// Identifier of the station the backend picked, if present.
    pub fn station_id(&self) -> Option<StationId> {
        self.station.get(2).and_then(StationId::from_json)
    }
}

/// Extended detail for one departure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoreInfo {
    pub line_name: Value,
    pub destination: Value,
    #[serde(default)]
    pub platform: Value,
    pub time_delayed: String,
    pub time_schedule: String,
    #[serde(rename = "type", default)]
    pub kind: Value,
    /// Stop descriptors, passed to the device untouched.
    #[serde(default)]
    pub stops: Vec<Value>,
}
