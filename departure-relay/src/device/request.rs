//! Decoding of watch requests.
//!
//! The watch sends a dictionary carrying exactly one request key. The
//! dictionary is decoded once, here, into a [`DeviceRequest`].

use serde_json::{Map, Value};

use crate::domain::StationId;

use super::keys::InboundKey;

/// Which screen asked for a station's departures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationOrigin {
    /// The station list or a refresh of the board
    List,
    /// A stop picked from a more-info stop list
    Stop,
}

/// A request from the watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRequest {
    /// Departures at a station.
    Station {
        station_id: StationId,
        origin: StationOrigin,
    },
    /// Detail for the departure at a 1-based row of the last board.
    MoreInfo { index: usize },
}

/// Errors decoding a watch dictionary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// None of the request keys is set
    #[error("no request key set (keys: {keys:?})")]
    Unrecognised { keys: Vec<String> },

    /// A request key is set but its value has the wrong shape
    #[error("{key} carries {found}, expected {expected}")]
    InvalidValue {
        key: InboundKey,
        found: String,
        expected: &'static str,
    },
}

/// Whether a dictionary value counts as set.
///
/// Zero, empty strings, `false` and null are treated as absent.
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn invalid(key: InboundKey, found: &Value, expected: &'static str) -> RequestError {
    RequestError::InvalidValue {
        key,
        found: found.to_string(),
        expected,
    }
}

fn station_id(key: InboundKey, value: &Value) -> Result<StationId, RequestError> {
    StationId::from_json(value).ok_or_else(|| invalid(key, value, "a station id"))
}

fn row_index(key: InboundKey, value: &Value) -> Result<usize, RequestError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|i| usize::try_from(i).ok()),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(key, value, "a positive row index"))
}

impl DeviceRequest {
    /// Decode a watch dictionary.
    ///
    /// `GET_STATION` takes precedence over `GET_STATION_FROM_STOP`, which
    /// takes precedence over `GET_MORE_INFO`.
    pub fn decode(payload: &Map<String, Value>) -> Result<Self, RequestError> {
        let set = |key: InboundKey| payload.get(key.as_str()).filter(|v| is_set(v));

        if let Some(value) = set(InboundKey::GetStation) {
            return Ok(DeviceRequest::Station {
                station_id: station_id(InboundKey::GetStation, value)?,
                origin: StationOrigin::List,
            });
        }

        if let Some(value) = set(InboundKey::GetStationFromStop) {
            return Ok(DeviceRequest::Station {
                station_id: station_id(InboundKey::GetStationFromStop, value)?,
                origin: StationOrigin::Stop,
            });
        }

        if let Some(value) = set(InboundKey::GetMoreInfo) {
            return Ok(DeviceRequest::MoreInfo {
                index: row_index(InboundKey::GetMoreInfo, value)?,
            });
        }

        Err(RequestError::Unrecognised {
            keys: payload.keys().cloned().collect(),
        })
    }
}
