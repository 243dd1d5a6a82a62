//! Message keys shared with the watch app.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Keys of messages sent to the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundKey {
    /// Nearby stations, `[[id, name, distance], ...]`
    StationsArray,
    /// Departure board, `[[line, destination, clock, platform], ...]`
    StationArray,
    /// Departure board requested from a stop in a more-info list
    StationFromStop,
    /// `[line, destination, platform, clock, delay, type]`
    MoreInfo,
    /// Stop list following a `MoreInfo`
    StopsMoreInfo,
    /// The departure has left; payload is the station id
    MoreInfoTimeout,
    /// Anything went wrong reaching the backend; payload is `1`
    NoInternet,
}

impl OutboundKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboundKey::StationsArray => "STATIONS_ARRAY",
            OutboundKey::StationArray => "STATION_ARRAY",
            OutboundKey::StationFromStop => "STATION_FROM_STOP",
            OutboundKey::MoreInfo => "MORE_INFO",
            OutboundKey::StopsMoreInfo => "STOPS_MORE_INFO",
            OutboundKey::MoreInfoTimeout => "MORE_INFO_TIMEOUT",
            OutboundKey::NoInternet => "NO_INTERNET",
        }
    }
}

impl fmt::Display for OutboundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys of requests sent by the watch, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKey {
    GetStation,
    GetStationFromStop,
    GetMoreInfo,
}

impl InboundKey {
    pub const ALL: [InboundKey; 3] = [
        InboundKey::GetStation,
        InboundKey::GetStationFromStop,
        InboundKey::GetMoreInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InboundKey::GetStation => "GET_STATION",
            InboundKey::GetStationFromStop => "GET_STATION_FROM_STOP",
            InboundKey::GetMoreInfo => "GET_MORE_INFO",
        }
    }
}

impl fmt::Display for InboundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
