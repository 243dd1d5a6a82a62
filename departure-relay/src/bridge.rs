//! Line protocol between the relay binary and its host.
//!
//! The host writes one JSON event per line on stdin and reads one JSON
//! message per line from stdout:
//!
//! ```text
//! > {"event":"location","lat":50.94,"lon":6.95}
//! > {"event":"app_message","payload":{"GET_MORE_INFO":2}}
//! > {"event":"configuration","update":{"radius_km":1.5,"api_url":"https://api.tramlines.de","quick_start":true},"position":{"lat":50.94,"lon":6.95}}
//! < {"STATION_ARRAY":"[[\"18\",\"Bonn Hbf\",\"10:05\",\"2\"]]"}
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::device::OutboundMessage;
use crate::domain::Position;
use crate::router::Trigger;
use crate::settings::ConfigUpdate;

/// An event reported by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Location { lat: f64, lon: f64 },
    AppMessage { payload: Map<String, Value> },
    Configuration { update: ConfigUpdate, position: Position },
}

impl From<HostEvent> for Trigger {
    fn from(event: HostEvent) -> Self {
        match event {
            HostEvent::Location { lat, lon } => Trigger::LocationReady(Position::new(lat, lon)),
            HostEvent::AppMessage { payload } => Trigger::AppMessage(payload),
            HostEvent::Configuration { update, position } => {
                Trigger::ConfigurationChanged { update, position }
            }
        }
    }
}

/// Parse one input line into a trigger.
pub fn parse_line(line: &str) -> Result<Trigger, serde_json::Error> {
    serde_json::from_str::<HostEvent>(line).map(Trigger::from)
}

/// One output line, newline included.
pub fn format_message(message: &OutboundMessage) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}
