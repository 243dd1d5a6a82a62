//! Turns pipeline outcomes into watch messages.
//!
//! Every trigger ends in exactly one call to [`Dispatcher::dispatch`]. All
//! outcomes produce one message except a successful more-info, which sends
//! the summary and then the stop list.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::StationId;
use crate::encode::{
    EncodeError, MAX_PAYLOAD_BYTES, encode_for_device, encode_value_for_device, ensure_fits,
};

use super::keys::OutboundKey;
use super::message::OutboundMessage;
use super::payload::{DepartureRow, MoreInfoSummary, StationRow};

/// Which board key a departure list goes out under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartureReply {
    /// `STATION_ARRAY`: location-triggered or station-list request
    Board,
    /// `STATION_FROM_STOP`: request from a more-info stop list
    FromStop,
}

impl DepartureReply {
    pub fn key(self) -> OutboundKey {
        match self {
            DepartureReply::Board => OutboundKey::StationArray,
            DepartureReply::FromStop => OutboundKey::StationFromStop,
        }
    }
}

/// Result of one pass through the request pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NearbyStations(Vec<StationRow>),
    Departures {
        reply: DepartureReply,
        rows: Vec<DepartureRow>,
    },
    MoreInfo {
        summary: MoreInfoSummary,
        stops: Vec<Value>,
    },
    /// More-info answered 404: the departure has left.
    DepartureGone { station_id: StationId },
    /// Backend unreachable, failing, or sending something unreadable.
    Unavailable,
}

/// Errors delivering to the watch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("device link closed")]
    Closed,
}

/// Transport to the watch.
///
/// Delivery is assumed reliable and ordered for messages from one caller.
pub trait DeviceSink {
    fn deliver(&self, message: OutboundMessage) -> Result<(), DispatchError>;
}

impl DeviceSink for mpsc::UnboundedSender<OutboundMessage> {
    fn deliver(&self, message: OutboundMessage) -> Result<(), DispatchError> {
        self.send(message).map_err(|_| DispatchError::Closed)
    }
}

/// Encode an outcome into the messages that represent it.
pub fn render(outcome: Outcome) -> Result<Vec<OutboundMessage>, EncodeError> {
    let messages = match outcome {
        Outcome::NearbyStations(rows) => {
            let encoded = encode_for_device(&rows)?;
            if encoded.dropped > 0 {
                debug!(kept = encoded.kept, dropped = encoded.dropped, "truncated station list");
            }
            vec![OutboundMessage::text(OutboundKey::StationsArray, encoded.json)]
        }
        Outcome::Departures { reply, rows } => {
            let encoded = encode_for_device(&rows)?;
            if encoded.dropped > 0 {
                debug!(kept = encoded.kept, dropped = encoded.dropped, "truncated departure board");
            }
            vec![OutboundMessage::text(reply.key(), encoded.json)]
        }
        Outcome::MoreInfo { summary, stops } => {
            let summary = encode_value_for_device(&summary)?;
            let stops = encode_for_device(&stops)?;
            if stops.dropped > 0 {
                debug!(kept = stops.kept, dropped = stops.dropped, "truncated stop list");
            }
            vec![
                OutboundMessage::text(OutboundKey::MoreInfo, summary),
                OutboundMessage::text(OutboundKey::StopsMoreInfo, stops.json),
            ]
        }
        // Echoed in the kind it arrived as so the watch can send it back.
        Outcome::DepartureGone { station_id } => match station_id {
            StationId::Int(id) => vec![OutboundMessage::int(OutboundKey::MoreInfoTimeout, id)],
            StationId::Text(id) => vec![OutboundMessage::text(
                OutboundKey::MoreInfoTimeout,
                ensure_fits(id, MAX_PAYLOAD_BYTES)?,
            )],
        },
        Outcome::Unavailable => vec![OutboundMessage::no_internet()],
    };

    Ok(messages)
}

/// Single exit point from the relay to the watch.
#[derive(Debug, Clone)]
pub struct Dispatcher<D> {
    sink: D,
}

impl<D: DeviceSink> Dispatcher<D> {
    pub fn new(sink: D) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    /// Send the messages for `outcome`, in order. Returns how many were sent.
    ///
    /// An outcome that cannot be encoded is sent as `NO_INTERNET` so the
    /// watch is never left waiting.
    pub fn dispatch(&self, outcome: Outcome) -> Result<usize, DispatchError> {
        let messages = render(outcome).unwrap_or_else(|e| {
            warn!(error = %e, "encoding failed, reporting no internet");
            vec![OutboundMessage::no_internet()]
        });

        let count = messages.len();
        for message in messages {
            debug!(key = %message.key, "sending to device");
            self.sink.deliver(message)?;
        }
        Ok(count)
    }
}
