//! Scenario tests for the request router.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::sync::mpsc;

use crate::backend::{Endpoint, MockBackend, MockReply};
use crate::device::{DeviceRequest, OutboundKey, OutboundMessage, StationOrigin};
use crate::domain::{DisplayZone, Position, StationId};
use crate::encode::MAX_PAYLOAD_BYTES;
use crate::router::{RequestRouter, Trigger};
use crate::settings::{ConfigUpdate, MemorySettingsStore, Settings, SettingsStore};

type Router = RequestRouter<MockBackend, mpsc::UnboundedSender<OutboundMessage>>;

const HERE: Position = Position {
    lat: 50.9413,
    lon: 6.9583,
};

fn settings(quick_start: bool) -> Settings {
    Settings {
        radius_meters: 5000,
        backend_base_url: "http://backend.test".to_string(),
        quick_start,
    }
}

fn setup_with_store(
    mock: &MockBackend,
    store: Arc<MemorySettingsStore>,
) -> (Router, mpsc::UnboundedReceiver<OutboundMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let router = RequestRouter::new(mock.clone(), tx, store).with_zone(DisplayZone::utc());
    (router, rx)
}

fn setup(mock: &MockBackend, quick_start: bool) -> (Router, mpsc::UnboundedReceiver<OutboundMessage>) {
    setup_with_store(mock, Arc::new(MemorySettingsStore::new(settings(quick_start))))
}

fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    while let Ok(message) = rx.try_recv() {
        out.push(message);
    }
    out
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("payload must be an object"),
    }
}

fn parse_text(message: &OutboundMessage) -> Value {
    serde_json::from_str(message.as_text().unwrap()).unwrap()
}

fn departure(uuid: &str, minute: u32, destination: &str) -> Value {
    json!([
        uuid,
        null,
        "18",
        destination,
        format!("2024-01-01T10:{minute:02}:00+00:00"),
        "2"
    ])
}

fn nearby(radius_meters: u32) -> Endpoint<'static> {
    Endpoint::NearbyStations {
        position: HERE,
        radius_meters,
    }
}

fn by_location(radius_meters: u32) -> Endpoint<'static> {
    Endpoint::DeparturesByLocation {
        position: HERE,
        radius_meters,
    }
}

fn board(station_id: &str) -> Endpoint<'_> {
    Endpoint::DeparturesByStation { station_id }
}

fn station_request(station_id: &str) -> Trigger {
    Trigger::Device(DeviceRequest::Station {
        station_id: StationId::from(station_id),
        origin: StationOrigin::List,
    })
}

fn more_info_request(index: usize) -> Trigger {
    Trigger::Device(DeviceRequest::MoreInfo { index })
}

fn more_info_body() -> Value {
    json!({
        "lineName": "18",
        "destination": "Bonn Hbf",
        "platform": 2,
        "timeDelayed": "2024-01-01T10:05:00+00:00",
        "timeSchedule": "2024-01-01T10:00:00+00:00",
        "type": "Stadtbahn",
        "stops": [["1", "Neumarkt"], ["2", "Poststr."]]
    })
}

#[tokio::test]
async fn nearby_stations_success_sends_station_list() {
    let mock = MockBackend::new();
    mock.on(
        nearby(5000),
        MockReply::json(&json!([
            ["1", "Dom/Hbf", 0.2],
            ["2", "Appellhofplatz", 0.5],
            [3, "Neumarkt", 0.9]
        ])),
    );
    let (mut router, mut rx) = setup(&mock, false);

    assert_eq!(router.handle(Trigger::LocationReady(HERE)).await.unwrap(), 1);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key, OutboundKey::StationsArray);
    assert_eq!(
        parse_text(&sent[0]),
        json!([
            ["1", "Dom/Hbf", "0.2"],
            ["2", "Appellhofplatz", "0.5"],
            ["3", "Neumarkt", "0.9"]
        ])
    );
    assert!(router.session().departures().is_none());
}

#[tokio::test]
async fn quick_start_board_is_truncated_to_prefix() {
    let long_name = "Bonn-Bad Godesberg Stadthalle via Universitaet und Hauptbahnhof";
    let departures: Vec<Value> = (0..50)
        .map(|i| departure(&format!("uuid-{i}"), i % 60, &format!("{long_name} {i}")))
        .collect();

    let mock = MockBackend::new();
    mock.on(
        by_location(5000),
        MockReply::json(&json!({
            "station": ["Dom/Hbf", 0.2, "812"],
            "departures": departures
        })),
    );
    let (mut router, mut rx) = setup(&mock, true);

    router.handle(Trigger::LocationReady(HERE)).await.unwrap();

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key, OutboundKey::StationArray);

    let text = sent[0].as_text().unwrap();
    assert!(text.len() <= MAX_PAYLOAD_BYTES);

    let rows = parse_text(&sent[0]);
    let rows = rows.as_array().unwrap();
    assert!(!rows.is_empty());
    assert!(rows.len() < 50);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row[1], json!(format!("{long_name} {i}")));
        assert_eq!(row[2], json!(format!("10:{:02}", i % 60)));
    }

    // The next row would not have fitted.
    let mut with_next = rows.clone();
    with_next.push(json!([
        "18",
        format!("{long_name} {}", rows.len()),
        format!("10:{:02}", rows.len() % 60),
        "2"
    ]));
    assert!(serde_json::to_string(&with_next).unwrap().len() > MAX_PAYLOAD_BYTES);

    // The whole list is cached, not just what was shown.
    let cached = router.session().departures().unwrap();
    assert_eq!(cached.station_id, StationId::from("812"));
    assert_eq!(cached.records.len(), 50);
}

#[tokio::test]
async fn more_info_404_sends_timeout_with_station_id() {
    let mock = MockBackend::new();
    mock.on(board("S1"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])))
        .on(
            Endpoint::MoreInfo {
                station_id: "S1",
                departure_uuid: "dep-1",
            },
            MockReply::status(404, "gone"),
        );
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(station_request("S1")).await.unwrap();
    drain(&mut rx);

    assert_eq!(router.handle(more_info_request(1)).await.unwrap(), 1);
    assert_eq!(
        drain(&mut rx),
        vec![OutboundMessage::text(OutboundKey::MoreInfoTimeout, "S1")]
    );
}

#[tokio::test]
async fn more_info_404_echoes_numeric_station_id_as_int() {
    let mock = MockBackend::new();
    mock.on(board("812"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])))
        .on(
            Endpoint::MoreInfo {
                station_id: "812",
                departure_uuid: "dep-1",
            },
            MockReply::status(404, "gone"),
        );
    let (mut router, mut rx) = setup(&mock, false);

    router
        .handle(Trigger::AppMessage(payload(json!({"GET_STATION": 812}))))
        .await
        .unwrap();
    drain(&mut rx);

    router
        .handle(Trigger::AppMessage(payload(json!({"GET_MORE_INFO": 1}))))
        .await
        .unwrap();

    let sent = drain(&mut rx);
    assert_eq!(
        sent,
        vec![OutboundMessage::int(OutboundKey::MoreInfoTimeout, 812)]
    );
    assert_eq!(
        serde_json::to_string(&sent[0]).unwrap(),
        r#"{"MORE_INFO_TIMEOUT":812}"#
    );
}

#[tokio::test]
async fn more_info_404_after_location_board_keeps_backend_id_kind() {
    let mock = MockBackend::new();
    mock.on(
        by_location(5000),
        MockReply::json(&json!({
            "station": ["Dom/Hbf", 0.2, 812],
            "departures": [departure("dep-1", 0, "Bonn")]
        })),
    )
    .on(
        Endpoint::MoreInfo {
            station_id: "812",
            departure_uuid: "dep-1",
        },
        MockReply::status(404, "gone"),
    );
    let (mut router, mut rx) = setup(&mock, true);

    router.handle(Trigger::LocationReady(HERE)).await.unwrap();
    drain(&mut rx);

    router.handle(more_info_request(1)).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![OutboundMessage::int(OutboundKey::MoreInfoTimeout, 812)]
    );
}

#[tokio::test]
async fn more_info_success_sends_summary_then_stops() {
    let mock = MockBackend::new();
    mock.on(
        board("812"),
        MockReply::json(&json!([
            departure("dep-1", 0, "Bonn"),
            departure("dep-2", 3, "Ubierring")
        ])),
    )
    .on(
        Endpoint::MoreInfo {
            station_id: "812",
            departure_uuid: "dep-2",
        },
        MockReply::json(&more_info_body()),
    );
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(station_request("812")).await.unwrap();
    drain(&mut rx);

    assert_eq!(router.handle(more_info_request(2)).await.unwrap(), 2);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].key, OutboundKey::MoreInfo);
    assert_eq!(
        parse_text(&sent[0]),
        json!(["18", "Bonn Hbf", "2", "10:05", "+5", "Stadtbahn"])
    );
    assert_eq!(sent[1].key, OutboundKey::StopsMoreInfo);
    assert_eq!(parse_text(&sent[1]), json!([["1", "Neumarkt"], ["2", "Poststr."]]));

    let stored = router.session().last_more_info().unwrap();
    assert_eq!(stored.time_delayed, "2024-01-01T10:05:00+00:00");
}

#[tokio::test]
async fn transport_failure_sends_single_no_internet_for_every_call() {
    let mock = MockBackend::new();
    mock.on(nearby(5000), MockReply::Unreachable)
        .on(by_location(5000), MockReply::Unreachable)
        .on(board("812"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])))
        .on(board("812"), MockReply::Unreachable)
        .on(
            Endpoint::MoreInfo {
                station_id: "812",
                departure_uuid: "dep-1",
            },
            MockReply::Unreachable,
        );

    // Nearby stations
    let (mut legacy, mut rx) = setup(&mock, false);
    legacy.handle(Trigger::LocationReady(HERE)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    // Departures by location
    let (mut quick, mut rx) = setup(&mock, true);
    quick.handle(Trigger::LocationReady(HERE)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    // Populate the cache, then departures by station and more info fail
    let (mut router, mut rx) = setup(&mock, false);
    router.handle(station_request("812")).await.unwrap();
    drain(&mut rx);

    router.handle(station_request("812")).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    router.handle(more_info_request(1)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
}

#[tokio::test]
async fn stop_origin_uses_station_from_stop_key() {
    let mock = MockBackend::new();
    mock.on(board("900"), MockReply::json(&json!([departure("d", 7, "Zollstock")])));
    let (mut router, mut rx) = setup(&mock, false);

    router
        .handle(Trigger::AppMessage(payload(json!({"GET_STATION_FROM_STOP": 900}))))
        .await
        .unwrap();

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key, OutboundKey::StationFromStop);
    assert_eq!(parse_text(&sent[0]), json!([["18", "Zollstock", "10:07", "2"]]));
    assert_eq!(router.session().departures().unwrap().station_id, StationId::Int(900));
}

#[tokio::test]
async fn http_error_status_is_no_internet() {
    let mock = MockBackend::new();
    mock.on(board("812"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])))
        .on(
            Endpoint::MoreInfo {
                station_id: "812",
                departure_uuid: "dep-1",
            },
            MockReply::status(500, "boom"),
        )
        .on(board("13"), MockReply::status(502, "bad gateway"));
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(station_request("812")).await.unwrap();
    drain(&mut rx);

    router.handle(more_info_request(1)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    router.handle(station_request("13")).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
}

#[tokio::test]
async fn more_info_without_cache_reports_no_internet_without_calling_backend() {
    let mock = MockBackend::new();
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(more_info_request(1)).await.unwrap();

    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn more_info_out_of_range_reports_no_internet() {
    let mock = MockBackend::new();
    mock.on(board("812"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])));
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(station_request("812")).await.unwrap();
    drain(&mut rx);

    router.handle(more_info_request(2)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
    assert_eq!(mock.requests(), vec!["/pebble/current/812".to_string()]);
}

#[tokio::test]
async fn malformed_board_keeps_previous_cache() {
    let mock = MockBackend::new();
    mock.on(board("812"), MockReply::json(&json!([departure("dep-1", 0, "Bonn")])))
        .on(board("13"), MockReply::status(200, "{\"oops\":"))
        .on(
            board("14"),
            MockReply::json(&json!([["u", null, "1", "X", "whenever", "1"]])),
        );
    let (mut router, mut rx) = setup(&mock, false);

    router.handle(station_request("812")).await.unwrap();
    drain(&mut rx);

    router.handle(station_request("13")).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    router.handle(station_request("14")).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);

    assert_eq!(
        router.session().departures().unwrap().station_id,
        StationId::from("812")
    );
}

#[tokio::test]
async fn location_board_without_station_id_is_no_internet() {
    let mock = MockBackend::new();
    mock.on(
        by_location(5000),
        MockReply::json(&json!({"station": ["Dom"], "departures": []})),
    );
    let (mut router, mut rx) = setup(&mock, true);

    router.handle(Trigger::LocationReady(HERE)).await.unwrap();
    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
    assert!(router.session().departures().is_none());
}

#[tokio::test]
async fn unrecognised_message_sends_nothing() {
    let mock = MockBackend::new();
    let (mut router, mut rx) = setup(&mock, false);

    let sent = router
        .handle(Trigger::AppMessage(payload(json!({"PING": 1}))))
        .await
        .unwrap();

    assert_eq!(sent, 0);
    assert!(drain(&mut rx).is_empty());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn malformed_request_value_sends_no_internet() {
    let mock = MockBackend::new();
    let (mut router, mut rx) = setup(&mock, false);

    router
        .handle(Trigger::AppMessage(payload(json!({"GET_MORE_INFO": -3}))))
        .await
        .unwrap();

    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
}

#[tokio::test]
async fn blank_station_id_sends_no_internet_without_calling_backend() {
    let mock = MockBackend::new();
    let (mut router, mut rx) = setup(&mock, false);

    router
        .handle(Trigger::AppMessage(payload(json!({"GET_STATION": "   "}))))
        .await
        .unwrap();

    assert_eq!(drain(&mut rx), vec![OutboundMessage::no_internet()]);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn configuration_change_persists_and_relocates() {
    let mock = MockBackend::new();
    mock.on(nearby(5000), MockReply::json(&json!([["1", "Dom/Hbf", 0.2]])))
        .on(
            by_location(1500),
            MockReply::json(&json!({
                "station": ["Dom/Hbf", 0.1, 812],
                "departures": [departure("dep-1", 9, "Bonn")]
            })),
        )
        .on(board("812"), MockReply::json(&json!([departure("dep-2", 12, "Bonn")])));
    let store = Arc::new(MemorySettingsStore::new(settings(false)));
    let (mut router, mut rx) = setup_with_store(&mock, store.clone());

    router.handle(Trigger::LocationReady(HERE)).await.unwrap();
    drain(&mut rx);

    router
        .handle(Trigger::ConfigurationChanged {
            update: ConfigUpdate {
                radius_km: 1.5,
                api_url: "http://other.test/".to_string(),
                quick_start: true,
            },
            position: HERE,
        })
        .await
        .unwrap();

    let saved = store.load().unwrap();
    assert_eq!(saved.radius_meters, 1500);
    assert_eq!(saved.backend_base_url, "http://other.test");
    assert!(saved.quick_start);
    assert_eq!(router.settings(), &saved);

    let sent = drain(&mut rx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].key, OutboundKey::StationArray);
    assert_eq!(router.session().departures().unwrap().station_id, StationId::Int(812));

    // Later requests also go to the new host.
    router
        .handle(Trigger::AppMessage(payload(json!({"GET_STATION": 812}))))
        .await
        .unwrap();
    assert_eq!(drain(&mut rx).len(), 1);

    assert_eq!(
        mock.requests(),
        vec![
            "/pebble/stations?lat=50.9413&lon=6.9583&radius=5000".to_string(),
            "/pebble/currentLocation?lat=50.9413&lon=6.9583&radius=1500".to_string(),
            "/pebble/current/812".to_string(),
        ]
    );
    assert_eq!(
        mock.base_urls(),
        vec![
            "http://backend.test".to_string(),
            "http://other.test".to_string(),
            "http://other.test".to_string(),
        ]
    );
}

#[tokio::test]
async fn overlapping_triggers_are_handled_in_issue_order() {
    let mock = MockBackend::new();
    mock.on_delayed(
        board("A"),
        MockReply::json(&json!([departure("a-1", 0, "Slow")])),
        Duration::from_millis(50),
    )
    .on(board("B"), MockReply::json(&json!([departure("b-1", 1, "Fast")])));
    let (mut router, mut rx) = setup(&mock, false);

    let (tx, triggers) = mpsc::channel(8);
    tx.send(station_request("A")).await.unwrap();
    tx.send(station_request("B")).await.unwrap();
    tx.send(more_info_request(1)).await.unwrap();
    drop(tx);

    router.run(triggers).await.unwrap();

    let sent = drain(&mut rx);
    assert_eq!(parse_text(&sent[0]), json!([["18", "Slow", "10:00", "2"]]));
    assert_eq!(parse_text(&sent[1]), json!([["18", "Fast", "10:01", "2"]]));

    // The later-issued request owns the cache, so more-info goes to B.
    assert_eq!(router.session().departures().unwrap().station_id, StationId::from("B"));
    assert_eq!(
        mock.requests(),
        vec![
            "/pebble/current/A".to_string(),
            "/pebble/current/B".to_string(),
            "/pebble/moreinfo/B/b-1".to_string(),
        ]
    );
}
