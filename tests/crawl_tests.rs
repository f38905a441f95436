//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the platform's JSON APIs and
//! run full crawl cycles against an in-memory database.

use livetide::config::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use livetide::crawler::Coordinator;
use livetide::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(base_url: &str) -> Config {
    Config {
        site: SiteConfig {
            code: "douyu".to_string(),
            name: "Douyu".to_string(),
            url: base_url.to_string(),
            channel_list_url: format!("{}/api/RoomApi/game", base_url),
            room_list_url: format!("{}/api/v1/live/{{channel}}", base_url),
            room_detail_url: format!("{}/api/RoomApi/room/{{room}}", base_url),
        },
        crawler: CrawlerConfig::default(),
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
    }
}

fn envelope(data: Value) -> Value {
    json!({ "error": 0, "data": data })
}

fn channel_entry(id: &str, name: &str) -> Value {
    json!({
        "cate_id": id,
        "game_name": name,
        "game_url": format!("/g_{}", name),
        "short_name": name,
        "game_src": "img.png",
        "game_icon": "icon.png",
    })
}

/// A page of rooms with ids `start..start + count`
fn rooms_page(start: usize, count: usize) -> Value {
    let rooms: Vec<Value> = (start..start + count)
        .map(|i| {
            json!({
                "room_id": format!("{}", 90000 + i),
                "room_name": format!("room {}", i),
                "room_src": "r.png",
                "nickname": "owner",
                "owner_uid": "7",
                "avatar": "a.png",
                "online": 10,
                "url": format!("https://www.example.com/{}", 90000 + i),
            })
        })
        .collect();
    Value::Array(rooms)
}

async fn mount_channel_list(server: &MockServer, channels: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/RoomApi/game"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(Value::Array(channels))))
        .mount(server)
        .await;
}

/// Detail endpoint that rejects everything with an application error, for
/// tests that only exercise the list cycle
async fn mount_detail_sink(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/RoomApi/room/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": 1, "data": "" })))
        .mount(server)
        .await;
}

fn coordinator_for(server: &MockServer) -> Coordinator {
    let config = test_config(&server.uri());
    let storage = SqliteStorage::new_in_memory().expect("in-memory storage");
    Coordinator::with_storage(config, storage).expect("coordinator")
}

async fn run_cycle(coordinator: &mut Coordinator) -> livetide::crawler::CycleStats {
    // A cycle that hangs past this point means the draining loop failed
    // to notice the idle pool.
    tokio::time::timeout(Duration::from_secs(60), coordinator.run_cycle())
        .await
        .expect("crawl cycle should terminate")
        .expect("crawl cycle should succeed")
}

#[tokio::test]
async fn test_discovery_marks_absent_channels_invalid() {
    let server = MockServer::start().await;
    mount_channel_list(
        &server,
        vec![channel_entry("1", "LOL"), channel_entry("2", "DOTA")],
    )
    .await;
    // Neither channel has rooms.
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/live/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 0))))
        .mount(&server)
        .await;
    mount_detail_sink(&server).await;

    let mut coordinator = coordinator_for(&server);
    run_cycle(&mut coordinator).await;

    let site = coordinator.storage().get_site("douyu").unwrap().unwrap();
    assert_eq!(
        coordinator
            .storage()
            .list_valid_channels(site.id)
            .unwrap()
            .len(),
        2
    );

    // Second discovery only returns channel 1.
    server.reset().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/live/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 0))))
        .mount(&server)
        .await;
    mount_detail_sink(&server).await;

    run_cycle(&mut coordinator).await;

    let valid = coordinator.storage().list_valid_channels(site.id).unwrap();
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].office_id, "1");
    assert_eq!(valid[0].name, "LOL");

    let dropped = coordinator
        .storage()
        .get_channel(site.id, "2")
        .unwrap()
        .unwrap();
    assert!(!dropped.valid);
}

#[tokio::test]
async fn test_pagination_walks_full_pages_and_stops_on_short_page() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    mount_detail_sink(&server).await;

    // Page lengths [100, 100, 57] must produce offsets [0, 100, 200]
    // and nothing else.
    for (offset, start, count) in [(0usize, 0usize, 100usize), (100, 100, 100), (200, 200, 57)] {
        Mock::given(method("GET"))
            .and(path("/api/v1/live/1"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(rooms_page(start, count))),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut coordinator = coordinator_for(&server);
    let stats = run_cycle(&mut coordinator).await;
    assert_eq!(stats.rooms_listed, 257);

    let site = coordinator.storage().get_site("douyu").unwrap().unwrap();
    let channel = coordinator
        .storage()
        .get_channel(site.id, "1")
        .unwrap()
        .unwrap();
    assert_eq!(channel.room_total, 257);
    assert_eq!(channel.room_range, 257);
    assert_eq!(
        coordinator
            .storage()
            .count_channel_snapshots_for(site.id, "1")
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_pagination_off_by_one_page_overlaps_instead_of_stopping() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    mount_detail_sink(&server).await;

    // A page of 99 against limit 100 is the platform's off-by-one
    // boundary: the scanner must continue at offset 199, not stop.
    for (offset, start, count) in [(0usize, 0usize, 100usize), (100, 100, 99), (199, 199, 10)] {
        Mock::given(method("GET"))
            .and(path("/api/v1/live/1"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(rooms_page(start, count))),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut coordinator = coordinator_for(&server);
    run_cycle(&mut coordinator).await;

    let site = coordinator.storage().get_site("douyu").unwrap().unwrap();
    let channel = coordinator
        .storage()
        .get_channel(site.id, "1")
        .unwrap()
        .unwrap();
    assert_eq!(channel.room_total, 100 + 99 + 10);
}

#[tokio::test]
async fn test_zero_room_channel_still_gets_a_snapshot() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    mount_detail_sink(&server).await;

    // First cycle: two rooms.
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 2))))
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    run_cycle(&mut coordinator).await;

    let site = coordinator.storage().get_site("douyu").unwrap().unwrap();
    let channel = coordinator
        .storage()
        .get_channel(site.id, "1")
        .unwrap()
        .unwrap();
    assert_eq!(channel.room_total, 2);
    assert_eq!(coordinator.storage().list_open_rooms().unwrap().len(), 2);

    // Second cycle: the channel has emptied out.
    server.reset().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    mount_detail_sink(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 0))))
        .mount(&server)
        .await;

    run_cycle(&mut coordinator).await;

    let channel = coordinator
        .storage()
        .get_channel(site.id, "1")
        .unwrap()
        .unwrap();
    assert_eq!(channel.room_total, 0);
    assert_eq!(channel.room_range, -2);
    assert_eq!(
        coordinator
            .storage()
            .count_channel_snapshots_for(site.id, "1")
            .unwrap(),
        2
    );

    // The pre-scan close was never contradicted, so both rooms ended up
    // closed rather than deleted.
    assert!(coordinator.storage().list_open_rooms().unwrap().is_empty());
    assert!(coordinator.storage().get_room("90000").unwrap().is_some());
}

#[tokio::test]
async fn test_detail_cycle_normalizes_and_snapshots() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(1, 1))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/RoomApi/room/90001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "room_name": "renamed room",
            "room_thumb": "t.png",
            "owner_name": "owner",
            "avatar": "a.png",
            "online": 55,
            "room_status": "1",
            "fans_num": "1234",
            "owner_weight": "2.5t",
            "start_time": "2026-08-29 12:00",
        }))))
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    let stats = run_cycle(&mut coordinator).await;
    assert_eq!(stats.rooms_detailed, 1);

    let room = coordinator.storage().get_room("90001").unwrap().unwrap();
    assert_eq!(room.name, "renamed room");
    assert_eq!(room.spectators, 55);
    assert_eq!(room.followers, 1234);
    assert_eq!(room.weight.as_deref(), Some("2.5t"));
    assert_eq!(room.weight_int, Some(2_500_000));
    assert!(room.openstatus);
    assert!(room.start_time.is_some());

    // One snapshot from the list scan, one from the detail refresh.
    assert_eq!(
        coordinator
            .storage()
            .count_room_snapshots_for("90001")
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_failed_channel_scan_does_not_stall_siblings() {
    let server = MockServer::start().await;
    mount_channel_list(
        &server,
        vec![channel_entry("1", "LOL"), channel_entry("2", "DOTA")],
    )
    .await;
    mount_detail_sink(&server).await;

    // Channel 1 always fails; every attempt should be consumed.
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/live/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 3))))
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    let stats = run_cycle(&mut coordinator).await;

    // The healthy sibling completed and committed.
    assert_eq!(stats.channels_scanned, 1);
    assert!(stats.errors >= 1);

    let site = coordinator.storage().get_site("douyu").unwrap().unwrap();
    let healthy = coordinator
        .storage()
        .get_channel(site.id, "2")
        .unwrap()
        .unwrap();
    assert_eq!(healthy.room_total, 3);

    // The failed channel never got counters or a snapshot.
    let failed = coordinator
        .storage()
        .get_channel(site.id, "1")
        .unwrap()
        .unwrap();
    assert_eq!(failed.room_total, 0);
    assert_eq!(
        coordinator
            .storage()
            .count_channel_snapshots_for(site.id, "1")
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_list_cycle_never_touches_the_detail_endpoint() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(0, 3))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/RoomApi/room/.*$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": 1, "data": "" })))
        .expect(0)
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    let stats = tokio::time::timeout(Duration::from_secs(60), coordinator.run_list_cycle())
        .await
        .expect("list cycle should terminate")
        .expect("list cycle should succeed");

    assert_eq!(stats.rooms_listed, 3);
    assert_eq!(stats.rooms_detailed, 0);
    assert_eq!(coordinator.storage().list_open_rooms().unwrap().len(), 3);
}

#[tokio::test]
async fn test_discovery_failure_fails_the_cycle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/RoomApi/game"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": 42, "data": "" })))
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    let result = tokio::time::timeout(Duration::from_secs(60), coordinator.run_cycle())
        .await
        .expect("cycle should terminate");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_malformed_start_time_fails_only_that_room() {
    let server = MockServer::start().await;
    mount_channel_list(&server, vec![channel_entry("1", "LOL")]).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/live/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(rooms_page(1, 2))))
        .mount(&server)
        .await;

    let detail = |start_time: &str| {
        envelope(json!({
            "room_name": "room",
            "room_thumb": "t.png",
            "owner_name": "owner",
            "avatar": "a.png",
            "online": 5,
            "room_status": "1",
            "fans_num": "10",
            "owner_weight": "500g",
            "start_time": start_time,
        }))
    };

    Mock::given(method("GET"))
        .and(path("/api/RoomApi/room/90001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail("not a date")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/RoomApi/room/90002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail("2026-08-29 12:00")))
        .mount(&server)
        .await;

    let mut coordinator = coordinator_for(&server);
    let stats = run_cycle(&mut coordinator).await;

    assert_eq!(stats.rooms_detailed, 1);
    assert!(stats.errors >= 1);

    let good = coordinator.storage().get_room("90002").unwrap().unwrap();
    assert!(good.start_time.is_some());
    let bad = coordinator.storage().get_room("90001").unwrap().unwrap();
    assert!(bad.start_time.is_none());
}
