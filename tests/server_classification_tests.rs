//! scenario 4: heartbeat then advance the virtual clock through
//! Degraded into Offline.

use chrono::{TimeZone, Utc};
use log_nexus::clock::VirtualClock;
use log_nexus::heartbeat::HeartbeatSweeper;
use log_nexus::model::ServerStatus;
use log_nexus::realtime::FanOut;
use log_nexus::store::{HeartbeatFields, Store};
use std::sync::Arc;

#[tokio::test]
async fn server_moves_online_to_degraded_to_offline_as_heartbeats_lapse() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    let sweeper = HeartbeatSweeper::new(store.clone(), Arc::new(FanOut::default()));

    store
    .process_heartbeat(HeartbeatFields {
        server_name: "H1".into(),
        ip_address: None,
        agent_version: None,
        agent_type: None,
        metadata: None,
    })
    .await;
    assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Online);

    // default heartbeatIntervalSeconds = 60; 2*60+1s crosses into Degraded.
    clock.advance(chrono::Duration::seconds(121));
    sweeper.sweep_once().await;
    assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Degraded);

    // past 3*60s total crosses into Offline.
    clock.advance(chrono::Duration::seconds(60));
    sweeper.sweep_once().await;
    assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Offline);
}

#[tokio::test]
async fn a_fresh_heartbeat_brings_an_offline_server_back_online() {
    let clock = VirtualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    let store = Store::new(clock.clone());
    let sweeper = HeartbeatSweeper::new(store.clone(), Arc::new(FanOut::default()));

    store
    .process_heartbeat(HeartbeatFields {
        server_name: "H1".into(),
        ip_address: None,
        agent_version: None,
        agent_type: None,
        metadata: None,
    })
    .await;
    clock.advance(chrono::Duration::seconds(300));
    sweeper.sweep_once().await;
    assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Offline);

    store
    .process_heartbeat(HeartbeatFields {
        server_name: "H1".into(),
        ip_address: None,
        agent_version: None,
        agent_type: None,
        metadata: None,
    })
    .await;
    assert_eq!(store.get_server("H1").await.unwrap().status, ServerStatus::Online);
}
