use super::run_csv;
use crate::app::models::StationRecord;
use crate::app::services::strategies::{ClimateMode, ClimateStrategy};
use crate::app::storage::{InMemoryStorage, Storage};
use crate::config::StackConfig;
use chrono::{TimeZone, Utc};

fn storage_with_station(name: &str) -> (InMemoryStorage, u64) {
    let storage = InMemoryStorage::default();
    let id = storage.add_station(StationRecord::new(name, 51.5, -0.1).unwrap());
    (storage, id)
}

#[test]
fn test_direct_reading_persisted() {
    let (storage, id) = storage_with_station("Ridge Top");
    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Direct),
        "station_name,timestamp,temperature,humidity\nRidge Top,2024-06-15 12:00:00,21.5,60\n",
    );

    assert_eq!(summary.success, 1);
    let readings = storage.readings();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].station_id, id);
    assert_eq!(
        readings[0].timestamp,
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    );
    assert_eq!(readings[0].metrics.temperature, Some(21.5));
    assert_eq!(readings[0].metrics.humidity, Some(60.0));
}

#[test]
fn test_station_reference_priority() {
    let (storage, _) = storage_with_station("Named");
    let mut other = StationRecord::new("Other", 0.0, 0.0).unwrap();
    other.external_id = Some("Named".to_string()); // external id shadows the name
    let other_id = storage.add_station(other);

    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Direct),
        "station_name,timestamp,temperature\nNamed,2024-01-01,1.0\n",
    );
    assert_eq!(summary.success, 1);
    assert_eq!(storage.readings()[0].station_id, other_id);
}

#[test]
fn test_unknown_station_fails_row() {
    let (storage, _) = storage_with_station("Known");
    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Direct),
        "station_name,timestamp,temperature\nGhost,2024-01-01,1.0\nKnown,2024-01-01,2.0\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 1);
    assert!(summary.errors[0].message.contains("Ghost"));
    assert_eq!(storage.readings().len(), 1);
}

#[test]
fn test_bad_metric_is_warning_not_error() {
    let (storage, _) = storage_with_station("Ridge Top");
    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Direct),
        "station_name,timestamp,temperature,humidity\nRidge Top,2024-01-01,oops,55\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 0);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].field.as_deref(), Some("temperature"));

    let readings = storage.readings();
    assert_eq!(readings[0].metrics.temperature, None);
    assert_eq!(readings[0].metrics.humidity, Some(55.0));
}

#[test]
fn test_bad_timestamp_fails_row() {
    let (storage, _) = storage_with_station("Ridge Top");
    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Direct),
        "station_name,timestamp,temperature\nRidge Top,whenever,1.0\n",
    );
    assert_eq!(summary.error, 1);
    assert_eq!(summary.errors[0].field.as_deref(), Some("timestamp"));
}

#[test]
fn test_stack_mode_buffers_instead_of_writing() {
    let (storage, id) = storage_with_station("Buffered");
    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Stack),
        "station_name,timestamp,temperature\nBuffered,2024-01-01 00:00:00,1.0\nBuffered,2024-01-02 00:00:00,2.0\n",
    );

    assert_eq!(summary.success, 2);
    assert!(storage.readings().is_empty(), "stack mode must not persist directly");
    assert_eq!(storage.stack_info(id).unwrap().stack_size, 2);
}

#[test]
fn test_stack_full_fails_row_only() {
    let storage = InMemoryStorage::new(StackConfig {
        max_size: 1,
        auto_process: false,
        process_threshold: 1,
    });
    storage.add_station(StationRecord::new("Tiny", 0.0, 0.0).unwrap());

    let summary = run_csv(
        &storage,
        &ClimateStrategy::new(ClimateMode::Stack),
        "station_name,timestamp,temperature\nTiny,2024-01-01,1.0\nTiny,2024-01-02,2.0\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 1);
    assert!(summary.errors[0].message.contains("full"));
}
