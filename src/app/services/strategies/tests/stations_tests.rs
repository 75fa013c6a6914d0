use super::run_csv;
use crate::app::services::strategies::StationsStrategy;
use crate::app::storage::{InMemoryStorage, Storage};

#[test]
fn test_single_station_upserted() {
    let storage = InMemoryStorage::default();
    let summary = run_csv(
        &storage,
        &StationsStrategy::new(true),
        "name,latitude,longitude\n\"Station A\",\"37.7\",\"-122.4\"\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 0);
    assert_eq!(storage.station_count(), 1);

    let id = storage.find_station_by_name("Station A").unwrap().unwrap();
    let station = storage.station(id).unwrap();
    assert_eq!(station.location(), (37.7, -122.4));
}

#[test]
fn test_reimport_is_idempotent() {
    let storage = InMemoryStorage::default();
    let csv = "name,latitude,longitude\nStation A,37.7,-122.4\nStation B,40.0,-105.0\n";

    run_csv(&storage, &StationsStrategy::new(true), csv);
    run_csv(&storage, &StationsStrategy::new(true), csv);
    assert_eq!(storage.station_count(), 2);
}

#[test]
fn test_bad_coordinates_fail_the_row() {
    let storage = InMemoryStorage::default();
    let summary = run_csv(
        &storage,
        &StationsStrategy::new(true),
        "name,latitude,longitude\nStation A,not-a-number,-122.4\nStation B,40.0,-105.0\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.error, 1);
    assert_eq!(summary.errors[0].field.as_deref(), Some("latitude"));
    assert_eq!(storage.station_count(), 1);
}

#[test]
fn test_missing_required_column() {
    let storage = InMemoryStorage::default();
    let summary = run_csv(
        &storage,
        &StationsStrategy::new(true),
        "name,latitude\nStation A,37.7\n",
    );
    assert_eq!(summary.error, 1);
    assert_eq!(summary.errors[0].field.as_deref(), Some("longitude"));
}

#[test]
fn test_unknown_columns_warn_known_optionals_kept() {
    let storage = InMemoryStorage::default();
    let summary = run_csv(
        &storage,
        &StationsStrategy::new(true),
        "name,latitude,longitude,elevation,favourite_color\nStation A,37.7,-122.4,120,teal\n",
    );

    assert_eq!(summary.success, 1);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].field.as_deref(), Some("favourite_color"));

    let id = storage.find_station_by_name("Station A").unwrap().unwrap();
    let station = storage.station(id).unwrap();
    assert_eq!(station.metadata.get("elevation").map(String::as_str), Some("120"));
    assert!(!station.metadata.contains_key("favourite_color"));
}

#[test]
fn test_update_existing_false_leaves_record() {
    let storage = InMemoryStorage::default();
    run_csv(
        &storage,
        &StationsStrategy::new(true),
        "name,latitude,longitude\nStation A,37.7,-122.4\n",
    );

    let summary = run_csv(
        &storage,
        &StationsStrategy::new(false),
        "name,latitude,longitude\nStation A,10.0,20.0\n",
    );
    assert_eq!(summary.success, 1);
    assert_eq!(summary.warnings.len(), 1);

    let id = storage.find_station_by_name("Station A").unwrap().unwrap();
    assert_eq!(storage.station(id).unwrap().location(), (37.7, -122.4));
}
