//! Tests for telemetry sessions and interval expansion

use crate::app::storage::InMemoryStorage;


pub fn storage_with_device(device_id: &str) -> (InMemoryStorage, u64) {
    let storage = InMemoryStorage::default();
    let id = storage.add_device(device_id, "Field probe");
    (storage, id)
}
