//! Storage seam between the ingestion core and the portal's persistence layer
//!
//! Persistence of domain entities is owned by an external collaborator; the
//! pipeline only depends on the [`Storage`] trait. Row strategies stage
//! [`DomainOp`]s that the batch runner commits in one transaction per batch;
//! stack pushes and telemetry bulk inserts go through dedicated entry points.
//!
//! [`InMemoryStorage`] is the reference implementation used by tests and the
//! CLI. It keeps per-entity stacks behind their own mutexes so a push is a
//! single atomic read-modify-write, preserving the capacity invariant under
//! concurrent feeders.

use crate::app::models::{
    CountryRecord, DataTypeRecord, ReadingRecord, SourceKind, StationRecord,
};
use crate::app::services::data_stack::{
    reading_from_item, DataStack, FlushOutcome, PushOutcome, StackInfo,
};
use crate::config::StackConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures originating in the persistence layer
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// A batch transaction could not be committed
    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    /// Any other backend failure (connection loss, constraint violation)
    #[error("Storage backend error: {message}")]
    Backend { message: String },
}

impl StorageError {
    /// Create a transaction failure
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create a backend failure
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// One staged domain mutation produced by a row strategy
#[derive(Debug, Clone)]
pub enum DomainOp {
    /// Insert or update a station/device, keyed by name
    UpsertStation(StationRecord),
    /// Append a climate/field reading
    InsertReading(ReadingRecord),
    /// Insert or update a weather data type, keyed by name
    UpsertDataType(DataTypeRecord),
    /// Insert or update a country, keyed by code
    UpsertCountry(CountryRecord),
}

/// Persistence interface consumed by the ingestion core
pub trait Storage: Send + Sync {
    /// Resolve a station reference: external id first, then name, then
    /// numeric storage id. Returns the storage id when found.
    fn resolve_station(&self, reference: &str) -> StorageResult<Option<u64>>;

    /// Resolve a field device by its external device id
    fn resolve_device(&self, device_id: &str) -> StorageResult<Option<u64>>;

    /// Look up a station id by exact name
    fn find_station_by_name(&self, name: &str) -> StorageResult<Option<u64>>;

    /// Whether a data type with this name exists
    fn data_type_exists(&self, name: &str) -> StorageResult<bool>;

    /// Whether a country with this code exists
    fn country_exists(&self, code: &str) -> StorageResult<bool>;

    /// Commit a batch of staged operations in one transaction.
    /// Either every op is applied or none are. Returns ops applied.
    fn commit(&self, ops: Vec<DomainOp>) -> StorageResult<usize>;

    /// Bulk-insert readings (telemetry path). Returns records inserted.
    fn insert_readings(&self, readings: Vec<ReadingRecord>) -> StorageResult<usize>;

    /// Push one reading item onto the entity's stack. Must be atomic per
    /// entity; an auto-process flush triggered by this push happens before
    /// the call returns.
    fn stack_push(&self, station_id: u64, item: Value) -> StorageResult<PushOutcome>;

    /// Drain the entity's stack into persisted readings
    fn process_stack(&self, station_id: u64) -> StorageResult<FlushOutcome>;

    /// Empty the entity's stack without persisting (operator reset)
    fn clear_stack(&self, station_id: u64) -> StorageResult<()>;

    /// Snapshot the entity's stack state
    fn stack_info(&self, station_id: u64) -> StorageResult<StackInfo>;
}

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    stations: HashMap<u64, StationRecord>,
    name_index: HashMap<String, u64>,
    external_index: HashMap<String, u64>,
    readings: Vec<ReadingRecord>,
    data_types: HashMap<String, DataTypeRecord>,
    countries: HashMap<String, CountryRecord>,
}

impl Tables {
    fn apply(&mut self, op: DomainOp) {
        match op {
            DomainOp::UpsertStation(mut record) => {
                if let Some(&id) = self.name_index.get(&record.name) {
                    record.id = id;
                } else {
                    self.next_id += 1;
                    record.id = self.next_id;
                    self.name_index.insert(record.name.clone(), record.id);
                }
                if let Some(external) = &record.external_id {
                    self.external_index.insert(external.clone(), record.id);
                }
                self.stations.insert(record.id, record);
            }
            DomainOp::InsertReading(record) => self.readings.push(record),
            DomainOp::UpsertDataType(record) => {
                self.data_types.insert(record.name.clone(), record);
            }
            DomainOp::UpsertCountry(record) => {
                self.countries.insert(record.code.clone(), record);
            }
        }
    }
}

/// In-memory reference storage used by tests and the CLI
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
    // One mutex per entity stack; the outer lock only guards map membership.
    stacks: RwLock<HashMap<u64, Arc<Mutex<DataStack>>>>,
    stack_config: StackConfig,
}

impl InMemoryStorage {
    /// Create storage with the given stack parameters for new entities
    pub fn new(stack_config: StackConfig) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            stacks: RwLock::new(HashMap::new()),
            stack_config,
        }
    }

    /// Register a weather station directly (test/CLI setup)
    pub fn add_station(&self, record: StationRecord) -> u64 {
        let name = record.name.clone();
        let mut tables = self.tables.lock().unwrap();
        tables.apply(DomainOp::UpsertStation(record));
        tables.name_index[&name]
    }

    /// Register a field device directly (test/CLI setup)
    pub fn add_device(&self, device_id: &str, name: &str) -> u64 {
        let record = StationRecord {
            id: 0,
            name: name.to_string(),
            external_id: Some(device_id.to_string()),
            latitude: 0.0,
            longitude: 0.0,
            kind: SourceKind::FieldDevice,
            metadata: HashMap::new(),
        };
        self.add_station(record)
    }

    /// Number of stored stations/devices
    pub fn station_count(&self) -> usize {
        self.tables.lock().unwrap().stations.len()
    }

    /// Clone of a stored station by id
    pub fn station(&self, id: u64) -> Option<StationRecord> {
        self.tables.lock().unwrap().stations.get(&id).cloned()
    }

    /// Snapshot of all persisted readings, in insertion order
    pub fn readings(&self) -> Vec<ReadingRecord> {
        self.tables.lock().unwrap().readings.clone()
    }

    /// Clone of a stored data type by name
    pub fn data_type(&self, name: &str) -> Option<DataTypeRecord> {
        self.tables.lock().unwrap().data_types.get(name).cloned()
    }

    /// Clone of a stored country by code
    pub fn country(&self, code: &str) -> Option<CountryRecord> {
        self.tables.lock().unwrap().countries.get(code).cloned()
    }

    fn stack_for(&self, station_id: u64) -> Arc<Mutex<DataStack>> {
        if let Some(stack) = self.stacks.read().unwrap().get(&station_id) {
            return Arc::clone(stack);
        }
        let mut stacks = self.stacks.write().unwrap();
        Arc::clone(
            stacks
                .entry(station_id)
                .or_insert_with(|| Arc::new(Mutex::new(DataStack::new(&self.stack_config)))),
        )
    }

    // Persist sink shared by push-triggered and explicit flushes. Lock order
    // is stack mutex then tables mutex; tables never acquires a stack lock.
    fn persist_item(&self, station_id: u64, item: &Value) -> std::result::Result<(), String> {
        let reading = reading_from_item(station_id, item).map_err(|e| e.to_string())?;
        self.tables.lock().unwrap().readings.push(reading);
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(StackConfig::default())
    }
}

impl Storage for InMemoryStorage {
    fn resolve_station(&self, reference: &str) -> StorageResult<Option<u64>> {
        let tables = self.tables.lock().unwrap();
        if let Some(&id) = tables.external_index.get(reference) {
            return Ok(Some(id));
        }
        if let Some(&id) = tables.name_index.get(reference) {
            return Ok(Some(id));
        }
        if let Ok(id) = reference.trim().parse::<u64>() {
            if tables.stations.contains_key(&id) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn resolve_device(&self, device_id: &str) -> StorageResult<Option<u64>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .external_index
            .get(device_id)
            .copied()
            .filter(|id| {
                tables
                    .stations
                    .get(id)
                    .map(|s| s.kind == SourceKind::FieldDevice)
                    .unwrap_or(false)
            }))
    }

    fn find_station_by_name(&self, name: &str) -> StorageResult<Option<u64>> {
        Ok(self.tables.lock().unwrap().name_index.get(name).copied())
    }

    fn data_type_exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.tables.lock().unwrap().data_types.contains_key(name))
    }

    fn country_exists(&self, code: &str) -> StorageResult<bool> {
        Ok(self.tables.lock().unwrap().countries.contains_key(code))
    }

    fn commit(&self, ops: Vec<DomainOp>) -> StorageResult<usize> {
        let mut tables = self.tables.lock().unwrap();
        let applied = ops.len();
        for op in ops {
            tables.apply(op);
        }
        debug!(applied, "batch committed");
        Ok(applied)
    }

    fn insert_readings(&self, readings: Vec<ReadingRecord>) -> StorageResult<usize> {
        let mut tables = self.tables.lock().unwrap();
        let inserted = readings.len();
        tables.readings.extend(readings);
        Ok(inserted)
    }

    fn stack_push(&self, station_id: u64, item: Value) -> StorageResult<PushOutcome> {
        let stack = self.stack_for(station_id);
        let mut stack = stack.lock().unwrap();
        Ok(stack.push(item, |value| self.persist_item(station_id, value)))
    }

    fn process_stack(&self, station_id: u64) -> StorageResult<FlushOutcome> {
        let stack = self.stack_for(station_id);
        let mut stack = stack.lock().unwrap();
        let mut sink = |value: &Value| self.persist_item(station_id, value);
        Ok(stack.flush(&mut sink))
    }

    fn clear_stack(&self, station_id: u64) -> StorageResult<()> {
        let stack = self.stack_for(station_id);
        stack.lock().unwrap().clear();
        Ok(())
    }

    fn stack_info(&self, station_id: u64) -> StorageResult<StackInfo> {
        let stack = self.stack_for(station_id);
        let info = stack.lock().unwrap().info();
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn station(name: &str) -> StationRecord {
        StationRecord::new(name, 51.5, -0.1).unwrap()
    }

    #[test]
    fn test_upsert_station_is_idempotent_by_name() {
        let storage = InMemoryStorage::default();
        storage.commit(vec![DomainOp::UpsertStation(station("Heathrow"))]).unwrap();
        storage.commit(vec![DomainOp::UpsertStation(station("Heathrow"))]).unwrap();
        assert_eq!(storage.station_count(), 1);
    }

    #[test]
    fn test_station_resolution_priority() {
        let storage = InMemoryStorage::default();
        let mut record = station("Ridge Top");
        record.external_id = Some("WMO-42".to_string());
        storage.commit(vec![DomainOp::UpsertStation(record)]).unwrap();

        let by_external = storage.resolve_station("WMO-42").unwrap().unwrap();
        let by_name = storage.resolve_station("Ridge Top").unwrap().unwrap();
        let by_id = storage.resolve_station(&by_external.to_string()).unwrap().unwrap();
        assert_eq!(by_external, by_name);
        assert_eq!(by_name, by_id);

        assert!(storage.resolve_station("unknown").unwrap().is_none());
    }

    #[test]
    fn test_device_resolution_requires_device_kind() {
        let storage = InMemoryStorage::default();
        let mut record = station("Not a device");
        record.external_id = Some("EXT-1".to_string());
        storage.commit(vec![DomainOp::UpsertStation(record)]).unwrap();

        assert!(storage.resolve_device("EXT-1").unwrap().is_none());

        let device_id = storage.add_device("DEV-9", "Soil probe 9");
        assert_eq!(storage.resolve_device("DEV-9").unwrap(), Some(device_id));
    }

    #[test]
    fn test_stack_push_and_process_round_trip() {
        let storage = InMemoryStorage::default();
        let id = storage.add_station(station("Buffered"));

        let now = Utc::now().to_rfc3339();
        for temp in [1.0, 2.0, 3.0] {
            let outcome = storage
                .stack_push(id, serde_json::json!({"timestamp": now, "temperature": temp}))
                .unwrap();
            assert!(outcome.accepted);
        }
        assert_eq!(storage.stack_info(id).unwrap().stack_size, 3);

        let flush = storage.process_stack(id).unwrap();
        assert_eq!(flush.persisted, 3);
        assert_eq!(storage.stack_info(id).unwrap().stack_size, 0);

        let readings = storage.readings();
        assert_eq!(readings.len(), 3);
        // FIFO: persisted in push order
        assert_eq!(readings[0].metrics.temperature, Some(1.0));
        assert_eq!(readings[2].metrics.temperature, Some(3.0));
    }
}
