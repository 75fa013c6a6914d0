//! Domain record types produced by the ingestion pipeline
//!
//! This module contains the record shapes handed to the storage layer:
//! stations and field devices, climate readings with their named metric
//! slots, weather data types, and countries.

use crate::constants::{DATETIME_FORMATS, METRIC_FIELDS};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parse a timestamp string through the recognized format chain.
///
/// Accepts RFC 3339 first, then each format in [`DATETIME_FORMATS`]; naive
/// timestamps are interpreted as UTC.
pub fn parse_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, format) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(
                date.and_hms_opt(0, 0, 0).expect("midnight is always valid"),
                Utc,
            ));
        }
    }
    Err(Error::invalid_date(field, trimmed))
}

// =============================================================================
// Stations and Field Devices
// =============================================================================

/// Kind of entity a reading or stack is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Fixed weather monitoring station
    WeatherStation,
    /// Mobile or in-field telemetry device
    FieldDevice,
}

/// A monitoring station or field device record
///
/// Stations are upsert-keyed by name during CSV imports; field devices are
/// resolved by their external identifier during telemetry sessions. Both share
/// the reading and stack machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    /// Storage-assigned identifier (0 until persisted)
    pub id: u64,

    /// Human-readable name, unique per kind
    pub name: String,

    /// External identifier (e.g. a WMO code or device serial), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Latitude in WGS84 decimal degrees
    pub latitude: f64,

    /// Longitude in WGS84 decimal degrees
    pub longitude: f64,

    /// Entity kind
    pub kind: SourceKind,

    /// Optional free-form metadata captured from extra import columns
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl StationRecord {
    /// Create a new weather station record with validation
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Result<Self> {
        let station = Self {
            id: 0,
            name: name.into(),
            external_id: None,
            latitude,
            longitude,
            kind: SourceKind::WeatherStation,
            metadata: HashMap::new(),
        };
        station.validate()?;
        Ok(station)
    }

    /// Validate coordinate ranges and required fields
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::invalid_numeric("latitude", self.latitude.to_string()));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::invalid_numeric(
                "longitude",
                self.longitude.to_string(),
            ));
        }
        Ok(())
    }

    /// Get station location as (latitude, longitude) tuple
    pub fn location(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

// =============================================================================
// Climate Readings
// =============================================================================

/// Named metric slots carried by a climate/field reading
///
/// Every slot is optional; a reading usually carries a handful. Slot names
/// match the recognized CSV column names in [`METRIC_FIELDS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barometric_pressure: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_cover: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_quality_index: Option<f64>,
}

impl ClimateMetrics {
    /// Set a metric slot by column name; returns false for unrecognized names
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match name {
            "temperature" => self.temperature = Some(value),
            "humidity" => self.humidity = Some(value),
            "precipitation" => self.precipitation = Some(value),
            "wind_speed" => self.wind_speed = Some(value),
            "wind_direction" => self.wind_direction = Some(value),
            "barometric_pressure" => self.barometric_pressure = Some(value),
            "cloud_cover" => self.cloud_cover = Some(value),
            "soil_moisture" => self.soil_moisture = Some(value),
            "water_level" => self.water_level = Some(value),
            "uv_index" => self.uv_index = Some(value),
            "air_quality_index" => self.air_quality_index = Some(value),
            _ => return false,
        }
        true
    }

    /// Get a metric slot by column name
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            "precipitation" => self.precipitation,
            "wind_speed" => self.wind_speed,
            "wind_direction" => self.wind_direction,
            "barometric_pressure" => self.barometric_pressure,
            "cloud_cover" => self.cloud_cover,
            "soil_moisture" => self.soil_moisture,
            "water_level" => self.water_level,
            "uv_index" => self.uv_index,
            "air_quality_index" => self.air_quality_index,
            _ => None,
        }
    }

    /// Whether no metric slot is populated
    pub fn is_empty(&self) -> bool {
        METRIC_FIELDS.iter().all(|name| self.get(name).is_none())
    }

    /// Fill every empty slot from another set of metrics.
    ///
    /// Used by interval-series generation to carry the last observed value
    /// forward across boundaries without an exact timestamp match.
    pub fn fill_missing_from(&mut self, previous: &ClimateMetrics) {
        for name in METRIC_FIELDS {
            if self.get(name).is_none() {
                if let Some(value) = previous.get(name) {
                    self.set(name, value);
                }
            }
        }
    }
}

/// A persisted climate/field reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    /// Owning station or device id
    pub station_id: u64,

    /// Observation timestamp
    pub timestamp: DateTime<Utc>,

    /// Metric values carried by this reading
    pub metrics: ClimateMetrics,
}

impl ReadingRecord {
    /// Create a reading for a station at a timestamp
    pub fn new(station_id: u64, timestamp: DateTime<Utc>, metrics: ClimateMetrics) -> Self {
        Self {
            station_id,
            timestamp,
            metrics,
        }
    }
}

// =============================================================================
// Weather Data Types
// =============================================================================

/// A weather data-type definition (e.g. "temperature" with its valid range)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTypeRecord {
    /// Unique data-type name, upsert key
    pub name: String,

    /// Measurement unit, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Minimum plausible value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    /// Maximum plausible value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

impl DataTypeRecord {
    /// Validate name presence and range ordering
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(Error::invalid_numeric(
                    "min_value",
                    format!("{min} exceeds max_value {max}"),
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Countries
// =============================================================================

/// A country record used to group stations geographically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// ISO-style country code, normalized to uppercase, upsert key
    pub code: String,

    /// Country name
    pub name: String,

    /// Whether the country lies in the southern hemisphere
    pub southern_hemisphere: bool,
}

impl CountryRecord {
    /// Whether the code has the expected 2-3 letter alphabetic shape
    pub fn code_is_well_formed(&self) -> bool {
        (2..=3).contains(&self.code.len()) && self.code.chars().all(|c| c.is_ascii_alphabetic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod station_tests {
        use super::*;

        #[test]
        fn test_station_creation_valid() {
            let station = StationRecord::new("Station A", 37.7, -122.4).unwrap();
            assert_eq!(station.name, "Station A");
            assert_eq!(station.location(), (37.7, -122.4));
            assert_eq!(station.kind, SourceKind::WeatherStation);
        }

        #[test]
        fn test_station_coordinate_validation() {
            assert!(StationRecord::new("A", 95.0, 0.0).is_err());
            assert!(StationRecord::new("A", -95.0, 0.0).is_err());
            assert!(StationRecord::new("A", 0.0, 185.0).is_err());
            assert!(StationRecord::new("A", 0.0, -185.0).is_err());
        }

        #[test]
        fn test_station_requires_name() {
            assert!(StationRecord::new("  ", 0.0, 0.0).is_err());
        }
    }

    mod metrics_tests {
        use super::*;

        #[test]
        fn test_set_and_get_by_name() {
            let mut metrics = ClimateMetrics::default();
            assert!(metrics.is_empty());

            assert!(metrics.set("temperature", 15.5));
            assert!(metrics.set("humidity", 75.0));
            assert!(!metrics.set("no_such_metric", 1.0));

            assert_eq!(metrics.get("temperature"), Some(15.5));
            assert_eq!(metrics.get("humidity"), Some(75.0));
            assert_eq!(metrics.get("precipitation"), None);
            assert!(!metrics.is_empty());
        }

        #[test]
        fn test_every_declared_field_is_settable() {
            let mut metrics = ClimateMetrics::default();
            for (i, name) in METRIC_FIELDS.iter().enumerate() {
                assert!(metrics.set(name, i as f64), "unsettable field {name}");
                assert_eq!(metrics.get(name), Some(i as f64));
            }
        }

        #[test]
        fn test_fill_missing_carries_forward() {
            let mut previous = ClimateMetrics::default();
            previous.set("temperature", 10.0);
            previous.set("humidity", 60.0);

            let mut current = ClimateMetrics::default();
            current.set("temperature", 12.0);
            current.fill_missing_from(&previous);

            // Present slot kept, missing slot carried forward
            assert_eq!(current.temperature, Some(12.0));
            assert_eq!(current.humidity, Some(60.0));
            assert_eq!(current.precipitation, None);
        }

        #[test]
        fn test_serialization_skips_empty_slots() {
            let mut metrics = ClimateMetrics::default();
            metrics.set("temperature", 1.0);
            let json = serde_json::to_string(&metrics).unwrap();
            assert!(json.contains("temperature"));
            assert!(!json.contains("humidity"));
        }
    }

    mod data_type_tests {
        use super::*;

        #[test]
        fn test_range_ordering_enforced() {
            let record = DataTypeRecord {
                name: "temperature".to_string(),
                unit: Some("C".to_string()),
                description: None,
                min_value: Some(50.0),
                max_value: Some(-50.0),
            };
            assert!(record.validate().is_err());
        }
    }

    mod country_tests {
        use super::*;

        #[test]
        fn test_code_shape() {
            let mut country = CountryRecord {
                code: "AU".to_string(),
                name: "Australia".to_string(),
                southern_hemisphere: true,
            };
            assert!(country.code_is_well_formed());

            country.code = "AUS".to_string();
            assert!(country.code_is_well_formed());

            country.code = "AUST".to_string();
            assert!(!country.code_is_well_formed());

            country.code = "A1".to_string();
            assert!(!country.code_is_well_formed());
        }
    }
}
