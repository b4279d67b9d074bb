//! Core data models for storm observations

use serde::{Deserialize, Serialize};
use std::fmt;

/// One storm observation at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StormRecord {
    pub latitude: f32,
    pub longitude: f32,
    pub wind_speed: f32,
    pub pressure: f32,
}

impl StormRecord {
    pub fn new(latitude: f32, longitude: f32, wind_speed: f32, pressure: f32) -> Self {
        Self {
            latitude,
            longitude,
            wind_speed,
            pressure,
        }
    }

    /// Value of a single column
    pub fn get(&self, field: StormField) -> f32 {
        match field {
            StormField::Latitude => self.latitude,
            StormField::Longitude => self.longitude,
            StormField::WindSpeed => self.wind_speed,
            StormField::Pressure => self.pressure,
        }
    }

    /// Build a record from values in `StormField::ALL` order
    pub fn from_columns(values: [f32; StormField::COUNT]) -> Self {
        let [latitude, longitude, wind_speed, pressure] = values;
        Self::new(latitude, longitude, wind_speed, pressure)
    }

    pub fn columns(&self) -> [f32; StormField::COUNT] {
        [self.latitude, self.longitude, self.wind_speed, self.pressure]
    }
}

/// Columns of a storm record, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StormField {
    Latitude,
    Longitude,
    WindSpeed,
    Pressure,
}

impl StormField {
    pub const COUNT: usize = 4;

    pub const ALL: [StormField; Self::COUNT] = [
        StormField::Latitude,
        StormField::Longitude,
        StormField::WindSpeed,
        StormField::Pressure,
    ];

    /// Column name as it appears in the data header and artifact schema
    pub fn column_name(self) -> &'static str {
        match self {
            StormField::Latitude => "Latitude",
            StormField::Longitude => "Longitude",
            StormField::WindSpeed => "WindSpeed",
            StormField::Pressure => "Pressure",
        }
    }

    pub fn index(self) -> usize {
        match self {
            StormField::Latitude => 0,
            StormField::Longitude => 1,
            StormField::WindSpeed => 2,
            StormField::Pressure => 3,
        }
    }

    /// Every other column in file order
    pub fn others(self) -> Vec<StormField> {
        Self::ALL.iter().copied().filter(|f| *f != self).collect()
    }
}

impl fmt::Display for StormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered column names and types of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSchema>,
}

impl Schema {
    /// Schema of `StormRecord`
    pub fn storm() -> Self {
        Self {
            columns: StormField::ALL
                .iter()
                .map(|f| ColumnSchema {
                    name: f.column_name().to_string(),
                    column_type: ColumnType::Float32,
                })
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::storm()
    }
}

/// Score produced by one model for one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub target: StormField,
    pub predicted_value: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_others_keeps_file_order() {
        assert_eq!(
            StormField::Latitude.others(),
            vec![StormField::Longitude, StormField::WindSpeed, StormField::Pressure]
        );
        assert_eq!(
            StormField::Longitude.others(),
            vec![StormField::Latitude, StormField::WindSpeed, StormField::Pressure]
        );
    }

    #[test]
    fn test_field_index_matches_columns() {
        let record = StormRecord::new(25.0, -80.0, 150.0, 922.0);
        for field in StormField::ALL {
            assert_eq!(record.columns()[field.index()], record.get(field));
        }
    }

    #[test]
    fn test_storm_schema() {
        let schema = Schema::storm();
        assert_eq!(
            schema.column_names(),
            vec!["Latitude", "Longitude", "WindSpeed", "Pressure"]
        );
        assert!(schema.columns.iter().all(|c| c.column_type == ColumnType::Float32));
        assert!(schema.contains("WindSpeed"));
        assert!(!schema.contains("Date"));
    }
}
