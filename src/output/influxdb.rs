//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::reading::SensorReading;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<&'static str, String>,
    pub field_set: BTreeMap<&'static str, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

/// Escape commas, equals signs and spaces in tag values.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        for (key, value) in &self.tag_set {
            write!(fmt, ",{}={}", key, escape_tag(value))?;
        }

        let mut separator = " ";
        for (key, value) in &self.field_set {
            write!(fmt, "{separator}{key}={value}")?;
            separator = ",";
        }

        if let Some(nanos) = self
            .timestamp
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
        {
            write!(fmt, " {nanos}")?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Address, display name, unit and variant become tags; the measured values
/// become fields. An undefined dew point is omitted.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(reading: &SensorReading, name: &str) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("mac", reading.address.to_string()),
            ("name", name.to_string()),
            ("unit", reading.unit.to_string()),
            ("variant", reading.variant.to_string()),
        ])
    }

    fn field_set(reading: &SensorReading) -> BTreeMap<&'static str, FieldValue> {
        let mut fields = BTreeMap::from([
            ("temperature", FieldValue::Float(reading.temperature)),
            ("humidity", FieldValue::Integer(reading.humidity.into())),
            ("battery", FieldValue::Integer(reading.battery.into())),
            ("rssi", FieldValue::Integer(reading.rssi.into())),
        ]);
        if let Some(dew_point) = reading.dew_point {
            fields.insert("dew_point", FieldValue::Float(dew_point));
        }
        fields
    }

    fn to_data_point(&self, reading: &SensorReading, name: &str) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: Self::tag_set(reading, name),
            field_set: Self::field_set(reading),
            timestamp: Some(reading.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &SensorReading, name: &str) -> String {
        self.to_data_point(reading, name).to_string()
    }
}
