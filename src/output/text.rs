//! Human-readable console output.

use crate::output::OutputFormatter;
use crate::reading::SensorReading;

/// One line per meter, e.g.
/// `Office: 37.3 °C, 50 %, dew point 25.1 °C, battery 64 %, rssi -62 dBm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFormatter;

impl OutputFormatter for TextFormatter {
    fn format(&self, reading: &SensorReading, name: &str) -> String {
        let unit = reading.unit.symbol();
        let dew_point = match reading.dew_point {
            Some(value) => format!("{value:.1} {unit}"),
            None => "-".to_string(),
        };
        format!(
            "{name}: {:.1} {unit}, {} %, dew point {dew_point}, battery {} %, rssi {} dBm",
            reading.temperature, reading.humidity, reading.battery, reading.rssi
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Unit;
    use crate::frame::DeviceVariant;
    use crate::test_utils::TEST_ADDRESS;
    use std::time::SystemTime;

    fn reading(unit: Unit, temperature: f64, dew_point: Option<f64>) -> SensorReading {
        SensorReading {
            address: TEST_ADDRESS,
            variant: DeviceVariant::Classic,
            temperature,
            humidity: 50,
            unit,
            dew_point,
            battery: 64,
            rssi: -62,
            timestamp: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_celsius_line() {
        let line = TextFormatter.format(&reading(Unit::Celsius, 37.3, Some(25.1)), "Office");
        assert_eq!(
            line,
            "Office: 37.3 °C, 50 %, dew point 25.1 °C, battery 64 %, rssi -62 dBm"
        );
    }

    #[test]
    fn test_fahrenheit_and_missing_dew_point() {
        let line = TextFormatter.format(&reading(Unit::Fahrenheit, 99.14, None), "Bath");
        assert_eq!(
            line,
            "Bath: 99.1 °F, 50 %, dew point -, battery 64 %, rssi -62 dBm"
        );
    }
}
