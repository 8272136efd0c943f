//! Dew point from temperature and relative humidity (Magnus approximation).
//!
//! See <https://en.wikipedia.org/wiki/Dew_point>.

use crate::decode::Unit;
use thiserror::Error;

/// Saturation vapor pressure at 0 °C, in millibars.
const A: f64 = 6.1121;

/// Magnus coefficients `(b, c)` above and below freezing.
const ABOVE_FREEZING: (f64, f64) = (17.368, 238.88);
const BELOW_FREEZING: (f64, f64) = (17.966, 247.15);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DewPointError {
    /// `ln` of the actual vapor pressure is undefined, e.g. at 0 % humidity.
    #[error("dew point undefined: actual vapor pressure {0} mbar is not positive")]
    NonPositiveVaporPressure(f64),
    #[error("dew point undefined: result is not a finite number")]
    NotFinite,
}

/// Compute the dew point, rounded to one decimal, in the unit of `temperature`.
///
/// The coefficient branch is chosen on the sign of `temperature` as reported,
/// while the formula itself is evaluated in Celsius.
///
/// # Example
/// ```
/// use switchbot_listener::{Unit, dew_point};
///
/// assert_eq!(dew_point(20.0, 50, Unit::Celsius), Ok(9.3));
/// assert!(dew_point(20.0, 0, Unit::Celsius).is_err());
/// ```
pub fn dew_point(temperature: f64, humidity: u8, unit: Unit) -> Result<f64, DewPointError> {
    let (b, c) = if temperature >= 0.0 {
        ABOVE_FREEZING
    } else {
        BELOW_FREEZING
    };
    let t = unit.to_celsius(temperature);

    let saturation = A * (b * t / (c + t)).exp();
    let actual = f64::from(humidity) / 100.0 * saturation;
    if actual <= 0.0 || actual.is_nan() {
        return Err(DewPointError::NonPositiveVaporPressure(actual));
    }

    let gamma = (actual / A).ln();
    let celsius = c * gamma / (b - gamma);
    if !celsius.is_finite() {
        return Err(DewPointError::NotFinite);
    }

    Ok(round_tenths(unit.convert_celsius(celsius)))
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
