// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value formatting for sensor states.

use std::fmt;

use serde::{Deserialize, Serialize};

const JOULES_PER_KWH: f64 = 3_600_000.0;

/// A formatted sensor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Whole number.
    Int(i64),
    /// Fixed-precision decimal rendered as text.
    Text(String),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// How a raw numeric reading is turned into a sensor state.
///
/// # Examples
///
/// ```
/// use powersensor_router::sensor::{Formatter, SensorValue};
///
/// assert_eq!(Formatter::Int.apply(-42.9), SensorValue::Int(-42));
/// assert_eq!(Formatter::NonNegativeInt.apply(-3.0), SensorValue::Int(0));
/// assert_eq!(Formatter::ThreeDecimals.apply(3.14159), SensorValue::Text("3.142".into()));
/// assert_eq!(Formatter::JoulesToKwh.apply(7_200_000.0), SensorValue::Text("2.000".into()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatter {
    /// Truncates toward zero.
    Int,
    /// Three decimal places.
    ThreeDecimals,
    /// Negative readings become zero, then truncates.
    NonNegativeInt,
    /// Joules to kilowatt-hours, three decimal places.
    JoulesToKwh,
}

impl Formatter {
    /// Formats a reading.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn apply(self, value: f64) -> SensorValue {
        match self {
            Self::Int => SensorValue::Int(value.trunc() as i64),
            Self::NonNegativeInt => SensorValue::Int(value.max(0.0).trunc() as i64),
            Self::ThreeDecimals => SensorValue::Text(format!("{value:.3}")),
            Self::JoulesToKwh => SensorValue::Text(format!("{:.3}", value / JOULES_PER_KWH)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_truncates_toward_zero() {
        assert_eq!(Formatter::Int.apply(99.99), SensorValue::Int(99));
        assert_eq!(Formatter::Int.apply(-0.5), SensorValue::Int(0));
    }

    #[test]
    fn non_negative_clamps_exports() {
        assert_eq!(Formatter::NonNegativeInt.apply(-250.0), SensorValue::Int(0));
        assert_eq!(Formatter::NonNegativeInt.apply(60.7), SensorValue::Int(60));
    }

    #[test]
    fn kwh_conversion() {
        assert_eq!(
            Formatter::JoulesToKwh.apply(1_800_000.0),
            SensorValue::Text("0.500".to_string())
        );
    }

    #[test]
    fn value_display_and_json() {
        assert_eq!(SensorValue::Int(7).to_string(), "7");
        assert_eq!(SensorValue::Text("3.300".into()).to_string(), "3.300");
        assert_eq!(serde_json::to_string(&SensorValue::Int(7)).unwrap(), "7");
    }
}
