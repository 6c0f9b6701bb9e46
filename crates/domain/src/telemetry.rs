//! Telemetry value objects — the raw readings a device submits.

use serde::{Deserialize, Serialize};

use crate::error::{AcequiaError, ValidationError};

/// One submission's worth of distance readings from a device's three
/// ultrasonic sensors.
///
/// The three samples always travel together: a submission replaces all of
/// them at once, so no record can ever mix readings from two different
/// submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UltrasonicReadings {
    pub ultrasonic1: f64,
    pub ultrasonic2: f64,
    pub ultrasonic3: f64,
}

impl UltrasonicReadings {
    /// Bundle three sensor samples.
    #[must_use]
    pub const fn new(ultrasonic1: f64, ultrasonic2: f64, ultrasonic3: f64) -> Self {
        Self {
            ultrasonic1,
            ultrasonic2,
            ultrasonic3,
        }
    }

    /// Check that every reading is a finite number.
    ///
    /// # Errors
    ///
    /// Returns [`AcequiaError::Validation`] when any reading is NaN or
    /// infinite.
    pub fn validate(&self) -> Result<(), AcequiaError> {
        for value in [self.ultrasonic1, self.ultrasonic2, self.ultrasonic3] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteReading(value).into());
            }
        }
        Ok(())
    }
}
