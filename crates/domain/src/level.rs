//! Water level — the discrete reservoir vocabulary consumers classify into.

use serde::{Deserialize, Serialize};

/// Discrete reservoir level derived from the raw distance readings.
///
/// The mapping from ultrasonic distances to a level depends on tank
/// geometry and lives with the consumer; this core stores raw readings
/// as-is and only fixes the vocabulary classifiers must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WaterLevel {
    Ok,
    Low,
    Full,
}

impl WaterLevel {
    /// The wire name of this level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Low => "LOW",
            Self::Full => "FULL",
        }
    }
}

impl std::fmt::Display for WaterLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
