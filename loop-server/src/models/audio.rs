//! Audio metadata validation (tempo and length)

use super::ValidationError;

const MIN_BPM: i32 = 1;
const MAX_BPM: i32 = 999;

/// Validated tempo in beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bpm(i32);

impl Bpm {
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if value < MIN_BPM as i64 || value > MAX_BPM as i64 {
            return Err(ValidationError::OutOfRange {
                field: "bpm",
                min: MIN_BPM as i64,
                max: MAX_BPM as i64,
            });
        }
        Ok(Self(value as i32))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

/// Clip length in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration(f64);

impl Duration {
    pub fn new(seconds: f64) -> Result<Self, ValidationError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(ValidationError::InvalidFormat {
                field: "duration",
                reason: "must be a non-negative number of seconds",
            });
        }
        Ok(Self(seconds))
    }

    pub fn parse(seconds: Option<f64>) -> Result<Option<Self>, ValidationError> {
        seconds.map(Self::new).transpose()
    }

    pub fn seconds(self) -> f64 {
        self.0
    }
}
