pub mod cli;
pub mod gpu;
pub mod protocol;
pub mod rapl;
pub mod sensor;

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Failed to read energy counter {path}: {source}")]
    EnergyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid energy counter value {0:?}")]
    InvalidEnergy(String),
    #[error("Failed to run sensors command {command:?}: {source}")]
    Command {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Sensors command timed out after {0:?}")]
    Timeout(Duration),
    #[error("No line containing {0:?} in sensors output")]
    MarkerNotFound(String),
    #[error("Invalid power value {0:?}")]
    InvalidPower(String),
    #[error("IO error on the protocol stream: {0}")]
    IO(#[from] io::Error),
}

/// A single power measurement as reported to the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Reading {
    /// No measurement could be taken. Reported as `0`.
    Unavailable,
    /// Power in Watts, already rounded.
    Watts(f64),
}

impl Reading {
    /// Round `watts` half away from zero to `decimals` places.
    #[must_use]
    pub fn watts(watts: f64, decimals: i32) -> Self {
        let scale = 10f64.powi(decimals);
        Reading::Watts((watts * scale).round() / scale)
    }
}

impl<E: std::error::Error> From<Result<Reading, E>> for Reading {
    fn from(result: Result<Reading, E>) -> Self {
        match result {
            Ok(reading) => reading,
            Err(e) => {
                log::debug!("measurement unavailable: {e}");
                Reading::Unavailable
            }
        }
    }
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Reading::Unavailable => write!(f, "0"),
            // Debug keeps the ".0" on whole values: 1.0 rather than 1
            Reading::Watts(watts) => write!(f, "{watts:?}"),
        }
    }
}

/// Anything that can be asked for its current power draw.
///
/// Implementations never fail: whatever goes wrong while measuring is folded
/// into [`Reading::Unavailable`].
pub trait PowerSource {
    fn read(&mut self) -> Reading;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_zero() {
        assert_eq!(Reading::Unavailable.to_string(), "0");
    }

    #[test]
    fn test_whole_watts_keep_fraction() {
        assert_eq!(Reading::watts(1.0, 2).to_string(), "1.0");
        assert_eq!(Reading::watts(0.0, 2).to_string(), "0.0");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(Reading::watts(12.3456, 2).to_string(), "12.35");
        assert_eq!(Reading::watts(7.0 / 1000.0, 3).to_string(), "0.007");
        assert_eq!(Reading::watts(45_678.9 / 1000.0, 3).to_string(), "45.679");
    }

    #[test]
    fn test_error_folds_to_unavailable() {
        let result: Result<Reading, Error> = Err(Error::InvalidEnergy(String::from("abc")));
        assert_eq!(Reading::from(result), Reading::Unavailable);
        let result: Result<Reading, Error> = Ok(Reading::watts(3.0, 2));
        assert_eq!(Reading::from(result), Reading::Watts(3.0));
    }
}
