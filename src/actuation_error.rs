//! Error handling for the hand actuation model

use std::io;

/// Unified error to report failures during classification, calibration
/// loading and per-step torque computation.
#[derive(Debug)]
pub enum ActuationError {
    IoError(io::Error),
    ParseError(String),
    /// A driver name matched neither of the two accepted naming formats.
    /// Carries the offending name. Fatal at construction.
    UnrecognizedDriver(String),
    /// A role count mismatch after classification, or a missing calibration
    /// entry. Fatal at construction.
    Configuration(String),
    /// Singular or ill-conditioned stiffness inversion at runtime. Aborts
    /// the torque computation for the step; the caller decides what torque
    /// to hold instead.
    Numerical(String),
}

impl std::fmt::Display for ActuationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            ActuationError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            ActuationError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
            ActuationError::UnrecognizedDriver(ref name) =>
                write!(f, "Unrecognized driver name: {}", name),
            ActuationError::Configuration(ref msg) =>
                write!(f, "Configuration Error: {}", msg),
            ActuationError::Numerical(ref msg) =>
                write!(f, "Numerical Error: {}", msg),
        }
    }
}

impl std::error::Error for ActuationError {}

impl From<io::Error> for ActuationError {
    fn from(err: io::Error) -> Self {
        ActuationError::IoError(err)
    }
}
