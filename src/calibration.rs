//! The per-phalanx calibration table: tendon moment arms and elastic
//! coefficients, keyed by (finger, phalanx).

use std::collections::HashMap;

use crate::actuation_error::ActuationError;

/// Calibration of one tendon-coupled joint: the tendon moment arm per
/// synergy actuator (`r`, one routing coefficient per actuator feeding the
/// joint) and the elastic return coefficient (`e`).
#[derive(Debug, Clone)]
pub struct PhalanxCalibration {
    pub r: Vec<f64>,
    pub e: f64,
}

#[cfg(feature = "allow_filesystem")]
#[derive(serde::Deserialize)]
struct CalibrationEntry {
    finger: String,
    phalanx: String,
    r: Vec<f64>,
    e: f64,
}

#[cfg(feature = "allow_filesystem")]
#[derive(serde::Deserialize)]
struct Root {
    #[serde(rename = "hand_calibration")]
    entries: Vec<CalibrationEntry>,
}

/// Table of [`PhalanxCalibration`] entries keyed by (finger, phalanx).
/// Consumed once at construction of the actuation matrices; every
/// underactuated joint must resolve to exactly one entry.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    entries: HashMap<(String, String), PhalanxCalibration>,
}

impl Calibration {
    pub fn new() -> Self {
        Calibration {
            entries: HashMap::new(),
        }
    }

    /// Adds or replaces the entry for the given finger and phalanx.
    pub fn insert(&mut self, finger: &str, phalanx: &str, r: Vec<f64>, e: f64) {
        self.entries
            .insert((finger.to_string(), phalanx.to_string()), PhalanxCalibration { r, e });
    }

    pub fn get(&self, finger: &str, phalanx: &str) -> Option<&PhalanxCalibration> {
        self.entries
            .get(&(finger.to_string(), phalanx.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks every entry against the declared synergy actuator count:
    /// routing vectors must have one coefficient per actuator, all values
    /// must be finite, and elastic coefficients must be positive.
    pub fn validate(&self, a_dofs: usize) -> Result<(), ActuationError> {
        for ((finger, phalanx), cal) in &self.entries {
            if cal.r.len() != a_dofs {
                return Err(ActuationError::Configuration(format!(
                    "calibration ({}, {}): routing vector has {} coefficients, expected {}",
                    finger,
                    phalanx,
                    cal.r.len(),
                    a_dofs
                )));
            }
            if cal.r.iter().any(|v| !v.is_finite()) {
                return Err(ActuationError::Configuration(format!(
                    "calibration ({}, {}): routing coefficients must be finite",
                    finger, phalanx
                )));
            }
            if !cal.e.is_finite() || cal.e <= 0.0 {
                return Err(ActuationError::Configuration(format!(
                    "calibration ({}, {}): elastic coefficient must be positive (got {})",
                    finger, phalanx, cal.e
                )));
            }
        }
        Ok(())
    }

    /// Parses a calibration table from YAML text like this:
    /// ```yaml
    /// hand_calibration:
    ///   - finger: one
    ///     phalanx: prox
    ///     r: [0.02]
    ///     e: 1.5
    ///   - finger: one
    ///     phalanx: dist
    ///     r: [0.015]
    ///     e: 1.2
    /// ```
    /// Duplicate (finger, phalanx) pairs are rejected rather than silently
    /// overwritten.
    #[cfg(feature = "allow_filesystem")]
    pub fn from_yaml(contents: &str) -> Result<Self, ActuationError> {
        let root: Root = serde_saphyr::from_str(contents)
            .map_err(|e| ActuationError::ParseError(format!("{}", e)))?;

        let mut table = Calibration::new();
        for entry in root.entries {
            let key = (entry.finger.clone(), entry.phalanx.clone());
            if table.entries.contains_key(&key) {
                return Err(ActuationError::ParseError(format!(
                    "duplicate calibration entry for ({}, {})",
                    entry.finger, entry.phalanx
                )));
            }
            table.entries.insert(
                key,
                PhalanxCalibration {
                    r: entry.r,
                    e: entry.e,
                },
            );
        }
        Ok(table)
    }

    /// Reads the calibration table from a YAML file, see [`Self::from_yaml`].
    #[cfg(feature = "allow_filesystem")]
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ActuationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_routing_length() {
        let mut table = Calibration::new();
        table.insert("one", "prox", vec![0.02, 0.01], 1.5);
        assert!(table.validate(2).is_ok());
        let err = table.validate(1).unwrap_err();
        assert!(format!("{}", err).contains("expected 1"));
    }

    #[test]
    fn test_validate_elasticity() {
        let mut table = Calibration::new();
        table.insert("one", "prox", vec![0.02], 0.0);
        assert!(table.validate(1).is_err());
    }

    #[cfg(feature = "allow_filesystem")]
    #[test]
    fn test_from_yaml() {
        let table = Calibration::from_yaml(
            "hand_calibration:\n\
             \x20 - finger: one\n\
             \x20   phalanx: prox\n\
             \x20   r: [0.02]\n\
             \x20   e: 1.5\n\
             \x20 - finger: one\n\
             \x20   phalanx: dist\n\
             \x20   r: [0.015]\n\
             \x20   e: 1.2\n",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        let prox = table.get("one", "prox").unwrap();
        assert_eq!(prox.r, vec![0.02]);
        assert_eq!(prox.e, 1.5);
        assert!(table.get("two", "prox").is_none());
        assert!(table.validate(1).is_ok());
    }

    #[cfg(feature = "allow_filesystem")]
    #[test]
    fn test_duplicate_entry_rejected() {
        let result = Calibration::from_yaml(
            "hand_calibration:\n\
             \x20 - finger: one\n\
             \x20   phalanx: prox\n\
             \x20   r: [0.02]\n\
             \x20   e: 1.5\n\
             \x20 - finger: one\n\
             \x20   phalanx: prox\n\
             \x20   r: [0.03]\n\
             \x20   e: 1.0\n",
        );
        assert!(result.is_err());
    }
}
