//! Classification of the robot's raw driver enumeration into semantic
//! roles, and the index bookkeeping built on top of it.
//!
//! Driver names come in two accepted formats: a plain
//! `role_finger_phalanx_id` form and a prefixed
//! `prefix:role_finger_phalanx_id` form (the prefix is produced by some
//! robot-description composers and carries no information for us). The
//! leading token decides the role: `proximal` and `distal` joints are
//! tendon-coupled (underactuated), `wire` is the synergy actuator,
//! `swivel` is a directly driven joint outside this model, `mimic` joints
//! track their underactuated partner.

use std::collections::HashMap;

use crate::actuation_error::ActuationError;
use crate::hand_traits::{DriverIndex, LinkId, RobotModel};

/// Semantic role of a driver, decided from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverRole {
    /// Synergy actuator (`wire`): the tendon spool the command drives.
    Synergy,
    /// Tendon-coupled joint with no motor of its own (`proximal`, `distal`).
    Underactuated,
    /// Joint slaved to an underactuated partner (`mimic`).
    Mimic,
    /// Directly driven joint this model leaves alone (`swivel`).
    Direct,
}

/// Outcome of parsing one driver name. The finger and phalanx tokens are
/// present whenever the name carries them; they key the calibration table
/// for underactuated and mimic joints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDriverName {
    pub role: DriverRole,
    pub finger: Option<String>,
    pub phalanx: Option<String>,
}

/// Total, pure parser for the two accepted driver name formats.
///
/// Splits off an optional `prefix:` first, then reads underscore-separated
/// tokens. Any unknown leading token is a classification failure carrying
/// the full offending name.
pub fn parse_driver_name(name: &str) -> Result<ParsedDriverName, ActuationError> {
    let bare = match name.split_once(':') {
        Some((_prefix, rest)) => rest,
        None => name,
    };
    let mut tokens = bare.split('_');
    let role = match tokens.next() {
        Some("proximal") | Some("distal") => DriverRole::Underactuated,
        Some("wire") => DriverRole::Synergy,
        Some("mimic") => DriverRole::Mimic,
        Some("swivel") => DriverRole::Direct,
        _ => return Err(ActuationError::UnrecognizedDriver(name.to_string())),
    };
    let finger = tokens.next().map(str::to_string);
    let phalanx = tokens.next().map(str::to_string);
    Ok(ParsedDriverName { role, finger, phalanx })
}

/// Expected cardinality of each role group, declared by the hand profile.
/// The direct group had no declared count on the reference hardware, so
/// its check is optional.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedDofs {
    pub a_dofs: usize,
    pub u_dofs: usize,
    pub m_dofs: usize,
    pub d_dofs: Option<usize>,
}

/// Bidirectional index maps between driver space and the four role-local
/// spaces, plus the link bookkeeping the contact aggregator needs.
///
/// Immutable once built; the four forward sequences partition the
/// classified subset of `[driver_offset, num_drivers)` by construction.
#[derive(Debug, Clone)]
pub struct DriverMap {
    pub driver_offset: usize,
    pub num_drivers: usize,

    /// Synergy-local index to driver index.
    pub a_to_n: Vec<DriverIndex>,
    /// Underactuated-local index to driver index.
    pub u_to_n: Vec<DriverIndex>,
    /// Mimic-local index to driver index.
    pub m_to_n: Vec<DriverIndex>,
    /// Direct-local index to driver index.
    pub d_to_n: Vec<DriverIndex>,

    /// Driver index to synergy-local index, `None` when unmapped.
    pub n_to_a: Vec<Option<usize>>,
    pub n_to_u: Vec<Option<usize>>,
    pub n_to_m: Vec<Option<usize>>,
    pub n_to_d: Vec<Option<usize>>,

    /// Underactuated-local index to the global id of the link the joint
    /// actuates.
    pub u_to_l: Vec<LinkId>,
    /// Global link id to local link index.
    pub l_to_i: HashMap<LinkId, usize>,
    /// Driver index to position in the controller-native configuration
    /// vectors (identity below `driver_offset`).
    pub q_to_t: Vec<usize>,

    /// Mimic-local index to the underactuated-local index of the joint it
    /// tracks (same finger and phalanx).
    pub m_to_u: Vec<usize>,
    /// (finger, phalanx) calibration key per underactuated joint, in
    /// underactuated-local order.
    pub u_keys: Vec<(String, String)>,
}

impl DriverMap {
    /// Parses every driver name in `[driver_offset, numDrivers)` once and
    /// partitions the drivers into the four role groups, then verifies the
    /// group sizes against the declared dof counts.
    pub fn classify(
        robot: &impl RobotModel,
        driver_offset: usize,
        expected: &ExpectedDofs,
    ) -> Result<Self, ActuationError> {
        let num_drivers = robot.num_drivers();
        let mut map = DriverMap {
            driver_offset,
            num_drivers,
            a_to_n: Vec::new(),
            u_to_n: Vec::new(),
            m_to_n: Vec::new(),
            d_to_n: Vec::new(),
            n_to_a: vec![None; num_drivers],
            n_to_u: vec![None; num_drivers],
            n_to_m: vec![None; num_drivers],
            n_to_d: vec![None; num_drivers],
            u_to_l: Vec::new(),
            l_to_i: HashMap::new(),
            q_to_t: (0..num_drivers).collect(),
            m_to_u: Vec::new(),
            u_keys: Vec::new(),
        };

        // (finger, phalanx) keys of mimic drivers, resolved to m_to_u below
        // once all underactuated joints are known.
        let mut mimic_keys: Vec<(DriverIndex, String, String)> = Vec::new();

        for n in driver_offset..num_drivers {
            let name = robot.driver_name(n);
            let parsed = parse_driver_name(&name)?;
            let (link_id, link_index) = robot.driver_link(n);
            map.q_to_t[n] = link_index;
            map.l_to_i.insert(link_id, link_index);

            match parsed.role {
                DriverRole::Underactuated => {
                    let key = calibration_key(n, &name, &parsed)?;
                    map.n_to_u[n] = Some(map.u_to_n.len());
                    map.u_to_n.push(n);
                    map.u_to_l.push(link_id);
                    map.u_keys.push(key);
                }
                DriverRole::Synergy => {
                    map.n_to_a[n] = Some(map.a_to_n.len());
                    map.a_to_n.push(n);
                }
                DriverRole::Mimic => {
                    let (finger, phalanx) = calibration_key(n, &name, &parsed)?;
                    map.n_to_m[n] = Some(map.m_to_n.len());
                    map.m_to_n.push(n);
                    mimic_keys.push((n, finger, phalanx));
                }
                DriverRole::Direct => {
                    map.n_to_d[n] = Some(map.d_to_n.len());
                    map.d_to_n.push(n);
                }
            }
        }

        // Every mimic joint tracks the underactuated joint with the same
        // finger and phalanx tokens.
        for (n, finger, phalanx) in mimic_keys {
            let u_id = map
                .u_keys
                .iter()
                .position(|(f, p)| *f == finger && *p == phalanx)
                .ok_or_else(|| {
                    ActuationError::Configuration(format!(
                        "mimic driver {} ({}, {}) has no underactuated partner",
                        n, finger, phalanx
                    ))
                })?;
            map.m_to_u.push(u_id);
        }

        check_count("synergy", expected.a_dofs, map.a_to_n.len())?;
        check_count("underactuated", expected.u_dofs, map.u_to_n.len())?;
        check_count("mimic", expected.m_dofs, map.m_to_n.len())?;
        if let Some(d_dofs) = expected.d_dofs {
            check_count("direct", d_dofs, map.d_to_n.len())?;
        }

        Ok(map)
    }

    /// Number of underactuated joints.
    pub fn u_dofs(&self) -> usize {
        self.u_to_n.len()
    }

    /// Number of synergy actuators.
    pub fn a_dofs(&self) -> usize {
        self.a_to_n.len()
    }
}

fn calibration_key(
    driver: DriverIndex,
    name: &str,
    parsed: &ParsedDriverName,
) -> Result<(String, String), ActuationError> {
    match (&parsed.finger, &parsed.phalanx) {
        (Some(finger), Some(phalanx)) => Ok((finger.clone(), phalanx.clone())),
        _ => Err(ActuationError::Configuration(format!(
            "driver {} '{}' lacks finger/phalanx tokens needed for calibration lookup",
            driver, name
        ))),
    }
}

fn check_count(role: &str, expected: usize, actual: usize) -> Result<(), ActuationError> {
    if expected != actual {
        return Err(ActuationError::Configuration(format!(
            "{} role: expected {} drivers, classified {}",
            role, expected, actual
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format() {
        let parsed = parse_driver_name("proximal_index_prox_0").unwrap();
        assert_eq!(parsed.role, DriverRole::Underactuated);
        assert_eq!(parsed.finger.as_deref(), Some("index"));
        assert_eq!(parsed.phalanx.as_deref(), Some("prox"));
    }

    #[test]
    fn test_prefixed_format() {
        let parsed = parse_driver_name("left:distal_thumb_dist_2").unwrap();
        assert_eq!(parsed.role, DriverRole::Underactuated);
        assert_eq!(parsed.finger.as_deref(), Some("thumb"));
        assert_eq!(parsed.phalanx.as_deref(), Some("dist"));
    }

    #[test]
    fn test_synergy_and_direct() {
        assert_eq!(
            parse_driver_name("wire_0").unwrap().role,
            DriverRole::Synergy
        );
        assert_eq!(
            parse_driver_name("swivel_base_root_0").unwrap().role,
            DriverRole::Direct
        );
        assert_eq!(
            parse_driver_name("mimic_index_prox_1").unwrap().role,
            DriverRole::Mimic
        );
    }

    #[test]
    fn test_unrecognized_prefix() {
        let err = parse_driver_name("elbow_upper_0").unwrap_err();
        match err {
            ActuationError::UnrecognizedDriver(name) => {
                assert_eq!(name, "elbow_upper_0");
            }
            other => panic!("expected UnrecognizedDriver, got {}", other),
        }
    }
}
