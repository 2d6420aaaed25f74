//! Builds the constant tendon-routing and joint-elasticity matrices from
//! the classified driver map and the calibration table.

extern crate nalgebra as na;
use na::{DMatrix, DVector};

use crate::actuation_error::ActuationError;
use crate::calibration::Calibration;
use crate::driver_roles::DriverMap;

/// The frozen transmission model of the hand.
///
/// `R` (synergy-dofs × underactuated-dofs) maps synergy actuator tension
/// to per-joint generalized force; `E` (underactuated-dofs square,
/// diagonal) relates joint displacement to elastic restoring torque. Both
/// are populated once from calibration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ActuationMatrices {
    r: DMatrix<f64>,
    e: DMatrix<f64>,
}

impl ActuationMatrices {
    /// Fetches `{r, e}` for every underactuated joint (keyed by the
    /// finger and phalanx decoded from its driver name) and writes the
    /// joint's column of `R` and diagonal entry of `E`. `E` starts as the
    /// identity, so a joint calibrated with `e = 1` keeps unit elasticity.
    ///
    /// A calibration lookup miss is a configuration failure naming the
    /// joint.
    pub fn build(map: &DriverMap, calibration: &Calibration) -> Result<Self, ActuationError> {
        let a_dofs = map.a_dofs();
        let u_dofs = map.u_dofs();
        calibration.validate(a_dofs)?;

        let mut r = DMatrix::zeros(a_dofs, u_dofs);
        let mut e = DMatrix::identity(u_dofs, u_dofs);

        for (u_id, (finger, phalanx)) in map.u_keys.iter().enumerate() {
            let cal = calibration.get(finger, phalanx).ok_or_else(|| {
                ActuationError::Configuration(format!(
                    "no calibration entry for underactuated joint {} ({}, {})",
                    u_id, finger, phalanx
                ))
            })?;
            r.column_mut(u_id)
                .copy_from(&DVector::from_column_slice(&cal.r));
            e[(u_id, u_id)] = cal.e;
        }

        Ok(ActuationMatrices { r, e })
    }

    /// Wraps matrices built elsewhere (tests, programmatic models). The
    /// shapes must agree: `R` is synergy-dofs × underactuated-dofs and `E`
    /// is underactuated-dofs square.
    pub fn from_parts(r: DMatrix<f64>, e: DMatrix<f64>) -> Result<Self, ActuationError> {
        if !e.is_square() || r.ncols() != e.nrows() {
            return Err(ActuationError::Configuration(format!(
                "matrix shapes disagree: R is {}x{}, E is {}x{}",
                r.nrows(),
                r.ncols(),
                e.nrows(),
                e.ncols()
            )));
        }
        Ok(ActuationMatrices { r, e })
    }

    /// The tendon routing matrix `R`.
    pub fn routing(&self) -> &DMatrix<f64> {
        &self.r
    }

    /// The diagonal elasticity matrix `E`.
    pub fn elasticity(&self) -> &DMatrix<f64> {
        &self.e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Matrix construction against a real DriverMap is exercised in the
    // scenario tests; here we only check the calibration-miss path using
    // a hand-assembled map.
    use crate::driver_roles::{DriverMap, ExpectedDofs};
    use crate::hand_traits::{DriverIndex, LinkId, RobotModel};
    use nalgebra::DMatrix as M;

    struct TwoJointHand;

    impl RobotModel for TwoJointHand {
        fn robot_name(&self) -> String {
            "two_joint".to_string()
        }
        fn num_drivers(&self) -> usize {
            3
        }
        fn driver_name(&self, driver: DriverIndex) -> String {
            ["wire_w_w_0", "proximal_one_prox_0", "distal_one_dist_0"][driver].to_string()
        }
        fn driver_link(&self, driver: DriverIndex) -> (LinkId, usize) {
            (100 + driver, driver)
        }
        fn link_jacobian(&self, _link_index: usize, _local_point: &[f64; 3]) -> M<f64> {
            M::zeros(6, 3)
        }
    }

    fn classify() -> DriverMap {
        let expected = ExpectedDofs {
            a_dofs: 1,
            u_dofs: 2,
            m_dofs: 0,
            d_dofs: None,
        };
        DriverMap::classify(&TwoJointHand, 0, &expected).unwrap()
    }

    #[test]
    fn test_build() {
        let map = classify();
        let mut calibration = Calibration::new();
        calibration.insert("one", "prox", vec![0.02], 1.5);
        calibration.insert("one", "dist", vec![0.015], 1.2);

        let matrices = ActuationMatrices::build(&map, &calibration).unwrap();
        assert_eq!(matrices.routing().shape(), (1, 2));
        assert_eq!(matrices.routing()[(0, 0)], 0.02);
        assert_eq!(matrices.routing()[(0, 1)], 0.015);
        assert_eq!(matrices.elasticity()[(0, 0)], 1.5);
        assert_eq!(matrices.elasticity()[(1, 1)], 1.2);
        assert_eq!(matrices.elasticity()[(0, 1)], 0.0);
    }

    #[test]
    fn test_missing_entry() {
        let map = classify();
        let mut calibration = Calibration::new();
        calibration.insert("one", "prox", vec![0.02], 1.5);

        let err = ActuationMatrices::build(&map, &calibration).unwrap_err();
        let message = format!("{}", err);
        assert!(message.contains("one"), "got: {}", message);
        assert!(message.contains("dist"), "got: {}", message);
    }
}
