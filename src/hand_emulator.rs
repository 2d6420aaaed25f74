//! The emulator for a tendon-driven underactuated hand: owns the host
//! handles, the classified driver maps and the transmission model, and
//! exposes the narrow command interface the outer control loop drives.

extern crate nalgebra as na;
use std::collections::HashMap;

use na::DVector;
use tracing::debug;

use crate::actuation_error::ActuationError;
use crate::actuation_matrices::ActuationMatrices;
use crate::calibration::Calibration;
use crate::contact::ContactAggregator;
use crate::driver_roles::{DriverMap, ExpectedDofs};
use crate::hand_traits::{ContactQuery, JointController, RobotModel};
use crate::torque::{ControlReferences, KinematicSample, TorqueSolver};

/// Fixed description of one hand model: expected robot name, declared dof
/// counts per role, command ranges, presets and gains. Passed explicitly
/// at construction, never read from ambient state.
#[derive(Debug, Clone)]
pub struct HandProfile {
    /// The robot name this profile emulates; construction refuses any
    /// other robot.
    pub name: String,
    /// Additional accepted robot names (scratch models etc).
    pub aliases: Vec<String>,

    pub a_dofs: usize,
    pub u_dofs: usize,
    pub m_dofs: usize,
    /// The direct group had no declared count on the reference hardware;
    /// `None` skips the check.
    pub d_dofs: Option<usize>,

    pub command_minimum: Vec<f64>,
    pub command_maximum: Vec<f64>,
    pub velocity_minimum: Vec<f64>,
    pub velocity_maximum: Vec<f64>,

    /// Named command postures, e.g. `open` and `closed`.
    pub presets: Vec<(String, Vec<f64>)>,

    pub k_p: f64,
    pub k_d: f64,
    pub k_i: f64,
    pub k_p_m: f64,
    pub k_d_m: f64,
    /// Converts tendon tension into the equivalent motor-side torque unit.
    pub synergy_reduction: f64,
}

impl HandProfile {
    /// The calibrated profile of the Reflex hand: one synergy actuator
    /// driving six tendon-coupled phalanxes, normalized command in [0, 1].
    pub fn reflex() -> Self {
        HandProfile {
            name: "reflex".to_string(),
            aliases: vec!["temp".to_string()],
            a_dofs: 1,
            u_dofs: 6,
            m_dofs: 0,
            d_dofs: None,
            command_minimum: vec![0.0],
            command_maximum: vec![1.0],
            velocity_minimum: vec![-1.0],
            velocity_maximum: vec![1.0],
            presets: vec![
                ("open".to_string(), vec![1.0]),
                ("closed".to_string(), vec![0.0]),
            ],
            k_p: 3.0,
            k_d: 0.03,
            k_i: 0.01,
            k_p_m: 3.0,
            k_d_m: 0.03,
            synergy_reduction: 7.0,
        }
    }

    /// Looks up a named command posture.
    pub fn preset(&self, name: &str) -> Option<&[f64]> {
        self.presets
            .iter()
            .find(|(preset, _)| preset == name)
            .map(|(_, command)| command.as_slice())
    }

    fn accepts_robot(&self, robot_name: &str) -> bool {
        self.name == robot_name || self.aliases.iter().any(|alias| alias == robot_name)
    }
}

/// Emulates the actuation of an underactuated hand on top of a host
/// simulator that has no individual motors for it.
///
/// Single-threaded and synchronous: the host calls [`Self::process`] once
/// per control tick and [`Self::substep`] once per physics sub-step, and
/// applies the torques this model hands back.
pub struct HandEmulator<H> {
    host: H,
    profile: HandProfile,
    map: DriverMap,
    matrices: ActuationMatrices,
    aggregator: ContactAggregator,
    solver: TorqueSolver,
    refs: ControlReferences,
}

impl<H: RobotModel + ContactQuery + JointController> HandEmulator<H> {
    /// Classifies the drivers, builds the transmission model from the
    /// calibration table, and neutralizes the host PID gains on every
    /// driver this model actuates, so that the emulated torques are the
    /// only actuation those joints see.
    ///
    /// `link_offset` and `driver_offset` locate the hand within a larger
    /// multi-body model. Any construction failure leaves no usable
    /// instance behind.
    pub fn new(
        mut host: H,
        profile: HandProfile,
        calibration: &Calibration,
        link_offset: usize,
        driver_offset: usize,
    ) -> Result<Self, ActuationError> {
        let robot_name = host.robot_name();
        if !profile.accepts_robot(&robot_name) {
            return Err(ActuationError::Configuration(format!(
                "loaded robot is not a {} hand, rather {}",
                profile.name, robot_name
            )));
        }

        let expected = ExpectedDofs {
            a_dofs: profile.a_dofs,
            u_dofs: profile.u_dofs,
            m_dofs: profile.m_dofs,
            d_dofs: profile.d_dofs,
        };
        let map = DriverMap::classify(&host, driver_offset, &expected)?;

        // The offsets locate the hand within a larger multi-body model;
        // a hand driver resolving to a link in front of the base means
        // they disagree with the robot description.
        for n in driver_offset..map.num_drivers {
            if map.q_to_t[n] < link_offset {
                return Err(ActuationError::Configuration(format!(
                    "driver {} resolves to link index {}, before the hand base at {}",
                    n, map.q_to_t[n], link_offset
                )));
            }
        }

        let matrices = ActuationMatrices::build(&map, calibration)?;
        let aggregator = ContactAggregator::new(&map);
        let solver = TorqueSolver::new(profile.synergy_reduction);
        let refs = ControlReferences::new(
            profile.a_dofs,
            profile.k_p,
            profile.k_d,
            profile.k_i,
            profile.k_p_m,
            profile.k_d_m,
        );

        // The host must not fight the emulated torques on the drivers we
        // manage; direct drivers keep their gains.
        let (mut kp, mut ki, mut kd) = host.pid_gains();
        for n in map
            .a_to_n
            .iter()
            .chain(map.u_to_n.iter())
            .chain(map.m_to_n.iter())
        {
            kp[*n] = 0.0;
            ki[*n] = 0.0;
            kd[*n] = 0.0;
        }
        host.set_pid_gains(kp, ki, kd);

        debug!(
            robot = %robot_name,
            drivers = map.num_drivers,
            synergy = ?map.a_to_n,
            underactuated = ?map.u_to_n,
            mimic = ?map.m_to_n,
            direct = ?map.d_to_n,
            "hand emulator loaded"
        );

        Ok(HandEmulator {
            host,
            profile,
            map,
            matrices,
            aggregator,
            solver,
            refs,
        })
    }

    /// Clamps the command element-wise into the profile's range and stores
    /// it as the synergy reference. Pure state update.
    pub fn set_command(&mut self, command: &[f64]) {
        for i in 0..self.refs.q_a_ref.len().min(command.len()) {
            self.refs.q_a_ref[i] =
                command[i].clamp(self.profile.command_minimum[i], self.profile.command_maximum[i]);
        }
    }

    /// The current synergy reference.
    pub fn get_command(&self) -> Vec<f64> {
        self.refs.q_a_ref.iter().copied().collect()
    }

    pub fn profile(&self) -> &HandProfile {
        &self.profile
    }

    /// The control state, for callers that drive the integrator or retune
    /// gains between steps.
    pub fn references_mut(&mut self) -> &mut ControlReferences {
        &mut self.refs
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Consumes the reference update from the command dictionary, then
    /// runs one torque step and forwards the result to the host.
    ///
    /// `position` (or its alias `qcmd`) updates the synergy reference and
    /// is removed from the dictionary. `speed` and `force` are accepted
    /// but currently have no effect and are left in place. Unknown fields
    /// are ignored so newer callers with richer command schemas keep
    /// working.
    pub fn process(
        &mut self,
        commands: &mut HashMap<String, Vec<f64>>,
        dt: f64,
    ) -> Result<(), ActuationError> {
        if let Some(position) = commands.remove("position") {
            self.set_command(&position);
        }
        if let Some(qcmd) = commands.remove("qcmd") {
            self.set_command(&qcmd);
        }
        // `speed` and `force` are recognized but not implemented for this
        // hand; they stay in the dictionary untouched, like any field a
        // newer caller might send.

        self.substep(dt)
    }

    /// Runs the torque step without consuming commands, keeping the output
    /// continuous when the physics sub-steps faster than commands arrive.
    pub fn substep(&mut self, _dt: f64) -> Result<(), ActuationError> {
        let torque = self.output()?;
        let qdes = self.host.commanded_config();
        let dqdes = self.host.commanded_velocity();
        self.host.set_pid_command(&qdes, &dqdes, &torque);
        Ok(())
    }

    /// One full torque computation: sample, aggregate contacts, solve.
    fn output(&self) -> Result<DVector<f64>, ActuationError> {
        let sample = KinematicSample::from_controller(&self.host, &self.map);
        let contact = self.aggregator.aggregate(&self.host);
        let torque = self.solver.compute_torques(
            &sample,
            &self.refs,
            &self.matrices,
            &self.map,
            &contact,
        )?;
        debug!(
            contacts = contact.num_links(),
            reference = ?self.refs.q_a_ref.as_slice(),
            "torque step"
        );
        Ok(torque)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflex_profile() {
        let profile = HandProfile::reflex();
        assert_eq!(profile.a_dofs, 1);
        assert_eq!(profile.u_dofs, 6);
        assert_eq!(profile.m_dofs, 0);
        assert_eq!(profile.preset("open"), Some(&[1.0][..]));
        assert_eq!(profile.preset("closed"), Some(&[0.0][..]));
        assert_eq!(profile.preset("pinch"), None);
        assert!(profile.accepts_robot("reflex"));
        assert!(profile.accepts_robot("temp"));
        assert!(!profile.accepts_robot("gripper2000"));
    }
}
