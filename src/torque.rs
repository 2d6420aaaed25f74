//! The kinetostatic torque law: closes the loop between the synergy
//! command, the tendon transmission, the joint elasticity and the sensed
//! contact wrenches, producing one torque per driver.

extern crate nalgebra as na;
use na::{DMatrix, DVector};

use crate::actuation_error::ActuationError;
use crate::actuation_matrices::ActuationMatrices;
use crate::contact::ContactSet;
use crate::driver_roles::DriverMap;
use crate::hand_traits::JointController;

/// Relative tolerance for the stiffness-inversion residual. The stiffness
/// matrix is tiny (synergy-dofs square), so a residual above this means a
/// rank deficiency between the synergy and underactuated spaces, not
/// rounding noise.
const STIFFNESS_RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Sensed configuration and velocity, reordered into driver ordering.
/// Rebuilt every control step and discarded after the torque computation.
#[derive(Debug, Clone)]
pub struct KinematicSample {
    pub q: DVector<f64>,
    pub dq: DVector<f64>,
}

impl KinematicSample {
    /// Reads the sensed state from the controller (native link ordering)
    /// and reorders it into driver ordering through `q_to_t`.
    pub fn from_controller(controller: &impl JointController, map: &DriverMap) -> Self {
        let q_native = controller.sensed_config();
        let dq_native = controller.sensed_velocity();
        let q = DVector::from_fn(map.num_drivers, |i, _| q_native[map.q_to_t[i]]);
        let dq = DVector::from_fn(map.num_drivers, |i, _| dq_native[map.q_to_t[i]]);
        KinematicSample { q, dq }
    }
}

/// Mutable control state: the clamped synergy reference, the PID and
/// mimic-law gains, and the integrator accumulator. Persists across steps;
/// only the command interface writes to it.
#[derive(Debug, Clone)]
pub struct ControlReferences {
    /// Synergy reference, already clamped to the command range.
    pub q_a_ref: DVector<f64>,
    pub k_p: f64,
    pub k_d: f64,
    pub k_i: f64,
    /// Integral accumulator of the synergy PID. Nothing advances it in
    /// this model; it enters the law with gain `k_i` and may be driven by
    /// the caller.
    pub integrator: DVector<f64>,
    pub k_p_m: f64,
    pub k_d_m: f64,
}

impl ControlReferences {
    pub fn new(a_dofs: usize, k_p: f64, k_d: f64, k_i: f64, k_p_m: f64, k_d_m: f64) -> Self {
        ControlReferences {
            q_a_ref: DVector::zeros(a_dofs),
            k_p,
            k_d,
            k_i,
            integrator: DVector::zeros(a_dofs),
            k_p_m,
            k_d_m,
        }
    }
}

/// Computes the full driver-ordered torque vector from the sensed sample,
/// the references, the transmission matrices and the step's contacts.
#[derive(Debug, Clone, Copy)]
pub struct TorqueSolver {
    /// Fixed scalar converting tendon tension into the equivalent
    /// motor-side torque unit.
    pub synergy_reduction: f64,
}

impl TorqueSolver {
    pub fn new(synergy_reduction: f64) -> Self {
        TorqueSolver { synergy_reduction }
    }

    /// The torque law. Produces `numDrivers` torques; direct-role drivers
    /// are left at zero since this model does not actuate them.
    ///
    /// Fails with a numerical error when the synergy-side stiffness
    /// `(R E⁻¹ Rᵀ)⁻¹` is singular or ill-conditioned; no fallback value is
    /// substituted, the caller decides how to recover.
    pub fn compute_torques(
        &self,
        sample: &KinematicSample,
        refs: &ControlReferences,
        matrices: &ActuationMatrices,
        map: &DriverMap,
        contact: &ContactSet,
    ) -> Result<DVector<f64>, ActuationError> {
        let q_a = gather(&sample.q, &map.a_to_n);
        let q_u = gather(&sample.q, &map.u_to_n);
        let q_m = gather(&sample.q, &map.m_to_n);
        let dq_a = gather(&sample.dq, &map.a_to_n);
        let dq_m = gather(&sample.dq, &map.m_to_n);

        let r = matrices.routing();
        let e = matrices.elasticity();

        // Equivalent synergy-side stiffness W = (R E^-1 R^T)^-1.
        let e_inv = e
            .clone()
            .try_inverse()
            .ok_or_else(|| ActuationError::Numerical("elasticity matrix is singular".to_string()))?;
        let core = r * &e_inv * r.transpose();
        let w = invert_stiffness(&core)?;

        // Aggregated contact torque on the underactuated joints.
        let tau_c = contact.joint_torque();

        // Tendon tension: feed-forward from the normalized synergy
        // coordinate plus the reflected contact load.
        let f_a = &w * &q_a * self.synergy_reduction + &w * (r * (&e_inv * &tau_c));

        // Synergy actuator: PID on the reference minus the tension
        // reflected back to the motor side.
        let torque_a = (&refs.q_a_ref - &q_a) * refs.k_p - &dq_a * refs.k_d
            + &refs.integrator * refs.k_i
            - &f_a / self.synergy_reduction;

        // Underactuated joints: tendon pull minus elastic return.
        let torque_u = r.transpose() * &f_a - e * &q_u;

        // Mimic joints track their underactuated partner.
        let q_u_partners = DVector::from_fn(map.m_to_u.len(), |i, _| q_u[map.m_to_u[i]]);
        let torque_m = (q_u_partners - &q_m) * refs.k_p_m - &dq_m * refs.k_d_m;

        // Scatter back into driver order; direct drivers stay at zero.
        let mut torque = DVector::zeros(map.num_drivers);
        scatter(&mut torque, &map.a_to_n, &torque_a);
        scatter(&mut torque, &map.u_to_n, &torque_u);
        scatter(&mut torque, &map.m_to_n, &torque_m);
        Ok(torque)
    }
}

/// Inverts the stiffness core, rejecting singular and ill-conditioned
/// matrices instead of letting degenerate torques through.
fn invert_stiffness(core: &DMatrix<f64>) -> Result<DMatrix<f64>, ActuationError> {
    let w = core.clone().try_inverse().ok_or_else(|| {
        ActuationError::Numerical(
            "stiffness core R*E^-1*R^T is singular; check the tendon routing matrix".to_string(),
        )
    })?;
    if w.iter().any(|v| !v.is_finite()) {
        return Err(ActuationError::Numerical(
            "stiffness inversion produced non-finite values".to_string(),
        ));
    }
    let identity = DMatrix::identity(core.nrows(), core.ncols());
    let residual = (core * &w - identity).norm();
    if residual > STIFFNESS_RESIDUAL_TOLERANCE * (1.0 + core.norm()) {
        return Err(ActuationError::Numerical(format!(
            "stiffness core is ill-conditioned (inversion residual {:.3e})",
            residual
        )));
    }
    Ok(w)
}

fn gather(v: &DVector<f64>, indices: &[usize]) -> DVector<f64> {
    DVector::from_fn(indices.len(), |i, _| v[indices[i]])
}

fn scatter(target: &mut DVector<f64>, indices: &[usize], values: &DVector<f64>) {
    for (local, n) in indices.iter().enumerate() {
        target[*n] = values[local];
    }
}
