//! Defines the traits the host simulator must implement for the hand
//! actuation model to run, and the small domain types shared between
//! modules.
//!
//! The model itself never advances rigid-body dynamics and never mutates
//! the simulator; it reads driver names, sensed state and contact events,
//! and hands back a feed-forward torque vector through
//! [`JointController::set_pid_command`].

extern crate nalgebra as na;
use na::{DMatrix, DVector, Vector3};

/// Global identifier of a link, unique across the whole simulated world
/// (robot links and rigid objects share this id space).
pub type LinkId = usize;

/// Index of a driver (addressable actuation degree of freedom) within the
/// robot model, before role classification.
pub type DriverIndex = usize;

/// One contact event between a hand link and a world object, expressed at
/// the link origin.
#[derive(Debug, Clone, Copy)]
pub struct ContactEvent {
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
}

/// Read-only view of the robot description: driver enumeration, the links
/// the drivers control, and spatial Jacobians.
pub trait RobotModel {
    /// Name of the loaded robot, checked against the expected hand name
    /// at construction.
    fn robot_name(&self) -> String;

    /// Total number of drivers in the robot model (the hand may occupy
    /// only a tail range of them, see `driver_offset`).
    fn num_drivers(&self) -> usize;

    /// Name of the given driver, in one of the two accepted formats
    /// (`role_finger_phalanx_id` or `prefix:role_finger_phalanx_id`).
    fn driver_name(&self, driver: DriverIndex) -> String;

    /// The link controlled by the driver: (global link id, local link
    /// index into the configuration vector).
    fn driver_link(&self, driver: DriverIndex) -> (LinkId, usize);

    /// 6 × numDrivers spatial Jacobian of the link, rows ordered force
    /// part first (3 linear, 3 angular), evaluated at the given point in
    /// the link frame.
    fn link_jacobian(&self, link_index: usize, local_point: &[f64; 3]) -> DMatrix<f64>;
}

/// Read-only access to the simulator's contact database for one step.
pub trait ContactQuery {
    /// Upper bound (exclusive) of the world-object id space; every id in
    /// `0..num_world_ids()` may be queried.
    fn num_world_ids(&self) -> usize;

    /// All contact events between the link and the world object in the
    /// current step. Empty when they do not touch.
    fn contacts(&self, link: LinkId, object: usize) -> Vec<ContactEvent>;
}

/// The host controller: sensed and commanded state, plus the PID command
/// sink the computed torques are forwarded to.
pub trait JointController {
    /// Sensed configuration in the host's native (link) ordering.
    fn sensed_config(&self) -> DVector<f64>;
    /// Sensed velocity in the host's native (link) ordering.
    fn sensed_velocity(&self) -> DVector<f64>;
    /// Currently commanded configuration (passed through to the PID sink).
    fn commanded_config(&self) -> DVector<f64>;
    /// Currently commanded velocity (passed through to the PID sink).
    fn commanded_velocity(&self) -> DVector<f64>;

    /// Per-driver PID gains as (kP, kI, kD).
    fn pid_gains(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>);
    /// Replaces the per-driver PID gains.
    fn set_pid_gains(&mut self, kp: Vec<f64>, ki: Vec<f64>, kd: Vec<f64>);

    /// Sends (desired position, desired velocity, feed-forward torque) to
    /// the host for this control tick.
    fn set_pid_command(&mut self, qdes: &DVector<f64>, dqdes: &DVector<f64>, torque: &DVector<f64>);
}
