//! Rust implementation of an actuation model for tendon-driven,
//! underactuated robotic hands.
//!
//! A low-dimensional "synergy" command plus sensed joint state and contact
//! forces are converted into per-joint actuator torques, emulating motors
//! the hand does not physically have. The model was developed against the
//! Reflex hand (one synergy actuator, six tendon-coupled phalanxes) but the
//! classification, transmission and torque law are generic over the driver
//! naming scheme and calibration table.
//!
//! # Features
//!
//! - Classification of the robot's raw driver enumeration into semantic
//!   roles (synergy, underactuated, mimic, direct) from driver names, with
//!   construction-time validation of the declared dof counts.
//! - A kinetostatic transmission model (tendon routing matrix `R`,
//!   diagonal joint elasticity `E`) populated from a per-phalanx
//!   calibration table.
//! - Per-step aggregation of contact wrenches on the underactuated links,
//!   with deterministic stacking order.
//! - A closed-form torque law combining synergy PID, tendon tension and
//!   elastic return, with explicit rejection of singular stiffness
//!   matrices.
//! - The host simulator is abstracted behind three small traits, so the
//!   model runs against any engine that can enumerate drivers, answer
//!   contact queries and accept PID commands.
//!
//! The crate never advances physics itself; it is driven synchronously by
//! the host's stepping loop through
//! [`hand_emulator::HandEmulator::process`] and
//! [`hand_emulator::HandEmulator::substep`].

pub mod actuation_error;
pub mod actuation_matrices;
pub mod calibration;
pub mod contact;
pub mod driver_roles;
pub mod hand_emulator;
pub mod hand_traits;
pub mod torque;

#[cfg(test)]
mod tests;
