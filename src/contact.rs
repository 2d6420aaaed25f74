//! Per-step aggregation of contact wrenches on the underactuated links,
//! and the matching Jacobian blocks in underactuated joint space.

extern crate nalgebra as na;
use na::{DMatrix, DVector, Vector3};

use crate::driver_roles::DriverMap;
use crate::hand_traits::{ContactQuery, DriverIndex, LinkId, RobotModel};

/// The stacked contact data of one step: a 6k wrench vector (force then
/// torque per contacted link) and the matching 6k × underactuated-dofs
/// Jacobian. Both have zero rows when nothing touches the hand, which is
/// the normal resting state.
#[derive(Debug, Clone)]
pub struct ContactSet {
    pub wrench: DVector<f64>,
    pub jacobian: DMatrix<f64>,
}

impl ContactSet {
    /// A set with no contacting links, for the given joint count.
    pub fn empty(u_dofs: usize) -> Self {
        ContactSet {
            wrench: DVector::zeros(0),
            jacobian: DMatrix::zeros(0, u_dofs),
        }
    }

    /// Number of links currently contributing contacts.
    pub fn num_links(&self) -> usize {
        self.wrench.len() / 6
    }

    pub fn is_empty(&self) -> bool {
        self.wrench.len() == 0
    }

    /// The aggregated contact torque on the underactuated joints,
    /// `transpose(J) · wrench`. A zero vector when the set is empty.
    pub fn joint_torque(&self) -> DVector<f64> {
        self.jacobian.transpose() * &self.wrench
    }
}

/// Queries the host contact database for the underactuated links and
/// assembles the step's [`ContactSet`].
///
/// Links are visited in ascending link-id order so the stacking order is
/// reproducible run to run, regardless of how the host stores contacts.
#[derive(Debug, Clone)]
pub struct ContactAggregator {
    /// (global link id, local link index), ascending by id.
    links: Vec<(LinkId, usize)>,
    u_to_n: Vec<DriverIndex>,
}

impl ContactAggregator {
    pub fn new(map: &DriverMap) -> Self {
        let mut links: Vec<(LinkId, usize)> = map
            .u_to_l
            .iter()
            .map(|l_id| (*l_id, map.l_to_i[l_id]))
            .collect();
        links.sort_by_key(|(l_id, _)| *l_id);
        links.dedup_by_key(|(l_id, _)| *l_id);
        ContactAggregator {
            links,
            u_to_n: map.u_to_n.clone(),
        }
    }

    /// Sums all contact forces and torques per underactuated link across
    /// every world object, and slices each contacted link's spatial
    /// Jacobian down to the underactuated driver columns. A link with no
    /// contacts produces no entry at all.
    pub fn aggregate<H: RobotModel + ContactQuery>(&self, host: &H) -> ContactSet {
        let max_id = host.num_world_ids();

        let mut frames: Vec<(usize, Vector3<f64>, Vector3<f64>)> = Vec::new();
        for (l_id, l_index) in &self.links {
            let mut force = Vector3::zeros();
            let mut torque = Vector3::zeros();
            let mut touched = false;
            for object in 0..max_id {
                for event in host.contacts(*l_id, object) {
                    force += event.force;
                    torque += event.torque;
                    touched = true;
                }
            }
            if touched {
                frames.push((*l_index, force, torque));
            }
        }

        let u_dofs = self.u_to_n.len();
        let mut wrench = DVector::zeros(6 * frames.len());
        let mut jacobian = DMatrix::zeros(6 * frames.len(), u_dofs);

        for (row, (l_index, force, torque)) in frames.iter().enumerate() {
            wrench.fixed_rows_mut::<3>(6 * row).copy_from(force);
            wrench.fixed_rows_mut::<3>(6 * row + 3).copy_from(torque);

            // Full 6 x numDrivers Jacobian at the link origin, sliced to
            // the underactuated driver columns.
            let full = host.link_jacobian(*l_index, &[0.0, 0.0, 0.0]);
            for (u_id, n) in self.u_to_n.iter().enumerate() {
                jacobian
                    .view_mut((6 * row, u_id), (6, 1))
                    .copy_from(&full.column(*n));
            }
        }

        ContactSet { wrench, jacobian }
    }
}
