#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use crate::actuation_error::ActuationError;
    use crate::hand_emulator::HandEmulator;
    use crate::tests::test_utils::{pincher_calibration, pincher_profile, MockHand};

    const EPSILON: f64 = 1e-12;

    fn pincher_hand() -> MockHand {
        MockHand::new("pincher", &["wire_t_s_0", "proximal_f_a_0", "distal_f_b_0"])
    }

    /// The reference scenario: one synergy actuator, two underactuated
    /// joints, R = [[1, 1]], E = diag(2, 2), reduction 7, reference 0.5,
    /// everything at rest, no contacts. W = (1*0.5 + 1*0.5)^-1 = 1, the
    /// tension is zero, the synergy torque is pure proportional error.
    #[test]
    fn test_rest_closing_torques() {
        let mut emulator = HandEmulator::new(
            pincher_hand(),
            pincher_profile(),
            &pincher_calibration(1.0, 2.0),
            0,
            0,
        )
        .unwrap();

        emulator.set_command(&[0.5]);
        emulator.substep(0.01).unwrap();

        let torque = emulator.host().last_torque();
        assert!((torque[0] - 1.5).abs() < EPSILON, "torque_a = {}", torque[0]);
        assert!(torque[1].abs() < EPSILON);
        assert!(torque[2].abs() < EPSILON);
    }

    /// Same transmission, but the hand has already flexed: the elastic
    /// return pulls the joints back and the tension reflects the sensed
    /// synergy coordinate.
    #[test]
    fn test_flexed_equilibrium_terms() {
        // Sensed q_a = 0.2, q_u = [0.1, 0.3], reference at zero.
        // W = 1, f_a = 0.2 * 7 = 1.4.
        // torque_a = 3*(0 - 0.2) - 1.4/7 = -0.8
        // torque_u = [1.4 - 2*0.1, 1.4 - 2*0.3] = [1.2, 0.8]
        let mut hand = pincher_hand();
        hand.q[0] = 0.2;
        hand.q[1] = 0.1;
        hand.q[2] = 0.3;
        let mut emulator = HandEmulator::new(
            hand,
            pincher_profile(),
            &pincher_calibration(1.0, 2.0),
            0,
            0,
        )
        .unwrap();
        emulator.substep(0.01).unwrap();

        let torque = emulator.host().last_torque();
        assert!((torque[0] - (-0.8)).abs() < EPSILON, "torque_a = {}", torque[0]);
        assert!((torque[1] - 1.2).abs() < EPSILON, "torque_u[0] = {}", torque[1]);
        assert!((torque[2] - 0.8).abs() < EPSILON, "torque_u[1] = {}", torque[2]);
    }

    /// The flexed-equilibrium torques survive a host whose native state
    /// ordering differs from driver ordering: the sensed vectors are
    /// reordered through `q_to_t` before slicing into role groups.
    #[test]
    fn test_permuted_native_state_ordering() {
        let mut hand = pincher_hand();
        // Driver 0 (wire) reads native slot 2, the phalanxes slots 0 and 1.
        hand.links = vec![(100, 2), (101, 0), (102, 1)];
        hand.q[2] = 0.2; // q_a
        hand.q[0] = 0.1; // q_u[0]
        hand.q[1] = 0.3; // q_u[1]

        let mut emulator = HandEmulator::new(
            hand,
            pincher_profile(),
            &pincher_calibration(1.0, 2.0),
            0,
            0,
        )
        .unwrap();
        emulator.substep(0.01).unwrap();

        // Same numbers as the flexed equilibrium with identity ordering.
        let torque = emulator.host().last_torque();
        assert!((torque[0] - (-0.8)).abs() < EPSILON, "torque_a = {}", torque[0]);
        assert!((torque[1] - 1.2).abs() < EPSILON, "torque_u[0] = {}", torque[1]);
        assert!((torque[2] - 0.8).abs() < EPSILON, "torque_u[1] = {}", torque[2]);
    }

    /// A contact on the proximal link loads the tendon: the reflected
    /// tension shows up on both joints and is subtracted from the motor.
    #[test]
    fn test_contact_reflected_through_transmission() {
        let mut hand = pincher_hand();
        hand.world_ids = 1;
        hand.add_contact(101, 0, [0.0, 0.0, 0.7], [0.0, 0.0, 0.0]);
        // The force z component maps straight onto the proximal joint.
        let mut full = DMatrix::zeros(6, 3);
        full[(2, 1)] = 1.0;
        hand.jacobians.insert(1, full);

        let mut emulator = HandEmulator::new(
            hand,
            pincher_profile(),
            &pincher_calibration(1.0, 2.0),
            0,
            0,
        )
        .unwrap();
        emulator.set_command(&[0.5]);
        emulator.substep(0.01).unwrap();

        // tau_c = [0.7, 0], W = 1:
        // f_a = 0 + W * R * E^-1 * tau_c = 0.35
        // torque_a = 3*0.5 - 0.35/7 = 1.45
        // torque_u = [0.35, 0.35]
        let torque = emulator.host().last_torque();
        assert!((torque[0] - 1.45).abs() < EPSILON, "torque_a = {}", torque[0]);
        assert!((torque[1] - 0.35).abs() < EPSILON);
        assert!((torque[2] - 0.35).abs() < EPSILON);
    }

    /// Zero routing coefficients leave the synergy actuator decoupled from
    /// the joints; the stiffness inversion must fail loudly instead of
    /// commanding NaN torques.
    #[test]
    fn test_singular_stiffness_reported() {
        let mut emulator = HandEmulator::new(
            pincher_hand(),
            pincher_profile(),
            &pincher_calibration(0.0, 1.0),
            0,
            0,
        )
        .unwrap();

        let result = emulator.substep(0.01);
        match result {
            Err(ActuationError::Numerical(_)) => {}
            Err(other) => panic!("expected Numerical error, got {}", other),
            Ok(()) => panic!("singular stiffness was not detected"),
        }
        // Nothing was forwarded to the host for the failed step.
        assert!(emulator.host().sent.is_empty());
    }

    /// A failed step does not poison the emulator: fixing nothing but the
    /// sensed state, subsequent steps still work on a healthy instance.
    #[test]
    fn test_caller_owns_recovery() {
        let mut emulator = HandEmulator::new(
            pincher_hand(),
            pincher_profile(),
            &pincher_calibration(1.0, 2.0),
            0,
            0,
        )
        .unwrap();

        emulator.set_command(&[0.5]);
        emulator.substep(0.01).unwrap();
        emulator.substep(0.01).unwrap();
        assert_eq!(emulator.host().sent.len(), 2);
        // Torque output is continuous between command arrivals.
        assert_eq!(emulator.host().sent[0].2, emulator.host().sent[1].2);
    }
}
