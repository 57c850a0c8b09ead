use nalgebra::Matrix3;

use crate::rigid_body::{IterationCache, JointId};

use super::constraint::{
    calculate_constraint_forces, calculate_k, calculate_lambda, jacobian_velocity,
    ConstraintForces, JacobianV, JacobianW,
};
use super::hinge::HingeData;

/// Welds the two bodies of a joint together: all three translational and all
/// three rotational degrees of freedom are removed.
///
/// Solved as one six-row system so translational and rotational corrections
/// stay coupled through the shared effective-mass matrix.
#[derive(Debug, Clone)]
pub struct FixedConstraint {
    joint: JointId,
}

impl FixedConstraint {
    pub fn new(joint: JointId) -> Self {
        Self { joint }
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub(crate) fn forces(
        &self,
        data: &HingeData,
        iter_1: &IterationCache,
        iter_2: &IterationCache,
        dt: f64,
        baumgarte_factor: f64,
        cfm: f64,
    ) -> ConstraintForces {
        let identity = Matrix3::identity();

        let mut jv1 = JacobianV::<6>::zeros();
        let mut jw1 = JacobianW::<6>::zeros();
        let mut jv2 = JacobianV::<6>::zeros();
        let mut jw2 = JacobianW::<6>::zeros();

        // Rows 0..3: anchors coincide.
        jv1.fixed_rows_mut::<3>(0).copy_from(&(-identity));
        jw1.fixed_rows_mut::<3>(0).copy_from(&data.r1.cross_matrix());
        jv2.fixed_rows_mut::<3>(0).copy_from(&identity);
        jw2.fixed_rows_mut::<3>(0)
            .copy_from(&(-data.r2.cross_matrix()));

        // Rows 3..6: relative orientation stays at its reference.
        jw1.fixed_rows_mut::<3>(3).copy_from(&(-identity));
        jw2.fixed_rows_mut::<3>(3).copy_from(&identity);

        let mut location_error = nalgebra::SVector::<f64, 6>::zeros();
        location_error.fixed_rows_mut::<3>(0).copy_from(&data.u);
        location_error
            .fixed_rows_mut::<3>(3)
            .copy_from(&data.rotation_error);

        let j = jacobian_velocity(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2);
        let k = calculate_k(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2, cfm);
        let lambda = calculate_lambda(&location_error, &j, &k, dt, baumgarte_factor);

        calculate_constraint_forces(&jv1, &jw1, &jv2, &jw2, &lambda)
    }
}
