use nalgebra::Matrix3;

use crate::rigid_body::{IterationCache, JointId};

use super::constraint::{
    calculate_constraint_forces, calculate_k, calculate_lambda, jacobian_velocity,
    ConstraintForces, JacobianV, JacobianW,
};
use super::hinge::HingeData;

/// Keeps the two bodies of a hinge joint pinned at the anchor and their hinge
/// axes aligned, leaving rotation about the axis free.
///
/// Five rows: three translational (anchors coincide) and two rotational over
/// the helper vectors `t1`, `t2`, which measure how far the body-2 axis has
/// tilted out of alignment with the body-1 axis.
#[derive(Debug, Clone)]
pub struct HingeConstraint {
    joint: JointId,
}

impl HingeConstraint {
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

        let mut jv1 = JacobianV::<5>::zeros();
        let mut jw1 = JacobianW::<5>::zeros();
        let mut jv2 = JacobianV::<5>::zeros();
        let mut jw2 = JacobianW::<5>::zeros();

        // Rows 0..3: anchors coincide.
        jv1.fixed_rows_mut::<3>(0).copy_from(&(-identity));
        jw1.fixed_rows_mut::<3>(0).copy_from(&data.r1.cross_matrix());
        jv2.fixed_rows_mut::<3>(0).copy_from(&identity);
        jw2.fixed_rows_mut::<3>(0)
            .copy_from(&(-data.r2.cross_matrix()));

        // Rows 3..5: axis misalignment measured along t1 and t2.
        jw1.set_row(3, &(-data.t1).transpose());
        jw1.set_row(4, &(-data.t2).transpose());
        jw2.set_row(3, &data.t1.transpose());
        jw2.set_row(4, &data.t2.transpose());

        let axis_error = data.a1.cross(&data.a2);
        let mut location_error = nalgebra::SVector::<f64, 5>::zeros();
        location_error.fixed_rows_mut::<3>(0).copy_from(&data.u);
        location_error[3] = data.t1.dot(&axis_error);
        location_error[4] = data.t2.dot(&axis_error);

        let j = jacobian_velocity(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2);
        let k = calculate_k(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2, cfm);
        let lambda = calculate_lambda(&location_error, &j, &k, dt, baumgarte_factor);

        calculate_constraint_forces(&jv1, &jw1, &jv2, &jw2, &lambda)
    }
}
