use nalgebra::Matrix3;

use crate::rigid_body::{IterationCache, JointId};

use super::constraint::{
    calculate_constraint_forces, calculate_k, calculate_lambda, jacobian_velocity,
    ConstraintForces, JacobianV, JacobianW,
};
use super::slider::SliderData;

/// Keeps the two bodies of a slider joint locked in relative orientation and
/// on the slide axis, leaving translation along the axis free.
///
/// Five rows: three rotational (relative orientation stays at its reference)
/// and two translational over the helper vectors `t1`, `t2`, which measure
/// how far the anchor separation has drifted off the axis.
#[derive(Debug, Clone)]
pub struct SliderConstraint {
    joint: JointId,
}

impl SliderConstraint {
    pub fn new(joint: JointId) -> Self {
        Self { joint }
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub(crate) fn forces(
        &self,
        data: &SliderData,
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

        // Rows 0..3: no relative rotation.
        jw1.fixed_rows_mut::<3>(0).copy_from(&(-identity));
        jw2.fixed_rows_mut::<3>(0).copy_from(&identity);

        // Rows 3..5: off-axis separation measured along t1 and t2. The lever
        // arm on body 1 runs to the body-2 anchor, hence `r1 + u`.
        jv1.set_row(3, &(-data.t1).transpose());
        jv1.set_row(4, &(-data.t2).transpose());
        jw1.set_row(3, &(-(data.r1 + data.u).cross(&data.t1)).transpose());
        jw1.set_row(4, &(-(data.r1 + data.u).cross(&data.t2)).transpose());
        jv2.set_row(3, &data.t1.transpose());
        jv2.set_row(4, &data.t2.transpose());
        jw2.set_row(3, &data.r2.cross(&data.t1).transpose());
        jw2.set_row(4, &data.r2.cross(&data.t2).transpose());

        let mut location_error = nalgebra::SVector::<f64, 5>::zeros();
        location_error
            .fixed_rows_mut::<3>(0)
            .copy_from(&data.rotation_error);
        location_error[3] = data.t1.dot(&data.u);
        location_error[4] = data.t2.dot(&data.u);

        let j = jacobian_velocity(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2);
        let k = calculate_k(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2, cfm);
        let lambda = calculate_lambda(&location_error, &j, &k, dt, baumgarte_factor);

        calculate_constraint_forces(&jv1, &jw1, &jv2, &jw2, &lambda)
    }
}
