use nalgebra::SVector;

use crate::rigid_body::{IterationCache, JointId};

use super::constraint::{
    calculate_constraint_forces, calculate_k, calculate_lambda, jacobian_velocity,
    ConstraintForces, JacobianV, JacobianW,
};
use super::slider::SliderData;

/// Limits the travel of a slider joint to `[minimum, maximum]` meters.
///
/// Inactive while the signed distance is inside the bounds; past a bound a
/// single one-sided row along the slide axis pushes the body back.
#[derive(Debug, Clone)]
pub struct LinearLimitsConstraint {
    joint: JointId,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl LinearLimitsConstraint {
    pub fn new(joint: JointId, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        Self {
            joint,
            minimum,
            maximum,
        }
    }

    pub fn joint(&self) -> JointId {
        self.joint
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    pub fn set_minimum(&mut self, minimum: Option<f64>) {
        self.minimum = minimum;
    }

    pub fn set_maximum(&mut self, maximum: Option<f64>) {
        self.maximum = maximum;
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
        let mut error = None;

        if let Some(minimum) = self.minimum {
            if data.distance < minimum {
                error = Some(data.distance - minimum);
            }
        }

        if let Some(maximum) = self.maximum {
            if data.distance > maximum {
                error = Some(data.distance - maximum);
            }
        }

        match error {
            Some(error) => {
                let jv1 = JacobianV::<1>::from_rows(&[(-data.a).transpose()]);
                let jv2 = JacobianV::<1>::from_rows(&[data.a.transpose()]);
                let jw1 =
                    JacobianW::<1>::from_rows(&[(-(data.r1 + data.u).cross(&data.a)).transpose()]);
                let jw2 = JacobianW::<1>::from_rows(&[data.r2.cross(&data.a).transpose()]);
                let location_error = SVector::<f64, 1>::new(error);

                let j = jacobian_velocity(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2);
                let k = calculate_k(&jv1, &jw1, &jv2, &jw2, iter_1, iter_2, cfm);
                let lambda = calculate_lambda(&location_error, &j, &k, dt, baumgarte_factor);

                calculate_constraint_forces(&jv1, &jw1, &jv2, &jw2, &lambda)
            }
            None => ConstraintForces::zero(),
        }
    }
}
