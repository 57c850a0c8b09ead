use nalgebra::SVector;

use crate::rigid_body::{IterationCache, JointId};

use super::constraint::{
    calculate_constraint_forces, calculate_k, calculate_lambda, jacobian_velocity,
    ConstraintForces, JacobianV, JacobianW,
};
use super::hinge::HingeData;

/// Limits the twist angle of a hinge joint to `[minimum, maximum]` radians.
///
/// Inactive while the angle is inside the bounds; once a bound is exceeded a
/// single one-sided row pushes the twist back. Both bounds share the same row
/// shape, only the positional error differs, so the restoring force grows
/// continuously from zero at the bound.
#[derive(Debug, Clone)]
pub struct AngularLimitsConstraint {
    joint: JointId,
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl AngularLimitsConstraint {
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
        data: &HingeData,
        iter_1: &IterationCache,
        iter_2: &IterationCache,
        dt: f64,
        baumgarte_factor: f64,
        cfm: f64,
    ) -> ConstraintForces {
        let mut error = None;

        if let Some(minimum) = self.minimum {
            if data.angle < minimum {
                error = Some(data.angle - minimum);
            }
        }

        if let Some(maximum) = self.maximum {
            if data.angle > maximum {
                error = Some(data.angle - maximum);
            }
        }

        match error {
            Some(error) => {
                let jv = JacobianV::<1>::zeros();
                let jw1 = JacobianW::<1>::from_rows(&[(-data.a1).transpose()]);
                let jw2 = JacobianW::<1>::from_rows(&[data.a1.transpose()]);
                let location_error = SVector::<f64, 1>::new(error);

                let j = jacobian_velocity(&jv, &jw1, &jv, &jw2, iter_1, iter_2);
                let k = calculate_k(&jv, &jw1, &jv, &jw2, iter_1, iter_2, cfm);
                let lambda = calculate_lambda(&location_error, &j, &k, dt, baumgarte_factor);

                calculate_constraint_forces(&jv, &jw1, &jv, &jw2, &lambda)
            }
            None => ConstraintForces::zero(),
        }
    }
}
