//! Shared velocity-level constraint mathematics.
//!
//! Based on "Constraints Derivation for Rigid Body Simulation in 3D" by
//! Daniel Chappuis and "Rigid Body Dynamics: Links and Joints" by Kristina
//! Pickl. Each constraint contributes N scalar rows; per row a pair of
//! Jacobians maps the two bodies' (linear, angular) velocities to the rate of
//! change of the constrained quantity. The solver forms the effective-mass
//! matrix `K = J·M⁻¹·Jᵀ`, biases the target velocity with a fraction of the
//! positional error (Baumgarte stabilization) and distributes the resulting
//! impulse as equal-and-opposite force moments.

use nalgebra::{Const, DimMin, SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

use crate::dynamics::ForceMoments;
use crate::rigid_body::{IterationCache, JointId};

use super::{
    AngularLimitsConstraint, FixedConstraint, HingeConstraint, LinearLimitsConstraint,
    SliderConstraint,
};

/// Fraction of the positional error corrected per tick by default.
pub const DEFAULT_BAUMGARTE_FACTOR: f64 = 0.5;

/// Jacobian block over the linear velocity of one body, N rows.
pub type JacobianV<const N: usize> = SMatrix<f64, N, 3>;
/// Jacobian block over the angular velocity of one body, N rows.
pub type JacobianW<const N: usize> = SMatrix<f64, N, 3>;

/// The equal-and-opposite force/torque corrections one constraint applies to
/// its two bodies for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstraintForces {
    pub body_1: ForceMoments,
    pub body_2: ForceMoments,
}

impl ConstraintForces {
    pub fn zero() -> Self {
        Self::default()
    }
}

impl Add for ConstraintForces {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            body_1: self.body_1 + other.body_1,
            body_2: self.body_2 + other.body_2,
        }
    }
}

impl AddAssign for ConstraintForces {
    fn add_assign(&mut self, other: Self) {
        self.body_1 += other.body_1;
        self.body_2 += other.body_2;
    }
}

/// Rate of change of the constrained quantities under the bodies' working
/// velocities: `J·v`, summed across both bodies.
pub fn jacobian_velocity<const N: usize>(
    jv1: &JacobianV<N>,
    jw1: &JacobianW<N>,
    jv2: &JacobianV<N>,
    jw2: &JacobianW<N>,
    iter_1: &IterationCache,
    iter_2: &IterationCache,
) -> SVector<f64, N> {
    jv1 * iter_1.velocity.velocity()
        + jw1 * iter_1.velocity.angular_velocity()
        + jv2 * iter_2.velocity.velocity()
        + jw2 * iter_2.velocity.angular_velocity()
}

/// Effective-mass matrix `K = J·M⁻¹·Jᵀ` with the constraint-force-mixing
/// factor added to the diagonal.
pub fn calculate_k<const N: usize>(
    jv1: &JacobianV<N>,
    jw1: &JacobianW<N>,
    jv2: &JacobianV<N>,
    jw2: &JacobianW<N>,
    iter_1: &IterationCache,
    iter_2: &IterationCache,
    cfm: f64,
) -> SMatrix<f64, N, N> {
    let mut k = jv1 * jv1.transpose() * iter_1.inv_m
        + jw1 * iter_1.inv_i * jw1.transpose()
        + jv2 * jv2.transpose() * iter_2.inv_m
        + jw2 * iter_2.inv_i * jw2.transpose();

    if cfm != 0.0 {
        for i in 0..N {
            k[(i, i)] += cfm;
        }
    }

    k
}

/// Corrective impulse magnitudes per row.
///
/// `λ = −K⁻¹·(J·v + β·C/dt)/dt` where `C` is the positional error and `β`
/// the Baumgarte factor. A singular `K` means the rows are momentarily
/// unconstrainable (degenerate configuration); the row set then contributes
/// nothing this tick rather than failing.
pub fn calculate_lambda<const N: usize>(
    location_error: &SVector<f64, N>,
    jacobian_velocity: &SVector<f64, N>,
    k: &SMatrix<f64, N, N>,
    dt: f64,
    baumgarte_factor: f64,
) -> SVector<f64, N>
where
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    let stabilization_bias = location_error * (baumgarte_factor / dt);

    match k.try_inverse() {
        Some(inv_k) => -(inv_k * (jacobian_velocity + stabilization_bias)) / dt,
        None => SVector::zeros(),
    }
}

/// Distribute the impulse back through the Jacobians: `F_i = J_viᵀ·λ`,
/// `τ_i = J_wiᵀ·λ`.
pub fn calculate_constraint_forces<const N: usize>(
    jv1: &JacobianV<N>,
    jw1: &JacobianW<N>,
    jv2: &JacobianV<N>,
    jw2: &JacobianW<N>,
    lambda: &SVector<f64, N>,
) -> ConstraintForces {
    ConstraintForces {
        body_1: ForceMoments::new(jv1.transpose() * lambda, jw1.transpose() * lambda),
        body_2: ForceMoments::new(jv2.transpose() * lambda, jw2.transpose() * lambda),
    }
}

/// Closed set of constraint kinds, dispatched by pattern match in the solver.
#[derive(Debug, Clone)]
pub enum ConstraintKind {
    Fixed(FixedConstraint),
    Hinge(HingeConstraint),
    Slider(SliderConstraint),
    AngularLimits(AngularLimitsConstraint),
    LinearLimits(LinearLimitsConstraint),
}

impl ConstraintKind {
    /// The joint precalculation this constraint reads.
    pub fn joint(&self) -> JointId {
        match self {
            ConstraintKind::Fixed(c) => c.joint(),
            ConstraintKind::Hinge(c) => c.joint(),
            ConstraintKind::Slider(c) => c.joint(),
            ConstraintKind::AngularLimits(c) => c.joint(),
            ConstraintKind::LinearLimits(c) => c.joint(),
        }
    }
}

/// Tuning parameters shared by every constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSettings {
    /// Fraction of positional error corrected per tick
    pub baumgarte_factor: f64,
    /// Constraint force mixing: a tiny compliance added to `K`'s diagonal,
    /// trading perfect rigidity for numerical damping
    pub constraint_force_mixing: f64,
    /// Force magnitude beyond which the constraint breaks [N]
    pub breaking_force: Option<f64>,
    /// Torque magnitude beyond which the constraint breaks [N⋅m]
    pub breaking_torque: Option<f64>,
}

impl Default for ConstraintSettings {
    fn default() -> Self {
        Self {
            baumgarte_factor: DEFAULT_BAUMGARTE_FACTOR,
            constraint_force_mixing: 0.0,
            breaking_force: None,
            breaking_torque: None,
        }
    }
}

/// A constraint between the two bodies of one joint.
///
/// Holds the kind-specific row definitions plus the shared configuration:
/// enablement, breakage thresholds and solver tuning. Stateless across ticks
/// except for that configuration and the convergence bookkeeping.
#[derive(Debug, Clone)]
pub struct Constraint {
    label: String,
    kind: ConstraintKind,
    settings: ConstraintSettings,
    enabled: bool,
    broken: bool,
    /// Total forces from the previous solver iteration; convergence compares
    /// successive solves of the same constraint.
    pub(crate) previous_forces: Option<ConstraintForces>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            label: String::new(),
            kind,
            settings: ConstraintSettings::default(),
            enabled: true,
            broken: false,
            previous_forces: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_settings(mut self, settings: ConstraintSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    pub fn settings(&self) -> &ConstraintSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ConstraintSettings {
        &mut self.settings
    }

    pub fn set_baumgarte_factor(&mut self, factor: f64) {
        self.settings.baumgarte_factor = factor;
    }

    pub fn set_breaking_force_torque(&mut self, force: Option<f64>, torque: Option<f64>) {
        self.settings.breaking_force = force;
        self.settings.breaking_torque = torque;
    }

    /// Constraints are enabled by default; a disabled constraint contributes
    /// zero forces without being removed from the system.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True once a breaking threshold has tripped; a broken constraint
    /// contributes zero forces from then on.
    pub fn broken(&self) -> bool {
        self.broken
    }

    pub fn set_broken(&mut self) {
        self.broken = true;
    }

    /// Kind-dispatched force computation. The caller supplies the fresh
    /// joint snapshot through the kind-specific evaluation functions; this
    /// wrapper only owns the shared enabled/broken policy.
    pub(crate) fn is_active(&self) -> bool {
        self.enabled && !self.broken
    }

    /// Apply the breaking thresholds to the final forces of this tick.
    pub(crate) fn check_breakage(&mut self, forces: &ConstraintForces) {
        if let Some(breaking_force) = self.settings.breaking_force {
            if forces.body_1.force().norm() > breaking_force
                || forces.body_2.force().norm() > breaking_force
            {
                self.broken = true;
            }
        }

        if let Some(breaking_torque) = self.settings.breaking_torque {
            if forces.body_1.torque().norm() > breaking_torque
                || forces.body_2.torque().norm() > breaking_torque
            {
                self.broken = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix3, Vector3};
    use crate::dynamics::VelocityMoments;

    fn unit_iteration() -> IterationCache {
        IterationCache {
            inv_m: 1.0,
            inv_i: Matrix3::identity(),
            gravitational_forces: ForceMoments::zero(),
            external_forces: ForceMoments::zero(),
            external_acceleration: crate::dynamics::AccelerationMoments::zero(),
            constraint_forces: ForceMoments::zero(),
            velocity: VelocityMoments::zero(),
        }
    }

    #[test]
    fn test_lambda_opposes_position_error() {
        let iter_1 = unit_iteration();
        let iter_2 = unit_iteration();

        // Single translational row along x for two unit masses.
        let jv1 = JacobianV::<1>::from_rows(&[(-Vector3::x()).transpose()]);
        let jv2 = JacobianV::<1>::from_rows(&[Vector3::x().transpose()]);
        let jw = JacobianW::<1>::zeros();

        let k = calculate_k(&jv1, &jw, &jv2, &jw, &iter_1, &iter_2, 0.0);
        assert_relative_eq!(k[(0, 0)], 2.0);

        let dt = 0.01;
        let error = SVector::<f64, 1>::new(0.1);
        let j = jacobian_velocity(&jv1, &jw, &jv2, &jw, &iter_1, &iter_2);
        let lambda = calculate_lambda(&error, &j, &k, dt, 0.5);

        // Positive separation error must pull body 2 back along -x.
        let forces = calculate_constraint_forces(&jv1, &jw, &jv2, &jw, &lambda);
        assert!(forces.body_2.force().x < 0.0);
        assert_relative_eq!(forces.body_1.force(), -forces.body_2.force());
    }

    #[test]
    fn test_singular_k_contributes_nothing() {
        let k = SMatrix::<f64, 2, 2>::zeros();
        let error = SVector::<f64, 2>::new(1.0, -1.0);
        let j = SVector::<f64, 2>::zeros();

        let lambda = calculate_lambda(&error, &j, &k, 0.01, 0.5);
        assert_relative_eq!(lambda, SVector::<f64, 2>::zeros());
    }

    #[test]
    fn test_breaking_threshold_trips_once() {
        let mut constraint = Constraint::new(ConstraintKind::AngularLimits(
            AngularLimitsConstraint::new(JointId::invalid(), Some(-1.0), Some(1.0)),
        ));
        constraint.set_breaking_force_torque(Some(10.0), None);

        let weak = ConstraintForces {
            body_1: ForceMoments::from_force(Vector3::new(5.0, 0.0, 0.0)),
            body_2: ForceMoments::from_force(Vector3::new(-5.0, 0.0, 0.0)),
        };
        constraint.check_breakage(&weak);
        assert!(!constraint.broken());

        let strong = ConstraintForces {
            body_1: ForceMoments::from_force(Vector3::new(50.0, 0.0, 0.0)),
            body_2: ForceMoments::from_force(Vector3::new(-50.0, 0.0, 0.0)),
        };
        constraint.check_breakage(&strong);
        assert!(constraint.broken());
        assert!(!constraint.is_active());
    }
}
