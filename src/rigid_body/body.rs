use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::dynamics::{AccelerationMoments, ForceMoments, MassMoments, VelocityMoments};
use crate::error::SimulationError;

/// Per-tick working state for one body, reset by the solver at tick start.
///
/// The inverse mass/inertia operators are expressed in the world frame so
/// constraints can form effective-mass matrices without re-rotating each row.
/// `velocity` holds the working velocity the Gauss–Seidel pass converges on:
/// the body's actual velocity plus `dt` worth of all accumulated
/// accelerations.
#[derive(Debug, Clone, Copy)]
pub struct IterationCache {
    /// Inverse mass [1/kg]
    pub inv_m: f64,
    /// World-frame inverse inertia tensor [1/(kg⋅m²)]
    pub inv_i: Matrix3<f64>,
    /// Gravitational forces accumulated this tick
    pub gravitational_forces: ForceMoments,
    /// External forces this tick, gravity included
    pub external_forces: ForceMoments,
    /// External acceleration (gravity included), cached for velocity updates
    pub external_acceleration: AccelerationMoments,
    /// Sum of all constraint corrections applied to this body so far
    pub constraint_forces: ForceMoments,
    /// Working velocity moments used by the constraint solve
    pub velocity: VelocityMoments,
}

impl IterationCache {
    fn new() -> Self {
        Self {
            inv_m: 0.0,
            inv_i: Matrix3::zeros(),
            gravitational_forces: ForceMoments::zero(),
            external_forces: ForceMoments::zero(),
            external_acceleration: AccelerationMoments::zero(),
            constraint_forces: ForceMoments::zero(),
            velocity: VelocityMoments::zero(),
        }
    }

    /// Reset the accumulators and start the working velocity from the body's
    /// actual velocity.
    pub fn reset(&mut self, velocity: VelocityMoments) {
        self.gravitational_forces = ForceMoments::zero();
        self.external_forces = ForceMoments::zero();
        self.external_acceleration = AccelerationMoments::zero();
        self.constraint_forces = ForceMoments::zero();
        self.velocity = velocity;
    }

    /// All forces accumulated this tick: gravity + external + constraints.
    pub fn all_forces(&self) -> ForceMoments {
        self.external_forces + self.constraint_forces
    }
}

/// A rigid body: world-frame kinematic state plus mass moments.
///
/// The orientation quaternion maps body coordinates to world coordinates.
/// Mass moments are stored in the body frame about the center of mass, which
/// is also the body's reference position.
#[derive(Debug, Clone)]
pub struct Body {
    label: String,
    /// Center of mass position in world space [m]
    position: Vector3<f64>,
    /// Linear velocity in world space [m/s]
    velocity: Vector3<f64>,
    /// Rotation from body frame to world frame
    orientation: UnitQuaternion<f64>,
    /// Angular velocity in world space [rad/s]
    angular_velocity: Vector3<f64>,
    /// Mass moments in the body frame, about the center of mass
    shape: MassMoments,
    /// Body-frame inverse inertia tensor, cached at construction
    inv_inertia_body: Matrix3<f64>,
    /// Impulses applied by force generators for the upcoming tick (world frame)
    applied_impulses: ForceMoments,
    /// Last integrated acceleration, kept for telemetry
    acceleration: AccelerationMoments,
    iteration: IterationCache,
    broken: bool,
}

impl Body {
    /// Create a body from its mass moments.
    ///
    /// The moments are recentered on their own center of mass; a zero mass or
    /// a non-invertible inertia tensor is a setup error.
    pub fn new(shape: MassMoments) -> Result<Self, SimulationError> {
        let centered = shape.centered_at_center_of_mass();

        if centered.mass() <= 0.0 {
            return Err(SimulationError::DegenerateMassMoments(
                "mass must be positive".into(),
            ));
        }

        let inv_inertia_body = centered
            .inertia_tensor()
            .try_inverse()
            .ok_or_else(|| {
                SimulationError::DegenerateMassMoments("inertia tensor is not invertible".into())
            })?;

        Ok(Self {
            label: String::new(),
            position: shape.center_of_mass(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
            shape: centered,
            inv_inertia_body,
            applied_impulses: ForceMoments::zero(),
            acceleration: AccelerationMoments::zero(),
            iteration: IterationCache::new(),
            broken: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Center of mass position in world space [m]
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Linear velocity in world space [m/s]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Rotation from the body frame to the world frame
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Angular velocity in world space [rad/s]
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    /// Mass moments in the body frame about the center of mass
    pub fn shape(&self) -> &MassMoments {
        &self.shape
    }

    /// Body-frame inverse inertia tensor
    pub fn inverse_inertia_body(&self) -> &Matrix3<f64> {
        &self.inv_inertia_body
    }

    /// Last integrated acceleration moments, for diagnostic display
    pub fn acceleration_moments(&self) -> AccelerationMoments {
        self.acceleration
    }

    pub fn velocity_moments(&self) -> VelocityMoments {
        VelocityMoments::new(self.velocity, self.angular_velocity)
    }

    pub fn set_velocity_moments(&mut self, velocity_moments: VelocityMoments) {
        self.velocity = velocity_moments.velocity();
        self.angular_velocity = velocity_moments.angular_velocity();
    }

    pub fn move_to(&mut self, position: Vector3<f64>) {
        self.position = position;
    }

    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = orientation;
    }

    /// True if the body must be skipped when evolving the system.
    pub fn broken(&self) -> bool {
        self.broken
    }

    /// Mark the body as unusable for further evolution without removing it
    /// from the system.
    pub fn set_broken(&mut self) {
        self.broken = true;
    }

    pub(crate) fn iteration(&self) -> &IterationCache {
        &self.iteration
    }

    pub(crate) fn iteration_mut(&mut self) -> &mut IterationCache {
        &mut self.iteration
    }

    /// Apply force moments at the center of mass for the duration of the
    /// upcoming tick. Multiple calls accumulate.
    pub fn apply_impulse(&mut self, force_moments: ForceMoments) {
        self.applied_impulses += force_moments;
    }

    /// Apply force moments acting at a world-frame point displaced by
    /// `point` from the center of mass; the lever-arm torque is added
    /// automatically.
    pub fn apply_impulse_at(&mut self, force_moments: ForceMoments, point: &Vector3<f64>) {
        self.applied_impulses += force_moments.at(&-point);
    }

    /// Impulses accumulated so far for the upcoming tick (world frame).
    pub fn applied_impulses(&self) -> ForceMoments {
        self.applied_impulses
    }

    pub fn reset_applied_impulses(&mut self) {
        self.applied_impulses = ForceMoments::zero();
    }

    /// Integrate the body one step forward under the given total force
    /// moments.
    ///
    /// Linear acceleration is `F/m`; angular acceleration is evaluated in the
    /// body frame through the inverse inertia tensor and rotated back into
    /// the world frame. Velocities integrate first, then placement
    /// (semi-implicit Euler), and the orientation is renormalized after the
    /// incremental rotation. Forces must be finite; that contract is the
    /// caller's.
    pub fn act(&mut self, force_moments: &ForceMoments, dt: f64) {
        let acceleration = force_moments.force() / self.shape.mass();
        let torque_body = self.orientation.inverse() * force_moments.torque();
        let angular_acceleration = self.orientation * (self.inv_inertia_body * torque_body);

        self.acceleration = AccelerationMoments::new(acceleration, angular_acceleration);

        self.velocity += acceleration * dt;
        self.angular_velocity += angular_acceleration * dt;

        self.position += self.velocity * dt;
        let rotation = UnitQuaternion::from_scaled_axis(self.angular_velocity * dt);
        self.orientation = UnitQuaternion::from_quaternion((rotation * self.orientation).into_inner());
    }

    /// Renormalize the orientation quaternion to counter floating-point drift.
    pub fn normalize_rotation(&mut self) {
        self.orientation = UnitQuaternion::from_quaternion(self.orientation.into_inner());
    }

    /// Translate the body by the given world-frame vector.
    pub fn translate(&mut self, translation: &Vector3<f64>) {
        self.position += translation;
    }

    /// Rotate the body about its own center of mass. Velocity and angular
    /// velocity rotate with it so the motion state stays consistent.
    pub fn rotate_about_center_of_mass(&mut self, rotation: &UnitQuaternion<f64>) {
        self.orientation = rotation * self.orientation;
        self.velocity = rotation * self.velocity;
        self.angular_velocity = rotation * self.angular_velocity;
    }

    /// Rotate the body rigidly about an arbitrary world-frame point.
    pub fn rotate_about(&mut self, point: &Vector3<f64>, rotation: &UnitQuaternion<f64>) {
        self.position = point + rotation * (self.position - point);
        self.rotate_about_center_of_mass(rotation);
    }

    /// Rotate the body rigidly about the world origin.
    pub fn rotate_about_world_origin(&mut self, rotation: &UnitQuaternion<f64>) {
        self.rotate_about(&Vector3::zeros(), rotation);
    }

    /// Translational kinetic energy `½m|v|²` [J]
    pub fn translational_kinetic_energy(&self) -> f64 {
        0.5 * self.shape.mass() * self.velocity.norm_squared()
    }

    /// Rotational kinetic energy `½ωᵀIω` with ω taken in the body frame [J]
    pub fn rotational_kinetic_energy(&self) -> f64 {
        let omega_body = self.orientation.inverse() * self.angular_velocity;
        0.5 * omega_body.dot(&(self.shape.inertia_tensor() * omega_body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_cube() -> Body {
        Body::new(MassMoments::cuboid(1.0, Vector3::new(1.0, 1.0, 1.0))).unwrap()
    }

    #[test]
    fn test_zero_force_preserves_momentum() {
        let mut body = unit_cube();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(0.3, 0.0, -0.1),
        ));

        for _ in 0..100 {
            body.act(&ForceMoments::zero(), 0.01);
        }

        assert_relative_eq!(body.velocity(), Vector3::new(1.0, -2.0, 0.5), epsilon = 1e-12);
        assert_relative_eq!(
            body.angular_velocity(),
            Vector3::new(0.3, 0.0, -0.1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_orientation_stays_orthonormal() {
        let mut body = unit_cube();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::zeros(),
            Vector3::new(3.0, -5.0, 7.0),
        ));

        for _ in 0..10_000 {
            body.act(&ForceMoments::from_torque(Vector3::new(0.01, 0.02, -0.01)), 1e-3);
        }

        let basis = body.orientation().to_rotation_matrix().into_inner();
        for i in 0..3 {
            assert_relative_eq!(basis.column(i).norm(), 1.0, epsilon = 1e-9);
            for j in (i + 1)..3 {
                assert_relative_eq!(basis.column(i).dot(&basis.column(j)), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_constant_force_integrates_linearly() {
        let mut body = unit_cube();

        // a = 2 m/s²; after one step of semi-implicit Euler v = a·dt and
        // x = v·dt.
        body.act(&ForceMoments::from_force(Vector3::new(2.0, 0.0, 0.0)), 0.5);

        assert_relative_eq!(body.velocity(), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(body.position(), Vector3::new(0.5, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_about_point_carries_position_and_velocity() {
        let mut body = unit_cube();
        body.move_to(Vector3::new(1.0, 0.0, 0.0));
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::zeros(),
        ));

        let quarter_turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        body.rotate_about(&Vector3::zeros(), &quarter_turn);

        assert_relative_eq!(body.position(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(body.velocity(), Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_kinetic_energies() {
        let mut body = unit_cube();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(2.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        ));

        assert_relative_eq!(body.translational_kinetic_energy(), 2.0);
        // Unit cube: I_z = 1/6, so E_rot = ½·(1/6)·9 = 0.75.
        assert_relative_eq!(body.rotational_kinetic_energy(), 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_mass_is_rejected() {
        assert!(Body::new(MassMoments::zero()).is_err());
        assert!(Body::new(MassMoments::point_mass(1.0, Vector3::zeros())).is_err());
    }

    #[test]
    fn test_apply_impulse_at_adds_lever_arm_torque() {
        let mut body = unit_cube();
        body.apply_impulse_at(
            ForceMoments::from_force(Vector3::new(0.0, 1.0, 0.0)),
            &Vector3::new(1.0, 0.0, 0.0),
        );

        let impulses = body.applied_impulses();
        assert_relative_eq!(impulses.force(), Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(impulses.torque(), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }
}
