use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Linear and angular velocity of a rigid point.
///
/// Angular velocity isn't normally called a moment, but the name keeps the
/// family consistent with `ForceMoments` and `MassMoments`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityMoments {
    /// Linear velocity [m/s]
    velocity: Vector3<f64>,
    /// Angular velocity [rad/s]
    angular_velocity: Vector3<f64>,
}

impl VelocityMoments {
    /// Create velocity moments from linear and angular velocity
    pub fn new(velocity: Vector3<f64>, angular_velocity: Vector3<f64>) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    /// Zero linear and angular velocity
    pub fn zero() -> Self {
        Self {
            velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Get the linear velocity [m/s]
    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Set the linear velocity [m/s]
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    /// Get the angular velocity [rad/s]
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.angular_velocity
    }

    /// Set the angular velocity [rad/s]
    pub fn set_angular_velocity(&mut self, angular_velocity: Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    /// Linear velocity observed at a point displaced by `arm` from the
    /// reference point: `v + ω × arm`.
    pub fn velocity_at(&self, arm: &Vector3<f64>) -> Vector3<f64> {
        self.velocity + self.angular_velocity.cross(arm)
    }

    /// Compose with a velocity measured at an attachment point displaced by
    /// `arm`: the linear part picks up the other motion's tangential term
    /// `ω_other × arm`, the angular parts add.
    pub fn add_at_arm(&mut self, other: &VelocityMoments, arm: &Vector3<f64>) {
        self.velocity += other.velocity + other.angular_velocity.cross(arm);
        self.angular_velocity += other.angular_velocity;
    }

    /// Rotate both components into another frame
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Self {
        Self {
            velocity: rotation * self.velocity,
            angular_velocity: rotation * self.angular_velocity,
        }
    }
}

impl Default for VelocityMoments {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for VelocityMoments {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            velocity: self.velocity + other.velocity,
            angular_velocity: self.angular_velocity + other.angular_velocity,
        }
    }
}

impl AddAssign for VelocityMoments {
    fn add_assign(&mut self, other: Self) {
        self.velocity += other.velocity;
        self.angular_velocity += other.angular_velocity;
    }
}

impl Sub for VelocityMoments {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            velocity: self.velocity - other.velocity,
            angular_velocity: self.angular_velocity - other.angular_velocity,
        }
    }
}

impl SubAssign for VelocityMoments {
    fn sub_assign(&mut self, other: Self) {
        self.velocity -= other.velocity;
        self.angular_velocity -= other.angular_velocity;
    }
}

impl Neg for VelocityMoments {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            velocity: -self.velocity,
            angular_velocity: -self.angular_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_velocity_at_adds_tangential_term() {
        let moments = VelocityMoments::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0));

        // Spinning about z at 2 rad/s, a point one metre along x moves at
        // 2 m/s along y in addition to the carried linear velocity.
        let at_arm = moments.velocity_at(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(at_arm, Vector3::new(1.0, 2.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_add_at_arm() {
        let mut base = VelocityMoments::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let attached = VelocityMoments::new(Vector3::new(0.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 3.0));

        base.add_at_arm(&attached, &Vector3::new(0.0, 1.0, 0.0));

        // Tangential term: ω_other × arm = (0,0,3) × (0,1,0) = (-3,0,0).
        assert_relative_eq!(base.velocity(), Vector3::new(-2.5, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(base.angular_velocity(), Vector3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = VelocityMoments::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        let b = VelocityMoments::new(Vector3::new(0.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 3.0));

        let sum = a + b;
        assert_relative_eq!(sum.velocity(), Vector3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(sum.angular_velocity(), Vector3::new(0.0, 1.0, 3.0));

        let diff = sum - b;
        assert_relative_eq!(diff.velocity(), a.velocity());
        assert_relative_eq!((-a).angular_velocity(), Vector3::new(0.0, -1.0, 0.0));
    }
}
