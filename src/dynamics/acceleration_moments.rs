use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Linear and angular acceleration of a rigid point.
///
/// Produced by dividing `ForceMoments` through mass moments and integrated
/// into `VelocityMoments` by the solver.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccelerationMoments {
    /// Linear acceleration [m/s²]
    acceleration: Vector3<f64>,
    /// Angular acceleration [rad/s²]
    angular_acceleration: Vector3<f64>,
}

impl AccelerationMoments {
    /// Create acceleration moments from linear and angular acceleration
    pub fn new(acceleration: Vector3<f64>, angular_acceleration: Vector3<f64>) -> Self {
        Self {
            acceleration,
            angular_acceleration,
        }
    }

    /// Zero linear and angular acceleration
    pub fn zero() -> Self {
        Self::default()
    }

    /// Get the linear acceleration [m/s²]
    pub fn acceleration(&self) -> Vector3<f64> {
        self.acceleration
    }

    /// Get the angular acceleration [rad/s²]
    pub fn angular_acceleration(&self) -> Vector3<f64> {
        self.angular_acceleration
    }
}

impl Add for AccelerationMoments {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            acceleration: self.acceleration + other.acceleration,
            angular_acceleration: self.angular_acceleration + other.angular_acceleration,
        }
    }
}

impl AddAssign for AccelerationMoments {
    fn add_assign(&mut self, other: Self) {
        self.acceleration += other.acceleration;
        self.angular_acceleration += other.angular_acceleration;
    }
}

impl Sub for AccelerationMoments {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            acceleration: self.acceleration - other.acceleration,
            angular_acceleration: self.angular_acceleration - other.angular_acceleration,
        }
    }
}

impl SubAssign for AccelerationMoments {
    fn sub_assign(&mut self, other: Self) {
        self.acceleration -= other.acceleration;
        self.angular_acceleration -= other.angular_acceleration;
    }
}

impl Neg for AccelerationMoments {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            acceleration: -self.acceleration,
            angular_acceleration: -self.angular_acceleration,
        }
    }
}

impl Mul<f64> for AccelerationMoments {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self {
            acceleration: self.acceleration * factor,
            angular_acceleration: self.angular_acceleration * factor,
        }
    }
}
