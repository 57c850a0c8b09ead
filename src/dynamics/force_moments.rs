use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A force and a torque acting about a common reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceMoments {
    /// Force [N]
    force: Vector3<f64>,
    /// Torque about the reference point [N⋅m]
    torque: Vector3<f64>,
}

impl ForceMoments {
    /// Create force moments from a force and a torque
    pub fn new(force: Vector3<f64>, torque: Vector3<f64>) -> Self {
        Self { force, torque }
    }

    /// Zero force and torque
    pub fn zero() -> Self {
        Self {
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    /// A pure force with no torque
    pub fn from_force(force: Vector3<f64>) -> Self {
        Self::new(force, Vector3::zeros())
    }

    /// A pure torque with no force
    pub fn from_torque(torque: Vector3<f64>) -> Self {
        Self::new(Vector3::zeros(), torque)
    }

    /// Get the force [N]
    pub fn force(&self) -> Vector3<f64> {
        self.force
    }

    /// Get the torque [N⋅m]
    pub fn torque(&self) -> Vector3<f64> {
        self.torque
    }

    /// Express the same moments about a new reference point.
    ///
    /// The force is unchanged; the torque picks up the lever-arm term
    /// `(-point) × force` for the move from the current reference point to
    /// `point`.
    pub fn at(&self, point: &Vector3<f64>) -> Self {
        Self {
            force: self.force,
            torque: self.torque + (-point).cross(&self.force),
        }
    }

    /// Rotate both components into another frame
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Self {
        Self {
            force: rotation * self.force,
            torque: rotation * self.torque,
        }
    }
}

impl Default for ForceMoments {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for ForceMoments {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            force: self.force + other.force,
            torque: self.torque + other.torque,
        }
    }
}

impl AddAssign for ForceMoments {
    fn add_assign(&mut self, other: Self) {
        self.force += other.force;
        self.torque += other.torque;
    }
}

impl Sub for ForceMoments {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            force: self.force - other.force,
            torque: self.torque - other.torque,
        }
    }
}

impl SubAssign for ForceMoments {
    fn sub_assign(&mut self, other: Self) {
        self.force -= other.force;
        self.torque -= other.torque;
    }
}

impl Neg for ForceMoments {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            force: -self.force,
            torque: -self.torque,
        }
    }
}

impl Mul<f64> for ForceMoments {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self {
            force: self.force * factor,
            torque: self.torque * factor,
        }
    }
}

impl Div<f64> for ForceMoments {
    type Output = Self;

    fn div(self, divisor: f64) -> Self {
        Self {
            force: self.force / divisor,
            torque: self.torque / divisor,
        }
    }
}
