use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// The three moments of mass of a rigid body:
///
/// * 0th — mass (monopole),
/// * 1st — center of mass position relative to the reference origin (dipole),
/// * 2nd — inertia tensor about the reference origin (quadrupole).
///
/// Summing two `MassMoments` treats both operands as measured about the same
/// origin, so combining bodies placed at different points is done by first
/// relocating each with [`MassMoments::at_arm`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassMoments {
    /// Mass [kg]
    mass: f64,
    /// Center of mass relative to the reference origin [m]
    center_of_mass: Vector3<f64>,
    /// Inertia tensor about the reference origin [kg⋅m²]
    inertia_tensor: Matrix3<f64>,
}

impl MassMoments {
    /// Create mass moments from a mass, center-of-mass offset and an inertia
    /// tensor expressed about the reference origin.
    pub fn new(mass: f64, center_of_mass: Vector3<f64>, inertia_tensor: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia_tensor,
        }
    }

    /// No mass at all; the identity element of summation.
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            center_of_mass: Vector3::zeros(),
            inertia_tensor: Matrix3::zeros(),
        }
    }

    /// A point mass at the given position relative to the reference origin.
    pub fn point_mass(mass: f64, at: Vector3<f64>) -> Self {
        Self {
            mass,
            center_of_mass: at,
            inertia_tensor: displacement_inertia_tensor(mass, &at),
        }
    }

    /// A solid cuboid centered on the reference origin, axis-aligned, with the
    /// given full edge dimensions [m].
    pub fn cuboid(mass: f64, dimensions: Vector3<f64>) -> Self {
        let k = mass / 12.0;
        let (x2, y2, z2) = (
            dimensions.x * dimensions.x,
            dimensions.y * dimensions.y,
            dimensions.z * dimensions.z,
        );

        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia_tensor: Matrix3::from_diagonal(&Vector3::new(
                k * (y2 + z2),
                k * (x2 + z2),
                k * (x2 + y2),
            )),
        }
    }

    /// Get the mass [kg]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Get the center of mass relative to the reference origin [m]
    pub fn center_of_mass(&self) -> Vector3<f64> {
        self.center_of_mass
    }

    /// Get the inertia tensor about the reference origin [kg⋅m²]
    pub fn inertia_tensor(&self) -> Matrix3<f64> {
        self.inertia_tensor
    }

    /// Express the same moments about a reference origin displaced by
    /// `-offset`, i.e. view the body from a point such that its center of
    /// mass moves by `+offset`.
    ///
    /// The inertia tensor is corrected with the parallel-axis theorem for the
    /// old and new center-of-mass displacements.
    pub fn at_arm(&self, offset: &Vector3<f64>) -> Self {
        let new_center = self.center_of_mass + offset;

        Self {
            mass: self.mass,
            center_of_mass: new_center,
            inertia_tensor: self.inertia_tensor
                - displacement_inertia_tensor(self.mass, &self.center_of_mass)
                + displacement_inertia_tensor(self.mass, &new_center),
        }
    }

    /// Return the same moments viewed from the center of mass: zero
    /// center-of-mass offset and the tensor reduced by the parallel-axis term.
    pub fn centered_at_center_of_mass(&self) -> Self {
        Self {
            mass: self.mass,
            center_of_mass: Vector3::zeros(),
            inertia_tensor: self.inertia_tensor
                - displacement_inertia_tensor(self.mass, &self.center_of_mass),
        }
    }

    /// Rotate the moments into another frame: the center-of-mass offset is
    /// rotated and the inertia tensor conjugated (`R·I·Rᵀ`); mass unchanged.
    pub fn rotated(&self, rotation: &UnitQuaternion<f64>) -> Self {
        let r = rotation.to_rotation_matrix().into_inner();

        Self {
            mass: self.mass,
            center_of_mass: rotation * self.center_of_mass,
            inertia_tensor: r * self.inertia_tensor * r.transpose(),
        }
    }
}

/// The inertia tensor contribution of displacing a mass by `r` from the
/// reference origin: `m·(|r|² E − r ⊗ r)`. Negating `r` does not change the
/// result.
pub fn displacement_inertia_tensor(mass: f64, r: &Vector3<f64>) -> Matrix3<f64> {
    mass * (r.dot(r) * Matrix3::identity() - r * r.transpose())
}

impl Default for MassMoments {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for MassMoments {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for MassMoments {
    /// Combine two bodies measured about the same reference origin. The
    /// center of mass is mass-weighted; tensors about the shared origin add
    /// directly. A zero-mass operand behaves as identity.
    fn add_assign(&mut self, other: Self) {
        let total_mass = self.mass + other.mass;

        if total_mass > 0.0 {
            self.center_of_mass = (self.mass * self.center_of_mass
                + other.mass * other.center_of_mass)
                / total_mass;
        }

        self.mass = total_mass;
        self.inertia_tensor += other.inertia_tensor;
    }
}
