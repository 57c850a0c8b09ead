//! Joints and the velocity-level constraints defined on them.
//!
//! A joint is a [`FramePrecalculation`]: a per-tick cache of the relative
//! geometry between two bodies. Constraints attach to a joint and translate
//! that geometry into Jacobian rows; the shared solver math in
//! [`constraint`] turns the rows into equal-and-opposite force moments.

pub mod angular_limits;
pub mod constraint;
pub mod fixed;
pub mod hinge;
pub mod hinge_joint;
pub mod linear_limits;
pub mod precalculation;
pub mod slider;
pub mod slider_joint;

pub use angular_limits::AngularLimitsConstraint;
pub use constraint::{
    Constraint, ConstraintForces, ConstraintKind, ConstraintSettings, DEFAULT_BAUMGARTE_FACTOR,
};
pub use fixed::FixedConstraint;
pub use hinge::{HingeData, HingeGeometry};
pub use hinge_joint::HingeConstraint;
pub use linear_limits::LinearLimitsConstraint;
pub use precalculation::{FramePrecalculation, JointGeometry};
pub use slider::{SliderData, SliderGeometry};
pub use slider_joint::SliderConstraint;
