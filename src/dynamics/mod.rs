//! Composable inertial value types.
//!
//! These are the currency of the engine: mass/inertia, linear+angular
//! velocity, force+torque and acceleration pairs, each relocatable and
//! rotatable so they can be moved between reference points and frames.

mod acceleration_moments;
mod force_moments;
mod mass_moments;
mod velocity_moments;

pub use acceleration_moments::AccelerationMoments;
pub use force_moments::ForceMoments;
pub use mass_moments::MassMoments;
pub use velocity_moments::VelocityMoments;
