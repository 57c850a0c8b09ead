//! Bodies, the system that owns them, and the impulse solver that evolves
//! them.

pub mod body;
pub mod group;
pub mod solver;
pub mod system;

pub use body::{Body, IterationCache};
pub use group::Group;
pub use solver::{
    Evolver, EvolutionDetails, ImpulseSolver, Limits, GRAVITATIONAL_CONSTANT,
};
pub use system::{BodyId, ConstraintId, JointId, JointPrecalculation, System, WingId};
