use thiserror::Error;

use crate::rigid_body::{BodyId, ConstraintId, JointId, WingId};

/// Errors reported while assembling or querying a simulation.
///
/// Per-tick evaluation never fails: degenerate runtime configurations
/// (singular effective-mass matrices, near-parallel axes) are treated as
/// inactive constraints instead of errors.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Degenerate mass moments: {0}")]
    DegenerateMassMoments(String),

    #[error("Degenerate joint axis (zero length)")]
    DegenerateJointAxis,

    #[error("Stale body handle: {0:?}")]
    StaleBodyHandle(BodyId),

    #[error("Unknown joint handle: {0:?}")]
    UnknownJoint(JointId),

    #[error("Unknown constraint handle: {0:?}")]
    UnknownConstraint(ConstraintId),

    #[error("Unknown wing handle: {0:?}")]
    UnknownWing(WingId),

    #[error("Joint kind mismatch: expected a {expected} joint")]
    JointKindMismatch { expected: &'static str },

    #[error("Malformed coefficient field: {0}")]
    MalformedCoefficientField(String),
}
