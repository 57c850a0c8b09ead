use nalgebra::{UnitQuaternion, Vector3};

use crate::constraints::precalculation::JointGeometry;
use crate::error::SimulationError;
use crate::math::non_colinear_axis;
use crate::rigid_body::Body;

/// World-space snapshot of a hinge joint, recomputed once per tick.
#[derive(Debug, Clone, Copy)]
pub struct HingeData {
    /// Body positions [m]
    pub x1: Vector3<f64>,
    pub x2: Vector3<f64>,
    /// World-space arm vectors from each body to its anchor [m]
    pub r1: Vector3<f64>,
    pub r2: Vector3<f64>,
    /// Anchor separation: `x2 + r2 - x1 - r1` [m]
    pub u: Vector3<f64>,
    /// Normalized hinge axis as seen from each body
    pub a1: Vector3<f64>,
    pub a2: Vector3<f64>,
    /// Two unit vectors orthogonal to `a1` and to each other
    pub t1: Vector3<f64>,
    pub t2: Vector3<f64>,
    /// Axis-angle orientation error since the reference orientations [rad]
    pub rotation_error: Vector3<f64>,
    /// Signed twist of body 2 relative to body 1 about `a1` [rad]
    pub angle: f64,
}

/// Hinge joint geometry: anchors and axis stored in each body's local frame,
/// with the bodies' orientations at joint creation kept as the zero-twist
/// reference.
#[derive(Debug, Clone)]
pub struct HingeGeometry {
    anchor_1: Vector3<f64>,
    anchor_2: Vector3<f64>,
    axis_1: Vector3<f64>,
    axis_2: Vector3<f64>,
    reference_orientation_1: UnitQuaternion<f64>,
    reference_orientation_2: UnitQuaternion<f64>,
}

const MIN_AXIS_LENGTH: f64 = 1e-9;

impl HingeGeometry {
    /// Create a hinge with the anchor and a second point on the hinge axis
    /// given in body-1 local coordinates.
    pub fn about_body_1(
        anchor: Vector3<f64>,
        axis_point: Vector3<f64>,
        body_1: &Body,
        body_2: &Body,
    ) -> Result<Self, SimulationError> {
        let axis = normalized_axis(&(axis_point - anchor))?;
        let world_anchor = body_1.position() + body_1.orientation() * anchor;
        let world_axis = body_1.orientation() * axis;

        Ok(Self::from_world_parts(world_anchor, world_axis, body_1, body_2))
    }

    /// Create a hinge with the anchor and axis point given in body-2 local
    /// coordinates.
    pub fn about_body_2(
        anchor: Vector3<f64>,
        axis_point: Vector3<f64>,
        body_1: &Body,
        body_2: &Body,
    ) -> Result<Self, SimulationError> {
        let axis = normalized_axis(&(axis_point - anchor))?;
        let world_anchor = body_2.position() + body_2.orientation() * anchor;
        let world_axis = body_2.orientation() * axis;

        Ok(Self::from_world_parts(world_anchor, world_axis, body_1, body_2))
    }

    /// Create a hinge with the anchor and axis point given in world
    /// coordinates.
    pub fn about_world(
        anchor: Vector3<f64>,
        axis_point: Vector3<f64>,
        body_1: &Body,
        body_2: &Body,
    ) -> Result<Self, SimulationError> {
        let axis = normalized_axis(&(axis_point - anchor))?;

        Ok(Self::from_world_parts(anchor, axis, body_1, body_2))
    }

    fn from_world_parts(
        world_anchor: Vector3<f64>,
        world_axis: Vector3<f64>,
        body_1: &Body,
        body_2: &Body,
    ) -> Self {
        let inv_1 = body_1.orientation().inverse();
        let inv_2 = body_2.orientation().inverse();

        Self {
            anchor_1: inv_1 * (world_anchor - body_1.position()),
            anchor_2: inv_2 * (world_anchor - body_2.position()),
            axis_1: inv_1 * world_axis,
            axis_2: inv_2 * world_axis,
            reference_orientation_1: body_1.orientation(),
            reference_orientation_2: body_2.orientation(),
        }
    }

    /// Anchor point in body-1 local coordinates
    pub fn body_1_anchor(&self) -> Vector3<f64> {
        self.anchor_1
    }

    /// Anchor point in body-2 local coordinates
    pub fn body_2_anchor(&self) -> Vector3<f64> {
        self.anchor_2
    }
}

impl JointGeometry for HingeGeometry {
    type Data = HingeData;

    fn calculate(&self, body_1: &Body, body_2: &Body) -> HingeData {
        let x1 = body_1.position();
        let x2 = body_2.position();
        let r1 = body_1.orientation() * self.anchor_1;
        let r2 = body_2.orientation() * self.anchor_2;
        let u = x2 + r2 - x1 - r1;
        let a1 = body_1.orientation() * self.axis_1;
        let a2 = body_2.orientation() * self.axis_2;
        let t1 = a1.cross(&non_colinear_axis(&a1)).normalize();
        let t2 = a1.cross(&t1).normalize();

        let rotation_error = rotation_error(
            &self.reference_orientation_1,
            &self.reference_orientation_2,
            body_1,
            body_2,
        );
        // Only the component about the hinge axis counts as twist; off-axis
        // tilt is the alignment constraint's business.
        let angle = rotation_error.dot(&a1);

        HingeData {
            x1,
            x2,
            r1,
            r2,
            u,
            a1,
            a2,
            t1,
            t2,
            rotation_error,
            angle,
        }
    }
}

fn normalized_axis(axis: &Vector3<f64>) -> Result<Vector3<f64>, SimulationError> {
    let norm = axis.norm();

    if norm < MIN_AXIS_LENGTH {
        Err(SimulationError::DegenerateJointAxis)
    } else {
        Ok(axis / norm)
    }
}

/// Axis-angle vector of how far body 2 has rotated relative to body 1 since
/// the reference orientations were captured.
///
/// When the bodies are nearly co-oriented no rotation axis can be extracted;
/// the error is then zero rather than the quotient of two near-zero
/// magnitudes.
pub(crate) fn rotation_error(
    reference_1: &UnitQuaternion<f64>,
    reference_2: &UnitQuaternion<f64>,
    body_1: &Body,
    body_2: &Body,
) -> Vector3<f64> {
    let delta_1 = body_1.orientation() * reference_1.inverse();
    let delta_2 = body_2.orientation() * reference_2.inverse();
    let error = delta_1.inverse() * delta_2;

    match error.axis_angle() {
        Some((axis, angle)) => axis.into_inner() * angle,
        None => Vector3::zeros(),
    }
}
