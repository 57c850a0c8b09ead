use nalgebra::{UnitQuaternion, Vector3};

use crate::constraints::hinge::rotation_error;
use crate::constraints::precalculation::JointGeometry;
use crate::error::SimulationError;
use crate::math::non_colinear_axis;
use crate::rigid_body::Body;

/// World-space snapshot of a slider joint, recomputed once per tick.
#[derive(Debug, Clone, Copy)]
pub struct SliderData {
    /// Body positions [m]
    pub x1: Vector3<f64>,
    pub x2: Vector3<f64>,
    /// World-space arm vectors from each body to its anchor [m]
    pub r1: Vector3<f64>,
    pub r2: Vector3<f64>,
    /// Anchor separation: `x2 + r2 - x1 - r1` [m]
    pub u: Vector3<f64>,
    /// Normalized slide axis as seen from body 1
    pub a: Vector3<f64>,
    /// Two unit vectors orthogonal to `a` and to each other
    pub t1: Vector3<f64>,
    pub t2: Vector3<f64>,
    /// Signed travel of body 2 along the axis [m]
    pub distance: f64,
    /// Axis-angle orientation error used by the rotational lock rows [rad]
    pub rotation_error: Vector3<f64>,
}

/// Slider (prismatic) joint geometry: anchors and slide axis stored in each
/// body's local frame, with reference orientations captured for the
/// rotational lock.
#[derive(Debug, Clone)]
pub struct SliderGeometry {
    anchor_1: Vector3<f64>,
    anchor_2: Vector3<f64>,
    axis_1: Vector3<f64>,
    reference_orientation_1: UnitQuaternion<f64>,
    reference_orientation_2: UnitQuaternion<f64>,
}

const MIN_AXIS_LENGTH: f64 = 1e-9;

impl SliderGeometry {
    /// Create a slider with the anchor and a second point on the slide axis
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

    /// Create a slider with the anchor and axis point given in body-2 local
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

    /// Create a slider with the anchor and axis point given in world
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
            reference_orientation_1: body_1.orientation(),
            reference_orientation_2: body_2.orientation(),
        }
    }
}

impl JointGeometry for SliderGeometry {
    type Data = SliderData;

    fn calculate(&self, body_1: &Body, body_2: &Body) -> SliderData {
        let x1 = body_1.position();
        let x2 = body_2.position();
        let r1 = body_1.orientation() * self.anchor_1;
        let r2 = body_2.orientation() * self.anchor_2;
        let u = x2 + r2 - x1 - r1;
        let a = body_1.orientation() * self.axis_1;
        let t1 = a.cross(&non_colinear_axis(&a)).normalize();
        let t2 = a.cross(&t1).normalize();

        SliderData {
            x1,
            x2,
            r1,
            r2,
            u,
            a,
            t1,
            t2,
            distance: u.dot(&a),
            rotation_error: rotation_error(
                &self.reference_orientation_1,
                &self.reference_orientation_2,
                body_1,
                body_2,
            ),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::MassMoments;
    use approx::assert_relative_eq;

    fn body_at(position: Vector3<f64>) -> Body {
        let mut body =
            Body::new(MassMoments::cuboid(1.0, Vector3::new(1.0, 1.0, 1.0))).unwrap();
        body.move_to(position);
        body
    }

    #[test]
    fn test_distance_is_signed_along_the_axis() {
        let body_1 = body_at(Vector3::zeros());
        let mut body_2 = body_at(Vector3::zeros());

        let geometry = SliderGeometry::about_body_1(
            Vector3::zeros(),
            Vector3::new(1.0, 0.0, 0.0),
            &body_1,
            &body_2,
        )
        .unwrap();

        body_2.translate(&Vector3::new(0.75, 0.0, 0.0));
        let data = geometry.calculate(&body_1, &body_2);
        assert_relative_eq!(data.distance, 0.75, epsilon = 1e-12);

        body_2.translate(&Vector3::new(-1.25, 0.0, 0.0));
        let data = geometry.calculate(&body_1, &body_2);
        assert_relative_eq!(data.distance, -0.5, epsilon = 1e-12);
        // Off-axis travel does not count as distance.
        assert_relative_eq!(data.rotation_error, Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_axis_is_rejected() {
        let body_1 = body_at(Vector3::zeros());
        let body_2 = body_at(Vector3::zeros());

        let anchor = Vector3::new(0.5, 0.0, 0.0);
        let result = SliderGeometry::about_world(anchor, anchor, &body_1, &body_2);
        assert!(matches!(result, Err(SimulationError::DegenerateJointAxis)));
    }
}
