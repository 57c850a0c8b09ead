use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::MassMoments;
use crate::error::SimulationError;

use super::{Body, BodyId, System};

/// A named set of bodies moved and measured together.
///
/// Non-owning: the group records handles and borrows the system, so bodies
/// stay in the system's arena and can belong to several groups. Useful for
/// placing an assembled mechanism (rig frame, specimen, counterweights) as
/// one piece.
#[derive(Debug)]
pub struct Group<'a> {
    system: &'a mut System,
    label: String,
    members: Vec<BodyId>,
}

impl<'a> Group<'a> {
    pub(crate) fn new(system: &'a mut System, label: impl Into<String>) -> Self {
        Self {
            system,
            label: label.into(),
            members: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn members(&self) -> &[BodyId] {
        &self.members
    }

    /// Add a body to the system and record it as a member.
    pub fn add(&mut self, body: Body) -> BodyId {
        let id = self.system.add_body(body);
        self.members.push(id);
        id
    }

    /// Add a gravitating body to the system and record it as a member.
    pub fn add_gravitating(&mut self, body: Body) -> BodyId {
        let id = self.system.add_gravitating_body(body);
        self.members.push(id);
        id
    }

    /// Record an existing body as a member.
    pub fn with(&mut self, id: BodyId) -> Result<&mut Self, SimulationError> {
        self.system.body(id)?;
        self.members.push(id);
        Ok(self)
    }

    /// Translate every member by the given world-frame vector.
    pub fn translate(&mut self, translation: &Vector3<f64>) -> Result<(), SimulationError> {
        for &id in &self.members {
            self.system.body_mut(id)?.translate(translation);
        }
        Ok(())
    }

    /// Rotate every member rigidly about a world-frame point.
    pub fn rotate_about(
        &mut self,
        point: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
    ) -> Result<(), SimulationError> {
        for &id in &self.members {
            self.system.body_mut(id)?.rotate_about(point, rotation);
        }
        Ok(())
    }

    /// Rotate every member rigidly about the world origin.
    pub fn rotate_about_world_origin(
        &mut self,
        rotation: &UnitQuaternion<f64>,
    ) -> Result<(), SimulationError> {
        self.rotate_about(&Vector3::zeros(), rotation)
    }

    /// Combined mass moments of all members about the world origin.
    ///
    /// Each body's shape is rotated into the world frame and relocated to its
    /// world placement, then the parts are parallel-axis composed by
    /// MassMoments addition.
    pub fn mass_moments(&self) -> Result<MassMoments, SimulationError> {
        let mut total = MassMoments::zero();

        for &id in &self.members {
            let body = self.system.body(id)?;
            total += body
                .shape()
                .rotated(&body.orientation())
                .at_arm(&body.position());
        }

        Ok(total)
    }

    /// Sum of member translational kinetic energies [J]
    pub fn translational_kinetic_energy(&self) -> Result<f64, SimulationError> {
        let mut total = 0.0;
        for &id in &self.members {
            total += self.system.body(id)?.translational_kinetic_energy();
        }
        Ok(total)
    }

    /// Sum of member rotational kinetic energies [J]
    pub fn rotational_kinetic_energy(&self) -> Result<f64, SimulationError> {
        let mut total = 0.0;
        for &id in &self.members {
            total += self.system.body(id)?.rotational_kinetic_energy();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn point_mass_body(mass: f64, at: Vector3<f64>) -> Body {
        // Point masses have no invertible inertia of their own, so give each
        // a small cuboid centered at the target position.
        let mut body = Body::new(MassMoments::cuboid(mass, Vector3::new(1e-3, 1e-3, 1e-3)))
            .unwrap();
        body.move_to(at);
        body
    }

    #[test]
    fn test_mass_moments_compose_with_parallel_axis() {
        let mut system = System::new();
        let mut group = system.group("test masses");
        group.add(point_mass_body(1.0, Vector3::new(1.0, 0.0, 0.0)));
        group.add(point_mass_body(1.0, Vector3::new(-1.0, 0.0, 0.0)));

        let moments = group.mass_moments().unwrap();
        assert_relative_eq!(moments.mass(), 2.0);
        assert_relative_eq!(moments.center_of_mass(), Vector3::zeros(), epsilon = 1e-9);

        // Two unit masses at ±1 m on x contribute 2 kg·m² about y and z at
        // the origin and nothing about x (up to the tiny cuboid terms).
        let tensor = moments.inertia_tensor();
        assert_relative_eq!(tensor[(1, 1)], 2.0, epsilon = 1e-6);
        assert_relative_eq!(tensor[(2, 2)], 2.0, epsilon = 1e-6);
        assert!(tensor[(0, 0)] < 1e-6);
    }

    #[test]
    fn test_rigid_rotation_moves_all_members() {
        let mut system = System::new();
        let mut group = system.group("pair");
        let a = group.add(point_mass_body(1.0, Vector3::new(1.0, 0.0, 0.0)));
        let b = group.add(point_mass_body(1.0, Vector3::new(2.0, 0.0, 0.0)));

        let quarter_turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        group.rotate_about_world_origin(&quarter_turn).unwrap();

        assert_relative_eq!(
            system.body(a).unwrap().position(),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            system.body(b).unwrap().position(),
            Vector3::new(0.0, 2.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_translate_moves_all_members() {
        let mut system = System::new();
        let mut group = system.group("pair");
        let a = group.add(point_mass_body(2.0, Vector3::zeros()));
        group.translate(&Vector3::new(0.0, 0.0, 5.0)).unwrap();

        assert_relative_eq!(
            system.body(a).unwrap().position(),
            Vector3::new(0.0, 0.0, 5.0)
        );
    }
}
