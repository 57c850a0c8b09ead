use crate::aero::{Atmosphere, Wing};
use crate::constraints::{
    AngularLimitsConstraint, Constraint, ConstraintKind, FixedConstraint, FramePrecalculation,
    HingeConstraint, HingeData, HingeGeometry, LinearLimitsConstraint, SliderConstraint,
    SliderData, SliderGeometry,
};
use crate::error::SimulationError;

use super::{Body, Group};

/// Generational handle to a body stored in a [`System`].
///
/// A removed body's slot may be reused; the generation counter makes handles
/// to the old occupant stale instead of silently aliasing the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId {
    index: u32,
    generation: u32,
}

impl BodyId {
    /// A handle that never resolves. Placeholder for unbound slots.
    pub fn invalid() -> Self {
        Self {
            index: u32::MAX,
            generation: u32::MAX,
        }
    }
}

/// Handle to a joint precalculation. Joints are never removed, so a plain
/// index suffices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointId(u32);

impl JointId {
    /// A handle that never resolves.
    pub fn invalid() -> Self {
        Self(u32::MAX)
    }
}

/// Handle to a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(u32);

/// Handle to a wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WingId(u32);

/// Joint store entry: the per-tick geometry cache for one joint, tagged by
/// joint kind so constraints can be validated against it.
#[derive(Debug)]
pub enum JointPrecalculation {
    Hinge(FramePrecalculation<HingeGeometry>),
    Slider(FramePrecalculation<SliderGeometry>),
}

impl JointPrecalculation {
    pub fn body_ids(&self) -> (BodyId, BodyId) {
        match self {
            JointPrecalculation::Hinge(joint) => joint.body_ids(),
            JointPrecalculation::Slider(joint) => joint.body_ids(),
        }
    }

    /// Mark the cached snapshot stale at the tick boundary.
    pub fn reset(&mut self) {
        match self {
            JointPrecalculation::Hinge(joint) => joint.reset(),
            JointPrecalculation::Slider(joint) => joint.reset(),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            JointPrecalculation::Hinge(_) => "hinge",
            JointPrecalculation::Slider(_) => "slider",
        }
    }
}

/// Copy of one joint's world-space snapshot for this tick, handed to the
/// solver so it can evaluate constraints without holding a borrow on the
/// joint store.
#[derive(Debug, Clone, Copy)]
pub(crate) enum JointData {
    Hinge(HingeData),
    Slider(SliderData),
}

#[derive(Debug)]
struct BodySlot {
    generation: u32,
    body: Option<Body>,
}

fn resolve(bodies: &[BodySlot], id: BodyId) -> Result<&Body, SimulationError> {
    bodies
        .get(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.body.as_ref())
        .ok_or(SimulationError::StaleBodyHandle(id))
}

fn resolve_mut(bodies: &mut [BodySlot], id: BodyId) -> Result<&mut Body, SimulationError> {
    bodies
        .get_mut(id.index as usize)
        .filter(|slot| slot.generation == id.generation)
        .and_then(|slot| slot.body.as_mut())
        .ok_or(SimulationError::StaleBodyHandle(id))
}

/// The simulated system: bodies, joints, constraints, force generators and
/// the atmosphere they fly in.
///
/// Owns everything; the solver borrows it per tick. Handles are validated on
/// every access, so a stale `BodyId` is an error rather than undefined
/// aliasing.
#[derive(Default)]
pub struct System {
    bodies: Vec<BodySlot>,
    free_slots: Vec<u32>,
    /// Bodies participating in mutual n-body gravitation
    pub(crate) gravitating: Vec<BodyId>,
    pub(crate) joints: Vec<JointPrecalculation>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) wings: Vec<Wing>,
    atmosphere: Option<Box<dyn Atmosphere>>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live bodies.
    pub fn n_bodies(&self) -> usize {
        self.bodies.len() - self.free_slots.len()
    }

    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Store a body and return its handle.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.bodies[index as usize];
                slot.body = Some(body);
                BodyId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.bodies.len() as u32;
                self.bodies.push(BodySlot {
                    generation: 0,
                    body: Some(body),
                });
                BodyId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Store a body that both sources and feels n-body gravitation.
    pub fn add_gravitating_body(&mut self, body: Body) -> BodyId {
        let id = self.add_body(body);
        self.gravitating.push(id);
        id
    }

    /// Remove a body, returning it. The slot's generation is bumped so the
    /// handle (and any copies of it) become stale. Joints and constraints
    /// referring to the body stop contributing forces.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Body, SimulationError> {
        let slot = self
            .bodies
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .ok_or(SimulationError::StaleBodyHandle(id))?;
        let body = slot
            .body
            .take()
            .ok_or(SimulationError::StaleBodyHandle(id))?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free_slots.push(id.index);
        self.gravitating.retain(|g| *g != id);

        Ok(body)
    }

    pub fn body(&self, id: BodyId) -> Result<&Body, SimulationError> {
        self.bodies
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_ref())
            .ok_or(SimulationError::StaleBodyHandle(id))
    }

    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut Body, SimulationError> {
        self.bodies
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_mut())
            .ok_or(SimulationError::StaleBodyHandle(id))
    }

    /// Iterate over all live bodies.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    pub(crate) fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.bodies
            .iter_mut()
            .filter_map(|slot| slot.body.as_mut())
    }

    /// Mutable access to two distinct bodies at once.
    pub(crate) fn body_pair_mut(
        &mut self,
        first: BodyId,
        second: BodyId,
    ) -> Result<(&mut Body, &mut Body), SimulationError> {
        if first.index == second.index {
            return Err(SimulationError::InvalidParameter(
                "body pair must name two distinct bodies".into(),
            ));
        }

        // Validate generations before splitting.
        self.body(first)?;
        self.body(second)?;

        let (low, high, swapped) = if first.index < second.index {
            (first, second, false)
        } else {
            (second, first, true)
        };

        let (head, tail) = self.bodies.split_at_mut(high.index as usize);
        let low_body = head[low.index as usize]
            .body
            .as_mut()
            .ok_or(SimulationError::StaleBodyHandle(low))?;
        let high_body = tail[0]
            .body
            .as_mut()
            .ok_or(SimulationError::StaleBodyHandle(high))?;

        if swapped {
            Ok((high_body, low_body))
        } else {
            Ok((low_body, high_body))
        }
    }

    /// Create a hinge joint between two bodies.
    pub fn add_hinge(
        &mut self,
        body_1: BodyId,
        body_2: BodyId,
        geometry: HingeGeometry,
    ) -> Result<JointId, SimulationError> {
        self.body(body_1)?;
        self.body(body_2)?;

        let id = JointId(self.joints.len() as u32);
        self.joints.push(JointPrecalculation::Hinge(
            FramePrecalculation::new(body_1, body_2, geometry),
        ));
        Ok(id)
    }

    /// Create a slider joint between two bodies.
    pub fn add_slider(
        &mut self,
        body_1: BodyId,
        body_2: BodyId,
        geometry: SliderGeometry,
    ) -> Result<JointId, SimulationError> {
        self.body(body_1)?;
        self.body(body_2)?;

        let id = JointId(self.joints.len() as u32);
        self.joints.push(JointPrecalculation::Slider(
            FramePrecalculation::new(body_1, body_2, geometry),
        ));
        Ok(id)
    }

    pub fn joint(&self, id: JointId) -> Result<&JointPrecalculation, SimulationError> {
        self.joints
            .get(id.0 as usize)
            .ok_or(SimulationError::UnknownJoint(id))
    }

    /// This tick's snapshot of a joint's relative geometry, computed on first
    /// access, plus the two body handles it connects.
    pub(crate) fn joint_data(
        &mut self,
        id: JointId,
    ) -> Result<(JointData, BodyId, BodyId), SimulationError> {
        let bodies = &self.bodies;
        let joint = self
            .joints
            .get_mut(id.0 as usize)
            .ok_or(SimulationError::UnknownJoint(id))?;
        let (id_1, id_2) = joint.body_ids();
        let body_1 = resolve(bodies, id_1)?;
        let body_2 = resolve(bodies, id_2)?;

        let data = match joint {
            JointPrecalculation::Hinge(joint) => JointData::Hinge(*joint.data(body_1, body_2)),
            JointPrecalculation::Slider(joint) => JointData::Slider(*joint.data(body_1, body_2)),
        };

        Ok((data, id_1, id_2))
    }

    /// Store a constraint, checking that its joint exists and is of the kind
    /// the constraint expects.
    pub fn add_constraint(&mut self, constraint: Constraint) -> Result<ConstraintId, SimulationError> {
        let joint = self.joint(constraint.kind().joint())?;

        let expected = match constraint.kind() {
            ConstraintKind::Fixed(_)
            | ConstraintKind::Hinge(_)
            | ConstraintKind::AngularLimits(_) => "hinge",
            ConstraintKind::Slider(_) | ConstraintKind::LinearLimits(_) => "slider",
        };
        if joint.kind_name() != expected {
            return Err(SimulationError::JointKindMismatch { expected });
        }

        let id = ConstraintId(self.constraints.len() as u32);
        self.constraints.push(constraint);
        Ok(id)
    }

    /// Weld the two bodies of a hinge joint together.
    pub fn add_fixed_constraint(&mut self, joint: JointId) -> Result<ConstraintId, SimulationError> {
        self.add_constraint(Constraint::new(ConstraintKind::Fixed(FixedConstraint::new(
            joint,
        ))))
    }

    /// Constrain a hinge joint to its anchor and axis.
    pub fn add_hinge_constraint(&mut self, joint: JointId) -> Result<ConstraintId, SimulationError> {
        self.add_constraint(Constraint::new(ConstraintKind::Hinge(HingeConstraint::new(
            joint,
        ))))
    }

    /// Constrain a slider joint to its axis and orientation lock.
    pub fn add_slider_constraint(
        &mut self,
        joint: JointId,
    ) -> Result<ConstraintId, SimulationError> {
        self.add_constraint(Constraint::new(ConstraintKind::Slider(
            SliderConstraint::new(joint),
        )))
    }

    /// Limit a hinge joint's twist angle to `[minimum, maximum]` radians.
    pub fn add_angular_limits(
        &mut self,
        joint: JointId,
        minimum: Option<f64>,
        maximum: Option<f64>,
    ) -> Result<ConstraintId, SimulationError> {
        self.add_constraint(Constraint::new(ConstraintKind::AngularLimits(
            AngularLimitsConstraint::new(joint, minimum, maximum),
        )))
    }

    /// Limit a slider joint's travel to `[minimum, maximum]` meters.
    pub fn add_linear_limits(
        &mut self,
        joint: JointId,
        minimum: Option<f64>,
        maximum: Option<f64>,
    ) -> Result<ConstraintId, SimulationError> {
        self.add_constraint(Constraint::new(ConstraintKind::LinearLimits(
            LinearLimitsConstraint::new(joint, minimum, maximum),
        )))
    }

    pub fn constraint(&self, id: ConstraintId) -> Result<&Constraint, SimulationError> {
        self.constraints
            .get(id.0 as usize)
            .ok_or(SimulationError::UnknownConstraint(id))
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Result<&mut Constraint, SimulationError> {
        self.constraints
            .get_mut(id.0 as usize)
            .ok_or(SimulationError::UnknownConstraint(id))
    }

    /// Set the Baumgarte stabilization factor on every stored constraint.
    pub fn set_baumgarte_factor(&mut self, factor: f64) {
        for constraint in &mut self.constraints {
            constraint.set_baumgarte_factor(factor);
        }
    }

    /// Store a wing. Its body handle must resolve.
    pub fn add_wing(&mut self, wing: Wing) -> Result<WingId, SimulationError> {
        self.body(wing.body())?;

        let id = WingId(self.wings.len() as u32);
        self.wings.push(wing);
        Ok(id)
    }

    pub fn wing(&self, id: WingId) -> Result<&Wing, SimulationError> {
        self.wings
            .get(id.0 as usize)
            .ok_or(SimulationError::UnknownWing(id))
    }

    pub fn wing_mut(&mut self, id: WingId) -> Result<&mut Wing, SimulationError> {
        self.wings
            .get_mut(id.0 as usize)
            .ok_or(SimulationError::UnknownWing(id))
    }

    /// Run every wing against the atmosphere, accumulating impulses on the
    /// wings' bodies. Without an atmosphere the wings see no air and stay
    /// silent.
    pub(crate) fn run_wings(&mut self, dt: f64) {
        let Some(atmosphere) = self.atmosphere.as_deref() else {
            return;
        };

        let bodies = &mut self.bodies;
        for wing in &mut self.wings {
            let Ok(body) = resolve_mut(bodies, wing.body()) else {
                continue;
            };
            wing.update_external_forces(body, atmosphere, dt);
        }
    }

    /// Install the atmosphere wings sample. Without one, wings generate no
    /// forces.
    pub fn set_atmosphere(&mut self, atmosphere: Box<dyn Atmosphere>) {
        self.atmosphere = Some(atmosphere);
    }

    pub fn atmosphere(&self) -> Option<&dyn Atmosphere> {
        self.atmosphere.as_deref()
    }

    /// Start a body group bound to this system.
    pub fn group(&mut self, label: impl Into<String>) -> Group<'_> {
        Group::new(self, label)
    }

    /// Sum of all bodies' translational kinetic energy [J]
    pub fn translational_kinetic_energy(&self) -> f64 {
        self.bodies()
            .map(|(_, body)| body.translational_kinetic_energy())
            .sum()
    }

    /// Sum of all bodies' rotational kinetic energy [J]
    pub fn rotational_kinetic_energy(&self) -> f64 {
        self.bodies()
            .map(|(_, body)| body.rotational_kinetic_energy())
            .sum()
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.translational_kinetic_energy() + self.rotational_kinetic_energy()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("bodies", &self.n_bodies())
            .field("joints", &self.joints.len())
            .field("constraints", &self.constraints.len())
            .field("wings", &self.wings.len())
            .field("atmosphere", &self.atmosphere.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::MassMoments;
    use nalgebra::Vector3;
    use pretty_assertions::assert_eq;

    fn unit_cube() -> Body {
        Body::new(MassMoments::cuboid(1.0, Vector3::new(1.0, 1.0, 1.0))).unwrap()
    }

    #[test]
    fn test_removed_body_handle_goes_stale() {
        let mut system = System::new();
        let id = system.add_body(unit_cube());
        assert!(system.body(id).is_ok());

        system.remove_body(id).unwrap();
        assert!(matches!(
            system.body(id),
            Err(SimulationError::StaleBodyHandle(_))
        ));

        // The slot is reused with a fresh generation; the old handle stays
        // stale.
        let replacement = system.add_body(unit_cube());
        assert!(system.body(replacement).is_ok());
        assert!(system.body(id).is_err());
        assert_eq!(system.n_bodies(), 1);
    }

    #[test]
    fn test_constraint_kind_must_match_joint_kind() {
        let mut system = System::new();
        let a = system.add_body(unit_cube());
        let mut second = unit_cube();
        second.move_to(Vector3::new(2.0, 0.0, 0.0));
        let b = system.add_body(second);

        let hinge = HingeGeometry::about_world(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 1.0),
            system.body(a).unwrap(),
            system.body(b).unwrap(),
        )
        .unwrap();
        let joint = system.add_hinge(a, b, hinge).unwrap();

        assert!(system.add_angular_limits(joint, Some(-0.1), Some(0.1)).is_ok());
        assert!(matches!(
            system.add_linear_limits(joint, Some(0.0), Some(1.0)),
            Err(SimulationError::JointKindMismatch { expected: "slider" })
        ));
    }

    #[test]
    fn test_body_pair_mut_resolves_both_orders() {
        let mut system = System::new();
        let a = system.add_body(unit_cube());
        let b = system.add_body(unit_cube());

        {
            let (first, second) = system.body_pair_mut(a, b).unwrap();
            first.move_to(Vector3::new(-1.0, 0.0, 0.0));
            second.move_to(Vector3::new(1.0, 0.0, 0.0));
        }

        let (second, first) = system.body_pair_mut(b, a).unwrap();
        assert_eq!(second.position().x, 1.0);
        assert_eq!(first.position().x, -1.0);
    }
}
