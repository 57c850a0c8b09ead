use log::{debug, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintForces, ConstraintKind};
use crate::dynamics::{AccelerationMoments, ForceMoments, VelocityMoments};

use super::system::JointData;
use super::{Body, BodyId, System};

/// Gravitational constant [m³/(kg·s²)]
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// Separations below this are clamped before computing gravitation, so two
/// nearly coincident bodies do not fling each other away under quantized
/// time [m].
const MIN_GRAVITATION_DISTANCE: f64 = 1e-9;

/// Below this the separation direction is unrecoverable and an arbitrary
/// fixed axis is used instead [m].
const ZERO_GRAVITATION_DISTANCE: f64 = 1e-15;

/// Per-body caps applied before integration, as a blunt guard against a
/// diverging solve throwing bodies to infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum force magnitude [N]
    pub max_force: Option<f64>,
    /// Maximum torque magnitude [N⋅m]
    pub max_torque: Option<f64>,
    /// Maximum velocity magnitude [m/s]
    pub max_velocity: Option<f64>,
    /// Maximum angular velocity magnitude [rad/s]
    pub max_angular_velocity: Option<f64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_force: Some(1e3),
            max_torque: Some(1e3),
            max_velocity: Some(1e3),
            max_angular_velocity: Some(1e3),
        }
    }
}

impl Limits {
    fn clamp_vector(vector: Vector3<f64>, limit: Option<f64>) -> Vector3<f64> {
        match limit {
            Some(limit) if vector.norm() > limit => vector.normalize() * limit,
            _ => vector,
        }
    }

    fn clamp_forces(&self, force_moments: ForceMoments) -> ForceMoments {
        ForceMoments::new(
            Self::clamp_vector(force_moments.force(), self.max_force),
            Self::clamp_vector(force_moments.torque(), self.max_torque),
        )
    }

    fn clamp_velocities(&self, body: &mut Body) {
        let clamped = VelocityMoments::new(
            Self::clamp_vector(body.velocity(), self.max_velocity),
            Self::clamp_vector(body.angular_velocity(), self.max_angular_velocity),
        );
        body.set_velocity_moments(clamped);
    }
}

/// Outcome of one solver tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvolutionDetails {
    /// Gauss–Seidel iterations actually run
    pub iterations_run: usize,
    /// True if the force deltas fell below the required precision before the
    /// iteration cap
    pub converged: bool,
}

/// Sequential-impulse constraint solver.
///
/// Per tick: refreshes the per-body iteration caches, accumulates
/// gravitation and force-generator impulses, runs Gauss–Seidel iterations
/// over all constraints against working velocities, then integrates each
/// body once with the summed forces. The per-tick path is Result-free;
/// constraints whose bodies have been removed simply stop contributing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpulseSolver {
    /// Gauss–Seidel iteration cap per tick
    pub max_iterations: usize,
    /// Convergence threshold on the largest per-iteration force delta [N]
    pub required_force_precision: f64,
    /// Convergence threshold on the largest per-iteration torque delta [N⋅m]
    pub required_torque_precision: f64,
    /// Optional per-body force/velocity caps
    pub limits: Option<Limits>,
    #[serde(skip)]
    processed_frames: u64,
}

impl Default for ImpulseSolver {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            required_force_precision: 1e-6,
            required_torque_precision: 1e-6,
            limits: None,
            processed_frames: 0,
        }
    }
}

impl ImpulseSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Number of ticks processed so far.
    pub fn processed_frames(&self) -> u64 {
        self.processed_frames
    }

    /// Advance the system by one tick of length `dt` seconds.
    pub fn evolve(&mut self, system: &mut System, dt: f64) -> EvolutionDetails {
        self.reset_caches(system);
        Self::update_mass_operators(system);
        Self::accumulate_gravitation(system);
        Self::run_force_generators(system, dt);
        let details = self.solve_constraints(system, dt);
        self.integrate(system, dt);
        self.processed_frames += 1;
        details
    }

    fn reset_caches(&self, system: &mut System) {
        for body in system.bodies_mut() {
            let velocity = body.velocity_moments();
            body.iteration_mut().reset(velocity);
        }
        for joint in &mut system.joints {
            joint.reset();
        }
        for constraint in &mut system.constraints {
            constraint.previous_forces = None;
        }
    }

    fn update_mass_operators(system: &mut System) {
        for body in system.bodies_mut() {
            let rotation = body.orientation().to_rotation_matrix().into_inner();
            let inv_i = rotation * body.inverse_inertia_body() * rotation.transpose();
            let inv_m = 1.0 / body.shape().mass();

            let iteration = body.iteration_mut();
            iteration.inv_m = inv_m;
            iteration.inv_i = inv_i;
        }
    }

    /// Mutual n-body gravitation: gravitating bodies attract each other, and
    /// each gravitating body also pulls every ordinary body.
    fn accumulate_gravitation(system: &mut System) {
        let gravitating = system.gravitating.clone();

        for (i, &first) in gravitating.iter().enumerate() {
            for &second in &gravitating[i + 1..] {
                Self::attract(system, first, second);
            }
        }

        let ordinary: Vec<BodyId> = system
            .bodies()
            .map(|(id, _)| id)
            .filter(|id| !gravitating.contains(id))
            .collect();
        for &first in &gravitating {
            for &second in &ordinary {
                Self::attract(system, first, second);
            }
        }
    }

    fn attract(system: &mut System, first: BodyId, second: BodyId) {
        let Ok((body_1, body_2)) = system.body_pair_mut(first, second) else {
            return;
        };

        let force = Self::gravitational_force(body_1, body_2);
        body_1.iteration_mut().gravitational_forces += force;
        body_2.iteration_mut().gravitational_forces += -force;
    }

    /// Gravitational pull of `body_2` on `body_1`, with the separation
    /// clamped to a minimum distance.
    fn gravitational_force(body_1: &Body, body_2: &Body) -> ForceMoments {
        let raw = body_2.position() - body_1.position();
        let raw_distance = raw.norm();
        let separation = if raw_distance < MIN_GRAVITATION_DISTANCE {
            if raw_distance < ZERO_GRAVITATION_DISTANCE {
                Vector3::new(MIN_GRAVITATION_DISTANCE, 0.0, 0.0)
            } else {
                raw / raw_distance * MIN_GRAVITATION_DISTANCE
            }
        } else {
            raw
        };
        let distance = separation.norm();

        let magnitude = GRAVITATIONAL_CONSTANT * body_1.shape().mass() * body_2.shape().mass()
            / (distance * distance);
        ForceMoments::from_force(separation / distance * magnitude)
    }

    /// Run wings against the atmosphere, then fold gravitation and applied
    /// impulses into each body's external forces and working velocity.
    fn run_force_generators(system: &mut System, dt: f64) {
        system.run_wings(dt);

        for body in system.bodies_mut() {
            let external =
                body.iteration().gravitational_forces + body.applied_impulses();
            body.reset_applied_impulses();

            let acceleration = AccelerationMoments::new(
                external.force() * body.iteration().inv_m,
                body.iteration().inv_i * external.torque(),
            );
            let velocity = VelocityMoments::new(
                body.velocity() + acceleration.acceleration() * dt,
                body.angular_velocity() + acceleration.angular_acceleration() * dt,
            );

            let iteration = body.iteration_mut();
            iteration.external_forces = external;
            iteration.external_acceleration = acceleration;
            iteration.velocity = velocity;
        }
    }

    /// Gauss–Seidel pass: each iteration re-solves every constraint in full
    /// against working velocities rebuilt from zeroed constraint-force
    /// accumulators, so a constraint reacts to the others' freshest forces
    /// but never to its own stale ones. Converged once the largest change
    /// between successive solves of the same constraint drops below the
    /// required precision.
    fn solve_constraints(&self, system: &mut System, dt: f64) -> EvolutionDetails {
        let mut iterations_run = 0;
        let mut converged = system.constraints.is_empty();

        while !converged && iterations_run < self.max_iterations {
            iterations_run += 1;
            let mut largest_force_delta = 0.0_f64;
            let mut largest_torque_delta = 0.0_f64;

            for body in system.bodies_mut() {
                body.iteration_mut().constraint_forces = ForceMoments::zero();
                Self::refresh_working_velocity(body, dt);
            }

            for index in 0..system.constraints.len() {
                let (kind, settings, active) = {
                    let constraint = &system.constraints[index];
                    (
                        constraint.kind().clone(),
                        *constraint.settings(),
                        constraint.is_active(),
                    )
                };
                if !active {
                    continue;
                }

                let Ok((data, id_1, id_2)) = system.joint_data(kind.joint()) else {
                    continue;
                };

                let (iter_1, iter_2, any_broken) = {
                    let Ok(body_1) = system.body(id_1) else { continue };
                    let Ok(body_2) = system.body(id_2) else { continue };
                    (
                        *body_1.iteration(),
                        *body_2.iteration(),
                        body_1.broken() || body_2.broken(),
                    )
                };
                if any_broken {
                    continue;
                }

                let baumgarte = settings.baumgarte_factor;
                let cfm = settings.constraint_force_mixing;
                let forces = match (&kind, &data) {
                    (ConstraintKind::Fixed(c), JointData::Hinge(d)) => {
                        c.forces(d, &iter_1, &iter_2, dt, baumgarte, cfm)
                    }
                    (ConstraintKind::Hinge(c), JointData::Hinge(d)) => {
                        c.forces(d, &iter_1, &iter_2, dt, baumgarte, cfm)
                    }
                    (ConstraintKind::AngularLimits(c), JointData::Hinge(d)) => {
                        c.forces(d, &iter_1, &iter_2, dt, baumgarte, cfm)
                    }
                    (ConstraintKind::Slider(c), JointData::Slider(d)) => {
                        c.forces(d, &iter_1, &iter_2, dt, baumgarte, cfm)
                    }
                    (ConstraintKind::LinearLimits(c), JointData::Slider(d)) => {
                        c.forces(d, &iter_1, &iter_2, dt, baumgarte, cfm)
                    }
                    // Kind/joint pairing is validated at insertion.
                    _ => ConstraintForces::zero(),
                };

                let previous = {
                    let constraint = &mut system.constraints[index];
                    let previous = constraint.previous_forces.replace(forces).unwrap_or_default();
                    constraint.check_breakage(&forces);
                    if constraint.broken() {
                        debug!("constraint '{}' broke", constraint.label());
                    }
                    previous
                };

                let delta_1 = forces.body_1 - previous.body_1;
                let delta_2 = forces.body_2 - previous.body_2;
                largest_force_delta = largest_force_delta
                    .max(delta_1.force().norm())
                    .max(delta_2.force().norm());
                largest_torque_delta = largest_torque_delta
                    .max(delta_1.torque().norm())
                    .max(delta_2.torque().norm());

                if let Ok((body_1, body_2)) = system.body_pair_mut(id_1, id_2) {
                    body_1.iteration_mut().constraint_forces += forces.body_1;
                    body_2.iteration_mut().constraint_forces += forces.body_2;
                    Self::refresh_working_velocity(body_1, dt);
                    Self::refresh_working_velocity(body_2, dt);
                }
            }

            converged = largest_force_delta < self.required_force_precision
                && largest_torque_delta < self.required_torque_precision;
        }

        if !converged && !system.constraints.is_empty() {
            debug!(
                "constraint solve did not converge within {} iterations",
                self.max_iterations
            );
        }

        EvolutionDetails {
            iterations_run,
            converged,
        }
    }

    /// Recompute the working velocity from the body's actual velocity plus
    /// one tick's worth of external and constraint accelerations.
    fn refresh_working_velocity(body: &mut Body, dt: f64) {
        let iteration = body.iteration();
        let constraint_acceleration = AccelerationMoments::new(
            iteration.constraint_forces.force() * iteration.inv_m,
            iteration.inv_i * iteration.constraint_forces.torque(),
        );
        let acceleration = iteration.external_acceleration + constraint_acceleration;
        let velocity = VelocityMoments::new(
            body.velocity() + acceleration.acceleration() * dt,
            body.angular_velocity() + acceleration.angular_acceleration() * dt,
        );
        body.iteration_mut().velocity = velocity;
    }

    /// Integrate every live body once with its summed forces, clamped by the
    /// configured limits.
    fn integrate(&mut self, system: &mut System, dt: f64) {
        let limits = self.limits;

        for body in system.bodies_mut() {
            if body.broken() {
                continue;
            }

            let mut total = body.iteration().all_forces();
            if let Some(limits) = &limits {
                total = limits.clamp_forces(total);
            }

            body.act(&total, dt);

            if let Some(limits) = &limits {
                limits.clamp_velocities(body);
            }
        }

        // One extra orientation renormalization per tick, round-robin, to
        // keep drift bounded however many bodies there are.
        let count = system.n_bodies();
        if count > 0 {
            let chosen = (self.processed_frames % count as u64) as usize;
            if let Some(body) = system.bodies_mut().nth(chosen) {
                body.normalize_rotation();
            }
        }
    }
}

/// Fixed-step driver around an [`ImpulseSolver`].
#[derive(Debug)]
pub struct Evolver {
    dt: f64,
    elapsed: f64,
    solver: ImpulseSolver,
}

impl Evolver {
    pub fn new(dt: f64, solver: ImpulseSolver) -> Result<Self, crate::error::SimulationError> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(crate::error::SimulationError::InvalidParameter(
                "time step must be positive and finite".into(),
            ));
        }
        Ok(Self {
            dt,
            elapsed: 0.0,
            solver,
        })
    }

    /// Tick length [s]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Simulated time advanced so far [s]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn solver(&self) -> &ImpulseSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut ImpulseSolver {
        &mut self.solver
    }

    /// Run enough ticks to cover `duration` seconds.
    pub fn evolve(&mut self, system: &mut System, duration: f64) {
        self.evolve_with(system, duration, |_, _| {});
    }

    /// Run enough ticks to cover `duration` seconds, calling back after each
    /// tick with the system and the simulated time so far.
    pub fn evolve_with(
        &mut self,
        system: &mut System,
        duration: f64,
        mut callback: impl FnMut(&mut System, f64),
    ) {
        let ticks = (duration / self.dt).ceil() as u64;

        for _ in 0..ticks {
            let details = self.solver.evolve(system, self.dt);
            self.elapsed += self.dt;

            if !details.converged && system.n_constraints() > 0 {
                warn!(
                    "tick at t={:.6}s stopped after {} iterations without converging",
                    self.elapsed, details.iterations_run
                );
            }

            callback(system, self.elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::MassMoments;
    use approx::assert_relative_eq;

    fn cube(mass: f64, at: Vector3<f64>) -> Body {
        let mut body =
            Body::new(MassMoments::cuboid(mass, Vector3::new(1.0, 1.0, 1.0))).unwrap();
        body.move_to(at);
        body
    }

    #[test]
    fn test_gravitation_between_two_point_masses() {
        let mut system = System::new();
        let m1 = 1e10;
        let m2 = 2e10;
        let a = system.add_gravitating_body(cube(m1, Vector3::zeros()));
        let b = system.add_gravitating_body(cube(m2, Vector3::new(10.0, 0.0, 0.0)));

        let mut solver = ImpulseSolver::default();
        let dt = 1e-3;
        solver.evolve(&mut system, dt);

        let expected = GRAVITATIONAL_CONSTANT * m1 * m2 / 100.0;
        // After one tick each body has picked up v = (F/m)·dt toward the
        // other.
        assert_relative_eq!(
            system.body(a).unwrap().velocity().x,
            expected / m1 * dt,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            system.body(b).unwrap().velocity().x,
            -expected / m2 * dt,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gravitating_body_attracts_ordinary_body() {
        let mut system = System::new();
        let m1 = 1e12;
        let planet = system.add_gravitating_body(cube(m1, Vector3::zeros()));
        let satellite = system.add_body(cube(1.0, Vector3::new(10.0, 0.0, 0.0)));

        let mut solver = ImpulseSolver::default();
        let dt = 1e-3;
        solver.evolve(&mut system, dt);

        // The pull is mutual even though the satellite itself does not
        // gravitate.
        let expected = GRAVITATIONAL_CONSTANT * m1 * 1.0 / 100.0;
        assert_relative_eq!(
            system.body(satellite).unwrap().velocity().x,
            -expected * dt,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            system.body(planet).unwrap().velocity().x,
            expected / m1 * dt,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_coincident_gravitating_bodies_feel_finite_pull() {
        let mut system = System::new();
        let a = system.add_gravitating_body(cube(1e3, Vector3::zeros()));
        let b = system.add_gravitating_body(cube(1e3, Vector3::zeros()));

        let mut solver = ImpulseSolver::default();
        solver.evolve(&mut system, 1e-3);

        // The separation clamp keeps the force finite and equal-and-opposite
        // instead of skipping the pair.
        let v_a = system.body(a).unwrap().velocity();
        let v_b = system.body(b).unwrap().velocity();
        assert!(v_a.norm() > 0.0);
        assert!(v_a.norm().is_finite());
        assert_relative_eq!(v_a, -v_b, epsilon = 1e-12);
    }

    #[test]
    fn test_limits_clamp_applied_force() {
        let mut system = System::new();
        let a = system.add_body(cube(1.0, Vector3::zeros()));
        system
            .body_mut(a)
            .unwrap()
            .apply_impulse(ForceMoments::from_force(Vector3::new(1e6, 0.0, 0.0)));

        let mut solver = ImpulseSolver::default().with_limits(Limits::default());
        solver.evolve(&mut system, 1.0);

        // Default limit caps the force at 1e3 N, so v = 1e3 m/s after 1 s,
        // which the velocity limit also allows.
        assert_relative_eq!(system.body(a).unwrap().velocity().x, 1e3, epsilon = 1e-9);
    }

    #[test]
    fn test_free_body_converges_immediately() {
        let mut system = System::new();
        system.add_body(cube(1.0, Vector3::zeros()));

        let mut solver = ImpulseSolver::default();
        let details = solver.evolve(&mut system, 1e-3);
        assert!(details.converged);
        assert_eq!(details.iterations_run, 0);
    }

    #[test]
    fn test_evolver_counts_ticks() {
        let mut system = System::new();
        system.add_body(cube(1.0, Vector3::zeros()));

        let mut evolver = Evolver::new(1e-3, ImpulseSolver::default()).unwrap();
        let mut ticks = 0;
        evolver.evolve_with(&mut system, 0.01, |_, _| ticks += 1);

        assert_eq!(ticks, 10);
        assert_relative_eq!(evolver.elapsed(), 0.01, epsilon = 1e-12);
        assert_eq!(evolver.solver().processed_frames(), 10);
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        assert!(Evolver::new(0.0, ImpulseSolver::default()).is_err());
        assert!(Evolver::new(-1.0, ImpulseSolver::default()).is_err());
    }
}
