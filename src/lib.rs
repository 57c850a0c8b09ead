//! Rigid-body constraint simulation for flight-dynamics test rigs.
//!
//! Bodies carry mass moments and world-frame kinematic state; joints cache
//! the relative geometry between body pairs once per tick; constraints turn
//! that geometry into Jacobian rows which the sequential-impulse solver
//! resolves into equal-and-opposite forces. Wings sample an atmosphere and
//! feed aerodynamic impulses into the same per-tick force accumulation.
//!
//! A minimal session:
//!
//! ```no_run
//! use airframe::dynamics::MassMoments;
//! use airframe::rigid_body::{Body, Evolver, ImpulseSolver, System};
//! use nalgebra::Vector3;
//!
//! # fn main() -> Result<(), airframe::SimulationError> {
//! let mut system = System::new();
//! let body = Body::new(MassMoments::cuboid(1.0, Vector3::new(0.1, 0.1, 0.1)))?;
//! system.add_body(body);
//!
//! let mut evolver = Evolver::new(1e-3, ImpulseSolver::default())?;
//! evolver.evolve(&mut system, 1.0);
//! # Ok(())
//! # }
//! ```

pub mod aero;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod rigid_body;

pub use error::SimulationError;
