//! Aerodynamic force generation: atmosphere sampling, airfoil coefficient
//! tables and wings that push on bodies.

pub mod airfoil;
pub mod atmosphere;
pub mod smoother;
pub mod wing;

pub use airfoil::{Airfoil, AirfoilCharacteristics, AirfoilForces, CoefficientField};
pub use atmosphere::{AirSample, Atmosphere, StandardAtmosphere};
pub use smoother::Smoother;
pub use wing::Wing;
