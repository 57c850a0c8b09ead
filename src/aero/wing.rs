use nalgebra::{UnitQuaternion, Vector3};

use crate::dynamics::ForceMoments;
use crate::rigid_body::{Body, BodyId};

use super::airfoil::{Airfoil, AirfoilForces};
use super::atmosphere::Atmosphere;
use super::smoother::Smoother;

/// An airfoil mounted on a body, turning relative airflow into impulses.
///
/// The mounting quaternion rotates airfoil coordinates into body
/// coordinates; the airfoil origin is taken to sit at the body's center of
/// mass, with the center of pressure offset from there.
#[derive(Debug, Clone)]
pub struct Wing {
    body: BodyId,
    airfoil: Airfoil,
    mounting: UnitQuaternion<f64>,
    lift_smoother: Option<Smoother>,
    drag_smoother: Option<Smoother>,
    moment_smoother: Option<Smoother>,
    /// Last evaluated forces and flow parameters, airfoil frame
    last_forces: AirfoilForces,
}

impl Wing {
    pub fn new(body: BodyId, airfoil: Airfoil) -> Self {
        Self {
            body,
            airfoil,
            mounting: UnitQuaternion::identity(),
            lift_smoother: None,
            drag_smoother: None,
            moment_smoother: None,
            last_forces: AirfoilForces::default(),
        }
    }

    pub fn with_mounting(mut self, mounting: UnitQuaternion<f64>) -> Self {
        self.mounting = mounting;
        self
    }

    pub fn with_lift_smoother(mut self, smoother: Smoother) -> Self {
        self.lift_smoother = Some(smoother);
        self
    }

    pub fn with_drag_smoother(mut self, smoother: Smoother) -> Self {
        self.drag_smoother = Some(smoother);
        self
    }

    pub fn with_moment_smoother(mut self, smoother: Smoother) -> Self {
        self.moment_smoother = Some(smoother);
        self
    }

    /// The body this wing pushes on.
    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn airfoil(&self) -> &Airfoil {
        &self.airfoil
    }

    pub fn mounting(&self) -> UnitQuaternion<f64> {
        self.mounting
    }

    /// Forces and flow parameters from the last tick, airfoil frame.
    pub fn last_forces(&self) -> &AirfoilForces {
        &self.last_forces
    }

    /// Sample the atmosphere at the body, evaluate the airfoil and apply the
    /// result: lift plus pitching moment as one impulse at the center of
    /// pressure, drag as a second.
    pub fn update_external_forces(
        &mut self,
        body: &mut Body,
        atmosphere: &dyn Atmosphere,
        dt: f64,
    ) {
        let air = atmosphere.air_at(&body.position());
        let airfoil_to_world = body.orientation() * self.mounting;
        let relative_velocity = airfoil_to_world.inverse() * (air.wind - body.velocity());

        let mut forces = self.airfoil.forces(&relative_velocity, &air);
        forces.lift = smooth_magnitude(&mut self.lift_smoother, forces.lift, dt);
        forces.drag = smooth_magnitude(&mut self.drag_smoother, forces.drag, dt);
        if let Some(smoother) = &mut self.moment_smoother {
            forces.pitching_moment.z = smoother.smooth(forces.pitching_moment.z, dt);
        }
        self.last_forces = forces;

        let lift = airfoil_to_world * forces.lift;
        let drag = airfoil_to_world * forces.drag;
        let pitching_moment = airfoil_to_world * forces.pitching_moment;
        let center_of_pressure = airfoil_to_world * forces.center_of_pressure;

        body.apply_impulse_at(ForceMoments::new(lift, pitching_moment), &center_of_pressure);
        body.apply_impulse_at(ForceMoments::from_force(drag), &center_of_pressure);
    }
}

/// Smooth a force vector by magnitude, keeping its direction.
fn smooth_magnitude(
    smoother: &mut Option<Smoother>,
    vector: Vector3<f64>,
    dt: f64,
) -> Vector3<f64> {
    match smoother {
        Some(smoother) => {
            let norm = vector.norm();
            let smoothed = smoother.smooth(norm, dt);
            if norm > 0.0 {
                vector * (smoothed / norm)
            } else {
                Vector3::zeros()
            }
        }
        None => vector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aero::airfoil::{AirfoilCharacteristics, CoefficientField};
    use crate::aero::atmosphere::StandardAtmosphere;
    use crate::dynamics::{MassMoments, VelocityMoments};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn test_airfoil() -> Airfoil {
        let characteristics = AirfoilCharacteristics {
            lift: CoefficientField::from_alpha_table(&[(-0.5, -1.0), (0.0, 0.0), (0.5, 1.0)])
                .unwrap(),
            drag: CoefficientField::uniform(0.02),
            pitching_moment: CoefficientField::uniform(0.0),
            center_of_pressure: CoefficientField::uniform(0.25),
        };
        Airfoil::new(characteristics, 0.2, 1.5).unwrap()
    }

    fn test_body() -> Body {
        Body::new(MassMoments::cuboid(2.0, Vector3::new(1.5, 0.2, 0.02))).unwrap()
    }

    #[test]
    fn test_still_air_applies_no_impulse() {
        let mut body = test_body();
        let mut wing = Wing::new(BodyId::invalid(), test_airfoil());
        let atmosphere = StandardAtmosphere::new(0.0);

        wing.update_external_forces(&mut body, &atmosphere, 1e-3);

        assert_eq!(body.applied_impulses(), ForceMoments::zero());
        assert_relative_eq!(wing.last_forces().true_airspeed, 0.0);
    }

    #[test]
    fn test_forward_motion_produces_drag_opposing_it() {
        let mut body = test_body();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(30.0, 0.0, 0.0),
            Vector3::zeros(),
        ));
        let mut wing = Wing::new(BodyId::invalid(), test_airfoil());
        let atmosphere = StandardAtmosphere::new(0.0);

        wing.update_external_forces(&mut body, &atmosphere, 1e-3);

        let impulses = body.applied_impulses();
        assert!(impulses.force().x < 0.0);
        assert_abs_diff_eq!(impulses.force().y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(wing.last_forces().true_airspeed, 30.0, epsilon = 1e-12);
        assert_relative_eq!(wing.last_forces().angle_of_attack, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_headwind_equals_forward_motion() {
        let atmosphere =
            StandardAtmosphere::new(0.0).with_wind(Vector3::new(-30.0, 0.0, 0.0));
        let mut still_body = test_body();
        let mut wing = Wing::new(BodyId::invalid(), test_airfoil());

        wing.update_external_forces(&mut still_body, &atmosphere, 1e-3);
        let impulses_from_wind = still_body.applied_impulses();

        let mut moving_body = test_body();
        moving_body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(30.0, 0.0, 0.0),
            Vector3::zeros(),
        ));
        let mut wing = Wing::new(BodyId::invalid(), test_airfoil());
        wing.update_external_forces(&mut moving_body, &StandardAtmosphere::new(0.0), 1e-3);

        assert_relative_eq!(
            impulses_from_wind.force(),
            moving_body.applied_impulses().force(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_updraft_adds_lift_upward() {
        let atmosphere =
            StandardAtmosphere::new(0.0).with_wind(Vector3::new(0.0, 3.0, 0.0));
        let mut body = test_body();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(30.0, 0.0, 0.0),
            Vector3::zeros(),
        ));
        let mut wing = Wing::new(BodyId::invalid(), test_airfoil());

        wing.update_external_forces(&mut body, &atmosphere, 1e-3);

        // Air arriving from below the chord reads as positive incidence and
        // pushes the body upward.
        assert!(wing.last_forces().angle_of_attack > 0.0);
        assert!(body.applied_impulses().force().y > 0.0);
    }

    #[test]
    fn test_smoothing_delays_force_onset() {
        let mut body = test_body();
        body.set_velocity_moments(VelocityMoments::new(
            Vector3::new(30.0, 3.0, 0.0),
            Vector3::zeros(),
        ));
        let atmosphere = StandardAtmosphere::new(0.0);

        let mut raw_wing = Wing::new(BodyId::invalid(), test_airfoil());
        raw_wing.update_external_forces(&mut body.clone(), &atmosphere, 1e-3);
        let raw_lift = raw_wing.last_forces().lift.norm();
        assert!(raw_lift > 0.0);

        // A smoother that has settled at zero only lets a fraction through
        // on the next sample.
        let mut smoother = Smoother::new(1.0);
        smoother.smooth(0.0, 1e-3);
        let mut smoothed_wing =
            Wing::new(BodyId::invalid(), test_airfoil()).with_lift_smoother(smoother);
        smoothed_wing.update_external_forces(&mut body, &atmosphere, 1e-3);

        assert!(smoothed_wing.last_forces().lift.norm() < raw_lift * 0.1);
    }
}
