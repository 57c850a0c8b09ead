use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::math::wrap_angle;

use super::atmosphere::AirSample;

/// Airspeeds below this are treated as still air [m/s].
const MIN_AIRSPEED: f64 = 1e-6;

/// 2D linear-interpolation table of an aerodynamic coefficient over
/// (Reynolds number, angle of attack).
///
/// Angles are radians wrapped to [−π, π); both axes are clamped at their
/// ends, so a single-row or single-column field degrades to 1D and a 1×1
/// field to a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientField {
    reynolds: Vec<f64>,
    alphas: Vec<f64>,
    /// Row per Reynolds number, column per angle of attack
    values: Vec<Vec<f64>>,
}

impl CoefficientField {
    pub fn new(
        reynolds: Vec<f64>,
        alphas: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, SimulationError> {
        if reynolds.is_empty() || alphas.is_empty() {
            return Err(SimulationError::MalformedCoefficientField(
                "axes must be non-empty".into(),
            ));
        }
        if !strictly_increasing(&reynolds) {
            return Err(SimulationError::MalformedCoefficientField(
                "Reynolds axis must be strictly increasing".into(),
            ));
        }
        if !strictly_increasing(&alphas) {
            return Err(SimulationError::MalformedCoefficientField(
                "angle-of-attack axis must be strictly increasing".into(),
            ));
        }
        if values.len() != reynolds.len() || values.iter().any(|row| row.len() != alphas.len()) {
            return Err(SimulationError::MalformedCoefficientField(format!(
                "values must be a {}×{} grid",
                reynolds.len(),
                alphas.len()
            )));
        }

        Ok(Self {
            reynolds,
            alphas,
            values,
        })
    }

    /// A field returning the same coefficient everywhere.
    pub fn uniform(value: f64) -> Self {
        Self {
            reynolds: vec![0.0],
            alphas: vec![0.0],
            values: vec![vec![value]],
        }
    }

    /// A Reynolds-independent field from (alpha [rad], coefficient) pairs.
    pub fn from_alpha_table(pairs: &[(f64, f64)]) -> Result<Self, SimulationError> {
        let alphas = pairs.iter().map(|&(alpha, _)| alpha).collect();
        let row = pairs.iter().map(|&(_, value)| value).collect();
        Self::new(vec![0.0], alphas, vec![row])
    }

    /// Bilinear interpolation at the given Reynolds number and angle of
    /// attack [rad].
    pub fn value(&self, reynolds: f64, alpha: f64) -> f64 {
        let alpha = wrap_angle(alpha);
        let (ri0, ri1, rt) = Self::bracket(&self.reynolds, reynolds);
        let (ai0, ai1, at) = Self::bracket(&self.alphas, alpha);

        let low = lerp_pair(self.values[ri0][ai0], self.values[ri0][ai1], at);
        let high = lerp_pair(self.values[ri1][ai0], self.values[ri1][ai1], at);
        lerp_pair(low, high, rt)
    }

    /// Indices bracketing `x` plus the interpolation fraction, clamped.
    fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
        if x <= axis[0] {
            return (0, 0, 0.0);
        }
        let last = axis.len() - 1;
        if x >= axis[last] {
            return (last, last, 0.0);
        }

        let upper = axis.partition_point(|&key| key < x);
        let lower = upper - 1;
        let t = (x - axis[lower]) / (axis[upper] - axis[lower]);
        (lower, upper, t)
    }
}

fn strictly_increasing(axis: &[f64]) -> bool {
    axis.windows(2).all(|pair| pair[0] < pair[1])
}

fn lerp_pair(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Tabulated aerodynamic character of one airfoil section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirfoilCharacteristics {
    /// Lift coefficient C_L
    pub lift: CoefficientField,
    /// Drag coefficient C_D
    pub drag: CoefficientField,
    /// Pitching-moment coefficient C_m
    pub pitching_moment: CoefficientField,
    /// Chordwise center-of-pressure position as a fraction of the chord
    pub center_of_pressure: CoefficientField,
}

/// Forces produced by an airfoil for one sample of relative air, expressed
/// in the airfoil frame, with the flow parameters attached for telemetry.
///
/// Airfoil frame: x forward along the chord (the leading edge points toward
/// +x, so in forward flight the relative air arrives along −x), y
/// chord-normal, z along the span.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AirfoilForces {
    /// Lift force, perpendicular to the flow in the chord plane [N]
    pub lift: Vector3<f64>,
    /// Drag force, along the flow [N]
    pub drag: Vector3<f64>,
    /// Pitching moment about the span axis [N⋅m]
    pub pitching_moment: Vector3<f64>,
    /// Point of application, from the airfoil origin [m]
    pub center_of_pressure: Vector3<f64>,
    /// Angle of attack [rad]
    pub angle_of_attack: f64,
    /// Reynolds number of the planar flow
    pub reynolds_number: f64,
    /// Planar true airspeed [m/s]
    pub true_airspeed: f64,
}

/// A rectangular wing section of known chord and span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airfoil {
    characteristics: AirfoilCharacteristics,
    /// Chord length [m]
    chord_length: f64,
    /// Spanwise length [m]
    wing_length: f64,
}

impl Airfoil {
    pub fn new(
        characteristics: AirfoilCharacteristics,
        chord_length: f64,
        wing_length: f64,
    ) -> Result<Self, SimulationError> {
        if !(chord_length > 0.0 && wing_length > 0.0) {
            return Err(SimulationError::InvalidParameter(
                "airfoil chord and span must be positive".into(),
            ));
        }
        Ok(Self {
            characteristics,
            chord_length,
            wing_length,
        })
    }

    pub fn chord_length(&self) -> f64 {
        self.chord_length
    }

    pub fn wing_length(&self) -> f64 {
        self.wing_length
    }

    pub fn characteristics(&self) -> &AirfoilCharacteristics {
        &self.characteristics
    }

    /// Aerodynamic forces for the given relative air velocity (air velocity
    /// minus the wing's own) in the airfoil frame.
    ///
    /// Coefficients are read at the angle of attack of the planar (chord
    /// plane) flow; spanwise flow contributes to drag direction only. Still
    /// air produces identically zero output.
    pub fn forces(&self, relative_velocity: &Vector3<f64>, air: &AirSample) -> AirfoilForces {
        let planar = Vector3::new(relative_velocity.x, relative_velocity.y, 0.0);
        let true_airspeed = planar.norm();
        if true_airspeed <= MIN_AIRSPEED {
            return AirfoilForces::default();
        }

        // The air streams toward −x in forward flight; air arriving from
        // below the chord reads as positive angle of attack.
        let angle_of_attack = relative_velocity.y.atan2(-relative_velocity.x);
        let dynamic_pressure = 0.5 * air.density * true_airspeed * true_airspeed;
        let reynolds_number =
            air.density * true_airspeed * self.chord_length / air.dynamic_viscosity;
        let planform = self.chord_length * self.wing_length;

        let lift = self.characteristics.lift.value(reynolds_number, angle_of_attack)
            * dynamic_pressure
            * planform;
        let drag = self.characteristics.drag.value(reynolds_number, angle_of_attack)
            * dynamic_pressure
            * planform;
        let moment = self
            .characteristics
            .pitching_moment
            .value(reynolds_number, angle_of_attack)
            * dynamic_pressure
            * planform
            * self.chord_length;
        let cp_chordwise = self
            .characteristics
            .center_of_pressure
            .value(reynolds_number, angle_of_attack)
            * self.chord_length;

        // Lift is perpendicular to the flow in the chord plane and points
        // toward +y in forward flight; drag is along the full 3D flow, which
        // opposes the wing's own motion.
        let lift_direction = relative_velocity.cross(&Vector3::z()).normalize();
        let drag_direction = relative_velocity.normalize();

        // Center of pressure sits aft of the leading edge, at midspan.
        AirfoilForces {
            lift: lift * lift_direction,
            drag: drag * drag_direction,
            pitching_moment: Vector3::new(0.0, 0.0, moment),
            center_of_pressure: Vector3::new(-cp_chordwise, 0.0, 0.5 * self.wing_length),
            angle_of_attack,
            reynolds_number,
            true_airspeed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn flat_plate() -> Airfoil {
        let characteristics = AirfoilCharacteristics {
            lift: CoefficientField::from_alpha_table(&[(-0.5, -1.0), (0.0, 0.0), (0.5, 1.0)])
                .unwrap(),
            drag: CoefficientField::uniform(0.02),
            pitching_moment: CoefficientField::uniform(-0.05),
            center_of_pressure: CoefficientField::uniform(0.25),
        };
        Airfoil::new(characteristics, 0.2, 1.5).unwrap()
    }

    fn sea_level_air() -> AirSample {
        AirSample {
            density: 1.225,
            dynamic_viscosity: 1.8e-5,
            wind: Vector3::zeros(),
        }
    }

    #[test]
    fn test_still_air_produces_nothing() {
        let forces = flat_plate().forces(&Vector3::zeros(), &sea_level_air());
        assert_eq!(forces, AirfoilForces::default());

        // Purely spanwise flow has no planar airspeed either.
        let forces = flat_plate().forces(&Vector3::new(0.0, 0.0, 10.0), &sea_level_air());
        assert_eq!(forces, AirfoilForces::default());
    }

    #[test]
    fn test_symmetric_section_at_zero_alpha_has_no_lift() {
        let airfoil = flat_plate();
        // Forward flight: the air streams toward −x.
        let forces = airfoil.forces(&Vector3::new(-30.0, 0.0, 0.0), &sea_level_air());

        assert_relative_eq!(forces.angle_of_attack, 0.0);
        assert_abs_diff_eq!(forces.lift.norm(), 0.0, epsilon = 1e-12);
        // Drag: C_D · ½ρV² · S, along the flow.
        let expected_drag = 0.02 * 0.5 * 1.225 * 900.0 * 0.3;
        assert_relative_eq!(
            forces.drag,
            Vector3::new(-expected_drag, 0.0, 0.0),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_air_from_below_lifts_upward() {
        let airfoil = flat_plate();
        let velocity = Vector3::new(-30.0, 3.0, 0.0);
        let forces = airfoil.forces(&velocity, &sea_level_air());

        assert!(forces.angle_of_attack > 0.0);
        assert!(forces.lift.y > 0.0);
        assert_abs_diff_eq!(forces.lift.dot(&velocity), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(
            forces.drag.cross(&velocity).norm(),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_center_of_pressure_sits_aft_at_midspan() {
        let airfoil = flat_plate();
        let forces = airfoil.forces(&Vector3::new(-30.0, 0.0, 0.0), &sea_level_air());
        assert_relative_eq!(
            forces.center_of_pressure,
            Vector3::new(-0.25 * 0.2, 0.0, 0.75)
        );
    }

    #[test]
    fn test_field_rejects_malformed_axes() {
        assert!(CoefficientField::new(vec![], vec![0.0], vec![]).is_err());
        assert!(CoefficientField::new(vec![1.0, 1.0], vec![0.0], vec![vec![0.0], vec![0.0]])
            .is_err());
        assert!(CoefficientField::new(vec![0.0], vec![0.0], vec![vec![0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_field_interpolates_and_clamps() {
        let field = CoefficientField::new(
            vec![1e5, 2e5],
            vec![-0.1, 0.1],
            vec![vec![0.0, 1.0], vec![2.0, 3.0]],
        )
        .unwrap();

        assert_relative_eq!(field.value(1e5, 0.0), 0.5);
        assert_relative_eq!(field.value(1.5e5, 0.0), 1.5);
        // Clamped beyond both axes.
        assert_relative_eq!(field.value(1e4, -1.0), 0.0);
        assert_relative_eq!(field.value(1e6, 1.0), 3.0);
    }

    #[test]
    fn test_field_wraps_angle_of_attack() {
        let field =
            CoefficientField::from_alpha_table(&[(-1.0, -1.0), (0.0, 0.0), (1.0, 1.0)]).unwrap();
        // 2π − 0.5 wraps to −0.5.
        assert_relative_eq!(
            field.value(0.0, 2.0 * std::f64::consts::PI - 0.5),
            -0.5,
            epsilon = 1e-12
        );
    }
}
