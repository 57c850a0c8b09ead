use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Air properties at one point, as seen by force generators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirSample {
    /// Air density [kg/m³]
    pub density: f64,
    /// Dynamic viscosity [Pa⋅s]
    pub dynamic_viscosity: f64,
    /// Wind velocity in world coordinates [m/s]
    pub wind: Vector3<f64>,
}

/// Source of air properties by world position.
pub trait Atmosphere {
    fn air_at(&self, position: &Vector3<f64>) -> AirSample;
}

// International Standard Atmosphere, geometric AMSL altitude [m] to
// temperature [K] and density [kg/m³].
// Data from <https://en.wikipedia.org/wiki/International_Standard_Atmosphere>.
const ISA_TEMPERATURE: &[(f64, f64)] = &[
    (-610.0, 254.15),
    (0.0, 288.15),
    (11_000.0, 216.65),
    (20_000.0, 216.65),
    (32_000.0, 228.65),
    (47_000.0, 270.65),
    (51_000.0, 270.65),
    (71_000.0, 214.65),
    (84_852.0, 186.87),
];

const ISA_DENSITY: &[(f64, f64)] = &[
    (-610.0, 1.2985),
    (0.0, 1.2250),
    (11_000.0, 0.36391),
    (20_000.0, 0.08803),
    (32_000.0, 0.01322),
    (47_000.0, 0.0020),
    (51_000.0, 0.00086),
    (71_000.0, 6.4211e-5),
    (84_852.0, 8.0510e-6),
];

// Air temperature [K] to dynamic viscosity [Pa⋅s].
// Data from <http://www.engineeringtoolbox.com/air-absolute-kinematic-viscosity-d_601.html>.
const TEMPERATURE_TO_VISCOSITY: &[(f64, f64)] = &[
    (233.15, 157.591e-7),
    (244.26, 159.986e-7),
    (255.37, 157.591e-7),
    (260.93, 164.776e-7),
    (266.48, 167.650e-7),
    (272.04, 171.482e-7),
    (277.59, 172.440e-7),
    (283.15, 176.272e-7),
    (288.71, 179.625e-7),
    (294.26, 182.978e-7),
    (299.82, 184.894e-7),
    (305.37, 186.810e-7),
    (310.93, 188.726e-7),
    (322.04, 192.558e-7),
    (333.15, 197.827e-7),
    (344.26, 202.138e-7),
    (355.37, 207.886e-7),
    (366.48, 215.071e-7),
    (422.04, 238.063e-7),
    (477.59, 250.996e-7),
    (533.15, 277.820e-7),
    (672.04, 326.199e-7),
    (810.93, 376.015e-7),
    (1088.71, 455.050e-7),
];

/// Linear interpolation over a sorted table, clamped at both ends.
fn interpolate(table: &[(f64, f64)], x: f64) -> f64 {
    let first = table[0];
    let last = table[table.len() - 1];
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }

    let upper = table.partition_point(|&(key, _)| key < x);
    let (x0, y0) = table[upper - 1];
    let (x1, y1) = table[upper];
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// International Standard Atmosphere with a uniform wind field.
///
/// World z is up; the ground offset states the AMSL altitude of the world
/// origin, so a rig in a lab at 200 m elevation samples 200 m air at z = 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StandardAtmosphere {
    /// AMSL altitude of the world origin [m]
    pub ground_amsl_altitude: f64,
    /// Uniform wind in world coordinates [m/s]
    pub wind: Vector3<f64>,
}

impl StandardAtmosphere {
    pub fn new(ground_amsl_altitude: f64) -> Self {
        Self {
            ground_amsl_altitude,
            wind: Vector3::zeros(),
        }
    }

    pub fn with_wind(mut self, wind: Vector3<f64>) -> Self {
        self.wind = wind;
        self
    }

    /// ISA temperature at the given AMSL altitude [K]
    pub fn temperature_at(altitude: f64) -> f64 {
        interpolate(ISA_TEMPERATURE, altitude)
    }

    /// ISA density at the given AMSL altitude [kg/m³]
    pub fn density_at(altitude: f64) -> f64 {
        interpolate(ISA_DENSITY, altitude)
    }

    /// Dynamic viscosity of air at the given temperature [Pa⋅s]
    pub fn dynamic_viscosity_at(temperature: f64) -> f64 {
        interpolate(TEMPERATURE_TO_VISCOSITY, temperature)
    }
}

impl Atmosphere for StandardAtmosphere {
    fn air_at(&self, position: &Vector3<f64>) -> AirSample {
        let altitude = self.ground_amsl_altitude + position.z;
        let temperature = Self::temperature_at(altitude);

        AirSample {
            density: Self::density_at(altitude),
            dynamic_viscosity: Self::dynamic_viscosity_at(temperature),
            wind: self.wind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sea_level_values() {
        assert_relative_eq!(StandardAtmosphere::temperature_at(0.0), 288.15);
        assert_relative_eq!(StandardAtmosphere::density_at(0.0), 1.2250);
    }

    #[test]
    fn test_interpolation_between_table_rows() {
        // Halfway between 0 km and 11 km.
        let density = StandardAtmosphere::density_at(5500.0);
        assert_relative_eq!(density, (1.2250 + 0.36391) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clamped_outside_the_table() {
        assert_relative_eq!(StandardAtmosphere::density_at(-5000.0), 1.2985);
        assert_relative_eq!(StandardAtmosphere::density_at(200_000.0), 8.0510e-6);
    }

    #[test]
    fn test_ground_offset_shifts_sampling() {
        let at_origin = StandardAtmosphere::new(5500.0)
            .air_at(&Vector3::zeros())
            .density;
        assert_relative_eq!(at_origin, StandardAtmosphere::density_at(5500.0));
    }

    #[test]
    fn test_wind_is_reported() {
        let atmosphere = StandardAtmosphere::new(0.0).with_wind(Vector3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(
            atmosphere.air_at(&Vector3::zeros()).wind,
            Vector3::new(5.0, 0.0, 0.0)
        );
    }
}
