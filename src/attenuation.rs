//! Atmospheric attenuation along an Earth–space path.
//!
//! Follows the structure of ITU-R P.618: gaseous, cloud, rain and
//! scintillation components are computed separately and combined as
//! `A_gas + sqrt((A_rain + A_cloud)² + A_scint²)`. Coefficient tables are
//! condensed fits rather than the full recommendation tables.

use std::fmt;

use serde::Deserialize;

use crate::constants::{DEFAULT_AVAILABILITY, MIN_ELEVATION};
use crate::geometry::Location;

/// Attenuation components for one leg, dB.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Attenuation {
    pub gas: f64,
    pub cloud: f64,
    pub rain: f64,
    pub scintillation: f64,
}

impl Attenuation {
    /// No atmospheric loss at all.
    pub fn none() -> Attenuation {
        Attenuation::default()
    }

    pub fn total(&self) -> f64 {
        self.gas + ((self.rain + self.cloud).powi(2) + self.scintillation.powi(2)).sqrt()
    }
}

impl fmt::Display for Attenuation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Attenuation {{ gas: {:.2}, cloud: {:.2}, rain: {:.2}, scintillation: {:.2}, total: {:.2} }}",
            self.gas,
            self.cloud,
            self.rain,
            self.scintillation,
            self.total()
        )
    }
}

/// The Earth–space path an attenuation figure is wanted for.
#[derive(Clone, Debug)]
pub struct SlantPath<'a> {
    pub location: &'a Location,
    pub frequency: f64, // Hz
    pub elevation: f64, // degrees
    /// Diameter times the square root of aperture efficiency, m. Enables
    /// aperture averaging of scintillation when known.
    pub effective_diameter: Option<f64>,
}

/// Anything that can turn a path and a target availability into attenuation.
pub trait AttenuationModel: Send + Sync {
    fn attenuation(&self, path: &SlantPath, availability: f64) -> Attenuation;

    /// Availability used when the caller does not ask for a specific one.
    fn default_availability(&self) -> f64;
}

/// Per-location climatic parameters.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RainModel {
    pub name: String,
    pub rain_rate: f64,   // mm/h exceeded for 0.01 % of an average year
    pub rain_height: f64, // km above mean sea level
    #[serde(default = "default_availability")]
    pub availability: f64, // percent of the year
    #[serde(default)]
    pub cloud_liquid_water: f64, // kg/m², columnar
    #[serde(default = "default_wet_refractivity")]
    pub wet_refractivity: f64, // N-units
}

fn default_availability() -> f64 {
    DEFAULT_AVAILABILITY
}

fn default_wet_refractivity() -> f64 {
    60.0
}

impl RainModel {
    pub fn new(name: &str, rain_rate: f64, rain_height: f64) -> RainModel {
        RainModel {
            name: name.to_string(),
            rain_rate,
            rain_height,
            availability: default_availability(),
            cloud_liquid_water: 0.0,
            wet_refractivity: default_wet_refractivity(),
        }
    }

    /// Gaseous absorption (oxygen plus water vapour), dB.
    pub fn gas_attenuation(&self, frequency_ghz: f64, elevation: f64) -> f64 {
        let zenith = 0.03
            + 0.0035 * frequency_ghz
            + 0.25 * (-((frequency_ghz - 22.235) / 4.0).powi(2)).exp();
        zenith / elevation.to_radians().sin()
    }

    /// Cloud attenuation for the model's liquid water content, dB.
    pub fn cloud_attenuation(&self, frequency_ghz: f64, elevation: f64) -> f64 {
        if self.cloud_liquid_water <= 0.0 {
            return 0.0;
        }
        let specific = 0.00118 * frequency_ghz.powf(1.85); // (dB/km)/(g/m³)
        specific * self.cloud_liquid_water / elevation.to_radians().sin()
    }

    /// Rain attenuation exceeded for `percentage` of an average year, dB.
    pub fn rain_attenuation(
        &self,
        location: &Location,
        frequency_ghz: f64,
        elevation: f64,
        percentage: f64,
    ) -> f64 {
        let rain_depth = self.rain_height - location.altitude;
        if self.rain_rate <= 0.0 || rain_depth <= 0.0 {
            return 0.0;
        }

        let theta = elevation.to_radians();
        let (k, alpha) = rain_coefficients(frequency_ghz);
        let specific = k * self.rain_rate.powf(alpha); // dB/km

        let slant_length = rain_depth / theta.sin();
        let ground_length = slant_length * theta.cos();

        let horizontal_reduction = 1.0
            / (1.0 + 0.78 * (ground_length * specific / frequency_ghz).sqrt()
                - 0.38 * (1.0 - (-2.0 * ground_length).exp()));

        let zeta = (rain_depth / (ground_length * horizontal_reduction)).atan();
        let rain_length = if zeta > theta {
            ground_length * horizontal_reduction / theta.cos()
        } else {
            slant_length
        };

        let latitude = location.latitude.abs();
        let chi = if latitude < 36.0 { 36.0 - latitude } else { 0.0 };
        let vertical_adjustment = 1.0
            / (1.0
                + theta.sin().sqrt()
                    * (31.0
                        * (1.0 - (-(elevation / (1.0 + chi))).exp())
                        * (rain_length * specific).sqrt()
                        / frequency_ghz.powi(2)
                        - 0.45));

        let a001 = specific * rain_length * vertical_adjustment;
        if a001 <= 0.0 {
            return 0.0;
        }

        let p = percentage.clamp(0.001, 5.0);
        let beta = if p >= 1.0 || latitude >= 36.0 {
            0.0
        } else if elevation >= 25.0 {
            -0.005 * (latitude - 36.0)
        } else {
            -0.005 * (latitude - 36.0) + 1.8 - 4.25 * theta.sin()
        };
        let exponent =
            0.655 + 0.033 * p.ln() - 0.045 * a001.ln() - beta * (1.0 - p) * theta.sin();
        a001 * (p / 0.01).powf(-exponent)
    }

    /// Tropospheric scintillation fade depth exceeded for `percentage`, dB.
    pub fn scintillation_attenuation(
        &self,
        frequency_ghz: f64,
        elevation: f64,
        percentage: f64,
        effective_diameter: Option<f64>,
    ) -> f64 {
        let theta = elevation.to_radians();
        let sigma_ref = 3.6e-3 + 1.0e-4 * self.wet_refractivity;

        // effective path length through a 1 km turbulent layer, m
        let turbulence_height = 1000.0;
        let path_length =
            2.0 * turbulence_height / ((theta.sin().powi(2) + 2.35e-4).sqrt() + theta.sin());

        let averaging = match effective_diameter {
            Some(diameter) if diameter > 0.0 => {
                let x = 1.22 * diameter * diameter * frequency_ghz / path_length;
                let g2 = 3.86 * (x * x + 1.0).powf(11.0 / 12.0) * (11.0 / 6.0 * (1.0 / x).atan()).sin()
                    - 7.08 * x.powf(5.0 / 6.0);
                g2.max(0.0).sqrt()
            }
            _ => 1.0,
        };

        let sigma = sigma_ref * frequency_ghz.powf(7.0 / 12.0) * averaging / theta.sin().powf(1.2);

        let log_p = percentage.clamp(0.01, 50.0).log10();
        let time_factor = -0.061 * log_p.powi(3) + 0.072 * log_p.powi(2) - 1.71 * log_p + 3.0;
        time_factor * sigma
    }
}

impl AttenuationModel for RainModel {
    fn attenuation(&self, path: &SlantPath, availability: f64) -> Attenuation {
        let frequency_ghz = path.frequency / 1.0e9;
        let elevation = path.elevation.max(MIN_ELEVATION);
        let percentage = 100.0 - availability;

        Attenuation {
            gas: self.gas_attenuation(frequency_ghz, elevation),
            cloud: self.cloud_attenuation(frequency_ghz, elevation),
            rain: self.rain_attenuation(path.location, frequency_ghz, elevation, percentage),
            scintillation: self.scintillation_attenuation(
                frequency_ghz,
                elevation,
                percentage,
                path.effective_diameter,
            ),
        }
    }

    fn default_availability(&self) -> f64 {
        self.availability
    }
}

// (frequency GHz, k, alpha) for circular polarisation
const RAIN_COEFFICIENTS: [(f64, f64, f64); 14] = [
    (1.0, 0.0000352, 0.880),
    (2.0, 0.000138, 0.923),
    (4.0, 0.000591, 1.075),
    (6.0, 0.00155, 1.265),
    (8.0, 0.00395, 1.310),
    (10.0, 0.00887, 1.264),
    (12.0, 0.0168, 1.200),
    (15.0, 0.0335, 1.128),
    (20.0, 0.0691, 1.065),
    (25.0, 0.113, 1.030),
    (30.0, 0.167, 0.999),
    (35.0, 0.233, 0.963),
    (40.0, 0.310, 0.929),
    (50.0, 0.479, 0.868),
];

/// Specific-attenuation coefficients `(k, alpha)`, log-interpolated in
/// frequency and held constant outside 1–50 GHz.
pub fn rain_coefficients(frequency_ghz: f64) -> (f64, f64) {
    let first = RAIN_COEFFICIENTS[0];
    let last = RAIN_COEFFICIENTS[RAIN_COEFFICIENTS.len() - 1];
    if frequency_ghz <= first.0 {
        return (first.1, first.2);
    }
    if frequency_ghz >= last.0 {
        return (last.1, last.2);
    }
    for pair in RAIN_COEFFICIENTS.windows(2) {
        let (f0, k0, a0) = pair[0];
        let (f1, k1, a1) = pair[1];
        if frequency_ghz >= f0 && frequency_ghz <= f1 {
            let t = (frequency_ghz.ln() - f0.ln()) / (f1.ln() - f0.ln());
            let k = (k0.ln() + t * (k1.ln() - k0.ln())).exp();
            let alpha = a0 + t * (a1 - a0);
            return (k, alpha);
        }
    }
    (last.1, last.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bangkok() -> Location {
        Location::new("Bangkok", 13.75, 100.5)
    }

    fn tropical() -> RainModel {
        RainModel {
            name: "Tropical".to_string(),
            rain_rate: 120.0,
            rain_height: 5.0,
            availability: 99.7,
            cloud_liquid_water: 1.0,
            wet_refractivity: 100.0,
        }
    }

    fn path(location: &Location, frequency: f64, elevation: f64) -> SlantPath<'_> {
        SlantPath {
            location,
            frequency,
            elevation,
            effective_diameter: None,
        }
    }

    #[test]
    fn coefficients_match_table_nodes() {
        let (k, alpha) = rain_coefficients(12.0);
        assert!((k - 0.0168).abs() < 1e-12);
        assert!((alpha - 1.2).abs() < 1e-12);
    }

    #[test]
    fn coefficients_grow_with_frequency() {
        let (k_ku, _) = rain_coefficients(14.0);
        let (k_ka, _) = rain_coefficients(30.0);
        assert!(k_ka > k_ku);
    }

    #[test]
    fn ku_band_tropical_fade_is_several_db() {
        let location = bangkok();
        let model = tropical();
        let fade = model.rain_attenuation(&location, 12.5, 60.0, 0.3);
        assert!(fade > 2.0 && fade < 15.0, "fade = {}", fade);
    }

    #[test]
    fn ka_band_fades_more_than_ku_band() {
        let location = bangkok();
        let model = tropical();
        let ku = model.attenuation(&path(&location, 12.0e9, 60.0), 99.7);
        let ka = model.attenuation(&path(&location, 20.0e9, 60.0), 99.7);
        assert!(ka.rain > ku.rain);
        assert!(ka.total() > ku.total());
    }

    #[test]
    fn higher_availability_means_deeper_fade() {
        let location = bangkok();
        let model = tropical();
        let relaxed = model.attenuation(&path(&location, 14.0e9, 50.0), 99.0);
        let strict = model.attenuation(&path(&location, 14.0e9, 50.0), 99.9);
        assert!(strict.rain > relaxed.rain);
        assert!(strict.total() > relaxed.total());
    }

    #[test]
    fn no_rain_above_rain_height() {
        let mut summit = bangkok();
        summit.altitude = 6.0;
        let fade = tropical().rain_attenuation(&summit, 14.0, 40.0, 0.1);
        assert_eq!(fade, 0.0);
    }

    #[test]
    fn dry_climate_has_no_rain_fade() {
        let location = bangkok();
        let mut model = tropical();
        model.rain_rate = 0.0;
        let attenuation = model.attenuation(&path(&location, 14.0e9, 40.0), 99.9);
        assert_eq!(attenuation.rain, 0.0);
        assert!(attenuation.gas > 0.0);
    }

    #[test]
    fn low_elevation_is_clamped() {
        let location = bangkok();
        let model = tropical();
        let at_zero = model.attenuation(&path(&location, 12.0e9, 0.0), 99.7);
        let at_floor = model.attenuation(&path(&location, 12.0e9, MIN_ELEVATION), 99.7);
        assert_eq!(at_zero, at_floor);
        assert!(at_zero.total().is_finite());
    }

    #[test]
    fn large_aperture_averages_scintillation() {
        let model = tropical();
        let small = model.scintillation_attenuation(14.0, 30.0, 0.3, Some(0.6));
        let large = model.scintillation_attenuation(14.0, 30.0, 0.3, Some(7.0));
        let point = model.scintillation_attenuation(14.0, 30.0, 0.3, None);
        assert!(large < small);
        assert!(small <= point);
    }

    #[test]
    fn total_combines_components() {
        let attenuation = Attenuation {
            gas: 0.5,
            cloud: 1.0,
            rain: 2.0,
            scintillation: 4.0,
        };
        assert!((attenuation.total() - 5.5).abs() < 1e-12);
        assert_eq!(Attenuation::none().total(), 0.0);
    }
}
