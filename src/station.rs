use std::f64::consts::PI;

use rfconversions::power::linear_to_db;
use serde::Deserialize;

use crate::attenuation::RainModel;
use crate::channel::{FrequencyRange, Polarization};
use crate::constants::SPEED_OF_LIGHT;
use crate::curve::Curve;
use crate::error::LinkError;
use crate::geometry::Location;

/// Clear-sky antenna temperature when the antenna has no measured table, K.
const DEFAULT_ANTENNA_TEMPERATURE: f64 = 50.0;

/// LNB noise temperature when neither temperature nor noise figure is given, K.
const DEFAULT_LNB_TEMPERATURE: f64 = 75.0;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Antenna {
    pub name: String,
    pub diameter: f64,   // m
    pub efficiency: f64, // aperture efficiency, 0..1
    /// (elevation degrees, clear-sky antenna noise temperature K)
    #[serde(default)]
    pub noise_temperature: Curve,
    #[serde(default)]
    pub transmit_bands: Vec<FrequencyRange>,
    #[serde(default)]
    pub receive_bands: Vec<FrequencyRange>,
    #[serde(default)]
    pub polarizations: Vec<Polarization>,
    #[serde(default)]
    pub pointing_loss: f64, // dB
    #[serde(default)]
    pub xpol_loss: f64, // dB, cross-polar isolation
    #[serde(default)]
    pub axial_ratio_loss: f64, // dB, circular polarization mismatch
}

impl Antenna {
    /// Aperture gain, dBi: `10·log10(η·(π·D·f/c)²)`.
    pub fn gain(&self, frequency: f64) -> f64 {
        let aperture = PI * self.diameter * frequency / SPEED_OF_LIGHT;
        linear_to_db(self.efficiency * aperture * aperture)
    }

    /// Pointing, cross-polar and axial ratio loss together, dB.
    pub fn alignment_loss(&self) -> f64 {
        self.pointing_loss + self.xpol_loss + self.axial_ratio_loss
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if !(self.diameter > 0.0) {
            return Err(LinkError::InvalidInput(format!(
                "antenna {} diameter must be positive, got {} m",
                self.name, self.diameter
            )));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(LinkError::InvalidInput(format!(
                "antenna {} efficiency must be in (0, 1], got {}",
                self.name, self.efficiency
            )));
        }
        let losses = [self.pointing_loss, self.xpol_loss, self.axial_ratio_loss];
        if !losses.iter().all(|loss| loss.is_finite() && *loss >= 0.0) {
            return Err(LinkError::InvalidInput(format!(
                "antenna {} losses must be finite and not negative",
                self.name
            )));
        }
        Ok(())
    }

    /// Diameter of an ideal aperture with the same gain, m.
    pub fn effective_diameter(&self) -> f64 {
        self.diameter * self.efficiency.sqrt()
    }

    pub fn noise_temperature_at(&self, elevation: f64) -> f64 {
        self.noise_temperature
            .interpolate(elevation)
            .unwrap_or(DEFAULT_ANTENNA_TEMPERATURE)
    }

    pub fn can_transmit(&self, frequency: f64) -> bool {
        self.transmit_bands.iter().any(|band| band.contains(frequency))
    }

    pub fn can_receive(&self, frequency: f64) -> bool {
        self.receive_bands.iter().any(|band| band.contains(frequency))
    }

    pub fn supports(&self, polarization: Polarization) -> bool {
        self.polarizations.is_empty() || self.polarizations.contains(&polarization)
    }
}

/// High power amplifier (BUC/SSPA/TWTA) feeding a transmit antenna.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Hpa {
    pub name: String,
    pub output_power: f64, // W, rated
    #[serde(default)]
    pub output_backoff: f64, // dB below rated power for linearity
    #[serde(default)]
    pub ifl_loss: f64, // dB, waveguide/feed loss to the antenna flange
    #[serde(default)]
    pub ci_intermodulation: Option<f64>, // C/I3IM, dB
}

impl Hpa {
    /// Power delivered to the antenna, dBW.
    pub fn output_power_dbw(&self) -> f64 {
        linear_to_db(self.output_power) - self.output_backoff - self.ifl_loss
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if !(self.output_power > 0.0) || !self.output_power.is_finite() {
            return Err(LinkError::InvalidInput(format!(
                "HPA {} output power must be positive, got {} W",
                self.name, self.output_power
            )));
        }
        Ok(())
    }
}

/// A ground terminal: user station or gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct Station {
    pub name: String,
    pub location: Location,
    pub antenna: Antenna,
    pub hpa: Option<Hpa>,
    pub lnb_noise_temperature: Option<f64>, // K
    pub lnb_noise_figure: Option<f64>,      // dB
    pub upc_range: f64,                     // dB of uplink power control
    /// Climate at the station, preferred over the request-wide rain model.
    pub rain_model: Option<RainModel>,
}

impl Station {
    pub fn new(name: &str, location: Location, antenna: Antenna) -> Station {
        Station {
            name: name.to_string(),
            location,
            antenna,
            hpa: None,
            lnb_noise_temperature: None,
            lnb_noise_figure: None,
            upc_range: 0.0,
            rain_model: None,
        }
    }

    pub fn with_hpa(mut self, hpa: Hpa) -> Station {
        self.hpa = Some(hpa);
        self
    }

    /// Rejects antenna and HPA records that would give meaningless gains.
    pub fn validate(&self) -> Result<(), LinkError> {
        self.antenna.validate()?;
        match &self.hpa {
            Some(hpa) => hpa.validate(),
            None => Ok(()),
        }
    }

    pub fn lnb_temperature(&self) -> f64 {
        match (self.lnb_noise_temperature, self.lnb_noise_figure) {
            (Some(temperature), _) => temperature,
            (None, Some(noise_figure)) => {
                rfconversions::noise::noise_temperature_from_noise_figure(noise_figure)
            }
            (None, None) => DEFAULT_LNB_TEMPERATURE,
        }
    }

    /// Highest EIRP the station can radiate, dBW. `None` for receive-only
    /// stations.
    pub fn max_eirp(&self, frequency: f64) -> Option<f64> {
        self.hpa
            .as_ref()
            .map(|hpa| hpa.output_power_dbw() + self.antenna.gain(frequency))
    }
}
