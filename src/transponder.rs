use std::fmt;

use rfconversions::power::linear_to_db;
use serde::Deserialize;

use crate::curve::Curve;
use crate::error::LinkError;

/// Transponder amplifier operating mode.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub enum OperatingMode {
    /// Fixed gain mode
    #[serde(rename = "FGM")]
    Fgm,
    /// Automatic level control
    #[serde(rename = "ALC")]
    Alc,
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OperatingMode::Fgm => write!(f, "FGM"),
            OperatingMode::Alc => write!(f, "ALC"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Transponder {
    pub name: String,
    pub primary_mode: OperatingMode,
    #[serde(default)]
    pub secondary_mode: Option<OperatingMode>,
    pub bandwidth: f64,               // Hz
    pub saturated_eirp: f64,          // dBW, at downlink beam peak
    pub saturation_flux_density: f64, // dBW/m², at uplink beam peak G/T
    /// (input backoff, output backoff) in dB below saturation.
    #[serde(default)]
    pub backoff_curve: Curve,
    /// (number of carriers, total output backoff dB) held by the ALC loop.
    #[serde(default)]
    pub alc_backoff: Curve,
    #[serde(default)]
    pub ci_intermodulation: Option<f64>, // C/I3IM or NPR, dB
}

impl Transponder {
    pub fn supports(&self, mode: OperatingMode) -> bool {
        self.primary_mode == mode || self.secondary_mode == Some(mode)
    }

    /// Output backoff for a total input backoff.
    ///
    /// Only the branch from saturation (the least output backoff) toward deep
    /// backoff is used. Any drive past saturation holds the saturation output
    /// backoff, so overdrive never looks like a usable operating point. Deep
    /// backoff beyond the table continues the last segment. An empty curve is
    /// an ideal linear amplifier limited at saturation.
    pub fn output_backoff(&self, input_backoff: f64) -> f64 {
        let branch = self.backoff_curve.from_minimum();
        match branch.first() {
            None => input_backoff.max(0.0),
            Some((ibo, obo)) if input_backoff <= ibo => obo,
            Some(_) => branch.extrapolate(input_backoff).unwrap_or(input_backoff),
        }
    }

    /// Smallest total input backoff at or below saturation drive that yields
    /// `output_backoff`.
    pub fn input_backoff(&self, output_backoff: f64) -> f64 {
        let branch = self.backoff_curve.from_minimum();
        let (Some(saturation), Some(last)) = (branch.first(), branch.last()) else {
            return output_backoff.max(0.0);
        };
        if output_backoff <= saturation.1 {
            return saturation.0;
        }
        if output_backoff > last.1 {
            let points = branch.points();
            if points.len() < 2 {
                return last.0 + (output_backoff - last.1);
            }
            let (x0, y0) = points[points.len() - 2];
            let (x1, y1) = points[points.len() - 1];
            if y1 == y0 {
                return last.0;
            }
            return x1 + (output_backoff - y1) * (x1 - x0) / (y1 - y0);
        }
        branch.inverse(output_backoff).unwrap_or(output_backoff)
    }

    /// Rejects a transponder whose output backoff falls again once past
    /// saturation, or that has no bandwidth.
    pub fn validate(&self) -> Result<(), LinkError> {
        if !(self.bandwidth > 0.0) {
            return Err(LinkError::InvalidInput(format!(
                "transponder {} has no bandwidth",
                self.name
            )));
        }
        if !self.backoff_curve.from_minimum().is_non_decreasing() {
            return Err(LinkError::InvalidInput(format!(
                "transponder {} output backoff decreases with input backoff past saturation",
                self.name
            )));
        }
        Ok(())
    }

    /// Total output backoff the ALC holds with `carriers` active carriers.
    pub fn alc_output_backoff(&self, carriers: u32) -> Option<f64> {
        self.alc_backoff.interpolate(f64::from(carriers))
    }

    /// Share of the transponder a carrier of `bandwidth` Hz is entitled to, dB.
    pub fn carrier_share(&self, bandwidth: f64) -> f64 {
        linear_to_db(self.bandwidth / bandwidth)
    }
}
