use std::fmt;

use serde::Deserialize;

use crate::error::LinkError;

/// A modulation-and-coding group: one operating point of the modem.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Mcg {
    pub name: String,
    pub required_cn: f64,         // dB, combined C/(N+I) threshold
    pub spectral_efficiency: f64, // bits/s/Hz
}

impl fmt::Display for Mcg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:.2} dB, {:.3} b/Hz)",
            self.name, self.required_cn, self.spectral_efficiency
        )
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Modem {
    pub name: String,
    #[serde(default = "default_roll_off")]
    pub roll_off: f64,
    #[serde(default)]
    pub acm: bool,
    pub mcgs: Vec<Mcg>,
    #[serde(default)]
    pub ci_intermodulation: Option<f64>, // C/I3IM, dB
}

fn default_roll_off() -> f64 {
    0.2
}

impl Modem {
    pub fn new(name: &str, acm: bool, mcgs: Vec<Mcg>) -> Modem {
        Modem {
            name: name.to_string(),
            roll_off: default_roll_off(),
            acm,
            mcgs,
            ci_intermodulation: None,
        }
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.mcgs.is_empty() {
            return Err(LinkError::InvalidInput(format!(
                "modem {} has no MCG points",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.roll_off) {
            return Err(LinkError::InvalidInput(format!(
                "modem {} roll-off {} is outside 0..=1",
                self.name, self.roll_off
            )));
        }
        if let Some(mcg) = self
            .mcgs
            .iter()
            .find(|mcg| !mcg.required_cn.is_finite() || !(mcg.spectral_efficiency > 0.0))
        {
            return Err(LinkError::InvalidInput(format!(
                "modem {} MCG {} needs a finite threshold and positive efficiency",
                self.name, mcg.name
            )));
        }
        Ok(())
    }

    /// Lowest threshold in the table, dB.
    pub fn lowest_threshold(&self) -> f64 {
        self.mcgs
            .iter()
            .map(|mcg| mcg.required_cn)
            .fold(f64::INFINITY, f64::min)
    }
}
