use std::fmt;

use serde::Deserialize;

use crate::curve::Curve;
use crate::error::LinkError;
use crate::geometry::{angular_offset, Location};
use crate::station::Station;
use crate::transponder::Transponder;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
pub enum Polarization {
    #[serde(rename = "H")]
    Horizontal,
    #[serde(rename = "V")]
    Vertical,
    #[serde(rename = "LHCP")]
    LeftHandCircular,
    #[serde(rename = "RHCP")]
    RightHandCircular,
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Polarization::Horizontal => "H",
            Polarization::Vertical => "V",
            Polarization::LeftHandCircular => "LHCP",
            Polarization::RightHandCircular => "RHCP",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct FrequencyRange {
    pub start: f64, // Hz
    pub stop: f64,  // Hz
}

impl FrequencyRange {
    pub fn new(start: f64, stop: f64) -> FrequencyRange {
        FrequencyRange { start, stop }
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.start && frequency <= self.stop
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:.3}-{:.3} GHz",
            self.start / 1.0e9,
            self.stop / 1.0e9
        )
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Satellite {
    pub name: String,
    pub orbital_slot: f64, // degrees east
    #[serde(default)]
    pub half_station_keeping_box: f64, // degrees
}

/// Gain contour measured at a named location, overriding the generic contour.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DefinedContour {
    pub location: String,
    pub relative_gain: f64, // dB below beam peak (<= 0)
}

/// An uplink or downlink spot/regional beam.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Beam {
    pub name: String,
    pub frequency_range: FrequencyRange,
    pub polarizations: Vec<Polarization>,
    pub center: Location,
    /// (angular offset from beam center in degrees, relative gain dB)
    pub contour: Curve,
    #[serde(default)]
    pub defined_contours: Vec<DefinedContour>,
    #[serde(default)]
    pub peak_gt: Option<f64>, // dB/K, uplink beams only
}

impl Beam {
    /// Relative gain toward `location`, or `None` outside coverage.
    pub fn relative_gain_at(&self, location: &Location) -> Option<f64> {
        if let Some(defined) = self
            .defined_contours
            .iter()
            .find(|defined| defined.location == location.name)
        {
            return Some(defined.relative_gain);
        }
        let (edge, _) = self.contour.last()?;
        let offset = angular_offset(&self.center, location);
        if offset > edge {
            return None;
        }
        self.contour.interpolate(offset)
    }

    /// Worst-case drop in relative gain toward `location` while the satellite
    /// wanders `half_box` degrees inside its station-keeping box, dB.
    ///
    /// The footprint moves with the sub-satellite point, so the offset from
    /// beam center can grow by up to `half_box`. Defined contours are
    /// measured at the location and carry no variation.
    pub fn gain_variation(&self, location: &Location, half_box: f64) -> f64 {
        if !(half_box > 0.0)
            || self
                .defined_contours
                .iter()
                .any(|defined| defined.location == location.name)
        {
            return 0.0;
        }
        let offset = angular_offset(&self.center, location);
        match (
            self.contour.interpolate(offset),
            self.contour.interpolate(offset + half_box),
        ) {
            (Some(nominal), Some(displaced)) => (nominal - displaced).max(0.0),
            _ => 0.0,
        }
    }

    pub fn supports(&self, polarization: Polarization) -> bool {
        self.polarizations.contains(&polarization)
    }

    pub fn validate(&self) -> Result<(), LinkError> {
        if self.contour.is_empty() {
            return Err(LinkError::InvalidInput(format!(
                "beam {} has an empty gain contour",
                self.name
            )));
        }
        if !self.contour.is_non_increasing() {
            return Err(LinkError::InvalidInput(format!(
                "beam {} gain contour increases away from beam center",
                self.name
            )));
        }
        Ok(())
    }
}

/// An assigned transponder slice with its beams and frequencies.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub name: String,
    pub satellite: Satellite,
    pub transponder: Transponder,
    pub uplink_beam: Beam,
    pub downlink_beam: Beam,
    pub uplink_frequency: f64,   // Hz, center
    pub downlink_frequency: f64, // Hz, center
    pub uplink_polarization: Polarization,
    pub downlink_polarization: Polarization,
    /// Default station used when the request names none.
    pub gateway: Option<Station>,
}

impl Channel {
    pub fn validate(&self) -> Result<(), LinkError> {
        if !self.uplink_beam.frequency_range.contains(self.uplink_frequency) {
            return Err(LinkError::InvalidInput(format!(
                "channel {} uplink frequency {:.4} GHz is outside beam {} ({})",
                self.name,
                self.uplink_frequency / 1.0e9,
                self.uplink_beam.name,
                self.uplink_beam.frequency_range
            )));
        }
        if !self
            .downlink_beam
            .frequency_range
            .contains(self.downlink_frequency)
        {
            return Err(LinkError::InvalidInput(format!(
                "channel {} downlink frequency {:.4} GHz is outside beam {} ({})",
                self.name,
                self.downlink_frequency / 1.0e9,
                self.downlink_beam.name,
                self.downlink_beam.frequency_range
            )));
        }
        if self.uplink_beam.peak_gt.is_none() {
            return Err(LinkError::InvalidInput(format!(
                "uplink beam {} has no peak G/T",
                self.uplink_beam.name
            )));
        }
        self.uplink_beam.validate()?;
        self.downlink_beam.validate()?;
        self.transponder.validate()
    }
}
