use std::fmt;

use crate::capacity::{Capacity, MaxAvailability};
use crate::combine::Scenario;
use crate::error::LinkError;
use crate::geometry::LookAngles;
use crate::interference::LegInterference;
use crate::leg::LegResult;
use crate::power::OperatingPoint;
use crate::transponder::OperatingMode;

/// One value per weather scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct PerScenario<T> {
    pub clear_sky: T,
    pub rain_up: T,
    pub rain_down: T,
    pub rain_both: T,
}

impl<T> PerScenario<T> {
    pub fn from_fn<F>(mut f: F) -> PerScenario<T>
    where
        F: FnMut(Scenario) -> T,
    {
        PerScenario {
            clear_sky: f(Scenario::ClearSky),
            rain_up: f(Scenario::RainUp),
            rain_down: f(Scenario::RainDown),
            rain_both: f(Scenario::RainBoth),
        }
    }

    pub fn get(&self, scenario: Scenario) -> &T {
        match scenario {
            Scenario::ClearSky => &self.clear_sky,
            Scenario::RainUp => &self.rain_up,
            Scenario::RainDown => &self.rain_down,
            Scenario::RainBoth => &self.rain_both,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Scenario, &T)> {
        Scenario::ALL.into_iter().map(move |scenario| (scenario, self.get(scenario)))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UplinkResult {
    pub station: String,
    pub look_angles: LookAngles,
    pub antenna_gain: f64,      // dBi
    pub relative_gain: f64,     // dB, uplink beam contour at the station
    pub gain_variation: f64,    // dB, station keeping
    pub satellite_gt: f64,      // dB/K
    pub max_eirp: f64,          // dBW
    pub optimized_eirp: Option<f64>, // dBW, when power optimization is on
    /// Uplink power control applied in rain, dB.
    pub upc: f64,
    pub availability: f64, // percent
    pub clear: LegResult,
    pub rain: LegResult,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SatelliteResult {
    pub transponder: String,
    pub mode: OperatingMode,
    /// Total transponder output backoff held in this mode, dB.
    pub output_backoff: f64,
    pub iterations: u32,
    pub half_station_keeping_box: f64, // degrees
    /// Operating point with the uplink in clear sky and in rain.
    pub clear: OperatingPoint,
    pub rain: OperatingPoint,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DownlinkResult {
    pub station: String,
    pub look_angles: LookAngles,
    pub antenna_gain: f64,  // dBi
    pub relative_gain: f64, // dB, downlink beam contour at the station
    pub gain_variation: f64, // dB, station keeping
    pub availability: f64,  // percent
    /// Downlink legs for each scenario; downlink EIRP follows the uplink
    /// weather through the transponder.
    pub legs: PerScenario<LegResult>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterferenceResult {
    pub uplink: LegInterference,
    pub downlink: LegInterference,
}

/// Ratios and capacity of one scenario. Ratios are `None` when the legs
/// could not be computed.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub cn_up: Option<f64>,    // dB
    pub cn_down: Option<f64>,  // dB
    pub ci_up: Option<f64>,    // dB
    pub ci_down: Option<f64>,  // dB
    pub combined: Option<f64>, // dB, C/(N+I)
    pub capacity: Option<Capacity>,
    pub bandwidth_mhz: f64,
    pub throughput: f64, // bits/s, zero when nothing closes
}

impl ScenarioResult {
    pub fn undefined(scenario: Scenario, bandwidth: f64) -> ScenarioResult {
        ScenarioResult {
            scenario,
            cn_up: None,
            cn_down: None,
            ci_up: None,
            ci_down: None,
            combined: None,
            capacity: None,
            bandwidth_mhz: bandwidth / 1.0e6,
            throughput: 0.0,
        }
    }

    pub fn closes(&self) -> bool {
        self.capacity.is_some()
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.combined, &self.capacity) {
            (Some(combined), Some(capacity)) => write!(
                f,
                "{}: C/(N+I) {:.2} dB, {}",
                self.scenario, combined, capacity
            ),
            (Some(combined), None) => write!(
                f,
                "{}: C/(N+I) {:.2} dB, no MCG",
                self.scenario, combined
            ),
            (None, _) => write!(f, "{}: undefined", self.scenario),
        }
    }
}

/// Everything one link calculation produced.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkResult {
    pub channel: String,
    pub modem: String,
    pub bandwidth: f64, // Hz
    pub uplink: Option<UplinkResult>,
    pub satellite: Option<SatelliteResult>,
    pub downlink: Option<DownlinkResult>,
    pub interference: Option<InterferenceResult>,
    pub scenarios: PerScenario<ScenarioResult>,
    pub max_availability: Option<MaxAvailability<Capacity>>,
    pub warnings: Vec<LinkError>,
    pub errors: Vec<LinkError>,
}

impl LinkResult {
    pub fn scenario(&self, scenario: Scenario) -> &ScenarioResult {
        self.scenarios.get(scenario)
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.errors.is_empty()
    }
}

impl fmt::Display for LinkResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} / {} / {:.3} MHz",
            self.channel,
            self.modem,
            self.bandwidth / 1.0e6
        )?;
        for (_, scenario) in self.scenarios.iter() {
            writeln!(f, "  {}", scenario)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {}", warning)?;
        }
        for error in &self.errors {
            writeln!(f, "  error: {}", error)?;
        }
        Ok(())
    }
}
