use std::fmt;

use crate::interference::aggregate_ci;
use crate::leg::Weather;

/// The four weather combinations a link is sized for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Scenario {
    ClearSky,
    RainUp,
    RainDown,
    RainBoth,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::ClearSky,
        Scenario::RainUp,
        Scenario::RainDown,
        Scenario::RainBoth,
    ];

    pub fn uplink_weather(self) -> Weather {
        match self {
            Scenario::RainUp | Scenario::RainBoth => Weather::Rain,
            Scenario::ClearSky | Scenario::RainDown => Weather::Clear,
        }
    }

    pub fn downlink_weather(self) -> Weather {
        match self {
            Scenario::RainDown | Scenario::RainBoth => Weather::Rain,
            Scenario::ClearSky | Scenario::RainUp => Weather::Clear,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Scenario::ClearSky => "clear sky",
            Scenario::RainUp => "rain up",
            Scenario::RainDown => "rain down",
            Scenario::RainBoth => "rain both",
        };
        write!(f, "{}", name)
    }
}

/// Combined C/(N+I) of every impairment of a scenario, dB.
///
/// Noise and interference add as powers, so this is the same inverse-power
/// sum as [`aggregate_ci`].
pub fn combine(cn_values: &[f64], ci_values: &[f64]) -> f64 {
    aggregate_ci(cn_values.iter().chain(ci_values).copied())
}
