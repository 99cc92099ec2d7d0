use std::fmt;

use rfconversions::power::{db_to_linear, linear_to_db};
use serde::Deserialize;

use crate::constants::NOMINAL_CI;
use crate::error::LinkError;
use crate::leg::Direction;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InterferenceSource {
    Intermodulation,
    AdjacentSatellite,
    AdjacentCell,
}

impl fmt::Display for InterferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterferenceSource::Intermodulation => write!(f, "intermodulation"),
            InterferenceSource::AdjacentSatellite => write!(f, "adjacent satellite"),
            InterferenceSource::AdjacentCell => write!(f, "adjacent cell"),
        }
    }
}

/// Composite C/I of independent interferers, dB.
///
/// `C/I = −10·log10(Σ 10^(−CI_i/10))`. No interferers means no interference
/// (`+∞`).
pub fn aggregate_ci<I>(sources: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let inverse: f64 = sources.into_iter().map(|ci| db_to_linear(-ci)).sum();
    -linear_to_db(inverse)
}

/// Externally supplied C/I figures, dB. Missing figures are defaulted.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct InterferenceFigures {
    #[serde(default)]
    pub uplink_adjacent_satellite: Option<f64>,
    #[serde(default)]
    pub uplink_adjacent_cell: Option<f64>,
    #[serde(default)]
    pub downlink_adjacent_satellite: Option<f64>,
    #[serde(default)]
    pub downlink_adjacent_cell: Option<f64>,
}

/// Interference on one leg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegInterference {
    pub direction: Direction,
    pub intermodulation: f64,    // dB
    pub adjacent_satellite: f64, // dB
    pub adjacent_cell: f64,      // dB
}

impl LegInterference {
    /// Resolves every source of one leg, taking the first supplied figure and
    /// otherwise the nominal C/I with a warning.
    pub fn resolve(
        direction: Direction,
        intermodulation: &[Option<f64>],
        adjacent_satellite: Option<f64>,
        adjacent_cell: Option<f64>,
        warnings: &mut Vec<LinkError>,
    ) -> LegInterference {
        let mut resolve_one = |interferer, figure: Option<f64>| {
            figure.unwrap_or_else(|| {
                warnings.push(LinkError::InterferenceDefaulted {
                    direction,
                    interferer,
                    ci: NOMINAL_CI,
                });
                NOMINAL_CI
            })
        };
        let intermodulation = resolve_one(
            InterferenceSource::Intermodulation,
            intermodulation.iter().flatten().next().copied(),
        );
        let adjacent_satellite = resolve_one(InterferenceSource::AdjacentSatellite, adjacent_satellite);
        let adjacent_cell = resolve_one(InterferenceSource::AdjacentCell, adjacent_cell);
        LegInterference {
            direction,
            intermodulation,
            adjacent_satellite,
            adjacent_cell,
        }
    }

    pub fn sources(&self) -> [(InterferenceSource, f64); 3] {
        [
            (InterferenceSource::Intermodulation, self.intermodulation),
            (InterferenceSource::AdjacentSatellite, self.adjacent_satellite),
            (InterferenceSource::AdjacentCell, self.adjacent_cell),
        ]
    }

    pub fn composite(&self) -> f64 {
        aggregate_ci(self.sources().iter().map(|(_, ci)| *ci))
    }
}

impl fmt::Display for LegInterference {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} C/I: IM {:.2} dB, ASI {:.2} dB, ACI {:.2} dB, total {:.2} dB",
            self.direction,
            self.intermodulation,
            self.adjacent_satellite,
            self.adjacent_cell,
            self.composite()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_equal_sources_lose_3db() {
        let ci = aggregate_ci([20.0, 20.0]);
        assert!((ci - (20.0 - 3.0103)).abs() < 1e-4);
    }

    #[test]
    fn single_source_is_itself() {
        assert!((aggregate_ci([17.5]) - 17.5).abs() < 1e-12);
    }

    #[test]
    fn empty_is_interference_free() {
        assert_eq!(aggregate_ci(std::iter::empty()), f64::INFINITY);
    }

    #[test]
    fn infinite_source_contributes_nothing() {
        assert!((aggregate_ci([f64::INFINITY, 25.0]) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn composite_is_below_worst_source() {
        let leg = LegInterference {
            direction: Direction::Uplink,
            intermodulation: 22.0,
            adjacent_satellite: 27.0,
            adjacent_cell: 30.0,
        };
        assert!(leg.composite() < 22.0);
        assert!(leg.composite() > 19.0);
    }

    #[test]
    fn resolve_takes_first_supplied_intermodulation() {
        let mut warnings = Vec::new();
        let leg = LegInterference::resolve(
            Direction::Uplink,
            &[None, Some(24.0), Some(30.0)],
            Some(28.0),
            Some(26.0),
            &mut warnings,
        );
        assert_eq!(leg.intermodulation, 24.0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn resolve_defaults_with_warnings() {
        let mut warnings = Vec::new();
        let leg = LegInterference::resolve(Direction::Downlink, &[None], None, Some(26.0), &mut warnings);
        assert_eq!(leg.intermodulation, NOMINAL_CI);
        assert_eq!(leg.adjacent_satellite, NOMINAL_CI);
        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings[1].to_string(),
            "downlink adjacent satellite C/I not supplied, assuming 50.0 dB"
        );
    }
}
