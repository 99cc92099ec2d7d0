use thiserror::Error;

use crate::combine::Scenario;
use crate::interference::InterferenceSource;
use crate::leg::Direction;
use crate::transponder::OperatingMode;

/// Everything a link calculation can report.
///
/// `Link::calculate` only returns `Err` for malformed input
/// ([`LinkError::InvalidInput`]); every other variant is collected on the
/// [`LinkResult`](crate::LinkResult) as a warning or a scenario/leg error.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LinkError {
    #[error("transponder {transponder} doesn't have {mode} mode")]
    UnsupportedMode {
        transponder: String,
        mode: OperatingMode,
    },

    #[error("station {station} can't be used with beam {beam}: {reason}")]
    StationIncompatible {
        station: String,
        beam: String,
        reason: String,
    },

    #[error("no usable {direction} station")]
    NoStation { direction: Direction },

    #[error("no MCG of modem {modem} fits {ratio:.2} dB (lowest threshold {required:.2} dB)")]
    NoFeasibleMcg {
        modem: String,
        ratio: f64,
        required: f64,
    },

    #[error("{scenario}: {source}")]
    Scenario {
        scenario: Scenario,
        source: Box<LinkError>,
    },

    #[error("uplink EIRP of {requested:.2} dBW exceeds the {limit:.2} dBW station {station} can radiate, clamped")]
    EirpClamped {
        station: String,
        requested: f64,
        limit: f64,
    },

    #[error("{direction} {interferer} C/I not supplied, assuming {ci:.1} dB")]
    InterferenceDefaulted {
        direction: Direction,
        interferer: InterferenceSource,
        ci: f64,
    },

    #[error("transponder {transponder} has no ALC backoff table, using {output_backoff:.2} dB output backoff")]
    MissingAlcTable {
        transponder: String,
        output_backoff: f64,
    },

    #[error("ALC target of {target:.2} dBW is out of reach on transponder {transponder}, stopped at {reached:.2} dBW")]
    AlcTargetUnreachable {
        transponder: String,
        target: f64,
        reached: f64,
    },

    #[error("no rain model for {direction} station {station}, rain scenarios use clear-sky figures")]
    NoRainModel {
        direction: Direction,
        station: String,
    },

    #[error("no availability between {min:.3}% and {max:.3}% leaves a feasible MCG")]
    AvailabilityNotFound { min: f64, max: f64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LinkError {
    /// Wraps an error with the weather scenario it happened in.
    pub fn in_scenario(self, scenario: Scenario) -> LinkError {
        LinkError::Scenario {
            scenario,
            source: Box::new(self),
        }
    }
}
