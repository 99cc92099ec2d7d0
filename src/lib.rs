//! Satellite link budget calculations.
//!
//! A [`Link`] ties a [`Channel`] (satellite, transponder and beams) to a
//! [`Modem`] and the ground stations at either end, and
//! [`Link::calculate`] produces C/N, C/I, C/(N+I) and ACM capacity for
//! clear sky, rain on the uplink, rain on the downlink and rain on both.

pub mod attenuation;
pub mod capacity;
pub mod channel;
pub mod cli;
pub mod combine;
pub mod config;
pub mod constants;
pub mod curve;
pub mod error;
pub mod geometry;
pub mod interference;
pub mod leg;
pub mod link;
pub mod modem;
pub mod power;
#[cfg(feature = "report")]
pub mod report;
pub mod result;
pub mod station;
pub mod transponder;

pub use attenuation::{Attenuation, AttenuationModel, RainModel, SlantPath};
pub use capacity::{AvailabilitySearch, Capacity, MaxAvailability};
pub use channel::{Beam, Channel, DefinedContour, FrequencyRange, Polarization, Satellite};
pub use combine::{combine, Scenario};
pub use config::{load_config, load_reference, ConfigError, LinkConfig, ReferenceData};
pub use curve::Curve;
pub use error::LinkError;
pub use geometry::{GeometryProvider, GeostationaryGeometry, Location, LookAngles};
pub use interference::{aggregate_ci, InterferenceFigures, InterferenceSource, LegInterference};
pub use leg::{Direction, LegResult, Weather};
pub use link::{Link, LinkBuilder};
pub use modem::{Mcg, Modem};
pub use power::{EirpSolution, OperatingPoint, PowerOptimizer};
pub use result::{LinkResult, PerScenario, ScenarioResult};
pub use station::{Antenna, Hpa, Station};
pub use transponder::{OperatingMode, Transponder};
