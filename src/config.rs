//! Scenario files: reference tables plus one `[link]` request, in TOML.
//!
//! Reference tables may be split over several files with `[[include]]`
//! entries; include paths resolve against the including file's directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::attenuation::RainModel;
use crate::capacity::AvailabilitySearch;
use crate::channel::{Beam, Channel, Polarization, Satellite};
use crate::geometry::Location;
use crate::interference::InterferenceFigures;
use crate::link::{Link, DEFAULT_NUM_CARRIERS};
use crate::modem::Modem;
use crate::station::{Antenna, Hpa, Station};
use crate::transponder::{OperatingMode, Transponder};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{kind} {name} is not defined")]
    UnknownReference { kind: &'static str, name: String },
    #[error("{0} includes itself")]
    IncludeCycle(PathBuf),
    #[error("no [link] table in {0}")]
    MissingLink(PathBuf),
}

#[derive(Deserialize, Debug)]
struct Include {
    path: String,
}

#[derive(Deserialize, Debug, Clone)]
struct StationRecord {
    name: String,
    location: Location,
    antenna: String,
    #[serde(default)]
    hpa: Option<String>,
    #[serde(default)]
    lnb_noise_temperature: Option<f64>,
    #[serde(default)]
    lnb_noise_figure: Option<f64>,
    #[serde(default)]
    upc_range: f64,
    #[serde(default)]
    rain_model: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
struct ChannelRecord {
    name: String,
    satellite: String,
    transponder: String,
    uplink_beam: String,
    downlink_beam: String,
    uplink_frequency: f64,
    downlink_frequency: f64,
    uplink_polarization: Polarization,
    downlink_polarization: Polarization,
    #[serde(default)]
    gateway: Option<String>,
}

/// The `[link]` table: one calculation request by record name.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub channel: String,
    pub modem: String,
    pub bandwidth: f64, // Hz
    #[serde(default)]
    pub uplink_station: Option<String>,
    #[serde(default)]
    pub downlink_station: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub rain_model: Option<String>,
    #[serde(default = "default_power_optimization")]
    pub power_optimization: bool,
    #[serde(default)]
    pub power_overused: f64,
    #[serde(default = "default_num_carriers")]
    pub num_carriers: u32,
    #[serde(default)]
    pub forced_operating_mode: Option<OperatingMode>,
    #[serde(default)]
    pub required_output_backoff: f64,
    #[serde(default)]
    pub availability: Option<f64>,
    #[serde(default)]
    pub interference: InterferenceFigures,
    #[serde(default)]
    pub availability_search: Option<AvailabilitySearch>,
}

fn default_power_optimization() -> bool {
    true
}

fn default_num_carriers() -> u32 {
    DEFAULT_NUM_CARRIERS
}

#[derive(Deserialize, Debug, Default)]
struct ConfigFile {
    #[serde(default)]
    include: Vec<Include>,
    #[serde(default)]
    satellites: Vec<Satellite>,
    #[serde(default)]
    transponders: Vec<Transponder>,
    #[serde(default)]
    uplink_beams: Vec<Beam>,
    #[serde(default)]
    downlink_beams: Vec<Beam>,
    #[serde(default)]
    antennas: Vec<Antenna>,
    #[serde(default)]
    hpas: Vec<Hpa>,
    #[serde(default)]
    rain_models: Vec<RainModel>,
    #[serde(default)]
    stations: Vec<StationRecord>,
    #[serde(default)]
    gateways: Vec<StationRecord>,
    #[serde(default)]
    modems: Vec<Modem>,
    #[serde(default)]
    channels: Vec<ChannelRecord>,
    #[serde(default)]
    link: Option<LinkRecord>,
}

impl ConfigFile {
    fn merge(&mut self, other: ConfigFile) {
        self.satellites.extend(other.satellites);
        self.transponders.extend(other.transponders);
        self.uplink_beams.extend(other.uplink_beams);
        self.downlink_beams.extend(other.downlink_beams);
        self.antennas.extend(other.antennas);
        self.hpas.extend(other.hpas);
        self.rain_models.extend(other.rain_models);
        self.stations.extend(other.stations);
        self.gateways.extend(other.gateways);
        self.modems.extend(other.modems);
        self.channels.extend(other.channels);
        if self.link.is_none() {
            self.link = other.link;
        }
    }
}

fn find<'r, T>(
    records: &'r [T],
    kind: &'static str,
    name: &str,
    name_of: impl Fn(&T) -> &str,
) -> Result<&'r T, ConfigError> {
    records
        .iter()
        .find(|record| name_of(record) == name)
        .ok_or_else(|| ConfigError::UnknownReference {
            kind,
            name: name.to_string(),
        })
}

/// Read-only reference records, resolved and looked up by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReferenceData {
    pub rain_models: Vec<RainModel>,
    pub stations: Vec<Station>,
    pub gateways: Vec<Station>,
    pub modems: Vec<Modem>,
    pub channels: Vec<Channel>,
}

impl ReferenceData {
    pub fn channel(&self, name: &str) -> Result<&Channel, ConfigError> {
        find(&self.channels, "channel", name, |c| c.name.as_str())
    }

    pub fn modem(&self, name: &str) -> Result<&Modem, ConfigError> {
        find(&self.modems, "modem", name, |m| m.name.as_str())
    }

    /// A station, or a gateway of that name.
    pub fn station(&self, name: &str) -> Result<&Station, ConfigError> {
        find(&self.stations, "station", name, |s| s.name.as_str())
            .or_else(|_| find(&self.gateways, "station", name, |s| s.name.as_str()))
    }

    pub fn gateway(&self, name: &str) -> Result<&Station, ConfigError> {
        find(&self.gateways, "gateway", name, |s| s.name.as_str())
    }

    pub fn rain_model(&self, name: &str) -> Result<&RainModel, ConfigError> {
        find(&self.rain_models, "rain model", name, |r| r.name.as_str())
    }

    fn resolve(file: ConfigFile) -> Result<ReferenceData, ConfigError> {
        let station = |record: &StationRecord| -> Result<Station, ConfigError> {
            let antenna = find(&file.antennas, "antenna", &record.antenna, |a| a.name.as_str())?;
            let hpa = record
                .hpa
                .as_deref()
                .map(|name| find(&file.hpas, "HPA", name, |h| h.name.as_str()).cloned())
                .transpose()?;
            let rain_model = record
                .rain_model
                .as_deref()
                .map(|name| find(&file.rain_models, "rain model", name, |r| r.name.as_str()).cloned())
                .transpose()?;
            Ok(Station {
                name: record.name.clone(),
                location: record.location.clone(),
                antenna: antenna.clone(),
                hpa,
                lnb_noise_temperature: record.lnb_noise_temperature,
                lnb_noise_figure: record.lnb_noise_figure,
                upc_range: record.upc_range,
                rain_model,
            })
        };

        let stations = file.stations.iter().map(station).collect::<Result<Vec<_>, _>>()?;
        let gateways = file.gateways.iter().map(station).collect::<Result<Vec<_>, _>>()?;

        let channel = |record: &ChannelRecord| -> Result<Channel, ConfigError> {
            let gateway = record
                .gateway
                .as_deref()
                .map(|name| {
                    find(&gateways, "gateway", name, |s| s.name.as_str())
                        .or_else(|_| find(&stations, "gateway", name, |s| s.name.as_str()))
                        .cloned()
                })
                .transpose()?;
            let satellite = find(&file.satellites, "satellite", &record.satellite, |s| {
                s.name.as_str()
            })?;
            let transponder = find(&file.transponders, "transponder", &record.transponder, |t| {
                t.name.as_str()
            })?;
            let uplink_beam = find(&file.uplink_beams, "uplink beam", &record.uplink_beam, |b| {
                b.name.as_str()
            })?;
            let downlink_beam =
                find(&file.downlink_beams, "downlink beam", &record.downlink_beam, |b| {
                    b.name.as_str()
                })?;
            Ok(Channel {
                name: record.name.clone(),
                satellite: satellite.clone(),
                transponder: transponder.clone(),
                uplink_beam: uplink_beam.clone(),
                downlink_beam: downlink_beam.clone(),
                uplink_frequency: record.uplink_frequency,
                downlink_frequency: record.downlink_frequency,
                uplink_polarization: record.uplink_polarization,
                downlink_polarization: record.downlink_polarization,
                gateway,
            })
        };
        let channels = file.channels.iter().map(channel).collect::<Result<Vec<_>, _>>()?;

        Ok(ReferenceData {
            rain_models: file.rain_models,
            stations,
            gateways,
            modems: file.modems,
            channels,
        })
    }
}

/// A loaded scenario file: reference data and the requested link.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    pub reference: ReferenceData,
    pub link: LinkRecord,
}

impl LinkConfig {
    /// The `[link]` request as a [`Link`] over this scenario's records.
    pub fn link(&self) -> Result<Link<'_>, ConfigError> {
        let record = &self.link;
        let reference = &self.reference;
        let channel = reference.channel(&record.channel)?;
        let modem = reference.modem(&record.modem)?;

        let mut builder = Link::builder(channel, modem, record.bandwidth)
            .power_optimization(record.power_optimization)
            .power_overused(record.power_overused)
            .num_carriers(record.num_carriers)
            .required_output_backoff(record.required_output_backoff)
            .interference(record.interference);
        if let Some(name) = &record.uplink_station {
            builder = builder.uplink_station(reference.station(name)?);
        }
        if let Some(name) = &record.downlink_station {
            builder = builder.downlink_station(reference.station(name)?);
        }
        if let Some(name) = &record.gateway {
            builder = builder.gateway(reference.gateway(name)?);
        }
        if let Some(name) = &record.rain_model {
            builder = builder.rain_model(reference.rain_model(name)?);
        }
        if let Some(mode) = record.forced_operating_mode {
            builder = builder.forced_operating_mode(mode);
        }
        if let Some(availability) = record.availability {
            builder = builder.availability(availability);
        }
        if let Some(search) = record.availability_search {
            builder = builder.availability_search(search);
        }
        Ok(builder.build())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LinkConfig, ConfigError> {
    let path = path.as_ref();
    info!(path = %path.display(), "loading config");

    let mut visited = HashSet::new();
    let file = load_file_recursive(path, &mut visited)?;
    let link = file
        .link
        .clone()
        .ok_or_else(|| ConfigError::MissingLink(path.to_path_buf()))?;
    let reference = ReferenceData::resolve(file)?;
    debug!(
        channels = reference.channels.len(),
        modems = reference.modems.len(),
        stations = reference.stations.len(),
        "resolved reference data"
    );
    Ok(LinkConfig { reference, link })
}

/// Reference data alone, for files without a `[link]` table.
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<ReferenceData, ConfigError> {
    let mut visited = HashSet::new();
    let file = load_file_recursive(path.as_ref(), &mut visited)?;
    ReferenceData::resolve(file)
}

fn load_file_recursive(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<ConfigFile, ConfigError> {
    let canonical = path.canonicalize()?;
    if !visited.insert(canonical.clone()) {
        return Err(ConfigError::IncludeCycle(canonical));
    }

    let content = fs::read_to_string(path)?;
    let mut file: ConfigFile = toml::from_str(&content)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    for include in std::mem::take(&mut file.include) {
        let included_path = base_dir.join(&include.path);
        debug!(path = %included_path.display(), "loading included config");
        let included = load_file_recursive(&included_path, visited)?;
        file.merge(included);
    }

    visited.remove(&canonical);
    Ok(file)
}
