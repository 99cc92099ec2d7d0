//! The link calculation: stations, transponder, both legs, interference and
//! capacity under the four weather scenarios.

use tracing::{debug, error, info, warn};

use crate::attenuation::{Attenuation, AttenuationModel, SlantPath};
use crate::capacity::{
    fixed_capacity, seek_max_availability, select_capacity, AvailabilitySearch, Capacity,
    MaxAvailability,
};
use crate::channel::Channel;
use crate::combine::{combine, Scenario};
use crate::constants::DEFAULT_AVAILABILITY;
use crate::error::LinkError;
use crate::geometry::{spreading_loss, GeometryProvider, GeostationaryGeometry, LookAngles};
use crate::interference::{InterferenceFigures, LegInterference};
use crate::leg::{
    compute_leg, noise_bandwidth_db, validate_station, Direction, LegEndpoint, LegResult, Weather,
};
use crate::modem::{Mcg, Modem};
use crate::power::{EirpSolution, OperatingPoint, PowerOptimizer};
use crate::result::{
    DownlinkResult, InterferenceResult, LinkResult, PerScenario, SatelliteResult, ScenarioResult,
    UplinkResult,
};
use crate::station::Station;
use crate::transponder::OperatingMode;

/// Carriers assumed to share the transponder unless told otherwise.
pub const DEFAULT_NUM_CARRIERS: u32 = 10;

/// A link calculation request over borrowed reference data.
#[derive(Clone, Copy)]
pub struct Link<'a> {
    channel: &'a Channel,
    modem: &'a Modem,
    bandwidth: f64, // Hz
    uplink_station: Option<&'a Station>,
    downlink_station: Option<&'a Station>,
    gateway: Option<&'a Station>,
    rain_model: Option<&'a dyn AttenuationModel>,
    geometry: &'a dyn GeometryProvider,
    power_optimization: bool,
    power_overused: f64, // dB
    num_carriers: u32,
    forced_mode: Option<OperatingMode>,
    required_output_backoff: f64, // dB
    interference: InterferenceFigures,
    availability: Option<f64>, // percent
    availability_search: Option<AvailabilitySearch>,
}

/// Builder for [`Link`].
#[derive(Clone, Copy)]
pub struct LinkBuilder<'a> {
    link: Link<'a>,
}

impl<'a> LinkBuilder<'a> {
    /// Station transmitting the carrier. Defaults to the gateway.
    pub fn uplink_station(mut self, station: &'a Station) -> Self {
        self.link.uplink_station = Some(station);
        self
    }

    /// Station receiving the carrier. Defaults to the gateway.
    pub fn downlink_station(mut self, station: &'a Station) -> Self {
        self.link.downlink_station = Some(station);
        self
    }

    /// Overrides the channel's default gateway.
    pub fn gateway(mut self, station: &'a Station) -> Self {
        self.link.gateway = Some(station);
        self
    }

    /// Climate used for stations without a rain model of their own.
    pub fn rain_model(mut self, model: &'a dyn AttenuationModel) -> Self {
        self.link.rain_model = Some(model);
        self
    }

    pub fn geometry(mut self, geometry: &'a dyn GeometryProvider) -> Self {
        self.link.geometry = geometry;
        self
    }

    pub fn power_optimization(mut self, enabled: bool) -> Self {
        self.link.power_optimization = enabled;
        self
    }

    /// Margin taken off the optimized uplink EIRP, dB.
    pub fn power_overused(mut self, margin: f64) -> Self {
        self.link.power_overused = margin;
        self
    }

    pub fn num_carriers(mut self, carriers: u32) -> Self {
        self.link.num_carriers = carriers;
        self
    }

    pub fn forced_operating_mode(mut self, mode: OperatingMode) -> Self {
        self.link.forced_mode = Some(mode);
        self
    }

    pub fn required_output_backoff(mut self, backoff: f64) -> Self {
        self.link.required_output_backoff = backoff;
        self
    }

    pub fn interference(mut self, figures: InterferenceFigures) -> Self {
        self.link.interference = figures;
        self
    }

    /// Availability the rain scenarios are sized for, percent.
    pub fn availability(mut self, availability: f64) -> Self {
        self.link.availability = Some(availability);
        self
    }

    pub fn availability_search(mut self, search: AvailabilitySearch) -> Self {
        self.link.availability_search = Some(search);
        self
    }

    pub fn build(self) -> Link<'a> {
        self.link
    }
}

/// A ground station resolved against its beam.
#[derive(Clone, Copy)]
struct Site<'a> {
    station: &'a Station,
    look_angles: LookAngles,
    relative_gain: f64, // dB
    /// Station-keeping gain variation toward the station, dB.
    gain_variation: f64,
    model: Option<&'a dyn AttenuationModel>,
}

impl<'a> Site<'a> {
    /// Beam gain toward the station with the satellite at the worst corner
    /// of its box, dB.
    fn worst_relative_gain(&self) -> f64 {
        self.relative_gain - self.gain_variation
    }

    fn availability(&self, requested: Option<f64>) -> f64 {
        requested
            .or_else(|| self.model.map(|model| model.default_availability()))
            .unwrap_or(DEFAULT_AVAILABILITY)
    }

    fn attenuation(&self, frequency: f64, availability: f64) -> Attenuation {
        match self.model {
            Some(model) => model.attenuation(
                &SlantPath {
                    location: &self.station.location,
                    frequency,
                    elevation: self.look_angles.elevation,
                    effective_diameter: Some(self.station.antenna.effective_diameter()),
                },
                availability,
            ),
            None => Attenuation::none(),
        }
    }
}

/// The uplink station with its transponder operating point settled.
struct Transmitter<'a> {
    site: Site<'a>,
    optimizer: PowerOptimizer<'a>,
    solution: EirpSolution,
    satellite_gt: f64, // dB/K
    max_eirp: f64,     // dBW
    eirp: f64,         // dBW, clear sky
}

/// Leg results at one availability.
struct Legs {
    uplink_availability: f64,
    downlink_availability: f64,
    upc: f64,
    uplink_clear: LegResult,
    uplink_rain: LegResult,
    operating_clear: OperatingPoint,
    operating_rain: OperatingPoint,
    downlink: Option<PerScenario<LegResult>>,
}

impl Legs {
    fn uplink(&self, weather: Weather) -> &LegResult {
        match weather {
            Weather::Clear => &self.uplink_clear,
            Weather::Rain => &self.uplink_rain,
        }
    }
}

fn record_warning(warnings: &mut Vec<LinkError>, warning: LinkError) {
    warn!("{}", warning);
    warnings.push(warning);
}

fn record_error(errors: &mut Vec<LinkError>, fatal: LinkError) {
    error!("{}", fatal);
    errors.push(fatal);
}

impl<'a> Link<'a> {
    pub fn builder(channel: &'a Channel, modem: &'a Modem, bandwidth: f64) -> LinkBuilder<'a> {
        LinkBuilder {
            link: Link {
                channel,
                modem,
                bandwidth,
                uplink_station: None,
                downlink_station: None,
                gateway: None,
                rain_model: None,
                geometry: &GeostationaryGeometry,
                power_optimization: true,
                power_overused: 0.0,
                num_carriers: DEFAULT_NUM_CARRIERS,
                forced_mode: None,
                required_output_backoff: 0.0,
                interference: InterferenceFigures::default(),
                availability: None,
                availability_search: None,
            },
        }
    }

    /// Rejects requests no calculation can make sense of.
    pub fn validate(&self) -> Result<(), LinkError> {
        if !self.bandwidth.is_finite() || self.bandwidth <= 0.0 {
            return Err(LinkError::InvalidInput(format!(
                "bandwidth must be positive, got {} Hz",
                self.bandwidth
            )));
        }
        if self.bandwidth > self.channel.transponder.bandwidth {
            return Err(LinkError::InvalidInput(format!(
                "bandwidth {:.3} MHz is wider than transponder {} ({:.3} MHz)",
                self.bandwidth / 1.0e6,
                self.channel.transponder.name,
                self.channel.transponder.bandwidth / 1.0e6
            )));
        }
        if self.num_carriers < 1 {
            return Err(LinkError::InvalidInput(
                "at least one carrier must share the transponder".to_string(),
            ));
        }
        if !self.power_overused.is_finite() || !self.required_output_backoff.is_finite() {
            return Err(LinkError::InvalidInput(
                "power overused and required output backoff must be finite".to_string(),
            ));
        }
        if let Some(availability) = self.availability {
            if !(availability > 0.0 && availability < 100.0) {
                return Err(LinkError::InvalidInput(format!(
                    "availability must be between 0 and 100 %, got {}",
                    availability
                )));
            }
        }
        if let Some(search) = &self.availability_search {
            if !(search.min > 0.0 && search.min < search.max && search.max < 100.0) {
                return Err(LinkError::InvalidInput(format!(
                    "availability search bounds {}..{} are not inside 0..100 %",
                    search.min, search.max
                )));
            }
        }
        let stations = [
            self.uplink_station,
            self.downlink_station,
            self.gateway,
            self.channel.gateway.as_ref(),
        ];
        for station in stations.into_iter().flatten() {
            station.validate()?;
        }
        self.channel.validate()?;
        self.modem.validate()
    }

    pub fn calculate(&self) -> Result<LinkResult, LinkError> {
        self.validate()?;
        info!(
            channel = %self.channel.name,
            modem = %self.modem.name,
            bandwidth = self.bandwidth,
            "calculating link"
        );

        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let uplink_site = self.resolve_site(Direction::Uplink, &mut warnings, &mut errors);
        let downlink_site = self.resolve_site(Direction::Downlink, &mut warnings, &mut errors);
        let interference = self.interference_result(uplink_site.as_ref(), &mut warnings);

        let undefined =
            PerScenario::from_fn(|scenario| ScenarioResult::undefined(scenario, self.bandwidth));
        let Some(uplink_site) = uplink_site else {
            return Ok(LinkResult {
                channel: self.channel.name.clone(),
                modem: self.modem.name.clone(),
                bandwidth: self.bandwidth,
                uplink: None,
                satellite: None,
                downlink: None,
                interference: Some(interference),
                scenarios: undefined,
                max_availability: None,
                warnings,
                errors,
            });
        };

        let transmitter = self.transmitter(uplink_site, &mut warnings)?;
        let legs = self.legs(&transmitter, downlink_site.as_ref(), self.availability);

        let uplink = UplinkResult {
            station: uplink_site.station.name.clone(),
            look_angles: uplink_site.look_angles,
            antenna_gain: uplink_site.station.antenna.gain(self.channel.uplink_frequency),
            relative_gain: uplink_site.relative_gain,
            gain_variation: uplink_site.gain_variation,
            satellite_gt: transmitter.satellite_gt,
            max_eirp: transmitter.max_eirp,
            optimized_eirp: self.power_optimization.then_some(transmitter.solution.eirp),
            upc: legs.upc,
            availability: legs.uplink_availability,
            clear: legs.uplink_clear.clone(),
            rain: legs.uplink_rain.clone(),
        };
        let satellite = SatelliteResult {
            transponder: self.channel.transponder.name.clone(),
            mode: transmitter.solution.mode,
            output_backoff: transmitter.solution.output_backoff,
            iterations: transmitter.solution.iterations,
            half_station_keeping_box: self.channel.satellite.half_station_keeping_box,
            clear: legs.operating_clear,
            rain: legs.operating_rain,
        };

        let (Some(downlink_site), Some(downlink_legs)) = (downlink_site, legs.downlink.clone())
        else {
            return Ok(LinkResult {
                channel: self.channel.name.clone(),
                modem: self.modem.name.clone(),
                bandwidth: self.bandwidth,
                uplink: Some(uplink),
                satellite: Some(satellite),
                downlink: None,
                interference: Some(interference),
                scenarios: undefined,
                max_availability: None,
                warnings,
                errors,
            });
        };

        let combined = self.combined(&legs, &interference);
        let fixed = self.held_capacity(&combined);
        if let Some(Err(fatal)) = &fixed {
            record_error(&mut errors, fatal.clone().in_scenario(Scenario::RainBoth));
        }
        let scenarios = PerScenario::from_fn(|scenario| {
            let uplink_leg = legs.uplink(scenario.uplink_weather());
            let downlink_leg = downlink_legs.get(scenario);
            let ratio = combined.get(scenario).unwrap_or(f64::NEG_INFINITY);
            let capacity = match &fixed {
                Some(fixed) => fixed.as_ref().ok().cloned(),
                None => match select_capacity(self.modem, ratio, self.bandwidth) {
                    Ok(capacity) => Some(capacity),
                    Err(fatal) => {
                        record_error(&mut errors, fatal.in_scenario(scenario));
                        None
                    }
                },
            };
            ScenarioResult {
                scenario,
                cn_up: Some(uplink_leg.cn),
                cn_down: Some(downlink_leg.cn),
                ci_up: Some(interference.uplink.composite()),
                ci_down: Some(interference.downlink.composite()),
                combined: *combined.get(scenario),
                throughput: capacity.as_ref().map_or(0.0, |capacity| capacity.throughput),
                capacity,
                bandwidth_mhz: self.bandwidth / 1.0e6,
            }
        });

        let fixed_mcg = fixed
            .as_ref()
            .and_then(|fixed| fixed.as_ref().ok())
            .map(|capacity| &capacity.mcg);
        let max_availability = self.availability_search.and_then(|search| {
            let found = self.seek_max_availability(
                &search,
                &transmitter,
                &downlink_site,
                &interference,
                fixed_mcg,
            );
            match found {
                Ok(found) => Some(found),
                Err(fatal) => {
                    record_error(&mut errors, fatal);
                    None
                }
            }
        });

        let downlink = DownlinkResult {
            station: downlink_site.station.name.clone(),
            look_angles: downlink_site.look_angles,
            antenna_gain: downlink_site
                .station
                .antenna
                .gain(self.channel.downlink_frequency),
            relative_gain: downlink_site.relative_gain,
            gain_variation: downlink_site.gain_variation,
            availability: legs.downlink_availability,
            legs: downlink_legs,
        };

        Ok(LinkResult {
            channel: self.channel.name.clone(),
            modem: self.modem.name.clone(),
            bandwidth: self.bandwidth,
            uplink: Some(uplink),
            satellite: Some(satellite),
            downlink: Some(downlink),
            interference: Some(interference),
            scenarios,
            max_availability,
            warnings,
            errors,
        })
    }

    /// Picks the requested station for a leg, falling back to the gateway.
    fn resolve_site(
        &self,
        direction: Direction,
        warnings: &mut Vec<LinkError>,
        errors: &mut Vec<LinkError>,
    ) -> Option<Site<'a>> {
        let gateway = self.gateway.or(self.channel.gateway.as_ref());
        let (requested, beam, frequency, polarization) = match direction {
            Direction::Uplink => (
                self.uplink_station,
                &self.channel.uplink_beam,
                self.channel.uplink_frequency,
                self.channel.uplink_polarization,
            ),
            Direction::Downlink => (
                self.downlink_station,
                &self.channel.downlink_beam,
                self.channel.downlink_frequency,
                self.channel.downlink_polarization,
            ),
        };

        let site = requested.into_iter().chain(gateway).find_map(|station| {
            match validate_station(station, beam, direction, frequency, polarization) {
                Ok(relative_gain) => Some(Site {
                    station,
                    look_angles: self
                        .geometry
                        .look_angles(&station.location, self.channel.satellite.orbital_slot),
                    relative_gain,
                    gain_variation: beam.gain_variation(
                        &station.location,
                        self.channel.satellite.half_station_keeping_box,
                    ),
                    model: station
                        .rain_model
                        .as_ref()
                        .map(|model| model as &dyn AttenuationModel)
                        .or(self.rain_model),
                }),
                Err(fatal) => {
                    record_error(errors, fatal);
                    None
                }
            }
        });

        match &site {
            Some(site) if site.model.is_none() => record_warning(
                warnings,
                LinkError::NoRainModel {
                    direction,
                    station: site.station.name.clone(),
                },
            ),
            Some(site) => debug!(%direction, station = %site.station.name, "resolved station"),
            None => record_error(errors, LinkError::NoStation { direction }),
        }
        site
    }

    fn interference_result(
        &self,
        uplink_site: Option<&Site<'a>>,
        warnings: &mut Vec<LinkError>,
    ) -> InterferenceResult {
        let hpa_intermodulation = uplink_site
            .and_then(|site| site.station.hpa.as_ref())
            .and_then(|hpa| hpa.ci_intermodulation);
        let mut defaulted = Vec::new();
        let uplink = LegInterference::resolve(
            Direction::Uplink,
            &[hpa_intermodulation, self.modem.ci_intermodulation],
            self.interference.uplink_adjacent_satellite,
            self.interference.uplink_adjacent_cell,
            &mut defaulted,
        );
        let downlink = LegInterference::resolve(
            Direction::Downlink,
            &[self.channel.transponder.ci_intermodulation],
            self.interference.downlink_adjacent_satellite,
            self.interference.downlink_adjacent_cell,
            &mut defaulted,
        );
        for warning in defaulted {
            record_warning(warnings, warning);
        }
        InterferenceResult { uplink, downlink }
    }

    /// Settles the uplink EIRP and the transponder operating mode.
    fn transmitter(
        &self,
        site: Site<'a>,
        warnings: &mut Vec<LinkError>,
    ) -> Result<Transmitter<'a>, LinkError> {
        let peak_gt = self.channel.uplink_beam.peak_gt.ok_or_else(|| {
            LinkError::InvalidInput(format!(
                "uplink beam {} has no peak G/T",
                self.channel.uplink_beam.name
            ))
        })?;
        let satellite_gt = peak_gt + site.worst_relative_gain();
        let optimizer = PowerOptimizer::new(
            &self.channel.transponder,
            peak_gt,
            spreading_loss(site.look_angles.slant_range),
            self.num_carriers,
        );
        let mut solution = optimizer.optimize_eirp(
            self.bandwidth,
            satellite_gt,
            self.forced_mode,
            self.required_output_backoff,
        );
        for warning in std::mem::take(&mut solution.warnings) {
            record_warning(warnings, warning);
        }

        let max_eirp = site
            .station
            .max_eirp(self.channel.uplink_frequency)
            .ok_or_else(|| LinkError::StationIncompatible {
                station: site.station.name.clone(),
                beam: self.channel.uplink_beam.name.clone(),
                reason: "no HPA to transmit with".to_string(),
            })?;

        let eirp = if self.power_optimization {
            let requested = solution.eirp - self.power_overused;
            if requested > max_eirp {
                record_warning(
                    warnings,
                    LinkError::EirpClamped {
                        station: site.station.name.clone(),
                        requested,
                        limit: max_eirp,
                    },
                );
                max_eirp
            } else {
                requested
            }
        } else {
            max_eirp
        };
        debug!(station = %site.station.name, eirp, max_eirp, satellite_gt, "uplink EIRP");

        Ok(Transmitter {
            site,
            optimizer,
            solution,
            satellite_gt,
            max_eirp,
            eirp,
        })
    }

    /// Both legs in both weathers with rain sized for `availability`, or
    /// each station's own default when `None`.
    fn legs(
        &self,
        transmitter: &Transmitter<'a>,
        receiver: Option<&Site<'a>>,
        availability: Option<f64>,
    ) -> Legs {
        let noise_bandwidth = noise_bandwidth_db(self.bandwidth, self.modem.roll_off);
        let site = &transmitter.site;
        let uplink_availability = site.availability(availability);
        let uplink_fade = site.attenuation(self.channel.uplink_frequency, uplink_availability);

        let upc = if site.station.upc_range > 0.0 {
            uplink_fade
                .total()
                .min(site.station.upc_range)
                .min(transmitter.max_eirp - transmitter.eirp)
                .max(0.0)
        } else {
            0.0
        };

        let uplink_endpoint = |eirp: f64| LegEndpoint {
            station: site.station,
            look_angles: site.look_angles,
            eirp,
            satellite_gt: transmitter.satellite_gt,
            noise_bandwidth,
            rain: uplink_fade,
        };
        let uplink_clear = compute_leg(
            Direction::Uplink,
            self.channel,
            &uplink_endpoint(transmitter.eirp),
            Weather::Clear,
        );
        let uplink_rain = compute_leg(
            Direction::Uplink,
            self.channel,
            &uplink_endpoint(transmitter.eirp + upc),
            Weather::Rain,
        );

        let alignment_loss = site.station.antenna.alignment_loss();
        let operating_clear = transmitter.optimizer.operating_point(
            &transmitter.solution,
            transmitter.eirp,
            alignment_loss,
            self.bandwidth,
            transmitter.satellite_gt,
        );
        let operating_rain = transmitter.optimizer.operating_point(
            &transmitter.solution,
            transmitter.eirp + upc,
            alignment_loss + uplink_fade.total(),
            self.bandwidth,
            transmitter.satellite_gt,
        );

        let downlink_availability = receiver.map_or(uplink_availability, |receiver| {
            receiver.availability(availability)
        });
        let downlink = receiver.map(|receiver| {
            let downlink_fade =
                receiver.attenuation(self.channel.downlink_frequency, downlink_availability);
            PerScenario::from_fn(|scenario| {
                let operating = match scenario.uplink_weather() {
                    Weather::Clear => operating_clear,
                    Weather::Rain => operating_rain,
                };
                let endpoint = LegEndpoint {
                    station: receiver.station,
                    look_angles: receiver.look_angles,
                    eirp: operating.downlink_eirp + receiver.worst_relative_gain(),
                    satellite_gt: transmitter.satellite_gt,
                    noise_bandwidth,
                    rain: downlink_fade,
                };
                compute_leg(
                    Direction::Downlink,
                    self.channel,
                    &endpoint,
                    scenario.downlink_weather(),
                )
            })
        });

        Legs {
            uplink_availability,
            downlink_availability,
            upc,
            uplink_clear,
            uplink_rain,
            operating_clear,
            operating_rain,
            downlink,
        }
    }

    fn combined(&self, legs: &Legs, interference: &InterferenceResult) -> PerScenario<Option<f64>> {
        let ci = [
            interference.uplink.composite(),
            interference.downlink.composite(),
        ];
        PerScenario::from_fn(|scenario| {
            let downlink = legs.downlink.as_ref()?;
            let cn = [
                legs.uplink(scenario.uplink_weather()).cn,
                downlink.get(scenario).cn,
            ];
            let combined = combine(&cn, &ci);
            debug!(%scenario, combined, "combined C/(N+I)");
            Some(combined)
        })
    }

    /// What a non-ACM carrier carries in every scenario: the MCG that closes
    /// in rain on both legs. `None` for ACM modems, which select per scenario.
    fn held_capacity(
        &self,
        combined: &PerScenario<Option<f64>>,
    ) -> Option<Result<Capacity, LinkError>> {
        if self.modem.acm {
            return None;
        }
        let ratio = combined.rain_both.unwrap_or(f64::NEG_INFINITY);
        Some(select_capacity(self.modem, ratio, self.bandwidth))
    }

    fn capacity(&self, fixed: Option<&Mcg>, ratio: f64) -> Result<Capacity, LinkError> {
        match fixed {
            Some(mcg) => fixed_capacity(self.modem, mcg, ratio, self.bandwidth),
            None => select_capacity(self.modem, ratio, self.bandwidth),
        }
    }

    fn seek_max_availability(
        &self,
        search: &AvailabilitySearch,
        transmitter: &Transmitter<'a>,
        receiver: &Site<'a>,
        interference: &InterferenceResult,
        fixed: Option<&Mcg>,
    ) -> Result<MaxAvailability<Capacity>, LinkError> {
        seek_max_availability(search, |availability| {
            let legs = self.legs(transmitter, Some(receiver), Some(availability));
            let ratio = (*self.combined(&legs, interference).get(Scenario::RainBoth))?;
            self.capacity(fixed, ratio).ok()
        })
    }
}
