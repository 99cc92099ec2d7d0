use std::fmt;

use rfconversions::power::{db_to_linear, linear_to_db};
use tracing::debug;

use crate::attenuation::Attenuation;
use crate::channel::{Beam, Channel, Polarization};
use crate::constants::{BOLTZMANN_CONSTANT, RAIN_MEDIUM_TEMPERATURE};
use crate::error::LinkError;
use crate::geometry::{free_space_path_loss, LookAngles};
use crate::station::Station;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    Uplink,
    Downlink,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Uplink => write!(f, "uplink"),
            Direction::Downlink => write!(f, "downlink"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Weather {
    Clear,
    Rain,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Weather::Clear => write!(f, "clear sky"),
            Weather::Rain => write!(f, "rain"),
        }
    }
}

/// The ground end of a leg and what the other end offers it.
#[derive(Clone, Debug)]
pub struct LegEndpoint<'a> {
    pub station: &'a Station,
    pub look_angles: LookAngles,
    /// EIRP radiated toward the receiver in this weather, dBW.
    pub eirp: f64,
    /// Satellite G/T toward the station, dB/K. Only read for uplinks.
    pub satellite_gt: f64,
    pub noise_bandwidth: f64, // dB-Hz
    /// Atmospheric attenuation at the target availability.
    pub rain: Attenuation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegResult {
    pub direction: Direction,
    pub weather: Weather,
    pub frequency: f64,       // Hz
    pub eirp: f64,            // dBW
    pub gt: f64,              // dB/K, receiving end
    pub path_loss: f64,       // dB, free space
    pub pointing_loss: f64,   // dB
    pub xpol_loss: f64,       // dB
    pub axial_ratio_loss: f64, // dB
    pub attenuation: Attenuation,
    pub noise_bandwidth: f64, // dB-Hz
    /// Receiving station system noise temperature, K. Downlinks only.
    pub system_noise_temperature: Option<f64>,
    pub cn: f64, // dB
}

impl LegResult {
    /// Everything between the two antennas, dB.
    pub fn total_loss(&self) -> f64 {
        self.path_loss
            + self.pointing_loss
            + self.xpol_loss
            + self.axial_ratio_loss
            + self.attenuation.total()
    }
}

impl fmt::Display for LegResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}: EIRP {:.2} dBW, G/T {:.2} dB/K, loss {:.2} dB, C/N {:.2} dB",
            self.direction,
            self.weather,
            self.eirp,
            self.gt,
            self.total_loss(),
            self.cn
        )
    }
}

/// Noise bandwidth of a carrier occupying `bandwidth` Hz, dB-Hz.
pub fn noise_bandwidth_db(bandwidth: f64, roll_off: f64) -> f64 {
    linear_to_db(bandwidth / (1.0 + roll_off))
}

/// Receive system noise temperature behind `attenuation` dB of absorbing
/// atmosphere, K.
pub fn system_noise_temperature(
    antenna_temperature: f64,
    attenuation: f64,
    lnb_temperature: f64,
) -> f64 {
    let transmission = db_to_linear(-attenuation);
    antenna_temperature * transmission
        + RAIN_MEDIUM_TEMPERATURE * (1.0 - transmission)
        + lnb_temperature
}

pub fn carrier_to_noise(eirp: f64, gt: f64, loss: f64, noise_bandwidth: f64) -> f64 {
    eirp + gt - loss - noise_bandwidth - BOLTZMANN_CONSTANT
}

/// Station G/T and system noise temperature at `frequency`.
pub fn station_gt(station: &Station, frequency: f64, elevation: f64, attenuation: f64) -> (f64, f64) {
    let temperature = system_noise_temperature(
        station.antenna.noise_temperature_at(elevation),
        attenuation,
        station.lnb_temperature(),
    );
    (
        station.antenna.gain(frequency) - linear_to_db(temperature),
        temperature,
    )
}

/// Checks a station against a beam and returns the beam's relative gain
/// toward it, dB.
pub fn validate_station(
    station: &Station,
    beam: &Beam,
    direction: Direction,
    frequency: f64,
    polarization: Polarization,
) -> Result<f64, LinkError> {
    let incompatible = |reason: String| LinkError::StationIncompatible {
        station: station.name.clone(),
        beam: beam.name.clone(),
        reason,
    };

    let in_band = match direction {
        Direction::Uplink => station.antenna.can_transmit(frequency),
        Direction::Downlink => station.antenna.can_receive(frequency),
    };
    if !in_band {
        return Err(incompatible(format!(
            "antenna {} can't {} at {:.4} GHz",
            station.antenna.name,
            match direction {
                Direction::Uplink => "transmit",
                Direction::Downlink => "receive",
            },
            frequency / 1.0e9
        )));
    }
    if direction == Direction::Uplink && station.hpa.is_none() {
        return Err(incompatible("no HPA to transmit with".to_string()));
    }
    if !station.antenna.supports(polarization) || !beam.supports(polarization) {
        return Err(incompatible(format!("{} polarization not supported", polarization)));
    }
    beam.relative_gain_at(&station.location)
        .ok_or_else(|| incompatible(format!("{} is outside the beam contour", station.location)))
}

/// C/N of one leg in one weather.
pub fn compute_leg(
    direction: Direction,
    channel: &Channel,
    endpoint: &LegEndpoint,
    weather: Weather,
) -> LegResult {
    let frequency = match direction {
        Direction::Uplink => channel.uplink_frequency,
        Direction::Downlink => channel.downlink_frequency,
    };
    let attenuation = match weather {
        Weather::Clear => Attenuation::none(),
        Weather::Rain => endpoint.rain,
    };
    let path_loss = free_space_path_loss(endpoint.look_angles.slant_range, frequency);
    let antenna = &endpoint.station.antenna;

    let (gt, system_noise_temperature) = match direction {
        Direction::Uplink => (endpoint.satellite_gt, None),
        Direction::Downlink => {
            let (gt, temperature) = station_gt(
                endpoint.station,
                frequency,
                endpoint.look_angles.elevation,
                attenuation.total(),
            );
            (gt, Some(temperature))
        }
    };

    let loss = path_loss + antenna.alignment_loss() + attenuation.total();
    let cn = carrier_to_noise(endpoint.eirp, gt, loss, endpoint.noise_bandwidth);

    debug!(
        %direction,
        %weather,
        station = %endpoint.station.name,
        eirp = endpoint.eirp,
        gt,
        loss,
        cn,
        "computed leg"
    );

    LegResult {
        direction,
        weather,
        frequency,
        eirp: endpoint.eirp,
        gt,
        path_loss,
        pointing_loss: antenna.pointing_loss,
        xpol_loss: antenna.xpol_loss,
        axial_ratio_loss: antenna.axial_ratio_loss,
        attenuation,
        noise_bandwidth: endpoint.noise_bandwidth,
        system_noise_temperature,
        cn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{FrequencyRange, Satellite};
    use crate::curve::Curve;
    use crate::geometry::Location;
    use crate::station::{Antenna, Hpa};
    use crate::transponder::{OperatingMode, Transponder};

    fn antenna() -> Antenna {
        Antenna {
            name: "1.8m".to_string(),
            diameter: 1.8,
            efficiency: 0.65,
            noise_temperature: Curve::new(vec![(10.0, 70.0), (60.0, 35.0)]),
            transmit_bands: vec![FrequencyRange::new(13.75e9, 14.5e9)],
            receive_bands: vec![FrequencyRange::new(10.7e9, 12.75e9)],
            polarizations: vec![],
            pointing_loss: 0.2,
            xpol_loss: 0.0,
            axial_ratio_loss: 0.0,
        }
    }

    fn station() -> Station {
        let mut station = Station::new("Bangkok", Location::new("Bangkok", 13.75, 100.5), antenna())
            .with_hpa(Hpa {
                name: "16W".to_string(),
                output_power: 16.0,
                output_backoff: 0.0,
                ifl_loss: 0.5,
                ci_intermodulation: None,
            });
        station.lnb_noise_temperature = Some(60.0);
        station
    }

    fn beam(low: f64, high: f64) -> Beam {
        Beam {
            name: "Regional".to_string(),
            frequency_range: FrequencyRange::new(low, high),
            polarizations: vec![Polarization::Horizontal, Polarization::Vertical],
            center: Location::new("Center", 14.0, 101.0),
            contour: Curve::new(vec![(0.0, 0.0), (3.0, -3.0), (6.0, -8.0)]),
            defined_contours: vec![],
            peak_gt: Some(6.0),
        }
    }

    fn channel() -> Channel {
        Channel {
            name: "1A-H".to_string(),
            satellite: Satellite {
                name: "Sat".to_string(),
                orbital_slot: 78.5,
                half_station_keeping_box: 0.05,
            },
            transponder: Transponder {
                name: "1A".to_string(),
                primary_mode: OperatingMode::Fgm,
                secondary_mode: None,
                bandwidth: 36.0e6,
                saturated_eirp: 52.0,
                saturation_flux_density: -85.0,
                backoff_curve: Curve::default(),
                alc_backoff: Curve::default(),
                ci_intermodulation: None,
            },
            uplink_beam: beam(13.75e9, 14.5e9),
            downlink_beam: beam(10.7e9, 12.75e9),
            uplink_frequency: 14.0e9,
            downlink_frequency: 11.7e9,
            uplink_polarization: Polarization::Horizontal,
            downlink_polarization: Polarization::Vertical,
            gateway: None,
        }
    }

    fn endpoint(station: &Station, eirp: f64) -> LegEndpoint<'_> {
        LegEndpoint {
            station,
            look_angles: LookAngles {
                slant_range: 36_500.0,
                elevation: 60.0,
                azimuth: 230.0,
            },
            eirp,
            satellite_gt: 6.0,
            noise_bandwidth: noise_bandwidth_db(36.0e6, 0.2),
            rain: Attenuation {
                gas: 0.2,
                cloud: 0.3,
                rain: 4.0,
                scintillation: 0.4,
            },
        }
    }

    #[test]
    fn noise_bandwidth_is_symbol_rate() {
        assert!((noise_bandwidth_db(36.0e6, 0.2) - 74.771).abs() < 1e-3);
        assert_eq!(noise_bandwidth_db(1.0e6, 0.0), 60.0);
    }

    #[test]
    fn rain_raises_system_noise() {
        let clear = system_noise_temperature(35.0, 0.0, 60.0);
        let rain = system_noise_temperature(35.0, 3.0, 60.0);
        assert_eq!(clear, 95.0);
        // 3 dB of absorption: half the sky, half the 275 K medium
        assert!((rain - (35.0 * 0.5012 + 275.0 * 0.4988 + 60.0)).abs() < 0.05);
    }

    #[test]
    fn carrier_to_noise_budget() {
        // 50 dBW + 6 dB/K − 206 dB − 75 dB-Hz + 228.6
        assert!((carrier_to_noise(50.0, 6.0, 206.0, 75.0) - 3.6).abs() < 1e-9);
    }

    #[test]
    fn uplink_leg_uses_satellite_gt() {
        let station = station();
        let channel = channel();
        let leg = compute_leg(Direction::Uplink, &channel, &endpoint(&station, 70.0), Weather::Clear);
        assert_eq!(leg.gt, 6.0);
        assert_eq!(leg.system_noise_temperature, None);
        assert_eq!(leg.attenuation, Attenuation::none());
        assert!((leg.path_loss - free_space_path_loss(36_500.0, 14.0e9)).abs() < 1e-9);
        let expected = carrier_to_noise(70.0, 6.0, leg.path_loss + 0.2, leg.noise_bandwidth);
        assert!((leg.cn - expected).abs() < 1e-9);
    }

    #[test]
    fn polarization_losses_join_the_budget() {
        let aligned = station();
        let mut mismatched = station();
        mismatched.antenna.xpol_loss = 0.3;
        mismatched.antenna.axial_ratio_loss = 0.2;
        let channel = channel();

        let reference = compute_leg(Direction::Uplink, &channel, &endpoint(&aligned, 70.0), Weather::Clear);
        let leg = compute_leg(Direction::Uplink, &channel, &endpoint(&mismatched, 70.0), Weather::Clear);
        assert_eq!(leg.xpol_loss, 0.3);
        assert_eq!(leg.axial_ratio_loss, 0.2);
        assert!((leg.total_loss() - reference.total_loss() - 0.5).abs() < 1e-9);
        assert!((reference.cn - leg.cn - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rain_lowers_downlink_cn_twice() {
        let station = station();
        let channel = channel();
        let clear = compute_leg(Direction::Downlink, &channel, &endpoint(&station, 45.0), Weather::Clear);
        let rain = compute_leg(Direction::Downlink, &channel, &endpoint(&station, 45.0), Weather::Rain);
        let fade = rain.attenuation.total();
        assert!(rain.gt < clear.gt);
        // worse than the fade alone: sky noise rises too
        assert!(clear.cn - rain.cn > fade);
    }

    #[test]
    fn station_inside_beam() {
        let station = station();
        let channel = channel();
        let gain = validate_station(
            &station,
            &channel.uplink_beam,
            Direction::Uplink,
            14.0e9,
            Polarization::Horizontal,
        )
        .unwrap();
        assert!(gain <= 0.0 && gain > -3.0);
    }

    #[test]
    fn station_rejections() {
        let mut station = station();
        let channel = channel();
        let reject = |station: &Station, direction, frequency| {
            validate_station(
                station,
                &channel.uplink_beam,
                direction,
                frequency,
                Polarization::Horizontal,
            )
        };

        assert!(matches!(
            reject(&station, Direction::Uplink, 11.7e9),
            Err(LinkError::StationIncompatible { .. })
        ));

        station.hpa = None;
        assert!(reject(&station, Direction::Uplink, 14.0e9).is_err());
        assert!(reject(&station, Direction::Downlink, 11.7e9).is_ok());

        station.location = Location::new("Tokyo", 35.7, 139.7);
        let error = reject(&station, Direction::Downlink, 11.7e9).unwrap_err();
        assert!(error.to_string().contains("outside the beam contour"));
    }

    #[test]
    fn polarization_must_match() {
        let mut station = station();
        station.antenna.polarizations = vec![Polarization::LeftHandCircular];
        let channel = channel();
        assert!(validate_station(
            &station,
            &channel.uplink_beam,
            Direction::Uplink,
            14.0e9,
            Polarization::Horizontal,
        )
        .is_err());
    }
}
