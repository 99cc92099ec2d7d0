use std::f64::consts::PI;
use std::fmt;

use rfconversions::power::linear_to_db;
use serde::Deserialize;

use crate::constants::{
    EARTH_FLATTENING_FACTOR, EQUATORIAL_EARTH_RADIUS, GEOSYNCHRONOUS_ALTITUDE, SPEED_OF_LIGHT,
};

/// A named point on the ground.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,  // degrees, north positive
    pub longitude: f64, // degrees, east positive
    #[serde(default)]
    pub altitude: f64, // km above mean sea level
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:.4}, {:.4})",
            self.name, self.latitude, self.longitude
        )
    }
}

impl Location {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Location {
        Location {
            name: name.to_string(),
            latitude,
            longitude,
            altitude: 0.0,
        }
    }
}

/// Pointing geometry from a ground location to the satellite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LookAngles {
    pub slant_range: f64, // km
    pub elevation: f64,   // degrees
    pub azimuth: f64,     // degrees, clockwise from true north
}

/// Supplies slant range and elevation for a ground location.
///
/// The link calculation only needs these scalars; anything from a simple
/// geostationary model to a full ephemeris service can sit behind this trait.
pub trait GeometryProvider: Send + Sync {
    fn look_angles(&self, location: &Location, orbital_slot: f64) -> LookAngles;
}

/// Look angles to a geostationary satellite over an oblate Earth.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeostationaryGeometry;

impl GeometryProvider for GeostationaryGeometry {
    fn look_angles(&self, location: &Location, orbital_slot: f64) -> LookAngles {
        let lat = location.latitude.to_radians();
        let lon = location.longitude.to_radians();
        let slot = orbital_slot.to_radians();

        let f = EARTH_FLATTENING_FACTOR;
        let e2 = 2.0 * f - f * f;
        let n = EQUATORIAL_EARTH_RADIUS / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let h = location.altitude;

        let station = [
            (n + h) * lat.cos() * lon.cos(),
            (n + h) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + h) * lat.sin(),
        ];
        let orbit_radius = EQUATORIAL_EARTH_RADIUS + GEOSYNCHRONOUS_ALTITUDE;
        let satellite = [orbit_radius * slot.cos(), orbit_radius * slot.sin(), 0.0];

        let rho = [
            satellite[0] - station[0],
            satellite[1] - station[1],
            satellite[2] - station[2],
        ];
        let slant_range = (rho[0].powi(2) + rho[1].powi(2) + rho[2].powi(2)).sqrt();

        // topocentric east/north/up
        let east = -lon.sin() * rho[0] + lon.cos() * rho[1];
        let north = -lat.sin() * lon.cos() * rho[0] - lat.sin() * lon.sin() * rho[1]
            + lat.cos() * rho[2];
        let up = lat.cos() * lon.cos() * rho[0] + lat.cos() * lon.sin() * rho[1] + lat.sin() * rho[2];

        let elevation = up.atan2((east * east + north * north).sqrt()).to_degrees();
        let azimuth = east.atan2(north).to_degrees().rem_euclid(360.0);

        LookAngles {
            slant_range,
            elevation,
            azimuth,
        }
    }
}

/// Great-circle angle between two ground points, degrees.
pub fn angular_offset(from: &Location, to: &Location) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (to.longitude - from.longitude).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    (2.0 * a.sqrt().min(1.0).asin()).to_degrees()
}

/// Free-space path loss, dB: `20·log10(4π·d·f / c)`.
pub fn free_space_path_loss(slant_range_km: f64, frequency_hz: f64) -> f64 {
    let distance = slant_range_km * 1000.0;
    let ratio = 4.0 * PI * distance * frequency_hz / SPEED_OF_LIGHT;
    linear_to_db(ratio * ratio)
}

/// Spreading loss between EIRP and flux density, dB(m²): `10·log10(4π·d²)`.
pub fn spreading_loss(slant_range_km: f64) -> f64 {
    let distance = slant_range_km * 1000.0;
    linear_to_db(4.0 * PI * distance * distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_satellite_point_is_at_zenith() {
        let equator = Location::new("Sub-satellite", 0.0, 78.5);
        let angles = GeostationaryGeometry.look_angles(&equator, 78.5);
        assert!((angles.elevation - 90.0).abs() < 1e-6);
        assert!((angles.slant_range - GEOSYNCHRONOUS_ALTITUDE).abs() < 1e-6);
    }

    #[test]
    fn bangkok_to_thaicom_slot() {
        // Bangkok toward 78.5E: roughly 60 degrees elevation, ~36,500 km
        let bangkok = Location::new("Bangkok", 13.75, 100.5);
        let angles = GeostationaryGeometry.look_angles(&bangkok, 78.5);
        assert!(angles.elevation > 55.0 && angles.elevation < 65.0, "{:?}", angles);
        assert!(angles.slant_range > 35_786.0 && angles.slant_range < 37_000.0);
        // satellite is to the south-west
        assert!(angles.azimuth > 180.0 && angles.azimuth < 270.0, "{:?}", angles);
    }

    #[test]
    fn elevation_drops_away_from_slot() {
        let near = Location::new("Near", 0.0, 80.0);
        let far = Location::new("Far", 40.0, 130.0);
        let near_el = GeostationaryGeometry.look_angles(&near, 78.5).elevation;
        let far_el = GeostationaryGeometry.look_angles(&far, 78.5).elevation;
        assert!(far_el < near_el);
    }

    #[test]
    fn angular_offset_along_equator() {
        let a = Location::new("A", 0.0, 10.0);
        let b = Location::new("B", 0.0, 13.0);
        assert!((angular_offset(&a, &b) - 3.0).abs() < 1e-9);
        assert_eq!(angular_offset(&a, &a), 0.0);
    }

    #[test]
    fn path_loss_ku_band_geo() {
        // 14 GHz over 38,000 km is about 207 dB
        let loss = free_space_path_loss(38_000.0, 14.0e9);
        assert!((loss - 207.0).abs() < 0.5, "{}", loss);
    }

    #[test]
    fn spreading_loss_geo() {
        // about 162 dB(m^2) at 36,000 km
        let loss = spreading_loss(36_000.0);
        assert!((loss - 162.1).abs() < 0.2, "{}", loss);
    }
}
