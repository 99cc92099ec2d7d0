/// Boltzmann constant as used in link budgets, dBW/K/Hz (dBJ/K).
pub const BOLTZMANN_CONSTANT: f64 = -228.6;

/// Speed of light used for path loss and antenna gain, m/s.
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Equatorial Earth radius, km.
pub const EQUATORIAL_EARTH_RADIUS: f64 = 6378.14;

/// Earth flattening factor (WGS-72 style ellipsoid).
pub const EARTH_FLATTENING_FACTOR: f64 = 0.003352813;

/// Geosynchronous altitude above the equator, km.
pub const GEOSYNCHRONOUS_ALTITUDE: f64 = 35786.0;

/// Mean radiating temperature of the rain medium, K.
pub const RAIN_MEDIUM_TEMPERATURE: f64 = 275.0;

/// C/I assumed for an interference source nobody supplied a figure for, dB.
pub const NOMINAL_CI: f64 = 50.0;

/// Availability sized for when neither the request nor the rain model names
/// one, percent of the year.
pub const DEFAULT_AVAILABILITY: f64 = 99.7;

/// Elevation floor for the attenuation model, degrees.
pub const MIN_ELEVATION: f64 = 5.0;

