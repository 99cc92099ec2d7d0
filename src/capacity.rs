use std::fmt;

use serde::Deserialize;
use tracing::debug;

use crate::error::LinkError;
use crate::modem::{Mcg, Modem};

/// Operating point a scenario closes with.
#[derive(Clone, Debug, PartialEq)]
pub struct Capacity {
    pub mcg: Mcg,
    pub spectral_efficiency: f64, // bits/s/Hz
    pub throughput: f64,          // bits/s
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {:.3} Mbit/s", self.mcg, self.throughput / 1.0e6)
    }
}

/// Bandwidth that carries symbols once roll-off is taken out, Hz.
pub fn usable_bandwidth(bandwidth: f64, roll_off: f64) -> f64 {
    bandwidth / (1.0 + roll_off)
}

pub fn throughput(spectral_efficiency: f64, bandwidth: f64, roll_off: f64) -> f64 {
    spectral_efficiency * usable_bandwidth(bandwidth, roll_off)
}

/// Highest-efficiency MCG whose threshold is at or below `ratio`. Equal
/// efficiencies go to the lower threshold.
pub fn select_mcg(modem: &Modem, ratio: f64) -> Option<&Mcg> {
    modem
        .mcgs
        .iter()
        .filter(|mcg| mcg.required_cn <= ratio)
        .max_by(|a, b| {
            a.spectral_efficiency
                .total_cmp(&b.spectral_efficiency)
                .then(b.required_cn.total_cmp(&a.required_cn))
        })
}

fn capacity(modem: &Modem, mcg: &Mcg, bandwidth: f64) -> Capacity {
    Capacity {
        mcg: mcg.clone(),
        spectral_efficiency: mcg.spectral_efficiency,
        throughput: throughput(mcg.spectral_efficiency, bandwidth, modem.roll_off),
    }
}

/// Best MCG of the table for `ratio` dB, and what it carries in `bandwidth`.
pub fn select_capacity(modem: &Modem, ratio: f64, bandwidth: f64) -> Result<Capacity, LinkError> {
    match select_mcg(modem, ratio) {
        Some(mcg) => {
            debug!(modem = %modem.name, ratio, mcg = %mcg.name, "selected MCG");
            Ok(capacity(modem, mcg, bandwidth))
        }
        None => Err(LinkError::NoFeasibleMcg {
            modem: modem.name.clone(),
            ratio,
            required: modem.lowest_threshold(),
        }),
    }
}

/// Capacity of a carrier fixed on `mcg`, if `ratio` dB supports it.
pub fn fixed_capacity(
    modem: &Modem,
    mcg: &Mcg,
    ratio: f64,
    bandwidth: f64,
) -> Result<Capacity, LinkError> {
    if ratio >= mcg.required_cn {
        Ok(capacity(modem, mcg, bandwidth))
    } else {
        Err(LinkError::NoFeasibleMcg {
            modem: modem.name.clone(),
            ratio,
            required: mcg.required_cn,
        })
    }
}

/// Bounds of the maximum-availability search, percent.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct AvailabilitySearch {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_min() -> f64 {
    99.0
}

fn default_max() -> f64 {
    99.99
}

fn default_max_iterations() -> u32 {
    30
}

fn default_tolerance() -> f64 {
    0.001
}

impl Default for AvailabilitySearch {
    fn default() -> Self {
        AvailabilitySearch {
            min: default_min(),
            max: default_max(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaxAvailability<T> {
    pub availability: f64, // percent
    pub iterations: u32,
    pub outcome: T,
}

/// Highest availability in `[search.min, search.max]` for which `evaluate`
/// still yields an outcome.
///
/// `evaluate` must be monotonic: feasible at some availability implies
/// feasible at every lower one.
pub fn seek_max_availability<T, F>(
    search: &AvailabilitySearch,
    mut evaluate: F,
) -> Result<MaxAvailability<T>, LinkError>
where
    F: FnMut(f64) -> Option<T>,
{
    if let Some(outcome) = evaluate(search.max) {
        return Ok(MaxAvailability {
            availability: search.max,
            iterations: 0,
            outcome,
        });
    }
    let not_found = LinkError::AvailabilityNotFound {
        min: search.min,
        max: search.max,
    };
    let mut best = match evaluate(search.min) {
        Some(outcome) => outcome,
        None => return Err(not_found),
    };

    let (mut low, mut high) = (search.min, search.max);
    let mut iterations = 0;
    while high - low > search.tolerance && iterations < search.max_iterations {
        let mid = 0.5 * (low + high);
        match evaluate(mid) {
            Some(outcome) => {
                best = outcome;
                low = mid;
            }
            None => high = mid,
        }
        iterations += 1;
    }

    debug!(availability = low, iterations, "found maximum availability");
    Ok(MaxAvailability {
        availability: low,
        iterations,
        outcome: best,
    })
}
