//! Transponder operating point and uplink EIRP optimization.
//!
//! A carrier is entitled to the fraction of the transponder its bandwidth
//! represents (`share_db = 10·log10(B_xpdr / B_carrier)`). In fixed gain mode
//! the transponder output follows the input drive through the IBO/OBO curve.
//! With automatic level control the total output is held at the full-load
//! backoff for the number of active carriers, and a carrier only changes its
//! fraction of that output.

use rfconversions::power::{db_to_linear, linear_to_db};
use tracing::debug;

use crate::error::LinkError;
use crate::transponder::{OperatingMode, Transponder};

/// Hard cap on bisection steps.
pub const MAX_ITERATIONS: u32 = 100;

/// Convergence width of the ALC search, dB.
pub const TOLERANCE: f64 = 1.0e-6;

/// Half-width of the ALC search bracket around the fair-share flux, dB.
const ALC_SEARCH_RANGE: f64 = 40.0;

/// Checks that `mode` is one the transponder can run in.
pub fn validate_operating_mode(
    transponder: &Transponder,
    mode: OperatingMode,
) -> Result<(), LinkError> {
    if transponder.supports(mode) {
        Ok(())
    } else {
        Err(LinkError::UnsupportedMode {
            transponder: transponder.name.clone(),
            mode,
        })
    }
}

/// Uplink EIRP that puts the carrier at its transponder operating point.
#[derive(Clone, Debug, PartialEq)]
pub struct EirpSolution {
    pub eirp: f64, // dBW
    pub mode: OperatingMode,
    /// Total transponder output backoff held in this mode, dB.
    pub output_backoff: f64,
    pub iterations: u32,
    pub warnings: Vec<LinkError>,
}

/// Where a given uplink EIRP leaves the carrier inside the transponder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OperatingPoint {
    pub flux_density: f64,     // dBW/m², carrier at the satellite
    pub input_backoff: f64,    // dB, carrier
    pub output_backoff: f64,   // dB, carrier
    pub downlink_eirp: f64,    // dBW, carrier at downlink beam peak
}

#[derive(Clone, Copy, Debug)]
pub struct PowerOptimizer<'a> {
    transponder: &'a Transponder,
    peak_gt: f64,        // dB/K, uplink beam
    spreading_loss: f64, // dB, uplink station to satellite
    num_carriers: u32,
}

impl<'a> PowerOptimizer<'a> {
    pub fn new(
        transponder: &'a Transponder,
        peak_gt: f64,
        spreading_loss: f64,
        num_carriers: u32,
    ) -> PowerOptimizer<'a> {
        PowerOptimizer {
            transponder,
            peak_gt,
            spreading_loss,
            num_carriers,
        }
    }

    /// The mode to optimize for, and the warning raised when a forced mode is
    /// not available.
    pub fn resolve_mode(&self, forced: Option<OperatingMode>) -> (OperatingMode, Option<LinkError>) {
        match forced {
            None => (self.transponder.primary_mode, None),
            Some(mode) => match validate_operating_mode(self.transponder, mode) {
                Ok(()) => (mode, None),
                Err(warning) => (self.transponder.primary_mode, Some(warning)),
            },
        }
    }

    /// Saturation flux density for a station where the uplink beam G/T is
    /// `gt_at_location`, dBW/m².
    pub fn saturation_flux_at(&self, gt_at_location: f64) -> f64 {
        self.transponder.saturation_flux_density + (self.peak_gt - gt_at_location)
    }

    pub fn optimize_eirp(
        &self,
        bandwidth: f64,
        gt_at_location: f64,
        forced: Option<OperatingMode>,
        required_output_backoff: f64,
    ) -> EirpSolution {
        let (mode, warning) = self.resolve_mode(forced);
        let mut warnings: Vec<LinkError> = warning.into_iter().collect();
        let share = self.transponder.carrier_share(bandwidth);
        let sfd = self.saturation_flux_at(gt_at_location);

        let solution = match mode {
            OperatingMode::Fgm => {
                let total_ibo = self.transponder.input_backoff(required_output_backoff);
                let carrier_ibo = total_ibo + share;
                EirpSolution {
                    eirp: sfd - carrier_ibo + self.spreading_loss,
                    mode,
                    output_backoff: required_output_backoff,
                    iterations: 0,
                    warnings: Vec::new(),
                }
            }
            OperatingMode::Alc => {
                let (alc_obo, missing) = self.alc_output_backoff(required_output_backoff);
                warnings.extend(missing);
                self.seek_alc_eirp(bandwidth, gt_at_location, alc_obo, required_output_backoff)
            }
        };

        debug!(
            transponder = %self.transponder.name,
            %mode,
            eirp = solution.eirp,
            output_backoff = solution.output_backoff,
            iterations = solution.iterations,
            "optimized uplink EIRP"
        );

        warnings.extend(solution.warnings);
        EirpSolution {
            warnings,
            ..solution
        }
    }

    /// Total output backoff the ALC holds, falling back to
    /// `required_output_backoff` when the transponder has no ALC table.
    fn alc_output_backoff(&self, required_output_backoff: f64) -> (f64, Option<LinkError>) {
        match self.transponder.alc_output_backoff(self.num_carriers) {
            Some(obo) => (obo, None),
            None => (
                required_output_backoff,
                Some(LinkError::MissingAlcTable {
                    transponder: self.transponder.name.clone(),
                    output_backoff: required_output_backoff,
                }),
            ),
        }
    }

    /// Flux density at which the carrier gets exactly its bandwidth share of
    /// the ALC output, dBW/m².
    fn alc_fair_flux(&self, bandwidth: f64, gt_at_location: f64, alc_obo: f64) -> f64 {
        self.saturation_flux_at(gt_at_location)
            - self.transponder.input_backoff(alc_obo)
            - self.transponder.carrier_share(bandwidth)
    }

    /// Carrier downlink EIRP at beam peak for a flux density `flux` under ALC.
    fn alc_downlink_eirp(&self, bandwidth: f64, fair_flux: f64, alc_obo: f64, flux: f64) -> f64 {
        let fraction = bandwidth_fraction(self.transponder, bandwidth);
        let weight = fraction * db_to_linear(flux - fair_flux);
        let power_fraction = weight / (weight + 1.0 - fraction);
        self.transponder.saturated_eirp - alc_obo + linear_to_db(power_fraction)
    }

    /// Bisection for the smallest uplink EIRP whose carrier reaches the ALC
    /// target `saturated_eirp − alc_obo − share − extra_backoff`.
    fn seek_alc_eirp(
        &self,
        bandwidth: f64,
        gt_at_location: f64,
        alc_obo: f64,
        extra_backoff: f64,
    ) -> EirpSolution {
        let fair_flux = self.alc_fair_flux(bandwidth, gt_at_location, alc_obo);
        let share = self.transponder.carrier_share(bandwidth);
        let target = self.transponder.saturated_eirp - alc_obo - share - extra_backoff;

        if bandwidth_fraction(self.transponder, bandwidth) >= 1.0 {
            // a single carrier owns the whole ALC output
            return EirpSolution {
                eirp: fair_flux + self.spreading_loss,
                mode: OperatingMode::Alc,
                output_backoff: alc_obo,
                iterations: 0,
                warnings: Vec::new(),
            };
        }

        let downlink = |flux: f64| self.alc_downlink_eirp(bandwidth, fair_flux, alc_obo, flux);
        let mut low = fair_flux - ALC_SEARCH_RANGE;
        let mut high = fair_flux + ALC_SEARCH_RANGE;
        let mut warnings = Vec::new();

        let reached = downlink(high);
        if reached < target - TOLERANCE {
            warnings.push(LinkError::AlcTargetUnreachable {
                transponder: self.transponder.name.clone(),
                target,
                reached,
            });
            return EirpSolution {
                eirp: high + self.spreading_loss,
                mode: OperatingMode::Alc,
                output_backoff: alc_obo,
                iterations: 0,
                warnings,
            };
        }

        let mut iterations = 0;
        while high - low > TOLERANCE && iterations < MAX_ITERATIONS {
            let mid = 0.5 * (low + high);
            if downlink(mid) >= target {
                high = mid;
            } else {
                low = mid;
            }
            iterations += 1;
        }

        EirpSolution {
            eirp: high + self.spreading_loss,
            mode: OperatingMode::Alc,
            output_backoff: alc_obo,
            iterations,
            warnings,
        }
    }

    /// Operating point reached by an uplink `eirp` arriving with
    /// `uplink_fade` dB of atmospheric loss.
    pub fn operating_point(
        &self,
        solution: &EirpSolution,
        eirp: f64,
        uplink_fade: f64,
        bandwidth: f64,
        gt_at_location: f64,
    ) -> OperatingPoint {
        let share = self.transponder.carrier_share(bandwidth);
        let sfd = self.saturation_flux_at(gt_at_location);
        let flux = eirp - uplink_fade - self.spreading_loss;
        let carrier_ibo = sfd - flux;

        let downlink_eirp = match solution.mode {
            OperatingMode::Fgm => {
                let total_obo = self.transponder.output_backoff(carrier_ibo - share);
                self.transponder.saturated_eirp - (total_obo + share)
            }
            OperatingMode::Alc => {
                if bandwidth_fraction(self.transponder, bandwidth) >= 1.0 {
                    self.transponder.saturated_eirp - solution.output_backoff
                } else {
                    let fair_flux =
                        self.alc_fair_flux(bandwidth, gt_at_location, solution.output_backoff);
                    self.alc_downlink_eirp(bandwidth, fair_flux, solution.output_backoff, flux)
                }
            }
        };

        OperatingPoint {
            flux_density: flux,
            input_backoff: carrier_ibo,
            output_backoff: self.transponder.saturated_eirp - downlink_eirp,
            downlink_eirp,
        }
    }
}

/// Linear fraction of the transponder bandwidth the carrier occupies.
fn bandwidth_fraction(transponder: &Transponder, bandwidth: f64) -> f64 {
    bandwidth / transponder.bandwidth
}
