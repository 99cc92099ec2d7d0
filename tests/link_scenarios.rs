//! Integration tests: end-to-end link calculations over the Thai Ku-band
//! reference data in `files/`.
//!
//! Thresholds in these tests are placed relative to ratios the engine
//! reports, so they check the scenario and capacity logic rather than
//! re-deriving propagation numbers.

use linkbudget::{
    load_config, Channel, Curve, Link, LinkError, LinkResult, Mcg, Modem, OperatingMode,
    Scenario, Station,
};

/// Helper: assert float equality within tolerance
fn assert_approx(actual: f64, expected: f64, tol: f64, msg: &str) {
    assert!(
        (actual - expected).abs() < tol,
        "{msg}: expected {expected:.4}, got {actual:.4}"
    );
}

fn reference() -> (Channel, Station) {
    let config = load_config("files/scenario.toml").unwrap();
    let channel = config.reference.channel("T1-1A-H").unwrap().clone();
    let gateway = config.reference.gateway("Nonthaburi").unwrap().clone();
    (channel, gateway)
}

fn single_mcg_modem(required_cn: f64, spectral_efficiency: f64, acm: bool) -> Modem {
    Modem::new(
        "Single",
        acm,
        vec![Mcg {
            name: "QPSK 3/4".to_string(),
            required_cn,
            spectral_efficiency,
        }],
    )
}

fn permissive_modem() -> Modem {
    single_mcg_modem(-10.0, 0.5, true)
}

fn combined(result: &LinkResult, scenario: Scenario) -> f64 {
    result.scenario(scenario).combined.unwrap()
}

/// Helper: rain on either leg never improves the downlink C/N.
fn assert_downlink_degrades(result: &LinkResult, label: &str) {
    let legs = &result.downlink.as_ref().unwrap().legs;
    let cn = |scenario: Scenario| legs.get(scenario).cn;
    let clear = cn(Scenario::ClearSky);
    assert!(cn(Scenario::RainUp) <= clear + 1e-9, "{label}: rain up");
    assert!(cn(Scenario::RainDown) <= clear + 1e-9, "{label}: rain down");
    assert!(cn(Scenario::RainBoth) <= cn(Scenario::RainUp) + 1e-9, "{label}: rain both vs up");
    assert!(cn(Scenario::RainBoth) <= cn(Scenario::RainDown) + 1e-9, "{label}: rain both vs down");
    assert!(cn(Scenario::RainBoth) < clear, "{label}: rain both vs clear");
}

/// Full 36 MHz transponder, fixed QPSK 3/4 at 8 dB. Every scenario runs
/// at the same MCG, so every scenario carries the same throughput.
#[test]
fn fixed_mcg_fills_transponder() {
    let (channel, gateway) = reference();
    let modem = single_mcg_modem(8.0, 1.5, false);

    let result = Link::builder(&channel, &modem, 36.0e6)
        .gateway(&gateway)
        .build()
        .calculate()
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    let expected = 1.5 * 36.0e6 / (1.0 + modem.roll_off);
    for (scenario, row) in result.scenarios.iter() {
        assert!(row.combined.unwrap() >= 8.0, "{}", scenario);
        assert_eq!(row.capacity.as_ref().unwrap().mcg.name, "QPSK 3/4");
        assert_approx(row.throughput, expected, 1e-3, &scenario.to_string());
    }
    assert_eq!(result.scenario(Scenario::ClearSky).bandwidth_mhz, 36.0);
}

#[test]
fn scenarios_degrade_monotonically() {
    let (channel, gateway) = reference();
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .availability(99.9)
        .build()
        .calculate()
        .unwrap();

    let clear = combined(&result, Scenario::ClearSky);
    let rain_up = combined(&result, Scenario::RainUp);
    let rain_down = combined(&result, Scenario::RainDown);
    let rain_both = combined(&result, Scenario::RainBoth);
    assert!(rain_up <= clear + 1e-9);
    assert!(rain_down <= clear + 1e-9);
    assert!(rain_both <= rain_up + 1e-9);
    assert!(rain_both <= rain_down + 1e-9);
    assert!(rain_both < clear);

    let uplink = result.uplink.unwrap();
    assert!(uplink.rain.cn <= uplink.clear.cn + 1e-9);
    assert!(uplink.upc >= 0.0 && uplink.upc <= gateway.upc_range);
}

#[test]
fn downlink_degrades_under_alc() {
    let (channel, gateway) = reference();
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .forced_operating_mode(OperatingMode::Alc)
        .num_carriers(10)
        .availability(99.9)
        .build()
        .calculate()
        .unwrap();

    assert_eq!(result.satellite.as_ref().unwrap().mode, OperatingMode::Alc);
    assert_downlink_degrades(&result, "ALC");
}

#[test]
fn downlink_degrades_at_full_station_power() {
    let (channel, gateway) = reference();
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .power_optimization(false)
        .availability(99.9)
        .build()
        .calculate()
        .unwrap();

    assert!(result.uplink.as_ref().unwrap().optimized_eirp.is_none());
    assert_downlink_degrades(&result, "full power");
}

/// A TWTA whose output droops again past saturation. The carrier has to sit
/// on the saturation side of the curve, where an uplink fade can only lower
/// the downlink EIRP.
#[test]
fn overdriven_curve_keeps_carrier_at_saturation() {
    let (mut channel, mut gateway) = reference();
    channel.transponder.backoff_curve = Curve::new(vec![
        (-4.0, 1.0),
        (0.0, 0.0),
        (2.0, 0.5),
        (4.0, 1.5),
        (10.0, 6.5),
        (20.0, 16.5),
    ]);
    gateway.upc_range = 0.0;
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 36.0e6)
        .gateway(&gateway)
        .availability(99.9)
        .build()
        .calculate()
        .unwrap();

    let satellite = result.satellite.as_ref().unwrap();
    assert!(
        satellite.clear.input_backoff >= -1e-9,
        "clear sky input backoff {:.3}",
        satellite.clear.input_backoff
    );
    assert!(satellite.clear.downlink_eirp <= channel.transponder.saturated_eirp + 1e-9);
    assert!(satellite.rain.downlink_eirp < satellite.clear.downlink_eirp);
    assert_downlink_degrades(&result, "overdriven curve");
}

#[test]
fn curve_falling_past_saturation_is_rejected() {
    let (mut channel, gateway) = reference();
    channel.transponder.backoff_curve =
        Curve::new(vec![(0.0, 0.0), (4.0, 3.0), (6.0, 2.0), (10.0, 6.0)]);
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .build()
        .calculate();
    assert!(matches!(result, Err(LinkError::InvalidInput(_))));
}

#[test]
fn acm_rain_both_can_fail_alone() {
    let (channel, gateway) = reference();
    let baseline = permissive_modem();
    let link = |modem: &Modem| -> LinkResult {
        Link::builder(&channel, modem, 9.0e6)
            .gateway(&gateway)
            .availability(99.95)
            .build()
            .calculate()
            .unwrap()
    };

    let reported = link(&baseline);
    let clear = combined(&reported, Scenario::ClearSky);
    let rain_both = combined(&reported, Scenario::RainBoth);
    assert!(rain_both < clear);

    let modem = single_mcg_modem(0.5 * (clear + rain_both), 1.49, true);
    let result = link(&modem);

    assert!(result.scenario(Scenario::ClearSky).closes());
    assert!(result.scenario(Scenario::ClearSky).throughput > 0.0);
    let rain_both_row = result.scenario(Scenario::RainBoth);
    assert!(!rain_both_row.closes());
    assert_eq!(rain_both_row.throughput, 0.0);
    assert_approx(rain_both_row.combined.unwrap(), rain_both, 1e-9, "rain both ratio");
    assert!(result.errors.iter().any(|e| matches!(
        e,
        LinkError::Scenario {
            scenario: Scenario::RainBoth,
            ..
        }
    )));
}

/// A non-ACM carrier runs at the MCG that closes in rain on both legs, so a
/// threshold only clear sky reaches carries nothing anywhere.
#[test]
fn fixed_mcg_is_chosen_in_rain_both() {
    let (channel, gateway) = reference();
    let link = |modem: &Modem| -> LinkResult {
        Link::builder(&channel, modem, 9.0e6)
            .gateway(&gateway)
            .availability(99.95)
            .build()
            .calculate()
            .unwrap()
    };

    let reported = link(&permissive_modem());
    let clear = combined(&reported, Scenario::ClearSky);
    let rain_both = combined(&reported, Scenario::RainBoth);
    assert!(rain_both < clear);

    let modem = single_mcg_modem(0.5 * (clear + rain_both), 1.49, false);
    let result = link(&modem);
    for (scenario, row) in result.scenarios.iter() {
        assert!(!row.closes(), "{}", scenario);
        assert_eq!(row.throughput, 0.0, "{}", scenario);
    }
    let infeasible: Vec<&LinkError> = result
        .errors
        .iter()
        .filter(|e| {
            matches!(e, LinkError::Scenario { source, .. }
                if matches!(**source, LinkError::NoFeasibleMcg { .. }))
        })
        .collect();
    assert_eq!(infeasible.len(), 1, "{:?}", result.errors);

    // a threshold rain both reaches carries the same traffic everywhere
    let modem = single_mcg_modem(rain_both, 1.49, false);
    let result = link(&modem);
    let expected = result.scenario(Scenario::RainBoth).throughput;
    assert!(expected > 0.0);
    for (scenario, row) in result.scenarios.iter() {
        assert_approx(row.throughput, expected, 1e-9, &scenario.to_string());
    }
}

#[test]
fn threshold_equal_to_ratio_closes() {
    let (channel, gateway) = reference();
    let baseline = permissive_modem();
    let clear = {
        let result = Link::builder(&channel, &baseline, 9.0e6)
            .gateway(&gateway)
            .build()
            .calculate()
            .unwrap();
        combined(&result, Scenario::ClearSky)
    };

    let modem = single_mcg_modem(clear, 1.49, true);
    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .build()
        .calculate()
        .unwrap();
    assert!(result.scenario(Scenario::ClearSky).closes());
}

#[test]
fn forced_mode_the_transponder_lacks_falls_back() {
    let (mut channel, gateway) = reference();
    channel.transponder.secondary_mode = None;
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .forced_operating_mode(OperatingMode::Alc)
        .build()
        .calculate()
        .unwrap();

    let unsupported: Vec<&LinkError> = result
        .warnings
        .iter()
        .filter(|w| matches!(w, LinkError::UnsupportedMode { .. }))
        .collect();
    assert_eq!(unsupported.len(), 1);
    assert_eq!(result.satellite.as_ref().unwrap().mode, OperatingMode::Fgm);
    assert!(result.scenario(Scenario::ClearSky).closes());
}

#[test]
fn alc_holds_table_backoff() {
    let (channel, gateway) = reference();
    let modem = permissive_modem();

    let result = Link::builder(&channel, &modem, 9.0e6)
        .gateway(&gateway)
        .forced_operating_mode(OperatingMode::Alc)
        .num_carriers(10)
        .build()
        .calculate()
        .unwrap();

    let satellite = result.satellite.unwrap();
    assert_eq!(satellite.mode, OperatingMode::Alc);
    assert!(satellite.iterations > 0);
    assert!(!result
        .warnings
        .iter()
        .any(|w| matches!(w, LinkError::UnsupportedMode { .. })));
}

#[test]
fn station_keeping_box_costs_beam_gain() {
    let (mut channel, gateway) = reference();
    let modem = permissive_modem();
    let run = |channel: &Channel| -> LinkResult {
        Link::builder(channel, &modem, 9.0e6)
            .gateway(&gateway)
            .build()
            .calculate()
            .unwrap()
    };

    channel.satellite.half_station_keeping_box = 0.0;
    let fixed_in_slot = run(&channel);
    channel.satellite.half_station_keeping_box = 0.5;
    let drifting = run(&channel);

    let still = fixed_in_slot.uplink.as_ref().unwrap();
    let moved = drifting.uplink.as_ref().unwrap();
    assert_eq!(still.gain_variation, 0.0);
    assert!(moved.gain_variation > 0.0);
    assert_approx(
        still.satellite_gt - moved.satellite_gt,
        moved.gain_variation,
        1e-9,
        "satellite G/T",
    );
    assert!(drifting.downlink.as_ref().unwrap().gain_variation > 0.0);
    assert!(
        combined(&drifting, Scenario::ClearSky) <= combined(&fixed_in_slot, Scenario::ClearSky) + 1e-9
    );
}

#[test]
fn parallel_calculations_match_sequential() {
    let (channel, gateway) = reference();
    let modem = permissive_modem();
    let bandwidths = [4.5e6, 9.0e6, 18.0e6, 36.0e6];

    let link = |bandwidth: f64| -> LinkResult {
        Link::builder(&channel, &modem, bandwidth)
            .gateway(&gateway)
            .build()
            .calculate()
            .unwrap()
    };
    let link = &link;

    let sequential: Vec<LinkResult> = bandwidths.iter().map(|&b| link(b)).collect();
    let parallel: Vec<LinkResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = bandwidths
            .iter()
            .map(|&b| scope.spawn(move || link(b)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, parallel);
}

#[test]
fn wider_carrier_carries_more() {
    let (channel, gateway) = reference();
    let modem = single_mcg_modem(-10.0, 1.0, false);
    let throughput = |bandwidth: f64| -> f64 {
        Link::builder(&channel, &modem, bandwidth)
            .gateway(&gateway)
            .build()
            .calculate()
            .unwrap()
            .scenario(Scenario::ClearSky)
            .throughput
    };
    assert_approx(throughput(18.0e6), 2.0 * throughput(9.0e6), 1e-3, "throughput");
}
