use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::result::LinkResult;

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{:.2}", value))
}

pub fn generate_html_report(result: &LinkResult, output_path_str: &str) -> Result<(), std::io::Error> {
    let path = Path::new(output_path_str);
    let mut file = File::create(path)?;

    writeln!(file, "<!DOCTYPE html>")?;
    writeln!(file, "<html>")?;
    writeln!(file, "<head>")?;
    writeln!(file, "<title>Link Budget</title>")?;
    writeln!(file, "<style>")?;
    writeln!(file, "table {{ border-collapse: collapse; }}")?;
    writeln!(file, ".scenarios {{ width: 100%; }}")?;
    writeln!(file, ".parameters {{ width: auto; }}")?;
    writeln!(file, ".parameters td:nth-child(2) {{ text-align: right; }}")?;
    writeln!(
        file,
        "th, td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}"
    )?;
    writeln!(file, "th {{ background-color: #f2f2f2; }}")?;
    writeln!(file, "tr:nth-child(even) {{ background-color: #f9f9f9; }}")?;
    writeln!(file, ".warning {{ color: #a66b00; }}")?;
    writeln!(file, ".error {{ color: #b00020; }}")?;
    writeln!(file, "</style>")?;
    writeln!(file, "</head>")?;
    writeln!(file, "<body>")?;
    writeln!(file, "<h1>Link Budget</h1>")?;

    writeln!(file, "<h2>Request</h2>")?;
    writeln!(file, "<table class=\"parameters\">")?;
    writeln!(file, "<tr><th>Parameter</th><th>Value</th><th>Unit</th></tr>")?;
    writeln!(file, "<tr><td>Channel</td><td>{}</td><td></td></tr>", result.channel)?;
    writeln!(file, "<tr><td>Modem</td><td>{}</td><td></td></tr>", result.modem)?;
    writeln!(
        file,
        "<tr><td>Bandwidth</td><td>{:.3}</td><td>MHz</td></tr>",
        result.bandwidth / 1.0e6
    )?;
    writeln!(file, "</table>")?;
    writeln!(file, "<br>")?;

    if let Some(uplink) = &result.uplink {
        writeln!(file, "<h2>Uplink: {}</h2>", uplink.station)?;
        writeln!(file, "<table class=\"parameters\">")?;
        writeln!(file, "<tr><th>Parameter</th><th>Value</th><th>Unit</th></tr>")?;
        let rows = [
            ("Elevation", uplink.look_angles.elevation, "deg"),
            ("Slant range", uplink.look_angles.slant_range, "km"),
            ("Antenna gain", uplink.antenna_gain, "dBi"),
            ("Maximum EIRP", uplink.max_eirp, "dBW"),
            ("EIRP", uplink.clear.eirp, "dBW"),
            ("UPC in rain", uplink.upc, "dB"),
            ("Gain variation", uplink.gain_variation, "dB"),
            ("Satellite G/T", uplink.satellite_gt, "dB/K"),
            ("Path loss", uplink.clear.path_loss, "dB"),
            ("Pointing loss", uplink.clear.pointing_loss, "dB"),
            ("Polarization loss", uplink.clear.xpol_loss + uplink.clear.axial_ratio_loss, "dB"),
            ("Rain attenuation", uplink.rain.attenuation.total(), "dB"),
            ("C/N clear sky", uplink.clear.cn, "dB"),
            ("C/N rain", uplink.rain.cn, "dB"),
        ];
        for (name, value, unit) in rows {
            writeln!(
                file,
                "<tr><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
                name, value, unit
            )?;
        }
        writeln!(file, "</table>")?;
    }

    if let Some(satellite) = &result.satellite {
        writeln!(
            file,
            "<h2>Transponder {} ({})</h2>",
            satellite.transponder, satellite.mode
        )?;
        writeln!(file, "<table class=\"parameters\">")?;
        writeln!(file, "<tr><th>Uplink</th><th>IBO (dB)</th><th>OBO (dB)</th><th>Downlink EIRP (dBW)</th></tr>")?;
        for (name, point) in [("Clear sky", &satellite.clear), ("Rain", &satellite.rain)] {
            writeln!(
                file,
                "<tr><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td></tr>",
                name, point.input_backoff, point.output_backoff, point.downlink_eirp
            )?;
        }
        writeln!(file, "</table>")?;
    }

    if let Some(downlink) = &result.downlink {
        writeln!(file, "<h2>Downlink: {}</h2>", downlink.station)?;
        writeln!(
            file,
            "<p>Station-keeping gain variation: {:.2} dB</p>",
            downlink.gain_variation
        )?;
        writeln!(file, "<table class=\"scenarios\">")?;
        writeln!(file, "<tr>")?;
        writeln!(file, "<th>Scenario</th>")?;
        writeln!(file, "<th>EIRP (dBW)</th>")?;
        writeln!(file, "<th>G/T (dB/K)</th>")?;
        writeln!(file, "<th>Total Loss (dB)</th>")?;
        writeln!(file, "<th>Attenuation (dB)</th>")?;
        writeln!(file, "<th>C/N (dB)</th>")?;
        writeln!(file, "</tr>")?;
        for (scenario, leg) in downlink.legs.iter() {
            writeln!(file, "<tr>")?;
            writeln!(file, "<td>{}</td>", scenario)?;
            writeln!(file, "<td>{:.2}</td>", leg.eirp)?;
            writeln!(file, "<td>{:.2}</td>", leg.gt)?;
            writeln!(file, "<td>{:.2}</td>", leg.total_loss())?;
            writeln!(file, "<td>{:.2}</td>", leg.attenuation.total())?;
            writeln!(file, "<td>{:.2}</td>", leg.cn)?;
            writeln!(file, "</tr>")?;
        }
        writeln!(file, "</table>")?;
    }

    writeln!(file, "<h2>Scenarios</h2>")?;
    writeln!(file, "<table class=\"scenarios\">")?;
    writeln!(file, "<tr>")?;
    writeln!(file, "<th>Scenario</th>")?;
    writeln!(file, "<th>C/N up (dB)</th>")?;
    writeln!(file, "<th>C/N down (dB)</th>")?;
    writeln!(file, "<th>C/I up (dB)</th>")?;
    writeln!(file, "<th>C/I down (dB)</th>")?;
    writeln!(file, "<th>C/(N+I) (dB)</th>")?;
    writeln!(file, "<th>MCG</th>")?;
    writeln!(file, "<th>Throughput (Mbit/s)</th>")?;
    writeln!(file, "</tr>")?;
    for (scenario, row) in result.scenarios.iter() {
        writeln!(file, "<tr>")?;
        writeln!(file, "<td>{}</td>", scenario)?;
        writeln!(file, "<td>{}</td>", optional(row.cn_up))?;
        writeln!(file, "<td>{}</td>", optional(row.cn_down))?;
        writeln!(file, "<td>{}</td>", optional(row.ci_up))?;
        writeln!(file, "<td>{}</td>", optional(row.ci_down))?;
        writeln!(file, "<td>{}</td>", optional(row.combined))?;
        match &row.capacity {
            Some(capacity) => writeln!(file, "<td>{}</td>", capacity.mcg.name)?,
            None => writeln!(file, "<td>-</td>")?,
        }
        writeln!(file, "<td>{:.3}</td>", row.throughput / 1.0e6)?;
        writeln!(file, "</tr>")?;
    }
    writeln!(file, "</table>")?;

    if let Some(found) = &result.max_availability {
        writeln!(
            file,
            "<p>Maximum availability: {:.3} % with {}</p>",
            found.availability, found.outcome.mcg.name
        )?;
    }

    if !result.warnings.is_empty() || !result.errors.is_empty() {
        writeln!(file, "<h2>Diagnostics</h2>")?;
        writeln!(file, "<ul>")?;
        for warning in &result.warnings {
            writeln!(file, "<li class=\"warning\">{}</li>", warning)?;
        }
        for error in &result.errors {
            writeln!(file, "<li class=\"error\">{}</li>", error)?;
        }
        writeln!(file, "</ul>")?;
    }

    writeln!(file, "</body>")?;
    writeln!(file, "</html>")?;

    Ok(())
}
