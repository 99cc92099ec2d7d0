use std::path::Path;
use std::process;

// this cannot be crate::Link because of how Cargo works,
// since cargo/rust treats lib.rs and main.rs as separate crates
use crate::config::load_config;
use crate::result::LinkResult;

pub struct Config {
    pub result: LinkResult,
}

/// `basename.toml` becomes `basename.html` next to the config file.
pub fn output_html_path(config_path: &Path) -> String {
    let mut file_path_html = format!("{}.html", config_path.display());
    // Remove the UNC prefix on Windows if present
    if cfg!(target_os = "windows") && file_path_html.starts_with(r"\\?\") {
        file_path_html = file_path_html[4..].to_string();
    }
    if file_path_html.ends_with(".toml.html") {
        file_path_html.replace(".toml.html", ".html")
    } else {
        file_path_html
    }
}

impl Config {
    pub fn run(args: &[String]) -> Result<Config, Box<dyn std::error::Error>> {
        if args.len() < 2 {
            return Err("not enough arguments".into());
        }

        if args.len() > 2 {
            return Err(
                "too many arguments, expecting only 2, such as `linkbudget filepath`".into(),
            );
        }

        // Check for special flags
        match args[1].as_str() {
            "--version" | "-v" => {
                print_version();
                process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            _ => {}
        }

        let cwd = std::env::current_dir()?;
        // cargo run arg[1], such as cargo run files/scenario.toml
        // linkbudget arg[1], such as linkbudget files/scenario.toml
        let file_path = args[1].clone();
        println!("Config Path: {}", file_path);
        let full_path_to_config = cwd.join(file_path);
        println!("Full Path: {}", full_path_to_config.display());

        let config = load_config(&full_path_to_config)?;
        let link = config.link()?;
        let result = link.calculate()?;
        print_link(&result);

        #[cfg(feature = "report")]
        {
            let output_html_path = output_html_path(&full_path_to_config);
            println!("Generating HTML report at: {}", output_html_path);
            if let Err(e) = crate::report::generate_html_report(&result, &output_html_path) {
                eprintln!("Error generating HTML report: {}", e);
            }
        }

        Ok(Config { result })
    }
}

pub fn print_version() {
    println!("linkbudget {}", env!("CARGO_PKG_VERSION"));
}

pub fn print_error(error: &str) {
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";
    println!("{}Problem parsing arguments: {error}{}", RED, RESET);
}

pub fn print_help() {
    // ANSI color codes
    const BOLD: &str = "\x1b[1m";
    const CYAN: &str = "\x1b[36m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RESET: &str = "\x1b[0m";

    println!("🛰️ Satellite link budget calculator{}", RESET);
    println!();
    println!("{}{}VERSION:{}", BOLD, YELLOW, RESET);
    println!("    {}{}{}", GREEN, env!("CARGO_PKG_VERSION"), RESET);
    println!();
    println!("{}{}USAGE:{}", BOLD, YELLOW, RESET);
    println!("    {} linkbudget <FILE_PATH>{}", GREEN, RESET);
    println!();
    println!("     FILE_PATH: path to a toml scenario file with a [link] table");
    println!();
    println!("     The scenario is calculated for clear sky, rain up, rain down and rain both,");
    println!("     and an html report is written next to the source file.");
    println!();
    println!("     Set RUST_LOG=debug for the optimizer and per-leg trace.");
    println!();
    println!("{}{}OPTIONS:{}", BOLD, YELLOW, RESET);
    println!(
        "    {}  -v, --version{}{}    Print version information",
        GREEN, RESET, RESET
    );
    println!(
        "    {}  -h, --help{}{}       Print help information",
        GREEN, RESET, RESET
    );
    println!();
    println!("{}{}EXAMPLES:{}", BOLD, YELLOW, RESET);
    println!("    {} # Single file (Relative path){}", CYAN, RESET);
    println!("    {} linkbudget files/scenario.toml{}", GREEN, RESET);
    println!();
}

pub fn print_link(result: &LinkResult) {
    println!();
    println!("Channel: {}", result.channel);
    println!("Modem: {}", result.modem);
    println!("Bandwidth:\t\t{:>8.3} MHz", result.bandwidth / 1.0e6);

    if let Some(uplink) = &result.uplink {
        println!("\nUplink: {}", uplink.station);
        // the formatting `{:>8.2}` aligns positive and negative numbers on the decimal,
        // with two digits after the decimal (hundredths place)
        println!("Elevation:\t\t{:>8.2} deg", uplink.look_angles.elevation);
        println!("Antenna Gain:\t\t{:>8.2} dBi", uplink.antenna_gain);
        println!("Max EIRP:\t\t{:>8.2} dBW", uplink.max_eirp);
        if let Some(optimized) = uplink.optimized_eirp {
            println!("Optimized EIRP:\t\t{:>8.2} dBW", optimized);
        }
        println!("EIRP:\t\t\t{:>8.2} dBW", uplink.clear.eirp);
        println!("UPC:\t\t\t{:>8.2} dB", uplink.upc);
        println!("Gain Variation:\t\t{:>8.2} dB", uplink.gain_variation);
        println!("Satellite G/T:\t\t{:>8.2} dB/K", uplink.satellite_gt);
        println!("C/N Clear:\t\t{:>8.2} dB", uplink.clear.cn);
        println!("C/N Rain:\t\t{:>8.2} dB", uplink.rain.cn);
    }

    if let Some(satellite) = &result.satellite {
        println!("\nTransponder: {} ({})", satellite.transponder, satellite.mode);
        println!("Output Backoff:\t\t{:>8.2} dB", satellite.output_backoff);
        println!("Downlink EIRP Clear:\t{:>8.2} dBW", satellite.clear.downlink_eirp);
        println!("Downlink EIRP Rain:\t{:>8.2} dBW", satellite.rain.downlink_eirp);
    }

    if let Some(downlink) = &result.downlink {
        println!("\nDownlink: {}", downlink.station);
        println!("Elevation:\t\t{:>8.2} deg", downlink.look_angles.elevation);
        println!("Antenna Gain:\t\t{:>8.2} dBi", downlink.antenna_gain);
        println!("Gain Variation:\t\t{:>8.2} dB", downlink.gain_variation);
        for (scenario, leg) in downlink.legs.iter() {
            println!("C/N {}:\t\t{:>8.2} dB", scenario, leg.cn);
        }
    }

    println!();
    println!("Scenario Summary:");
    println!("-----------------");
    for (scenario, row) in result.scenarios.iter() {
        match (row.combined, &row.capacity) {
            (Some(combined), Some(capacity)) => println!(
                "{:<10}\t{:>8.2} dB\t{:>8.3} Mbit/s\t{}",
                scenario.to_string(),
                combined,
                row.throughput / 1.0e6,
                capacity.mcg.name
            ),
            (Some(combined), None) => println!(
                "{:<10}\t{:>8.2} dB\t{:>8.3} Mbit/s\tno MCG",
                scenario.to_string(),
                combined,
                row.throughput / 1.0e6
            ),
            (None, _) => println!("{:<10}\tundefined", scenario.to_string()),
        }
    }

    if let Some(found) = &result.max_availability {
        println!(
            "Max Availability:\t{:>8.3} % ({})",
            found.availability, found.outcome.mcg.name
        );
    }

    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }
}
