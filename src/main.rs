use clap::ArgMatches;
use colored::*;
use log::{error, info};
use std::fs::File;
use std::io::{self, Read};

use spicecomb::cli::{main_command, CliArgs};
use spicecomb::element::{DropMode, ElementKind};
use spicecomb::merge::{combine_parallel, drop_elements};
use spicecomb::output::write_netlist;
use spicecomb::parser::NetlistParser;

fn main() {
    env_logger::init();

    let matches = main_command().get_matches();

    if let Err(e) = run_application(&matches) {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn run_application(matches: &ArgMatches) -> anyhow::Result<()> {
    let args = CliArgs::from_matches(matches)?;

    let content = match &args.infile {
        Some(path) => {
            if !args.quiet {
                info!("Input: {}", path.bright_blue());
            }
            std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read '{}': {}", path, e))?
        }
        None => {
            if !args.quiet {
                info!("Input: stdin");
            }
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let parser = NetlistParser::new(args.case);
    let mut netlist = parser.parse(&content)?;
    let input_counts = netlist.kind_counts();
    if !args.quiet {
        info!("Read in {} elements", netlist.len());
    }

    let stats = combine_parallel(&mut netlist, &args.combine)?;
    if !args.quiet {
        info!("Combined {} capacitors", stats.capacitors);
        info!("Combined {} inductors", stats.inductors);
        info!("Combined {} mosfets", stats.mosfets);
    }

    if let Some(threshold) = args.dropcap {
        let dropped = drop_elements(
            &mut netlist,
            ElementKind::Capacitor,
            threshold,
            DropMode::Below,
        );
        if !args.quiet {
            info!("Dropped {} capacitors < {} F", dropped, threshold);
        }
    }

    let counts = if args.quiet {
        None
    } else {
        Some(input_counts.as_slice())
    };

    match &args.outfile {
        Some(path) => {
            let mut out = File::create(path)
                .map_err(|e| anyhow::anyhow!("failed to create '{}': {}", path, e))?;
            write_netlist(&mut out, &netlist, args.linewidth, counts)?;
            if !args.quiet {
                info!("Output: {}", path.bright_green());
            }
        }
        None => {
            let stdout = io::stdout();
            write_netlist(&mut stdout.lock(), &netlist, args.linewidth, counts)?;
        }
    }

    if !args.quiet {
        info!("{}", "Netlist processing completed".green().bold());
    }
    Ok(())
}
