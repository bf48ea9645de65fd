use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use rust_decimal::Decimal;

use crate::merge::CombineOptions;
use crate::parser::CaseMode;
use crate::units::unit;

pub fn main_command() -> Command {
    Command::new("spicecomb")
        .version(crate::VERSION)
        .about("SPICE netlist pre-processor that combines parallel elements")
        .arg(
            Arg::new("infile")
                .short('i')
                .long("infile")
                .value_name("FILE")
                .help("Input SPICE file to be processed (default: stdin)"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .value_name("FILE")
                .help("Output file for the processed netlist (default: stdout)"),
        )
        .arg(
            Arg::new("dropcap")
                .short('d')
                .long("dropcap")
                .value_name("X")
                .help("After combining, drop capacitors smaller than X femtofarads"),
        )
        .arg(
            Arg::new("no-combine-c")
                .long("no-combine-c")
                .action(ArgAction::SetTrue)
                .help("Do not combine parallel capacitors"),
        )
        .arg(
            Arg::new("no-combine-m")
                .long("no-combine-m")
                .action(ArgAction::SetTrue)
                .help("Do not combine parallel MOSFETs"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress statistics comments and progress messages"),
        )
        .arg(
            Arg::new("linewidth")
                .short('w')
                .long("linewidth")
                .value_name("N")
                .default_value("75")
                .help("Maximum line width for the output netlist"),
        )
        .arg(
            Arg::new("case")
                .long("case")
                .value_name("MODE")
                .default_value("keep")
                .value_parser(["keep", "lower", "upper"])
                .help("Modify capitalization of non-comment lines"),
        )
}

/// Options handed to the core by the command line.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Input path; `None` reads stdin.
    pub infile: Option<String>,
    /// Output path; `None` writes stdout.
    pub outfile: Option<String>,
    /// Drop threshold in farads, converted from the femtofarad flag value.
    /// `None` disables the drop pass.
    pub dropcap: Option<Decimal>,
    pub combine: CombineOptions,
    pub case: CaseMode,
    pub linewidth: usize,
    pub quiet: bool,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let infile = matches.get_one::<String>("infile").cloned();
        let outfile = matches.get_one::<String>("outfile").cloned();

        let dropcap = match matches.get_one::<String>("dropcap") {
            Some(x) => {
                let femto = unit(x).map_err(|e| anyhow!("bad --dropcap value: {}", e))?;
                Some(femto * Decimal::new(1, 15))
            }
            None => None,
        };

        let combine = CombineOptions {
            capacitors: !matches.get_flag("no-combine-c"),
            mosfets: !matches.get_flag("no-combine-m"),
        };

        let case = matches
            .get_one::<String>("case")
            .expect("case has a default")
            .parse::<CaseMode>()?;

        let linewidth = matches
            .get_one::<String>("linewidth")
            .expect("linewidth has a default")
            .parse::<usize>()
            .map_err(|e| anyhow!("bad --linewidth value: {}", e))?;
        if linewidth < 10 {
            return Err(anyhow!("line width {} is too small to be useful", linewidth));
        }

        Ok(CliArgs {
            infile,
            outfile,
            dropcap,
            combine,
            case,
            linewidth,
            quiet: matches.get_flag("quiet"),
        })
    }
}
