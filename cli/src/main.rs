mod error;
mod logger;

use clap::{Arg, ArgMatches, Command};
use error::CliError;
use harrier::{run_script, HarrierOptions};
use std::fs::File;
use std::io::BufReader;

fn build_command() -> Command<'static> {
    Command::new("harrier")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Normalizes arithmetic terms to a canonical sum of monomials")
        .arg(
            Arg::new("file")
                .required(true)
                .help("The script file to run"),
        )
        .arg(
            Arg::new("no-flat")
                .long("no-flat")
                .help("Don't flatten nested applications of '+' and '*'"),
        )
        .arg(
            Arg::new("som")
                .long("som")
                .help("Distribute products over sums (sum-of-monomials form)"),
        )
        .arg(
            Arg::new("som-blowup")
                .long("som-blowup")
                .takes_value(true)
                .value_name("N")
                .help("Maximum expansion factor permitted during distribution [default: 10]"),
        )
        .arg(
            Arg::new("hoist-mul")
                .long("hoist-mul")
                .help("Extract multiplicative factors shared between summands"),
        )
        .arg(
            Arg::new("hoist-ite")
                .long("hoist-ite")
                .help("Extract summands shared between the branches of 'ite' summands"),
        )
        .arg(
            Arg::new("sort-sums")
                .long("sort-sums")
                .help("Sort the children of '+' under the monomial order"),
        )
        .arg(Arg::new("ineq-lhs").long("ineq-lhs").help(
            "Use the ordinal monomial order, and move every non-constant monomial of a \
             comparison to its left-hand side",
        ))
        .arg(
            Arg::new("use-power")
                .long("use-power")
                .help("Group repeated multiplicative factors under '^'"),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Don't use colors in the log output"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Print informational log messages"),
        )
}

fn parse_options(matches: &ArgMatches) -> Result<HarrierOptions, CliError> {
    let mut options = HarrierOptions::new();
    options.flat = !matches.is_present("no-flat");
    options.som = matches.is_present("som");
    options.hoist_mul = matches.is_present("hoist-mul");
    options.hoist_ite = matches.is_present("hoist-ite");
    options.sort_sums = matches.is_present("sort-sums");
    options.arith_ineq_lhs = matches.is_present("ineq-lhs");
    options.use_power = matches.is_present("use-power");
    if let Some(value) = matches.value_of("som-blowup") {
        options.som_blowup = value
            .parse()
            .map_err(|_| CliError::InvalidArgument("som-blowup"))?;
    }
    Ok(options)
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let options = parse_options(matches)?;
    let path = matches.value_of("file").expect("required argument");
    let input = BufReader::new(File::open(path)?);
    for term in run_script(input, &options)? {
        println!("{}", term);
    }
    Ok(())
}

fn main() {
    let matches = build_command().get_matches();

    let level = if matches.is_present("verbose") {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    logger::init(level, !matches.is_present("no-color"));

    if let Err(e) = run(&matches) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
