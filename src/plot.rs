use super::export::Outputs;
use super::{ParsePolicy, DEFAULT_CSV, DEFAULT_RATIO, DEFAULT_TREND, VERSION};
use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DPI: u32 = 300;

/// Everything the plotting binary needs from the command line.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub csvin: PathBuf,
    pub outputs: Outputs,
    pub terms: Option<[String; 2]>,
    pub dpi: u32,
    pub policy: ParsePolicy,
    pub verbose: bool,
}

fn cli_app<'a, 'b>() -> App<'a, 'b> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("name of the trends csv export")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .default_value(DEFAULT_CSV);
    let arg_trend = Arg::with_name("trend_file")
        .help("output image for the interest over time, svg or png by extension")
        .short("t")
        .long("trend")
        .takes_value(true)
        .default_value(DEFAULT_TREND);
    let arg_ratio = Arg::with_name("ratio_file")
        .help("output image for the yearly ratios, svg or png by extension")
        .short("r")
        .long("ratio")
        .takes_value(true)
        .default_value(DEFAULT_RATIO);
    let arg_stats = Arg::with_name("stats_file")
        .help("optional csv file for the yearly peaks, totals and ratios")
        .short("s")
        .long("stats")
        .takes_value(true);
    let arg_terms = Arg::with_name("terms")
        .help("labels of the two terms, comma separated (default: from the csv header)")
        .long("terms")
        .takes_value(true)
        .validator(|v| parse_terms(&v).map(|_| ()));
    let arg_dpi = Arg::with_name("dpi")
        .help("resolution of the images, dots per inch")
        .long("dpi")
        .takes_value(true)
        .default_value("300")
        .validator(|v| match v.parse::<u32>() {
            Ok(d) if d > 0 => Ok(()),
            _ => Err(format!("dpi must be a positive integer, got {}", v)),
        });
    let arg_strict = Arg::with_name("strict")
        .help("fail on unparseable dates or values instead of skipping them")
        .long("strict")
        .takes_value(false);
    let arg_verbose = Arg::with_name("verbose")
        .help("print verbose information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("Trends_plot")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to plot the search interest of two terms and their yearly ratios")
        .arg(arg_csvin)
        .arg(arg_trend)
        .arg(arg_ratio)
        .arg(arg_stats)
        .arg(arg_terms)
        .arg(arg_dpi)
        .arg(arg_strict)
        .arg(arg_verbose)
}

/// Splits `A,B` into the two term labels.
pub fn parse_terms(s: &str) -> Result<[String; 2], String> {
    let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
    match parts.as_slice() {
        [a, b] if !a.is_empty() && !b.is_empty() => Ok([a.to_string(), b.to_string()]),
        _ => Err(format!("expected two comma separated terms, got '{}'", s)),
    }
}

fn config_from_matches(m: &ArgMatches) -> PlotConfig {
    let path = |name: &str, default: &str| PathBuf::from(m.value_of(name).unwrap_or(default));
    PlotConfig {
        csvin: path("input_csvfile", DEFAULT_CSV),
        outputs: Outputs {
            trend: path("trend_file", DEFAULT_TREND),
            ratio: path("ratio_file", DEFAULT_RATIO),
            stats: m.value_of("stats_file").map(PathBuf::from),
        },
        terms: m.value_of("terms").and_then(|t| parse_terms(t).ok()),
        dpi: m
            .value_of("dpi")
            .and_then(|d| d.parse::<u32>().ok())
            .unwrap_or(DEFAULT_DPI),
        policy: if m.is_present("strict") {
            ParsePolicy::Strict
        } else {
            ParsePolicy::Tolerant
        },
        verbose: m.is_present("verbose"),
    }
}

/// Takes the CLI arguments that control loading and plotting, exits on invalid arguments.
pub fn parse_cli() -> PlotConfig {
    config_from_matches(&cli_app().get_matches())
}

/// Same as `parse_cli` for an explicit argument list, the first item is the program name.
pub fn parse_cli_from<I, T>(args: I) -> Result<PlotConfig, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let m = cli_app().get_matches_from_safe(args)?;
    Ok(config_from_matches(&m))
}

/// Logs to stderr, `info` by default, `debug` with verbose; `RUST_LOG` takes precedence.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();
}
