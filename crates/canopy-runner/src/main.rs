//! `canopy`: tree canopy change by census tract for a U.S. city.

use canopy_runner::{Pipeline, PipelineError, RunConfig, SourcesConfig, DEFAULT_CACHE_DIR};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "canopy",
    version,
    about = "Analyze NLCD tree canopy change by census tract for a U.S. city",
    after_help = "Examples:\n  \
        canopy --city Portland --state OR --start-year 2011 --end-year 2021\n  \
        canopy --city Seattle --state WA --start-year 2016 --end-year 2021 --output-dir seattle_results\n  \
        canopy --city Austin --state TX --start-year 2011 --end-year 2019 --no-export --plot"
)]
struct Cli {
    /// City name, e.g. "Portland" or "New York"
    #[arg(long, visible_alias = "city-name")]
    city: String,

    /// Two-letter state abbreviation, e.g. OR
    #[arg(long, visible_alias = "state-abbr")]
    state: String,

    /// First year (2011-2021)
    #[arg(long)]
    start_year: u16,

    /// Last year (2011-2021, not before the start year)
    #[arg(long)]
    end_year: u16,

    /// Skip writing maps and data files
    #[arg(long)]
    no_export: bool,

    /// Write a PNG map of the last year's canopy
    #[arg(long)]
    plot: bool,

    /// Output directory [default: {City}_{STATE}_outputs]
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Cache directory for downloaded rasters and census layers
    #[arg(long, value_name = "DIR", default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Place GEOID to use when the city name matches several places
    #[arg(long, value_name = "GEOID")]
    place_geoid: Option<String>,

    /// Use only cached data; fail instead of downloading
    #[arg(long)]
    offline: bool,

    /// YAML file overriding data source settings
    #[arg(long, value_name = "FILE")]
    sources: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig, PipelineError> {
        let mut config = RunConfig::new(&self.city, &self.state, self.start_year, self.end_year)?;
        config.export = !self.no_export;
        config.plot = self.plot;
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        config.cache_dir = self.cache_dir;
        config.place_geoid = self.place_geoid;
        config.offline = self.offline;
        if let Some(path) = self.sources {
            config.sources = SourcesConfig::from_file(path)?;
        }
        Ok(config)
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let config = cli.into_config()?;
    let output = Pipeline::new(config)?.run()?;

    println!("{}", output.summary);
    if let Some(path) = &output.plot {
        println!("Static map: {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
