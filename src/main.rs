use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use olympic_explorer::config::{AgeGrouping, DashboardConfig, Region};
use olympic_explorer::dashboard::Page;
use olympic_explorer::data::filter::{FilterArg, FilterContext, MatchMode};
use olympic_explorer::data::schema::TableKind;
use olympic_explorer::export;
use olympic_explorer::session::Session;

#[derive(Parser)]
#[command(name = "olympic-explorer")]
#[command(about = "Filter and summarize Olympic Games results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, value_name = "FILE", help = "JSON configuration file")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "DIR", help = "Directory holding the source tables")]
    data_dir: Option<PathBuf>,

    #[arg(
        long,
        short,
        global = true,
        value_name = "DIM=V1,V2",
        help = "Restrict a dimension to the given values (repeatable)"
    )]
    filter: Vec<FilterArg>,

    #[arg(long, global = true, help = "Match list fields by substring instead of exact token")]
    contains: bool,

    #[arg(long, global = true, value_enum, default_value = "table", help = "Output format")]
    format: OutputFormat,

    #[arg(long, global = true, value_name = "DIR", help = "Also write each section as Parquet")]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Headline figures and medal standings")]
    Overview,
    #[command(about = "Medals by country and continent")]
    Global,
    #[command(about = "Venues, schedules and medals per sport")]
    Events,
    #[command(about = "Age, gender and top athletes")]
    Athletes {
        #[arg(long, value_enum, help = "Split the age distribution by this field")]
        group_ages_by: Option<AgeGroupArg>,
        #[arg(long, value_name = "NAME", conflicts_with = "gender_country", help = "Gender split for one continent")]
        gender_continent: Option<String>,
        #[arg(long, value_name = "NAME", help = "Gender split for one country")]
        gender_country: Option<String>,
        #[arg(long, value_name = "NAME", help = "Show the profile card of this athlete")]
        profile: Option<String>,
    },
    #[command(about = "List the selectable values of a dimension")]
    Options {
        #[arg(long, help = "Table to read the values from")]
        table: TableKind,
        #[arg(long, help = "Dimension (column) name")]
        dimension: String,
    },
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum AgeGroupArg {
    Sport,
    Gender,
    All,
}

impl From<AgeGroupArg> for AgeGrouping {
    fn from(arg: AgeGroupArg) -> Self {
        match arg {
            AgeGroupArg::Sport => AgeGrouping::Sport,
            AgeGroupArg::Gender => AgeGrouping::Gender,
            AgeGroupArg::All => AgeGrouping::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let mut selection = FilterContext::new();
    for arg in cli.filter {
        selection = selection.with(arg.dimension, arg.values);
    }
    if cli.contains {
        selection = selection.with_match_mode(MatchMode::Contains);
    }
    let filters = config.filters.merged(&selection);
    for (dim, spec) in filters.active() {
        log::info!("filter {dim}: {} value(s)", spec.values().len());
    }

    let session = Session::load(&config)?;

    let page = match cli.command {
        Commands::Overview => Page::Overview,
        Commands::Global => Page::GlobalAnalysis,
        Commands::Events => Page::SportsEvents,
        Commands::Athletes {
            group_ages_by,
            gender_continent,
            gender_country,
            profile,
        } => {
            let view = &mut config.athletes;
            if let Some(grouping) = group_ages_by {
                view.group_ages_by = grouping.into();
            }
            if let Some(region) = gender_continent
                .map(Region::Continent)
                .or(gender_country.map(Region::Country))
            {
                view.gender_region = Some(region);
            }
            if profile.is_some() {
                view.profile = profile;
            }
            Page::AthletePerformance
        }
        Commands::Options { table, dimension } => {
            let options = session.table(table).available_options(&filters, &dimension);
            match cli.format {
                OutputFormat::Table => options.iter().for_each(|o| println!("{o}")),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&options)?),
            }
            return Ok(());
        }
    };

    let report = page.render(&session, &filters, &config);
    match cli.format {
        OutputFormat::Table => print!("{}", export::pretty(&report)?),
        OutputFormat::Json => println!("{}", export::to_json(&report)?),
    }
    if let Some(dir) = cli.out {
        let written = export::write_parquet(&report, &dir)?;
        log::info!("{} section file(s) written to {}", written.len(), dir.display());
    }
    Ok(())
}
