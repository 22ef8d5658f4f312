use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::Context as _;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use clap::Parser as _;

use timecard::{calendar, config, output, parser, pipeline};

#[derive(Debug, clap::Parser)]
#[command(
    name = "timecard",
    version,
    about = "Track time spent on projects using tagged calendar entries."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Initialize and select the calendar to use.
    Init(InitArgs),
    /// List events from the selected calendar.
    Ls(LsArgs),
    /// Print a walkthrough of the annotation grammar.
    Tutorial,
}

#[derive(Debug, clap::Args)]
struct InitArgs {
    /// Directory containing the configuration.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Calendar ID to select; prompted for interactively when omitted.
    #[arg(long)]
    calendar_id: Option<String>,
}

#[derive(Debug, clap::Args)]
struct LsArgs {
    /// Optionally aggregate entries using a policy: daily, weekly, or monthly.
    #[arg(long, default_value = "")]
    aggregate: String,

    /// Directory containing the configuration.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Number of days in the past to fetch.
    #[arg(long, default_value_t = 1)]
    days: i64,

    /// Output format: box, csv, invoice, or json.
    #[arg(long, default_value = "box")]
    format: String,

    /// Maximum number of events to fetch.
    #[arg(long, default_value_t = 4096)]
    max_events: i64,

    /// Only show data for the given project.
    #[arg(long, default_value = "")]
    project: String,

    /// Only show data for the given tag.
    #[arg(long, default_value = "")]
    tag: String,

    /// Compute the total amount of hours worked per project.
    #[arg(long)]
    total: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Init(args) => init(args),
        Command::Ls(args) => ls(args),
        Command::Tutorial => {
            print!("{}", include_str!("tutorial.md"));
            Ok(())
        }
    }
}

fn resolve_config_dir(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match flag {
        Some(dir) => Ok(dir),
        None => Ok(config::config_dir()?),
    }
}

fn init(args: InitArgs) -> anyhow::Result<()> {
    let dir = resolve_config_dir(args.config_dir)?;
    let id = match args.calendar_id {
        Some(id) => id,
        None => {
            print!("Please, provide the default calendar ID: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    anyhow::ensure!(!id.is_empty(), "the calendar ID must not be empty");
    let settings = config::Settings {
        calendar: config::Calendar { id },
    };
    config::store(&dir, &settings)?;
    Ok(())
}

fn ls(args: LsArgs) -> anyhow::Result<()> {
    let dir = resolve_config_dir(args.config_dir)?;
    let settings =
        config::load(&dir).context("run `timecard init` to select a calendar first")?;
    let token = config::access_token(&dir)?;

    let (start_time, end_time) = days_to_interval(args.days);
    tracing::debug!(%start_time, %end_time, "fetching events");
    let client = calendar::Client::new(token);
    let raw_events = client.fetch_events(&calendar::FetchEventsConfig {
        calendar_id: settings.calendar.id,
        start_time,
        end_time,
        max_events: args.max_events,
    })?;

    let records = parser::decode_all(&raw_events)?;
    if records.len() as i64 >= args.max_events {
        tracing::warn!(
            max_events = args.max_events,
            "reached the maximum number of events to query"
        );
        tracing::warn!("try increasing the limit using `--max-events`");
    }

    let pipeline_config = pipeline::Config {
        project: args.project,
        tag: args.tag,
        aggregate: args.aggregate,
        total: args.total,
    };
    let records = pipeline::run(&pipeline_config, &records)?;

    let stdout = io::stdout();
    output::write(
        stdout.lock(),
        &args.format,
        records.as_deref().unwrap_or_default(),
    )?;
    Ok(())
}

/// The reporting window covers whole local days: it ends at the upcoming
/// local midnight and starts `days` days earlier, clamped to 0..=365.
fn days_to_interval(days: i64) -> (DateTime<Local>, DateTime<Local>) {
    let now = Local::now();
    let midnight = (now.date_naive() + TimeDelta::days(1))
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let end_time = Local.from_local_datetime(&midnight).single().unwrap_or(now);
    let start_time = end_time - TimeDelta::days(days.clamp(0, 365));
    (start_time, end_time)
}
