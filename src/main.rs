use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opencast_bridge::config::BridgeConfig;
use opencast_bridge::directory::CourseCatalog;
use opencast_bridge::io::http::HttpResourceClient;
use opencast_bridge::model::UploadJob;
use opencast_bridge::sync::{ApiBridge, EMPTY_SERIES};
use opencast_bridge::{BridgeError, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_tracing(cli.verbose) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("error: the platform rejected the update");
            std::process::exit(2);
        }
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| BridgeError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<bool> {
    let config = BridgeConfig::load(&cli.config)?;
    let courses = match &cli.courses {
        Some(path) => CourseCatalog::load(path)?,
        None => CourseCatalog::new(),
    };
    let roles = config.role_table();
    let client = HttpResourceClient::new(&config)?;
    let bridge = ApiBridge::new(config, &client, &courses, &roles)?;

    match cli.command {
        Command::EnsureGroup { course } => print_json(&bridge.ensure_group_exists(course)?),
        Command::EnsureSeries { course } => print_json(&bridge.ensure_series_exists(course)?),
        Command::Upload(args) => execute_upload(&bridge, args),
        Command::AssignAcl { event, course } => bridge.ensure_acl_assigned(&event, course),
        Command::RemoveAcl { event, course } => bridge.ensure_acl_removed(&event, course),
        Command::AssignSeries { event, series } => {
            let series = series.unwrap_or_else(|| EMPTY_SERIES.to_string());
            if series != EMPTY_SERIES && bridge.series_by_identifier(&series)?.is_none() {
                return Err(BridgeError::Configuration(format!(
                    "series '{series}' does not exist"
                )));
            }
            bridge.ensure_series_assigned(&event, &series)
        }
        Command::Videos { course, all, sort } => {
            let videos = if all {
                bridge.course_videos(course, sort.as_deref())?
            } else {
                bridge.block_videos(course)?
            };
            print_json(&videos)?;
            Ok(videos.error.is_none())
        }
    }
}

fn execute_upload(bridge: &ApiBridge<'_>, args: UploadArgs) -> Result<bool> {
    bridge.ensure_group_exists(args.course)?;
    let series = match args.series {
        Some(series) => series,
        None => bridge.ensure_series_exists(args.course)?.identifier,
    };

    let job = UploadJob::new(args.course, args.file);
    let ensured = bridge.ensure_event_exists(&job, &args.candidates, &series)?;
    print_json(&serde_json::json!({
        "event": ensured.event,
        "newly_created": ensured.newly_created,
    }))?;

    bridge.ensure_acl_assigned(&ensured.event.identifier, args.course)
}

fn print_json<T: Serialize>(value: &T) -> Result<bool> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(true)
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile course groups, series, events and ACLs on Opencast."
)]
struct Cli {
    /// JSON configuration file with connection settings and role mapping.
    #[arg(long, global = true, default_value = "opencast-bridge.json")]
    config: PathBuf,

    /// JSON object mapping course identifiers to course names.
    #[arg(long, global = true)]
    courses: Option<PathBuf>,

    /// Enable debug logging unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Make sure the course group exists.
    EnsureGroup {
        #[arg(long)]
        course: i64,
    },

    /// Make sure the course series exists.
    EnsureSeries {
        #[arg(long)]
        course: i64,
    },

    /// Upload a media file as an event of the course.
    Upload(UploadArgs),

    /// Grant the configured course roles on an event.
    AssignAcl {
        #[arg(long)]
        event: String,
        #[arg(long)]
        course: i64,
    },

    /// Revoke a course's access to an event.
    RemoveAcl {
        #[arg(long)]
        event: String,
        #[arg(long)]
        course: i64,
    },

    /// Point an event at a series. Without `--series` the event is detached.
    AssignSeries {
        #[arg(long)]
        event: String,
        #[arg(long)]
        series: Option<String>,
    },

    /// List the videos of a course.
    Videos {
        #[arg(long)]
        course: i64,

        /// List every video instead of the block selection.
        #[arg(long)]
        all: bool,

        /// Sort expression such as `title:ASC`, used with `--all`.
        #[arg(long)]
        sort: Option<String>,
    },
}

#[derive(clap::Args)]
struct UploadArgs {
    #[arg(long)]
    course: i64,

    /// Media file to upload.
    #[arg(long)]
    file: PathBuf,

    /// Identifiers of events possibly created by an earlier attempt.
    #[arg(long = "candidate")]
    candidates: Vec<String>,

    /// Series to attach the event to instead of the course series.
    #[arg(long)]
    series: Option<String>,
}
