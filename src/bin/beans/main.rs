//! `beans` command line tool
//!
//! One subcommand per step of the jumping bean workflow: preprocessing and tracking of
//! recordings, editing of position data files, statistics with their figures, and the
//! Monte-Carlo simulations.
//!
//! ```bash
//! beans track experiments/2021-07-14/video3.avi -n 1
//! beans trim experiments/2021-07-14/pos_data.json --seek 1 --to 4500
//! beans msd-manifest manifest.json -o figure-msd.svg
//! beans simulate -n 10 -l 2h30m
//! ```

mod positions;
mod simulate;
mod stats;
mod tracking;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, warn};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(name = "beans")]
#[command(author, version, about = "Tracking and motion statistics of jumping beans")]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug information
    #[arg(short, long, global = true)]
    debug: bool,

    /// Worker threads, defaults to the number of logical CPUs
    #[arg(short = 'j', long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect contour centroids in every frame without tracking them
    Centroids(tracking::CentroidsArgs),
    /// Track objects through a video or an image sequence into a position data file
    Track(tracking::TrackArgs),
    /// Blur and contrast filtering of a video or a frames directory
    Preprocess(tracking::PreprocessArgs),
    /// Perspective correction of a video or a frames directory
    Perspective(tracking::PerspectiveArgs),
    /// Keep a range of frames of a position data file
    Trim(positions::TrimArgs),
    /// Append the frames of a second position data file to the first
    Append(positions::AppendArgs),
    /// Keep only the chosen objects of a position data file, in place
    Select(positions::SelectArgs),
    /// Plot the trajectories of a position data file
    Positions(positions::PositionsArgs),
    /// Plot the activity of every object over time
    Activity(stats::ActivityArgs),
    /// Histogram of the delays between jumps
    Delay(stats::DelayArgs),
    /// Histograms of the delays and of the frame displacements
    Dists(stats::DistsArgs),
    /// Fitted delay and displacement distributions of a manifest
    DistsManifest(stats::DistsManifestArgs),
    /// Rose diagram of the angular displacements
    Angles(stats::AnglesArgs),
    /// Log-log MSD of every object of a position data file
    Msd(stats::MsdArgs),
    /// MSD per set of a manifest with the fitted slopes
    MsdManifest(stats::MsdManifestArgs),
    /// Append delay, displacement and video time of each jump to a CSV file
    Jumps(stats::JumpsArgs),
    /// Diffusion constant against bean size
    Diffusion(stats::DiffusionArgs),
    /// Compare the diffusion constants of two groups with a t-test
    Compare(stats::CompareArgs),
    /// Simulate beans over a period of time into a position data file
    Simulate(simulate::SimulateArgs),
    /// Rates of finding shade for diffuse and ballistic motion in one dimension
    Shade(simulate::ShadeArgs),
}

fn init_logger(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| writeln!(buf, "{} : {}", record.level(), record.args()))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.jobs.unwrap_or_else(num_cpus::get).max(1))
        .build_global()?;

    match cli.command {
        Commands::Centroids(args) => tracking::centroids(args),
        Commands::Track(args) => tracking::track(args),
        Commands::Preprocess(args) => tracking::preprocess(args),
        Commands::Perspective(args) => tracking::perspective(args),
        Commands::Trim(args) => positions::trim(args),
        Commands::Append(args) => positions::append(args),
        Commands::Select(args) => positions::select(args),
        Commands::Positions(args) => positions::positions(args),
        Commands::Activity(args) => stats::activity(args),
        Commands::Delay(args) => stats::delay(args),
        Commands::Dists(args) => stats::dists(args),
        Commands::DistsManifest(args) => stats::dists_manifest(args),
        Commands::Angles(args) => stats::angles(args),
        Commands::Msd(args) => stats::msd(args),
        Commands::MsdManifest(args) => stats::msd_manifest(args),
        Commands::Jumps(args) => stats::jumps(args),
        Commands::Diffusion(args) => stats::diffusion(args),
        Commands::Compare(args) => stats::compare(args),
        Commands::Simulate(args) => simulate::simulate(args),
        Commands::Shade(args) => simulate::shade(args),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.debug);
    debug!("ARGS: {:?}", cli);

    if let Err(e) = run(cli) {
        warn!("{:#}", e);
        std::process::exit(1);
    }
}
