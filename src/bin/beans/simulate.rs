use anyhow::Result;
use beantrack::pipeline::{dists_by_set, DistsOptions, ANGLE_BINS};
use beantrack::plot::histogram::HistogramFigure;
use beantrack::plot::save;
use beantrack::position::manifest::Manifest;
use beantrack::simulation::shade::{shade_rates, Motion};
use beantrack::simulation::{
    parse_duration, simulate as run_simulation, BeanModel, HeadingMode, DEFAULT_CANVAS,
};
use beantrack::stats::distributions::AngleDistribution;
use beantrack::utils::fit::mean_std;
use beantrack::utils::histogram::Histogram;
use clap::Args;
use log::info;
use std::path::PathBuf;

const SHADE_BINS: usize = 30;
const SHADE_MAX_RATE: f64 = 0.05;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of beans in simulation
    #[arg(short, long)]
    pub num_beans: usize,

    /// Length of the simulation, e.g. '2h30m'
    #[arg(short, long)]
    pub length: String,

    /// Seed of the random generators, random by default
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Manifest whose turn angles replace the uniform heading distribution
    #[arg(long)]
    pub angles: Option<PathBuf>,

    /// Position data file
    #[arg(short, long, default_value = "pos_data_simulated.json")]
    pub output: PathBuf,
}

pub fn simulate(args: SimulateArgs) -> Result<()> {
    let duration = parse_duration(&args.length)?;
    let mut model = BeanModel::paper()?;
    if let Some(path) = &args.angles {
        let manifest = Manifest::load(path)?;
        let report = dists_by_set(&manifest, &DistsOptions::default())?;
        info!(
            "Sampling headings from {} turn angles",
            report.total.turn_angles.len()
        );
        model = model.angle(
            AngleDistribution::from_angles(&report.total.turn_angles, ANGLE_BINS)?,
            HeadingMode::Relative,
        );
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Starting simulation with seed {}...", seed);
    let data = run_simulation(args.num_beans, duration, &DEFAULT_CANVAS, &model, seed)?;
    data.save(&args.output)?;
    info!("Saved position data to '{}'", args.output.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct ShadeArgs {
    /// Number of beans in simulation
    pub num_beans: usize,

    /// Show titles on plots
    #[arg(short, long)]
    pub title: bool,

    /// Seed of the random generators, random by default
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Diffuse motion figure file (.png or .svg)
    #[arg(long, default_value = "figure-shade-diffuse")]
    pub diffuse_output: PathBuf,

    /// Ballistic motion figure file (.png or .svg)
    #[arg(long, default_value = "figure-shade-ballistic")]
    pub ballistic_output: PathBuf,
}

pub fn shade(args: ShadeArgs) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Starting simulation with seed {}...", seed);

    for (motion, name, output) in [
        (Motion::Diffuse, "diffuse", &args.diffuse_output),
        (Motion::Ballistic, "ballistic", &args.ballistic_output),
    ] {
        info!("Calculating {} shade times...", name);
        let rates = shade_rates(args.num_beans, motion, seed);
        let (mean, std) = mean_std(&rates);
        info!("Mean {} rate: {:.5} ± {:.5}", name, mean, std);

        let mut figure = HistogramFigure::new(&format!("Rate (N = {})", args.num_beans))
            .series(name, Histogram::new(&rates, SHADE_BINS, None))
            .density(true)
            .x_range(0.0, SHADE_MAX_RATE);
        if args.title {
            figure = figure.title(&format!("Rate of finding shade ({})", name));
        }
        save(&figure, output)?;
    }
    Ok(())
}
