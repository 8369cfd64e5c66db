use anyhow::Result;
use beantrack::pipeline::{
    angle_histogram, dists_by_set, msd_by_set, DistsOptions, MsdScale, DISPLACEMENT_BINS,
};
use beantrack::plot::histogram::HistogramFigure;
use beantrack::plot::msd::MsdFigure;
use beantrack::plot::rose::RoseFigure;
use beantrack::plot::save;
use beantrack::plot::scatter::{BarFigure, ScatterFigure};
use beantrack::plot::series::ActivityFigure;
use beantrack::position::manifest::Manifest;
use beantrack::position::{object_indices, validate_path, PositionData};
use beantrack::stats::activity::activity as object_activity;
use beantrack::stats::angles::{law_of_cosines_angles, reorient};
use beantrack::stats::compare::{
    compare_groups, group_values, read_diffusion_file, size_regression, COLD_DIFFUSIONS,
    HOT_DIFFUSIONS,
};
use beantrack::stats::delay::{
    append_jump_times, delays, jump_times, jumps as find_jumps, min_delay_frames, rest_runs,
    DEFAULT_MIN_DELAY, DEFAULT_THRESHOLD, JUMP_TIMES_FILE,
};
use beantrack::stats::displacement::displacements;
use beantrack::stats::msd::{diffusion_constant, msd as object_msd};
use beantrack::utils::histogram::Histogram;
use clap::Args;
use log::{debug, info};
use std::path::{Path, PathBuf};

fn load(path: &Path) -> Result<PositionData> {
    info!("Loading position data...");
    let data = PositionData::load(path)?;
    data.validate()?;
    Ok(data)
}

/// Histogram with as many bins as the largest value, scaled by `factor`
///
fn unit_bins(values: &[f64], factor: f64) -> Histogram {
    let max = values.iter().copied().fold(0.0, f64::max);
    Histogram::new(values, (max * factor) as usize, None)
}

#[derive(Args, Debug)]
pub struct ActivityArgs {
    /// Position data file
    pub path: PathBuf,

    /// Interval between frame activity calculation
    #[arg(short, long, default_value_t = 1)]
    pub interval: usize,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure")]
    pub output: PathBuf,
}

pub fn activity(args: ActivityArgs) -> Result<()> {
    let data = load(&args.path)?;
    info!("Calculating activity...");
    let figure = data
        .objects
        .iter()
        .enumerate()
        .fold(ActivityFigure::new(args.interval), |f, (i, o)| {
            f.series(&format!("Object {}", i), object_activity(&o.x, &o.y, args.interval))
        });
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct DelayArgs {
    /// Position data file
    pub path: PathBuf,

    /// Threshold of activity
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Comma-separated indices of the objects, all by default
    #[arg(short = 'O', long)]
    pub objects: Option<String>,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure")]
    pub output: PathBuf,
}

pub fn delay(args: DelayArgs) -> Result<()> {
    let data = load(&args.path)?;
    let indices = object_indices(args.objects.as_deref(), data.objects.len())?;

    info!("Calculating delays...");
    let mut figure = HistogramFigure::new("Delay (frames)").title("Delay Distribution Histogram");
    for i in indices {
        let o = data.object(i)?;
        let runs = rest_runs(&o.x, &o.y, args.threshold)
            .into_iter()
            .map(|d| d as f64)
            .collect::<Vec<_>>();
        debug!("Object {}: {} delays", i, runs.len());
        figure = figure.series(&format!("Object {}", i), unit_bins(&runs, 1.0));
    }
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct DistsArgs {
    /// Position data file
    pub path: PathBuf,

    /// Threshold of activity
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Comma-separated indices of the objects, all by default
    #[arg(short = 'O', long)]
    pub objects: Option<String>,

    /// Multiplier of the number of delay bins, one bin per frame by default
    #[arg(short, long, default_value_t = 1.0)]
    pub bin_factor: f64,

    /// Delay figure file (.png or .svg)
    #[arg(long, default_value = "figure-delay")]
    pub delay_output: PathBuf,

    /// Displacement figure file (.png or .svg)
    #[arg(long, default_value = "figure-displacement")]
    pub displacement_output: PathBuf,
}

pub fn dists(args: DistsArgs) -> Result<()> {
    let data = load(&args.path)?;
    let indices = object_indices(args.objects.as_deref(), data.objects.len())?;
    let units = data.canvas.units.clone();

    info!("Calculating delays...");
    let mut delay_figure = HistogramFigure::new("Delay (frames)")
        .title(&format!("Motion threshold: {} {}", args.threshold, units));
    let mut disp_figure = HistogramFigure::new(&format!("Displacement ({})", units))
        .title("Displacement Distribution Histogram");
    for i in indices {
        let o = data.object(i)?;
        let label = format!("Object {}", i);
        let d = delays(&o.x, &o.y, args.threshold)
            .into_iter()
            .map(|d| d as f64)
            .collect::<Vec<_>>();
        delay_figure = delay_figure.series(&label, unit_bins(&d, args.bin_factor));
        disp_figure = disp_figure.series(
            &label,
            Histogram::new(&displacements(&o.x, &o.y), DISPLACEMENT_BINS, None),
        );
    }

    info!("Setting up plots...");
    save(&delay_figure, &args.delay_output)?;
    save(&disp_figure, &args.displacement_output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct DistsManifestArgs {
    /// Manifest file
    pub path: PathBuf,

    /// Threshold of activity
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Minimal rest in seconds before a jump is counted
    #[arg(short, long, default_value_t = DEFAULT_MIN_DELAY)]
    pub min_delay: f64,

    /// Save delay and displacement figures of every set in separate folders
    #[arg(short, long)]
    pub gen_individual: bool,

    /// Use the published distributions instead of fitting the data
    #[arg(long)]
    pub hardcoded: bool,

    /// Delay figure file (.png or .svg)
    #[arg(long, default_value = "figure-delay")]
    pub delay_output: PathBuf,

    /// Displacement figure file (.png or .svg)
    #[arg(long, default_value = "figure-displacement")]
    pub displacement_output: PathBuf,

    /// Rose diagram of the turn angles between consecutive jumps
    #[arg(long)]
    pub angles_output: Option<PathBuf>,
}

pub fn dists_manifest(args: DistsManifestArgs) -> Result<()> {
    let manifest = Manifest::load(&args.path)?;
    let opts = DistsOptions {
        threshold: args.threshold,
        min_delay: args.min_delay,
        hardcoded: args.hardcoded,
    };
    let report = dists_by_set(&manifest, &opts)?;
    info!(
        "{} jumps in {} sets, {} delays fitted",
        report.total.delays.len(),
        report.sets.len(),
        report.fit_delays.len()
    );

    if args.gen_individual {
        info!("Generating individual plots...");
        report.save_individual(".")?;
    }
    save(&report.delay_figure(), &args.delay_output)?;
    save(&report.displacement_figure(), &args.displacement_output)?;
    if let Some(path) = &args.angles_output {
        let angles = report
            .total
            .turn_angles
            .iter()
            .map(|t| reorient(*t))
            .collect::<Vec<_>>();
        save(
            &RoseFigure::default().series("turns", angle_histogram(&angles)),
            path,
        )?;
    }
    Ok(())
}

#[derive(Args, Debug)]
pub struct AnglesArgs {
    /// Position data files; object `i` of every file is pooled
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Comma-separated indices of the objects, all by default
    #[arg(short = 'O', long)]
    pub objects: Option<String>,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure-angular-disp")]
    pub output: PathBuf,
}

pub fn angles(args: AnglesArgs) -> Result<()> {
    let mut pooled: Vec<Vec<f64>> = Vec::new();
    for path in &args.paths {
        let data = load(path)?;
        let indices = object_indices(args.objects.as_deref(), data.objects.len())?;
        info!("Calculating angular displacements...");
        for (slot, i) in indices.into_iter().enumerate() {
            let o = data.object(i)?;
            let angles = law_of_cosines_angles(&o.x, &o.y);
            match pooled.get_mut(slot) {
                Some(p) => p.extend(angles),
                None => pooled.push(angles),
            }
        }
    }

    let figure = pooled
        .iter()
        .enumerate()
        .fold(RoseFigure::default(), |f, (i, angles)| {
            let reoriented = angles.iter().map(|t| reorient(*t)).collect::<Vec<_>>();
            f.series(&format!("Object {}", i), angle_histogram(&reoriented))
        })
        .legend(pooled.len() > 1);
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct MsdArgs {
    /// Position data file
    pub path: PathBuf,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure-msd")]
    pub output: PathBuf,
}

pub fn msd(args: MsdArgs) -> Result<()> {
    let data = load(&args.path)?;
    info!("Calculating MSD data...");
    let mut figure = MsdFigure::new(&data.canvas.units, true);
    for (i, o) in data.objects.iter().enumerate() {
        let curve = object_msd(&o.x, &o.y);
        let fit = curve.log_fit()?;
        info!("Object {} slope: {:.2}", i, fit.slope);
        figure = figure.series(&format!("Object {}", i), curve, fit);
    }
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct MsdManifestArgs {
    /// Manifest file
    pub path: PathBuf,

    /// Object taken from every file
    #[arg(long, default_value_t = 0)]
    pub object: usize,

    /// Fit MSD against tau instead of their logarithms
    #[arg(long)]
    pub linear: bool,

    /// Disable the scatter of the MSD points
    #[arg(long)]
    pub no_scatter: bool,

    /// Disable the legend
    #[arg(long)]
    pub no_legend: bool,

    /// Units of the positions, taken from the position data by default
    #[arg(long)]
    pub units: Option<String>,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure-msd")]
    pub output: PathBuf,
}

pub fn msd_manifest(args: MsdManifestArgs) -> Result<()> {
    let manifest = Manifest::load(&args.path)?;
    let scale = if args.linear {
        MsdScale::Linear
    } else {
        MsdScale::Log
    };
    let report = msd_by_set(&manifest, args.object, scale)?;
    let units = args.units.clone().unwrap_or_else(|| report.units.clone());

    let mut figure = MsdFigure::new(&units, scale == MsdScale::Log)
        .scatter(!args.no_scatter)
        .legend(!args.no_legend);
    for set in report.sets {
        if scale == MsdScale::Linear {
            info!(
                "Set '{}': D = {:.5} {}²/s",
                set.info.name,
                diffusion_constant(set.fit.slope),
                units
            );
        }
        figure = figure.series(&set.info.name, set.curve, set.fit);
    }
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct JumpsArgs {
    /// Position data file, the first object is used
    pub path: PathBuf,

    /// Video second of the first frame
    #[arg(long, default_value_t = 0.0)]
    pub offset: f64,

    /// Threshold of activity
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Minimal rest in seconds before a jump is counted
    #[arg(short, long, default_value_t = DEFAULT_MIN_DELAY)]
    pub min_delay: f64,

    /// CSV file the rows are appended to
    #[arg(short, long, default_value = JUMP_TIMES_FILE)]
    pub output: PathBuf,
}

pub fn jumps(args: JumpsArgs) -> Result<()> {
    let data = load(&args.path)?;
    let o = data.object(0)?;
    let fps = data.canvas.fps;
    let js = find_jumps(
        &o.x,
        &o.y,
        args.threshold,
        min_delay_frames(args.min_delay, fps),
    );
    let rows = jump_times(&js, fps, args.offset);
    append_jump_times(&args.output, &rows)?;
    info!("Appended {} jumps to '{}'", rows.len(), args.output.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct DiffusionArgs {
    /// Text file of `dataset:msd-slope:size` lines
    pub path: PathBuf,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure-msd-size")]
    pub output: PathBuf,
}

pub fn diffusion(args: DiffusionArgs) -> Result<()> {
    validate_path(&args.path, "txt")?;
    info!("Reading MSD slopes and bean sizes from '{}'...", args.path.display());
    let records = read_diffusion_file(&args.path)?;
    info!("Read {} datasets.", records.len());

    let regression = size_regression(&records)?;
    info!(
        "D = {:.5} * size + {:.5} (r = {:.3}, p = {:.4}, stderr = {:.5})",
        regression.fit.slope,
        regression.fit.intercept,
        regression.r,
        regression.p,
        regression.stderr
    );
    let points = records
        .iter()
        .map(|r| (r.size, r.diffusion()))
        .collect::<Vec<_>>();
    let figure = ScatterFigure::new(
        "Bean size (mm)",
        "Slope of mean-squared displacement",
        points,
    )
    .fit(regression.fit);
    save(&figure, &args.output)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Slope file with a group column; the published cold and hot values by default
    pub path: Option<PathBuf>,

    /// First group name in the slope file
    #[arg(long, default_value = "cold")]
    pub first: String,

    /// Second group name in the slope file
    #[arg(long, default_value = "hot")]
    pub second: String,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "diff-compare-fig")]
    pub output: PathBuf,
}

pub fn compare(args: CompareArgs) -> Result<()> {
    let (first, second) = match &args.path {
        Some(path) => {
            let records = read_diffusion_file(path)?;
            (
                group_values(&records, &args.first),
                group_values(&records, &args.second),
            )
        }
        None => (COLD_DIFFUSIONS.to_vec(), HOT_DIFFUSIONS.to_vec()),
    };
    let comparison = compare_groups(
        (args.first.as_str(), first.as_slice()),
        (args.second.as_str(), second.as_slice()),
    )?;
    for g in [&comparison.first, &comparison.second] {
        info!("{}: {} +- {} (n = {})", g.name, g.mean, g.std, g.n);
    }
    info!(
        "t = {:.4}, p = {:.4}",
        comparison.ttest.statistic, comparison.ttest.p_value
    );

    let figure = BarFigure::new("D (cm²/s)", vec![comparison.first, comparison.second]);
    save(&figure, &args.output)?;
    Ok(())
}
