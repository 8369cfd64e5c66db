use anyhow::Result;
use beantrack::plot::save;
use beantrack::plot::series::TrajectoryFigure;
use beantrack::position::{object_indices, sibling_path, PositionData};
use clap::Args;
use log::info;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TrimArgs {
    /// Position data file
    pub path: PathBuf,

    /// First frame kept, 1-based
    #[arg(short, long)]
    pub seek: Option<usize>,

    /// Frame where the trimmed data stops, not included
    #[arg(short, long)]
    pub to: Option<usize>,
}

pub fn trim(args: TrimArgs) -> Result<()> {
    let data = PositionData::load(&args.path)?;
    let (trimmed, seek, to) = data.trim(args.seek, args.to)?;
    let out = sibling_path(&args.path, &format!("pos_data_{}-{}.json", seek, to));
    trimmed.save(&out)?;
    info!(
        "Saved {} frames of {} objects to '{}'",
        trimmed.frame_count(),
        trimmed.objects.len(),
        out.display()
    );
    Ok(())
}

#[derive(Args, Debug)]
pub struct AppendArgs {
    /// The first file to be appended
    pub file1: PathBuf,

    /// The second file to be appended
    pub file2: PathBuf,
}

pub fn append(args: AppendArgs) -> Result<()> {
    let first = PositionData::load(&args.file1)?;
    let second = PositionData::load(&args.file2)?;
    let appended = first.append(&second)?;
    let out = sibling_path(&args.file1, "pos_data_appended.json");
    appended.save(&out)?;
    info!("Saved appended position data to '{}'", out.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Position data file, overwritten with the selection
    pub path: PathBuf,

    /// Comma-separated indices of the objects to keep
    #[arg(short = 'O', long, required = true)]
    pub objects: String,
}

pub fn select(args: SelectArgs) -> Result<()> {
    let data = PositionData::load(&args.path)?;
    let indices = object_indices(Some(&args.objects), data.objects.len())?;
    let selected = data.select(&indices)?;
    selected.save(&args.path)?;
    info!(
        "Kept objects {:?} in '{}'",
        indices,
        args.path.display()
    );
    Ok(())
}

#[derive(Args, Debug)]
pub struct PositionsArgs {
    /// Position data file
    pub path: PathBuf,

    /// Last frame drawn, 1-based; every frame by default
    #[arg(short, long)]
    pub frame: Option<usize>,

    /// Figure file (.png or .svg)
    #[arg(short, long, default_value = "figure-positions")]
    pub output: PathBuf,
}

pub fn positions(args: PositionsArgs) -> Result<()> {
    let data = PositionData::load(&args.path)?;
    data.validate()?;
    info!(
        "Plotting {} objects over {} frames...",
        data.objects.len(),
        data.frame_count()
    );
    let mut figure = TrajectoryFigure::new(data);
    if let Some(f) = args.frame {
        figure = figure.until(f);
    }
    save(&figure, &args.output)?;
    Ok(())
}
