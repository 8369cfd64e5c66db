use anyhow::Result;
use beantrack::position::{sibling_path, Canvas};
use beantrack::preprocess::{
    correct_sequence, correct_video, parse_corners, preprocess_sequence, preprocess_video,
    ContrastGain, Equalize, FilterChain, GaussianBlur, DEFAULT_BLUR_SIGMA, DEFAULT_GAIN,
};
use beantrack::tracking::assignment::AssignmentKind;
use beantrack::tracking::contours::{detect, DetectionOptions};
use beantrack::tracking::options::TrackerOptions;
use beantrack::tracking::tracker::{annotate, track_source, FrameReport};
use beantrack::utils::frames::DEFAULT_FRAME_PREFIX;
use beantrack::video::{
    check_video_path, open_source, prefetch, FrameSink, FrameSource, ImageSequenceWriter,
};
use beantrack::Errors;
use clap::Args;
use log::{debug, info};
use std::path::{Path, PathBuf};

const PREFETCH_FRAMES: usize = 8;
const DEFAULT_POSITIONS_FILE: &str = "pos_data.json";

/// Frame source shared by the tracking commands
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Video (.avi, .mp4) or directory of frames
    pub path: PathBuf,

    /// Prefix of the frame file names
    #[arg(long = "image-prefix", default_value = DEFAULT_FRAME_PREFIX)]
    pub prefix: String,

    /// Frame rate of an image sequence
    #[arg(long, default_value_t = 1.0)]
    pub fps: f64,
}

impl SourceArgs {
    fn validate(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(Errors::MissingPath(self.path.display().to_string()).into());
        }
        if !self.path.is_dir() {
            check_video_path(&self.path)?;
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct CentroidsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Gray level above which a pixel belongs to a blob
    #[arg(short, long, default_value_t = 127)]
    pub threshold: u8,

    /// Ignore dark blobs enclosed by bright areas
    #[arg(long)]
    pub outer_only: bool,

    /// Directory receiving the annotated frames
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn centroids(args: CentroidsArgs) -> Result<()> {
    args.source.validate()?;
    info!("Loading video...");
    let source = open_source(&args.source.path, &args.source.prefix, args.source.fps)?;
    let total = source.frame_count();
    let mut frames = prefetch(source, PREFETCH_FRAMES);

    let opts = DetectionOptions {
        threshold: args.threshold,
        border_margin: 0.0,
        outer_only: args.outer_only,
    };
    let mut writer = match &args.output {
        Some(dir) => Some(ImageSequenceWriter::create(dir, "centroids")?),
        None => None,
    };

    let mut number = 0;
    let mut found = 0;
    while let Some(frame) = frames.next_frame()? {
        number += 1;
        let centroids = detect(&frame, &opts);
        found += centroids.len();
        match total {
            Some(t) => debug!("Frame {} of {}: {} centroids", number, t, centroids.len()),
            None => debug!("Frame {}: {} centroids", number, centroids.len()),
        }
        if let Some(w) = writer.as_mut() {
            let report = FrameReport {
                frame: number,
                detected: centroids.clone(),
                merged: centroids,
                positions: Vec::new(),
            };
            w.write_frame(&annotate(&frame, &report))?;
        }
    }
    if let Some(w) = writer.as_mut() {
        w.finish()?;
    }
    info!("Video stream ended...");
    info!(
        "{} centroids in {} frames ({:.2} per frame)",
        found,
        number,
        found as f64 / number.max(1) as f64
    );
    Ok(())
}

#[derive(Args, Debug)]
pub struct TrackArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Gray level above which a pixel belongs to a blob
    #[arg(short, long, default_value_t = 127)]
    pub threshold: u8,

    /// Fraction of the frame along the edges where centroids are ignored
    #[arg(long, default_value_t = 0.01)]
    pub border_margin: f32,

    /// Ignore dark blobs enclosed by bright areas
    #[arg(long)]
    pub outer_only: bool,

    /// Radius, as a fraction of the frame width, under which centroids are averaged
    #[arg(long, default_value_t = 0.05)]
    pub merge_radius: f32,

    /// Do not average nearby centroids
    #[arg(long)]
    pub no_merge: bool,

    /// Number of objects the first frame must contain
    #[arg(short = 'n', long)]
    pub objects: Option<usize>,

    /// Optimal assignment instead of the greedy nearest-neighbour matching
    #[arg(long)]
    pub optimal: bool,

    /// Largest distance in pixels an object may travel per source frame
    #[arg(long)]
    pub max_step: Option<f32>,

    /// Process every n-th frame only
    #[arg(long, default_value_t = 1)]
    pub stride: usize,

    /// Width of the recorded area, positions stay in pixels without it
    #[arg(long, requires = "canvas_height")]
    pub canvas_width: Option<f64>,

    /// Height of the recorded area
    #[arg(long, requires = "canvas_width")]
    pub canvas_height: Option<f64>,

    /// Units of the canvas dimensions
    #[arg(long, default_value = "cm")]
    pub units: String,

    /// Directory receiving the annotated frames
    #[arg(long)]
    pub debug_frames: Option<PathBuf>,

    /// Position data file, `pos_data.json` next to the input by default
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl TrackArgs {
    fn options(&self) -> TrackerOptions {
        let mut opts = TrackerOptions::default()
            .threshold(self.threshold)
            .border_margin(self.border_margin)
            .outer_only(self.outer_only)
            .merge_radius(self.merge_radius)
            .stride(self.stride);
        if self.no_merge {
            opts = opts.disable_merge();
        }
        if let Some(n) = self.objects {
            opts = opts.expected_objects(n);
        }
        if self.optimal {
            opts = opts.assignment(AssignmentKind::Optimal);
        }
        if let Some(d) = self.max_step {
            opts = opts.max_step(d);
        }
        opts
    }

    fn canvas(&self) -> Option<Canvas> {
        match (self.canvas_width, self.canvas_height) {
            (Some(w), Some(h)) => Some(Canvas::new(w, h, &self.units, self.source.fps)),
            _ => None,
        }
    }
}

pub fn track(args: TrackArgs) -> Result<()> {
    args.source.validate()?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| sibling_path(&args.source.path, DEFAULT_POSITIONS_FILE));

    info!("Loading video...");
    let source = open_source(&args.source.path, &args.source.prefix, args.source.fps)?;
    let mut frames = prefetch(source, PREFETCH_FRAMES);
    let mut writer = match &args.debug_frames {
        Some(dir) => Some(ImageSequenceWriter::create(dir, "tracked")?),
        None => None,
    };

    let data = track_source(&mut frames, args.options(), args.canvas(), |frame, report| {
        match writer.as_mut() {
            Some(w) => w.write_frame(&annotate(frame, report)),
            None => Ok(()),
        }
    })?;
    if let Some(w) = writer.as_mut() {
        w.finish()?;
    }

    data.save(&output)?;
    info!("Saved position data to '{}'", output.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Disable the gaussian blur
    #[arg(long)]
    pub no_blur: bool,

    /// Disable the contrast gain
    #[arg(long)]
    pub no_contrast: bool,

    /// Equalize the histogram of every frame
    #[arg(long)]
    pub equalize: bool,

    /// Standard deviation of the gaussian blur
    #[arg(long, default_value_t = DEFAULT_BLUR_SIGMA)]
    pub sigma: f32,

    /// Contrast multiplier
    #[arg(long, default_value_t = DEFAULT_GAIN)]
    pub gain: f32,
}

impl PreprocessArgs {
    fn chain(&self) -> FilterChain {
        let mut chain = FilterChain::default();
        if !self.no_blur {
            chain = chain.with(GaussianBlur { sigma: self.sigma });
        }
        if !self.no_contrast {
            chain = chain.with(ContrastGain { gain: self.gain });
        }
        if self.equalize {
            chain = chain.with(Equalize);
        }
        chain
    }
}

pub fn preprocess(args: PreprocessArgs) -> Result<()> {
    args.source.validate()?;
    info!("Starting preprocessing...");
    let chain = args.chain();
    debug!("{} filters", chain.len());
    let out = if args.source.path.is_dir() {
        preprocess_sequence(&args.source.path, &args.source.prefix, &chain, args.source.fps)?
    } else {
        preprocess_video(&args.source.path, &chain)?
    };
    info!("Finished writing '{}'", out.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct PerspectiveArgs {
    /// Video (.avi, .mp4) or directory of frames
    pub path: PathBuf,

    /// Four corners of the sheet in pixels, e.g. "10,12 630,8 8,470 633,475"
    #[arg(short, long)]
    pub corners: String,

    /// Prefix of the frame file names
    #[arg(long = "image-prefix", default_value = DEFAULT_FRAME_PREFIX)]
    pub prefix: String,
}

pub fn perspective(args: PerspectiveArgs) -> Result<()> {
    let corners = parse_corners(&args.corners)?;
    let path: &Path = &args.path;
    if !path.exists() {
        return Err(Errors::MissingPath(path.display().to_string()).into());
    }
    let out = if path.is_dir() {
        correct_sequence(path, &args.prefix, &corners)?
    } else {
        check_video_path(path)?;
        correct_video(path, &corners)?
    };
    info!("Finished writing '{}'", out.display());
    Ok(())
}
