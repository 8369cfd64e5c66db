use crate::position::sibling_path;
use crate::video::{
    prefetch, FfmpegReader, FfmpegWriter, FrameSink, FrameSource, ImageSequence,
};
use crate::Errors;
use anyhow::{Context, Result};
use image::imageops::{grayscale, resize, FilterType};
use image::{Rgb, RgbImage};
use imageproc::contrast::equalize_histogram;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use log::{debug, info};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const PREPROCESSED_VIDEO: &str = "preprocessed-output.mp4";
pub const PERSPECTIVE_VIDEO: &str = "perspective-output.mp4";
pub const TRANSFORMED_DIR: &str = "transformed";
pub const SEQUENCE_VIDEO: &str = "video.avi";

/// Height to width ratio of a letter-size sheet in landscape
pub const LETTER_RATIO: f64 = 8.5 / 11.0;

/// Sigma matching a 5×5 OpenCV kernel with automatic sigma
pub const DEFAULT_BLUR_SIGMA: f32 = 1.1;
pub const DEFAULT_GAIN: f32 = 1.6;

/// Per-frame image operation
///
pub trait FrameFilter {
    fn apply(&self, frame: &RgbImage) -> RgbImage;
}

#[derive(Debug, Clone, Copy)]
pub struct GaussianBlur {
    pub sigma: f32,
}

impl FrameFilter for GaussianBlur {
    fn apply(&self, frame: &RgbImage) -> RgbImage {
        gaussian_blur_f32(frame, self.sigma)
    }
}

/// Multiplies every channel by `gain`, saturating at 255
///
#[derive(Debug, Clone, Copy)]
pub struct ContrastGain {
    pub gain: f32,
}

impl FrameFilter for ContrastGain {
    fn apply(&self, frame: &RgbImage) -> RgbImage {
        let mut out = frame.clone();
        for p in out.pixels_mut() {
            for c in p.0.iter_mut() {
                *c = (*c as f32 * self.gain).round().clamp(0.0, 255.0) as u8;
            }
        }
        out
    }
}

/// Histogram equalisation of the luminance.
///
/// The luminance change is added to all three channels, which keeps the chroma.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct Equalize;

impl FrameFilter for Equalize {
    fn apply(&self, frame: &RgbImage) -> RgbImage {
        let luma = grayscale(frame);
        let equalized = equalize_histogram(&luma);
        let mut out = frame.clone();
        for (x, y, p) in out.enumerate_pixels_mut() {
            let delta = equalized.get_pixel(x, y).0[0] as i16 - luma.get_pixel(x, y).0[0] as i16;
            for c in p.0.iter_mut() {
                *c = (*c as i16 + delta).clamp(0, 255) as u8;
            }
        }
        out
    }
}

/// Filters applied in insertion order
///
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn FrameFilter + Send + Sync>>,
}

impl FilterChain {
    /// Blur and contrast gain, optionally followed by equalisation
    ///
    pub fn standard(blur: bool, contrast: bool, equalize: bool) -> Self {
        let mut chain = Self::default();
        if blur {
            chain = chain.with(GaussianBlur {
                sigma: DEFAULT_BLUR_SIGMA,
            });
        }
        if contrast {
            chain = chain.with(ContrastGain { gain: DEFAULT_GAIN });
        }
        if equalize {
            chain = chain.with(Equalize);
        }
        chain
    }

    pub fn with<F: FrameFilter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FrameFilter for FilterChain {
    fn apply(&self, frame: &RgbImage) -> RgbImage {
        self.filters
            .iter()
            .fold(frame.clone(), |f, filter| filter.apply(&f))
    }
}

/// Orders four corners as top-left, bottom-left, top-right, bottom-right.
///
/// The two points with the smallest x form the left side; each side is then sorted by y.
///
pub fn order_points(points: &[(f32, f32)]) -> Result<[(f32, f32); 4]> {
    if points.len() != 4 {
        return Err(Errors::CornerCount(points.len()).into());
    }
    let by = |a: &(f32, f32), b: &(f32, f32), first_y: bool| {
        let (ka, kb) = if first_y {
            ((a.1, a.0), (b.1, b.0))
        } else {
            (*a, *b)
        };
        ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
    };

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| by(a, b, false));
    let (left, right) = sorted.split_at_mut(2);
    left.sort_by(|a, b| by(a, b, true));
    right.sort_by(|a, b| by(a, b, true));
    Ok([left[0], left[1], right[0], right[1]])
}

/// Letter-paper height for a frame `width` pixels wide
///
pub fn letter_height(width: u32) -> u32 {
    (width as f64 * LETTER_RATIO) as u32
}

/// Maps a quadrilateral region onto the whole frame
///
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCorrection {
    projection: Projection,
    resize: Option<(u32, u32)>,
}

impl PerspectiveCorrection {
    /// # Parameters
    /// * `corners` - four corners of the region, in any order;
    /// * `dimensions` - frame width and height.
    ///
    pub fn new(corners: &[(f32, f32)], dimensions: (u32, u32)) -> Result<Self> {
        let from = order_points(corners)?;
        let (w, h) = (dimensions.0 as f32, dimensions.1 as f32);
        let to = [(0.0, 0.0), (0.0, h), (w, 0.0), (w, h)];
        let projection = Projection::from_control_points(from, to).ok_or_else(|| {
            Errors::DegenerateFit(format!("corners {:?} do not span a quadrilateral", from))
        })?;
        debug!("Perspective correction {:?} -> {:?}", from, to);
        Ok(Self {
            projection,
            resize: None,
        })
    }

    /// Resizes the corrected frames
    ///
    pub fn resize(mut self, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "Output size must be positive");
        self.resize = Some((width, height));
        self
    }

    /// Resizes to letter-paper proportions keeping the frame width
    ///
    pub fn letter(self, width: u32) -> Self {
        self.resize(width, letter_height(width))
    }
}

impl FrameFilter for PerspectiveCorrection {
    fn apply(&self, frame: &RgbImage) -> RgbImage {
        let warped = warp(
            frame,
            &self.projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
        );
        match self.resize {
            Some((w, h)) if (w, h) != warped.dimensions() => {
                resize(&warped, w, h, FilterType::Triangle)
            }
            _ => warped,
        }
    }
}

/// Runs every frame of `source` through `filter` into `sink`.
///
/// Returns the number of frames written.
///
pub fn filter_stream<S, K, F>(source: &mut S, sink: &mut K, filter: &F) -> Result<usize>
where
    S: FrameSource + ?Sized,
    K: FrameSink + ?Sized,
    F: FrameFilter + ?Sized,
{
    let total = source.frame_count();
    let mut n = 0;
    while let Some(frame) = source.next_frame()? {
        sink.write_frame(&filter.apply(&frame))?;
        n += 1;
        match total {
            Some(t) => debug!("Processed frame {} out of {}", n, t),
            None => debug!("Processed frame {}", n),
        }
    }
    sink.finish()?;
    Ok(n)
}

/// Filters a video into `preprocessed-output.mp4` next to it
///
pub fn preprocess_video<P: AsRef<Path>>(path: P, chain: &FilterChain) -> Result<PathBuf> {
    let reader = FfmpegReader::open(path.as_ref())?;
    let (dims, fps) = (reader.dimensions(), reader.fps());
    let out = sibling_path(path.as_ref(), PREPROCESSED_VIDEO);
    let mut writer = FfmpegWriter::create(&out, dims, fps)?;
    let n = filter_stream(&mut prefetch(Box::new(reader), 8), &mut writer, chain)?;
    info!("Preprocessed {} frames into '{}'.", n, out.display());
    Ok(out)
}

/// Filters the frames of an image sequence into `video.avi` next to the frames directory
///
pub fn preprocess_sequence<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
    chain: &FilterChain,
    fps: f64,
) -> Result<PathBuf> {
    let mut sequence = ImageSequence::open(dir.as_ref(), prefix, fps)?;
    info!("Found {} frames", sequence.files().len());
    let out = sibling_path(dir.as_ref(), SEQUENCE_VIDEO);
    let mut writer = FfmpegWriter::create(&out, sequence.dimensions(), fps)?;
    let n = filter_stream(&mut sequence, &mut writer, chain)?;
    info!("Preprocessed {} frames into '{}'.", n, out.display());
    Ok(out)
}

/// Corrects the perspective of a video into `perspective-output.mp4` next to it.
///
/// Frames keep the input size.
///
pub fn correct_video<P: AsRef<Path>>(path: P, corners: &[(f32, f32)]) -> Result<PathBuf> {
    let reader = FfmpegReader::open(path.as_ref())?;
    let (dims, fps) = (reader.dimensions(), reader.fps());
    let correction = PerspectiveCorrection::new(corners, dims)?;
    let out = sibling_path(path.as_ref(), PERSPECTIVE_VIDEO);
    let mut writer = FfmpegWriter::create(&out, dims, fps)?;
    let n = filter_stream(&mut prefetch(Box::new(reader), 8), &mut writer, &correction)?;
    info!("Transformed {} frames into '{}'.", n, out.display());
    Ok(out)
}

/// Corrects the perspective of an image sequence into its `transformed/` sub-directory.
///
/// Output images keep their file names and are resized to letter-paper proportions.
///
pub fn correct_sequence<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
    corners: &[(f32, f32)],
) -> Result<PathBuf> {
    let sequence = ImageSequence::open(dir.as_ref(), prefix, 1.0)?;
    let dims = sequence.dimensions();
    let correction = PerspectiveCorrection::new(corners, dims)?.letter(dims.0);
    let out = dir.as_ref().join(TRANSFORMED_DIR);
    fs::create_dir_all(&out)?;

    sequence.files().par_iter().try_for_each(|path| -> Result<()> {
        let frame = image::open(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?
            .to_rgb8();
        let name = path
            .file_name()
            .ok_or_else(|| Errors::MissingPath(path.display().to_string()))?;
        correction.apply(&frame).save(out.join(name))?;
        Ok(())
    })?;

    info!(
        "Transformed {} images into '{}'.",
        sequence.files().len(),
        out.display()
    );
    Ok(out)
}

/// Parses `x,y` corner lists such as `10,12 630,8 8,470 633,475`
///
pub fn parse_corners(s: &str) -> Result<Vec<(f32, f32)>> {
    s.split_whitespace()
        .map(|pair| -> Result<(f32, f32)> {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| anyhow::anyhow!("expected 'x,y', got '{}'", pair))?;
            Ok((x.trim().parse()?, y.trim().parse()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::preprocess::{
        correct_sequence, letter_height, order_points, parse_corners, ContrastGain, Equalize,
        FilterChain, FrameFilter, GaussianBlur, PerspectiveCorrection, TRANSFORMED_DIR,
    };
    use crate::test_stuff::{blank_frame, draw_disc};
    use crate::video::{FrameSink, ImageSequenceWriter};
    use image::Rgb;

    #[test]
    fn corner_order() {
        let p = order_points(&[(100.0, 90.0), (0.0, 0.0), (98.0, 1.0), (2.0, 95.0)]).unwrap();
        assert_eq!(p, [(0.0, 0.0), (2.0, 95.0), (98.0, 1.0), (100.0, 90.0)]);
        assert!(order_points(&[(0.0, 0.0); 3]).is_err());
    }

    #[test]
    fn corners_from_text() {
        let c = parse_corners("10,12 630,8  8,470 633,475").unwrap();
        assert_eq!(c.len(), 4);
        assert_eq!(c[3], (633.0, 475.0));
        assert!(parse_corners("10;12").is_err());
    }

    #[test]
    fn gain_saturates() {
        let f = ContrastGain { gain: 1.6 }.apply(&blank_frame(2, 2, 100));
        assert_eq!(f.get_pixel(0, 0), &Rgb([160, 160, 160]));
        let f = ContrastGain { gain: 1.6 }.apply(&blank_frame(2, 2, 200));
        assert_eq!(f.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }

    #[test]
    fn blur_spreads() {
        let mut f = blank_frame(21, 21, 0);
        f.put_pixel(10, 10, Rgb([255, 255, 255]));
        let b = GaussianBlur { sigma: 1.1 }.apply(&f);
        assert!(b.get_pixel(10, 10).0[0] < 255);
        assert!(b.get_pixel(11, 10).0[0] > 0);
        assert_eq!(b.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn equalize_stretches() {
        let mut f = blank_frame(10, 10, 100);
        for x in 0..5 {
            for y in 0..10 {
                f.put_pixel(x, y, Rgb([110, 110, 110]));
            }
        }
        let e = Equalize.apply(&f);
        let (dark, light) = (e.get_pixel(9, 0).0[0], e.get_pixel(0, 0).0[0]);
        assert_eq!(light, 255);
        assert!(light - dark > 10);
    }

    #[test]
    fn chain_order() {
        let chain = FilterChain::standard(false, true, false).with(ContrastGain { gain: 0.5 });
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.apply(&blank_frame(1, 1, 100)).get_pixel(0, 0).0[0], 80);
        assert!(FilterChain::standard(false, false, false).is_empty());
    }

    #[test]
    fn identity_perspective() {
        let mut f = blank_frame(40, 30, 0);
        draw_disc(&mut f, (20, 15), 4, 255);
        let c = PerspectiveCorrection::new(
            &[(40.0, 30.0), (0.0, 0.0), (0.0, 30.0), (40.0, 0.0)],
            (40, 30),
        )
        .unwrap();
        let out = c.apply(&f);
        assert_eq!(out.dimensions(), (40, 30));
        assert!(out.get_pixel(20, 15).0[0] > 200);
        assert!(out.get_pixel(5, 5).0[0] < 50);
    }

    #[test]
    fn zoomed_perspective() {
        // left half of the frame stretched to the whole width
        let mut f = blank_frame(40, 20, 0);
        draw_disc(&mut f, (10, 10), 2, 255);
        let c = PerspectiveCorrection::new(
            &[(0.0, 0.0), (0.0, 20.0), (20.0, 0.0), (20.0, 20.0)],
            (40, 20),
        )
        .unwrap();
        let out = c.apply(&f);
        assert!(out.get_pixel(20, 10).0[0] > 200);
        assert!(out.get_pixel(10, 10).0[0] < 50);
    }

    #[test]
    fn sequence_into_transformed() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = ImageSequenceWriter::create(dir.path(), "Image").unwrap();
        for _ in 0..3 {
            w.write_frame(&blank_frame(44, 30, 90)).unwrap();
        }
        w.finish().unwrap();

        let out = correct_sequence(
            dir.path(),
            "Image",
            &[(0.0, 0.0), (0.0, 30.0), (44.0, 0.0), (44.0, 30.0)],
        )
        .unwrap();
        assert_eq!(out, dir.path().join(TRANSFORMED_DIR));
        let img = image::open(out.join("Image00002.png")).unwrap();
        assert_eq!((img.width(), img.height()), (44, letter_height(44)));
        assert_eq!(letter_height(44), 34);
    }
}
