use crate::utils::frames::{is_image_file, strip_frame_number};
use crate::Errors;
use anyhow::{Context, Result};
use crossbeam::channel::{bounded, Receiver};
use image::RgbImage;
use log::{debug, info, warn};
use std::fs;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

/// Sequential source of RGB frames
///
pub trait FrameSource {
    /// The next frame, `None` at the end of the stream
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
    fn fps(&self) -> f64;
    fn dimensions(&self) -> (u32, u32);
    /// Total number of frames when the container reports it
    fn frame_count(&self) -> Option<usize>;
}

/// Sequential consumer of RGB frames
///
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
    /// Flushes and closes the output
    fn finish(&mut self) -> Result<()>;
}

/// Video containers accepted by the ffmpeg reader and writer
///
pub const VIDEO_EXTENSIONS: [&str; 2] = ["avi", "mp4"];

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Directory of numbered image files played back as a video
///
pub struct ImageSequence {
    files: Vec<PathBuf>,
    position: usize,
    fps: f64,
    dimensions: (u32, u32),
}

impl ImageSequence {
    /// Opens the images of `dir` ordered by the number following `prefix` in their names.
    ///
    /// Files whose names do not carry a frame number are skipped.
    ///
    pub fn open<P: AsRef<Path>>(dir: P, prefix: &str, fps: f64) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Errors::NotADirectory(dir.display().to_string()).into());
        }

        let mut numbered = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !is_image_file(&path) {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match strip_frame_number(prefix, &name) {
                Some(n) => numbered.push((n, path)),
                None => warn!("Skipping '{}': no frame number", name),
            }
        }
        numbered.sort();

        let files = numbered.into_iter().map(|(_, p)| p).collect::<Vec<_>>();
        let first = files
            .first()
            .ok_or_else(|| Errors::NoFrames(dir.display().to_string()))?;
        let dimensions = image::image_dimensions(first)?;
        debug!("Image sequence '{}': {} frames", dir.display(), files.len());

        Ok(Self {
            files,
            position: 0,
            fps,
            dimensions,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;
        let frame = image::open(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?
            .to_rgb8();
        Ok(Some(frame))
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.files.len())
    }
}

/// Writes frames as numbered PNG files
///
pub struct ImageSequenceWriter {
    dir: PathBuf,
    prefix: String,
    written: usize,
}

impl ImageSequenceWriter {
    pub fn create<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
            written: 0,
        })
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Writes `frame` under an explicit file name inside the output directory
    ///
    pub fn write_named(&mut self, name: &str, frame: &RgbImage) -> Result<()> {
        frame.save(self.dir.join(name))?;
        self.written += 1;
        Ok(())
    }
}

impl FrameSink for ImageSequenceWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let name = format!("{}{:05}.png", self.prefix, self.written + 1);
        self.write_named(&name, frame)
    }

    fn finish(&mut self) -> Result<()> {
        info!("Wrote {} frames to '{}'", self.written, self.dir.display());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StreamInfo {
    width: u32,
    height: u32,
    fps: f64,
    frames: Option<usize>,
}

/// Parses ffmpeg rationals like `30000/1001`
///
pub fn parse_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((n, d)) => {
            let (n, d) = (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?);
            (d != 0.0).then(|| n / d)
        }
        None => rate.trim().parse().ok(),
    }
}

fn parse_probe(json: &str) -> Result<StreamInfo> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let stream = value["streams"]
        .get(0)
        .ok_or_else(|| Errors::Decode("no video stream".into()))?;
    let dim = |key: &str| {
        stream[key]
            .as_u64()
            .map(|v| v as u32)
            .ok_or_else(|| Errors::Decode(format!("missing {}", key)))
    };
    let fps = stream["r_frame_rate"]
        .as_str()
        .and_then(parse_rate)
        .or_else(|| stream["avg_frame_rate"].as_str().and_then(parse_rate))
        .ok_or_else(|| Errors::Decode("missing frame rate".into()))?;
    let frames = stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse::<usize>().ok());

    Ok(StreamInfo {
        width: dim("width")?,
        height: dim("height")?,
        fps,
        frames,
    })
}

fn probe(path: &Path) -> Result<StreamInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .context("Failed to run ffprobe")?;
    if !output.status.success() {
        return Err(Errors::Decode(String::from_utf8_lossy(&output.stderr).to_string()).into());
    }
    parse_probe(&String::from_utf8_lossy(&output.stdout))
}

/// Decodes a video file through an `ffmpeg` child process emitting raw RGB frames
///
pub struct FfmpegReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: StreamInfo,
}

impl FfmpegReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        check_video_path(path)?;

        let info = probe(path)?;
        debug!("Video '{}': {:?}", path.display(), info);

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .context("Failed to run ffmpeg")?;
        Self::from_child(child, info)
    }

    fn from_child(mut child: Child, info: StreamInfo) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Errors::Decode("ffmpeg stdout is not available".into()))?;

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            info,
        })
    }
}

/// Existing file with one of the [`VIDEO_EXTENSIONS`]
///
pub fn check_video_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Errors::MissingPath(path.display().to_string()).into());
    }
    if !is_video_file(path) {
        return Err(Errors::WrongExtension {
            path: path.display().to_string(),
            expected: VIDEO_EXTENSIONS.join("|"),
        }
        .into());
    }
    Ok(())
}

/// Fills `buf` completely; `false` when the stream ends before the first byte
///
fn read_frame<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(false);
            }
            return Err(Errors::Decode(format!(
                "truncated frame: {} of {} bytes",
                filled,
                buf.len()
            ))
            .into());
        }
        filled += n;
    }
    Ok(true)
}

impl FrameSource for FfmpegReader {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let (w, h) = (self.info.width, self.info.height);
        let mut buf = vec![0u8; (w * h * 3) as usize];
        if !read_frame(&mut self.stdout, &mut buf)? {
            let status = self.child.wait()?;
            if !status.success() {
                return Err(Errors::Decode(format!("ffmpeg exited with {}", status)).into());
            }
            return Ok(None);
        }
        RgbImage::from_raw(w, h, buf)
            .map(Some)
            .ok_or_else(|| Errors::Decode("frame buffer size".into()).into())
    }

    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn frame_count(&self) -> Option<usize> {
        self.info.frames
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Encodes raw RGB frames into a video file through an `ffmpeg` child process
///
pub struct FfmpegWriter {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    dimensions: (u32, u32),
    path: PathBuf,
}

impl FfmpegWriter {
    pub fn create<P: AsRef<Path>>(path: P, dimensions: (u32, u32), fps: f64) -> Result<Self> {
        let path = path.as_ref();
        if !is_video_file(path) {
            return Err(Errors::WrongExtension {
                path: path.display().to_string(),
                expected: VIDEO_EXTENSIONS.join("|"),
            }
            .into());
        }
        let (w, h) = dimensions;
        let mut child = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", &format!("{}x{}", w, h), "-r", &format!("{}", fps)])
            .args(["-i", "-", "-vf", "pad=ceil(iw/2)*2:ceil(ih/2)*2", "-pix_fmt", "yuv420p"])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .context("Failed to run ffmpeg")?;
        let stdin = child.stdin.take();

        Ok(Self {
            child: Some(child),
            stdin,
            dimensions,
            path: path.to_path_buf(),
        })
    }
}

impl FrameSink for FfmpegWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != self.dimensions {
            return Err(Errors::Decode(format!(
                "frame size {:?} differs from the video size {:?}",
                frame.dimensions(),
                self.dimensions
            ))
            .into());
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Errors::Decode("writer is closed".into()))?;
        stdin.write_all(frame.as_raw())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(Errors::Decode(format!("ffmpeg exited with {}", status)).into());
            }
            info!("Saved video to '{}'.", self.path.display());
        }
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// Opens a directory as an image sequence or a `.avi`/`.mp4` file as a video.
///
/// # Parameters
/// * `path` - directory or video file;
/// * `prefix` - image name prefix stripped before the frame number;
/// * `sequence_fps` - frame rate assigned to image sequences.
///
pub fn open_source<P: AsRef<Path>>(
    path: P,
    prefix: &str,
    sequence_fps: f64,
) -> Result<Box<dyn FrameSource + Send>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Errors::MissingPath(path.display().to_string()).into());
    }
    if path.is_dir() {
        Ok(Box::new(ImageSequence::open(path, prefix, sequence_fps)?))
    } else {
        Ok(Box::new(FfmpegReader::open(path)?))
    }
}

/// Frame source decoded ahead of time on a separate thread
///
pub struct Prefetched {
    rx: Receiver<Result<RgbImage>>,
    fps: f64,
    dimensions: (u32, u32),
    frames: Option<usize>,
    worker: Option<JoinHandle<()>>,
}

/// Moves `source` to a decoder thread that keeps up to `capacity` frames ready.
///
pub fn prefetch(mut source: Box<dyn FrameSource + Send>, capacity: usize) -> Prefetched {
    let (tx, rx) = bounded(capacity.max(1));
    let (fps, dimensions, frames) = (source.fps(), source.dimensions(), source.frame_count());

    let worker = std::thread::spawn(move || loop {
        match source.next_frame() {
            Ok(Some(frame)) => {
                if tx.send(Ok(frame)).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    });

    Prefetched {
        rx,
        fps,
        dimensions,
        frames,
        worker: Some(worker),
    }
}

impl FrameSource for Prefetched {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.rx.recv() {
            Ok(frame) => frame.map(Some),
            Err(_) => {
                if let Some(worker) = self.worker.take() {
                    let _ = worker.join();
                }
                Ok(None)
            }
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn frame_count(&self) -> Option<usize> {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use crate::test_stuff::{blank_frame, ScriptedSource};
    use crate::video::{
        parse_probe, parse_rate, prefetch, FfmpegReader, FrameSink, FrameSource, ImageSequence,
        ImageSequenceWriter, StreamInfo,
    };
    use crate::Errors;
    use std::process::{Command, Stdio};

    fn shell_reader(script: &str) -> FfmpegReader {
        let child = Command::new("sh")
            .args(["-c", script])
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()
            .unwrap();
        let info = StreamInfo {
            width: 2,
            height: 1,
            fps: 10.0,
            frames: None,
        };
        FfmpegReader::from_child(child, info).unwrap()
    }

    #[test]
    fn failed_decoder_is_an_error() {
        let mut reader = shell_reader("exit 1");
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err.downcast_ref::<Errors>(), Some(Errors::Decode(_))));
    }

    #[test]
    fn decoder_stream_ends_cleanly() {
        // one 2x1 RGB frame
        let mut reader = shell_reader("printf 'abcdef'");
        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.dimensions(), (2, 1));
        assert_eq!(frame.get_pixel(1, 0).0, [b'd', b'e', b'f']);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn rates() {
        assert_eq!(parse_rate("30/1"), Some(30.0));
        assert!((parse_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_rate("25"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
    }

    #[test]
    fn probe_output() {
        let info = parse_probe(
            r#"{"streams": [{"width": 640, "height": 480, "r_frame_rate": "15/1", "nb_frames": "300"}]}"#,
        )
        .unwrap();
        assert_eq!((info.width, info.height), (640, 480));
        assert_eq!(info.fps, 15.0);
        assert_eq!(info.frames, Some(300));
        assert!(parse_probe(r#"{"streams": []}"#).is_err());
    }

    #[test]
    fn sequence_round_trip_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ImageSequenceWriter::create(dir.path(), "Image").unwrap();
        for v in [10u8, 20, 30] {
            writer.write_frame(&blank_frame(8, 4, v)).unwrap();
        }
        writer.finish().unwrap();
        // a file without a frame number is skipped
        blank_frame(8, 4, 0).save(dir.path().join("cover.png")).unwrap();

        let mut seq = ImageSequence::open(dir.path(), "Image", 5.0).unwrap();
        assert_eq!(seq.frame_count(), Some(3));
        assert_eq!(seq.dimensions(), (8, 4));
        let mut values = Vec::new();
        while let Some(f) = seq.next_frame().unwrap() {
            values.push(f.get_pixel(0, 0).0[0]);
        }
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequence::open(dir.path(), "Image", 1.0).is_err());
        assert!(ImageSequence::open(dir.path().join("missing"), "Image", 1.0).is_err());
    }

    #[test]
    fn prefetched_order() {
        let frames = (0..10u8).map(|v| blank_frame(2, 2, v)).collect::<Vec<_>>();
        let mut p = prefetch(Box::new(ScriptedSource::new(frames, 12.0)), 2);
        assert_eq!(p.fps(), 12.0);
        let mut seen = Vec::new();
        while let Some(f) = p.next_frame().unwrap() {
            seen.push(f.get_pixel(1, 1).0[0]);
        }
        assert_eq!(seen, (0..10).collect::<Vec<u8>>());
    }
}
