/// Manifest files grouping position-data files into experimental sets
pub mod manifest;

use crate::Errors;
use anyhow::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Coordinate frame of a session.
///
/// `width` and `height` are expressed in `units` (usually `cm`), `fps` is the number of
/// array slots per second of the recording.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    pub units: String,
    pub fps: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 27.94,
            height: 21.59,
            units: "cm".to_string(),
            fps: 1.0,
        }
    }
}

impl Canvas {
    pub fn new(width: f64, height: f64, units: &str, fps: f64) -> Self {
        Self {
            width,
            height,
            units: units.to_string(),
            fps,
        }
    }
}

/// Position time series of one tracked item. Index `i` of both arrays is frame `i + 1`.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    #[serde(rename = "X")]
    pub x: Vec<f64>,
    #[serde(rename = "Y")]
    pub y: Vec<f64>,
}

impl TrackedObject {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.x.push(x);
        self.y.push(y);
    }
}

/// Points of every object at one frame
///
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    /// 1-based frame number
    pub number: usize,
    pub points: Vec<(f64, f64)>,
}

/// The exchange format between the tracker, the simulator and the statistics commands.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub canvas: Canvas,
    pub objects: Vec<TrackedObject>,
}

/// Checks that `path` exists and that its file name ends with `.ext`, case-sensitive
///
pub fn validate_path<P: AsRef<Path>>(path: P, ext: &str) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Errors::MissingPath(path.display().to_string()).into());
    }
    let suffix = format!(".{}", ext);
    let matches = path
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(&suffix))
        .unwrap_or(false);
    if !matches {
        return Err(Errors::WrongExtension {
            path: path.display().to_string(),
            expected: ext.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Parses a comma separated list of object indices (`"0,2,3"`).
///
/// An absent list selects every object.
///
pub fn object_indices(spec: Option<&str>, count: usize) -> Result<Vec<usize>> {
    let indices = match spec {
        None => return Ok((0..count).collect()),
        Some(s) if s.trim().is_empty() => return Ok((0..count).collect()),
        Some(s) => s
            .split(',')
            .map(|e| e.trim().parse::<usize>())
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    if let Some(&index) = indices.iter().find(|&&i| i >= count) {
        return Err(Errors::ObjectOutOfRange { index, count }.into());
    }
    Ok(indices)
}

/// Builds `dir(path)/name`
///
pub fn sibling_path<P: AsRef<Path>>(path: P, name: &str) -> PathBuf {
    match path.as_ref().parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

impl PositionData {
    pub fn new(canvas: Canvas, objects: Vec<TrackedObject>) -> Self {
        Self { canvas, objects }
    }

    /// Reads a position-data file. The path must exist and end with `.json`.
    ///
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        validate_path(path, "json")?;
        debug!("Reading position data from '{}'", path.display());
        let data: PositionData = serde_json::from_str(&fs::read_to_string(path)?)?;
        data.validate()?;
        Ok(data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), serde_json::to_string(self)?)?;
        info!("Saved position data to '{}'.", path.as_ref().display());
        Ok(())
    }

    /// Number of frames, taken from the first object
    ///
    pub fn frame_count(&self) -> usize {
        self.objects.first().map(|o| o.len()).unwrap_or(0)
    }

    /// All objects must hold `X` and `Y` series of the same length as the first object.
    ///
    pub fn validate(&self) -> Result<()> {
        let frames = self.frame_count();
        for (i, o) in self.objects.iter().enumerate() {
            if o.x.len() != o.y.len() || o.x.len() != frames {
                return Err(Errors::InconsistentFrames(i).into());
            }
        }
        Ok(())
    }

    pub fn object(&self, index: usize) -> Result<&TrackedObject> {
        self.objects.get(index).ok_or_else(|| {
            Errors::ObjectOutOfRange {
                index,
                count: self.objects.len(),
            }
            .into()
        })
    }

    /// Keeps frames `seek ..< to` (1-based, `to` excluded).
    ///
    /// # Parameters
    /// * `seek` - first frame to keep, defaults to 1;
    /// * `to` - frame to stop at, defaults to the frame count.
    ///
    pub fn trim(&self, seek: Option<usize>, to: Option<usize>) -> Result<(Self, usize, usize)> {
        let frames = self.frame_count();
        let seek = seek.unwrap_or(1);
        let to = to.unwrap_or(frames);

        if seek > to {
            return Err(Errors::InvalidFrameRange("seek should be before to".into()).into());
        }
        if seek > frames || to > frames {
            return Err(Errors::InvalidFrameRange("seek or to is too far".into()).into());
        }
        if seek < 1 || to < 1 {
            return Err(Errors::InvalidFrameRange("seek and to must begin at frame 1".into()).into());
        }

        let objects = self
            .objects
            .iter()
            .map(|o| TrackedObject::new(o.x[seek - 1..to - 1].to_vec(), o.y[seek - 1..to - 1].to_vec()))
            .collect();

        Ok((Self::new(self.canvas.clone(), objects), seek, to))
    }

    /// Concatenates the series of `other` after the series of `self`, object by object.
    ///
    pub fn append(&self, other: &PositionData) -> Result<Self> {
        if self.canvas != other.canvas {
            return Err(Errors::CanvasMismatch.into());
        }
        if self.objects.len() != other.objects.len() {
            return Err(Errors::ObjectCountMismatch {
                expected: self.objects.len(),
                found: other.objects.len(),
            }
            .into());
        }

        let objects = self
            .objects
            .iter()
            .zip(other.objects.iter())
            .map(|(a, b)| {
                let mut o = a.clone();
                o.x.extend_from_slice(&b.x);
                o.y.extend_from_slice(&b.y);
                o
            })
            .collect();

        Ok(Self::new(self.canvas.clone(), objects))
    }

    /// Keeps only the objects at `indices`, in ascending index order.
    ///
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        let objects = indices
            .into_iter()
            .map(|i| self.object(i).cloned())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(self.canvas.clone(), objects))
    }

    /// Transposes the object series into per-frame point lists
    ///
    pub fn frames(&self) -> Vec<FrameView> {
        (0..self.frame_count())
            .map(|f| FrameView {
                number: f + 1,
                points: self
                    .objects
                    .iter()
                    .filter(|o| f < o.len())
                    .map(|o| (o.x[f], o.y[f]))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::position::{object_indices, validate_path, Canvas, PositionData, TrackedObject};
    use crate::Errors;

    fn data() -> PositionData {
        PositionData::new(
            Canvas::default(),
            vec![
                TrackedObject::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 0.0, 0.0, 0.0]),
                TrackedObject::new(vec![5.0, 5.0, 5.0, 5.0], vec![1.0, 2.0, 3.0, 4.0]),
            ],
        )
    }

    #[test]
    fn json_keys() {
        let s = serde_json::to_string(&data()).unwrap();
        assert!(s.contains("\"X\""));
        assert!(s.contains("\"canvas\""));
        assert!(s.contains("\"units\":\"cm\""));

        let parsed: PositionData = serde_json::from_str(
            r#"{"canvas": {"width": 10, "height": 5, "units": "px", "fps": 30},
                "objects": [{"X": [1, 2], "Y": [3, 4]}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.canvas.fps, 30.0);
        assert_eq!(parsed.objects[0].y, vec![3.0, 4.0]);
    }

    #[test]
    fn trim_excludes_end_frame() {
        let (t, seek, to) = data().trim(Some(2), Some(4)).unwrap();
        assert_eq!((seek, to), (2, 4));
        assert_eq!(t.objects[0].x, vec![1.0, 2.0]);
        assert_eq!(t.objects[1].y, vec![2.0, 3.0]);

        let (t, _, to) = data().trim(None, None).unwrap();
        assert_eq!(to, 4);
        assert_eq!(t.frame_count(), 3);
    }

    #[test]
    fn trim_rejects_bad_ranges() {
        assert!(data().trim(Some(3), Some(2)).is_err());
        assert!(data().trim(Some(1), Some(5)).is_err());
        assert!(data().trim(Some(0), Some(2)).is_err());
    }

    #[test]
    fn append_and_mismatch() {
        let d = data();
        let a = d.append(&d).unwrap();
        assert_eq!(a.frame_count(), 8);
        assert_eq!(a.objects[1].y[4], 1.0);

        let mut other = d.clone();
        other.canvas.units = "mm".into();
        let err = d.append(&other).unwrap_err();
        assert_eq!(err.downcast_ref::<Errors>(), Some(&Errors::CanvasMismatch));

        let mut other = d.clone();
        other.objects.pop();
        assert!(d.append(&other).is_err());
    }

    #[test]
    fn select_sorts_indices() {
        let d = data();
        let s = d.select(&[1, 0]).unwrap();
        assert_eq!(s.objects, d.objects);
        let s = d.select(&[1]).unwrap();
        assert_eq!(s.objects.len(), 1);
        assert_eq!(s.objects[0].x[0], 5.0);
        assert!(d.select(&[2]).is_err());
    }

    #[test]
    fn frames_transpose() {
        let frames = data().frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].number, 1);
        assert_eq!(frames[3].points, vec![(3.0, 0.0), (5.0, 4.0)]);
    }

    #[test]
    fn indices_parsing() {
        assert_eq!(object_indices(None, 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(object_indices(Some("2, 0"), 3).unwrap(), vec![2, 0]);
        assert!(object_indices(Some("3"), 3).is_err());
        assert!(object_indices(Some("a"), 3).is_err());
    }

    #[test]
    fn path_validation() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("pos.json");
        assert!(matches!(
            validate_path(&p, "json").unwrap_err().downcast_ref::<Errors>(),
            Some(Errors::MissingPath(_))
        ));

        data().save(&p).unwrap();
        assert!(validate_path(&p, "json").is_ok());
        assert!(matches!(
            validate_path(&p, "avi").unwrap_err().downcast_ref::<Errors>(),
            Some(Errors::WrongExtension { .. })
        ));
        let upper = dir.path().join("POS.JSON");
        std::fs::copy(&p, &upper).unwrap();
        assert!(matches!(
            validate_path(&upper, "json").unwrap_err().downcast_ref::<Errors>(),
            Some(Errors::WrongExtension { .. })
        ));

        let loaded = PositionData::load(&p).unwrap();
        assert_eq!(loaded, data());
    }

    #[test]
    fn inconsistent_series_rejected() {
        let mut d = data();
        d.objects[1].x.pop();
        assert!(d.validate().is_err());
    }
}
