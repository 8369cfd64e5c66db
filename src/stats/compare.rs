use crate::position::validate_path;
use crate::stats::msd::diffusion_constant;
use crate::utils::fit::{linregress, mean_std, Regression};
use crate::utils::special::{ttest_ind, TTest};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Diffusion constants (cm²/s) measured on cold beans
pub const COLD_DIFFUSIONS: [f64; 5] = [0.00099, 0.01189, 0.0000875, 0.00304, 0.0118875];

/// Diffusion constants (cm²/s) measured on hot beans
pub const HOT_DIFFUSIONS: [f64; 10] = [
    0.001815, 0.0308775, 0.01419, 0.01607, 0.0108325, 0.0210575, 0.0275375, 0.0233975, 0.03885,
    0.0608625,
];

/// One line of a slope file: `dataset:msd_slope:size[:group]`
///
#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionRecord {
    pub dataset: String,
    pub slope: f64,
    /// Bean size in mm
    pub size: f64,
    pub group: Option<String>,
}

impl DiffusionRecord {
    pub fn diffusion(&self) -> f64 {
        diffusion_constant(self.slope)
    }
}

pub fn parse_diffusion_line(line: &str) -> Result<DiffusionRecord> {
    let fields = line.trim().split(':').collect::<Vec<_>>();
    if fields.len() < 3 {
        anyhow::bail!("expected 'dataset:slope:size', got '{}'", line.trim());
    }
    Ok(DiffusionRecord {
        dataset: fields[0].to_string(),
        slope: fields[1].trim().parse().context("slope")?,
        size: fields[2].trim().parse().context("size")?,
        group: fields
            .get(3)
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty()),
    })
}

/// Reads a slope file, skipping blank lines
///
pub fn read_diffusion_file<P: AsRef<Path>>(path: P) -> Result<Vec<DiffusionRecord>> {
    validate_path(path.as_ref(), "txt")?;
    fs::read_to_string(path.as_ref())?
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(parse_diffusion_line)
        .collect()
}

/// Regression of the diffusion constant against the bean size
///
pub fn size_regression(records: &[DiffusionRecord]) -> Result<Regression> {
    let size = records.iter().map(|r| r.size).collect::<Vec<_>>();
    let d = records.iter().map(|r| r.diffusion()).collect::<Vec<_>>();
    linregress(&size, &d)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub n: usize,
}

impl GroupSummary {
    pub fn new(name: &str, values: &[f64]) -> Self {
        let (mean, std) = mean_std(values);
        Self {
            name: name.to_string(),
            mean,
            std,
            n: values.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub first: GroupSummary,
    pub second: GroupSummary,
    pub ttest: TTest,
}

/// Mean ± std of two groups and the equal-variance t-test between them
///
pub fn compare_groups(
    first: (&str, &[f64]),
    second: (&str, &[f64]),
) -> Result<Comparison> {
    Ok(Comparison {
        first: GroupSummary::new(first.0, first.1),
        second: GroupSummary::new(second.0, second.1),
        ttest: ttest_ind(first.1, second.1)?,
    })
}

/// Diffusion constants of the records tagged with `group`
///
pub fn group_values(records: &[DiffusionRecord], group: &str) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.group.as_deref() == Some(group))
        .map(|r| r.diffusion())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::stats::compare::{
        compare_groups, group_values, parse_diffusion_line, read_diffusion_file,
        size_regression, COLD_DIFFUSIONS, HOT_DIFFUSIONS,
    };

    #[test]
    fn lines() {
        let r = parse_diffusion_line("set-a:0.04:7.5:hot\n").unwrap();
        assert_eq!(r.dataset, "set-a");
        assert!((r.diffusion() - 0.01).abs() < 1e-12);
        assert_eq!(r.group.as_deref(), Some("hot"));
        assert!(parse_diffusion_line("set:0.04").is_err());
        assert!(parse_diffusion_line("set:x:1").is_err());
    }

    #[test]
    fn file_and_regression() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("slopes.txt");
        std::fs::write(&p, "a:0.04:5:cold\nb:0.08:6:hot\n\nc:0.12:7:hot\n").unwrap();
        let records = read_diffusion_file(&p).unwrap();
        assert_eq!(records.len(), 3);
        let r = size_regression(&records).unwrap();
        assert!((r.fit.slope - 0.01).abs() < 1e-12);
        assert!((r.r - 1.0).abs() < 1e-9);
        assert_eq!(group_values(&records, "hot"), vec![0.02, 0.03]);
    }

    #[test]
    fn paper_groups() {
        let c = compare_groups(("Cold", &COLD_DIFFUSIONS), ("Hot", &HOT_DIFFUSIONS)).unwrap();
        assert_eq!(c.first.n, 5);
        assert!(c.first.mean < c.second.mean);
        // pooled variance over 13 degrees of freedom
        assert!((c.ttest.statistic + 2.445_654_214).abs() < 1e-6);
        assert!((c.ttest.p_value - 0.029_452_479).abs() < 1e-6);
    }
}
