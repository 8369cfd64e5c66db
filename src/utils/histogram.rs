/// Fixed-width histogram over a closed range.
///
/// Values equal to the upper edge fall into the last bin; values outside the range are
/// ignored.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// # Parameters
    /// * `values` - samples;
    /// * `bins` - number of bins, at least one;
    /// * `range` - `(low, high)`; when `None` the sample minimum and maximum are used.
    ///
    pub fn new(values: &[f64], bins: usize, range: Option<(f64, f64)>) -> Self {
        let bins = bins.max(1);
        let (mut low, mut high) = range.unwrap_or_else(|| {
            values
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                })
        });
        if !low.is_finite() || !high.is_finite() {
            low = 0.0;
            high = 1.0;
        }
        if low == high {
            low -= 0.5;
            high += 0.5;
        }

        let width = (high - low) / bins as f64;
        let edges = (0..=bins).map(|i| low + width * i as f64).collect();
        let mut counts = vec![0; bins];
        for &v in values {
            if v < low || v > high || v.is_nan() {
                continue;
            }
            let index = (((v - low) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }

        Self { edges, counts }
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn width(&self, bin: usize) -> f64 {
        self.edges[bin + 1] - self.edges[bin]
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }

    /// Counts normalised so the histogram integrates to one
    ///
    pub fn density(&self) -> Vec<f64> {
        let total = self.total() as f64;
        if total == 0.0 {
            return vec![0.0; self.bins()];
        }
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| c as f64 / (total * self.width(i)))
            .collect()
    }

    pub fn max_density(&self) -> f64 {
        self.density().into_iter().fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::histogram::Histogram;

    #[test]
    fn counts() {
        let h = Histogram::new(&[0.0, 0.5, 1.0, 1.5, 2.0, 5.0], 2, Some((0.0, 2.0)));
        assert_eq!(h.counts, vec![2, 3]);
        assert_eq!(h.centers(), vec![0.5, 1.5]);
    }

    #[test]
    fn density_integrates_to_one() {
        let values = (0..100).map(|i| (i as f64).sqrt()).collect::<Vec<_>>();
        let h = Histogram::new(&values, 7, None);
        let area: f64 = h
            .density()
            .iter()
            .enumerate()
            .map(|(i, d)| d * h.width(i))
            .sum();
        assert!((area - 1.0).abs() < 1e-12);
        assert_eq!(h.total(), 100);
    }

    #[test]
    fn degenerate() {
        let h = Histogram::new(&[3.0, 3.0], 4, None);
        assert_eq!(h.total(), 2);
        let h = Histogram::new(&[], 4, None);
        assert_eq!(h.density(), vec![0.0; 4]);
    }
}
