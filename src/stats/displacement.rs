/// Euclidean distance between two points
///
pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Distances between consecutive frames; `n - 1` values for `n` frames
///
pub fn displacements(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    (1..n)
        .map(|i| distance((x[i - 1], y[i - 1]), (x[i], y[i])))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::stats::displacement::{displacements, distance};

    #[test]
    fn consecutive() {
        let d = displacements(&[0.0, 3.0, 3.0], &[0.0, 4.0, 4.0]);
        assert_eq!(d, vec![5.0, 0.0]);
        assert!(displacements(&[1.0], &[1.0]).is_empty());
        assert_eq!(distance((1.0, 1.0), (1.0, -1.0)), 2.0);
    }
}
