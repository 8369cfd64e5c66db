use crate::stats::displacement::distance;

/// Activity samples of one object
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    /// Frame indices `0, interval, 2 * interval, ...`
    pub t: Vec<usize>,
    pub activity: Vec<f64>,
}

/// Distance travelled over the last `interval` frames, sampled every `interval` frames.
///
/// The first sample is always 0.
///
pub fn activity(x: &[f64], y: &[f64], interval: usize) -> Activity {
    let interval = interval.max(1);
    let n = x.len().min(y.len());
    let mut result = Activity::default();
    for i in (0..n).step_by(interval) {
        result.t.push(i);
        result.activity.push(if i < interval {
            0.0
        } else {
            distance((x[i], y[i]), (x[i - interval], y[i - interval]))
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use crate::stats::activity::activity;

    #[test]
    fn sampling() {
        let x = [0.0, 1.0, 3.0, 6.0, 10.0];
        let y = [0.0; 5];
        let a = activity(&x, &y, 2);
        assert_eq!(a.t, vec![0, 2, 4]);
        assert_eq!(a.activity, vec![0.0, 3.0, 7.0]);

        let a = activity(&x, &y, 1);
        assert_eq!(a.activity, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }
}
