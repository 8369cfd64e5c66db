use crate::stats::displacement::distance;
use std::f64::consts::{PI, TAU};

/// Slope used in place of an undefined (vertical) one
const VERTICAL_SLOPE: f64 = 10_000_000.0;

fn slope(a: (f64, f64), b: (f64, f64)) -> f64 {
    if b.0 - a.0 != 0.0 {
        (b.1 - a.1) / (b.0 - a.0)
    } else {
        VERTICAL_SLOPE
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Angles at the middle point of every three consecutive frames.
///
/// For `A, B, C` with sides `a = |AB|`, `b = |BC|`, `c = |CA|` all positive the angle is
/// `acos(round((a² + b² - c²) / 2ab, 4))`. It is reflected to `2π - θ` when the slope of
/// `BC` is below the slope of `AB`. Triples with a zero side are skipped.
///
pub fn law_of_cosines_angles(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let mut result = Vec::new();
    for i in 0..n.saturating_sub(2) {
        let (pa, pb, pc) = ((x[i], y[i]), (x[i + 1], y[i + 1]), (x[i + 2], y[i + 2]));
        let a = distance(pa, pb);
        let b = distance(pb, pc);
        let c = distance(pc, pa);
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            continue;
        }
        let cos = round4((a * a + b * b - c * c) / (2.0 * a * b)).clamp(-1.0, 1.0);
        let mut theta = cos.acos();
        if slope(pb, pc) < slope(pa, pb) {
            theta = TAU - theta;
        }
        result.push(theta);
    }
    result
}

/// Signed heading change from `prev` to `next`, wrapped to `[0, 2π)`.
///
/// Counter-clockwise turns are in `(0, π)`, clockwise turns in `(π, 2π)`.
///
pub fn turn_angle(prev: (f64, f64), next: (f64, f64)) -> f64 {
    let cross = prev.0 * next.1 - prev.1 * next.0;
    let dot = prev.0 * next.0 + prev.1 * next.1;
    let theta = cross.atan2(dot).rem_euclid(TAU);
    if theta >= TAU {
        0.0
    } else {
        theta
    }
}

/// Shifts an angle by half a turn, so that `0` means forward and `π` backward
///
pub fn reorient(theta: f64) -> f64 {
    if theta + PI >= TAU {
        theta - PI
    } else {
        theta + PI
    }
}

#[cfg(test)]
mod tests {
    use crate::stats::angles::{law_of_cosines_angles, reorient, turn_angle};
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn cosines() {
        // straight line: interior angle π
        let a = law_of_cosines_angles(&[0.0, 1.0, 2.0], &[0.0, 0.0, 0.0]);
        assert_eq!(a.len(), 1);
        assert!((a[0] - PI).abs() < 1e-9);

        // right angle turning up: slope grows, no reflection
        let a = law_of_cosines_angles(&[0.0, 1.0, 1.0], &[0.0, 0.0, 1.0]);
        assert!((a[0] - FRAC_PI_2).abs() < 1e-9);

        // slope drops from 1 to -1: reflected
        let a = law_of_cosines_angles(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]);
        assert!((a[0] - (2.0 * PI - FRAC_PI_2)).abs() < 1e-9);
    }

    #[test]
    fn zero_sides_skipped() {
        assert!(law_of_cosines_angles(&[0.0, 0.0, 1.0], &[0.0, 0.0, 0.0]).is_empty());
        assert!(law_of_cosines_angles(&[0.0, 1.0, 0.0], &[0.0, 0.0, 0.0]).is_empty());
        assert!(law_of_cosines_angles(&[0.0, 1.0], &[0.0, 0.0]).is_empty());
    }

    #[test]
    fn turns() {
        assert!(turn_angle((1.0, 0.0), (1.0, 0.0)).abs() < 1e-12);
        assert!((turn_angle((1.0, 0.0), (0.0, 1.0)) - FRAC_PI_2).abs() < 1e-12);
        assert!((turn_angle((1.0, 0.0), (0.0, -1.0)) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((turn_angle((1.0, 0.0), (-1.0, 0.0)) - PI).abs() < 1e-12);
    }

    #[test]
    fn reorientation() {
        assert!((reorient(PI) - 0.0).abs() < 1e-12);
        assert!((reorient(0.0) - PI).abs() < 1e-12);
        assert!((reorient(1.5 * PI) - 0.5 * PI).abs() < 1e-12);
    }
}
