use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

pub const JUMP_SIZE: i64 = 1;
pub const SHADE_POS: i64 = 0;
pub const END_POS: i64 = 200;
pub const START_MIN: f64 = 20.0;
pub const START_MAX: f64 = 50.0;

/// Time reported for a bean that walked away from the shade
pub const LOST_TIME: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// New direction on every step
    Diffuse,
    /// One direction for the whole walk
    Ballistic,
}

fn direction<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    if rng.gen_bool(0.5) {
        1
    } else {
        -1
    }
}

/// Steps needed to reach the shade at [`SHADE_POS`] from `start`.
///
/// Returns [`LOST_TIME`] when the walk ends at [`END_POS`] instead.
///
pub fn find_shade<R: Rng + ?Sized>(start: i64, motion: Motion, rng: &mut R) -> u64 {
    let mut pos = start;
    let mut time = 0;
    let mut dir = direction(rng);
    while pos > SHADE_POS && pos < END_POS {
        if motion == Motion::Diffuse {
            dir = direction(rng);
        }
        pos += dir * JUMP_SIZE;
        time += 1;
    }
    if pos >= END_POS {
        LOST_TIME
    } else {
        time
    }
}

/// Start position drawn uniformly in `[START_MIN, START_MAX]` and rounded
///
pub fn start_position<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.gen_range(START_MIN..=START_MAX).round() as i64
}

/// Shade-finding rates `1 / t` of `n_beans` independent beans.
///
/// # Parameters
/// * `seed` - bean `i` uses a generator seeded with `seed + i`.
///
pub fn shade_rates(n_beans: usize, motion: Motion, seed: u64) -> Vec<f64> {
    info!("Calculating {:?} shade times for {} beans", motion, n_beans);
    let rates = (0..n_beans)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let start = start_position(&mut rng);
            1.0 / find_shade(start, motion, &mut rng) as f64
        })
        .collect::<Vec<_>>();
    debug!(
        "{} of {} beans reached the far end",
        rates.iter().filter(|r| **r == 1.0 / LOST_TIME as f64).count(),
        n_beans
    );
    rates
}

#[cfg(test)]
mod tests {
    use crate::simulation::shade::{
        find_shade, shade_rates, start_position, Motion, END_POS, LOST_TIME,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ballistic_is_straight() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let t = find_shade(30, Motion::Ballistic, &mut rng);
            assert!(t == 30 || t == LOST_TIME);
        }
    }

    #[test]
    fn boundaries() {
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(find_shade(0, Motion::Diffuse, &mut rng), 0);
        assert_eq!(find_shade(END_POS, Motion::Diffuse, &mut rng), LOST_TIME);
    }

    #[test]
    fn diffuse_parity() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let t = find_shade(21, Motion::Diffuse, &mut rng);
            // odd distance needs an odd step count, unless the bean was lost
            assert!(t == LOST_TIME || (t % 2 == 1 && t >= 21));
        }
    }

    #[test]
    fn starts_and_rates() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!((0..1000)
            .map(|_| start_position(&mut rng))
            .all(|s| (20..=50).contains(&s)));

        let r = shade_rates(64, Motion::Ballistic, 9);
        assert_eq!(r, shade_rates(64, Motion::Ballistic, 9));
        assert!(r.iter().all(|v| *v <= 1.0 / 20.0 && *v > 0.0));
    }
}
