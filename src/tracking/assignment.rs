use crate::utils::point_2d::Point2D;
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

const F32_I64_MULT: f32 = 1_000_000.0;

/// Matches the candidates of the current frame to the tracked objects.
///
/// Implementations return `(object_index, candidate_index)` pairs; every index appears at
/// most once. When the sides differ in size, the surplus stays unmatched.
///
pub trait Assignment {
    fn assign(&self, tracked: &[Point2D], candidates: &[Point2D]) -> Vec<(usize, usize)>;
}

/// Which [`Assignment`] the tracker uses
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AssignmentKind {
    #[default]
    Greedy,
    Optimal,
}

impl AssignmentKind {
    pub fn assign(&self, tracked: &[Point2D], candidates: &[Point2D]) -> Vec<(usize, usize)> {
        match self {
            AssignmentKind::Greedy => GreedyAssignment.assign(tracked, candidates),
            AssignmentKind::Optimal => OptimalAssignment.assign(tracked, candidates),
        }
    }
}

fn distances(tracked: &[Point2D], candidates: &[Point2D]) -> Vec<(usize, usize, f32)> {
    tracked
        .iter()
        .enumerate()
        .flat_map(|(o, t)| {
            candidates
                .iter()
                .enumerate()
                .map(move |(c, p)| (o, c, t.distance(p)))
        })
        .collect()
}

/// Repeated global-minimum search: the closest unassigned pair is matched first.
///
/// Equal distances are resolved by object index, then candidate index.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyAssignment;

impl Assignment for GreedyAssignment {
    fn assign(&self, tracked: &[Point2D], candidates: &[Point2D]) -> Vec<(usize, usize)> {
        let mut pairs = distances(tracked, candidates);
        pairs.sort_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });

        let mut used_objects = vec![false; tracked.len()];
        let mut used_candidates = vec![false; candidates.len()];
        let mut result = Vec::new();

        for (o, c, _) in pairs {
            if used_objects[o] || used_candidates[c] {
                continue;
            }
            used_objects[o] = true;
            used_candidates[c] = true;
            result.push((o, c));
            if result.len() == tracked.len().min(candidates.len()) {
                break;
            }
        }
        result
    }
}

/// Minimal total distance matching (Kuhn–Munkres)
///
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimalAssignment;

impl Assignment for OptimalAssignment {
    fn assign(&self, tracked: &[Point2D], candidates: &[Point2D]) -> Vec<(usize, usize)> {
        if tracked.is_empty() || candidates.is_empty() {
            return Vec::new();
        }

        // the solver needs rows <= columns
        let transposed = tracked.len() > candidates.len();
        let (rows, cols) = if transposed {
            (candidates, tracked)
        } else {
            (tracked, candidates)
        };

        let mut weights = Matrix::new(rows.len(), cols.len(), 0i64);
        for (r, rp) in rows.iter().enumerate() {
            for (c, cp) in cols.iter().enumerate() {
                weights[(r, c)] = (rp.distance(cp) * F32_I64_MULT) as i64;
            }
        }

        let (_, solution) = kuhn_munkres_min(&weights);
        let mut result = solution
            .into_iter()
            .enumerate()
            .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
            .collect::<Vec<_>>();
        result.sort_unstable();
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::tracking::assignment::{Assignment, GreedyAssignment, OptimalAssignment};
    use crate::utils::point_2d::Point2D;

    fn pts(v: &[(f32, f32)]) -> Vec<Point2D> {
        v.iter().map(|(x, y)| Point2D::new(*x, *y)).collect()
    }

    #[test]
    fn greedy_follows_nearest() {
        let tracked = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);
        let candidates = pts(&[(19.0, 1.0), (1.0, 0.0), (11.0, 0.0)]);
        let mut r = GreedyAssignment.assign(&tracked, &candidates);
        r.sort();
        assert_eq!(r, vec![(0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn greedy_differs_from_optimal() {
        // greedy grabs the 1.0 pair first and pays 9.0 for the rest
        let tracked = pts(&[(0.0, 0.0), (2.0, 0.0)]);
        let candidates = pts(&[(1.0, 0.0), (-8.0, 0.0)]);
        let mut greedy = GreedyAssignment.assign(&tracked, &candidates);
        greedy.sort();
        // both objects are 1.0 away from candidate 0: the lower object index wins
        assert_eq!(greedy, vec![(0, 0), (1, 1)]);

        let optimal = OptimalAssignment.assign(&tracked, &candidates);
        assert_eq!(optimal, vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn surplus_left_unmatched() {
        let tracked = pts(&[(0.0, 0.0)]);
        let candidates = pts(&[(5.0, 5.0), (0.5, 0.0)]);
        assert_eq!(GreedyAssignment.assign(&tracked, &candidates), vec![(0, 1)]);
        assert_eq!(OptimalAssignment.assign(&tracked, &candidates), vec![(0, 1)]);

        let tracked = pts(&[(0.0, 0.0), (5.0, 5.0)]);
        let candidates = pts(&[(4.0, 4.0)]);
        assert_eq!(GreedyAssignment.assign(&tracked, &candidates), vec![(1, 0)]);
        assert_eq!(OptimalAssignment.assign(&tracked, &candidates), vec![(1, 0)]);
    }
}
