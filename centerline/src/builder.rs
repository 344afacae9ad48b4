//! Branch-tree builder
//!
//! Greedy chain growth over an unordered centerline point cloud. The first
//! chain starts at the extreme point along the primary axis (top of the
//! trachea); every later chain starts at the unused point closest to the
//! existing tree, and where it attaches decides whether the tree gains a
//! sibling, a child, or splits an existing branch in two.
//!
//! Points of a chain that turns out too short are consumed anyway. They are
//! not returned to the pool, so isolated specks never re-seed the search.

use airnav_core::{BuilderOptions, PointIndex};
use nalgebra::Point3;
use tracing::{debug, info, instrument, warn};

use crate::branch::{Branch, BranchId};
use crate::branch_list::BranchList;

/// Pool of not yet consumed input points.
struct UnusedPoints<'a> {
    points: &'a [Point3<f64>],
    /// Input indices, descending along the primary axis
    sorted: Vec<usize>,
    cursor: usize,
    unused: Vec<bool>,
    remaining: usize,
    index: PointIndex,
}

impl<'a> UnusedPoints<'a> {
    fn new(points: &'a [Point3<f64>], options: &BuilderOptions) -> Self {
        let axis = options.primary_axis;
        let mut unused = vec![true; points.len()];
        let mut remaining = points.len();
        for (i, p) in points.iter().enumerate() {
            if !p.coords.iter().all(|c| c.is_finite()) {
                unused[i] = false;
                remaining -= 1;
            }
        }
        let mut sorted: Vec<usize> = (0..points.len()).filter(|&i| unused[i]).collect();
        sorted.sort_by(|&a, &b| {
            axis.coordinate(&points[b])
                .total_cmp(&axis.coordinate(&points[a]))
        });
        let index = PointIndex::from_indexed(sorted.iter().map(|&i| (i, points[i])));
        Self {
            points,
            sorted,
            cursor: 0,
            unused,
            remaining,
            index,
        }
    }

    fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Extreme unused point along the primary axis.
    fn first(&mut self) -> Option<usize> {
        while self.cursor < self.sorted.len() {
            let i = self.sorted[self.cursor];
            if self.unused[i] {
                return Some(i);
            }
            self.cursor += 1;
        }
        None
    }

    fn nearest(&self, query: &Point3<f64>) -> Option<(usize, f64)> {
        self.index.nearest(query)
    }

    fn consume(&mut self, i: usize) {
        if self.unused[i] {
            self.unused[i] = false;
            self.remaining -= 1;
            self.index.remove(i, &self.points[i]);
        }
    }
}

/// Build a branch forest from an unordered centerline point cloud.
///
/// The first chain starts at the highest point along the primary axis; later
/// chains start at the unused point nearest to the tree and attach to the
/// branch it was matched from: as a sibling near the branch start, as a
/// child near its end, or by splitting the branch in two. Chains shorter than the minimum length are
/// discarded and their points stay consumed. Non-finite points are skipped.
#[instrument(level = "debug", skip_all, fields(points = points.len()))]
pub fn build_tree(points: &[Point3<f64>], options: &BuilderOptions) -> BranchList {
    let mut list = BranchList::new();
    if points.is_empty() {
        warn!("Branch tree requested for an empty point cloud");
        return list;
    }

    let mut pool = UnusedPoints::new(points, options);
    if pool.remaining < points.len() {
        warn!(
            skipped = points.len() - pool.remaining,
            "Skipping centerline points with non-finite coordinates"
        );
    }

    let mut discarded_points = 0usize;
    while !pool.is_empty() {
        let (seed, anchor) = if list.is_empty() {
            match pool.first() {
                Some(seed) => (seed, None),
                None => break,
            }
        } else {
            match find_seed(&list, &pool, options.early_exit_distance) {
                Some((branch, seed)) => (seed, Some(branch)),
                None => break,
            }
        };

        let chain = grow_chain(seed, &mut pool, options.max_gap);
        if chain.len() < options.min_branch_length {
            debug!(length = chain.len(), "Discarding short chain");
            discarded_points += chain.len();
            continue;
        }

        let positions: Vec<Point3<f64>> = chain.iter().map(|&i| points[i]).collect();
        let committed = match anchor {
            None => list.add_branch(Branch::new(positions), None),
            Some(match_id) => attach(&mut list, match_id, &points[seed], positions, options.junction_margin),
        };
        if let Err(err) = committed {
            warn!(%err, "Failed to attach grown branch");
        }
    }

    info!(
        branches = list.len(),
        points = list.total_points(),
        discarded_points,
        "Built centerline branch tree"
    );
    list
}

/// Nearest unused point to any existing branch position: `(branch, point)`.
fn find_seed(list: &BranchList, pool: &UnusedPoints<'_>, early_exit: f64) -> Option<(BranchId, usize)> {
    let mut best: Option<(BranchId, usize, f64)> = None;
    for (id, branch) in list.iter() {
        for p in branch.positions() {
            if let Some((i, d)) = pool.nearest(p) {
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((id, i, d));
                    if d < early_exit {
                        return Some((id, i));
                    }
                }
            }
        }
    }
    best.map(|(id, i, _)| (id, i))
}

/// Walk from `seed` to successive nearest unused points until the gap to
/// the next one exceeds `max_gap`.
fn grow_chain(seed: usize, pool: &mut UnusedPoints<'_>, max_gap: f64) -> Vec<usize> {
    let mut chain = vec![seed];
    pool.consume(seed);
    let mut current = pool.points[seed];
    while let Some((next, dist)) = pool.nearest(&current) {
        if dist > max_gap {
            break;
        }
        pool.consume(next);
        chain.push(next);
        current = pool.points[next];
    }
    chain
}

fn attach(
    list: &mut BranchList,
    match_id: BranchId,
    seed: &Point3<f64>,
    positions: Vec<Point3<f64>>,
    margin: usize,
) -> airnav_core::Result<BranchId> {
    let (split_index, match_len) = match list.get(match_id) {
        Some(branch) => (branch.nearest_index(seed).unwrap_or(0), branch.len()),
        None => return list.add_branch(Branch::new(positions), None),
    };

    if split_index < margin {
        // near the start of the matched branch: a sibling
        let parent = list.parent(match_id);
        list.add_branch(Branch::new(positions), parent)
    } else if match_len - split_index <= margin {
        list.add_branch(Branch::new(positions), Some(match_id))
    } else {
        let tail = list.split_branch(match_id, split_index)?;
        debug!(?match_id, ?tail, split_index, "Split branch at new junction");
        list.add_branch(Branch::new(positions), Some(match_id))
    }
}
