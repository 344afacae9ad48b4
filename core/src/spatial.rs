//! Point index for nearest-neighbour queries
//!
//! Thin wrapper around an `rstar` R*-tree keyed by the caller's point index,
//! so results can be mapped back into the caller's arrays. Supports removal,
//! which the tree builder needs while it consumes unused points.

use nalgebra::Point3;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

#[derive(Debug, Clone, PartialEq)]
struct IndexedPoint(usize, [f64; 3]);

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.1)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.1[0] - point[0];
        let dy = self.1[1] - point[1];
        let dz = self.1[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

fn key(p: &Point3<f64>) -> [f64; 3] {
    [p.x, p.y, p.z]
}

/// R*-tree over a set of indexed points.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    /// Index `points`, identifying each by its position in the slice.
    pub fn new(points: &[Point3<f64>]) -> Self {
        let wrappers: Vec<IndexedPoint> = points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint(i, key(p)))
            .collect();
        Self {
            tree: RTree::bulk_load(wrappers),
        }
    }

    /// Index points under caller-chosen indices.
    pub fn from_indexed<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (usize, Point3<f64>)>,
    {
        let wrappers: Vec<IndexedPoint> = points.into_iter().map(|(i, p)| IndexedPoint(i, key(&p))).collect();
        Self {
            tree: RTree::bulk_load(wrappers),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest indexed point: `(index, euclidean distance)`.
    pub fn nearest(&self, query: &Point3<f64>) -> Option<(usize, f64)> {
        let q = key(query);
        self.tree
            .nearest_neighbor(&q)
            .map(|n| (n.0, n.distance_2(&q).sqrt()))
    }

    /// All indexed points ordered by increasing distance to `query`.
    pub fn nearest_iter<'a>(&'a self, query: &Point3<f64>) -> impl Iterator<Item = (usize, f64)> + 'a {
        let q = key(query);
        self.tree
            .nearest_neighbor_iter(&q)
            .map(move |n| (n.0, n.distance_2(&q).sqrt()))
    }

    /// Indices of every point within `radius` (inclusive) of `query`.
    pub fn within(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        self.tree
            .locate_within_distance(key(query), radius * radius)
            .map(|n| n.0)
            .collect()
    }

    /// Remove the point stored under `index` at `point`. Returns whether it
    /// was present.
    pub fn remove(&mut self, index: usize, point: &Point3<f64>) -> bool {
        self.tree.remove(&IndexedPoint(index, key(point))).is_some()
    }
}
