//! Flat exports of a branch tree for collaborators that do not know about
//! the arena: a renderable polyline forest and a parent-index table.

use nalgebra::Point3;

use crate::branch_list::BranchList;

/// Points plus index pairs joining them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point3<f64>>,
    pub segments: Vec<[usize; 2]>,
}

impl BranchList {
    /// Parent of each branch as a position in insertion order.
    pub fn parent_indices(&self) -> Vec<Option<usize>> {
        let ids = self.ids();
        ids.iter()
            .map(|&id| {
                self.parent(id)
                    .and_then(|parent| ids.iter().position(|&other| other == parent))
            })
            .collect()
    }

    /// Every branch as a chain of segments, in insertion order. With
    /// `connect_to_parent`, the first point of each child is also joined to
    /// the nearest point of its parent.
    pub fn to_polyline(&self, connect_to_parent: bool) -> Polyline {
        let mut polyline = Polyline {
            points: Vec::with_capacity(self.total_points()),
            segments: Vec::new(),
        };
        let mut offsets = Vec::with_capacity(self.len());
        for (_, branch) in self.iter() {
            let start = polyline.points.len();
            offsets.push(start);
            polyline.points.extend_from_slice(branch.positions());
            for i in 1..branch.len() {
                polyline.segments.push([start + i - 1, start + i]);
            }
        }

        if connect_to_parent {
            let parents = self.parent_indices();
            for (slot, (_, branch)) in self.iter().enumerate() {
                let (Some(parent_slot), Some(first)) = (parents[slot], branch.positions().first()) else {
                    continue;
                };
                let parent_id = self.ids()[parent_slot];
                if let Some(nearest) = self.get(parent_id).and_then(|p| p.nearest_index(first)) {
                    polyline.segments.push([offsets[parent_slot] + nearest, offsets[slot]]);
                }
            }
        }
        polyline
    }
}
