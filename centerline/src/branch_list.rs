//! Arena-backed branch forest
//!
//! Branches live in a generational arena and refer to each other by id, so
//! parent/child links can be followed both ways without shared ownership.
//! Insertion order is tracked separately: flattening, export and the
//! registration's initial alignment all depend on it.

use airnav_core::{Error, OrientedPoints, Result};
use generational_arena::Arena;
use nalgebra::Point3;
use tracing::{debug, instrument};

use crate::branch::{radius_for_generation, Branch, BranchId};

#[derive(Debug, Clone, Default)]
pub struct BranchList {
    arena: Arena<Branch>,
    order: Vec<BranchId>,
}

impl BranchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: BranchId) -> Option<&Branch> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: BranchId) -> bool {
        self.arena.contains(id)
    }

    /// Branch ids in insertion order.
    pub fn ids(&self) -> &[BranchId] {
        &self.order
    }

    /// Branches in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (BranchId, &Branch)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.arena.get(id).map(|b| (id, b)))
    }

    pub fn total_points(&self) -> usize {
        self.iter().map(|(_, b)| b.len()).sum()
    }

    pub fn parent(&self, id: BranchId) -> Option<BranchId> {
        self.arena.get(id).and_then(|b| b.parent)
    }

    pub fn children(&self, id: BranchId) -> &[BranchId] {
        self.arena.get(id).map_or(&[], |b| b.children.as_slice())
    }

    pub fn roots(&self) -> Vec<BranchId> {
        self.iter()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Parents before children, siblings in child-list order, roots in
    /// insertion order.
    pub fn preorder(&self) -> Vec<BranchId> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<BranchId> = self.roots().into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            for &child in self.children(id).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// 1 for roots, parent generation + 1 otherwise.
    pub fn generation(&self, id: BranchId) -> Option<usize> {
        let mut current = self.arena.get(id)?;
        let mut generation = 1;
        while let Some(parent) = current.parent {
            current = self.arena.get(parent)?;
            generation += 1;
            if generation > self.arena.len() {
                // a parent chain longer than the arena can only be a cycle
                return None;
            }
        }
        Some(generation)
    }

    /// Expected lumen radius of a branch, from its generation.
    pub fn radius(&self, id: BranchId) -> Option<f64> {
        self.generation(id).map(radius_for_generation)
    }

    /// Insert `branch` under `parent` (a root when `None`).
    pub fn add_branch(&mut self, mut branch: Branch, parent: Option<BranchId>) -> Result<BranchId> {
        if let Some(p) = parent {
            if !self.arena.contains(p) {
                return Err(Error::InvalidInput(format!("Unknown parent branch {p:?}")));
            }
        }
        branch.parent = parent;
        branch.children.clear();
        let id = self.arena.insert(branch);
        self.order.push(id);
        if let Some(parent_branch) = parent.and_then(|p| self.arena.get_mut(p)) {
            parent_branch.children.push(id);
        }
        Ok(id)
    }

    /// Remove a branch; its children move up to the removed branch's parent.
    pub fn delete_branch(&mut self, id: BranchId) -> Result<Branch> {
        let removed = self
            .arena
            .remove(id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown branch {id:?}")))?;
        self.order.retain(|&o| o != id);

        for &child in &removed.children {
            if let Some(c) = self.arena.get_mut(child) {
                c.parent = removed.parent;
            }
        }
        if let Some(parent) = removed.parent.and_then(|p| self.arena.get_mut(p)) {
            let slot = parent.children.iter().position(|&c| c == id);
            let insert_at = match slot {
                Some(pos) => {
                    parent.children.remove(pos);
                    pos
                }
                None => parent.children.len(),
            };
            for (offset, &child) in removed.children.iter().enumerate() {
                parent.children.insert(insert_at + offset, child);
            }
        }
        Ok(removed)
    }

    /// Remove every branch deeper than `max_generation`. Returns how many
    /// branches were removed.
    #[instrument(level = "debug", skip(self))]
    pub fn prune_generations(&mut self, max_generation: usize) -> usize {
        let doomed: Vec<BranchId> = self
            .order
            .iter()
            .copied()
            .filter(|&id| self.generation(id).map_or(true, |g| g > max_generation))
            .collect();
        for &id in &doomed {
            if let Some(branch) = self.arena.remove(id) {
                if let Some(parent) = branch.parent.and_then(|p| self.arena.get_mut(p)) {
                    parent.children.retain(|&c| c != id);
                }
            }
        }
        self.order.retain(|id| self.arena.contains(*id));
        debug!(removed = doomed.len(), remaining = self.len(), "pruned branch generations");
        doomed.len()
    }

    /// Replace a branch's positions wholesale. The length must not change;
    /// orientations are recomputed.
    pub fn set_positions(&mut self, id: BranchId, positions: Vec<Point3<f64>>) -> Result<()> {
        let branch = self
            .arena
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown branch {id:?}")))?;
        if positions.len() != branch.len() {
            return Err(Error::InvalidInput(format!(
                "Replacement has {} positions, branch has {}",
                positions.len(),
                branch.len()
            )));
        }
        branch.replace_positions(positions);
        Ok(())
    }

    pub fn calculate_orientations(&mut self) {
        for (_, branch) in self.arena.iter_mut() {
            branch.compute_orientations();
        }
    }

    pub fn smooth_orientations(&mut self) {
        for (_, branch) in self.arena.iter_mut() {
            branch.smooth_orientations();
        }
    }

    /// Concatenate every branch (insertion order) into parallel arrays.
    pub fn flatten(&self) -> OrientedPoints {
        let mut out = OrientedPoints::with_capacity(self.total_points());
        for (_, branch) in self.iter() {
            out.extend_from(branch.positions(), branch.orientations());
        }
        out
    }

    /// Closest branch position to `point`: `(branch, index, distance)`.
    pub fn find_closest_point(&self, point: &Point3<f64>) -> Option<(BranchId, usize, f64)> {
        let mut best: Option<(BranchId, usize, f64)> = None;
        for (id, branch) in self.iter() {
            if let Some(i) = branch.nearest_index(point) {
                let d = (branch.positions()[i] - point).norm();
                if best.map_or(true, |(_, _, bd)| d < bd) {
                    best = Some((id, i, d));
                }
            }
        }
        best
    }

    /// Keep only the positions for which `keep` holds; branches left empty
    /// are deleted.
    pub fn retain_points<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Point3<f64>) -> bool,
    {
        let mut emptied = Vec::new();
        for &id in &self.order {
            if let Some(branch) = self.arena.get_mut(id) {
                branch.retain_positions(&mut keep);
                if branch.is_empty() {
                    emptied.push(id);
                }
            }
        }
        for id in emptied {
            // ids come from `order`, so deletion cannot fail
            let _ = self.delete_branch(id);
        }
    }

    /// Split `id` at `at`: the branch keeps `positions[..at]`, a new child
    /// takes `positions[at..]` together with all former children.
    pub(crate) fn split_branch(&mut self, id: BranchId, at: usize) -> Result<BranchId> {
        let branch = self
            .arena
            .get_mut(id)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown branch {id:?}")))?;
        if at == 0 || at >= branch.len() {
            return Err(Error::InvalidInput(format!(
                "Split index {at} outside branch of length {}",
                branch.len()
            )));
        }
        let mut tail = branch.split_off(at);
        let inherited = std::mem::take(&mut branch.children);
        tail.parent = Some(id);
        tail.children = inherited.clone();

        let tail_id = self.arena.insert(tail);
        self.order.push(tail_id);
        for child in inherited {
            if let Some(c) = self.arena.get_mut(child) {
                c.parent = Some(tail_id);
            }
        }
        if let Some(head) = self.arena.get_mut(id) {
            head.children.push(tail_id);
        }
        Ok(tail_id)
    }

    pub(crate) fn replace_positions_unchecked(&mut self, id: BranchId, positions: Vec<Point3<f64>>) {
        if let Some(branch) = self.arena.get_mut(id) {
            branch.replace_positions(positions);
        }
    }
}
