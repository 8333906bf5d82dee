//! k-d tree for exact k-nearest-neighbour search
//!
//! One point per node, median split on an axis cycling with depth. Built once,
//! never modified.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{NootoneError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the point in the slice the tree was built from
    pub id: usize,
    /// Euclidean distance to the query
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct KdNode {
    point: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

/// Max-heap entry ordered by squared distance
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist2: f64,
    id: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist2.total_cmp(&other.dist2).then(self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone)]
pub struct KdTree {
    dims: usize,
    /// Row-major point storage, `dims` values per point
    coords: Vec<f64>,
    nodes: Vec<KdNode>,
    root: Option<usize>,
}

impl KdTree {
    /// Build a tree over `points`. All points must share one dimensionality.
    pub fn build<P: AsRef<[f64]>>(points: &[P]) -> Result<Self> {
        let first = points.first().ok_or(NootoneError::EmptyPointSet)?;
        let dims = first.as_ref().len();
        if dims == 0 {
            return Err(NootoneError::EmptyPointSet);
        }

        let mut coords = Vec::with_capacity(points.len() * dims);
        for p in points {
            let p = p.as_ref();
            if p.len() != dims {
                return Err(NootoneError::DimensionMismatch { expected: dims, actual: p.len() });
            }
            coords.extend_from_slice(p);
        }

        let mut tree = Self {
            dims,
            coords,
            nodes: Vec::with_capacity(points.len()),
            root: None,
        };
        let mut ids: Vec<usize> = (0..points.len()).collect();
        tree.root = tree.build_node(&mut ids, 0);
        Ok(tree)
    }

    fn build_node(&mut self, ids: &mut [usize], depth: usize) -> Option<usize> {
        if ids.is_empty() {
            return None;
        }
        let axis = depth % self.dims;
        ids.sort_by(|&a, &b| {
            self.coord(a, axis)
                .total_cmp(&self.coord(b, axis))
                .then(a.cmp(&b))
        });

        let mid = ids.len() / 2;
        let (left_ids, rest) = ids.split_at_mut(mid);
        let Some((&mut point, right_ids)) = rest.split_first_mut() else {
            return None;
        };

        let index = self.nodes.len();
        self.nodes.push(KdNode { point, axis, left: None, right: None });
        let left = self.build_node(left_ids, depth + 1);
        let right = self.build_node(right_ids, depth + 1);
        self.nodes[index].left = left;
        self.nodes[index].right = right;
        Some(index)
    }

    fn coord(&self, id: usize, axis: usize) -> f64 {
        self.coords[id * self.dims + axis]
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Coordinates of the point with the given id.
    pub fn point(&self, id: usize) -> &[f64] {
        &self.coords[id * self.dims..(id + 1) * self.dims]
    }

    /// The `k` closest points, nearest first.
    pub fn knn(&self, target: &[f64], k: usize) -> Result<Vec<Neighbor>> {
        if target.len() != self.dims {
            return Err(NootoneError::DimensionMismatch { expected: self.dims, actual: target.len() });
        }
        let mut best = BinaryHeap::with_capacity(k + 1);
        if k > 0 {
            self.search(self.root, target, k, &mut best);
        }

        let mut found = best.into_sorted_vec();
        found.truncate(k);
        Ok(found
            .into_iter()
            .map(|c| Neighbor { id: c.id, distance: c.dist2.sqrt() })
            .collect())
    }

    pub fn nearest(&self, target: &[f64]) -> Result<Neighbor> {
        self.knn(target, 1)?
            .into_iter()
            .next()
            .ok_or(NootoneError::EmptyPointSet)
    }

    fn search(&self, node: Option<usize>, target: &[f64], k: usize, best: &mut BinaryHeap<Candidate>) {
        let Some(index) = node else { return };
        let node = &self.nodes[index];

        let dist2 = squared_distance(self.point(node.point), target);
        best.push(Candidate { dist2, id: node.point });
        if best.len() > k {
            best.pop();
        }

        let diff = target[node.axis] - self.coord(node.point, node.axis);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        self.search(near, target, k, best);

        // The far side can only hold a closer point if the splitting plane is
        // nearer than the current worst kept neighbour.
        let worst = best.peek().map_or(f64::INFINITY, |c| c.dist2);
        if best.len() < k || diff * diff < worst {
            self.search(far, target, k, best);
        }
    }
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
