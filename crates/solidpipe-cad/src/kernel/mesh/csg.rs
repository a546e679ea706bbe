//! BSP-tree constructive solid geometry
//!
//! Boolean operations on closed polygon soups by mutual clipping of BSP trees.
//! Nodes live in a flat arena and every traversal uses an explicit stack, so
//! deeply unbalanced trees (convex shapes produce a chain) cannot overflow.

use super::polygon::{Plane, Polygon, SplitBuckets};
use crate::kernel::BooleanType;

#[derive(Debug, Clone, Default)]
struct Node {
    plane: Option<Plane>,
    polygons: Vec<Polygon>,
    front: Option<usize>,
    back: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Front,
    Back,
}

/// A BSP tree over a polygon soup
#[derive(Debug, Clone)]
pub(crate) struct BspTree {
    nodes: Vec<Node>,
}

impl BspTree {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        let mut tree = Self {
            nodes: vec![Node::default()],
        };
        tree.build(polygons);
        tree
    }

    /// Insert polygons, extending the tree where they fall outside existing leaves
    pub fn build(&mut self, polygons: Vec<Polygon>) {
        let mut stack = vec![(0usize, polygons)];
        while let Some((index, polygons)) = stack.pop() {
            if polygons.is_empty() {
                continue;
            }
            let plane = match self.nodes[index].plane {
                Some(plane) => plane,
                None => {
                    let plane = *polygons[0].plane();
                    self.nodes[index].plane = Some(plane);
                    plane
                }
            };

            let mut buckets = SplitBuckets::default();
            for polygon in polygons {
                polygon.split(&plane, &mut buckets);
            }

            let node = &mut self.nodes[index];
            node.polygons.append(&mut buckets.coplanar_front);
            node.polygons.append(&mut buckets.coplanar_back);

            if !buckets.front.is_empty() {
                let child = self.child(index, Side::Front);
                stack.push((child, buckets.front));
            }
            if !buckets.back.is_empty() {
                let child = self.child(index, Side::Back);
                stack.push((child, buckets.back));
            }
        }
    }

    fn child(&mut self, index: usize, side: Side) -> usize {
        let existing = match side {
            Side::Front => self.nodes[index].front,
            Side::Back => self.nodes[index].back,
        };
        if let Some(child) = existing {
            return child;
        }
        let child = self.nodes.len();
        self.nodes.push(Node::default());
        match side {
            Side::Front => self.nodes[index].front = Some(child),
            Side::Back => self.nodes[index].back = Some(child),
        }
        child
    }

    /// Swap solid space and empty space
    pub fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            node.plane = node.plane.map(|plane| plane.flip());
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` that lie inside this tree's solid
    pub fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut kept = Vec::new();
        let mut stack = vec![(0usize, polygons)];
        while let Some((index, polygons)) = stack.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                kept.extend(polygons);
                continue;
            };

            let mut buckets = SplitBuckets::default();
            for polygon in polygons {
                polygon.split(&plane, &mut buckets);
            }
            let mut front = buckets.front;
            front.append(&mut buckets.coplanar_front);
            let mut back = buckets.back;
            back.append(&mut buckets.coplanar_back);

            match node.front {
                Some(child) => stack.push((child, front)),
                None => kept.extend(front),
            }
            // Without a back child, everything behind is inside
            if let Some(child) = node.back {
                stack.push((child, back));
            }
        }
        kept
    }

    /// Remove every polygon of this tree that lies inside `other`
    pub fn clip_to(&mut self, other: &BspTree) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.nodes.into_iter().flat_map(|node| node.polygons).collect()
    }
}

/// Combine two closed polygon soups
pub(crate) fn combine(a: Vec<Polygon>, b: Vec<Polygon>, op: BooleanType) -> Vec<Polygon> {
    match op {
        BooleanType::Fuse => union(a, b),
        BooleanType::Cut => subtract(a, b),
        BooleanType::Common => intersect(a, b),
    }
}

fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());
    a.into_polygons()
}

fn subtract(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.build(b.into_polygons());
    a.invert();
    a.into_polygons()
}

fn intersect(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut a = BspTree::new(a);
    let mut b = BspTree::new(b);
    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.build(b.into_polygons());
    a.invert();
    a.into_polygons()
}
