//! Profiles, edges and wires
//!
//! Planar cross-sections used by revolution, and the line/arc edges the 2D
//! fillet works on.

mod fillet;

use glam::{DQuat, DVec2, DVec3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Frame;
use crate::kernel::{CadError, CadResult};

pub use fillet::{FilletResult, fillet_lines};

/// An ordered point sequence describing a planar closed wire
///
/// The profile is closed when its first and last points coincide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier
    pub id: Uuid,
    /// Points in order; a closed profile repeats its first point at the end
    pub points: Vec<DVec3>,
}

impl Profile {
    /// Create a profile from 3D points
    pub fn new(points: Vec<DVec3>) -> Self {
        Self {
            id: Uuid::new_v4(),
            points,
        }
    }

    /// Create a profile from plane coordinates on `plane`
    pub fn from_2d(points: &[DVec2], plane: &Frame) -> Self {
        Self::new(points.iter().map(|p| plane.lift(*p)).collect())
    }

    /// Create a closed profile from a polygon, appending the closing point
    pub fn polygon(points: Vec<DVec3>) -> Self {
        let mut points = points;
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        Self::new(points)
    }

    /// Distance between the first and last point (infinite with fewer than 2 points)
    pub fn closure_gap(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 2 => first.distance(*last),
            _ => f64::INFINITY,
        }
    }

    /// Whether the wire closes on itself within `tolerance`
    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.closure_gap() <= tolerance
    }

    /// The loop's vertices without the closing duplicate and without
    /// consecutive repeats
    pub fn distinct_points(&self, tolerance: f64) -> Vec<DVec3> {
        let mut out: Vec<DVec3> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            if out.last().is_none_or(|last| last.distance(*p) > tolerance) {
                out.push(*p);
            }
        }
        while out.len() > 1 {
            let (first, last) = (out[0], out[out.len() - 1]);
            if first.distance(last) > tolerance {
                break;
            }
            out.pop();
        }
        out
    }

    /// Unit normal of the loop (Newell's method), `None` if degenerate
    ///
    /// The normal follows the right-hand rule for the point order.
    pub fn normal(&self) -> Option<DVec3> {
        let points = &self.points;
        if points.len() < 3 {
            return None;
        }
        let mut n = DVec3::ZERO;
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            n += a.cross(b);
        }
        let length = n.length();
        (length > 1e-12).then(|| n / length)
    }

    /// Whether all points lie in one plane within `tolerance`
    pub fn is_planar(&self, tolerance: f64) -> bool {
        let Some(normal) = self.normal() else {
            return false;
        };
        let origin = self.points[0];
        self.points
            .iter()
            .all(|p| (*p - origin).dot(normal).abs() <= tolerance)
    }
}

/// A bounded curve: straight segment or circular arc
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Edge {
    /// Straight segment
    Line {
        /// Start point
        start: DVec3,
        /// End point
        end: DVec3,
    },
    /// Circular arc running counter-clockwise about `normal` from `start` to `end`
    Arc {
        /// Arc center
        center: DVec3,
        /// Start point (on the circle)
        start: DVec3,
        /// End point (on the circle)
        end: DVec3,
        /// Unit normal of the arc plane
        normal: DVec3,
    },
}

impl Edge {
    /// Straight segment between two points
    pub fn line(start: DVec3, end: DVec3) -> Self {
        Edge::Line { start, end }
    }

    /// Arc around `center` from `start` to `end`, counter-clockwise about `normal`
    pub fn arc(center: DVec3, start: DVec3, end: DVec3, normal: DVec3) -> Self {
        Edge::Arc {
            center,
            start,
            end,
            normal: normal.normalize_or_zero(),
        }
    }

    /// Start point
    pub fn start(&self) -> DVec3 {
        match self {
            Edge::Line { start, .. } | Edge::Arc { start, .. } => *start,
        }
    }

    /// End point
    pub fn end(&self) -> DVec3 {
        match self {
            Edge::Line { end, .. } | Edge::Arc { end, .. } => *end,
        }
    }

    /// Same curve traversed the other way
    pub fn reversed(&self) -> Self {
        match *self {
            Edge::Line { start, end } => Edge::Line {
                start: end,
                end: start,
            },
            Edge::Arc {
                center,
                start,
                end,
                normal,
            } => Edge::Arc {
                center,
                start: end,
                end: start,
                normal: -normal,
            },
        }
    }

    /// Arc radius (`None` for lines)
    pub fn radius(&self) -> Option<f64> {
        match self {
            Edge::Line { .. } => None,
            Edge::Arc { center, start, .. } => Some(center.distance(*start)),
        }
    }

    /// Swept angle of an arc in (0, 2π], zero for lines
    pub fn sweep_angle(&self) -> f64 {
        match *self {
            Edge::Line { .. } => 0.0,
            Edge::Arc {
                center,
                start,
                end,
                normal,
            } => {
                let a = start - center;
                let b = end - center;
                let angle = a.cross(b).dot(normal).atan2(a.dot(b));
                if angle <= 0.0 {
                    angle + std::f64::consts::TAU
                } else {
                    angle
                }
            }
        }
    }

    /// Curve length
    pub fn length(&self) -> f64 {
        match self {
            Edge::Line { start, end } => start.distance(*end),
            Edge::Arc { .. } => self.radius().unwrap_or(0.0) * self.sweep_angle(),
        }
    }

    /// Point at normalized parameter `t` in [0, 1]
    pub fn point_at(&self, t: f64) -> DVec3 {
        match *self {
            Edge::Line { start, end } => start.lerp(end, t),
            Edge::Arc {
                center,
                start,
                normal,
                ..
            } => {
                let rotation = DQuat::from_axis_angle(normal, self.sweep_angle() * t);
                center + rotation * (start - center)
            }
        }
    }

    /// Sample the edge into `segments + 1` points (lines always give their two endpoints)
    pub fn sample(&self, segments: u32) -> Vec<DVec3> {
        match self {
            Edge::Line { start, end } => vec![*start, *end],
            Edge::Arc { .. } => {
                let segments = segments.max(1);
                let mut points: Vec<DVec3> = (0..segments)
                    .map(|i| self.point_at(i as f64 / segments as f64))
                    .collect();
                points.push(self.end());
                points
            }
        }
    }
}

/// A chain of connected edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    edges: Vec<Edge>,
}

impl Wire {
    /// Chain edges into a wire
    ///
    /// Each edge must start where the previous one ends. An edge that is
    /// connected the other way round is reversed.
    pub fn from_edges(edges: Vec<Edge>, tolerance: f64) -> CadResult<Self> {
        if edges.is_empty() {
            return Err(CadError::Geometry {
                operation: "make_wire",
                message: "a wire needs at least one edge".into(),
            });
        }

        let mut chained: Vec<Edge> = Vec::with_capacity(edges.len());
        for (index, edge) in edges.into_iter().enumerate() {
            let Some(previous) = chained.last() else {
                chained.push(edge);
                continue;
            };
            let joint = previous.end();
            if joint.distance(edge.start()) <= tolerance {
                chained.push(edge);
            } else if joint.distance(edge.end()) <= tolerance {
                chained.push(edge.reversed());
            } else if index == 1 && previous.start().distance(edge.start()) <= tolerance {
                // The first edge was given backwards
                let first = previous.reversed();
                chained[0] = first;
                chained.push(edge);
            } else if index == 1 && previous.start().distance(edge.end()) <= tolerance {
                let first = previous.reversed();
                chained[0] = first;
                chained.push(edge.reversed());
            } else {
                return Err(CadError::Geometry {
                    operation: "make_wire",
                    message: format!(
                        "edge {} is not connected to edge {} (gap {:.3e})",
                        index,
                        index - 1,
                        joint.distance(edge.start()).min(joint.distance(edge.end()))
                    ),
                });
            }
        }

        Ok(Self { edges: chained })
    }

    /// Open polyline through `points`
    pub fn polyline(points: &[DVec3]) -> CadResult<Self> {
        let edges = points.windows(2).map(|w| Edge::line(w[0], w[1])).collect();
        Self::from_edges(edges, 0.0)
    }

    /// Edges in order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// First point
    pub fn start(&self) -> DVec3 {
        self.edges[0].start()
    }

    /// Last point
    pub fn end(&self) -> DVec3 {
        self.edges[self.edges.len() - 1].end()
    }

    /// Whether the chain returns to its start
    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.start().distance(self.end()) <= tolerance
    }

    /// Total length
    pub fn length(&self) -> f64 {
        self.edges.iter().map(Edge::length).sum()
    }

    /// Sample the wire into a point chain, `arc_segments` points per full turn of arc
    pub fn sample(&self, arc_segments: u32) -> Vec<DVec3> {
        let mut points = vec![self.start()];
        for edge in &self.edges {
            let steps = ((edge.sweep_angle() / std::f64::consts::TAU) * arc_segments as f64).ceil();
            let sampled = edge.sample(steps.max(1.0) as u32);
            points.extend(sampled.into_iter().skip(1));
        }
        points
    }

    /// Sample the wire into a profile
    pub fn to_profile(&self, arc_segments: u32) -> Profile {
        Profile::new(self.sample(arc_segments))
    }
}
