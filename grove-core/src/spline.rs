//! Smooth center curves through single-child chains.
//!
//! A chain of segments is turned into one cubic Hermite spline through the
//! segment endpoints. Interior tangents follow Catmull-Rom, so the curve is
//! continuous in position and tangent at every point where one span hands
//! over to the next. The first tangent is the chain's departure direction,
//! which keeps a child curve tangent to the fan direction it left along.

use crate::{skeleton::Skeleton, types::SegmentId};
use glam::{Quat, Vec3};

/// Hermite curve through the endpoints of consecutive segments.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainCurve {
    points: Vec<Vec3>,
    tangents: Vec<Vec3>,
}

impl ChainCurve {
    /// Curve through `points` with explicit end tangents.
    ///
    /// Tangents carry magnitude; a tangent as long as its span gives a
    /// natural-looking bend. Fewer than two points yield a degenerate curve
    /// that stays at the single point.
    pub fn new(points: Vec<Vec3>, start_tangent: Vec3, end_tangent: Vec3) -> Self {
        let n = points.len();
        let tangents = (0..n)
            .map(|i| match i {
                0 => start_tangent,
                i if i + 1 == n => end_tangent,
                i => (points[i + 1] - points[i - 1]) * 0.5,
            })
            .collect();
        Self { points, tangents }
    }

    /// Curve through a chain of segment ids from [`Skeleton::chains`].
    pub fn from_chain(skeleton: &Skeleton, chain: &[SegmentId]) -> Self {
        let start = chain.first().map_or(Vec3::ZERO, |&id| skeleton.segments[id].start);
        Self::from_chain_at(skeleton, chain, start)
    }

    /// Like [`ChainCurve::from_chain`], but the curve begins at `start`
    /// instead of the first segment's start point.
    pub fn from_chain_at(skeleton: &Skeleton, chain: &[SegmentId], start: Vec3) -> Self {
        let mut points: Vec<Vec3> = chain.iter().map(|&id| skeleton.segments[id].start).collect();
        let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
            return Self::new(points, Vec3::ZERO, Vec3::ZERO);
        };
        points[0] = start;
        let first = &skeleton.segments[first];
        let last = &skeleton.segments[last];
        points.push(last.end);

        let first_len = points[0].distance(points[1]);
        Self::new(
            points,
            first.departure * first_len,
            last.direction() * last.length(),
        )
    }

    /// Number of spans, one per segment.
    pub fn span_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn control_point(&self, i: usize) -> Vec3 {
        self.points[i]
    }

    pub fn span_length(&self, span: usize) -> f32 {
        self.points[span].distance(self.points[span + 1])
    }

    /// Position on `span` at parameter `t` in `0..=1`.
    pub fn point(&self, span: usize, t: f32) -> Vec3 {
        if self.span_count() == 0 {
            return self.points.first().copied().unwrap_or(Vec3::ZERO);
        }
        let (p0, p1, m0, m1) = self.span(span);
        let t2 = t * t;
        let t3 = t2 * t;
        p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
            + m0 * (t3 - 2.0 * t2 + t)
            + p1 * (-2.0 * t3 + 3.0 * t2)
            + m1 * (t3 - t2)
    }

    /// Unit tangent on `span` at parameter `t`.
    ///
    /// Falls back to the span chord where the derivative vanishes.
    pub fn tangent(&self, span: usize, t: f32) -> Vec3 {
        if self.span_count() == 0 {
            return Vec3::Y;
        }
        let (p0, p1, m0, m1) = self.span(span);
        let t2 = t * t;
        let d = p0 * (6.0 * t2 - 6.0 * t)
            + m0 * (3.0 * t2 - 4.0 * t + 1.0)
            + p1 * (-6.0 * t2 + 6.0 * t)
            + m1 * (3.0 * t2 - 2.0 * t);
        d.try_normalize()
            .or_else(|| (p1 - p0).try_normalize())
            .unwrap_or(Vec3::Y)
    }

    fn span(&self, span: usize) -> (Vec3, Vec3, Vec3, Vec3) {
        let i = span.min(self.span_count() - 1);
        (
            self.points[i],
            self.points[i + 1],
            self.tangents[i],
            self.tangents[i + 1],
        )
    }
}

/// Orthonormal frame along a curve.
///
/// `binormal = tangent × normal`, so walking `normal → binormal` around
/// the tangent is counter-clockwise seen from ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub origin: Vec3,
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl Frame {
    /// Starting frame with an arbitrary normal.
    pub fn initial(origin: Vec3, tangent: Vec3) -> Self {
        Self::with_normal(origin, tangent, tangent.any_orthonormal_vector())
    }

    /// Frame whose normal is `normal` projected off `tangent`.
    pub fn with_normal(origin: Vec3, tangent: Vec3, normal: Vec3) -> Self {
        let tangent = tangent.try_normalize().unwrap_or(Vec3::Y);
        let normal = (normal - tangent * normal.dot(tangent))
            .try_normalize()
            .unwrap_or_else(|| tangent.any_orthonormal_vector());
        Self {
            origin,
            tangent,
            normal,
            binormal: tangent.cross(normal),
        }
    }

    /// Parallel transport to a new point and tangent, so rings do not twist.
    pub fn transported(&self, origin: Vec3, tangent: Vec3) -> Self {
        let tangent = tangent.try_normalize().unwrap_or(self.tangent);
        let rotation = Quat::from_rotation_arc(self.tangent, tangent);
        Self::with_normal(origin, tangent, rotation * self.normal)
    }

    /// Unit radial direction at angle `theta` around the tangent.
    pub fn radial(&self, theta: f32) -> Vec3 {
        self.normal * theta.cos() + self.binormal * theta.sin()
    }
}
