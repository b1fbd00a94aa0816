//! Ray picking against branch capsules.
//!
//! Every segment is represented by a capsule from its start to its end
//! with the larger of its two radii. A bounding-volume hierarchy over the
//! capsule boxes keeps queries logarithmic in the number of segments.

use crate::{skeleton::Skeleton, types::SegmentId};
use glam::{Mat4, Vec2, Vec3};

/// Most capsules in one BVH leaf.
const LEAF_SIZE: usize = 4;
/// Hits closer than this to the ray origin are ignored.
const MIN_T: f32 = 1e-5;
/// Relative distance under which two hits count as a tie.
const TIE_TOLERANCE: f32 = 1e-4;

/// Half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// `None` if `direction` is zero or either vector is not finite.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        if !origin.is_finite() {
            return None;
        }
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }

    /// World ray through a pointer at normalized device coordinates.
    ///
    /// `ndc` is in `-1..=1` with +Y up; depth runs `0..=1` from the near
    /// to the far plane, as produced by [`Mat4::perspective_rh`].
    pub fn from_ndc(ndc: Vec2, inverse_view_projection: &Mat4) -> Option<Self> {
        let near = inverse_view_projection.project_point3(ndc.extend(0.0));
        let far = inverse_view_projection.project_point3(ndc.extend(1.0));
        Self::new(near, far - near)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Ray parameter where the ray enters the box, if it does before `t_max`.
    pub fn entry(&self, ray: &Ray, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let t0 = (self.min - ray.origin) * inv_dir;
        let t1 = (self.max - ray.origin) * inv_dir;
        let t_enter = t0.min(t1).max_element().max(0.0);
        let t_exit = t0.max(t1).min_element().min(t_max);
        (t_enter <= t_exit).then_some(t_enter)
    }
}

/// Pickable volume of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
    pub segment: SegmentId,
    pub generation: usize,
}

impl Capsule {
    pub fn aabb(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb {
            min: self.a.min(self.b) - r,
            max: self.a.max(self.b) + r,
        }
    }

    /// Smallest positive ray parameter on the capsule surface.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut best: Option<f32> = None;
        let mut consider = |t: f32| {
            if t > MIN_T && t.is_finite() && best.is_none_or(|b| t < b) {
                best = Some(t);
            }
        };

        let ba = self.b - self.a;
        let oa = ray.origin - self.a;
        let baba = ba.dot(ba);
        let r2 = self.radius * self.radius;

        // Cylinder body, kept only between the two end planes.
        if baba > f32::EPSILON {
            let bard = ba.dot(ray.direction);
            let baoa = ba.dot(oa);
            let qa = baba - bard * bard;
            let qb = baba * ray.direction.dot(oa) - baoa * bard;
            let qc = baba * oa.dot(oa) - baoa * baoa - r2 * baba;
            let h = qb * qb - qa * qc;
            if qa > f32::EPSILON && h >= 0.0 {
                let s = h.sqrt();
                for t in [(-qb - s) / qa, (-qb + s) / qa] {
                    let y = baoa + t * bard;
                    if y >= 0.0 && y <= baba {
                        consider(t);
                    }
                }
            }
        }

        for center in [self.a, self.b] {
            if let Some((t0, t1)) = sphere_roots(ray, center, r2) {
                consider(t0);
                consider(t1);
            }
        }
        best
    }
}

fn sphere_roots(ray: &Ray, center: Vec3, r2: f32) -> Option<(f32, f32)> {
    let oc = ray.origin - center;
    let b = ray.direction.dot(oc);
    let c = oc.dot(oc) - r2;
    let h = b * b - c;
    if h < 0.0 {
        return None;
    }
    let s = h.sqrt();
    Some((-b - s, -b + s))
}

/// Result of a successful pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub segment: SegmentId,
    /// Ray parameter of the hit; world distance for a unit ray.
    pub distance: f32,
    pub point: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BvhNode {
    Leaf { bounds: Aabb, start: usize, count: usize },
    Inner { bounds: Aabb, left: usize, right: usize },
}

impl BvhNode {
    fn bounds(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { bounds, .. } | BvhNode::Inner { bounds, .. } => bounds,
        }
    }
}

/// Bounding-volume hierarchy of segment capsules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PickingIndex {
    capsules: Vec<Capsule>,
    /// Capsule indices in leaf order.
    order: Vec<usize>,
    nodes: Vec<BvhNode>,
}

impl PickingIndex {
    /// Builds one capsule per segment and a hierarchy over them.
    pub fn build(skeleton: &Skeleton) -> Self {
        let capsules: Vec<Capsule> = skeleton
            .segments
            .iter()
            .enumerate()
            .map(|(id, s)| Capsule {
                a: s.start,
                b: s.end,
                radius: s.max_radius(),
                segment: id,
                generation: s.generation,
            })
            .collect();
        Self::from_capsules(capsules)
    }

    pub fn from_capsules(capsules: Vec<Capsule>) -> Self {
        let mut order: Vec<usize> = (0..capsules.len()).collect();
        let mut nodes = Vec::new();
        if !capsules.is_empty() {
            build_node(&capsules, &mut order, 0, &mut nodes);
        }
        log::debug!(
            "picking index: {} capsules in {} nodes",
            capsules.len(),
            nodes.len()
        );
        Self {
            capsules,
            order,
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.capsules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capsules.is_empty()
    }

    pub fn capsules(&self) -> &[Capsule] {
        &self.capsules
    }

    /// Nearest capsule hit by the ray from `origin` along `direction`.
    ///
    /// Hits within a small relative distance of each other are resolved
    /// to the deeper generation, then to the later segment.
    pub fn pick(&self, origin: Vec3, direction: Vec3) -> Option<PickHit> {
        self.pick_ray(&Ray::new(origin, direction)?)
    }

    /// Walks the BVH for the nearest capsule along `ray`.
    ///
    /// ### Parameters
    /// - `ray` - World-space ray with a unit direction.
    ///
    /// ### Returns
    /// The winning hit, or `None` if the ray misses every capsule or the
    /// index is empty.
    pub fn pick_ray(&self, ray: &Ray) -> Option<PickHit> {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_dir = ray.direction.recip();
        let mut best: Option<(f32, &Capsule)> = None;
        let mut stack = vec![0usize];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            let limit = best.map_or(f32::INFINITY, |(t, _)| t + tie_slack(t));
            if node.bounds().entry(ray, inv_dir, limit).is_none() {
                continue;
            }
            match *node {
                BvhNode::Leaf { start, count, .. } => {
                    for &ci in &self.order[start..start + count] {
                        let capsule = &self.capsules[ci];
                        if let Some(t) = capsule.intersect(ray)
                            && best.is_none_or(|(bt, bc)| beats(t, capsule, bt, bc))
                        {
                            best = Some((t, capsule));
                        }
                    }
                }
                BvhNode::Inner { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best.map(|(t, capsule)| PickHit {
            segment: capsule.segment,
            distance: t,
            point: ray.at(t),
        })
    }

    /// Linear scan with the same ordering rules as [`PickingIndex::pick_ray`].
    pub fn pick_brute_force(&self, ray: &Ray) -> Option<PickHit> {
        let mut best: Option<(f32, &Capsule)> = None;
        for capsule in &self.capsules {
            if let Some(t) = capsule.intersect(ray)
                && best.is_none_or(|(bt, bc)| beats(t, capsule, bt, bc))
            {
                best = Some((t, capsule));
            }
        }
        best.map(|(t, capsule)| PickHit {
            segment: capsule.segment,
            distance: t,
            point: ray.at(t),
        })
    }
}

fn tie_slack(t: f32) -> f32 {
    TIE_TOLERANCE * t.abs().max(1.0)
}

/// Whether a hit at `t` on `c` should replace the best hit so far.
fn beats(t: f32, c: &Capsule, best_t: f32, best: &Capsule) -> bool {
    if (t - best_t).abs() <= tie_slack(t.max(best_t)) {
        (c.generation, c.segment) > (best.generation, best.segment)
    } else {
        t < best_t
    }
}

fn build_node(
    capsules: &[Capsule],
    order: &mut [usize],
    offset: usize,
    nodes: &mut Vec<BvhNode>,
) -> usize {
    let bounds = order
        .iter()
        .fold(Aabb::EMPTY, |acc, &i| acc.union(capsules[i].aabb()));
    let idx = nodes.len();

    if order.len() <= LEAF_SIZE {
        nodes.push(BvhNode::Leaf {
            bounds,
            start: offset,
            count: order.len(),
        });
        return idx;
    }

    let centroids = order
        .iter()
        .fold(Aabb::EMPTY, |acc, &i| {
            let c = capsules[i].aabb().centroid();
            acc.union(Aabb { min: c, max: c })
        });
    let extent = centroids.max - centroids.min;
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };

    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        let ca = capsules[a].aabb().centroid()[axis];
        let cb = capsules[b].aabb().centroid()[axis];
        ca.total_cmp(&cb)
    });

    // Placeholder, patched once both children exist.
    nodes.push(BvhNode::Leaf {
        bounds,
        start: offset,
        count: 0,
    });
    let (lo, hi) = order.split_at_mut(mid);
    let left = build_node(capsules, lo, offset, nodes);
    let right = build_node(capsules, hi, offset + mid, nodes);
    nodes[idx] = BvhNode::Inner { bounds, left, right };
    idx
}
