//! Turning a skeleton into one continuous tube mesh.
//!
//! Each chain of single-child segments becomes a single swept tube along
//! its [`ChainCurve`]. Where a segment splits, the parent tube ends in a
//! ring widened to the joint radius. Chords arching across that ring
//! split it into one loop per child, and every child tube is joined to
//! its own loop by a short bridge of interpolated rings. The root is
//! capped at its base and every terminal branch ends in a tapered tip.

use crate::{
    config::MeshConfig,
    mesh::{JointSeam, Mesh, MeshBuilder, SeamBranch, VertexStyle},
    seed,
    skeleton::{BranchSegment, Joint, Skeleton},
    spline::{ChainCurve, Frame},
    types::SegmentId,
};
use glam::{Vec2, Vec3};
use std::{
    collections::HashMap,
    f32::consts::{PI, TAU},
    ops::Range,
};

/// Extra glow at the very tip of a terminal branch.
const TIP_GLOW_BOOST: f32 = 0.15;
/// Fraction of the last span before a joint that stays unswollen.
const BULGE_START: f32 = 0.6;
/// Longest joint offset, as a fraction of the child segment's length.
const MAX_JOINT_OFFSET: f32 = 0.45;

/// One ring of vertices around a curve point.
#[derive(Debug, Clone)]
struct Ring {
    indices: Vec<u32>,
    frame: Frame,
    /// Texture `v` of the ring.
    v: f32,
}

/// A widened parent ring waiting for its children.
#[derive(Debug)]
struct OpenJoint {
    frame: Frame,
    /// One closed loop per child, in joint branch order.
    loops: Vec<Vec<u32>>,
    seam: JointSeam,
}

/// A chord across a joint ring.
///
/// `top` and `bottom` are ring offsets on either side of the split
/// direction; `inner` runs from the top end to the bottom end.
#[derive(Debug)]
struct Chord {
    top: isize,
    bottom: isize,
    inner: Vec<u32>,
}

/// Tessellates every segment of `skeleton` into a single mesh.
///
/// ### Parameters
/// - `skeleton` - Grown segments and joints.
/// - `mesh` - Tessellation settings; sanitized before use.
/// - `seed` - Growth seed, so bark stays fixed per person.
///
/// ### Returns
/// One closed mesh with per-vertex owners and a seam record per joint.
pub fn tessellate(skeleton: &Skeleton, mesh: &MeshConfig, seed: u64) -> Mesh {
    let cfg = mesh.sanitized();
    let mut b = MeshBuilder::new();
    let mut open: HashMap<SegmentId, OpenJoint> = HashMap::new();

    let chains = skeleton.chains();
    for chain in &chains {
        let (Some(&first), Some(&last)) = (chain.first(), chain.last()) else {
            continue;
        };
        let first_seg = &skeleton.segments[first];
        let parent_joint = first_seg.parent.and_then(|p| skeleton.joint_of(p));

        let start = match parent_joint {
            Some(joint) => branch_start(joint, first_seg, &cfg),
            None => first_seg.start,
        };
        let curve = ChainCurve::from_chain_at(skeleton, chain, start);
        let tangent = curve.tangent(0, 0.0);
        let frame = match parent_joint.and_then(|j| open.get(&j.parent)) {
            Some(parent) => parent.frame.transported(start, tangent),
            None => Frame::initial(start, tangent),
        };

        let end_joint = skeleton.joint_of(last);
        let rings = chain_rings(
            &mut b,
            skeleton,
            chain,
            &curve,
            frame,
            end_joint.map(|j| j.radius),
            &cfg,
            seed,
        );
        for pair in rings.windows(2) {
            b.strip(&pair[0].indices, &pair[1].indices);
        }
        let (Some(head), Some(tail)) = (rings.first(), rings.last()) else {
            continue;
        };

        match parent_joint {
            Some(joint) => {
                let slot = joint.branches.iter().position(|br| br.segment == first);
                if let Some(parent) = open.get_mut(&joint.parent)
                    && let Some(from) = slot.and_then(|k| parent.loops.get(k))
                {
                    let style = b.style(&first_seg.person_id, &first_seg.visual);
                    let branch = bridge(&mut b, from, head, first, &cfg, style);
                    parent.seam.branches.push(branch);
                }
            }
            None => base_cap(&mut b, head, skeleton, first),
        }

        match end_joint {
            Some(joint) => {
                let (loops, crotch_vertices) =
                    split_joint_ring(&mut b, tail, joint, skeleton, &cfg);
                let seam = JointSeam {
                    parent: joint.parent,
                    parent_ring: tail.indices[0],
                    ring_len: tail.indices.len() as u32,
                    crotch_vertices,
                    branches: Vec::with_capacity(joint.branches.len()),
                };
                let frame = tail.frame;
                open.insert(joint.parent, OpenJoint { frame, loops, seam });
            }
            None => tip(&mut b, tail, skeleton, last, &cfg),
        }
    }

    let mut seams: Vec<JointSeam> = open.into_values().map(|o| o.seam).collect();
    seams.sort_by_key(|s| s.parent);
    for seam in seams {
        b.push_seam(seam);
    }

    let mesh = b.finish();
    log::debug!(
        "tessellated {} chains into {} vertices and {} triangles",
        chains.len(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    mesh
}

/// Where a joint child's tube begins, a little way out of the joint.
fn branch_start(joint: &Joint, child: &BranchSegment, cfg: &MeshConfig) -> Vec3 {
    let offset = (cfg.joint_offset * joint.radius).min(MAX_JOINT_OFFSET * child.length());
    joint.center + child.departure * offset
}

/// Ring intervals for one span.
pub fn ring_intervals(span_length: f32, cfg: &MeshConfig) -> u32 {
    let wanted = (span_length / cfg.ring_spacing).ceil();
    let wanted = if wanted.is_finite() { wanted.max(0.0) as u32 } else { 0 };
    wanted.clamp(cfg.min_rings_per_span, cfg.max_rings_per_span).max(1)
}

/// Sweeps rings along a chain curve.
///
/// A span owns the ring at its start; only the last span also emits its
/// end ring. `joint_radius` swells the end of the chain into a joint.
#[allow(clippy::too_many_arguments)]
fn chain_rings(
    b: &mut MeshBuilder,
    skeleton: &Skeleton,
    chain: &[SegmentId],
    curve: &ChainCurve,
    mut frame: Frame,
    joint_radius: Option<f32>,
    cfg: &MeshConfig,
    seed: u64,
) -> Vec<Ring> {
    let spans = curve.span_count();
    let mut rings: Vec<Ring> = Vec::new();
    let mut v = 0.0;

    for (s, &id) in chain.iter().enumerate().take(spans) {
        let seg = &skeleton.segments[id];
        let style = b.style(&seg.person_id, &seg.visual);
        let person_seed = seed::person_seed(&seg.person_id, seed);
        let intervals = ring_intervals(curve.span_length(s), cfg);
        let last_span = s + 1 == spans;
        let count = if last_span { intervals + 1 } else { intervals };

        for i in 0..count {
            let t = i as f32 / intervals as f32;
            let center = curve.point(s, t);
            if let Some(prev) = rings.last() {
                v += prev.frame.origin.distance(center) * cfg.uv_scale;
                frame = frame.transported(center, curve.tangent(s, t));
            }

            let mut radius = lerp(seg.start_radius, seg.end_radius, t);
            if last_span && let Some(jr) = joint_radius {
                radius = lerp(radius, jr, smoothstep(BULGE_START, 1.0, t));
            }
            let bark = |j: u32| cfg.bark_displacement * seed::lattice_noise(person_seed, i, j);
            let indices = push_ring(b, &frame, radius, v, cfg.radial_segments, style, bark);
            rings.push(Ring { indices, frame, v });
        }
    }
    rings
}

/// Adds one ring of `n` vertices around `frame`.
///
/// `bark(j)` scales the radius of vertex `j` by `1 + bark(j)`.
fn push_ring(
    b: &mut MeshBuilder,
    frame: &Frame,
    radius: f32,
    v: f32,
    n: u32,
    style: VertexStyle,
    bark: impl Fn(u32) -> f32,
) -> Vec<u32> {
    (0..n)
        .map(|j| {
            let u = j as f32 / n as f32;
            let dir = frame.radial(u * TAU);
            let r = radius * (1.0 + bark(j));
            b.vertex(frame.origin + dir * r, dir, Vec2::new(u, v), style)
        })
        .collect()
}

/// Closes the bottom of the root tube.
fn base_cap(b: &mut MeshBuilder, ring: &Ring, skeleton: &Skeleton, segment: SegmentId) {
    let seg = &skeleton.segments[segment];
    let style = b.style(&seg.person_id, &seg.visual);
    let center = b.vertex(ring.frame.origin, -ring.frame.tangent, Vec2::new(0.5, ring.v), style);
    b.fan(&ring.indices, center, false);
}

/// Tapers the end of a terminal branch into a glowing point.
fn tip(
    b: &mut MeshBuilder,
    ring: &Ring,
    skeleton: &Skeleton,
    segment: SegmentId,
    cfg: &MeshConfig,
) {
    let seg = &skeleton.segments[segment];
    let style = b.style(&seg.person_id, &seg.visual);
    let length = cfg.tip_length * seg.end_radius;
    let n = cfg.radial_segments;
    let steps = cfg.tip_rings + 1;

    let mut prev = ring.indices.clone();
    for k in 1..steps {
        let s = k as f32 / steps as f32;
        let frame = Frame {
            origin: ring.frame.origin + ring.frame.tangent * (length * s),
            ..ring.frame
        };
        let radius = seg.end_radius * (1.0 - smoothstep(0.0, 1.0, s));
        let v = ring.v + length * s * cfg.uv_scale;
        let next = push_ring(b, &frame, radius, v, n, style, |_| 0.0);
        b.strip(&prev, &next);
        prev = next;
    }

    let apex = b.vertex(
        ring.frame.origin + ring.frame.tangent * length,
        ring.frame.tangent,
        Vec2::new(0.5, ring.v + length * cfg.uv_scale),
        style.brighter(TIP_GLOW_BOOST),
    );
    b.fan(&prev, apex, true);
}

/// Splits the widened end ring at `joint` into one loop per child.
///
/// Neighbouring children are separated by chords across the ring, each
/// arched up toward the children so the crotch between two bridges is
/// a surface of its own. Loops keep the ring's winding and come back in
/// the order of `joint.branches`; the range covers the chord vertices.
fn split_joint_ring(
    b: &mut MeshBuilder,
    ring: &Ring,
    joint: &Joint,
    skeleton: &Skeleton,
    cfg: &MeshConfig,
) -> (Vec<Vec<u32>>, Range<u32>) {
    let n = ring.indices.len();
    let branches = joint.branches.len();
    let first_vertex = b.vertex_count();
    let (Some(first), Some(last)) = (joint.branches.first(), joint.branches.last()) else {
        return (Vec::new(), first_vertex..first_vertex);
    };
    if n < 3 || branches < 2 {
        return (vec![ring.indices.clone(); branches], first_vertex..first_vertex);
    }

    let frame = &ring.frame;
    let (t, c, radius) = (frame.tangent, frame.origin, joint.radius);
    let flat = |d: Vec3| (d - t * d.dot(t)).try_normalize();
    // Points from the last child's side of the ring toward the first's.
    let u = flat(first.direction - last.direction)
        .or_else(|| flat(first.direction))
        .unwrap_or(frame.normal);
    let j0 = ring_shift(frame, u, n) as isize;
    let at = |offset: isize| ring.indices[(j0 + offset).rem_euclid(n as isize) as usize];

    let lift = joint
        .branches
        .iter()
        .map(|br| (branch_start(joint, &skeleton.segments[br.segment], cfg) - c).dot(t))
        .fold(f32::INFINITY, f32::min);
    let lift = if lift.is_finite() { (0.5 * lift).clamp(0.0, radius) } else { 0.0 };

    let parent = &skeleton.segments[joint.parent];
    let style = b.style(&parent.person_id, &parent.visual);
    let (half_top, half_bottom) = (n / 2, n - n / 2);
    let steps = (n / 4).max(1);

    let chords: Vec<Chord> = (1..branches)
        .map(|k| {
            let f = k as f32 / branches as f32;
            let top = ((f * half_top as f32).round() as usize).min(half_top) as isize;
            let bottom = ((f * half_bottom as f32).round() as usize)
                .clamp(1, half_bottom.saturating_sub(1).max(1)) as isize;
            let (pt, pb) = (b.position(at(top)), b.position(at(-bottom)));
            let across = radius * (PI * f).cos();
            let inner = (1..=steps)
                .map(|i| {
                    let g = i as f32 / (steps + 1) as f32;
                    let arch = (PI * g).sin();
                    let mut p = pt.lerp(pb, g);
                    p += u * ((across - (p - c).dot(u)) * arch);
                    p += t * (lift * arch);
                    b.vertex(p, t, Vec2::new(0.5, ring.v), style)
                })
                .collect();
            Chord { top, bottom, inner }
        })
        .collect();

    let arc = |from: isize, to: isize| (from..=to).map(at);
    let mut loops = Vec::with_capacity(branches);
    if let (Some(lo), Some(hi)) = (chords.first(), chords.last()) {
        loops.push(arc(-lo.bottom, lo.top).chain(lo.inner.iter().copied()).collect());
        for pair in chords.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            loops.push(
                arc(lo.top, hi.top)
                    .chain(hi.inner.iter().copied())
                    .chain(arc(-hi.bottom, -lo.bottom))
                    .chain(lo.inner.iter().rev().copied())
                    .collect(),
            );
        }
        loops.push(
            arc(hi.top, n as isize - hi.bottom)
                .chain(hi.inner.iter().rev().copied())
                .collect(),
        );
    }
    (loops, first_vertex..b.vertex_count())
}

/// Joins a child's first ring onto its loop of the parent ring.
///
/// The loop is resampled by arc length, so bridge ring vertex `j` blends
/// the loop point at `j / n` of the way round into the child vertex
/// pointing the same way as the loop's first vertex, plus `j`.
fn bridge(
    b: &mut MeshBuilder,
    from: &[u32],
    child: &Ring,
    segment: SegmentId,
    cfg: &MeshConfig,
    style: VertexStyle,
) -> SeamBranch {
    let n = child.indices.len();
    let m = from.len();
    let first_vertex = b.vertex_count();
    let first_index = b.index_count();
    let points: Vec<Vec3> = from.iter().map(|&i| b.position(i)).collect();

    let mut walked = 0.0;
    let mut from_t = Vec::with_capacity(m);
    for i in 0..m {
        from_t.push(walked);
        walked += points[i].distance(points[(i + 1) % m]);
    }
    if walked > f32::EPSILON {
        from_t.iter_mut().for_each(|d| *d /= walked);
    } else {
        from_t = (0..m).map(|i| i as f32 / m as f32).collect();
    }
    let sample = |s: f32| {
        let i = from_t.partition_point(|&p| p <= s).saturating_sub(1);
        let end = from_t.get(i + 1).copied().unwrap_or(1.0);
        let local = ((s - from_t[i]) / (end - from_t[i]).max(f32::EPSILON)).clamp(0.0, 1.0);
        points[i].lerp(points[(i + 1) % m], local)
    };

    let lc = points.iter().copied().sum::<Vec3>() / m.max(1) as f32;
    let cc = child.frame.origin;
    let shift = points.first().map_or(0, |&p| ring_shift(&child.frame, p - lc, n));
    let target: Vec<u32> = (0..n).map(|j| child.indices[(j + shift) % n]).collect();
    let ring_t: Vec<f32> = (0..n).map(|j| j as f32 / n as f32).collect();
    let gap = lc.distance(cc) * cfg.uv_scale;

    let mut prev = (from.to_vec(), from_t.clone());
    for k in 1..=cfg.joint_rings {
        let w = smoothstep(0.0, 1.0, k as f32 / (cfg.joint_rings + 1) as f32);
        let center = lc.lerp(cc, w);
        let ring: Vec<u32> = (0..n)
            .map(|j| {
                let u = ((j + shift) % n) as f32 / n as f32;
                let rp = if m > 0 { sample(ring_t[j]) - lc } else { Vec3::ZERO };
                let rq = b.position(target[j]) - cc;
                let dir = rp
                    .normalize_or_zero()
                    .lerp(rq.normalize_or_zero(), w)
                    .try_normalize()
                    .unwrap_or(child.frame.radial(u * TAU));
                let radius = lerp(rp.length(), rq.length(), w);
                b.vertex(center + dir * radius, dir, Vec2::new(u, (w - 1.0) * gap), style)
            })
            .collect();
        b.stitch(&prev.0, &prev.1, &ring, &ring_t);
        prev = (ring, ring_t.clone());
    }
    b.stitch(&prev.0, &prev.1, &target, &ring_t);

    SeamBranch {
        segment,
        child_ring: child.indices[0],
        bridge_vertices: first_vertex..b.vertex_count(),
        bridge_indices: first_index..b.index_count(),
    }
}

/// Index of the ring vertex whose radial direction is closest to `toward`.
fn ring_shift(frame: &Frame, toward: Vec3, n: usize) -> usize {
    let reach = |j: usize| frame.radial(j as f32 / n as f32 * TAU).dot(toward);
    (0..n).max_by(|&a, &b| reach(a).total_cmp(&reach(b))).unwrap_or(0)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
