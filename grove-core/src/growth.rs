//! Growing a 3-D skeleton from a genealogy.
//!
//! The walk is depth-first from the root, which sits at the origin and
//! points along +Y. Each person becomes one [`BranchSegment`]:
//!
//! 1. Derive the person's [`VisualParams`] for their generation.
//! 2. Turn the departure direction by a small random rotation from an
//!    RNG seeded with the person's id, add [`GrowthConfig::tropism`],
//!    renormalize, and cap the turn at [`GrowthConfig::max_turn`].
//! 3. Scale length and radius by generation and branch thickness.
//! 4. Compute the departure directions of the children: a gentle
//!    continuation for one child, a symmetric split for two, an even fan
//!    for more.
//!
//! An explicit stack replaces recursion so very deep lineages cannot
//! overflow the call stack. Joints are assembled afterwards from the
//! finished segments.

use crate::{
    config::{GrowthConfig, ProminenceConfig},
    genealogy::{Genealogy, Person},
    prominence::{self, VisualParams},
    seed::{self, PersonRng},
    skeleton::{BranchSegment, Joint, JointBranch, Skeleton},
    types::SegmentId,
};
use glam::{Quat, Vec3};
use rand::Rng;
use std::f32::consts::TAU;

/// Roll between successive splits, so the crown does not grow flat.
const GOLDEN_ANGLE: f32 = 2.399_963;
/// Largest random deviation from the golden-angle roll.
const ROLL_JITTER: f32 = 0.3;
/// `powi` exponent cap; deeper generations are already at the floors.
const MAX_DECAY_EXPONENT: usize = 512;

/// A person waiting to be placed.
struct Pending<'a> {
    person: &'a Person,
    parent: Option<SegmentId>,
    start: Vec3,
    departure: Vec3,
    generation: usize,
    parent_end_radius: f32,
}

/// Grows one segment per person, root first.
///
/// Both configs are sanitized first, so any genealogy that passed
/// [`Genealogy::load`] produces finite, non-degenerate segments.
///
/// ### Parameters
/// - `genealogy` - A validated family tree.
/// - `prominence` - How biographies map to visual weight.
/// - `growth` - Lengths, radii, angles and the seed.
///
/// ### Returns
/// A skeleton with segments in pre-order and one joint per parent of
/// two or more children.
pub fn grow(
    genealogy: &Genealogy,
    prominence: &ProminenceConfig,
    growth: &GrowthConfig,
) -> Skeleton {
    let prominence = prominence.sanitized();
    let cfg = growth.sanitized();

    let mut skeleton = Skeleton::new();
    let mut split_axes: Vec<(SegmentId, Vec3)> = Vec::new();

    let mut stack = vec![Pending {
        person: genealogy.root(),
        parent: None,
        start: Vec3::ZERO,
        departure: Vec3::Y,
        generation: 0,
        parent_end_radius: 0.0,
    }];

    while let Some(p) = stack.pop() {
        let visual = prominence::derive(p.person, p.generation, &prominence);
        let mut rng = seed::person_rng(&p.person.id, cfg.seed);

        let direction = organic_direction(p.departure, &mut rng, &cfg);
        let length = segment_length(p.generation, &visual, &cfg);
        let own = own_radius(p.generation, &visual, &cfg);
        let start_radius = match p.parent {
            None => own,
            Some(_) => lerp(own, p.parent_end_radius, cfg.radius_inheritance),
        };
        let end_radius = (own * cfg.tip_taper).max(cfg.min_radius);
        let end = p.start + direction * length;

        let segment = BranchSegment {
            person_id: p.person.id.clone(),
            generation: p.generation,
            visual,
            start: p.start,
            end,
            departure: p.departure,
            start_radius,
            end_radius,
            parent: p.parent,
            children: Vec::new(),
        };
        let id = match p.parent {
            None => skeleton.add_root(segment),
            Some(parent) => skeleton.add_child(parent, segment),
        };

        let children = genealogy.children_of(&p.person.id);
        let departures = match children.len() {
            0 => Vec::new(),
            1 => vec![continuation(direction, &mut rng, &cfg)],
            n => {
                let axis = split_axis(direction, p.generation, &mut rng);
                split_axes.push((id, axis));
                fan_angles(n, &cfg)
                    .into_iter()
                    .map(|angle| Quat::from_axis_angle(axis, angle) * direction)
                    .collect()
            }
        };

        // Reverse so the first child is placed next and ids stay pre-order.
        for (child, departure) in children.into_iter().zip(departures).rev() {
            stack.push(Pending {
                person: child,
                parent: Some(id),
                start: end,
                departure: departure.try_normalize().unwrap_or(direction),
                generation: p.generation + 1,
                parent_end_radius: end_radius,
            });
        }
    }

    skeleton.joints = split_axes
        .into_iter()
        .map(|(parent, axis)| build_joint(&skeleton, parent, axis))
        .collect();

    log::debug!(
        "grew {} segments with {} joints",
        skeleton.segments.len(),
        skeleton.joints.len()
    );
    skeleton
}

/// Joint at the end of `parent`, widened to fit its children.
fn build_joint(skeleton: &Skeleton, parent: SegmentId, axis: Vec3) -> Joint {
    let seg = &skeleton.segments[parent];
    let children_area: f32 = seg
        .children
        .iter()
        .map(|&c| skeleton.segments[c].start_radius.powi(2))
        .sum();

    Joint {
        parent,
        center: seg.end,
        radius: seg.end_radius.max(children_area.sqrt()),
        exit_direction: seg.direction(),
        axis,
        branches: seg
            .children
            .iter()
            .map(|&c| JointBranch {
                segment: c,
                direction: skeleton.segments[c].departure,
            })
            .collect(),
    }
}

/// Fan angles for `n >= 2` children, from left (positive) to right.
pub fn fan_angles(n: usize, cfg: &GrowthConfig) -> Vec<f32> {
    match n {
        0 | 1 => vec![0.0; n],
        2 => vec![cfg.branch_spread, -cfg.branch_spread],
        _ => {
            let step = cfg.fan_spread / (n - 1) as f32;
            (0..n)
                .map(|i| cfg.fan_spread * 0.5 - i as f32 * step)
                .collect()
        }
    }
}

fn segment_length(generation: usize, visual: &VisualParams, cfg: &GrowthConfig) -> f32 {
    let decay = cfg.length_decay.powi(generation.min(MAX_DECAY_EXPONENT) as i32);
    let length = cfg.base_length * decay * (0.8 + 0.4 * visual.branch_thickness);
    length.clamp(cfg.min_length, cfg.base_length * 2.0)
}

fn own_radius(generation: usize, visual: &VisualParams, cfg: &GrowthConfig) -> f32 {
    let decay = cfg.radius_decay.powi(generation.min(MAX_DECAY_EXPONENT) as i32);
    (cfg.base_radius * decay * visual.branch_thickness).max(cfg.min_radius)
}

/// Perturbed, tropism-biased, turn-capped direction of a segment.
fn organic_direction(departure: Vec3, rng: &mut PersonRng, cfg: &GrowthConfig) -> Vec3 {
    let turned = random_turn(departure, cfg.perturbation, rng);
    let biased = (turned + cfg.tropism).try_normalize().unwrap_or(departure);
    clamp_turn(biased, departure, cfg.max_turn)
}

/// Direction of a single child continuing its parent.
fn continuation(exit: Vec3, rng: &mut PersonRng, cfg: &GrowthConfig) -> Vec3 {
    random_turn(exit, cfg.continuation_wobble, rng)
}

/// Rotates `dir` by up to `max_angle` about a random perpendicular axis.
fn random_turn(dir: Vec3, max_angle: f32, rng: &mut PersonRng) -> Vec3 {
    let axis = random_perpendicular(dir, rng);
    let angle = rng.random_range(-max_angle..=max_angle);
    (Quat::from_axis_angle(axis, angle) * dir).normalize()
}

fn random_perpendicular(dir: Vec3, rng: &mut PersonRng) -> Vec3 {
    let roll = rng.random_range(0.0..TAU);
    Quat::from_axis_angle(dir, roll) * dir.any_orthonormal_vector()
}

fn split_axis(exit: Vec3, generation: usize, rng: &mut PersonRng) -> Vec3 {
    let jitter = rng.random_range(-ROLL_JITTER..=ROLL_JITTER);
    let roll = (generation as f32 * GOLDEN_ANGLE) % TAU + jitter;
    Quat::from_axis_angle(exit, roll) * exit.any_orthonormal_vector()
}

/// Limits the angle between `dir` and `reference` to `max_angle`.
pub fn clamp_turn(dir: Vec3, reference: Vec3, max_angle: f32) -> Vec3 {
    let angle = reference.angle_between(dir);
    if angle <= max_angle {
        return dir;
    }
    let axis = reference
        .cross(dir)
        .try_normalize()
        .unwrap_or_else(|| reference.any_orthonormal_vector());
    (Quat::from_axis_angle(axis, max_angle) * reference).normalize()
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
