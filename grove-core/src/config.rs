//! Tunable constants for prominence, growth and meshing.
//!
//! Every field has a default and a documented range. [`Config::sanitized`]
//! clamps into those ranges (and replaces non-finite values with the
//! default) before any stage uses the numbers, which is what lets growth
//! and meshing run without error paths.

use crate::error::ConfigError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// How biography length maps to [`crate::prominence::VisualParams`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProminenceConfig {
    /// Characters at which influence reaches `1 - e^-2` (~0.86). Range `1..=100_000`.
    pub saturation_length: f32,
    /// Glow of an empty biography. Range `0.01..=1`.
    pub glow_floor: f32,
    /// Luminance of an empty biography. Range `0.01..=1`.
    pub luminance_floor: f32,
    /// Vibrancy of an empty biography at the root. Range `0.01..=1`.
    pub vibrancy_floor: f32,
    /// Thickness of an empty biography. Range `0.01..=1`.
    pub thickness_floor: f32,
    /// Vibrancy loss per generation. Range `0..=1`.
    pub generation_falloff: f32,
}

impl Default for ProminenceConfig {
    fn default() -> Self {
        Self {
            saturation_length: 500.0,
            glow_floor: 0.2,
            luminance_floor: 0.1,
            vibrancy_floor: 0.3,
            thickness_floor: 0.5,
            generation_falloff: 0.05,
        }
    }
}

/// Shape of the grown skeleton. Angles are in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Mixed into every per-person seed.
    pub seed: u64,
    /// Trunk length before thickness scaling. Range `0.1..=100`.
    pub base_length: f32,
    /// Length multiplier per generation. Range `0.3..=1`.
    pub length_decay: f32,
    /// Shortest allowed segment. Range `0.01..=base_length`.
    pub min_length: f32,
    /// Trunk radius before thickness scaling. Range `0.01..=10`.
    pub base_radius: f32,
    /// Radius multiplier per generation. Range `0.3..=1`.
    pub radius_decay: f32,
    /// Thinnest allowed radius. Range `0.001..=base_radius`.
    pub min_radius: f32,
    /// End radius as a fraction of a segment's own radius. Range `0.1..=1`.
    pub tip_taper: f32,
    /// How much a child's start radius leans toward its parent's end. Range `0..=1`.
    pub radius_inheritance: f32,
    /// Largest random turn applied to each segment. Range `0..=0.5`.
    pub perturbation: f32,
    /// Largest turn of a single child continuing its parent. Range `0..=0.5`.
    pub continuation_wobble: f32,
    /// Half-angle of a two-way split. Range `0.05..=0.9 * max_turn`.
    pub branch_spread: f32,
    /// Total angle of a fan of three or more children. Range `0.1..=1.8 * max_turn`.
    pub fan_spread: f32,
    /// Largest angle between a segment and the direction it departed along. Range `0.2..=1.5`.
    pub max_turn: f32,
    /// Constant bias added to every direction, like the pull of light. Components `-1..=1`.
    pub tropism: Vec3,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_length: 3.0,
            length_decay: 0.78,
            min_length: 0.25,
            base_radius: 0.3,
            radius_decay: 0.72,
            min_radius: 0.015,
            tip_taper: 0.7,
            radius_inheritance: 0.5,
            perturbation: 0.12,
            continuation_wobble: 0.15,
            branch_spread: PI / 5.0,
            fan_spread: 1.6,
            max_turn: 1.2,
            tropism: Vec3::new(0.0, 0.25, 0.0),
        }
    }
}

/// Tessellation of the skeleton into tubes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Vertices per ring. Range `3..=64`.
    pub radial_segments: u32,
    /// Target distance between rings. Range `0.02..=10`.
    pub ring_spacing: f32,
    /// Fewest ring intervals per segment. Range `1..=64`.
    pub min_rings_per_span: u32,
    /// Most ring intervals per segment. Range `min_rings_per_span..=64`.
    pub max_rings_per_span: u32,
    /// Bark bumps as a fraction of the local radius. Range `0..=0.3`.
    pub bark_displacement: f32,
    /// Intermediate rings in each joint bridge. Range `1..=8`.
    pub joint_rings: u32,
    /// How far (in joint radii) a joint child's tube starts from the joint. Range `0..=2`.
    pub joint_offset: f32,
    /// Rings in the tapered tip of a terminal branch. Range `1..=8`.
    pub tip_rings: u32,
    /// Tip length in end radii. Range `0..=5`.
    pub tip_length: f32,
    /// Texture `v` per unit of arc length. Range `0.01..=100`.
    pub uv_scale: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            radial_segments: 12,
            ring_spacing: 0.35,
            min_rings_per_span: 2,
            max_rings_per_span: 12,
            bark_displacement: 0.06,
            joint_rings: 3,
            joint_offset: 0.6,
            tip_rings: 3,
            tip_length: 1.6,
            uv_scale: 0.5,
        }
    }
}

/// All engine tunables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub prominence: ProminenceConfig,
    pub growth: GrowthConfig,
    pub mesh: MeshConfig,
}

impl Config {
    /// Parses a (possibly partial) JSON override; missing fields keep defaults.
    ///
    /// The result is not sanitized; the pipeline does that itself.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns a copy with every field clamped into its documented range.
    pub fn sanitized(&self) -> Self {
        Self {
            prominence: self.prominence.sanitized(),
            growth: self.growth.sanitized(),
            mesh: self.mesh.sanitized(),
        }
    }
}

/// Clamps `v` into `lo..=hi`, falling back to `default` for NaN or infinity.
fn clamp_finite(v: f32, lo: f32, hi: f32, default: f32) -> f32 {
    if v.is_finite() { v.clamp(lo, hi) } else { default }
}

impl ProminenceConfig {
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        Self {
            saturation_length: clamp_finite(
                self.saturation_length,
                1.0,
                100_000.0,
                d.saturation_length,
            ),
            glow_floor: clamp_finite(self.glow_floor, 0.01, 1.0, d.glow_floor),
            luminance_floor: clamp_finite(self.luminance_floor, 0.01, 1.0, d.luminance_floor),
            vibrancy_floor: clamp_finite(self.vibrancy_floor, 0.01, 1.0, d.vibrancy_floor),
            thickness_floor: clamp_finite(self.thickness_floor, 0.01, 1.0, d.thickness_floor),
            generation_falloff: clamp_finite(
                self.generation_falloff,
                0.0,
                1.0,
                d.generation_falloff,
            ),
        }
    }
}

impl GrowthConfig {
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let base_length = clamp_finite(self.base_length, 0.1, 100.0, d.base_length);
        let base_radius = clamp_finite(self.base_radius, 0.01, 10.0, d.base_radius);
        let max_turn = clamp_finite(self.max_turn, 0.2, 1.5, d.max_turn);
        let tropism = if self.tropism.is_finite() {
            self.tropism.clamp(Vec3::splat(-1.0), Vec3::splat(1.0))
        } else {
            d.tropism
        };

        Self {
            seed: self.seed,
            base_length,
            length_decay: clamp_finite(self.length_decay, 0.3, 1.0, d.length_decay),
            min_length: clamp_finite(
                self.min_length,
                0.01,
                base_length,
                d.min_length.min(base_length),
            ),
            base_radius,
            radius_decay: clamp_finite(self.radius_decay, 0.3, 1.0, d.radius_decay),
            min_radius: clamp_finite(
                self.min_radius,
                0.001,
                base_radius,
                d.min_radius.min(base_radius),
            ),
            tip_taper: clamp_finite(self.tip_taper, 0.1, 1.0, d.tip_taper),
            radius_inheritance: clamp_finite(
                self.radius_inheritance,
                0.0,
                1.0,
                d.radius_inheritance,
            ),
            perturbation: clamp_finite(self.perturbation, 0.0, 0.5, d.perturbation),
            continuation_wobble: clamp_finite(
                self.continuation_wobble,
                0.0,
                0.5,
                d.continuation_wobble,
            ),
            branch_spread: clamp_finite(self.branch_spread, 0.05, 0.9 * max_turn, d.branch_spread)
                .min(0.9 * max_turn),
            fan_spread: clamp_finite(self.fan_spread, 0.1, 1.8 * max_turn, d.fan_spread)
                .min(1.8 * max_turn),
            max_turn,
            tropism,
        }
    }
}

impl MeshConfig {
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let min_rings_per_span = self.min_rings_per_span.clamp(1, 64);
        Self {
            radial_segments: self.radial_segments.clamp(3, 64),
            ring_spacing: clamp_finite(self.ring_spacing, 0.02, 10.0, d.ring_spacing),
            min_rings_per_span,
            max_rings_per_span: self.max_rings_per_span.clamp(min_rings_per_span, 64),
            bark_displacement: clamp_finite(self.bark_displacement, 0.0, 0.3, d.bark_displacement),
            joint_rings: self.joint_rings.clamp(1, 8),
            joint_offset: clamp_finite(self.joint_offset, 0.0, 2.0, d.joint_offset),
            tip_rings: self.tip_rings.clamp(1, 8),
            tip_length: clamp_finite(self.tip_length, 0.0, 5.0, d.tip_length),
            uv_scale: clamp_finite(self.uv_scale, 0.01, 100.0, d.uv_scale),
        }
    }
}
