//! Biography-driven visual parameters.
//!
//! Longer biographies make a branch glow brighter, grow thicker and
//! longer. The mapping saturates so a very long biography cannot blow up
//! glow, and empty biographies sit on a nonzero floor so every branch
//! stays visible. All outputs are monotonic non-decreasing in length.

use crate::config::ProminenceConfig;
use crate::genealogy::Person;
use crate::seed::hash_str;

/// Normalized per-person parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParams {
    /// Glow intensity, `0..=1`.
    pub glow_intensity: f32,
    /// Color saturation boost, `0..=1`. Fades gently with generation.
    pub color_vibrancy: f32,
    /// Relative branch thickness, `0..=1`.
    pub branch_thickness: f32,
    /// Bioluminescence strength, `0..=1`.
    pub luminance: f32,
    /// Stable hue rotation in degrees, `0..360`.
    pub hue_shift: f32,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self::from_influence(0.0, 0, 0.0, &ProminenceConfig::default())
    }
}

impl VisualParams {
    fn from_influence(
        influence: f32,
        generation: usize,
        hue_shift: f32,
        cfg: &ProminenceConfig,
    ) -> Self {
        let lift = |floor: f32| (floor + (1.0 - floor) * influence).clamp(0.0, 1.0);
        let fade = 1.0 / (1.0 + cfg.generation_falloff * generation as f32);

        Self {
            glow_intensity: lift(cfg.glow_floor),
            color_vibrancy: (lift(cfg.vibrancy_floor) * fade).clamp(0.0, 1.0),
            branch_thickness: lift(cfg.thickness_floor),
            luminance: lift(cfg.luminance_floor),
            hue_shift,
        }
    }
}

/// Biography length in characters, ignoring surrounding whitespace.
pub fn biography_length(person: &Person) -> usize {
    person.biography.trim().chars().count()
}

/// Saturating influence of a biography length, in `0..1`.
pub fn influence(len: usize, cfg: &ProminenceConfig) -> f32 {
    let x = len as f32 / cfg.saturation_length.max(1.0);
    (1.0 - (-2.0 * x).exp()).clamp(0.0, 1.0)
}

/// Derives the visual parameters of one person at a given generation.
pub fn derive(person: &Person, generation: usize, cfg: &ProminenceConfig) -> VisualParams {
    let hue_shift = (hash_str(&person.id) % 360) as f32;
    VisualParams::from_influence(
        influence(biography_length(person), cfg),
        generation,
        hue_shift,
        cfg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_with_bio(len: usize) -> Person {
        Person::new("p", "P").with_biography("x".repeat(len))
    }

    #[test]
    fn empty_biography_sits_on_the_floor() {
        let cfg = ProminenceConfig::default();
        let v = derive(&Person::new("p", "P"), 0, &cfg);
        assert_eq!(v.glow_intensity, cfg.glow_floor);
        assert_eq!(v.branch_thickness, cfg.thickness_floor);
        assert!(v.luminance > 0.0 && v.color_vibrancy > 0.0);
        assert!(v.branch_thickness > v.glow_intensity);
    }

    #[test]
    fn whitespace_does_not_count() {
        let p = Person::new("p", "P").with_biography("  \n\t ");
        assert_eq!(biography_length(&p), 0);
        let p = Person::new("p", "P").with_biography("héllo");
        assert_eq!(biography_length(&p), 5);
    }

    #[test]
    fn influence_saturates() {
        let cfg = ProminenceConfig::default();
        assert_eq!(influence(0, &cfg), 0.0);
        assert!(influence(10, &cfg) < 0.1);
        assert!(influence(1_000, &cfg) > 0.95);
        assert!(influence(usize::MAX / 2, &cfg) <= 1.0);
    }

    #[test]
    fn parameters_are_monotonic_in_length() {
        let cfg = ProminenceConfig::default();
        let mut prev = derive(&person_with_bio(0), 3, &cfg);
        for len in (1..3_000).step_by(7) {
            let v = derive(&person_with_bio(len), 3, &cfg);
            assert!(v.glow_intensity >= prev.glow_intensity, "glow at {len}");
            assert!(v.branch_thickness >= prev.branch_thickness, "thickness at {len}");
            assert!(v.luminance >= prev.luminance, "luminance at {len}");
            assert!(v.color_vibrancy >= prev.color_vibrancy, "vibrancy at {len}");
            prev = v;
        }
    }

    #[test]
    fn outputs_stay_normalized() {
        let cfg = ProminenceConfig::default();
        for len in [0, 1, 50, 500, 5_000, 500_000] {
            for generation in [0, 1, 10, 100] {
                let v = derive(&person_with_bio(len), generation, &cfg);
                for x in [v.glow_intensity, v.color_vibrancy, v.branch_thickness, v.luminance] {
                    assert!((0.0..=1.0).contains(&x));
                }
                assert!((0.0..360.0).contains(&v.hue_shift));
            }
        }
    }

    #[test]
    fn vibrancy_fades_with_generation() {
        let cfg = ProminenceConfig::default();
        let p = person_with_bio(200);
        let near = derive(&p, 0, &cfg);
        let far = derive(&p, 8, &cfg);
        assert!(far.color_vibrancy < near.color_vibrancy);
        assert_eq!(far.glow_intensity, near.glow_intensity);
    }

    #[test]
    fn hue_is_stable_per_id() {
        let cfg = ProminenceConfig::default();
        let a = derive(&Person::new("ada", "Ada"), 0, &cfg);
        let b = derive(&Person::new("ada", "Someone Else").with_biography("long"), 4, &cfg);
        assert_eq!(a.hue_shift, b.hue_shift);
    }
}
