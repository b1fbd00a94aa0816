use crate::prominence::VisualParams;
use crate::types::{PersonId, SegmentId};
use glam::Vec3;

/// The grown line segment of one person.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSegment {
    pub person_id: PersonId,
    pub generation: usize,
    pub visual: VisualParams,
    pub start: Vec3,
    pub end: Vec3,
    /// Unit tangent at `start`: the direction the segment left its parent along.
    pub departure: Vec3,
    pub start_radius: f32,
    pub end_radius: f32,
    pub parent: Option<SegmentId>,
    pub children: Vec<SegmentId>,
}

impl BranchSegment {
    /// Unit chord direction, falling back to the departure direction.
    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).try_normalize().unwrap_or(self.departure)
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    pub fn midpoint(&self) -> Vec3 {
        self.start.lerp(self.end, 0.5)
    }

    pub fn max_radius(&self) -> f32 {
        self.start_radius.max(self.end_radius)
    }
}

/// One child leaving a joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointBranch {
    pub segment: SegmentId,
    /// Fan direction before the child's own organic perturbation.
    pub direction: Vec3,
}

/// Where a segment splits into two or more children.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub parent: SegmentId,
    pub center: Vec3,
    /// Widened so the children's combined cross-section fits.
    pub radius: f32,
    pub exit_direction: Vec3,
    /// Rotation axis of the fan. Seen with the axis pointing at the viewer
    /// and the exit direction up, positive angles lean left.
    pub axis: Vec3,
    /// Children in stored order, left to right (decreasing angle).
    pub branches: Vec<JointBranch>,
}

impl Joint {
    /// Signed angle of a branch around `axis`, measured from `exit_direction`.
    pub fn branch_angle(&self, branch: &JointBranch) -> f32 {
        let cos = self.exit_direction.dot(branch.direction).clamp(-1.0, 1.0);
        let sign = self.axis.dot(self.exit_direction.cross(branch.direction)).signum();
        sign * cos.acos()
    }
}

/// All segments and joints of a grown genealogy.
///
/// Segment ids are assigned in pre-order, so a parent always has a lower
/// id than its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    pub segments: Vec<BranchSegment>,
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_root(&mut self, segment: BranchSegment) -> SegmentId {
        let id = self.segments.len();
        self.segments.push(BranchSegment {
            parent: None,
            ..segment
        });
        id
    }

    pub fn add_child(&mut self, parent: SegmentId, segment: BranchSegment) -> SegmentId {
        let id: usize = self.segments.len();
        self.segments.push(BranchSegment {
            parent: Some(parent),
            ..segment
        });
        self.segments[parent].children.push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn root(&self) -> Option<&BranchSegment> {
        self.segments.first()
    }

    pub fn find_person(&self, person_id: &str) -> Option<SegmentId> {
        self.segments.iter().position(|s| s.person_id == person_id)
    }

    /// The joint that `segment` ends in, if it has two or more children.
    pub fn joint_of(&self, segment: SegmentId) -> Option<&Joint> {
        self.joints.iter().find(|j| j.parent == segment)
    }

    /// Maximal runs of single-child segments.
    ///
    /// A chain starts at the root or at a joint child, and ends at a
    /// segment with zero or several children. Every segment belongs to
    /// exactly one chain.
    pub fn chains(&self) -> Vec<Vec<SegmentId>> {
        let starts_chain = |id: SegmentId| match self.segments[id].parent {
            None => true,
            Some(p) => self.segments[p].children.len() != 1,
        };

        let mut chains = Vec::new();
        for id in (0..self.segments.len()).filter(|&id| starts_chain(id)) {
            let mut chain = vec![id];
            let mut cur = id;
            while let [only] = self.segments[cur].children.as_slice() {
                chain.push(*only);
                cur = *only;
            }
            chains.push(chain);
        }
        chains
    }
}
