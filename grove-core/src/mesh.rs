//! GPU-ready triangle mesh and the builder used to assemble it.

use crate::{
    normal_buffer::NormalBuffer,
    prominence::VisualParams,
    types::{PersonId, SegmentId},
};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use std::{collections::HashMap, ops::Range};

/// One mesh vertex, laid out for direct upload as a vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub glow: f32,
    pub luminance: f32,
    pub vibrancy: f32,
    /// Hue rotation in degrees.
    pub hue: f32,
    /// Index into [`Mesh::owners`].
    pub owner: u32,
}

impl Vertex {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Per-person attributes shared by all vertices of one branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexStyle {
    pub glow: f32,
    pub luminance: f32,
    pub vibrancy: f32,
    pub hue: f32,
    pub owner: u32,
}

impl VertexStyle {
    /// Same style with glow raised by `boost`, saturating at 1.
    pub fn brighter(self, boost: f32) -> Self {
        Self {
            glow: (self.glow + boost).min(1.0),
            ..self
        }
    }
}

/// Bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub center: Vec3,
    pub radius: f32,
}

impl Bounds {
    /// Sphere around the box of `points`; zero-sized when empty.
    pub fn from_points(points: impl IntoIterator<Item = Vec3> + Clone) -> Self {
        let mut iter = points.clone().into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        let center = (min + max) * 0.5;
        let radius = points
            .into_iter()
            .map(|p| p.distance(center))
            .fold(0.0, f32::max);
        Self { center, radius }
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.distance(self.center) <= self.radius * (1.0 + 1e-5) + 1e-6
    }
}

/// How one child tube is bridged onto a joint's parent ring.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamBranch {
    pub segment: SegmentId,
    /// First vertex of the child's starting ring.
    pub child_ring: u32,
    /// Vertices created for the bridge rings.
    pub bridge_vertices: Range<u32>,
    /// Range in [`Mesh::indices`] holding the bridge triangles.
    pub bridge_indices: Range<usize>,
}

/// Which rings a joint connects.
///
/// The parent ring is split into one loop per child by raised chords
/// (the crotch); each child's bridge starts from its own loop.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSeam {
    pub parent: SegmentId,
    /// First vertex of the widened terminal ring of the parent.
    pub parent_ring: u32,
    pub ring_len: u32,
    /// Vertices of the chords between neighbouring children.
    pub crotch_vertices: Range<u32>,
    pub branches: Vec<SeamBranch>,
}

impl JointSeam {
    /// Whether `vertex` lies on the parent ring, the crotch or a child
    /// ring of this seam.
    pub fn is_seam_vertex(&self, vertex: u32) -> bool {
        let on = |start: u32| (start..start + self.ring_len).contains(&vertex);
        on(self.parent_ring)
            || self.crotch_vertices.contains(&vertex)
            || self.branches.iter().any(|b| on(b.child_ring))
    }
}

/// Immutable triangle mesh of a whole grove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    /// Counter-clockwise triangles, three indices each.
    pub indices: Vec<u32>,
    /// Person identifiers referenced by [`Vertex::owner`].
    pub owners: Vec<PersonId>,
    pub bounds: Bounds,
    pub seams: Vec<JointSeam>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Person that owns the given vertex.
    pub fn owner_of(&self, vertex: usize) -> Option<&str> {
        let v = self.vertices.get(vertex)?;
        self.owners.get(v.owner as usize).map(String::as_str)
    }
}

/// Incremental mesh assembly.
///
/// Positions and triangles are collected first; normals are computed
/// once in [`MeshBuilder::finish`] from every triangle that touches a vertex.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    positions: Vec<Vec3>,
    fallback_normals: Vec<Vec3>,
    uvs: Vec<Vec2>,
    styles: Vec<VertexStyle>,
    indices: Vec<u32>,
    owners: Vec<PersonId>,
    owner_lookup: HashMap<PersonId, u32>,
    seams: Vec<JointSeam>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex style of a person, registering them as an owner on first use.
    pub fn style(&mut self, person_id: &str, visual: &VisualParams) -> VertexStyle {
        let owner = match self.owner_lookup.get(person_id) {
            Some(&idx) => idx,
            None => {
                let idx = self.owners.len() as u32;
                self.owners.push(person_id.to_string());
                self.owner_lookup.insert(person_id.to_string(), idx);
                idx
            }
        };
        VertexStyle {
            glow: visual.glow_intensity,
            luminance: visual.luminance,
            vibrancy: visual.color_vibrancy,
            hue: visual.hue_shift,
            owner,
        }
    }

    /// Adds a vertex. `fallback_normal` is used only if no triangle gives
    /// the vertex a usable normal.
    pub fn vertex(
        &mut self,
        position: Vec3,
        fallback_normal: Vec3,
        uv: Vec2,
        style: VertexStyle,
    ) -> u32 {
        let idx = self.positions.len() as u32;
        self.positions.push(position);
        self.fallback_normals.push(fallback_normal);
        self.uvs.push(uv);
        self.styles.push(style);
        idx
    }

    pub fn position(&self, vertex: u32) -> Vec3 {
        self.positions[vertex as usize]
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    /// Connects two closed rings of equal size with quads.
    ///
    /// Both rings must wind counter-clockwise about the direction from
    /// `from` to `to`; the triangles then face outward.
    pub fn strip(&mut self, from: &[u32], to: &[u32]) {
        debug_assert_eq!(from.len(), to.len());
        let n = from.len().min(to.len());
        for j in 0..n {
            let k = (j + 1) % n;
            self.triangle(from[j], from[k], to[k]);
            self.triangle(from[j], to[k], to[j]);
        }
    }

    /// Connects two closed loops of any sizes.
    ///
    /// `from_t` and `to_t` give each vertex's position along its loop as
    /// an increasing fraction starting at 0. The band advances along
    /// whichever loop is behind, so every loop edge ends up in exactly
    /// one triangle. Winding follows [`MeshBuilder::strip`].
    pub fn stitch(&mut self, from: &[u32], from_t: &[f32], to: &[u32], to_t: &[f32]) {
        let (m, n) = (from.len(), to.len());
        if m == 0 || n == 0 {
            return;
        }
        let next = |params: &[f32], i: usize| params.get(i + 1).copied().unwrap_or(1.0);
        let (mut i, mut j) = (0, 0);
        while i < m || j < n {
            if j == n || (i < m && next(from_t, i) <= next(to_t, j)) {
                self.triangle(from[i % m], from[(i + 1) % m], to[j % n]);
                i += 1;
            } else {
                self.triangle(from[i % m], to[(j + 1) % n], to[j % n]);
                j += 1;
            }
        }
    }

    /// Closes a ring with a fan around `apex`.
    ///
    /// With `forward` the fan faces along the ring's winding axis (a tip),
    /// otherwise against it (a base cap).
    pub fn fan(&mut self, ring: &[u32], apex: u32, forward: bool) {
        let n = ring.len();
        for j in 0..n {
            let k = (j + 1) % n;
            if forward {
                self.triangle(ring[j], ring[k], apex);
            } else {
                self.triangle(apex, ring[k], ring[j]);
            }
        }
    }

    pub fn push_seam(&mut self, seam: JointSeam) {
        self.seams.push(seam);
    }

    /// Computes area-weighted normals and freezes the mesh.
    pub fn finish(self) -> Mesh {
        let mut normals = NormalBuffer::with_len(self.positions.len());
        for tri in self.indices.chunks_exact(3) {
            normals.add_triangle(&self.positions, [tri[0], tri[1], tri[2]]);
        }

        let vertices = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let style = self.styles[i];
                Vertex {
                    position: p.to_array(),
                    normal: normals.normal(i, self.fallback_normals[i]).to_array(),
                    uv: self.uvs[i].to_array(),
                    glow: style.glow,
                    luminance: style.luminance,
                    vibrancy: style.vibrancy,
                    hue: style.hue,
                    owner: style.owner,
                }
            })
            .collect();

        Mesh {
            bounds: Bounds::from_points(self.positions.iter().copied()),
            vertices,
            indices: self.indices,
            owners: self.owners,
            seams: self.seams,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn ring(b: &mut MeshBuilder, z: f32, n: usize, style: VertexStyle) -> Vec<u32> {
        (0..n)
            .map(|j| {
                let a = j as f32 / n as f32 * TAU;
                b.vertex(Vec3::new(a.cos(), a.sin(), z), Vec3::ZERO, Vec2::ZERO, style)
            })
            .collect()
    }

    #[test]
    fn vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 13 * 4);
        let mesh = Mesh {
            vertices: vec![Vertex::zeroed(); 3],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        assert_eq!(mesh.vertex_bytes().len(), 3 * 52);
        assert_eq!(mesh.index_bytes().len(), 12);
    }

    #[test]
    fn owners_are_interned() {
        let mut b = MeshBuilder::new();
        let v = VisualParams::default();
        let a = b.style("a", &v);
        let c = b.style("c", &v);
        let a2 = b.style("a", &v);
        assert_eq!(a.owner, a2.owner);
        assert_ne!(a.owner, c.owner);

        b.vertex(Vec3::ZERO, Vec3::Y, Vec2::ZERO, c);
        let mesh = b.finish();
        assert_eq!(mesh.owner_of(0), Some("c"));
        assert_eq!(mesh.owner_of(1), None);
    }

    #[test]
    fn strip_faces_outward() {
        let mut b = MeshBuilder::new();
        let style = b.style("p", &VisualParams::default());
        // Rings wind counter-clockwise about +Z and the strip goes +Z.
        let r0 = ring(&mut b, 0.0, 8, style);
        let r1 = ring(&mut b, 1.0, 8, style);
        b.strip(&r0, &r1);
        let mesh = b.finish();
        assert_eq!(mesh.triangle_count(), 16);
        for v in &mesh.vertices {
            let radial = Vec3::new(v.position[0], v.position[1], 0.0);
            assert!(v.normal().dot(radial) > 0.9);
        }
    }

    #[test]
    fn stitch_uses_every_loop_edge_once() {
        let mut b = MeshBuilder::new();
        let style = b.style("p", &VisualParams::default());
        let r0 = ring(&mut b, 0.0, 5, style);
        let r1 = ring(&mut b, 1.0, 8, style);
        let t = |n: usize| (0..n).map(|i| i as f32 / n as f32).collect::<Vec<_>>();
        b.stitch(&r0, &t(5), &r1, &t(8));
        let mesh = b.finish();
        assert_eq!(mesh.triangle_count(), 13);

        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for [a, b, c] in mesh.triangles() {
            for e in [(a, b), (b, c), (c, a)] {
                *edges.entry(e).or_default() += 1;
            }
        }
        // Directed loop edges appear once, inner edges once each way.
        for r in [&r0, &r1] {
            for j in 0..r.len() {
                let (a, b) = (r[j], r[(j + 1) % r.len()]);
                let used = edges.get(&(a, b)).copied().unwrap_or(0)
                    + edges.get(&(b, a)).copied().unwrap_or(0);
                assert_eq!(used, 1, "loop edge {a}-{b}");
            }
        }
        for (&(a, b), &count) in &edges {
            assert_eq!(count, 1, "edge {a}->{b} repeated");
        }
        for v in &mesh.vertices {
            let radial = Vec3::new(v.position[0], v.position[1], 0.0);
            assert!(v.normal().dot(radial) > 0.5);
        }
    }

    #[test]
    fn fans_face_away_from_the_tube() {
        let mut b = MeshBuilder::new();
        let style = b.style("p", &VisualParams::default());
        let r = ring(&mut b, 0.0, 6, style);
        let base = b.vertex(Vec3::ZERO, -Vec3::Z, Vec2::ZERO, style);
        b.fan(&r, base, false);
        let tip_ring = ring(&mut b, 1.0, 6, style);
        let tip = b.vertex(Vec3::new(0.0, 0.0, 2.0), Vec3::Z, Vec2::ZERO, style);
        b.fan(&tip_ring, tip, true);
        let mesh = b.finish();
        assert!(mesh.vertices[base as usize].normal().dot(-Vec3::Z) > 0.99);
        assert!(mesh.vertices[tip as usize].normal().dot(Vec3::Z) > 0.99);
    }

    #[test]
    fn untouched_vertex_keeps_fallback_normal() {
        let mut b = MeshBuilder::new();
        let style = b.style("p", &VisualParams::default());
        b.vertex(Vec3::ONE, Vec3::X, Vec2::ZERO, style);
        let mesh = b.finish();
        assert_eq!(mesh.vertices[0].normal(), Vec3::X);
    }

    #[test]
    fn bounds_enclose_all_points() {
        let pts = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 3.0, -1.0)];
        let b = Bounds::from_points(pts);
        assert!(pts.iter().all(|p| b.contains(*p)));
        assert_eq!(Bounds::from_points(Vec::<Vec3>::new()), Bounds::default());
    }

    #[test]
    fn brighter_saturates() {
        let s = VertexStyle { glow: 0.95, luminance: 0.0, vibrancy: 0.0, hue: 0.0, owner: 0 };
        assert_eq!(s.brighter(0.2).glow, 1.0);
        assert!((s.brighter(0.01).glow - 0.96).abs() < 1e-6);
    }
}
