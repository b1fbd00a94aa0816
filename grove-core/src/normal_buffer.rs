use glam::Vec3;

/// A temporary buffer that accumulates face normals per vertex.
///
/// For each vertex index, this buffer stores:
///
/// - The sum of the unnormalized normals of every triangle touching it.
/// - The number of triangles that contributed.
///
/// Unnormalized cross products are proportional to triangle area, so
/// large faces weigh more than slivers when the sum is normalized.
#[derive(Debug)]
pub struct NormalBuffer {
    /// Accumulated (area-weighted) normals for each vertex.
    sum: Vec<Vec3>,
    /// Number of contributing triangles for each vertex.
    count: Vec<u32>,
}

impl NormalBuffer {
    /// Creates a zeroed buffer for `len` vertices.
    pub fn with_len(len: usize) -> Self {
        Self {
            sum: vec![Vec3::ZERO; len],
            count: vec![0; len],
        }
    }

    /// Adds the normal of triangle `(a, b, c)` to its three corners.
    ///
    /// The normal follows counter-clockwise winding: `(pb - pa) × (pc - pa)`.
    ///
    /// ### Parameters
    /// - `positions` - Vertex positions the indices refer to.
    /// - `[a, b, c]` - Triangle corners.
    ///
    /// ### Panics
    /// Panics if a corner is out of bounds for `positions` or the buffer.
    pub fn add_triangle(&mut self, positions: &[Vec3], [a, b, c]: [u32; 3]) {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        for v in [a, b, c] {
            self.sum[v] += n;
            self.count[v] += 1;
        }
    }

    /// Unit normal of a vertex, or `fallback` when nothing usable
    /// was accumulated (untouched or only degenerate triangles).
    #[inline]
    pub fn normal(&self, vertex: usize, fallback: Vec3) -> Vec3 {
        if self.count[vertex] == 0 {
            return fallback;
        }
        self.sum[vertex].try_normalize().unwrap_or(fallback)
    }
}
