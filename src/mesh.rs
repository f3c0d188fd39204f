use crate::types::{Point, Vector};

/// One frame's triangle soup, rebuilt from empty every frame and handed to
/// the rendering boundary wholesale.
///
/// The three buffers are index-aligned. Every emitted triangle-corner appends
/// a fresh vertex — nothing is shared, so `indices[k] == k` and the index
/// count is always a multiple of 3. The redundancy is deliberate: vertex
/// welding would change vertex counts that downstream compatibility tests
/// depend on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    /// Vertex positions, `[x, y, z]`.
    pub positions: Vec<[f32; 3]>,
    /// Unit vertex normals, index-aligned with `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Triangle vertex indices, three per triangle.
    pub indices: Vec<u32>,
}

impl SurfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one vertex with its normal, recording the index it was
    /// assigned (the vertex count before the append).
    #[inline]
    pub fn push_vertex(&mut self, position: Point, normal: Vector) {
        self.indices.push(self.positions.len() as u32);
        self.positions.push([position.x, position.y, position.z]);
        self.normals.push([normal.x, normal.y, normal.z]);
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Moves `other`'s buffers onto the end of this mesh, shifting its
    /// indices past the vertices already present. Used to merge per-slab
    /// meshes from the parallel scan in slab order.
    pub fn append(&mut self, mut other: SurfaceMesh) {
        let base = self.positions.len() as u32;
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.positions.append(&mut other.positions);
        self.normals.append(&mut other.normals);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_vertex_assigns_sequential_indices() {
        let mut mesh = SurfaceMesh::new();
        for i in 0..6 {
            mesh.push_vertex(Point::new(i as f32, 0.0, 0.0), Vector::y());
        }
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn append_reindexes() {
        let mut a = SurfaceMesh::new();
        let mut b = SurfaceMesh::new();
        for i in 0..3 {
            a.push_vertex(Point::new(i as f32, 0.0, 0.0), Vector::y());
            b.push_vertex(Point::new(0.0, i as f32, 0.0), Vector::x());
        }
        a.append(b);
        assert_eq!(a.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(a.positions[4], [0.0, 1.0, 0.0]);
        assert_eq!(a.normals[5], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn append_empty_is_identity() {
        let mut a = SurfaceMesh::new();
        a.push_vertex(Point::origin(), Vector::z());
        let before = a.clone();
        a.append(SurfaceMesh::new());
        assert_eq!(a, before);
    }
}
