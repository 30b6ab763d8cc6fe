//! Vertex deindexing and deduplication
//!
//! Meshes arrive indexed per-vertex with per-loop attribute layers. Export
//! needs one flat vertex per triangle corner, then merged back down so
//! corners with identical attributes share an index. Merging uses exact
//! structural equality, never an epsilon: positions that differ in the
//! least significant bit stay distinct.

use scenegex_core::{Vec2, Vec3};
use scenegex_scene::Mesh;

/// Hash value substituted for NaN and infinite components so they still
/// land in a stable bucket.
const NON_FINITE_HASH: u64 = 0x7fc0_0000;

const HASH_MULTIPLIER: u64 = 21737;

/// One flattened triangle corner with every exported attribute resolved.
#[derive(Debug, Clone)]
pub struct ExportVertex {
    /// Index of the source mesh vertex this corner came from.
    pub vertex_index: u32,
    /// Index of the source triangle.
    pub face_index: u32,
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec3,
    pub texcoord0: Vec2,
    pub texcoord1: Vec2,
    pub hash: u64,
}

impl ExportVertex {
    fn scalars(&self) -> [f32; 13] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.normal.x,
            self.normal.y,
            self.normal.z,
            self.color.x,
            self.color.y,
            self.color.z,
            self.texcoord0.x,
            self.texcoord0.y,
            self.texcoord1.x,
            self.texcoord1.y,
        ]
    }

    /// Recompute the bucket hash over every attribute scalar.
    pub fn rehash(&mut self) {
        let mut h: u64 = 0;
        for value in self.scalars() {
            h = h.wrapping_mul(HASH_MULTIPLIER).wrapping_add(scalar_hash(value));
        }
        self.hash = h;
    }
}

impl PartialEq for ExportVertex {
    /// Attribute equality only; source indices and hash do not participate.
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.normal == other.normal
            && self.color == other.color
            && self.texcoord0 == other.texcoord0
            && self.texcoord1 == other.texcoord1
    }
}

fn scalar_hash(value: f32) -> u64 {
    if value.is_finite() {
        u64::from(value.to_bits())
    } else {
        NON_FINITE_HASH
    }
}

/// Flatten a triangulated mesh into one `ExportVertex` per triangle corner,
/// in triangle order. Also returns the per-triangle material indices.
///
/// Flat-shaded triangles take the face normal for all three corners; smooth
/// triangles take the per-vertex normals. Colors come from the first
/// per-loop color layer, UVs from up to two per-loop layers; absent layers
/// fall back to white and the origin.
pub fn deindex_mesh(mesh: &Mesh) -> (Vec<ExportVertex>, Vec<usize>) {
    let mut vertices = Vec::with_capacity(mesh.triangles.len() * 3);
    let mut material_table = Vec::with_capacity(mesh.triangles.len());

    for (face_index, tri) in mesh.triangles.iter().enumerate() {
        material_table.push(tri.material_index);
        for corner in 0..3 {
            let vi = tri.vertices[corner] as usize;
            let li = tri.loops[corner] as usize;

            let normal = if tri.smooth { mesh.normals[vi] } else { tri.normal };
            let color = mesh.colors.get(li).copied().unwrap_or(Vec3::ONE);
            let texcoord0 = mesh
                .uv_layers
                .first()
                .and_then(|layer| layer.get(li))
                .copied()
                .unwrap_or(Vec2::ZERO);
            let texcoord1 = mesh
                .uv_layers
                .get(1)
                .and_then(|layer| layer.get(li))
                .copied()
                .unwrap_or(Vec2::ZERO);

            let mut vertex = ExportVertex {
                vertex_index: tri.vertices[corner],
                face_index: face_index as u32,
                position: mesh.positions[vi],
                normal,
                color,
                texcoord0,
                texcoord1,
                hash: 0,
            };
            vertex.rehash();
            vertices.push(vertex);
        }
    }
    (vertices, material_table)
}

/// Merge duplicate vertices. Returns the unified array in first-occurrence
/// order and an index table mapping every input position to its unified
/// index.
pub fn unify_vertices(vertices: &[ExportVertex]) -> (Vec<ExportVertex>, Vec<u32>) {
    // Largest power of two not above len/8, with a floor of one bucket.
    let mut bucket_count = vertices.len() >> 3;
    if bucket_count > 1 {
        while bucket_count & (bucket_count - 1) != 0 {
            bucket_count &= bucket_count - 1;
        }
    } else {
        bucket_count = 1;
    }
    let mask = (bucket_count - 1) as u64;

    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); bucket_count];
    let mut unified: Vec<ExportVertex> = Vec::new();
    let mut index_table: Vec<u32> = Vec::with_capacity(vertices.len());

    for (i, vertex) in vertices.iter().enumerate() {
        let bucket = (vertex.hash & mask) as usize;
        let matched = buckets[bucket]
            .iter()
            .copied()
            .find(|&seen| vertices[seen as usize] == *vertex);
        match matched {
            Some(seen) => index_table.push(index_table[seen as usize]),
            None => {
                index_table.push(unified.len() as u32);
                unified.push(vertex.clone());
                buckets[bucket].push(i as u32);
            }
        }
    }
    (unified, index_table)
}
