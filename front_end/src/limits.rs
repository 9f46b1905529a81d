//! Resource-limits table
//!
//! Supplied by the embedder at construction time and consulted by the
//! deferred index-limit checks at the end of a parse.

/// Per-compilation resource limits and indexing permissiveness
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub max_clip_distances: u32,
    pub min_program_texel_offset: i32,
    pub max_program_texel_offset: i32,
    /// Allow dynamically uniform indexing of uniform arrays
    pub general_uniform_indexing: bool,
    /// Allow variable indexing of varying arrays
    pub general_varying_indexing: bool,
    /// Allow variable indexing of attribute matrices and vectors
    pub general_attribute_matrix_vector_indexing: bool,
    pub max_geometry_output_vertices: u32,
    pub max_patch_vertices: u32,
    pub max_mesh_output_vertices: u32,
    pub max_mesh_output_primitives: u32,
    pub max_compute_workgroup_size: [u32; 3],
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_clip_distances: 8,
            min_program_texel_offset: -8,
            max_program_texel_offset: 7,
            general_uniform_indexing: true,
            general_varying_indexing: true,
            general_attribute_matrix_vector_indexing: true,
            max_geometry_output_vertices: 256,
            max_patch_vertices: 32,
            max_mesh_output_vertices: 256,
            max_mesh_output_primitives: 256,
            max_compute_workgroup_size: [1024, 1024, 64],
        }
    }
}
