//! Deferred sizing of stage-governed IO arrays
//!
//! Some array-typed interface symbols take their outer size from a
//! stage-configuration declaration that may arrive later in the unit:
//! geometry inputs from the input primitive, tessellation-control outputs
//! from the declared vertex count, mesh outputs from the declared
//! vertex/primitive counts, per-vertex fragment inputs from the fixed
//! value 3. Candidates are collected during the forward walk and settled
//! at each resolution point and once more in `finish()`.

use front_end::diagnostics::InfoSink;
use front_end::qualifier::{Auxiliary, Qualifier};
use front_end::source_location::Span;
use front_end::types::ArraySize;
use front_end::version::Stage;

use crate::sema::symbol_table::{Symbol, SymbolTable};

/// Input primitive topology of a geometry stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPrimitive {
    Points,
    Lines,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
}

impl InputPrimitive {
    /// Number of vertices each input primitive carries
    pub fn vertex_count(&self) -> u32 {
        match self {
            InputPrimitive::Points => 1,
            InputPrimitive::Lines => 2,
            InputPrimitive::LinesAdjacency => 4,
            InputPrimitive::Triangles => 3,
            InputPrimitive::TrianglesAdjacency => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputPrimitive::Points => "points",
            InputPrimitive::Lines => "lines",
            InputPrimitive::LinesAdjacency => "lines_adjacency",
            InputPrimitive::Triangles => "triangles",
            InputPrimitive::TrianglesAdjacency => "triangles_adjacency",
        }
    }
}

/// Stage-configuration values declared through layout qualifiers
#[derive(Debug, Clone, Default)]
pub struct StageLayouts {
    pub input_primitive: Option<InputPrimitive>,
    /// Tessellation-control / mesh declared output vertex count
    pub output_vertices: Option<u32>,
    /// Mesh declared output primitive count
    pub output_primitives: Option<u32>,
    pub workgroup_size: Option<[u32; 3]>,
}

/// The stage rule that governs one resizable array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoverningSize {
    GeometryInput,
    TessControlOutput,
    FragmentPerVertex,
    MeshOutputVertices,
    MeshOutputPrimitives,
}

impl GoverningSize {
    fn describe(&self) -> &'static str {
        match self {
            GoverningSize::GeometryInput => "the input primitive",
            GoverningSize::TessControlOutput => "the declared vertices",
            GoverningSize::FragmentPerVertex => "the per-vertex count",
            GoverningSize::MeshOutputVertices => "the declared max_vertices",
            GoverningSize::MeshOutputPrimitives => "the declared max_primitives",
        }
    }
}

/// The rule governing `qualifier` in `stage`, if any
pub fn governing_rule(stage: Stage, qualifier: &Qualifier) -> Option<GoverningSize> {
    match stage {
        Stage::Geometry if qualifier.is_pipe_input() => Some(GoverningSize::GeometryInput),
        Stage::TessControl
            if qualifier.is_pipe_output() && qualifier.auxiliary != Some(Auxiliary::Patch) =>
        {
            Some(GoverningSize::TessControlOutput)
        }
        Stage::Fragment if qualifier.is_pipe_input() && qualifier.per_vertex => {
            Some(GoverningSize::FragmentPerVertex)
        }
        Stage::Mesh if qualifier.is_pipe_output() => {
            if qualifier.per_primitive {
                Some(GoverningSize::MeshOutputPrimitives)
            } else {
                Some(GoverningSize::MeshOutputVertices)
            }
        }
        _ => None,
    }
}

/// The size a governed array must end up with, once known
pub fn implicit_size(rule: GoverningSize, layouts: &StageLayouts) -> Option<u32> {
    match rule {
        GoverningSize::GeometryInput => layouts.input_primitive.map(|p| p.vertex_count()),
        GoverningSize::TessControlOutput => layouts.output_vertices,
        GoverningSize::FragmentPerVertex => Some(3),
        GoverningSize::MeshOutputVertices => layouts.output_vertices,
        GoverningSize::MeshOutputPrimitives => layouts.output_primitives,
    }
}

#[derive(Debug, Clone)]
struct IoArrayEntry {
    symbol_key: String,
    rule: GoverningSize,
    span: Span,
}

/// Collects governed arrays and settles their sizes at resolution points
#[derive(Debug, Default)]
pub struct IoArrayResolver {
    entries: Vec<IoArrayEntry>,
}

impl IoArrayResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `symbol` if its qualifier and shape are governed by a stage
    /// rule; returns true when an entry was added
    pub fn register_if_resizable(&mut self, stage: Stage, symbol: &Symbol, span: &Span) -> bool {
        let Some(ty) = symbol.var_type() else {
            return false;
        };
        if !ty.is_array() {
            return false;
        }
        let Some(rule) = governing_rule(stage, &ty.qualifier) else {
            return false;
        };
        if self.entries.iter().any(|entry| entry.symbol_key == symbol.key) {
            return false;
        }
        self.entries.push(IoArrayEntry { symbol_key: symbol.key.clone(), rule, span: span.clone() });
        true
    }

    /// Settle entries against the current stage layout state
    ///
    /// Unsized arrays get their implicit size; explicitly sized arrays that
    /// disagree with the governing value are a hard error. With
    /// `tail_only`, only the most recently registered entry is examined
    /// (used right after a new declaration).
    pub fn check_consistency(
        &mut self,
        tail_only: bool,
        table: &mut SymbolTable,
        layouts: &StageLayouts,
        sink: &mut InfoSink,
    ) {
        let start = if tail_only { self.entries.len().saturating_sub(1) } else { 0 };

        for index in start..self.entries.len() {
            let entry = self.entries[index].clone();
            let Some(required) = implicit_size(entry.rule, layouts) else {
                continue;
            };

            // Built-ins are copied up before sizing; the shared root keeps
            // the original unsized declaration.
            let Some(symbol) = table.copy_up(&entry.symbol_key) else {
                continue;
            };
            let name = symbol.name.clone();
            let Some(ty) = symbol.var_type_mut() else {
                continue;
            };

            match ty.outer_array_size() {
                Some(ArraySize::Unsized) => ty.set_outer_array_size(required),
                Some(ArraySize::Fixed(size)) if size != required => {
                    sink.error(
                        &entry.span,
                        &name,
                        format!(
                            "size of array ({}) must match {} ({})",
                            size,
                            entry.rule.describe(),
                            required
                        ),
                    );
                }
                _ => {}
            }
        }
    }
}
