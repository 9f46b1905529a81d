//! Qualifier model
//!
//! The bundle of non-type attributes attached to a declared value: storage
//! class, precision, interpolation, auxiliary placement, memory flags, and
//! layout attributes. At most one storage class, one interpolation mode and
//! one precision level may be active at once; `Qualifier::merge` enforces
//! the singleton rules when qualifier lists are combined.

use std::fmt;

use bitflags::bitflags;

/// Where a value lives and how it flows through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Local, non-qualified temporary
    Temporary,
    Const,
    /// Pipeline input for the current stage
    In,
    /// Pipeline output for the current stage
    Out,
    Uniform,
    Buffer,
    Shared,
    /// Function parameter passed by value
    ParamIn,
    /// Function output parameter
    ParamOut,
    /// Function in/out parameter
    ParamInOut,
}

impl StorageClass {
    /// Is this a function parameter the callee may write through?
    pub fn is_written_param(&self) -> bool {
        matches!(self, StorageClass::ParamOut | StorageClass::ParamInOut)
    }

    pub fn is_pipe_input(&self) -> bool {
        matches!(self, StorageClass::In)
    }

    pub fn is_pipe_output(&self) -> bool {
        matches!(self, StorageClass::Out)
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageClass::Temporary => "temp",
            StorageClass::Const => "const",
            StorageClass::In => "in",
            StorageClass::Out => "out",
            StorageClass::Uniform => "uniform",
            StorageClass::Buffer => "buffer",
            StorageClass::Shared => "shared",
            StorageClass::ParamIn => "in parameter",
            StorageClass::ParamOut => "out parameter",
            StorageClass::ParamInOut => "inout parameter",
        };
        write!(f, "{}", name)
    }
}

/// Precision level of a value or operation
///
/// Ordered so that `max` picks the higher precision; `None` means
/// "no precision declared or derived yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Precision {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Precision::None => "none",
            Precision::Low => "lowp",
            Precision::Medium => "mediump",
            Precision::High => "highp",
        };
        write!(f, "{}", name)
    }
}

/// How a pipeline input/output is interpolated across a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Smooth,
    Flat,
    NoPerspective,
    /// Explicit (per-vertex) interpolation; the fragment stage sees the
    /// raw per-vertex values as a 3-element array
    Explicit,
}

/// Auxiliary placement of an interpolated value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auxiliary {
    Centroid,
    Sample,
    Patch,
}

bitflags! {
    /// Memory access qualifiers for buffer and image values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemoryFlags: u8 {
        const COHERENT  = 1 << 0;
        const VOLATILE  = 1 << 1;
        const RESTRICT  = 1 << 2;
        const READONLY  = 1 << 3;
        const WRITEONLY = 1 << 4;
    }
}

/// Memory packing of a uniform or buffer block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPacking {
    Std140,
    Std430,
    Packed,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOrder {
    ColumnMajor,
    RowMajor,
}

/// Image formats accepted by `layout(...)` on image declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Rgba32f,
    Rgba16f,
    Rgba8,
    R32f,
    R32i,
    R32ui,
}

/// Attributes supplied through `layout(...)` declarations
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutQualifier {
    pub packing: Option<LayoutPacking>,
    pub matrix_order: Option<MatrixOrder>,
    pub binding: Option<u32>,
    pub set: Option<u32>,
    pub location: Option<u32>,
    pub offset: Option<u32>,
    pub format: Option<ImageFormat>,
    pub xfb_buffer: Option<u32>,
    pub xfb_stream: Option<u32>,
    pub xfb_offset: Option<u32>,
}

impl LayoutQualifier {
    /// Overlay `other` onto `self`; later declarations win, field by field.
    pub fn merge(&mut self, other: &LayoutQualifier) {
        macro_rules! take {
            ($field:ident) => {
                if other.$field.is_some() {
                    self.$field = other.$field;
                }
            };
        }
        take!(packing);
        take!(matrix_order);
        take!(binding);
        take!(set);
        take!(location);
        take!(offset);
        take!(format);
        take!(xfb_buffer);
        take!(xfb_stream);
        take!(xfb_offset);
    }
}

/// Error raised when merging two qualifier sets that each claim a singleton
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualifierError {
    DuplicateStorage { first: StorageClass, second: StorageClass },
    DuplicateInterpolation,
    DuplicateAuxiliary,
    DuplicatePrecision,
}

impl fmt::Display for QualifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualifierError::DuplicateStorage { first, second } => {
                write!(f, "only one storage qualifier allowed: '{}' conflicts with '{}'", second, first)
            }
            QualifierError::DuplicateInterpolation => {
                write!(f, "only one interpolation qualifier allowed")
            }
            QualifierError::DuplicateAuxiliary => {
                write!(f, "only one auxiliary storage qualifier allowed")
            }
            QualifierError::DuplicatePrecision => {
                write!(f, "only one precision qualifier allowed")
            }
        }
    }
}

/// The full qualifier bundle attached to a declared value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Qualifier {
    pub storage: Option<StorageClass>,
    pub precision: Precision,
    pub interpolation: Option<Interpolation>,
    pub auxiliary: Option<Auxiliary>,
    pub memory: MemoryFlags,
    pub layout: LayoutQualifier,
    pub invariant: bool,
    pub nonuniform: bool,
    /// The value is a specialization constant
    pub spec_constant: bool,
    pub no_contraction: bool,
    /// Fragment-stage per-vertex input (raw values of the 3 provoking vertices)
    pub per_vertex: bool,
    /// Mesh-stage per-primitive output
    pub per_primitive: bool,
}

impl Qualifier {
    pub fn of_storage(storage: StorageClass) -> Self {
        Self { storage: Some(storage), ..Default::default() }
    }

    /// The effective storage class, defaulting to a local temporary
    pub fn storage_class(&self) -> StorageClass {
        self.storage.unwrap_or(StorageClass::Temporary)
    }

    pub fn is_pipe_input(&self) -> bool {
        self.storage_class().is_pipe_input()
    }

    pub fn is_pipe_output(&self) -> bool {
        self.storage_class().is_pipe_output()
    }

    pub fn is_constant(&self) -> bool {
        self.storage_class() == StorageClass::Const
    }

    pub fn has_explicit_precision(&self) -> bool {
        self.precision != Precision::None
    }

    /// Merge another qualifier set into this one, enforcing the singleton
    /// rules: at most one storage class, one interpolation mode, one
    /// auxiliary class and one precision level may be active at once.
    pub fn merge(&mut self, other: &Qualifier) -> Result<(), QualifierError> {
        match (self.storage, other.storage) {
            (Some(first), Some(second)) => {
                return Err(QualifierError::DuplicateStorage { first, second });
            }
            (None, Some(s)) => self.storage = Some(s),
            _ => {}
        }

        if other.interpolation.is_some() {
            if self.interpolation.is_some() {
                return Err(QualifierError::DuplicateInterpolation);
            }
            self.interpolation = other.interpolation;
        }

        if other.auxiliary.is_some() {
            if self.auxiliary.is_some() {
                return Err(QualifierError::DuplicateAuxiliary);
            }
            self.auxiliary = other.auxiliary;
        }

        if other.precision != Precision::None {
            if self.precision != Precision::None {
                return Err(QualifierError::DuplicatePrecision);
            }
            self.precision = other.precision;
        }

        self.memory |= other.memory;
        self.layout.merge(&other.layout);
        self.invariant |= other.invariant;
        self.nonuniform |= other.nonuniform;
        self.spec_constant |= other.spec_constant;
        self.no_contraction |= other.no_contraction;
        self.per_vertex |= other.per_vertex;
        self.per_primitive |= other.per_primitive;

        Ok(())
    }
}
