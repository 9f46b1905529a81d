//! Shading-value type model
//!
//! A `Type` describes the shape of a shading value: its basic kind (scalar
//! domain or opaque kind), vector/matrix shape, array dimensions, struct or
//! block members, and the attached qualifier bundle.

use std::fmt;

use crate::qualifier::Qualifier;

/// Scalar domain of a sampled or image texel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampledKind {
    Float,
    Int,
    Uint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
    Rect,
    Buffer,
}

/// Shape of a sampler or image opaque type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerShape {
    pub dim: SamplerDim,
    pub arrayed: bool,
    pub shadow: bool,
    pub multisample: bool,
    pub sampled: SampledKind,
}

impl SamplerShape {
    pub fn dim_2d(sampled: SampledKind) -> Self {
        Self { dim: SamplerDim::Dim2D, arrayed: false, shadow: false, multisample: false, sampled }
    }

    /// Number of coordinate components needed to address this shape
    pub fn coord_components(&self) -> u8 {
        let base = match self.dim {
            SamplerDim::Dim1D | SamplerDim::Buffer => 1,
            SamplerDim::Dim2D | SamplerDim::Rect => 2,
            SamplerDim::Dim3D | SamplerDim::Cube => 3,
        };
        base + self.arrayed as u8
    }
}

/// Basic kind of a shading value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Void,
    Bool,
    Float,
    Double,
    Float16,
    Int,
    Uint,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int64,
    Uint64,
    AtomicUint,
    Sampler(SamplerShape),
    Image(SamplerShape),
    AccelerationStructure,
    Struct,
    Block,
}

impl BasicKind {
    pub fn is_opaque(&self) -> bool {
        matches!(
            self,
            BasicKind::Sampler(_) | BasicKind::Image(_) | BasicKind::AtomicUint | BasicKind::AccelerationStructure
        )
    }

    pub fn is_float_family(&self) -> bool {
        matches!(self, BasicKind::Float | BasicKind::Double | BasicKind::Float16)
    }

    pub fn is_integer_family(&self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Uint
                | BasicKind::Int8
                | BasicKind::Uint8
                | BasicKind::Int16
                | BasicKind::Uint16
                | BasicKind::Int64
                | BasicKind::Uint64
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, BasicKind::Struct | BasicKind::Block)
    }

    /// Can a precision qualifier attach to this kind?
    pub fn accepts_precision(&self) -> bool {
        matches!(self, BasicKind::Float | BasicKind::Int | BasicKind::Uint | BasicKind::Sampler(_) | BasicKind::Image(_))
    }

    /// Single character used in mangled function signatures
    fn mangle_char(&self) -> char {
        match self {
            BasicKind::Void => 'z',
            BasicKind::Bool => 'b',
            BasicKind::Float => 'f',
            BasicKind::Double => 'd',
            BasicKind::Float16 => 'h',
            BasicKind::Int => 'i',
            BasicKind::Uint => 'u',
            BasicKind::Int8 => 'c',
            BasicKind::Uint8 => 'C',
            BasicKind::Int16 => 'w',
            BasicKind::Uint16 => 'W',
            BasicKind::Int64 => 'l',
            BasicKind::Uint64 => 'L',
            BasicKind::AtomicUint => 'a',
            BasicKind::Sampler(_) => 's',
            BasicKind::Image(_) => 'I',
            BasicKind::AccelerationStructure => 'A',
            BasicKind::Struct => 'S',
            BasicKind::Block => 'B',
        }
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BasicKind::Void => "void",
            BasicKind::Bool => "bool",
            BasicKind::Float => "float",
            BasicKind::Double => "double",
            BasicKind::Float16 => "float16_t",
            BasicKind::Int => "int",
            BasicKind::Uint => "uint",
            BasicKind::Int8 => "int8_t",
            BasicKind::Uint8 => "uint8_t",
            BasicKind::Int16 => "int16_t",
            BasicKind::Uint16 => "uint16_t",
            BasicKind::Int64 => "int64_t",
            BasicKind::Uint64 => "uint64_t",
            BasicKind::AtomicUint => "atomic_uint",
            BasicKind::Sampler(_) => "sampler",
            BasicKind::Image(_) => "image",
            BasicKind::AccelerationStructure => "accelerationStructure",
            BasicKind::Struct => "struct",
            BasicKind::Block => "block",
        };
        write!(f, "{}", name)
    }
}

/// One dimension of an array type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    Fixed(u32),
    /// Runtime-sized or implicitly sized; may be resolved later
    Unsized,
    /// Sized by a specialization constant with the given id
    SpecConst(u32),
}

/// A member of a struct or block type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMember {
    pub name: String,
    pub ty: Type,
    /// Hidden by a block redeclaration that did not list this member
    pub hidden: bool,
}

impl TypeMember {
    pub fn new(name: &str, ty: Type) -> Self {
        Self { name: name.to_string(), ty, hidden: false }
    }
}

/// The full description of a shading value's type
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub basic: BasicKind,
    /// 1 for scalars, 2..=4 for vectors
    pub vector_size: u8,
    /// 0 when not a matrix
    pub matrix_cols: u8,
    pub matrix_rows: u8,
    /// Array dimensions, outermost first; empty when not an array
    pub array_sizes: Vec<ArraySize>,
    /// Ordered member list for structs and blocks
    pub members: Vec<TypeMember>,
    /// Struct or block name
    pub type_name: Option<String>,
    pub qualifier: Qualifier,
}

impl Type {
    pub fn scalar(basic: BasicKind) -> Self {
        Self {
            basic,
            vector_size: 1,
            matrix_cols: 0,
            matrix_rows: 0,
            array_sizes: Vec::new(),
            members: Vec::new(),
            type_name: None,
            qualifier: Qualifier::default(),
        }
    }

    pub fn vector(basic: BasicKind, size: u8) -> Self {
        debug_assert!((2..=4).contains(&size));
        Self { vector_size: size, ..Self::scalar(basic) }
    }

    /// A float matrix with the given column and row counts
    pub fn matrix(cols: u8, rows: u8) -> Self {
        Self::matrix_of(BasicKind::Float, cols, rows)
    }

    /// A matrix with the given element kind
    pub fn matrix_of(basic: BasicKind, cols: u8, rows: u8) -> Self {
        Self { matrix_cols: cols, matrix_rows: rows, ..Self::scalar(basic) }
    }

    pub fn structure(name: &str, members: Vec<TypeMember>) -> Self {
        Self {
            members,
            type_name: Some(name.to_string()),
            ..Self::scalar(BasicKind::Struct)
        }
    }

    pub fn block(name: &str, members: Vec<TypeMember>) -> Self {
        Self {
            members,
            type_name: Some(name.to_string()),
            ..Self::scalar(BasicKind::Block)
        }
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = qualifier;
        self
    }

    pub fn array_of(mut self, size: ArraySize) -> Self {
        self.array_sizes.insert(0, size);
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.vector_size == 1 && self.matrix_cols == 0 && self.array_sizes.is_empty() && !self.basic.is_aggregate()
    }

    pub fn is_vector(&self) -> bool {
        self.vector_size > 1 && self.matrix_cols == 0 && self.array_sizes.is_empty()
    }

    pub fn is_matrix(&self) -> bool {
        self.matrix_cols > 0 && self.array_sizes.is_empty()
    }

    pub fn is_array(&self) -> bool {
        !self.array_sizes.is_empty()
    }

    pub fn is_struct(&self) -> bool {
        self.basic == BasicKind::Struct
    }

    pub fn is_block(&self) -> bool {
        self.basic == BasicKind::Block
    }

    pub fn is_opaque(&self) -> bool {
        self.basic.is_opaque()
    }

    /// The outermost array dimension, if this is an array
    pub fn outer_array_size(&self) -> Option<ArraySize> {
        self.array_sizes.first().copied()
    }

    pub fn set_outer_array_size(&mut self, size: u32) {
        if let Some(outer) = self.array_sizes.first_mut() {
            *outer = ArraySize::Fixed(size);
        }
    }

    pub fn is_unsized_array(&self) -> bool {
        matches!(self.array_sizes.first(), Some(ArraySize::Unsized))
    }

    /// The type obtained by indexing this one once
    pub fn dereferenced(&self) -> Type {
        let mut t = self.clone();
        if !t.array_sizes.is_empty() {
            t.array_sizes.remove(0);
        } else if t.matrix_cols > 0 {
            t.vector_size = t.matrix_rows;
            t.matrix_cols = 0;
            t.matrix_rows = 0;
        } else if t.vector_size > 1 {
            t.vector_size = 1;
        }
        t.qualifier = Qualifier::default();
        t
    }

    /// Number of scalar components this type contributes to a constructor
    pub fn component_count(&self) -> u32 {
        let shape = if self.matrix_cols > 0 {
            self.matrix_cols as u32 * self.matrix_rows as u32
        } else if self.basic.is_aggregate() {
            self.members.iter().filter(|m| !m.hidden).map(|m| m.ty.component_count()).sum()
        } else {
            self.vector_size as u32
        };

        self.array_sizes.iter().fold(shape, |acc, dim| match dim {
            ArraySize::Fixed(n) => acc * n,
            _ => acc,
        })
    }

    /// Shape equality, ignoring qualifiers
    pub fn same_shape(&self, other: &Type) -> bool {
        self.basic == other.basic
            && self.vector_size == other.vector_size
            && self.matrix_cols == other.matrix_cols
            && self.matrix_rows == other.matrix_rows
            && self.array_sizes == other.array_sizes
            && self.type_name == other.type_name
            && self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.name == b.name && a.ty.same_shape(&b.ty))
    }

    /// Visible member lookup for structs and blocks
    pub fn find_member(&self, name: &str) -> Option<&TypeMember> {
        self.members.iter().find(|m| m.name == name && !m.hidden)
    }

    /// Append this type's mangled form to a signature under construction
    pub fn mangle(&self, out: &mut String) {
        for dim in &self.array_sizes {
            match dim {
                ArraySize::Fixed(n) => out.push_str(&format!("[{}]", n)),
                ArraySize::Unsized => out.push_str("[]"),
                ArraySize::SpecConst(id) => out.push_str(&format!("[s{}]", id)),
            }
        }
        if self.matrix_cols > 0 {
            out.push_str(&format!("m{}{}", self.matrix_cols, self.matrix_rows));
        } else if self.vector_size > 1 {
            out.push('v');
            out.push((b'0' + self.vector_size) as char);
        }
        out.push(self.basic.mangle_char());
        if let Some(name) = &self.type_name {
            out.push_str(name);
        }
        out.push(';');
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.type_name {
            write!(f, "{}", name)?;
        } else if self.matrix_cols > 0 {
            write!(f, "mat{}x{}", self.matrix_cols, self.matrix_rows)?;
        } else if self.vector_size > 1 {
            let prefix = match self.basic {
                BasicKind::Bool => "bvec",
                BasicKind::Int => "ivec",
                BasicKind::Uint => "uvec",
                BasicKind::Double => "dvec",
                _ => "vec",
            };
            write!(f, "{}{}", prefix, self.vector_size)?;
        } else {
            write!(f, "{}", self.basic)?;
        }
        for dim in &self.array_sizes {
            match dim {
                ArraySize::Fixed(n) => write!(f, "[{}]", n)?,
                ArraySize::Unsized => write!(f, "[]")?,
                ArraySize::SpecConst(id) => write!(f, "[specconst {}]", id)?,
            }
        }
        Ok(())
    }
}
