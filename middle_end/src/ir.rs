//! Typed intermediate tree and node factory
//!
//! The analyzer annotates and rewrites a tree of [Node]s. The factory
//! functions in this module allocate typed nodes, fold constant scalar
//! arithmetic, and perform implicit scalar conversions. Structural type
//! errors surface as `None` so the caller can report and recover.

use front_end::qualifier::{Precision, Qualifier, StorageClass};
use front_end::source_location::Span;
use front_end::types::{BasicKind, Type};

/// Operation carried by a tree node
///
/// Structural opcodes come first; the remainder are the fixed internal
/// opcodes built-in functions resolve to. Calls to user functions stay
/// `FunctionCall` and are recorded in the call graph instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Null,
    Sequence,
    Assign,
    Index,
    IndexIndirect,
    Swizzle,
    ArrayLength,
    Construct,
    FunctionCall,
    Convert,

    Negate,
    LogicalNot,
    BitNot,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,

    Return,
    Break,
    Continue,
    Discard,

    // Built-in function opcodes
    Radians,
    Degrees,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Pow,
    Exp,
    Log,
    Exp2,
    Log2,
    Sqrt,
    InverseSqrt,
    Abs,
    Sign,
    Floor,
    Ceil,
    Fract,
    Min,
    Max,
    Clamp,
    Mix,
    Step,
    Fma,
    Frexp,
    Dot,
    Cross,
    Normalize,
    Length,
    Distance,
    Texture,
    TextureLod,
    TextureOffset,
    TexelFetch,
    ImageLoad,
    ImageStore,
    BitfieldExtract,
    BitfieldInsert,
    InterpolateAtCentroid,
    InterpolateAtSample,
    InterpolateAtOffset,
    Barrier,
    MemoryBarrier,
    GroupMemoryBarrier,
    EmitVertex,
    EndPrimitive,
}

impl Op {
    /// Opcodes that synchronize execution and are illegal after the entry
    /// point has returned
    pub fn is_barrier(&self) -> bool {
        matches!(self, Op::Barrier | Op::MemoryBarrier | Op::GroupMemoryBarrier)
    }

    /// Opcodes whose result precision comes from the accessed resource
    /// rather than from the operation precision
    pub fn takes_resource_precision(&self) -> bool {
        matches!(
            self,
            Op::Texture | Op::TextureLod | Op::TextureOffset | Op::TexelFetch | Op::ImageLoad | Op::ImageStore
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Op::Equal | Op::NotEqual | Op::Less | Op::Greater | Op::LessEqual | Op::GreaterEqual)
    }
}

/// A constant scalar component
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
}

/// Payload of a tree node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Flattened component list (scalars, vectors, matrices, aggregates)
    Constant(Vec<Scalar>),
    Symbol {
        id: u64,
        name: String,
    },
    Unary {
        operand: Box<Node>,
    },
    Binary {
        left: Box<Node>,
        right: Box<Node>,
    },
    Swizzle {
        base: Box<Node>,
        components: Vec<u8>,
    },
    /// Calls, constructors, and statement sequences
    Aggregate {
        /// Mangled callee name for `FunctionCall` nodes
        name: Option<String>,
        children: Vec<Node>,
    },
    Selection {
        condition: Box<Node>,
        then_branch: Option<Box<Node>>,
        else_branch: Option<Box<Node>>,
    },
    Loop {
        test: Option<Box<Node>>,
        body: Option<Box<Node>>,
        terminal: Option<Box<Node>>,
        test_first: bool,
    },
    Branch {
        operand: Option<Box<Node>>,
    },
}

/// One node of the typed tree
#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub ty: Type,
    pub span: Span,
    pub kind: NodeKind,
}

impl Node {
    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant(_))
    }

    /// The single scalar value of a constant scalar node
    pub fn constant_scalar(&self) -> Option<Scalar> {
        match &self.kind {
            NodeKind::Constant(values) if self.ty.is_scalar() && values.len() == 1 => Some(values[0]),
            _ => None,
        }
    }

    /// The value of a constant integer scalar node, sign-extended
    pub fn constant_index(&self) -> Option<i64> {
        match self.constant_scalar() {
            Some(Scalar::Int(v)) => Some(v),
            Some(Scalar::Uint(v)) => Some(v as i64),
            _ => None,
        }
    }

    pub fn precision(&self) -> Precision {
        self.ty.qualifier.precision
    }

    pub fn set_precision(&mut self, precision: Precision) {
        self.ty.qualifier.precision = precision;
    }

    /// Symbol name, if this node references a symbol
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symbol { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The symbol ultimately written through an l-value expression
    pub fn base_symbol(&self) -> Option<&Node> {
        match &self.kind {
            NodeKind::Symbol { .. } => Some(self),
            NodeKind::Binary { left, .. } if matches!(self.op, Op::Index | Op::IndexIndirect) => left.base_symbol(),
            NodeKind::Swizzle { base, .. } => base.base_symbol(),
            _ => None,
        }
    }
}

/// Build a constant scalar node
pub fn constant(value: Scalar, span: Span) -> Node {
    let basic = match value {
        Scalar::Bool(_) => BasicKind::Bool,
        Scalar::Int(_) => BasicKind::Int,
        Scalar::Uint(_) => BasicKind::Uint,
        Scalar::Float(_) => BasicKind::Float,
    };
    let mut ty = Type::scalar(basic);
    ty.qualifier.storage = Some(StorageClass::Const);
    Node { op: Op::Null, ty, span, kind: NodeKind::Constant(vec![value]) }
}

/// Build a reference to a declared symbol
pub fn symbol(id: u64, name: &str, ty: &Type, span: Span) -> Node {
    Node { op: Op::Null, ty: ty.clone(), span, kind: NodeKind::Symbol { id, name: name.to_string() } }
}

/// Build a unary operation, folding constant operands
pub fn add_unary(op: Op, operand: Node, span: Span) -> Option<Node> {
    let ty = unary_result_type(op, &operand.ty)?;

    if let Some(value) = operand.constant_scalar() {
        if let Some(folded) = fold_unary(op, value) {
            let mut node = constant(folded, span);
            node.ty.basic = ty.basic.clone();
            return Some(node);
        }
    }

    Some(Node { op, ty, span, kind: NodeKind::Unary { operand: Box::new(operand) } })
}

/// Build a binary operation, folding constant scalar operands
///
/// Returns `None` when the operand types do not combine under `op`; the
/// caller reports the error and recovers.
pub fn add_binary(op: Op, left: Node, right: Node, span: Span) -> Option<Node> {
    let ty = binary_result_type(op, &left.ty, &right.ty)?;

    if let (Some(a), Some(b)) = (left.constant_scalar(), right.constant_scalar()) {
        if let Some(folded) = fold_binary(op, a, b) {
            let mut node = constant(folded, span);
            node.ty.basic = ty.basic.clone();
            return Some(node);
        }
    }

    Some(Node { op, ty, span, kind: NodeKind::Binary { left: Box::new(left), right: Box::new(right) } })
}

/// Build an assignment; the caller has already checked l-value legality
pub fn add_assign(left: Node, right: Node, span: Span) -> Option<Node> {
    if !left.ty.same_shape(&right.ty) {
        return None;
    }
    let mut ty = left.ty.clone();
    ty.qualifier = Qualifier::default();
    Some(Node { op: Op::Assign, ty, span, kind: NodeKind::Binary { left: Box::new(left), right: Box::new(right) } })
}

/// Build an index node; `Index` for constant indices, `IndexIndirect` otherwise
pub fn add_index(base: Node, index: Node, span: Span) -> Node {
    let op = if index.is_constant() { Op::Index } else { Op::IndexIndirect };
    let mut ty = base.ty.dereferenced();
    ty.qualifier.precision = base.ty.qualifier.precision;
    Node { op, ty, span, kind: NodeKind::Binary { left: Box::new(base), right: Box::new(index) } }
}

/// Build a vector swizzle; `components` holds 0-based component indices
pub fn add_swizzle(base: Node, components: Vec<u8>, span: Span) -> Node {
    let mut ty = if components.len() == 1 {
        Type::scalar(base.ty.basic.clone())
    } else {
        Type::vector(base.ty.basic.clone(), components.len() as u8)
    };
    ty.qualifier.precision = base.ty.qualifier.precision;
    Node { op: Op::Swizzle, ty, span, kind: NodeKind::Swizzle { base: Box::new(base), components } }
}

/// Build a comma sequence; the result is the right operand's value
pub fn add_comma(left: Node, right: Node, span: Span) -> Node {
    let mut ty = right.ty.clone();
    ty.qualifier = Qualifier::default();
    Node { op: Op::Sequence, ty, span, kind: NodeKind::Binary { left: Box::new(left), right: Box::new(right) } }
}

/// Build an aggregate node (call, constructor, statement list)
pub fn make_aggregate(op: Op, name: Option<String>, children: Vec<Node>, ty: Type, span: Span) -> Node {
    Node { op, ty, span, kind: NodeKind::Aggregate { name, children } }
}

/// Build an implicit conversion to another basic kind, folding constants
pub fn add_conversion(target: BasicKind, node: Node, span: Span) -> Node {
    if node.ty.basic == target {
        return node;
    }

    if let Some(value) = node.constant_scalar() {
        if let Some(converted) = convert_scalar(value, &target) {
            let mut folded = constant(converted, span);
            folded.ty.basic = target;
            return folded;
        }
    }

    let mut ty = node.ty.clone();
    ty.basic = target;
    ty.qualifier = Qualifier::default();
    Node { op: Op::Convert, ty, span, kind: NodeKind::Unary { operand: Box::new(node) } }
}

/// Can `from` convert to `to` without an explicit constructor?
pub fn can_implicitly_convert(from: &BasicKind, to: &BasicKind) -> bool {
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (BasicKind::Int, BasicKind::Uint)
            | (BasicKind::Int, BasicKind::Int64)
            | (BasicKind::Int, BasicKind::Float)
            | (BasicKind::Int, BasicKind::Double)
            | (BasicKind::Uint, BasicKind::Uint64)
            | (BasicKind::Uint, BasicKind::Float)
            | (BasicKind::Uint, BasicKind::Double)
            | (BasicKind::Float, BasicKind::Double)
            | (BasicKind::Float16, BasicKind::Float)
            | (BasicKind::Float16, BasicKind::Double)
            | (BasicKind::Int8, BasicKind::Int)
            | (BasicKind::Uint8, BasicKind::Uint)
            | (BasicKind::Int16, BasicKind::Int)
            | (BasicKind::Uint16, BasicKind::Uint)
    )
}

fn convert_scalar(value: Scalar, target: &BasicKind) -> Option<Scalar> {
    let converted = match (value, target) {
        (Scalar::Int(v), BasicKind::Uint) => Scalar::Uint(v as u64),
        (Scalar::Int(v), BasicKind::Float | BasicKind::Double) => Scalar::Float(v as f64),
        (Scalar::Uint(v), BasicKind::Float | BasicKind::Double) => Scalar::Float(v as f64),
        (Scalar::Float(v), BasicKind::Double) => Scalar::Float(v),
        (Scalar::Uint(v), BasicKind::Int) => Scalar::Int(v as i64),
        (Scalar::Int(v), BasicKind::Int64) => Scalar::Int(v),
        (Scalar::Uint(v), BasicKind::Uint64) => Scalar::Uint(v),
        _ => return None,
    };
    Some(converted)
}

fn unary_result_type(op: Op, operand: &Type) -> Option<Type> {
    if operand.is_array() || operand.basic.is_aggregate() || operand.is_opaque() {
        return None;
    }
    match op {
        Op::Negate => {
            if operand.basic == BasicKind::Bool {
                return None;
            }
            let mut t = operand.clone();
            t.qualifier = Qualifier::default();
            Some(t)
        }
        Op::LogicalNot => {
            if operand.basic != BasicKind::Bool || !operand.is_scalar() {
                return None;
            }
            Some(Type::scalar(BasicKind::Bool))
        }
        Op::BitNot => {
            if !operand.basic.is_integer_family() {
                return None;
            }
            let mut t = operand.clone();
            t.qualifier = Qualifier::default();
            Some(t)
        }
        _ => None,
    }
}

fn binary_result_type(op: Op, left: &Type, right: &Type) -> Option<Type> {
    // Equality compares whole values, including aggregates
    if matches!(op, Op::Equal | Op::NotEqual) {
        if left.same_shape(right) && !left.is_opaque() {
            return Some(Type::scalar(BasicKind::Bool));
        }
        return None;
    }

    if left.is_array() || right.is_array() || left.basic.is_aggregate() || right.basic.is_aggregate() {
        return None;
    }
    if left.is_opaque() || right.is_opaque() {
        return None;
    }

    match op {
        Op::LogicalAnd | Op::LogicalOr => {
            if left.basic == BasicKind::Bool && left.is_scalar() && right.basic == BasicKind::Bool && right.is_scalar()
            {
                Some(Type::scalar(BasicKind::Bool))
            } else {
                None
            }
        }
        Op::Less | Op::Greater | Op::LessEqual | Op::GreaterEqual => {
            if left.basic == right.basic && left.is_scalar() && right.is_scalar() && left.basic != BasicKind::Bool {
                Some(Type::scalar(BasicKind::Bool))
            } else {
                None
            }
        }
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
            if left.basic != right.basic || left.basic == BasicKind::Bool {
                return None;
            }
            if op == Op::Mod && !left.basic.is_integer_family() {
                return None;
            }
            arithmetic_result_type(op, left, right)
        }
        _ => None,
    }
}

fn arithmetic_result_type(op: Op, left: &Type, right: &Type) -> Option<Type> {
    let strip = |t: &Type| {
        let mut t = t.clone();
        t.qualifier = Qualifier::default();
        t
    };

    // Matrix algebra only exists for multiplication beyond componentwise
    if left.is_matrix() || right.is_matrix() {
        if op == Op::Mul {
            return match (left.is_matrix(), right.is_matrix()) {
                (true, true) => {
                    if left.matrix_cols == right.matrix_rows {
                        Some(Type::matrix_of(left.basic.clone(), right.matrix_cols, left.matrix_rows))
                    } else {
                        None
                    }
                }
                (true, false) => {
                    if right.is_vector() && right.vector_size == left.matrix_cols {
                        Some(Type::vector(left.basic.clone(), left.matrix_rows))
                    } else if right.is_scalar() {
                        Some(strip(left))
                    } else {
                        None
                    }
                }
                (false, true) => {
                    if left.is_vector() && left.vector_size == right.matrix_rows {
                        Some(Type::vector(right.basic.clone(), right.matrix_cols))
                    } else if left.is_scalar() {
                        Some(strip(right))
                    } else {
                        None
                    }
                }
                _ => unreachable!(),
            };
        }
        // Componentwise matrix add/sub/div need matching dimensions
        if left.is_matrix() && right.is_matrix() && left.matrix_cols == right.matrix_cols
            && left.matrix_rows == right.matrix_rows
        {
            return Some(strip(left));
        }
        if left.is_matrix() && right.is_scalar() {
            return Some(strip(left));
        }
        if left.is_scalar() && right.is_matrix() {
            return Some(strip(right));
        }
        return None;
    }

    match (left.is_vector(), right.is_vector()) {
        (true, true) => {
            if left.vector_size == right.vector_size {
                Some(strip(left))
            } else {
                None
            }
        }
        (true, false) => Some(strip(left)),
        (false, true) => Some(strip(right)),
        (false, false) => Some(strip(left)),
    }
}

fn fold_unary(op: Op, value: Scalar) -> Option<Scalar> {
    let folded = match (op, value) {
        (Op::Negate, Scalar::Int(v)) => Scalar::Int(v.wrapping_neg()),
        (Op::Negate, Scalar::Float(v)) => Scalar::Float(-v),
        (Op::LogicalNot, Scalar::Bool(v)) => Scalar::Bool(!v),
        (Op::BitNot, Scalar::Int(v)) => Scalar::Int(!v),
        (Op::BitNot, Scalar::Uint(v)) => Scalar::Uint(!v),
        _ => return None,
    };
    Some(folded)
}

fn fold_binary(op: Op, a: Scalar, b: Scalar) -> Option<Scalar> {
    let folded = match (op, a, b) {
        (Op::Add, Scalar::Int(x), Scalar::Int(y)) => Scalar::Int(x.wrapping_add(y)),
        (Op::Sub, Scalar::Int(x), Scalar::Int(y)) => Scalar::Int(x.wrapping_sub(y)),
        (Op::Mul, Scalar::Int(x), Scalar::Int(y)) => Scalar::Int(x.wrapping_mul(y)),
        (Op::Div, Scalar::Int(x), Scalar::Int(y)) if y != 0 => Scalar::Int(x.wrapping_div(y)),
        (Op::Mod, Scalar::Int(x), Scalar::Int(y)) if y != 0 => Scalar::Int(x.wrapping_rem(y)),
        (Op::Add, Scalar::Uint(x), Scalar::Uint(y)) => Scalar::Uint(x.wrapping_add(y)),
        (Op::Sub, Scalar::Uint(x), Scalar::Uint(y)) => Scalar::Uint(x.wrapping_sub(y)),
        (Op::Mul, Scalar::Uint(x), Scalar::Uint(y)) => Scalar::Uint(x.wrapping_mul(y)),
        (Op::Div, Scalar::Uint(x), Scalar::Uint(y)) if y != 0 => Scalar::Uint(x / y),
        (Op::Mod, Scalar::Uint(x), Scalar::Uint(y)) if y != 0 => Scalar::Uint(x % y),
        (Op::Add, Scalar::Float(x), Scalar::Float(y)) => Scalar::Float(x + y),
        (Op::Sub, Scalar::Float(x), Scalar::Float(y)) => Scalar::Float(x - y),
        (Op::Mul, Scalar::Float(x), Scalar::Float(y)) => Scalar::Float(x * y),
        (Op::Div, Scalar::Float(x), Scalar::Float(y)) if y != 0.0 => Scalar::Float(x / y),
        (Op::Less, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x < y),
        (Op::Greater, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x > y),
        (Op::LessEqual, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x <= y),
        (Op::GreaterEqual, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x >= y),
        (Op::Equal, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x == y),
        (Op::NotEqual, Scalar::Int(x), Scalar::Int(y)) => Scalar::Bool(x != y),
        (Op::LogicalAnd, Scalar::Bool(x), Scalar::Bool(y)) => Scalar::Bool(x && y),
        (Op::LogicalOr, Scalar::Bool(x), Scalar::Bool(y)) => Scalar::Bool(x || y),
        _ => return None,
    };
    Some(folded)
}
