//! Precision derivation and propagation
//!
//! Operation precision is the maximum of the contributing argument and
//! formal-parameter precisions; which positions contribute is a static
//! property of the opcode. The derived operation precision is pushed down
//! through the already-built subtree until a node with an explicit
//! precision is reached. Boolean-typed nodes never carry a precision.

use front_end::qualifier::Precision;
use front_end::types::BasicKind;

use crate::ir::{Node, NodeKind, Op};

/// Bitmask of argument positions that contribute to operation precision
///
/// Most opcodes look at every argument; the exceptions are baked here so
/// no call site re-derives them from names.
pub fn contributing_mask(op: Op) -> u32 {
    match op {
        // Offset and bit-count arguments do not affect precision
        Op::BitfieldInsert => 0b0011,
        Op::BitfieldExtract => 0b0001,
        // Only the interpolant matters
        Op::InterpolateAtCentroid | Op::InterpolateAtSample | Op::InterpolateAtOffset => 0b0001,
        _ => u32::MAX,
    }
}

/// Maximum of the contributing argument and formal precisions
pub fn operation_precision(op: Op, args: &[Precision], formals: &[Precision]) -> Precision {
    let mask = contributing_mask(op);
    let mut precision = Precision::None;
    for (index, arg) in args.iter().enumerate() {
        if index < 32 && (mask >> index) & 1 == 1 {
            precision = precision.max(*arg);
            if let Some(formal) = formals.get(index) {
                precision = precision.max(*formal);
            }
        }
    }
    precision
}

/// Result precision of an operation
///
/// The declared result precision wins when present; resource-access
/// opcodes take the precision of the accessed resource instead; everything
/// else gets the operation precision.
pub fn result_precision(op: Op, declared: Precision, operation: Precision, resource: Precision) -> Precision {
    if op.takes_resource_precision() {
        return resource;
    }
    if declared != Precision::None {
        declared
    } else {
        operation
    }
}

/// Push an operation precision down a subtree
///
/// Stops at nodes that already carry an explicit precision and skips
/// boolean-typed nodes (their children still receive the precision).
pub fn propagate(node: &mut Node, precision: Precision) {
    if precision == Precision::None {
        return;
    }

    if node.ty.basic != BasicKind::Bool {
        if node.precision() != Precision::None {
            return;
        }
        node.set_precision(precision);
    }

    match &mut node.kind {
        NodeKind::Unary { operand } => propagate(operand, precision),
        NodeKind::Binary { left, right } => {
            propagate(left, precision);
            propagate(right, precision);
        }
        NodeKind::Swizzle { base, .. } => propagate(base, precision),
        NodeKind::Aggregate { children, .. } => {
            for child in children {
                propagate(child, precision);
            }
        }
        _ => {}
    }
}

/// Derive and apply precision for a freshly built operation node
///
/// Children get the operation precision; the node itself gets the result
/// precision unless it is boolean-typed.
pub fn apply(node: &mut Node, operation: Precision, result: Precision) {
    match &mut node.kind {
        NodeKind::Unary { operand } => propagate(operand, operation),
        NodeKind::Binary { left, right } => {
            propagate(left, operation);
            propagate(right, operation);
        }
        NodeKind::Swizzle { base, .. } => propagate(base, operation),
        NodeKind::Aggregate { children, .. } => {
            for child in children {
                propagate(child, operation);
            }
        }
        _ => {}
    }

    if node.ty.basic != BasicKind::Bool && node.precision() == Precision::None {
        node.set_precision(result);
    }
}
