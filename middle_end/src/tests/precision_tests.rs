//! Tests for precision derivation and propagation

use front_end::qualifier::Precision;
use front_end::source_location::Span;
use front_end::types::{BasicKind, Type};

use crate::ir::{self, Op};
use crate::sema::precision::{contributing_mask, operation_precision, propagate, result_precision};

fn float_symbol(name: &str, precision: Precision) -> ir::Node {
    let mut ty = Type::scalar(BasicKind::Float);
    ty.qualifier.precision = precision;
    ir::symbol(1, name, &ty, Span::default())
}

#[test]
fn test_operation_precision_is_maximum_of_arguments() {
    let precision = operation_precision(Op::Add, &[Precision::Medium, Precision::High], &[]);
    assert_eq!(precision, Precision::High);

    let precision = operation_precision(Op::Add, &[Precision::Low, Precision::None], &[]);
    assert_eq!(precision, Precision::Low);
}

#[test]
fn test_formal_parameter_precision_contributes() {
    let precision =
        operation_precision(Op::Min, &[Precision::Low, Precision::Low], &[Precision::High, Precision::None]);
    assert_eq!(precision, Precision::High, "a high-precision formal raises the operation");
}

#[test]
fn test_bitfield_mask_ignores_offset_and_count() {
    assert_eq!(contributing_mask(Op::BitfieldExtract), 0b0001);
    let precision = operation_precision(
        Op::BitfieldExtract,
        &[Precision::Low, Precision::High, Precision::High],
        &[],
    );
    assert_eq!(precision, Precision::Low, "offset and count positions must not contribute");
}

#[test]
fn test_interpolate_at_looks_only_at_interpolant() {
    let precision =
        operation_precision(Op::InterpolateAtSample, &[Precision::Medium, Precision::High], &[]);
    assert_eq!(precision, Precision::Medium);
}

#[test]
fn test_result_precision_prefers_declared() {
    let result = result_precision(Op::Add, Precision::Low, Precision::High, Precision::None);
    assert_eq!(result, Precision::Low, "a declared precision wins over the derived one");

    let result = result_precision(Op::Add, Precision::None, Precision::High, Precision::None);
    assert_eq!(result, Precision::High);
}

#[test]
fn test_resource_ops_take_resource_precision() {
    let result = result_precision(Op::Texture, Precision::High, Precision::High, Precision::Low);
    assert_eq!(result, Precision::Low, "texture results carry the sampler's precision");
}

#[test]
fn test_propagation_stops_at_explicit_precision() {
    let left = float_symbol("a", Precision::High);
    let right = float_symbol("b", Precision::None);
    let mut node = ir::add_binary(Op::Mul, left, right, Span::default()).expect("float * float");

    propagate(&mut node, Precision::Medium);

    assert_eq!(node.precision(), Precision::Medium);
    if let ir::NodeKind::Binary { left, right } = &node.kind {
        assert_eq!(left.precision(), Precision::High, "an explicit precision must not be overwritten");
        assert_eq!(right.precision(), Precision::Medium, "derived precision fills the open operand");
    } else {
        panic!("expected a binary node");
    }
}

#[test]
fn test_propagation_is_monotone() {
    // Once a node has a precision, further propagation never lowers it
    let mut node = float_symbol("a", Precision::None);
    propagate(&mut node, Precision::High);
    assert_eq!(node.precision(), Precision::High);
    propagate(&mut node, Precision::Low);
    assert_eq!(node.precision(), Precision::High);
}

#[test]
fn test_boolean_nodes_never_carry_precision() {
    let left = float_symbol("a", Precision::High);
    let right = float_symbol("b", Precision::High);
    let mut node = ir::add_binary(Op::Less, left, right, Span::default()).expect("float < float");
    assert_eq!(node.ty.basic, BasicKind::Bool);

    propagate(&mut node, Precision::High);
    assert_eq!(node.precision(), Precision::None, "comparison results must stay precision-free");
}
