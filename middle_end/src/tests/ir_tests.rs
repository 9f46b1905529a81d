//! Tests for the node factory's binary result typing.

use front_end::source_location::Span;
use front_end::types::{BasicKind, Type};

use crate::ir::{self, Node, Op};

fn span() -> Span {
    Span::default()
}

fn matrix_value(id: u32, basic: BasicKind, cols: u8, rows: u8) -> Node {
    ir::symbol(id.into(), "m", &Type::matrix_of(basic, cols, rows), span())
}

#[test]
fn test_matrix_product_keeps_the_element_kind() {
    let left = matrix_value(1, BasicKind::Double, 4, 4);
    let right = matrix_value(2, BasicKind::Double, 4, 4);

    let product = ir::add_binary(Op::Mul, left, right, span()).expect("dmat4 * dmat4 combines");
    assert_eq!(product.ty.basic, BasicKind::Double);
    assert_eq!((product.ty.matrix_cols, product.ty.matrix_rows), (4, 4));
}

#[test]
fn test_matrix_product_takes_its_shape_from_both_operands() {
    // (3 cols, 2 rows) * (4 cols, 3 rows): inner dimensions agree
    let left = matrix_value(1, BasicKind::Float, 3, 2);
    let right = matrix_value(2, BasicKind::Float, 4, 3);

    let product = ir::add_binary(Op::Mul, left, right, span()).expect("inner dimensions agree");
    assert_eq!((product.ty.matrix_cols, product.ty.matrix_rows), (4, 2));
}

#[test]
fn test_matrix_product_with_mismatched_inner_dimension_fails() {
    let left = matrix_value(1, BasicKind::Float, 2, 2);
    let right = matrix_value(2, BasicKind::Float, 4, 3);
    assert!(ir::add_binary(Op::Mul, left, right, span()).is_none());
}
