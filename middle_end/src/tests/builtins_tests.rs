//! Tests for constructor validation, overload resolution, and the
//! out-argument conversion rewrite

use std::sync::Arc;

use front_end::qualifier::{Qualifier, StorageClass};
use front_end::source_location::Span;
use front_end::types::{ArraySize, BasicKind, Type, TypeMember};

use crate::ir::{self, Node, NodeKind, Op, Scalar};
use crate::sema::builtins::{
    check_constructor, convert_arguments, find_function, sequence_out_conversions,
    ConstructorError, ResolveError,
};
use crate::sema::symbol_table::{FunctionParam, Scope, Symbol, SymbolTable};

fn span() -> Span {
    Span::default()
}

fn float_const(value: f64) -> Node {
    ir::constant(Scalar::Float(value), span())
}

fn vec_value(width: u8) -> Node {
    ir::symbol(1, "v", &Type::vector(BasicKind::Float, width), span())
}

fn in_param(ty: Type) -> FunctionParam {
    FunctionParam::anonymous(ty.with_qualifier(Qualifier::of_storage(StorageClass::ParamIn)))
}

fn out_param(ty: Type) -> FunctionParam {
    FunctionParam::anonymous(ty.with_qualifier(Qualifier::of_storage(StorageClass::ParamOut)))
}

// ---- constructors -------------------------------------------------------

#[test]
fn test_vec4_from_two_vec2_is_accepted() {
    let target = Type::vector(BasicKind::Float, 4);
    assert_eq!(check_constructor(&target, &[vec_value(2), vec_value(2)]), Ok(()));
}

#[test]
fn test_vec4_from_one_vec2_is_not_enough_data() {
    let target = Type::vector(BasicKind::Float, 4);
    assert_eq!(check_constructor(&target, &[vec_value(2)]), Err(ConstructorError::NotEnoughData));
}

#[test]
fn test_unused_trailing_argument_is_too_many() {
    // vec4(vec4, float): the float contributes nothing
    let target = Type::vector(BasicKind::Float, 4);
    assert_eq!(
        check_constructor(&target, &[vec_value(4), float_const(1.0)]),
        Err(ConstructorError::TooManyArguments)
    );
}

#[test]
fn test_partially_used_final_argument_is_accepted() {
    // vec4(vec3, vec2): the last component of the vec2 is dropped, but the
    // argument itself contributes
    let target = Type::vector(BasicKind::Float, 4);
    assert_eq!(check_constructor(&target, &[vec_value(3), vec_value(2)]), Ok(()));
}

#[test]
fn test_single_scalar_replicates() {
    let target = Type::vector(BasicKind::Float, 4);
    assert_eq!(check_constructor(&target, &[float_const(0.0)]), Ok(()));

    let target = Type::matrix(4, 4);
    assert_eq!(check_constructor(&target, &[float_const(1.0)]), Ok(()));
}

#[test]
fn test_matrix_from_matrix_takes_exactly_one_argument() {
    let target = Type::matrix(3, 3);
    let source = ir::symbol(1, "m", &Type::matrix(4, 4), span());
    assert_eq!(check_constructor(&target, &[source.clone()]), Ok(()));
    assert_eq!(
        check_constructor(&target, &[source, float_const(1.0)]),
        Err(ConstructorError::MatrixFromMatrix)
    );
}

#[test]
fn test_scalar_constructor_takes_one_argument() {
    let target = Type::scalar(BasicKind::Int);
    assert_eq!(check_constructor(&target, &[float_const(1.0)]), Ok(()));
    assert_eq!(
        check_constructor(&target, &[float_const(1.0), float_const(2.0)]),
        Err(ConstructorError::TooManyArguments)
    );
}

#[test]
fn test_array_constructor_enumerates_elements() {
    let target = Type::scalar(BasicKind::Float).array_of(ArraySize::Fixed(3));
    let element = || float_const(0.0);

    assert_eq!(check_constructor(&target, &[element(), element(), element()]), Ok(()));
    assert_eq!(
        check_constructor(&target, &[element(), element()]),
        Err(ConstructorError::ArrayElementCount { expected: 3, found: 2 })
    );
}

#[test]
fn test_struct_constructor_matches_field_for_field() {
    let target = Type::structure(
        "Light",
        vec![
            TypeMember::new("color", Type::vector(BasicKind::Float, 3)),
            TypeMember::new("intensity", Type::scalar(BasicKind::Float)),
        ],
    );

    assert_eq!(check_constructor(&target, &[vec_value(3), float_const(1.0)]), Ok(()));
    assert_eq!(
        check_constructor(&target, &[float_const(1.0), vec_value(3)]),
        Err(ConstructorError::WrongArgumentType { index: 0 })
    );
    assert_eq!(check_constructor(&target, &[vec_value(3)]), Err(ConstructorError::NotEnoughData));
}

#[test]
fn test_opaque_types_cannot_be_constructed() {
    let target = Type::scalar(BasicKind::AtomicUint);
    assert_eq!(check_constructor(&target, &[float_const(0.0)]), Err(ConstructorError::OpaqueType));
}

// ---- overload resolution ------------------------------------------------

fn resolution_table() -> SymbolTable {
    let mut scope = Scope::new();
    let float = || Type::scalar(BasicKind::Float);
    let int = || Type::scalar(BasicKind::Int);

    scope.insert(
        Symbol::function(1, "f", vec![in_param(float())], float(), Op::FunctionCall).as_builtin(),
    );
    scope.insert(
        Symbol::function(2, "f", vec![in_param(int())], int(), Op::FunctionCall).as_builtin(),
    );
    scope.insert(
        Symbol::function(3, "g", vec![in_param(float()), in_param(int())], float(), Op::FunctionCall)
            .as_builtin(),
    );
    scope.insert(
        Symbol::function(4, "g", vec![in_param(int()), in_param(float())], float(), Op::FunctionCall)
            .as_builtin(),
    );
    SymbolTable::new(Arc::new(scope))
}

#[test]
fn test_exact_signature_wins() {
    let table = resolution_table();
    let arg = Type::scalar(BasicKind::Int);
    let symbol = find_function(&table, "f", &[&arg]).expect("exact match");
    assert_eq!(symbol.id, 2);
}

#[test]
fn test_implicit_conversion_finds_candidate() {
    let table = resolution_table();
    let arg = Type::scalar(BasicKind::Int8);
    // int8 converts to int but not to float; only one candidate survives
    let symbol = find_function(&table, "f", &[&arg]).expect("conversion match");
    assert_eq!(symbol.id, 2);
}

#[test]
fn test_no_candidate_is_no_match() {
    let table = resolution_table();
    let arg = Type::scalar(BasicKind::Bool);
    assert!(matches!(find_function(&table, "f", &[&arg]), Err(ResolveError::NoMatch)));
}

#[test]
fn test_equally_good_candidates_are_ambiguous() {
    let table = resolution_table();
    let int = Type::scalar(BasicKind::Int);
    // (int, int) scores one exact parameter against both overloads of g
    assert!(matches!(find_function(&table, "g", &[&int, &int]), Err(ResolveError::Ambiguous)));
}

#[test]
fn test_wrong_arity_is_no_match() {
    let table = resolution_table();
    let int = Type::scalar(BasicKind::Int);
    assert!(matches!(find_function(&table, "f", &[&int, &int]), Err(ResolveError::NoMatch)));
}

// ---- out-argument conversion --------------------------------------------

fn frexp_table() -> SymbolTable {
    let mut scope = Scope::new();
    let float = || Type::scalar(BasicKind::Float);
    scope.insert(
        Symbol::function(
            1,
            "frexp",
            vec![in_param(float()), out_param(Type::scalar(BasicKind::Int))],
            float(),
            Op::Frexp,
        )
        .as_builtin(),
    );
    SymbolTable::new(Arc::new(scope))
}

#[test]
fn test_out_argument_with_matching_type_needs_no_rewrite() {
    let mut table = frexp_table();
    let float = Type::scalar(BasicKind::Float);
    let int = Type::scalar(BasicKind::Int);
    let symbol = find_function(&table, "frexp", &[&float, &int]).expect("exact match");

    let mut args = vec![
        ir::symbol(10, "significand", &float, span()),
        ir::symbol(11, "exponent", &int, span()),
    ];
    let conversions = convert_arguments(&mut table, &symbol, &mut args, &span());
    assert!(conversions.is_empty(), "matching out-argument types need no temporaries");
}

#[test]
fn test_converted_out_argument_is_rewritten_into_sequence() {
    let mut table = frexp_table();
    let float = Type::scalar(BasicKind::Float);
    let uint = Type::scalar(BasicKind::Uint);
    // uint exponent binds through an int formal (formal-to-argument
    // direction for out parameters)
    let symbol = find_function(&table, "frexp", &[&float, &uint]).expect("conversion match");

    let mut args = vec![
        ir::symbol(10, "significand", &float, span()),
        ir::symbol(11, "exponent", &uint, span()),
    ];
    let conversions = convert_arguments(&mut table, &symbol, &mut args, &span());
    assert_eq!(conversions.len(), 1);
    assert!(!conversions[0].copy_in, "a pure out parameter needs no pre-copy");
    assert_eq!(args[1].ty.basic, BasicKind::Int, "the call site now passes the temporary");

    let call = ir::make_aggregate(Op::Frexp, None, args, float.clone(), span());
    let node = sequence_out_conversions(&mut table, call, conversions, &span());

    // Shape: ((ret = call, exponent = uint(tmp)), ret)
    assert_eq!(node.op, Op::Sequence);
    assert_eq!(node.ty.basic, BasicKind::Float, "the rewrite preserves the return value");
    let NodeKind::Binary { left, right } = &node.kind else {
        panic!("expected the outer comma sequence");
    };
    assert!(
        matches!(&right.kind, NodeKind::Symbol { name, .. } if name.starts_with("@ret")),
        "the return temporary is yielded last"
    );
    let NodeKind::Binary { left: call_part, right: write_back } = &left.kind else {
        panic!("expected the inner comma sequence");
    };
    assert_eq!(call_part.op, Op::Assign, "the call is evaluated once into the temporary");
    assert_eq!(write_back.op, Op::Assign);
    let NodeKind::Binary { left: target, .. } = &write_back.kind else {
        panic!("expected an assignment");
    };
    assert!(
        matches!(&target.kind, NodeKind::Symbol { name, .. } if name == "exponent"),
        "the original l-value receives the converted temporary"
    );
}

#[test]
fn test_inout_argument_gets_a_pre_copy() {
    let mut scope = Scope::new();
    let float = || Type::scalar(BasicKind::Float);
    let inout_int =
        Type::scalar(BasicKind::Int).with_qualifier(Qualifier::of_storage(StorageClass::ParamInOut));
    scope.insert(
        Symbol::function(1, "adjust", vec![FunctionParam::anonymous(inout_int)], float(), Op::FunctionCall)
            .as_builtin(),
    );
    let mut table = SymbolTable::new(Arc::new(scope));

    // in/out binding requires the exact basic kind, so a uint argument
    // does not resolve at all
    let uint = Type::scalar(BasicKind::Uint);
    assert!(matches!(find_function(&table, "adjust", &[&uint]), Err(ResolveError::NoMatch)));

    // with the exact type there is nothing to convert
    let int = Type::scalar(BasicKind::Int);
    let symbol = find_function(&table, "adjust", &[&int]).expect("exact match");
    let mut args = vec![ir::symbol(10, "value", &int, span())];
    let conversions = convert_arguments(&mut table, &symbol, &mut args, &span());
    assert!(conversions.is_empty());
}
