//! Tests for the type model: shapes, component counting, and mangling.

use crate::types::{ArraySize, BasicKind, SampledKind, SamplerShape, Type, TypeMember};

#[test]
fn test_scalar_vector_matrix_predicates() {
    let f = Type::scalar(BasicKind::Float);
    assert!(f.is_scalar());
    assert!(!f.is_vector());

    let v3 = Type::vector(BasicKind::Float, 3);
    assert!(v3.is_vector());
    assert!(!v3.is_scalar());

    let m = Type::matrix(4, 4);
    assert!(m.is_matrix());
    assert!(!m.is_vector());
}

#[test]
fn test_component_counts() {
    assert_eq!(Type::scalar(BasicKind::Int).component_count(), 1);
    assert_eq!(Type::vector(BasicKind::Float, 4).component_count(), 4);
    assert_eq!(Type::matrix(3, 3).component_count(), 9);

    // A fixed array multiplies the element count
    let arr = Type::vector(BasicKind::Float, 2).array_of(ArraySize::Fixed(5));
    assert_eq!(arr.component_count(), 10);

    // Struct components are the sum of visible members
    let s = Type::structure(
        "Light",
        vec![
            TypeMember::new("position", Type::vector(BasicKind::Float, 3)),
            TypeMember::new("intensity", Type::scalar(BasicKind::Float)),
        ],
    );
    assert_eq!(s.component_count(), 4);
}

#[test]
fn test_hidden_members_do_not_count() {
    let mut s = Type::block(
        "gl_PerVertex",
        vec![
            TypeMember::new("gl_Position", Type::vector(BasicKind::Float, 4)),
            TypeMember::new("gl_PointSize", Type::scalar(BasicKind::Float)),
        ],
    );
    assert_eq!(s.component_count(), 5);

    s.members[1].hidden = true;
    assert_eq!(s.component_count(), 4);
    assert!(s.find_member("gl_PointSize").is_none());
    assert!(s.find_member("gl_Position").is_some());
}

#[test]
fn test_dereferenced_strips_one_level() {
    let arr = Type::vector(BasicKind::Float, 4).array_of(ArraySize::Fixed(3));
    let elem = arr.dereferenced();
    assert!(elem.is_vector());
    assert_eq!(elem.vector_size, 4);

    let col = Type::matrix(4, 3).dereferenced();
    assert!(col.is_vector());
    assert_eq!(col.vector_size, 3);

    let comp = Type::vector(BasicKind::Uint, 2).dereferenced();
    assert!(comp.is_scalar());
    assert_eq!(comp.basic, BasicKind::Uint);
}

#[test]
fn test_mangling_distinguishes_overloads() {
    let mut a = String::new();
    Type::vector(BasicKind::Float, 3).mangle(&mut a);

    let mut b = String::new();
    Type::vector(BasicKind::Int, 3).mangle(&mut b);

    let mut c = String::new();
    Type::scalar(BasicKind::Float).mangle(&mut c);

    assert_ne!(a, b);
    assert_ne!(a, c);

    let mut arr = String::new();
    Type::scalar(BasicKind::Float).array_of(ArraySize::Fixed(4)).mangle(&mut arr);
    assert_ne!(arr, c);
    assert!(arr.contains("[4]"));
}

#[test]
fn test_sampler_coord_components() {
    let s2d = SamplerShape::dim_2d(SampledKind::Float);
    assert_eq!(s2d.coord_components(), 2);

    let s2d_array = SamplerShape { arrayed: true, ..s2d };
    assert_eq!(s2d_array.coord_components(), 3);

    assert!(Type::scalar(BasicKind::Sampler(s2d)).is_opaque());
}

#[test]
fn test_unsized_array_resolution() {
    let mut arr = Type::vector(BasicKind::Float, 4).array_of(ArraySize::Unsized);
    assert!(arr.is_unsized_array());

    arr.set_outer_array_size(3);
    assert!(!arr.is_unsized_array());
    assert_eq!(arr.outer_array_size(), Some(ArraySize::Fixed(3)));
}
