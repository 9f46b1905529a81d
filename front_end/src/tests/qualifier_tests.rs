//! Tests for qualifier merging and the singleton rules.

use crate::qualifier::{
    Interpolation, LayoutQualifier, MemoryFlags, Precision, Qualifier, QualifierError, StorageClass,
};

#[test]
fn test_merge_disjoint_qualifiers() {
    let mut q = Qualifier::of_storage(StorageClass::Out);
    let mut other = Qualifier::default();
    other.interpolation = Some(Interpolation::Flat);
    other.precision = Precision::High;

    assert!(q.merge(&other).is_ok());
    assert_eq!(q.storage, Some(StorageClass::Out));
    assert_eq!(q.interpolation, Some(Interpolation::Flat));
    assert_eq!(q.precision, Precision::High);
}

#[test]
fn test_duplicate_storage_is_an_error() {
    let mut q = Qualifier::of_storage(StorageClass::In);
    let other = Qualifier::of_storage(StorageClass::Uniform);

    let err = q.merge(&other).unwrap_err();
    assert_eq!(
        err,
        QualifierError::DuplicateStorage { first: StorageClass::In, second: StorageClass::Uniform }
    );
    assert!(err.to_string().contains("only one storage qualifier"));
}

#[test]
fn test_duplicate_interpolation_is_an_error() {
    let mut q = Qualifier::default();
    q.interpolation = Some(Interpolation::Smooth);
    let mut other = Qualifier::default();
    other.interpolation = Some(Interpolation::NoPerspective);

    assert_eq!(q.merge(&other), Err(QualifierError::DuplicateInterpolation));
}

#[test]
fn test_duplicate_precision_is_an_error() {
    let mut q = Qualifier::default();
    q.precision = Precision::Medium;
    let mut other = Qualifier::default();
    other.precision = Precision::High;

    assert_eq!(q.merge(&other), Err(QualifierError::DuplicatePrecision));
    // The original precision is left untouched
    assert_eq!(q.precision, Precision::Medium);
}

#[test]
fn test_memory_flags_accumulate() {
    let mut q = Qualifier::default();
    q.memory = MemoryFlags::COHERENT;
    let mut other = Qualifier::default();
    other.memory = MemoryFlags::READONLY | MemoryFlags::RESTRICT;

    assert!(q.merge(&other).is_ok());
    assert!(q.memory.contains(MemoryFlags::COHERENT));
    assert!(q.memory.contains(MemoryFlags::READONLY));
    assert!(q.memory.contains(MemoryFlags::RESTRICT));
}

#[test]
fn test_layout_fields_overlay() {
    let mut layout = LayoutQualifier { binding: Some(1), ..Default::default() };
    let newer = LayoutQualifier { binding: Some(2), location: Some(4), ..Default::default() };

    layout.merge(&newer);
    assert_eq!(layout.binding, Some(2));
    assert_eq!(layout.location, Some(4));
}

#[test]
fn test_precision_ordering_for_max() {
    assert!(Precision::High > Precision::Medium);
    assert!(Precision::Medium > Precision::Low);
    assert!(Precision::Low > Precision::None);
    assert_eq!(Precision::Medium.max(Precision::High), Precision::High);
}

#[test]
fn test_default_storage_is_temporary() {
    let q = Qualifier::default();
    assert_eq!(q.storage_class(), StorageClass::Temporary);
    assert!(!q.is_pipe_input());
    assert!(!q.is_constant());
}
