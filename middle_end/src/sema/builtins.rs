//! Built-in function resolution and argument conversion
//!
//! Call syntax resolves, in order, to: an array-length method, a type
//! constructor (validated structurally against the target shape), or a
//! function overload looked up by mangled signature with implicit
//! conversions. Special-case rules downstream key off the resolved opcode,
//! never off the function name text.

use std::fmt;

use front_end::qualifier::StorageClass;
use front_end::source_location::Span;
use front_end::types::{ArraySize, BasicKind, Type};

use crate::ir::{self, Node};
use crate::sema::symbol_table::{mangle_call, Symbol, SymbolInfo, SymbolTable};

/// Structural constructor failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorError {
    /// Fewer components supplied than the target shape holds
    NotEnoughData,
    /// A trailing argument contributes nothing
    TooManyArguments,
    /// Matrix-from-matrix admits exactly one argument
    MatrixFromMatrix,
    /// Array constructors enumerate elements exactly
    ArrayElementCount { expected: u32, found: usize },
    /// Element or member shape does not match
    WrongArgumentType { index: usize },
    /// Opaque types cannot be constructed
    OpaqueType,
}

impl fmt::Display for ConstructorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorError::NotEnoughData => write!(f, "not enough data provided for construction"),
            ConstructorError::TooManyArguments => write!(f, "too many arguments"),
            ConstructorError::MatrixFromMatrix => {
                write!(f, "constructing matrix from matrix can only take one argument")
            }
            ConstructorError::ArrayElementCount { expected, found } => {
                write!(f, "array constructor needs {} elements, found {}", expected, found)
            }
            ConstructorError::WrongArgumentType { index } => {
                write!(f, "cannot convert argument {} for construction", index + 1)
            }
            ConstructorError::OpaqueType => write!(f, "cannot construct this type"),
        }
    }
}

/// Validate a constructor argument list against the target shape
///
/// The total component count must exactly fill the target; arrays exactly
/// enumerate their elements; struct constructors need component-for-
/// component field matches; a matrix built from a matrix takes exactly
/// that one argument.
pub fn check_constructor(ty: &Type, args: &[Node]) -> Result<(), ConstructorError> {
    if ty.is_opaque() {
        return Err(ConstructorError::OpaqueType);
    }

    if ty.is_array() {
        let expected = match ty.outer_array_size() {
            Some(ArraySize::Fixed(n)) => n,
            // An unsized array constructor takes its size from the count
            _ => args.len() as u32,
        };
        if args.len() as u32 != expected {
            return Err(ConstructorError::ArrayElementCount { expected, found: args.len() });
        }
        let element = ty.dereferenced();
        for (index, arg) in args.iter().enumerate() {
            if !arg.ty.same_shape(&element) {
                return Err(ConstructorError::WrongArgumentType { index });
            }
        }
        return Ok(());
    }

    if ty.basic.is_aggregate() {
        let members: Vec<_> = ty.members.iter().filter(|m| !m.hidden).collect();
        if args.len() < members.len() {
            return Err(ConstructorError::NotEnoughData);
        }
        if args.len() > members.len() {
            return Err(ConstructorError::TooManyArguments);
        }
        for (index, (arg, member)) in args.iter().zip(&members).enumerate() {
            // Component-for-component match, including nested arrays,
            // samplers and references
            if !arg.ty.same_shape(&member.ty) {
                return Err(ConstructorError::WrongArgumentType { index });
            }
        }
        return Ok(());
    }

    if args.is_empty() {
        return Err(ConstructorError::NotEnoughData);
    }

    for (index, arg) in args.iter().enumerate() {
        if arg.ty.is_array() || arg.ty.basic.is_aggregate() || arg.ty.is_opaque() {
            return Err(ConstructorError::WrongArgumentType { index });
        }
    }

    if ty.is_scalar() {
        // A scalar constructor takes one argument and drops its extra
        // components
        if args.len() > 1 {
            return Err(ConstructorError::TooManyArguments);
        }
        return Ok(());
    }

    if ty.is_matrix() && args.iter().any(|arg| arg.ty.is_matrix()) {
        if args.len() != 1 {
            return Err(ConstructorError::MatrixFromMatrix);
        }
        return Ok(());
    }

    let needed = if ty.is_matrix() {
        ty.matrix_cols as u32 * ty.matrix_rows as u32
    } else {
        ty.vector_size as u32
    };

    // A single scalar replicates across the whole shape
    if args.len() == 1 && args[0].ty.is_scalar() {
        return Ok(());
    }

    let mut offered = 0u32;
    for arg in args {
        if offered >= needed {
            // This argument would go entirely unused
            return Err(ConstructorError::TooManyArguments);
        }
        offered += arg.ty.component_count();
    }
    if offered < needed {
        return Err(ConstructorError::NotEnoughData);
    }

    Ok(())
}

/// Overload resolution failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    NoMatch,
    Ambiguous,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NoMatch => write!(f, "no matching overloaded function found"),
            ResolveError::Ambiguous => {
                write!(f, "ambiguous best function under implicit type conversion")
            }
        }
    }
}

/// Can an argument of type `arg` bind to a formal of type `formal`?
///
/// Input parameters convert argument-to-formal; output parameters convert
/// formal-to-argument; in/out parameters need both directions.
fn param_convertible(arg: &Type, formal: &Type) -> bool {
    if arg.vector_size != formal.vector_size
        || arg.matrix_cols != formal.matrix_cols
        || arg.matrix_rows != formal.matrix_rows
        || arg.array_sizes.len() != formal.array_sizes.len()
    {
        return false;
    }

    match formal.qualifier.storage_class() {
        StorageClass::ParamOut => ir::can_implicitly_convert(&formal.basic, &arg.basic),
        StorageClass::ParamInOut => arg.basic == formal.basic,
        _ => ir::can_implicitly_convert(&arg.basic, &formal.basic),
    }
}

/// Resolve a call to the best matching visible overload
///
/// An exact mangled-signature hit wins outright; otherwise candidates
/// reachable through implicit conversions compete on the number of exact
/// parameter matches, and a tie is ambiguous.
pub fn find_function(table: &SymbolTable, name: &str, args: &[&Type]) -> Result<Symbol, ResolveError> {
    let exact = mangle_call(name, args);
    if let Some((symbol, _)) = table.find(&exact) {
        if symbol.is_function() {
            return Ok(symbol.clone());
        }
    }

    let mut best: Option<(usize, Symbol)> = None;
    let mut tie = false;

    for candidate in table.collect_overloads(name) {
        let SymbolInfo::Function { params, .. } = &candidate.info else {
            continue;
        };
        if params.len() != args.len() {
            continue;
        }
        if !params.iter().zip(args).all(|(param, arg)| param_convertible(arg, &param.ty)) {
            continue;
        }

        let exact_matches =
            params.iter().zip(args).filter(|(param, arg)| param.ty.basic == arg.basic).count();

        match &best {
            Some((score, symbol)) if *score == exact_matches && symbol.key != candidate.key => tie = true,
            Some((score, _)) if *score >= exact_matches => {}
            _ => {
                best = Some((exact_matches, candidate));
                tie = false;
            }
        }
    }

    match best {
        Some(_) if tie => Err(ResolveError::Ambiguous),
        Some((_, symbol)) => Ok(symbol),
        None => Err(ResolveError::NoMatch),
    }
}

/// A pending write-back from a converted output argument
#[derive(Debug)]
pub struct OutConversion {
    /// The caller's original l-value expression
    pub original: Node,
    /// The temporary the call writes through
    pub temp: Node,
    /// Pre-copy needed for in/out parameters
    pub copy_in: bool,
}

/// Convert a call's arguments to the resolved formal parameter types
///
/// Input arguments whose type differs get an implicit conversion node in
/// place. Output arguments whose type differs are replaced by fresh
/// temporaries; the returned [OutConversion]s describe the write-backs the
/// caller must sequence after the call.
pub fn convert_arguments(
    table: &mut SymbolTable,
    symbol: &Symbol,
    args: &mut Vec<Node>,
    span: &Span,
) -> Vec<OutConversion> {
    let SymbolInfo::Function { params, .. } = &symbol.info else {
        return Vec::new();
    };

    let mut conversions = Vec::new();

    for (index, param) in params.iter().enumerate() {
        let formal = &param.ty;
        let storage = formal.qualifier.storage_class();

        if args[index].ty.basic == formal.basic {
            continue;
        }

        if storage.is_written_param() {
            let id = table.fresh_id();
            let mut temp_ty = formal.clone();
            temp_ty.qualifier = Default::default();
            let temp = ir::symbol(id, &format!("@arg{}", id), &temp_ty, span.clone());

            let original = std::mem::replace(&mut args[index], temp.clone());
            conversions.push(OutConversion {
                original,
                temp,
                copy_in: storage == StorageClass::ParamInOut,
            });
        } else {
            let arg = args[index].clone();
            args[index] = ir::add_conversion(formal.basic.clone(), arg, span.clone());
        }
    }

    conversions
}

/// Rebuild a call whose output arguments needed conversion
///
/// The call is evaluated once into a temporary, the converted temporaries
/// are assigned back into the original l-values in parameter order, and
/// the return value is yielded last, preserving single-expression
/// evaluation semantics.
pub fn sequence_out_conversions(
    table: &mut SymbolTable,
    call: Node,
    conversions: Vec<OutConversion>,
    span: &Span,
) -> Node {
    let returns_value = call.ty.basic != BasicKind::Void;

    let ret_temp = if returns_value {
        let id = table.fresh_id();
        Some(ir::symbol(id, &format!("@ret{}", id), &call.ty, span.clone()))
    } else {
        None
    };

    let mut sequence = match &ret_temp {
        Some(temp) => ir::add_assign(temp.clone(), call, span.clone()).expect("same type"),
        None => call,
    };

    // In/out parameters observe the original value before the call
    for conversion in conversions.iter().filter(|c| c.copy_in) {
        let copied = ir::add_conversion(
            conversion.temp.ty.basic.clone(),
            conversion.original.clone(),
            span.clone(),
        );
        if let Some(assign) = ir::add_assign(conversion.temp.clone(), copied, span.clone()) {
            sequence = ir::add_comma(assign, sequence, span.clone());
        }
    }

    for conversion in conversions {
        let converted =
            ir::add_conversion(conversion.original.ty.basic.clone(), conversion.temp, span.clone());
        if let Some(assign) = ir::add_assign(conversion.original, converted, span.clone()) {
            sequence = ir::add_comma(sequence, assign, span.clone());
        }
    }

    match ret_temp {
        Some(temp) => ir::add_comma(sequence, temp, span.clone()),
        None => sequence,
    }
}
