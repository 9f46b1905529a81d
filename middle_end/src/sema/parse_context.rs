//! The per-compilation semantic orchestrator
//!
//! One [ParseContext] exists per compilation unit. The grammar driver calls
//! one handler per production; every handler validates, annotates, and
//! returns a usable tree node even on error, recording the failure in the
//! sink and synthesizing a recovery value so the walk always continues.
//! `finish()` settles the deferred checks and yields acceptance: a unit is
//! accepted iff the error count is zero.

use std::sync::Arc;

use front_end::diagnostics::InfoSink;
use front_end::limits::ResourceLimits;
use front_end::qualifier::{
    LayoutPacking, LayoutQualifier, MatrixOrder, MemoryFlags, Precision, StorageClass,
};
use front_end::scanner::PragmaHandler;
use front_end::source_location::Span;
use front_end::types::{ArraySize, BasicKind, Type, TypeMember};
use front_end::version::{ParseMode, Profile, ShaderConfig, Stage};
use rustc_hash::FxHashMap;

use crate::ir::{self, Node, NodeKind, Op, Scalar};
use crate::sema::builtin_symbols::build_builtin_scope;
use crate::sema::builtins;
use crate::sema::feature_gate::{
    self, ExtensionBehavior, ExtensionRegistry, GateState, Verdict, ARB_GPU_SHADER_FP64,
    EXT_MESH_SHADER, EXT_NONUNIFORM_QUALIFIER,
};
use crate::sema::io_arrays::{governing_rule, InputPrimitive, IoArrayResolver, StageLayouts};
use crate::sema::precision;
use crate::sema::symbol_table::{
    mangle_function, FunctionParam, Scope, Symbol, SymbolInfo, SymbolTable,
};

/// The function currently being defined
struct FunctionFrame {
    name: String,
    key: String,
    return_type: Type,
    is_entry_point: bool,
    returned: bool,
}

/// A constant index into an array whose size is not yet known
struct DeferredIndex {
    name: String,
    index: i64,
    span: Span,
}

pub struct ParseContext {
    config: ShaderConfig,
    limits: ResourceLimits,
    table: SymbolTable,
    extensions: ExtensionRegistry,
    io_arrays: IoArrayResolver,
    layouts: StageLayouts,
    sink: InfoSink,

    current_function: Option<FunctionFrame>,
    loop_depth: usize,
    switch_depth: usize,
    /// Set by a return inside the entry point; barriers are illegal after it
    past_entry_point_return: bool,
    entry_point_defined: bool,

    default_precision: FxHashMap<BasicKind, Precision>,
    default_uniform_layout: LayoutQualifier,
    default_buffer_layout: LayoutQualifier,
    default_out_layout: LayoutQualifier,
    deferred_indexes: Vec<DeferredIndex>,
    /// Caller/callee edges for calls that stay user function calls
    call_graph: Vec<(String, String)>,
}

impl ParseContext {
    pub fn new(config: ShaderConfig, limits: ResourceLimits) -> Self {
        let builtins = build_builtin_scope(&config);
        Self::with_builtins(config, limits, builtins)
    }

    /// Build a context over an already-seeded built-in root, so several
    /// compilations can share one root
    pub fn with_builtins(config: ShaderConfig, limits: ResourceLimits, builtins: Arc<Scope>) -> Self {
        let sink = if config.suppress_warnings { InfoSink::suppressing_warnings() } else { InfoSink::new() };

        let mut default_precision = FxHashMap::default();
        if config.is_es() {
            // The ES dialect seeds stage-dependent defaults; fragment float
            // deliberately has none and must be declared by the unit
            default_precision.insert(BasicKind::Int, if config.stage == Stage::Fragment {
                Precision::Medium
            } else {
                Precision::High
            });
            if config.stage != Stage::Fragment {
                default_precision.insert(BasicKind::Float, Precision::High);
            }
        }

        Self {
            config,
            limits,
            table: SymbolTable::new(builtins),
            extensions: ExtensionRegistry::new(),
            io_arrays: IoArrayResolver::new(),
            layouts: StageLayouts::default(),
            sink,
            current_function: None,
            loop_depth: 0,
            switch_depth: 0,
            past_entry_point_return: false,
            entry_point_defined: false,
            default_precision,
            default_uniform_layout: LayoutQualifier {
                packing: Some(LayoutPacking::Std140),
                matrix_order: Some(MatrixOrder::ColumnMajor),
                ..LayoutQualifier::default()
            },
            default_buffer_layout: LayoutQualifier {
                packing: Some(LayoutPacking::Std430),
                matrix_order: Some(MatrixOrder::ColumnMajor),
                ..LayoutQualifier::default()
            },
            default_out_layout: LayoutQualifier {
                xfb_buffer: Some(0),
                ..LayoutQualifier::default()
            },
            deferred_indexes: Vec::new(),
            call_graph: Vec::new(),
        }
    }

    pub fn config(&self) -> &ShaderConfig {
        &self.config
    }

    pub fn sink(&self) -> &InfoSink {
        &self.sink
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut SymbolTable {
        &mut self.table
    }

    pub fn call_graph(&self) -> &[(String, String)] {
        &self.call_graph
    }

    /// Has the configured entry point received a body?
    pub fn entry_point_defined(&self) -> bool {
        self.entry_point_defined
    }

    fn gate(&self) -> GateState<'_> {
        GateState {
            profile: self.config.profile,
            version: self.config.version,
            relaxed_errors: self.config.relaxed_errors,
            extensions: &self.extensions,
        }
    }

    /// Forward one gate verdict to the sink; each verdict is reported at
    /// most once, so repeated checks cannot double-count
    fn report_verdict(&mut self, verdict: Verdict, span: &Span, context: &str) {
        match verdict {
            Verdict::Allowed => {}
            Verdict::Warning(message) => self.sink.warn(span, context, message),
            Verdict::Error(message) => self.sink.error(span, context, message),
        }
    }

    /// Recovery value handed back after an unrecoverable expression error
    fn error_value(&self, span: &Span) -> Node {
        ir::constant(Scalar::Float(0.0), span.clone())
    }

    // ---- expressions ----------------------------------------------------

    pub fn handle_variable(&mut self, name: &str, span: &Span) -> Node {
        let Some(symbol) = self.table.find(name).map(|(s, _)| s.clone()) else {
            self.sink.error(span, name, "undeclared identifier");
            // Insert a recovery symbol so later uses do not cascade
            let id = self.table.fresh_id();
            let ty = Type::scalar(BasicKind::Float);
            self.table.insert(Symbol::variable(id, name, ty.clone()));
            return ir::symbol(id, name, &ty, span.clone());
        };

        if !symbol.required_extensions.is_empty() {
            let verdict =
                feature_gate::require_extensions_any(&self.gate(), &symbol.required_extensions, name);
            self.report_verdict(verdict, span, name);
        }

        if name == "gl_WorkGroupSize" && self.layouts.workgroup_size.is_none() {
            self.sink.error(span, name, "cannot be read before the local group size has been declared");
        }

        let Some(ty) = symbol.var_type().cloned() else {
            self.sink.error(span, name, "function name used as a variable");
            return self.error_value(span);
        };

        if self.io_arrays.register_if_resizable(self.config.stage, &symbol, span) {
            self.io_arrays.check_consistency(true, &mut self.table, &self.layouts, &mut self.sink);
        }

        // The consistency pass may have sized the array just now
        let ty = self
            .table
            .find(name)
            .and_then(|(resolved, _)| resolved.var_type().cloned())
            .unwrap_or(ty);

        ir::symbol(symbol.id, name, &ty, span.clone())
    }

    pub fn handle_index(&mut self, base: Node, index: Node, span: &Span) -> Node {
        if !base.ty.is_array() && !base.ty.is_vector() && !base.ty.is_matrix() {
            self.sink.error(span, "[", "left of '[' is not of type array, matrix, or vector");
            return base;
        }

        if !index.ty.basic.is_integer_family() || !index.ty.is_scalar() {
            self.sink.error(span, "[", "index must be an integer scalar");
        }

        if let Some(value) = index.constant_index() {
            self.check_constant_index(&base, value, span);
        } else {
            self.check_variable_index(&base, span);
        }

        ir::add_index(base, index, span.clone())
    }

    fn check_constant_index(&mut self, base: &Node, value: i64, span: &Span) {
        if value < 0 {
            self.sink.error(span, "[", format!("index out of range '{}'", value));
            return;
        }

        let bound = if base.ty.is_array() {
            match base.ty.outer_array_size() {
                Some(ArraySize::Fixed(n)) => Some(n as i64),
                Some(ArraySize::Unsized) => {
                    // The size may be fixed later; settle in finish()
                    if let Some(symbol) = base.base_symbol() {
                        if let NodeKind::Symbol { name, .. } = &symbol.kind {
                            self.deferred_indexes.push(DeferredIndex {
                                name: name.clone(),
                                index: value,
                                span: span.clone(),
                            });
                        }
                    }
                    None
                }
                _ => None,
            }
        } else if base.ty.is_matrix() {
            Some(base.ty.matrix_cols as i64)
        } else {
            Some(base.ty.vector_size as i64)
        };

        if let Some(bound) = bound {
            if value >= bound {
                self.sink.error(span, "[", format!("index out of range '{}'", value));
            }
        }
    }

    fn check_variable_index(&mut self, base: &Node, span: &Span) {
        let storage = base.ty.qualifier.storage_class();
        match storage {
            StorageClass::Uniform if !self.limits.general_uniform_indexing => {
                self.sink.error(span, "[", "variable indexing of uniforms is not supported");
            }
            StorageClass::In | StorageClass::Out
                if base.ty.is_array() && !self.limits.general_varying_indexing =>
            {
                self.sink.error(span, "[", "variable indexing of inputs and outputs is not supported");
            }
            StorageClass::In
                if (base.ty.is_matrix() || base.ty.is_vector())
                    && self.config.stage == Stage::Vertex
                    && !self.limits.general_attribute_matrix_vector_indexing =>
            {
                self.sink.error(span, "[", "variable indexing of vertex inputs is not supported");
            }
            _ => {}
        }
    }

    /// Dot dereference: struct/block member, vector swizzle, or an error
    pub fn handle_dot(&mut self, base: Node, field: &str, span: &Span) -> Node {
        if base.ty.basic.is_aggregate() && !base.ty.is_array() {
            return self.member_access(base, field, span);
        }

        if base.ty.is_vector() {
            return self.swizzle_access(base, field, span);
        }

        self.sink.error(span, field, format!("field selection requires a structure or vector on the left of '.' (have '{}')", base.ty));
        self.error_value(span)
    }

    fn member_access(&mut self, base: Node, field: &str, span: &Span) -> Node {
        let Some(position) = base
            .ty
            .members
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == field && !m.hidden)
            .map(|(i, _)| i)
        else {
            self.sink.error(span, field, format!("no such field in structure '{}'", base.ty));
            return self.error_value(span);
        };

        let mut ty = base.ty.members[position].ty.clone();
        if ty.qualifier.precision == Precision::None {
            ty.qualifier.precision = base.ty.qualifier.precision;
        }
        let index = ir::constant(Scalar::Int(position as i64), span.clone());
        Node {
            op: Op::Index,
            ty,
            span: span.clone(),
            kind: NodeKind::Binary { left: Box::new(base), right: Box::new(index) },
        }
    }

    fn swizzle_access(&mut self, base: Node, field: &str, span: &Span) -> Node {
        if field.len() > 4 {
            self.sink.error(span, field, "vector swizzle too long");
            return self.error_value(span);
        }

        let mut components = Vec::with_capacity(field.len());
        for ch in field.chars() {
            let component = match ch {
                'x' | 'r' | 's' => 0,
                'y' | 'g' | 't' => 1,
                'z' | 'b' | 'p' => 2,
                'w' | 'a' | 'q' => 3,
                _ => {
                    self.sink.error(span, field, format!("illegal vector field selection '{}'", ch));
                    return self.error_value(span);
                }
            };
            if component >= base.ty.vector_size {
                self.sink.error(span, field, "vector field selection out of range");
                return self.error_value(span);
            }
            components.push(component);
        }

        ir::add_swizzle(base, components, span.clone())
    }

    /// The `.length()` method on arrays
    pub fn handle_length_method(&mut self, base: Node, span: &Span) -> Node {
        if !base.ty.is_array() {
            self.sink.error(span, "length", "can only be applied to an array");
            return ir::constant(Scalar::Int(1), span.clone());
        }

        match base.ty.outer_array_size() {
            Some(ArraySize::Fixed(n)) => ir::constant(Scalar::Int(n as i64), span.clone()),
            _ if base.ty.qualifier.storage_class() == StorageClass::Buffer => {
                // Runtime-sized buffer arrays resolve their length on the GPU
                Node {
                    op: Op::ArrayLength,
                    ty: Type::scalar(BasicKind::Int),
                    span: span.clone(),
                    kind: NodeKind::Unary { operand: Box::new(base) },
                }
            }
            _ => {
                self.sink.error(span, "length", "array must be declared with a size before using this method");
                ir::constant(Scalar::Int(1), span.clone())
            }
        }
    }

    pub fn handle_unary(&mut self, op: Op, operand: Node, span: &Span) -> Node {
        let operand_precision = operand.precision();
        let operand_ty = operand.ty.to_string();

        match ir::add_unary(op, operand, span.clone()) {
            Some(mut node) => {
                let operation = precision::operation_precision(op, &[operand_precision], &[]);
                let result = precision::result_precision(op, Precision::None, operation, Precision::None);
                precision::apply(&mut node, operation, result);
                node
            }
            None => {
                self.sink.error(span, op_token(op), format!("wrong operand type '{}'", operand_ty));
                self.error_value(span)
            }
        }
    }

    pub fn handle_binary(&mut self, op: Op, mut left: Node, mut right: Node, span: &Span) -> Node {
        // Scalar implicit conversions before the type rules apply
        if left.ty.basic != right.ty.basic {
            if ir::can_implicitly_convert(&left.ty.basic, &right.ty.basic) {
                left = ir::add_conversion(right.ty.basic.clone(), left, span.clone());
            } else if ir::can_implicitly_convert(&right.ty.basic, &left.ty.basic) {
                right = ir::add_conversion(left.ty.basic.clone(), right, span.clone());
            }
        }

        let operation = precision::operation_precision(op, &[left.precision(), right.precision()], &[]);
        let types = (left.ty.to_string(), right.ty.to_string());

        match ir::add_binary(op, left, right, span.clone()) {
            Some(mut node) => {
                let result = precision::result_precision(op, Precision::None, operation, Precision::None);
                precision::apply(&mut node, operation, result);
                node
            }
            None => {
                self.sink.error(
                    span,
                    op_token(op),
                    format!("wrong operand types: '{}' and '{}'", types.0, types.1),
                );
                self.error_value(span)
            }
        }
    }

    pub fn handle_assign(&mut self, left: Node, mut right: Node, span: &Span) -> Node {
        self.check_lvalue(&left, "=", span);
        self.check_rvalue(&right, span);

        if left.ty.basic != right.ty.basic
            && ir::can_implicitly_convert(&right.ty.basic, &left.ty.basic)
        {
            right = ir::add_conversion(left.ty.basic.clone(), right, span.clone());
        }

        let types = (left.ty.to_string(), right.ty.to_string());
        match ir::add_assign(left, right, span.clone()) {
            Some(node) => node,
            None => {
                self.sink
                    .error(span, "=", format!("cannot convert from '{}' to '{}'", types.1, types.0));
                self.error_value(span)
            }
        }
    }

    /// Is `node` a writable l-value? Reports the failure itself.
    fn check_lvalue(&mut self, node: &Node, context: &str, span: &Span) -> bool {
        if let NodeKind::Swizzle { components, .. } = &node.kind {
            let mut seen = [false; 4];
            for &c in components {
                if seen[c as usize] {
                    self.sink.error(span, context, "l-value of swizzle cannot have duplicate components");
                    return false;
                }
                seen[c as usize] = true;
            }
        }

        let Some(base) = node.base_symbol() else {
            self.sink.error(span, context, "l-value required");
            return false;
        };
        let name = base.symbol_name().unwrap_or_default().to_string();
        let qualifier = &base.ty.qualifier;

        match qualifier.storage_class() {
            StorageClass::Const => {
                self.sink.error(span, context, format!("can't modify a constant '{}'", name));
                false
            }
            StorageClass::In => {
                self.sink.error(
                    span,
                    context,
                    format!("cannot store to an input in the {} stage ('{}')", self.config.stage, name),
                );
                false
            }
            StorageClass::Uniform => {
                self.sink.error(span, context, format!("cannot modify a uniform '{}'", name));
                false
            }
            _ if qualifier.memory.contains(MemoryFlags::READONLY) => {
                self.sink.error(span, context, format!("cannot modify a read-only variable '{}'", name));
                false
            }
            _ => true,
        }
    }

    /// Values designated write-only may not be read
    fn check_rvalue(&mut self, node: &Node, span: &Span) {
        if let Some(base) = node.base_symbol() {
            if base.ty.qualifier.memory.contains(MemoryFlags::WRITEONLY) {
                let name = base.symbol_name().unwrap_or_default();
                self.sink.error(span, name, "reading a write-only variable");
            }
        }
    }

    pub fn handle_constructor(&mut self, ty: Type, args: Vec<Node>, span: &Span) -> Node {
        if ty.basic == BasicKind::Double {
            let verdict = self.gate_double("double-precision constructor");
            self.report_verdict(verdict, span, &ty.to_string());
        }

        if let Err(error) = builtins::check_constructor(&ty, &args) {
            self.sink.error(span, &ty.to_string(), error.to_string());
        }

        let operation = precision::operation_precision(
            Op::Construct,
            &args.iter().map(|a| a.precision()).collect::<Vec<_>>(),
            &[],
        );
        let declared = ty.qualifier.precision;
        let mut node = ir::make_aggregate(Op::Construct, None, args, ty, span.clone());
        let result = precision::result_precision(Op::Construct, declared, operation, Precision::None);
        precision::apply(&mut node, operation, result);
        node
    }

    pub fn handle_function_call(&mut self, name: &str, mut args: Vec<Node>, span: &Span) -> Node {
        for arg in &args {
            self.check_rvalue(arg, span);
        }

        let arg_types: Vec<&Type> = args.iter().map(|a| &a.ty).collect();
        let symbol = match builtins::find_function(&self.table, name, &arg_types) {
            Ok(symbol) => symbol,
            Err(error) => {
                self.sink.error(span, name, error.to_string());
                return self.error_value(span);
            }
        };

        if !symbol.required_extensions.is_empty() {
            let verdict =
                feature_gate::require_extensions_any(&self.gate(), &symbol.required_extensions, name);
            self.report_verdict(verdict, span, name);
        }

        let SymbolInfo::Function { params, return_type, op, .. } = &symbol.info else {
            self.sink.error(span, name, "called object is not a function");
            return self.error_value(span);
        };
        let (params, return_type, op) = (params.clone(), return_type.clone(), *op);

        if op.is_barrier() && self.past_entry_point_return {
            self.sink.error(span, name, "cannot be invoked after a return from the entry point");
        }

        for (param, arg) in params.iter().zip(&args) {
            if param.ty.qualifier.storage_class().is_written_param() {
                self.check_lvalue(arg, name, span);
            }
        }

        if op == Op::TextureOffset {
            self.check_texel_offset(&args, span);
        }

        let conversions = builtins::convert_arguments(&mut self.table, &symbol, &mut args, span);

        let arg_precisions: Vec<Precision> = args.iter().map(|a| a.precision()).collect();
        let formal_precisions: Vec<Precision> =
            params.iter().map(|p| p.ty.qualifier.precision).collect();
        let resource = args
            .iter()
            .find(|a| a.ty.is_opaque())
            .map(|a| a.precision())
            .unwrap_or(Precision::None);

        let operation = precision::operation_precision(op, &arg_precisions, &formal_precisions);
        let result = precision::result_precision(op, Precision::None, operation, resource);

        let mut node = if op == Op::FunctionCall {
            let caller = self
                .current_function
                .as_ref()
                .map(|f| f.key.clone())
                .unwrap_or_else(|| self.config.entry_point.clone());
            self.call_graph.push((caller, symbol.key.clone()));
            ir::make_aggregate(Op::FunctionCall, Some(symbol.key.clone()), args, return_type, span.clone())
        } else {
            ir::make_aggregate(op, None, args, return_type, span.clone())
        };
        precision::apply(&mut node, operation, result);

        if conversions.is_empty() {
            node
        } else {
            builtins::sequence_out_conversions(&mut self.table, node, conversions, span)
        }
    }

    fn check_texel_offset(&mut self, args: &[Node], span: &Span) {
        let Some(offset) = args.get(2) else {
            return;
        };
        if let NodeKind::Constant(values) = &offset.kind {
            for value in values {
                if let Scalar::Int(v) = value {
                    if *v < self.limits.min_program_texel_offset as i64
                        || *v > self.limits.max_program_texel_offset as i64
                    {
                        self.sink.error(
                            span,
                            "texel offset",
                            format!(
                                "value is out of range [{}, {}]",
                                self.limits.min_program_texel_offset, self.limits.max_program_texel_offset
                            ),
                        );
                    }
                }
            }
        }
    }

    // ---- declarations ---------------------------------------------------

    /// Declare a variable in the current scope; returns the initializer
    /// assignment when there is one
    pub fn declare_variable(
        &mut self,
        name: &str,
        mut ty: Type,
        initializer: Option<Node>,
        span: &Span,
    ) -> Option<Node> {
        if ty.basic == BasicKind::Double {
            let verdict = self.gate_double("double-precision type");
            self.report_verdict(verdict, span, name);
        }
        if ty.qualifier.nonuniform {
            let verdict = feature_gate::require_extensions_any(
                &self.gate(),
                &[EXT_NONUNIFORM_QUALIFIER],
                "nonuniform qualifier",
            );
            self.report_verdict(verdict, span, name);
        }
        if ty.qualifier.storage_class() == StorageClass::Shared
            && !matches!(self.config.stage, Stage::Compute | Stage::Task | Stage::Mesh)
        {
            self.sink.error(span, name, "shared variables are only allowed in compute-family stages");
        }

        if self.table.depth() == 0 {
            self.apply_global_defaults(&mut ty, name, span);
        }

        // Adopt a size from the initializer when the declaration left it open
        if ty.is_unsized_array() {
            if let Some(init) = &initializer {
                if let Some(ArraySize::Fixed(n)) = init.ty.outer_array_size() {
                    ty.set_outer_array_size(n);
                }
            }
        }

        let governed = governing_rule(self.config.stage, &ty.qualifier).is_some();
        if ty.is_unsized_array()
            && !governed
            && initializer.is_none()
            && ty.qualifier.storage_class() != StorageClass::Buffer
        {
            self.sink.error(span, name, "array size required");
        }

        let id = self.table.fresh_id();
        let mut symbol = Symbol::variable(id, name, ty.clone());
        symbol.span = span.clone();

        let resizable = self.io_arrays.register_if_resizable(self.config.stage, &symbol, span);

        if !self.table.insert(symbol) {
            self.sink.error(span, name, "redefinition");
        }
        if resizable {
            self.io_arrays.check_consistency(true, &mut self.table, &self.layouts, &mut self.sink);
        }

        let mut init = initializer?;
        if ty.qualifier.is_constant() && !init.is_constant() {
            self.sink.error(span, name, "assigning non-constant to a constant");
        }
        if init.ty.basic != ty.basic && ir::can_implicitly_convert(&init.ty.basic, &ty.basic) {
            init = ir::add_conversion(ty.basic.clone(), init, span.clone());
        }

        let target = ir::symbol(id, name, &ty, span.clone());
        match ir::add_assign(target, init, span.clone()) {
            Some(node) => Some(node),
            None => {
                self.sink.error(span, name, format!("cannot convert initializer to '{}'", ty));
                None
            }
        }
    }

    /// Apply per-context defaults to a global declaration
    fn apply_global_defaults(&mut self, ty: &mut Type, name: &str, span: &Span) {
        if self.config.is_es()
            && ty.basic.accepts_precision()
            && ty.qualifier.precision == Precision::None
            && self.config.parse_mode == ParseMode::Shader
        {
            match self.default_precision.get(&ty.basic) {
                Some(precision) => ty.qualifier.precision = *precision,
                None => {
                    self.sink.error(span, name, format!("no default precision defined for type '{}'", ty.basic));
                }
            }
        }

        // Fill layout attributes the declaration left open from the
        // current block defaults; explicit attributes win
        let defaults = match ty.qualifier.storage_class() {
            StorageClass::Uniform => Some(&self.default_uniform_layout),
            StorageClass::Buffer => Some(&self.default_buffer_layout),
            StorageClass::Out if ty.qualifier.layout.xfb_offset.is_some() => {
                Some(&self.default_out_layout)
            }
            _ => None,
        };
        if let Some(defaults) = defaults {
            let mut filled = defaults.clone();
            filled.merge(&ty.qualifier.layout);
            ty.qualifier.layout = filled;
        }
    }

    fn gate_double(&self, feature: &str) -> Verdict {
        let gate = self.gate();
        let profile = feature_gate::require_profile(
            &gate,
            &[Profile::None, Profile::Core, Profile::Compatibility],
            feature,
        );
        if profile.is_error() {
            return profile;
        }
        feature_gate::profile_requires(
            &gate,
            &[Profile::None, Profile::Core, Profile::Compatibility],
            400,
            &[ARB_GPU_SHADER_FP64],
            feature,
        )
    }

    /// Redeclare a built-in variable, specializing the writable copy
    pub fn redeclare_builtin_variable(&mut self, name: &str, new_ty: Type, span: &Span) {
        if !name.starts_with("gl_") {
            self.sink.error(span, name, "can only redeclare built-in variables");
            return;
        }

        let Some((symbol, _)) = self.table.find(name) else {
            self.sink.error(span, name, "undeclared identifier");
            return;
        };
        let Some(original) = symbol.var_type().cloned() else {
            self.sink.error(span, name, "cannot redeclare a function as a variable");
            return;
        };

        let sized_variant = original.is_unsized_array()
            && new_ty.is_array()
            && original.dereferenced().same_shape(&new_ty.dereferenced());
        if !original.same_shape(&new_ty) && !sized_variant {
            self.sink.error(span, name, "cannot change the type of a built-in variable");
            return;
        }

        // The shared root stays untouched; only this compilation sees the copy
        let Some(copy) = self.table.copy_up(name) else {
            return;
        };
        if let Some(ty) = copy.var_type_mut() {
            if let Some(ArraySize::Fixed(n)) = new_ty.outer_array_size() {
                ty.set_outer_array_size(n);
            }
            ty.qualifier.invariant |= new_ty.qualifier.invariant;
            if new_ty.qualifier.precision != Precision::None {
                ty.qualifier.precision = new_ty.qualifier.precision;
            }
            if new_ty.qualifier.interpolation.is_some() {
                ty.qualifier.interpolation = new_ty.qualifier.interpolation;
            }
            ty.qualifier.layout.merge(&new_ty.qualifier.layout);
        }
    }

    /// Redeclare a built-in interface block, keeping the listed members and
    /// hiding the rest
    pub fn redeclare_builtin_block(&mut self, name: &str, kept: Vec<TypeMember>, span: &Span) {
        let Some((symbol, _)) = self.table.find(name) else {
            self.sink.error(span, name, "no built-in block to redeclare");
            return;
        };
        let Some(original) = symbol.var_type().cloned() else {
            self.sink.error(span, name, "not a block");
            return;
        };
        if original.basic != BasicKind::Block {
            self.sink.error(span, name, "cannot redeclare a non-block as a block");
            return;
        }

        for member in &kept {
            match original.members.iter().find(|m| m.name == member.name) {
                Some(existing) => {
                    if !existing.ty.same_shape(&member.ty)
                        && !(existing.ty.is_unsized_array()
                            && member.ty.is_array()
                            && existing.ty.dereferenced().same_shape(&member.ty.dereferenced()))
                    {
                        self.sink.error(
                            span,
                            &member.name,
                            "cannot change the type of a built-in block member",
                        );
                    }
                }
                None => {
                    self.sink.error(span, &member.name, "no such member in the built-in block");
                }
            }
        }

        let Some(copy) = self.table.copy_up(name) else {
            return;
        };
        if let Some(ty) = copy.var_type_mut() {
            for member in &mut ty.members {
                match kept.iter().find(|k| k.name == member.name) {
                    Some(redeclared) => {
                        if let Some(ArraySize::Fixed(n)) = redeclared.ty.outer_array_size() {
                            member.ty.set_outer_array_size(n);
                        }
                    }
                    None => member.hidden = true,
                }
            }
        }
    }

    /// `precision <level> <type>;`
    pub fn set_default_precision(&mut self, basic: BasicKind, level: Precision, span: &Span) {
        if !basic.accepts_precision() {
            self.sink.error(span, &basic.to_string(), "precision statement not allowed for this type");
            return;
        }
        self.default_precision.insert(basic, level);
    }

    pub fn default_precision_for(&self, basic: &BasicKind) -> Option<Precision> {
        self.default_precision.get(basic).copied()
    }

    /// `layout(...) uniform;` and friends: update the defaults that later
    /// global declarations of that storage class inherit
    pub fn update_default_layout(&mut self, storage: StorageClass, layout: &LayoutQualifier, span: &Span) {
        match storage {
            StorageClass::Uniform => self.default_uniform_layout.merge(layout),
            StorageClass::Buffer => self.default_buffer_layout.merge(layout),
            StorageClass::Out => self.default_out_layout.merge(layout),
            other => {
                self.sink.error(
                    span,
                    &other.to_string(),
                    "default layouts apply to uniform, buffer, or out declarations",
                );
            }
        }
    }

    pub fn default_layout_for(&self, storage: StorageClass) -> Option<&LayoutQualifier> {
        match storage {
            StorageClass::Uniform => Some(&self.default_uniform_layout),
            StorageClass::Buffer => Some(&self.default_buffer_layout),
            StorageClass::Out => Some(&self.default_out_layout),
            _ => None,
        }
    }

    // ---- directives -----------------------------------------------------

    /// `#extension <name> : <behavior>`
    pub fn handle_extension(&mut self, extension: &str, behavior: &str, span: &Span) {
        let behavior = match behavior {
            "enable" => ExtensionBehavior::Enable,
            "require" => ExtensionBehavior::Require,
            "warn" => ExtensionBehavior::Warn,
            "disable" => ExtensionBehavior::Disable,
            other => {
                self.sink.error(span, extension, format!("behavior '{}' is not supported", other));
                return;
            }
        };
        self.extensions.set_behavior(extension, behavior);
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Forward a `#pragma` line to the embedder's handler
    pub fn handle_pragma(&mut self, span: &Span, tokens: &[String], handler: &mut dyn PragmaHandler) {
        if tokens.is_empty() {
            self.sink.warn(span, "#pragma", "empty pragma");
            return;
        }
        handler.handle_pragma(span, tokens);
    }

    // ---- stage layout declarations --------------------------------------

    pub fn set_input_primitive(&mut self, primitive: InputPrimitive, span: &Span) {
        if self.config.stage != Stage::Geometry {
            self.sink.error(span, primitive.name(), "input primitive only allowed in the geometry stage");
            return;
        }
        if let Some(existing) = self.layouts.input_primitive {
            if existing != primitive {
                self.sink.error(
                    span,
                    primitive.name(),
                    format!("cannot change previously declared input primitive '{}'", existing.name()),
                );
                return;
            }
        }
        self.layouts.input_primitive = Some(primitive);
        self.io_arrays.check_consistency(false, &mut self.table, &self.layouts, &mut self.sink);
    }

    pub fn set_output_vertices(&mut self, count: u32, span: &Span) {
        let limit = match self.config.stage {
            Stage::TessControl => self.limits.max_patch_vertices,
            Stage::Mesh => self.limits.max_mesh_output_vertices,
            Stage::Geometry => self.limits.max_geometry_output_vertices,
            _ => {
                self.sink.error(span, "vertices", "not allowed in this stage");
                return;
            }
        };
        if count > limit {
            self.sink.error(span, "vertices", format!("'{}' exceeds the stage limit ({})", count, limit));
            return;
        }
        if let Some(existing) = self.layouts.output_vertices {
            if existing != count {
                self.sink.error(span, "vertices", "cannot change previously declared output vertex count");
                return;
            }
        }
        self.layouts.output_vertices = Some(count);
        self.io_arrays.check_consistency(false, &mut self.table, &self.layouts, &mut self.sink);
    }

    pub fn set_output_primitives(&mut self, count: u32, span: &Span) {
        if self.config.stage != Stage::Mesh {
            self.sink.error(span, "max_primitives", "only allowed in the mesh stage");
            return;
        }
        if count > self.limits.max_mesh_output_primitives {
            self.sink.error(
                span,
                "max_primitives",
                format!("'{}' exceeds the stage limit ({})", count, self.limits.max_mesh_output_primitives),
            );
            return;
        }
        self.layouts.output_primitives = Some(count);
        self.io_arrays.check_consistency(false, &mut self.table, &self.layouts, &mut self.sink);
    }

    pub fn set_workgroup_size(&mut self, size: [u32; 3], span: &Span) {
        if !matches!(self.config.stage, Stage::Compute | Stage::Task | Stage::Mesh) {
            self.sink.error(span, "local_size", "only allowed in compute-family stages");
            return;
        }
        for (axis, (&value, &limit)) in
            size.iter().zip(&self.limits.max_compute_workgroup_size).enumerate()
        {
            if value == 0 || value > limit {
                self.sink.error(
                    span,
                    "local_size",
                    format!("dimension {} value '{}' is out of range (max {})", axis, value, limit),
                );
            }
        }
        self.layouts.workgroup_size = Some(size);
    }

    pub fn stage_layouts(&self) -> &StageLayouts {
        &self.layouts
    }

    // ---- functions ------------------------------------------------------

    /// Declare a function prototype; returns its signature key
    pub fn declare_function_prototype(
        &mut self,
        name: &str,
        params: Vec<FunctionParam>,
        return_type: Type,
        span: &Span,
    ) -> String {
        let key = mangle_function(name, &params);
        if self.table.find(&key).is_none() {
            let id = self.table.fresh_id();
            let mut symbol = Symbol::function(id, name, params, return_type, Op::FunctionCall);
            symbol.span = span.clone();
            self.table.insert_global(symbol);
        }
        key
    }

    /// Open a function body; discriminates "already defined" from "prototype
    /// now getting its body" and binds the return type for return checks
    pub fn begin_function_definition(
        &mut self,
        name: &str,
        params: Vec<FunctionParam>,
        return_type: Type,
        span: &Span,
    ) {
        let is_entry_point = name == self.config.entry_point;
        if is_entry_point {
            if return_type.basic != BasicKind::Void {
                self.sink.error(span, name, "entry point must return void");
            }
            if !params.is_empty() {
                self.sink.error(span, name, "entry point cannot have parameters");
            }
            self.entry_point_defined = true;
        }

        let key = mangle_function(name, &params);
        match self.table.find(&key) {
            Some((existing, is_builtin)) => {
                if is_builtin || existing.builtin {
                    self.sink.error(span, name, "built-in functions cannot be redefined");
                } else if let SymbolInfo::Function { defined, return_type: declared, .. } = &existing.info {
                    if *defined {
                        self.sink.error(span, name, "function already has a body");
                    } else if !declared.same_shape(&return_type) {
                        self.sink.error(span, name, "function return type does not match prototype");
                    }
                    if let Some(symbol) = self.table.find_mut(&key) {
                        if let SymbolInfo::Function { defined, .. } = &mut symbol.info {
                            *defined = true;
                        }
                    }
                }
            }
            None => {
                let id = self.table.fresh_id();
                let mut symbol =
                    Symbol::function(id, name, params.clone(), return_type.clone(), Op::FunctionCall);
                symbol.span = span.clone();
                if let SymbolInfo::Function { defined, .. } = &mut symbol.info {
                    *defined = true;
                }
                self.table.insert_global(symbol);
            }
        }

        self.current_function = Some(FunctionFrame {
            name: name.to_string(),
            key,
            return_type,
            is_entry_point,
            returned: false,
        });

        self.table.push_scope();
        for param in params {
            if let Some(param_name) = &param.name {
                let id = self.table.fresh_id();
                if !self.table.insert(Symbol::variable(id, param_name, param.ty.clone())) {
                    self.sink.error(span, param_name, "redefinition of parameter");
                }
            }
        }
    }

    pub fn end_function_definition(&mut self, span: &Span) {
        if let Some(frame) = self.current_function.take() {
            if frame.return_type.basic != BasicKind::Void && !frame.returned {
                self.sink.error(span, &frame.name, "function does not return a value");
            }
        }
        self.table.pop_scope();
    }

    pub fn handle_return(&mut self, value: Option<Node>, span: &Span) -> Node {
        let return_type = match &mut self.current_function {
            Some(frame) => {
                frame.returned = true;
                if frame.is_entry_point {
                    self.past_entry_point_return = true;
                }
                frame.return_type.clone()
            }
            None => {
                self.sink.error(span, "return", "return outside of a function body");
                Type::scalar(BasicKind::Void)
            }
        };

        let operand = match (value, return_type.basic == BasicKind::Void) {
            (Some(_), true) => {
                self.sink.error(span, "return", "void function cannot return a value");
                None
            }
            (None, false) => {
                self.sink.error(span, "return", "non-void function must return a value");
                None
            }
            (Some(mut node), false) => {
                if node.ty.basic != return_type.basic
                    && ir::can_implicitly_convert(&node.ty.basic, &return_type.basic)
                {
                    node = ir::add_conversion(return_type.basic.clone(), node, span.clone());
                }
                if !node.ty.same_shape(&return_type) {
                    self.sink.error(
                        span,
                        "return",
                        format!("cannot convert return value from '{}' to '{}'", node.ty, return_type),
                    );
                }
                Some(Box::new(node))
            }
            (None, true) => None,
        };

        Node {
            op: Op::Return,
            ty: Type::scalar(BasicKind::Void),
            span: span.clone(),
            kind: NodeKind::Branch { operand },
        }
    }

    // ---- control flow ---------------------------------------------------

    pub fn begin_loop(&mut self) {
        self.loop_depth += 1;
    }

    pub fn end_loop(
        &mut self,
        test: Option<Node>,
        body: Option<Node>,
        terminal: Option<Node>,
        test_first: bool,
        span: &Span,
    ) -> Node {
        debug_assert!(self.loop_depth > 0);
        self.loop_depth = self.loop_depth.saturating_sub(1);

        if let Some(test) = &test {
            if test.ty.basic != BasicKind::Bool || !test.ty.is_scalar() {
                self.sink.error(span, "loop", "boolean expression expected");
            }
        }

        Node {
            op: Op::Sequence,
            ty: Type::scalar(BasicKind::Void),
            span: span.clone(),
            kind: NodeKind::Loop {
                test: test.map(Box::new),
                body: body.map(Box::new),
                terminal: terminal.map(Box::new),
                test_first,
            },
        }
    }

    pub fn begin_switch(&mut self) {
        self.switch_depth += 1;
    }

    pub fn end_switch(&mut self) {
        self.switch_depth = self.switch_depth.saturating_sub(1);
    }

    pub fn handle_selection(
        &mut self,
        condition: Node,
        then_branch: Option<Node>,
        else_branch: Option<Node>,
        span: &Span,
    ) -> Node {
        if condition.ty.basic != BasicKind::Bool || !condition.ty.is_scalar() {
            self.sink.error(span, "if", "boolean expression expected");
        }
        Node {
            op: Op::Sequence,
            ty: Type::scalar(BasicKind::Void),
            span: span.clone(),
            kind: NodeKind::Selection {
                condition: Box::new(condition),
                then_branch: then_branch.map(Box::new),
                else_branch: else_branch.map(Box::new),
            },
        }
    }

    pub fn handle_break(&mut self, span: &Span) -> Node {
        if self.loop_depth == 0 && self.switch_depth == 0 {
            self.sink.error(span, "break", "break statement only allowed in loops and switch statements");
        }
        Node {
            op: Op::Break,
            ty: Type::scalar(BasicKind::Void),
            span: span.clone(),
            kind: NodeKind::Branch { operand: None },
        }
    }

    pub fn handle_continue(&mut self, span: &Span) -> Node {
        if self.loop_depth == 0 {
            self.sink.error(span, "continue", "continue statement only allowed in loops");
        }
        Node {
            op: Op::Continue,
            ty: Type::scalar(BasicKind::Void),
            span: span.clone(),
            kind: NodeKind::Branch { operand: None },
        }
    }

    // ---- finish ---------------------------------------------------------

    /// Settle every deferred check and yield acceptance
    pub fn finish(&mut self) -> bool {
        if matches!(self.config.stage, Stage::Task | Stage::Mesh) {
            let verdict = feature_gate::require_extensions_any(
                &self.gate(),
                &[EXT_MESH_SHADER],
                "mesh shading stage",
            );
            self.report_verdict(verdict, &Span::default(), "stage");
        }

        self.io_arrays.check_consistency(false, &mut self.table, &self.layouts, &mut self.sink);

        let deferred = std::mem::take(&mut self.deferred_indexes);
        for check in deferred {
            let bound = if check.name == "gl_ClipDistance" {
                Some(self.limits.max_clip_distances as i64)
            } else {
                match self.table.find(&check.name) {
                    Some((symbol, _)) => symbol
                        .var_type()
                        .and_then(|ty| ty.outer_array_size())
                        .and_then(|size| match size {
                            ArraySize::Fixed(n) => Some(n as i64),
                            _ => None,
                        }),
                    None => None,
                }
            };
            if let Some(bound) = bound {
                if check.index >= bound {
                    self.sink
                        .error(&check.span, &check.name, format!("index out of range '{}'", check.index));
                }
            }
        }

        !self.sink.has_errors()
    }
}

/// Source token for an operator, used as diagnostic context
fn op_token(op: Op) -> &'static str {
    match op {
        Op::Negate => "-",
        Op::LogicalNot => "!",
        Op::BitNot => "~",
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Mod => "%",
        Op::Equal => "==",
        Op::NotEqual => "!=",
        Op::Less => "<",
        Op::Greater => ">",
        Op::LessEqual => "<=",
        Op::GreaterEqual => ">=",
        Op::LogicalAnd => "&&",
        Op::LogicalOr => "||",
        Op::Assign => "=",
        _ => "expression",
    }
}
