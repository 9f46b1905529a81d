//! End-to-end analyzer scenarios driven through the embedding façade

use std::sync::Arc;

use compiler::{builtin_root, Analyzer, Profile, ResourceLimits, ShaderConfig, Stage};
use front_end::qualifier::{Qualifier, StorageClass};
use front_end::source_location::Span;
use front_end::types::{ArraySize, BasicKind, Type};
use middle_end::ir::{self, Node, Op, Scalar};
use middle_end::sema::io_arrays::InputPrimitive;
use middle_end::sema::parse_context::ParseContext;

fn span() -> Span {
    Span::new(1, 1, 1, 1)
}

fn fragment_analyzer() -> Analyzer {
    Analyzer::new(
        ShaderConfig::new(Stage::Fragment, 450, Profile::Core),
        ResourceLimits::default(),
    )
}

fn vec4_literal(ctx: &mut ParseContext) -> Node {
    let args = vec![
        ir::constant(Scalar::Float(1.0), span()),
        ir::constant(Scalar::Float(0.0), span()),
        ir::constant(Scalar::Float(0.0), span()),
        ir::constant(Scalar::Float(1.0), span()),
    ];
    ctx.handle_constructor(Type::vector(BasicKind::Float, 4), args, &span())
}

#[test]
fn test_fragment_unit_is_accepted() {
    let mut analyzer = fragment_analyzer();
    let ctx = analyzer.context();

    ctx.declare_variable(
        "color",
        Type::vector(BasicKind::Float, 4).with_qualifier(Qualifier::of_storage(StorageClass::Out)),
        None,
        &span(),
    );
    ctx.begin_function_definition("main", Vec::new(), Type::scalar(BasicKind::Void), &span());

    // color = vec4(gl_FragCoord.xy, 0.0, 1.0);
    let coord = ctx.handle_variable("gl_FragCoord", &span());
    let xy = ctx.handle_dot(coord, "xy", &span());
    let value = ctx.handle_constructor(
        Type::vector(BasicKind::Float, 4),
        vec![xy, ir::constant(Scalar::Float(0.0), span()), ir::constant(Scalar::Float(1.0), span())],
        &span(),
    );
    let target = ctx.handle_variable("color", &span());
    ctx.handle_assign(target, value, &span());

    ctx.end_function_definition(&span());

    let analysis = analyzer.finish();
    assert!(analysis.accepted, "report: {}", analysis.report);
    assert_eq!(analysis.error_count, 0);
}

#[test]
fn test_fragment_unit_writing_an_input_is_rejected() {
    let mut analyzer = fragment_analyzer();
    let ctx = analyzer.context();

    ctx.begin_function_definition("main", Vec::new(), Type::scalar(BasicKind::Void), &span());
    let target = ctx.handle_variable("gl_FragCoord", &span());
    let value = vec4_literal(ctx);
    ctx.handle_assign(target, value, &span());
    ctx.end_function_definition(&span());

    let analysis = analyzer.finish();
    assert!(!analysis.accepted);
    assert_eq!(analysis.error_count, 1, "report: {}", analysis.report);
    assert!(analysis.report.contains("fragment"), "report: {}", analysis.report);
    assert!(analysis.report.contains("1 error(s)"));
}

#[test]
fn test_geometry_unit_with_sized_inputs() {
    let mut analyzer = Analyzer::new(
        ShaderConfig::new(Stage::Geometry, 450, Profile::Core),
        ResourceLimits::default(),
    );
    let ctx = analyzer.context();

    ctx.set_input_primitive(InputPrimitive::Triangles, &span());
    ctx.set_output_vertices(3, &span());
    ctx.begin_function_definition("main", Vec::new(), Type::scalar(BasicKind::Void), &span());

    // gl_Position = gl_in[i].gl_Position; EmitVertex(); for each vertex
    for vertex in 0..3 {
        let input = ctx.handle_variable("gl_in", &span());
        let index = ir::constant(Scalar::Int(vertex), span());
        let element = ctx.handle_index(input, index, &span());
        let position = ctx.handle_dot(element, "gl_Position", &span());
        let target = ctx.handle_variable("gl_Position", &span());
        ctx.handle_assign(target, position, &span());

        let emit = ctx.handle_function_call("EmitVertex", Vec::new(), &span());
        assert_eq!(emit.op, Op::EmitVertex);
    }
    ctx.handle_function_call("EndPrimitive", Vec::new(), &span());
    ctx.end_function_definition(&span());

    let analysis = analyzer.finish();
    assert!(analysis.accepted, "report: {}", analysis.report);

    // gl_in took its size from the input primitive
    // (indexing with 0..3 stayed within it)
    assert_eq!(analysis.error_count, 0);
}

#[test]
fn test_geometry_input_index_out_of_primitive_range() {
    let mut analyzer = Analyzer::new(
        ShaderConfig::new(Stage::Geometry, 450, Profile::Core),
        ResourceLimits::default(),
    );
    let ctx = analyzer.context();

    ctx.begin_function_definition("main", Vec::new(), Type::scalar(BasicKind::Void), &span());
    // Indexed before the primitive is declared; the bound settles later
    let input = ctx.handle_variable("gl_in", &span());
    let index = ir::constant(Scalar::Int(5), span());
    ctx.handle_index(input, index, &span());
    ctx.set_input_primitive(InputPrimitive::Triangles, &span());
    ctx.end_function_definition(&span());

    let analysis = analyzer.finish();
    assert!(!analysis.accepted);
    assert!(analysis.report.contains("index out of range '5'"), "report: {}", analysis.report);
}

#[test]
fn test_shared_builtin_root_across_analyzers() {
    let config = ShaderConfig::new(Stage::Fragment, 450, Profile::Core);
    let limits = ResourceLimits::default();
    let root = builtin_root(&config);

    // First unit specializes gl_FragDepth; second must still see the original
    let mut first = Analyzer::with_builtins(config.clone(), limits.clone(), Arc::clone(&root));
    let mut redeclared = Type::scalar(BasicKind::Float);
    redeclared.qualifier.invariant = true;
    first.context().redeclare_builtin_variable("gl_FragDepth", redeclared, &span());
    assert!(first.finish().accepted);

    let mut second = Analyzer::with_builtins(config, limits, root);
    let ctx = second.context();
    let (symbol, is_builtin) = ctx.table().find("gl_FragDepth").expect("built-in should resolve");
    assert!(is_builtin);
    assert!(
        !symbol.var_type().unwrap().qualifier.invariant,
        "one unit's redeclaration must not leak into another"
    );
}

#[test]
fn test_tess_control_unit_with_deferred_output_sizing() {
    let mut analyzer = Analyzer::new(
        ShaderConfig::new(Stage::TessControl, 450, Profile::Core),
        ResourceLimits::default(),
    );
    let ctx = analyzer.context();

    ctx.begin_function_definition("main", Vec::new(), Type::scalar(BasicKind::Void), &span());
    let output = ctx.handle_variable("gl_out", &span());
    assert!(output.ty.is_unsized_array(), "output size is not known yet");

    ctx.set_output_vertices(4, &span());
    let (resolved, _) = ctx.table().find("gl_out").unwrap();
    assert_eq!(resolved.var_type().unwrap().outer_array_size(), Some(ArraySize::Fixed(4)));

    ctx.end_function_definition(&span());
    let analysis = analyzer.finish();
    assert!(analysis.accepted, "report: {}", analysis.report);
}

#[test]
fn test_report_renders_context_and_location() {
    let mut analyzer = fragment_analyzer();
    let ctx = analyzer.context();
    ctx.handle_variable("no_such_thing", &Span::new(3, 7, 3, 20));

    let analysis = analyzer.finish();
    assert!(!analysis.accepted);
    assert!(analysis.report.contains("error: 'no_such_thing'"), "report: {}", analysis.report);
    assert!(analysis.report.contains("undeclared identifier"));
    assert!(analysis.report.contains("3"), "the location should appear in the report");
}
