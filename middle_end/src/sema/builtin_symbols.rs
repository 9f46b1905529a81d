//! Seeding of the shared built-in symbol scope
//!
//! One scope is built per (stage, version, profile) configuration and
//! shared read-only across every compilation that uses that
//! configuration. Symbols carry the fixed opcode built-in calls resolve
//! to and the extensions that must be enabled before use.

use std::sync::Arc;

use front_end::qualifier::{Auxiliary, MemoryFlags, Precision, StorageClass};
use front_end::types::{ArraySize, BasicKind, SampledKind, SamplerShape, Type, TypeMember};
use front_end::version::{ShaderConfig, Stage, TargetEnv};

use crate::ir::Op;
use crate::sema::feature_gate::{ARB_GPU_SHADER_FP64, EXT_MULTIVIEW};
use crate::sema::symbol_table::{FunctionParam, Scope, Symbol};

struct Seeder {
    scope: Scope,
    next_id: u64,
}

impl Seeder {
    fn new() -> Self {
        Self { scope: Scope::new(), next_id: 1 }
    }

    fn id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn variable(&mut self, name: &str, ty: Type) {
        let id = self.id();
        self.scope.insert(Symbol::variable(id, name, ty).as_builtin());
    }

    fn variable_requiring(&mut self, name: &str, ty: Type, extensions: &[&'static str]) {
        let id = self.id();
        self.scope.insert(Symbol::variable(id, name, ty).as_builtin().requiring(extensions));
    }

    fn function(&mut self, name: &str, params: Vec<FunctionParam>, ret: Type, op: Op) {
        let id = self.id();
        self.scope.insert(Symbol::function(id, name, params, ret, op).as_builtin());
    }

    fn function_requiring(
        &mut self,
        name: &str,
        params: Vec<FunctionParam>,
        ret: Type,
        op: Op,
        extensions: &[&'static str],
    ) {
        let id = self.id();
        self.scope
            .insert(Symbol::function(id, name, params, ret, op).as_builtin().requiring(extensions));
    }
}

fn highp(mut ty: Type) -> Type {
    ty.qualifier.precision = Precision::High;
    ty
}

fn storage(mut ty: Type, class: StorageClass) -> Type {
    ty.qualifier.storage = Some(class);
    ty
}

fn in_param(ty: Type) -> FunctionParam {
    FunctionParam::anonymous(storage(ty, StorageClass::ParamIn))
}

fn out_param(ty: Type) -> FunctionParam {
    FunctionParam::anonymous(storage(ty, StorageClass::ParamOut))
}

/// The per-vertex interface block shared by the geometry and tessellation
/// input/output arrays
fn per_vertex_block() -> Type {
    Type::block(
        "gl_PerVertex",
        vec![
            TypeMember::new("gl_Position", highp(Type::vector(BasicKind::Float, 4))),
            TypeMember::new("gl_PointSize", highp(Type::scalar(BasicKind::Float))),
            TypeMember::new(
                "gl_ClipDistance",
                Type::scalar(BasicKind::Float).array_of(ArraySize::Unsized),
            ),
        ],
    )
}

fn float_sampler_2d() -> Type {
    Type::scalar(BasicKind::Sampler(SamplerShape::dim_2d(SampledKind::Float)))
}

fn float_image_2d() -> Type {
    Type::scalar(BasicKind::Image(SamplerShape::dim_2d(SampledKind::Float)))
}

/// Build the shared built-in scope for one compilation configuration
///
/// The returned scope is immutable; compilations that redeclare a
/// built-in copy it into their own writable scope first.
pub fn build_builtin_scope(config: &ShaderConfig) -> Arc<Scope> {
    let mut seeder = Seeder::new();

    seed_stage_variables(&mut seeder, config);
    seed_common_functions(&mut seeder, config);
    seed_stage_functions(&mut seeder, config);

    Arc::new(seeder.scope)
}

fn seed_stage_variables(seeder: &mut Seeder, config: &ShaderConfig) {
    let vec4 = || Type::vector(BasicKind::Float, 4);
    let vec3 = || Type::vector(BasicKind::Float, 3);
    let uvec3 = || Type::vector(BasicKind::Uint, 3);
    let float = || Type::scalar(BasicKind::Float);
    let int = || Type::scalar(BasicKind::Int);
    let bool_ = || Type::scalar(BasicKind::Bool);

    match config.stage {
        Stage::Vertex => {
            seeder.variable("gl_Position", highp(storage(vec4(), StorageClass::Out)));
            seeder.variable("gl_PointSize", highp(storage(float(), StorageClass::Out)));
            seeder.variable(
                "gl_ClipDistance",
                storage(float().array_of(ArraySize::Unsized), StorageClass::Out),
            );
            if config.target == TargetEnv::Vulkan {
                seeder.variable("gl_VertexIndex", highp(storage(int(), StorageClass::In)));
                seeder.variable("gl_InstanceIndex", highp(storage(int(), StorageClass::In)));
            } else {
                seeder.variable("gl_VertexID", highp(storage(int(), StorageClass::In)));
                seeder.variable("gl_InstanceID", highp(storage(int(), StorageClass::In)));
            }
        }
        Stage::Fragment => {
            seeder.variable("gl_FragCoord", highp(storage(vec4(), StorageClass::In)));
            seeder.variable("gl_FrontFacing", storage(bool_(), StorageClass::In));
            seeder.variable("gl_PointCoord", storage(Type::vector(BasicKind::Float, 2), StorageClass::In));
            seeder.variable("gl_FragDepth", highp(storage(float(), StorageClass::Out)));
            seeder.variable(
                "gl_ClipDistance",
                storage(float().array_of(ArraySize::Unsized), StorageClass::In),
            );
            seeder.variable("gl_PrimitiveID", highp(storage(int(), StorageClass::In)));
        }
        Stage::Geometry => {
            seeder.variable(
                "gl_in",
                storage(per_vertex_block().array_of(ArraySize::Unsized), StorageClass::In),
            );
            seeder.variable("gl_PrimitiveIDIn", highp(storage(int(), StorageClass::In)));
            seeder.variable("gl_Position", highp(storage(vec4(), StorageClass::Out)));
            seeder.variable("gl_PointSize", highp(storage(float(), StorageClass::Out)));
            seeder.variable("gl_PrimitiveID", highp(storage(int(), StorageClass::Out)));
            seeder.variable("gl_Layer", highp(storage(int(), StorageClass::Out)));
        }
        Stage::TessControl => {
            seeder.variable(
                "gl_in",
                storage(per_vertex_block().array_of(ArraySize::Fixed(32)), StorageClass::In),
            );
            seeder.variable(
                "gl_out",
                storage(per_vertex_block().array_of(ArraySize::Unsized), StorageClass::Out),
            );
            seeder.variable("gl_InvocationID", highp(storage(int(), StorageClass::In)));
            seeder.variable("gl_PatchVerticesIn", highp(storage(int(), StorageClass::In)));
            // Patch outputs the stage may only write, never read back
            let mut outer = storage(float().array_of(ArraySize::Fixed(4)), StorageClass::Out);
            outer.qualifier.auxiliary = Some(Auxiliary::Patch);
            outer.qualifier.memory |= MemoryFlags::WRITEONLY;
            seeder.variable("gl_TessLevelOuter", outer);
            let mut inner = storage(float().array_of(ArraySize::Fixed(2)), StorageClass::Out);
            inner.qualifier.auxiliary = Some(Auxiliary::Patch);
            inner.qualifier.memory |= MemoryFlags::WRITEONLY;
            seeder.variable("gl_TessLevelInner", inner);
        }
        Stage::TessEvaluation => {
            seeder.variable(
                "gl_in",
                storage(per_vertex_block().array_of(ArraySize::Fixed(32)), StorageClass::In),
            );
            seeder.variable("gl_TessCoord", highp(storage(vec3(), StorageClass::In)));
            seeder.variable(
                "gl_TessLevelOuter",
                storage(float().array_of(ArraySize::Fixed(4)), StorageClass::In),
            );
            seeder.variable(
                "gl_TessLevelInner",
                storage(float().array_of(ArraySize::Fixed(2)), StorageClass::In),
            );
            seeder.variable("gl_Position", highp(storage(vec4(), StorageClass::Out)));
        }
        Stage::Compute => {
            seeder.variable("gl_GlobalInvocationID", highp(storage(uvec3(), StorageClass::In)));
            seeder.variable("gl_LocalInvocationID", highp(storage(uvec3(), StorageClass::In)));
            seeder.variable("gl_WorkGroupID", highp(storage(uvec3(), StorageClass::In)));
            seeder.variable("gl_NumWorkGroups", highp(storage(uvec3(), StorageClass::In)));
            // Fixed by the workgroup-size layout declaration; reading it
            // before that declaration is an error the context enforces
            let mut size = storage(uvec3(), StorageClass::Const);
            size.qualifier.spec_constant = true;
            seeder.variable("gl_WorkGroupSize", size);
        }
        Stage::Task | Stage::Mesh => {
            seeder.variable("gl_GlobalInvocationID", highp(storage(uvec3(), StorageClass::In)));
            seeder.variable("gl_LocalInvocationID", highp(storage(uvec3(), StorageClass::In)));
            seeder.variable("gl_WorkGroupID", highp(storage(uvec3(), StorageClass::In)));
        }
    }

    if config.target == TargetEnv::Vulkan
        && matches!(config.stage, Stage::Vertex | Stage::Geometry | Stage::Fragment)
    {
        seeder.variable_requiring(
            "gl_ViewIndex",
            highp(storage(int(), StorageClass::In)),
            &[EXT_MULTIVIEW],
        );
    }
}

/// Functions available in every stage: trig, common math, geometric, and
/// the texture/image and bitfield sets
fn seed_common_functions(seeder: &mut Seeder, config: &ShaderConfig) {
    let float = || Type::scalar(BasicKind::Float);
    let int = || Type::scalar(BasicKind::Int);
    let gen = |width: u8| {
        if width == 1 {
            Type::scalar(BasicKind::Float)
        } else {
            Type::vector(BasicKind::Float, width)
        }
    };
    let gen_int = |width: u8| {
        if width == 1 {
            Type::scalar(BasicKind::Int)
        } else {
            Type::vector(BasicKind::Int, width)
        }
    };

    let unary_ops: &[(&str, Op)] = &[
        ("radians", Op::Radians),
        ("degrees", Op::Degrees),
        ("sin", Op::Sin),
        ("cos", Op::Cos),
        ("tan", Op::Tan),
        ("asin", Op::Asin),
        ("acos", Op::Acos),
        ("atan", Op::Atan),
        ("exp", Op::Exp),
        ("log", Op::Log),
        ("exp2", Op::Exp2),
        ("log2", Op::Log2),
        ("sqrt", Op::Sqrt),
        ("inversesqrt", Op::InverseSqrt),
        ("abs", Op::Abs),
        ("sign", Op::Sign),
        ("floor", Op::Floor),
        ("ceil", Op::Ceil),
        ("fract", Op::Fract),
    ];

    for width in 1..=4u8 {
        for (name, op) in unary_ops {
            seeder.function(name, vec![in_param(gen(width))], gen(width), *op);
        }

        seeder.function("pow", vec![in_param(gen(width)), in_param(gen(width))], gen(width), Op::Pow);
        seeder.function("min", vec![in_param(gen(width)), in_param(gen(width))], gen(width), Op::Min);
        seeder.function("max", vec![in_param(gen(width)), in_param(gen(width))], gen(width), Op::Max);
        seeder.function(
            "clamp",
            vec![in_param(gen(width)), in_param(gen(width)), in_param(gen(width))],
            gen(width),
            Op::Clamp,
        );
        seeder.function(
            "mix",
            vec![in_param(gen(width)), in_param(gen(width)), in_param(gen(width))],
            gen(width),
            Op::Mix,
        );
        seeder.function("step", vec![in_param(gen(width)), in_param(gen(width))], gen(width), Op::Step);
        seeder.function(
            "fma",
            vec![in_param(gen(width)), in_param(gen(width)), in_param(gen(width))],
            gen(width),
            Op::Fma,
        );
        seeder.function(
            "frexp",
            vec![in_param(gen(width)), out_param(gen_int(width))],
            gen(width),
            Op::Frexp,
        );

        if width > 1 {
            seeder.function("min", vec![in_param(gen(width)), in_param(float())], gen(width), Op::Min);
            seeder.function("max", vec![in_param(gen(width)), in_param(float())], gen(width), Op::Max);
            seeder.function(
                "clamp",
                vec![in_param(gen(width)), in_param(float()), in_param(float())],
                gen(width),
                Op::Clamp,
            );
            seeder.function("dot", vec![in_param(gen(width)), in_param(gen(width))], float(), Op::Dot);
            seeder.function("normalize", vec![in_param(gen(width))], gen(width), Op::Normalize);
            seeder.function("length", vec![in_param(gen(width))], float(), Op::Length);
            seeder.function(
                "distance",
                vec![in_param(gen(width)), in_param(gen(width))],
                float(),
                Op::Distance,
            );
        }

        seeder.function("abs", vec![in_param(gen_int(width))], gen_int(width), Op::Abs);
        seeder.function("sign", vec![in_param(gen_int(width))], gen_int(width), Op::Sign);
        seeder.function(
            "min",
            vec![in_param(gen_int(width)), in_param(gen_int(width))],
            gen_int(width),
            Op::Min,
        );
        seeder.function(
            "max",
            vec![in_param(gen_int(width)), in_param(gen_int(width))],
            gen_int(width),
            Op::Max,
        );
        seeder.function(
            "bitfieldExtract",
            vec![in_param(gen_int(width)), in_param(int()), in_param(int())],
            gen_int(width),
            Op::BitfieldExtract,
        );
        seeder.function(
            "bitfieldInsert",
            vec![in_param(gen_int(width)), in_param(gen_int(width)), in_param(int()), in_param(int())],
            gen_int(width),
            Op::BitfieldInsert,
        );
    }

    seeder.function("cross", vec![in_param(gen(3)), in_param(gen(3))], gen(3), Op::Cross);

    if !config.is_es() {
        // Double-precision fma needs the fp64 extension below the core
        // version that folded it in
        let double = Type::scalar(BasicKind::Double);
        seeder.function_requiring(
            "fma",
            vec![in_param(double.clone()), in_param(double.clone()), in_param(double.clone())],
            double,
            Op::Fma,
            &[ARB_GPU_SHADER_FP64],
        );
    }

    let vec2 = || Type::vector(BasicKind::Float, 2);
    let vec4 = || Type::vector(BasicKind::Float, 4);
    let ivec2 = || Type::vector(BasicKind::Int, 2);

    seeder.function(
        "texture",
        vec![in_param(float_sampler_2d()), in_param(vec2())],
        vec4(),
        Op::Texture,
    );
    seeder.function(
        "textureLod",
        vec![in_param(float_sampler_2d()), in_param(vec2()), in_param(float())],
        vec4(),
        Op::TextureLod,
    );
    seeder.function(
        "textureOffset",
        vec![in_param(float_sampler_2d()), in_param(vec2()), in_param(ivec2())],
        vec4(),
        Op::TextureOffset,
    );
    seeder.function(
        "texelFetch",
        vec![in_param(float_sampler_2d()), in_param(ivec2()), in_param(int())],
        vec4(),
        Op::TexelFetch,
    );
    seeder.function(
        "imageLoad",
        vec![in_param(float_image_2d()), in_param(ivec2())],
        vec4(),
        Op::ImageLoad,
    );
    seeder.function(
        "imageStore",
        vec![in_param(float_image_2d()), in_param(ivec2()), in_param(vec4())],
        Type::scalar(BasicKind::Void),
        Op::ImageStore,
    );

    seeder.function("memoryBarrier", Vec::new(), Type::scalar(BasicKind::Void), Op::MemoryBarrier);
}

fn seed_stage_functions(seeder: &mut Seeder, config: &ShaderConfig) {
    let void = || Type::scalar(BasicKind::Void);
    let gen = |width: u8| {
        if width == 1 {
            Type::scalar(BasicKind::Float)
        } else {
            Type::vector(BasicKind::Float, width)
        }
    };

    match config.stage {
        Stage::Geometry => {
            seeder.function("EmitVertex", Vec::new(), void(), Op::EmitVertex);
            seeder.function("EndPrimitive", Vec::new(), void(), Op::EndPrimitive);
        }
        Stage::Fragment => {
            for width in 1..=4u8 {
                seeder.function(
                    "interpolateAtCentroid",
                    vec![in_param(gen(width))],
                    gen(width),
                    Op::InterpolateAtCentroid,
                );
                seeder.function(
                    "interpolateAtSample",
                    vec![in_param(gen(width)), in_param(Type::scalar(BasicKind::Int))],
                    gen(width),
                    Op::InterpolateAtSample,
                );
                seeder.function(
                    "interpolateAtOffset",
                    vec![in_param(gen(width)), in_param(Type::vector(BasicKind::Float, 2))],
                    gen(width),
                    Op::InterpolateAtOffset,
                );
            }
        }
        Stage::Compute | Stage::TessControl | Stage::Task | Stage::Mesh => {
            seeder.function("barrier", Vec::new(), void(), Op::Barrier);
            seeder.function("groupMemoryBarrier", Vec::new(), void(), Op::GroupMemoryBarrier);
        }
        _ => {}
    }
}
