//! Compilation configuration
//!
//! Everything the analyzer needs to know about the dialect being compiled:
//! shader stage, language version, profile, target environment, and the
//! per-compilation flags. All of this is fixed at construction time; there
//! is no process-global configuration.

use std::fmt;

/// The pipeline stage a compilation unit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    TessControl,
    TessEvaluation,
    Geometry,
    Fragment,
    Compute,
    Task,
    Mesh,
}

impl Stage {
    /// Stages whose inputs arrive as per-vertex arrays sized by the pipeline
    pub fn has_arrayed_inputs(&self) -> bool {
        matches!(self, Stage::Geometry | Stage::TessControl | Stage::TessEvaluation | Stage::Mesh)
    }

    /// Stages whose outputs are arrays sized by a later layout declaration
    pub fn has_arrayed_outputs(&self) -> bool {
        matches!(self, Stage::TessControl | Stage::Mesh)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Vertex => "vertex",
            Stage::TessControl => "tessellation control",
            Stage::TessEvaluation => "tessellation evaluation",
            Stage::Geometry => "geometry",
            Stage::Fragment => "fragment",
            Stage::Compute => "compute",
            Stage::Task => "task",
            Stage::Mesh => "mesh",
        };
        write!(f, "{}", name)
    }
}

/// A named dialect restricting which features and versions are legal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Pre-profile desktop versions (110..150)
    None,
    Core,
    Compatibility,
    /// The restricted ES dialect
    Es,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Profile::None => "none",
            Profile::Core => "core",
            Profile::Compatibility => "compatibility",
            Profile::Es => "es",
        };
        write!(f, "{}", name)
    }
}

/// The environment the validated tree will eventually be lowered for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEnv {
    /// Plain OpenGL; no binary intermediate format
    OpenGl,
    /// Vulkan; implies a SPIR-V generation number in `ShaderConfig`
    Vulkan,
}

/// Whether we are compiling user source or the built-in library itself
///
/// Built-in-library mode relaxes precision-default and redeclaration rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Shader,
    BuiltIns,
}

/// Per-compilation configuration, fixed for the compilation's lifetime
#[derive(Debug, Clone)]
pub struct ShaderConfig {
    pub stage: Stage,
    pub version: u32,
    pub profile: Profile,
    pub target: TargetEnv,
    /// SPIR-V generation number (e.g. 0x10300), or 0 when not producing SPIR-V
    pub spv_version: u32,
    pub parse_mode: ParseMode,
    pub forward_compatible: bool,
    /// Demote certain errors to warnings
    pub relaxed_errors: bool,
    pub suppress_warnings: bool,
    /// The designated entry-point function name
    pub entry_point: String,
}

impl ShaderConfig {
    pub fn new(stage: Stage, version: u32, profile: Profile) -> Self {
        Self {
            stage,
            version,
            profile,
            target: TargetEnv::OpenGl,
            spv_version: 0,
            parse_mode: ParseMode::Shader,
            forward_compatible: false,
            relaxed_errors: false,
            suppress_warnings: false,
            entry_point: "main".to_string(),
        }
    }

    pub fn for_vulkan(mut self, spv_version: u32) -> Self {
        self.target = TargetEnv::Vulkan;
        self.spv_version = spv_version;
        self
    }

    pub fn with_entry_point(mut self, name: &str) -> Self {
        self.entry_point = name.to_string();
        self
    }

    pub fn is_es(&self) -> bool {
        self.profile == Profile::Es
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::new(Stage::Vertex, 450, Profile::Core)
    }
}
