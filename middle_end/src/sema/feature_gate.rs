//! Version / profile / extension legality oracle
//!
//! Each check is a pure function of the current (profile, version,
//! enabled-extensions) state and the call's static requirement: it
//! returns a [Verdict] and has no memory of its own. The Parse Context
//! forwards the verdict to the diagnostic sink exactly once per call, so
//! no check can double-count.

use front_end::version::Profile;
use rustc_hash::FxHashMap;

pub const EXT_MESH_SHADER: &str = "GL_EXT_mesh_shader";
pub const EXT_MULTIVIEW: &str = "GL_EXT_multiview";
pub const EXT_NONUNIFORM_QUALIFIER: &str = "GL_EXT_nonuniform_qualifier";
pub const EXT_FRAGMENT_SHADER_BARYCENTRIC: &str = "GL_EXT_fragment_shader_barycentric";
pub const ARB_GPU_SHADER_FP64: &str = "GL_ARB_gpu_shader_fp64";
pub const ARB_SHADER_VIEWPORT_LAYER_ARRAY: &str = "GL_ARB_shader_viewport_layer_array";

/// Behavior requested for one extension by an `#extension` directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtensionBehavior {
    #[default]
    Disable,
    Enable,
    Require,
    /// Enabled, but every use draws a warning
    Warn,
}

/// Tracks the behavior of every extension named so far
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    behaviors: FxHashMap<String, ExtensionBehavior>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_behavior(&mut self, extension: &str, behavior: ExtensionBehavior) {
        self.behaviors.insert(extension.to_string(), behavior);
    }

    pub fn behavior(&self, extension: &str) -> ExtensionBehavior {
        self.behaviors.get(extension).copied().unwrap_or_default()
    }

    pub fn is_enabled(&self, extension: &str) -> bool {
        !matches!(self.behavior(extension), ExtensionBehavior::Disable)
    }

    /// The first enabled extension of `extensions`, with its behavior
    fn first_enabled(&self, extensions: &[&str]) -> Option<(String, ExtensionBehavior)> {
        extensions
            .iter()
            .map(|ext| (ext.to_string(), self.behavior(ext)))
            .find(|(_, behavior)| *behavior != ExtensionBehavior::Disable)
    }
}

/// Outcome of a single gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Warning(String),
    Error(String),
}

impl Verdict {
    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }
}

/// The immutable state a gate check reads
#[derive(Debug, Clone, Copy)]
pub struct GateState<'a> {
    pub profile: Profile,
    pub version: u32,
    pub relaxed_errors: bool,
    pub extensions: &'a ExtensionRegistry,
}

impl GateState<'_> {
    fn deny(&self, message: String) -> Verdict {
        if self.relaxed_errors {
            Verdict::Warning(message)
        } else {
            Verdict::Error(message)
        }
    }
}

/// Require that the current profile is one of `allowed`
pub fn require_profile(state: &GateState, allowed: &[Profile], feature: &str) -> Verdict {
    if allowed.contains(&state.profile) {
        Verdict::Allowed
    } else {
        state.deny(format!("not supported with this profile: {} ({})", state.profile, feature))
    }
}

/// For the listed profiles, require `min_version` or one of `extensions`
///
/// A rule that does not name the current profile passes silently.
pub fn profile_requires(
    state: &GateState,
    profiles: &[Profile],
    min_version: u32,
    extensions: &[&str],
    feature: &str,
) -> Verdict {
    if !profiles.contains(&state.profile) {
        return Verdict::Allowed;
    }

    if state.version >= min_version {
        return Verdict::Allowed;
    }

    match state.extensions.first_enabled(extensions) {
        Some((ext, ExtensionBehavior::Warn)) => {
            Verdict::Warning(format!("extension {} is being used for {}", ext, feature))
        }
        Some(_) => Verdict::Allowed,
        None => state.deny(format!(
            "{} requires version {} or an applicable extension for profile {}",
            feature, min_version, state.profile
        )),
    }
}

/// Require at least one of `extensions` to be enabled
pub fn require_extensions_any(state: &GateState, extensions: &[&str], feature: &str) -> Verdict {
    match state.extensions.first_enabled(extensions) {
        Some((ext, ExtensionBehavior::Warn)) => {
            Verdict::Warning(format!("extension {} is being used for {}", ext, feature))
        }
        Some(_) => Verdict::Allowed,
        None => {
            let wanted = extensions.join(" or ");
            state.deny(format!("required extension not requested: {} ({})", wanted, feature))
        }
    }
}
