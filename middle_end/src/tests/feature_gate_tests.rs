//! Tests for the version/profile/extension gate

use front_end::version::Profile;

use crate::sema::feature_gate::{
    profile_requires, require_extensions_any, require_profile, ExtensionBehavior,
    ExtensionRegistry, GateState, Verdict, ARB_GPU_SHADER_FP64,
};

fn state(extensions: &ExtensionRegistry) -> GateState<'_> {
    GateState { profile: Profile::Core, version: 330, relaxed_errors: false, extensions }
}

#[test]
fn test_require_profile_allows_listed_profile() {
    let registry = ExtensionRegistry::new();
    let verdict = require_profile(&state(&registry), &[Profile::Core, Profile::None], "feature");
    assert_eq!(verdict, Verdict::Allowed);
}

#[test]
fn test_require_profile_denies_unlisted_profile() {
    let registry = ExtensionRegistry::new();
    let verdict = require_profile(&state(&registry), &[Profile::Es], "double-precision type");
    match verdict {
        Verdict::Error(message) => {
            assert!(message.contains("not supported with this profile"));
            assert!(message.contains("core"), "message should name the offending profile");
        }
        other => panic!("expected an error verdict, got {:?}", other),
    }
}

#[test]
fn test_profile_requires_passes_when_rule_names_other_profile() {
    let registry = ExtensionRegistry::new();
    let verdict = profile_requires(&state(&registry), &[Profile::Es], 310, &[], "feature");
    assert_eq!(verdict, Verdict::Allowed, "a rule for another profile must pass silently");
}

#[test]
fn test_profile_requires_version_threshold() {
    let registry = ExtensionRegistry::new();
    let ok = profile_requires(&state(&registry), &[Profile::Core], 330, &[], "feature");
    assert_eq!(ok, Verdict::Allowed);

    let denied = profile_requires(&state(&registry), &[Profile::Core], 400, &[], "fp64");
    assert!(denied.is_error());
}

#[test]
fn test_enabled_extension_substitutes_for_version() {
    let mut registry = ExtensionRegistry::new();
    registry.set_behavior(ARB_GPU_SHADER_FP64, ExtensionBehavior::Enable);
    let verdict =
        profile_requires(&state(&registry), &[Profile::Core], 400, &[ARB_GPU_SHADER_FP64], "fp64");
    assert_eq!(verdict, Verdict::Allowed);
}

#[test]
fn test_warn_behavior_produces_warning_verdict() {
    let mut registry = ExtensionRegistry::new();
    registry.set_behavior(ARB_GPU_SHADER_FP64, ExtensionBehavior::Warn);
    let verdict =
        profile_requires(&state(&registry), &[Profile::Core], 400, &[ARB_GPU_SHADER_FP64], "fp64");
    match verdict {
        Verdict::Warning(message) => assert!(message.contains(ARB_GPU_SHADER_FP64)),
        other => panic!("expected a warning verdict, got {:?}", other),
    }
}

#[test]
fn test_relaxed_errors_demote_denials_to_warnings() {
    let registry = ExtensionRegistry::new();
    let relaxed = GateState {
        profile: Profile::Core,
        version: 330,
        relaxed_errors: true,
        extensions: &registry,
    };
    let verdict = require_extensions_any(&relaxed, &[ARB_GPU_SHADER_FP64], "fp64");
    assert!(matches!(verdict, Verdict::Warning(_)), "relaxed mode demotes the denial");
}

#[test]
fn test_require_extensions_any_names_all_candidates() {
    let registry = ExtensionRegistry::new();
    let verdict = require_extensions_any(&state(&registry), &["GL_A", "GL_B"], "feature");
    match verdict {
        Verdict::Error(message) => {
            assert!(message.contains("GL_A or GL_B"));
            assert!(message.contains("required extension not requested"));
        }
        other => panic!("expected an error verdict, got {:?}", other),
    }
}

#[test]
fn test_gate_checks_are_pure() {
    // The same state must yield the same verdict on every call; the gate
    // holds no memory, so repeated checks cannot change outcome
    let registry = ExtensionRegistry::new();
    let first = profile_requires(&state(&registry), &[Profile::Core], 400, &[], "fp64");
    let second = profile_requires(&state(&registry), &[Profile::Core], 400, &[], "fp64");
    assert_eq!(first, second);
}
