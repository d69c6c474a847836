//! Setting Keys
//!
//! Vocabulary of the settings an Android application module is configured
//! with. Each known key has a semantic kind that raw values are coerced
//! into during resolution. Unknown keys are carried through unchanged.
//!
//! Dependency entries are settings under the `dependencies.` prefix, named
//! after the Gradle configuration they are added to. Their values are
//! Maven coordinates.

use crate::value::Kind;

pub const APPLICATION_ID: &str = "application_id";
pub const NAMESPACE: &str = "namespace";

pub const COMPILE_SDK: &str = "compile_sdk";
pub const MIN_SDK: &str = "min_sdk";
pub const TARGET_SDK: &str = "target_sdk";
pub const NDK_VERSION: &str = "ndk_version";

pub const VERSION_CODE: &str = "version_code";
pub const VERSION_NAME: &str = "version_name";

pub const SOURCE_COMPATIBILITY: &str = "source_compatibility";
pub const TARGET_COMPATIBILITY: &str = "target_compatibility";
pub const JVM_TARGET: &str = "jvm_target";

pub const DESUGARING_ENABLED: &str = "desugaring_enabled";
pub const MULTIDEX_ENABLED: &str = "multidex_enabled";

pub const SIGNING_CONFIG_REF: &str = "signing_config_ref";

/// Prefix of dependency entries.
pub const DEPENDENCIES: &str = "dependencies.";

/// Dependency entry holding the core library desugaring artifact.
pub const DESUGAR_DEPENDENCY: &str = "dependencies.core_library_desugaring";

const KINDS: &[(&str, Kind)] = &[
    (APPLICATION_ID, Kind::Str),
    (NAMESPACE, Kind::Str),
    (COMPILE_SDK, Kind::Int),
    (MIN_SDK, Kind::Int),
    (TARGET_SDK, Kind::Int),
    (NDK_VERSION, Kind::Str),
    (VERSION_CODE, Kind::Int),
    (VERSION_NAME, Kind::Str),
    (SOURCE_COMPATIBILITY, Kind::JavaVersion),
    (TARGET_COMPATIBILITY, Kind::JavaVersion),
    (JVM_TARGET, Kind::JavaVersion),
    (DESUGARING_ENABLED, Kind::Bool),
    (MULTIDEX_ENABLED, Kind::Bool),
    (SIGNING_CONFIG_REF, Kind::Str),
];

/// Look up the kind of a key
///
/// Return the semantic kind of a known key, or `None` for keys outside of
/// the vocabulary. All dependency entries are strings.
pub fn kind(key: &str) -> Option<Kind> {
    if key.starts_with(DEPENDENCIES) {
        return Some(Kind::Str);
    }

    KINDS.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Normalize a key
///
/// Manifests may spell keys in kebab-case. Internally, all keys use
/// snake_case, so dashes are replaced by underscores.
pub fn normalize(key: &str) -> String {
    key.replace('-', "_")
}

/// Check whether a string is a valid key
///
/// Keys consist of alphanumeric characters plus `-`, `_`, and `.` as
/// separator of nested names. Empty keys and empty segments are rejected.
pub fn is_valid(key: &str) -> bool {
    !key.is_empty()
        && key.split('.').all(
            |s| !s.is_empty() && s.chars().all(
                |v| v.is_ascii_alphanumeric() || v == '-' || v == '_'
            )
        )
}
