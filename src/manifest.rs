//! Configuration Manifest
//!
//! This is a rust implementation of the Osiris Configuration Manifest
//! Format. Applications use the manifest to declare the configuration
//! fragments of their Android application module. The manifest is a
//! TOML-formatted file usually called `osiris-config.toml`:
//!
//! ```toml
//! version = 1
//!
//! [[fragment]]
//! source = "default"
//! [fragment.settings]
//! application-id = "com.example.app"
//! source-compatibility = "VERSION_17"
//! target-compatibility = "VERSION_17"
//! desugaring-enabled = true
//! dependencies.core-library-desugaring = "com.android.tools:desugar_jdk_libs:2.0.4"
//!
//! [[fragment]]
//! source = "injected"
//! [fragment.bindings]
//! min-sdk = "flutter.minSdkVersion"
//!
//! [[fragment]]
//! source = "override"
//! variant = "release"
//! [fragment.settings]
//! signing-config-ref = "debug"
//! ```
//!
//! Keys may be written in kebab-case and are normalized to snake_case.
//! Nested tables are flattened into dotted keys.

use crate::fragment::{Fragment, Source};
use crate::key;
use crate::provider::Provider;
use crate::value::Value;
use serde;
use toml;

/// Manifest Errors
///
/// This is the exhaustive list of possible errors raised when reading a
/// manifest or turning it into fragments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest file could not be read.
    #[error("cannot read manifest {0:?}: {1}")]
    Io(std::path::PathBuf, std::io::Error),
    /// The manifest is not valid TOML, or does not match the format.
    #[error("invalid manifest syntax: {0}")]
    Syntax(String),
    /// The manifest version is not supported.
    #[error("unsupported manifest version {0}")]
    Version(u32),
    /// The fragment at the given index has an unknown source.
    #[error("fragment {0}: unknown source '{1}'")]
    Source(usize, String),
    /// The fragment at the given index has bindings but is not injected.
    #[error("fragment {0}: only injected fragments can have bindings")]
    Bindings(usize),
    /// The fragment at the given index has an invalid variant name.
    #[error("fragment {0}: invalid variant '{1}'")]
    Variant(usize, String),
    /// The fragment at the given index uses an invalid key.
    #[error("fragment {0}: invalid key '{1}'")]
    Key(usize, String),
    /// The value of the given key has an unsupported type.
    #[error("fragment {0}: unsupported value for '{1}'")]
    Value(usize, String),
    /// The string value of the given key cannot be quoted.
    #[error("fragment {0}: value of '{1}' contains quotes, backslashes or control characters")]
    Unquotable(usize, String),
    /// The fragment at the given index declares the given key twice,
    /// either with two spellings or as both setting and binding.
    #[error("fragment {0}: key '{1}' is declared more than once")]
    Duplicate(usize, String),
    /// An injected fragment could not be constructed.
    #[error("fragment {0}: {1}")]
    Fragment(usize, crate::fragment::Error),
}

/// Raw Manifest Fragment Table
///
/// Sub-type of `Raw` representing a single `fragment` table.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawFragment {
    /// Source of the fragment: `default`, `injected`, or `override`.
    pub source: String,
    /// Precedence rank. Defaults to the rank of the source.
    pub rank: Option<i32>,
    /// Build variant this fragment is restricted to.
    pub variant: Option<String>,
    /// Literal settings.
    #[serde(default)]
    pub settings: toml::Table,
    /// Settings bound to provider variables. Injected fragments only.
    #[serde(default)]
    pub bindings: toml::Table,
}

/// Raw Manifest Content
///
/// This type contains the raw manifest content as parsed by `toml` and
/// converted into rust types via `serde`.
///
/// Note that content of the type is not verified other than for syntactic
/// correctness required by the given types. Semantic correctness needs to
/// be verified by the caller.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Raw {
    /// Version of the manifest format. Only version `1` is currently
    /// supported.
    pub version: u32,

    /// Fragment tables in declaration order.
    #[serde(default)]
    pub fragment: Vec<RawFragment>,
}

/// Manifest Abstraction
///
/// This type represents a valid and verified manifest. The manifest content
/// can be directly accessed via the `raw` field. The data is verified for
/// semantic correctness (unlike the `Raw` type).
pub struct Manifest {
    /// Raw manifest content as parsed by the TOML module.
    pub raw: Raw,
}

// Flatten a TOML table
//
// Walk the table recursively and collect all leaves with their dotted,
// normalized key. Keys are returned sorted by their raw spelling, not in
// declaration order. Two spellings may normalize to the same key; callers
// must refuse such duplicates.
fn flatten(
    prefix: &str,
    table: &toml::Table,
    out: &mut Vec<(String, toml::Value)>,
) {
    for (k, v) in table.iter() {
        let name = if prefix.is_empty() {
            key::normalize(k)
        } else {
            format!("{}.{}", prefix, key::normalize(k))
        };

        match v {
            toml::Value::Table(t) => flatten(&name, t, out),
            _ => out.push((name, v.clone())),
        }
    }
}

// Convert a TOML leaf into a setting value
//
// Only strings, integers, and booleans are supported.
fn leaf_value(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(v) => Some(Value::Str(v.clone())),
        toml::Value::Integer(v) => Some(Value::Int(*v)),
        toml::Value::Boolean(v) => Some(Value::Bool(*v)),
        _ => None,
    }
}

impl Raw {
    fn parse_toml(table: toml::Table) -> Result<Self, Error> {
        <Self as serde::Deserialize>::deserialize(table)
            .map_err(|v| Error::Syntax(v.to_string()))
    }

    fn parse_str(content: &str) -> Result<Self, Error> {
        content.parse::<toml::Table>()
            .map_err(|v| Error::Syntax(v.to_string()))
            .and_then(|v| Self::parse_toml(v))
    }
}

impl RawFragment {
    /// Return the flattened settings with normalized keys.
    pub fn settings(&self) -> Vec<(String, toml::Value)> {
        let mut v = Vec::new();
        flatten("", &self.settings, &mut v);
        v
    }

    /// Return the flattened bindings with normalized keys.
    pub fn bindings(&self) -> Vec<(String, toml::Value)> {
        let mut v = Vec::new();
        flatten("", &self.bindings, &mut v);
        v
    }
}

impl Manifest {
    // Check whether a string is a valid variant name
    //
    // This verifies that the given string consists of only alphanumeric
    // characters plus `-`, `_`. Empty names are rejected.
    fn is_identifier(s: &str) -> bool {
        !s.is_empty() && s.chars().all(
            |v| v.is_alphanumeric() || v == '-' || v == '_'
        )
    }

    // Check whether a string contains no quotes or escapes
    //
    // This verifies that a string does not contain quotes or backslashes, nor
    // any control characters. Resolved values are interpolated into Gradle
    // property files and build scripts without escaping.
    fn is_quotable(s: &str) -> bool {
        s.chars().all(
            |v| !v.is_control()
                && v != '\\'
                && v != '\''
                && v != '"'
        )
    }

    /// Parse manifest from raw
    ///
    /// Take a raw representation of the manifest and perform post-parsing
    /// validation, ensuring the final manifest will not contain invalid
    /// entries.
    fn parse_raw(raw: Raw) -> Result<Self, Error> {
        // We only support version '1'. Any other version number is explicitly
        // defined to be incompatible, so fail parsing.
        if raw.version != 1 {
            return Err(Error::Version(raw.version));
        }

        for (i, fragment) in raw.fragment.iter().enumerate() {
            let source = fragment.source.parse::<Source>().map_err(
                |_| Error::Source(i, fragment.source.clone())
            )?;

            if let Some(v) = &fragment.variant {
                if !Self::is_identifier(v) {
                    return Err(Error::Variant(i, v.clone()));
                }
            }

            if !fragment.bindings.is_empty() && source != Source::Injected {
                return Err(Error::Bindings(i));
            }

            let mut seen = std::collections::BTreeSet::new();

            for (k, v) in fragment.settings() {
                if !key::is_valid(&k) {
                    return Err(Error::Key(i, k));
                }
                if !seen.insert(k.clone()) {
                    return Err(Error::Duplicate(i, k));
                }
                match leaf_value(&v) {
                    None => return Err(Error::Value(i, k)),
                    Some(Value::Str(s)) if !Self::is_quotable(&s) => {
                        return Err(Error::Unquotable(i, k));
                    },
                    Some(_) => {},
                }
            }

            // Bindings name provider variables, so they must be strings.
            for (k, v) in fragment.bindings() {
                if !key::is_valid(&k) {
                    return Err(Error::Key(i, k));
                }
                if !seen.insert(k.clone()) {
                    return Err(Error::Duplicate(i, k));
                }
                if !v.is_str() {
                    return Err(Error::Value(i, k));
                }
            }
        }

        Ok(
            Self {
                raw: raw,
            }
        )
    }

    /// Parse manifest from string
    ///
    /// Parse the given string as a literal manifest in TOML representation.
    /// Content is verified and invalid manifests are refused.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        Raw::parse_str(content).and_then(|v| Self::parse_raw(v))
    }

    /// Parse manifest from file-system
    ///
    /// Open the specified file and parse it as a manifest. The content is
    /// verified and invalid manifests are refused. The file is completely
    /// parsed into memory and then closed again before the function returns.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        std::fs::read_to_string(path)
            .map_err(|v| Error::Io(path.to_path_buf(), v))
            .and_then(|v| Self::parse_str(&v))
    }

    /// Build fragments
    ///
    /// Turn all fragment tables into fragments, in declaration order.
    /// Bindings of injected fragments are looked up via `provider`. Literal
    /// settings of injected fragments are applied before its bindings.
    pub fn fragments(&self, provider: &dyn Provider) -> Result<Vec<Fragment>, Error> {
        let mut fragments = Vec::with_capacity(self.raw.fragment.len());

        for (i, raw) in self.raw.fragment.iter().enumerate() {
            let source = raw.source.parse::<Source>().map_err(
                |_| Error::Source(i, raw.source.clone())
            )?;

            let mut fragment = Fragment::new(source);
            for (k, v) in raw.settings() {
                if let Some(v) = leaf_value(&v) {
                    fragment.set(&k, v);
                }
            }

            if source == Source::Injected {
                let bindings = raw.bindings();
                let bindings = bindings.iter().filter_map(
                    |(k, v)| v.as_str().map(|v| (k.as_str(), v))
                );
                let injected = Fragment::injected(bindings, provider)
                    .map_err(|v| Error::Fragment(i, v))?;

                for (k, v) in injected.iter() {
                    fragment.set(k, v.clone());
                }
            }

            if let Some(rank) = raw.rank {
                fragment = fragment.with_rank(rank);
            }
            if let Some(variant) = raw.variant.as_deref() {
                fragment = fragment.with_variant(variant);
            }

            fragments.push(fragment);
        }

        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MapProvider;

    // Verify basic parsing of `Raw`
    //
    // Parse a minimal raw manifest into `Raw` to have a base-level test for
    // the parsing capabilities. Not complex content verification is done.
    #[test]
    fn raw_parse_minimal() {
        let s = "version = 1";

        Raw::parse_str(s).unwrap();
    }

    // Verify unknown versions in `Raw`
    //
    // Parse a high version number and verify that the raw content parser
    // does not care for its value other than syntactic correctness.
    #[test]
    fn raw_parse_unknown_version() {
        let s = "version = 12345678";

        Raw::parse_str(s).unwrap();
    }

    // Verify parsing of unknown manifest versions
    #[test]
    fn manifest_parse_unknown_version() {
        let s = "version = 2";

        assert!(matches!(Manifest::parse_str(s), Err(Error::Version(2))));
    }

    #[test]
    fn manifest_parse_syntax() {
        assert!(matches!(Manifest::parse_str("version = "), Err(Error::Syntax(_))));
        assert!(matches!(Manifest::parse_str("[[fragment]]"), Err(Error::Syntax(_))));
    }

    // Verify flattening and key normalization
    //
    // Nested tables and dotted keys end up as dotted snake_case keys.
    #[test]
    fn manifest_parse_settings() {
        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.settings]
            min-sdk = 21
            multidex-enabled = \"true\"
            dependencies.core-library-desugaring = \"com.android.tools:desugar_jdk_libs:2.0.4\"
        ";

        let m = Manifest::parse_str(s).unwrap();
        let f = m.fragments(&MapProvider::new()).unwrap();

        assert_eq!(f.len(), 1);
        assert_eq!(f[0].source(), Source::Default);
        assert_eq!(f[0].get("min_sdk"), Some(&Value::Int(21)));
        assert_eq!(f[0].get("multidex_enabled"), Some(&Value::Str("true".into())));
        assert_eq!(
            f[0].get("dependencies.core_library_desugaring"),
            Some(&Value::Str("com.android.tools:desugar_jdk_libs:2.0.4".into())),
        );
    }

    // Verify fragment attributes
    //
    // Ranks and variants are carried over, sources imply default ranks.
    #[test]
    fn manifest_parse_attributes() {
        let s = "
            version = 1
            [[fragment]]
            source = \"override\"
            variant = \"release\"
            [fragment.settings]
            signing-config-ref = \"debug\"
            [[fragment]]
            source = \"default\"
            rank = 5
        ";

        let f = Manifest::parse_str(s).unwrap().fragments(&MapProvider::new()).unwrap();

        assert_eq!(f[0].source(), Source::Override);
        assert_eq!(f[0].rank(), Source::Override.rank());
        assert_eq!(f[0].variant(), Some("release"));
        assert_eq!(f[1].rank(), 5);
        assert!(f[1].is_empty());
    }

    // Verify injected fragments
    //
    // Bindings are looked up through the provider and unbound variables
    // are reported with the fragment index.
    #[test]
    fn manifest_injected() {
        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [[fragment]]
            source = \"injected\"
            [fragment.bindings]
            min-sdk = \"flutter.minSdkVersion\"
            compile-sdk = \"flutter.compileSdkVersion\"
        ";

        let m = Manifest::parse_str(s).unwrap();

        let p = MapProvider::new()
            .with("flutter.minSdkVersion", "21")
            .with("flutter.compileSdkVersion", 34);
        let f = m.fragments(&p).unwrap();
        assert_eq!(f[1].source(), Source::Injected);
        assert_eq!(f[1].get("min_sdk"), Some(&Value::Str("21".into())));
        assert_eq!(f[1].get("compile_sdk"), Some(&Value::Int(34)));

        let p = MapProvider::new().with("flutter.minSdkVersion", "21");
        assert!(matches!(m.fragments(&p), Err(Error::Fragment(1, _))));
    }

    // Verify refused content
    //
    // Unknown sources, misplaced bindings, bad variants, unsupported values
    // and unquotable strings are all refused.
    #[test]
    fn manifest_parse_invalid() {
        let s = "
            version = 1
            [[fragment]]
            source = \"environment\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Source(0, _))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.bindings]
            min-sdk = \"flutter.minSdkVersion\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Bindings(0))));

        let s = "
            version = 1
            [[fragment]]
            source = \"override\"
            variant = \"\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Variant(0, _))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.settings]
            min-sdk = 21.5
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Value(0, _))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.settings]
            \"min sdk\" = 21
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Key(0, _))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.settings]
            version-name = \"1.0\\\"beta\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Unquotable(0, _))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.settings]
            min_sdk = 30
            min-sdk = 21
        ";
        assert!(matches!(
            Manifest::parse_str(s),
            Err(Error::Duplicate(0, k)) if k == "min_sdk",
        ));

        let s = "
            version = 1
            [[fragment]]
            source = \"injected\"
            [fragment.settings]
            min-sdk = 21
            [fragment.bindings]
            min-sdk = \"flutter.minSdkVersion\"
        ";
        assert!(matches!(
            Manifest::parse_str(s),
            Err(Error::Duplicate(0, k)) if k == "min_sdk",
        ));
    }

    // Verify misspelled tables and fields are refused
    //
    // A typo must not make declared configuration disappear silently.
    #[test]
    fn manifest_parse_unknown_fields() {
        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            [fragment.setings]
            application-id = \"com.example.app\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Syntax(_))));

        let s = "
            version = 1
            [[fragment]]
            source = \"default\"
            ranks = 5
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Syntax(_))));

        let s = "
            version = 1
            [[fragments]]
            source = \"default\"
        ";
        assert!(matches!(Manifest::parse_str(s), Err(Error::Syntax(_))));
    }

    #[test]
    fn manifest_parse_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osiris-config.toml");

        assert!(matches!(Manifest::parse_path(&path), Err(Error::Io(_, _))));

        std::fs::write(&path, "version = 1\n").unwrap();
        let m = Manifest::parse_path(&path).unwrap();
        assert!(m.raw.fragment.is_empty());
    }
}
