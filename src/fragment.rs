//! Configuration Fragments
//!
//! A fragment is one layer of configuration: an ordered list of settings
//! from a single source. Fragments are merged by the resolver according to
//! their precedence rank.

use crate::provider::Provider;
use crate::value::Value;

/// Fragment Errors
///
/// This is the exhaustive list of possible errors raised when constructing
/// fragments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Provider has no value for the specified variable, which is bound
    /// to the specified setting.
    #[error("variable '{1}' bound to setting '{0}' is not provided")]
    Unbound(String, String),
}

/// Fragment Source
///
/// Identity of the origin of a fragment. Each source implies a default
/// precedence rank, which can be overridden per fragment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Static defaults declared with the application.
    Default,
    /// Values injected by the build tool via a variable provider.
    Injected,
    /// Explicit overrides, usually per build variant.
    Override,
}

impl Source {
    /// Get string representation
    ///
    /// Return the string representation of the source. This is guaranteed
    /// to be parsable by the `FromStr` implementation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Default => "default",
            Source::Injected => "injected",
            Source::Override => "override",
        }
    }

    /// Default precedence rank
    ///
    /// Return the rank used for fragments of this source if none is given
    /// explicitly. Injected values take precedence over defaults, and
    /// overrides over both.
    pub fn rank(&self) -> i32 {
        match self {
            Source::Default => 0,
            Source::Injected => 1,
            Source::Override => 2,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Parse sources from strings
//
// Case-insensitive, like the platform identifiers.
impl std::str::FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Source::Default, Source::Injected, Source::Override]
            .into_iter()
            .find(|v| s.eq_ignore_ascii_case(v.as_str()))
            .ok_or(())
    }
}

/// Configuration Fragment
///
/// An ordered mapping of setting keys to raw values, tagged with its source
/// and precedence rank. Setting a key that is already present replaces its
/// value but retains its position.
///
/// A fragment can be restricted to a build variant. Restricted fragments
/// are only considered when resolving that variant.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    source: Source,
    rank: i32,
    variant: Option<String>,
    settings: Vec<(String, Value)>,
}

impl Fragment {
    /// Create an empty fragment
    ///
    /// The fragment uses the default rank of its source.
    pub fn new(source: Source) -> Self {
        Self {
            source: source,
            rank: source.rank(),
            variant: None,
            settings: Vec::new(),
        }
    }

    /// Create an empty `default` fragment.
    pub fn defaults() -> Self {
        Self::new(Source::Default)
    }

    /// Create an empty `override` fragment.
    pub fn overrides() -> Self {
        Self::new(Source::Override)
    }

    /// Create an injected fragment
    ///
    /// Resolve each binding of a setting key to a provider variable and
    /// record the provided value under the setting key. Bindings are
    /// applied in order. If a variable is not provided, the construction
    /// fails; missing injected values are never silently dropped.
    pub fn injected<'a, I>(
        bindings: I,
        provider: &dyn Provider,
    ) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut fragment = Self::new(Source::Injected);

        for (key, variable) in bindings {
            let value = provider.lookup(variable).ok_or_else(
                || Error::Unbound(key.to_string(), variable.to_string())
            )?;

            tracing::debug!(key, variable, value = %value, "injected setting");
            fragment.set(key, value);
        }

        Ok(fragment)
    }

    /// Override the precedence rank.
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    /// Restrict the fragment to a build variant.
    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Builder-style variant of `set()`.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a setting
    ///
    /// Set `key` to `value`. If the key was set before, its value is
    /// replaced in place.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        match self.settings.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.settings.push((key.to_string(), value)),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn rank(&self) -> i32 {
        self.rank
    }

    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Return whether the fragment takes part in resolving `variant`
    ///
    /// Unrestricted fragments apply to all variants. Restricted fragments
    /// only apply to their own variant, and never if no variant is
    /// selected.
    pub fn applies_to(&self, variant: Option<&str>) -> bool {
        match (self.variant.as_deref(), variant) {
            (None, _) => true,
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => false,
        }
    }

    /// Look up the raw value of a setting in this fragment.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.settings.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterate settings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MapProvider;

    #[test]
    fn source_parse() {
        assert_eq!("default".parse::<Source>(), Ok(Source::Default));
        assert_eq!("Injected".parse::<Source>(), Ok(Source::Injected));
        assert_eq!("OVERRIDE".parse::<Source>(), Ok(Source::Override));
        assert!("env".parse::<Source>().is_err());
    }

    // Verify default ranks
    //
    // Injected values must take precedence over defaults, and overrides
    // over both, unless a rank is given explicitly.
    #[test]
    fn source_ranks() {
        assert!(Source::Injected.rank() > Source::Default.rank());
        assert!(Source::Override.rank() > Source::Injected.rank());

        assert_eq!(Fragment::defaults().rank(), 0);
        assert_eq!(Fragment::overrides().with_rank(7).rank(), 7);
    }

    // Verify in-place replacement
    //
    // Setting a key twice keeps the later value at the original position.
    #[test]
    fn fragment_set_replace() {
        let f = Fragment::defaults()
            .with("min_sdk", 21)
            .with("target_sdk", 34)
            .with("min_sdk", 23);

        let keys: Vec<&str> = f.iter().map(|(k, _)| k).collect();

        assert_eq!(keys, ["min_sdk", "target_sdk"]);
        assert_eq!(f.get("min_sdk"), Some(&Value::Int(23)));
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn fragment_variant() {
        let any = Fragment::overrides();
        let release = Fragment::overrides().with_variant("release");

        assert!(any.applies_to(None));
        assert!(any.applies_to(Some("debug")));
        assert!(release.applies_to(Some("release")));
        assert!(!release.applies_to(Some("debug")));
        assert!(!release.applies_to(None));
    }

    // Verify injected fragments
    //
    // Bindings are resolved through the provider, and unbound variables
    // fail the construction naming both setting and variable.
    #[test]
    fn fragment_injected() {
        let p = MapProvider::new()
            .with("flutter.minSdkVersion", 21)
            .with("flutter.targetSdkVersion", "34");

        let f = Fragment::injected(
            [("min_sdk", "flutter.minSdkVersion"), ("target_sdk", "flutter.targetSdkVersion")],
            &p,
        ).unwrap();

        assert_eq!(f.source(), Source::Injected);
        assert_eq!(f.get("min_sdk"), Some(&Value::Int(21)));
        assert_eq!(f.get("target_sdk"), Some(&Value::Str("34".into())));

        match Fragment::injected([("compile_sdk", "flutter.compileSdkVersion")], &p) {
            Err(Error::Unbound(key, var)) => {
                assert_eq!(key, "compile_sdk");
                assert_eq!(var, "flutter.compileSdkVersion");
            },
            _ => panic!("unbound variable must fail"),
        }
    }
}
