//! Variable Providers
//!
//! Build tools inject values into the configuration that are not known
//! when the configuration is written, like the SDK levels of the hosting
//! framework. These values are looked up through a `Provider` which is
//! always passed explicitly. There is no global variable state.

use crate::value::Value;

/// Variable Provider
///
/// A provider is a plain key-value lookup of externally injected values.
/// Lookups must not have side-effects, and repeated lookups of the same
/// name must yield the same value.
pub trait Provider {
    /// Look up the variable with the given name, or return `None` if the
    /// provider has no such variable.
    fn lookup(&self, name: &str) -> Option<Value>;
}

/// In-Memory Provider
///
/// Provider backed by an in-memory map. This is used for variables passed
/// on the command-line, as well as in tests.
#[derive(Clone, Debug, Default)]
pub struct MapProvider {
    map: std::collections::BTreeMap<String, Value>,
}

/// Environment Provider
///
/// Provider reading variables from the process environment. A variable
/// name is turned into an environment variable name by replacing dots and
/// dashes with underscores, upper-casing it, and prepending the prefix.
/// Hence, `flutter.minSdkVersion` with prefix `OSIRIS_` is read from
/// `OSIRIS_FLUTTER_MINSDKVERSION`.
///
/// Environment values are always strings. Coercion into the semantic type
/// happens during resolution.
#[derive(Clone, Debug)]
pub struct EnvProvider {
    prefix: String,
}

/// Chained Provider
///
/// Provider trying each contained provider in order, returning the first
/// value found.
#[derive(Default)]
pub struct ChainProvider<'a> {
    chain: Vec<&'a dyn Provider>,
}

impl MapProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        Default::default()
    }

    /// Set a variable
    ///
    /// Set the variable `name` to `value`, replacing any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.map.insert(name.to_string(), value.into());
    }

    /// Builder-style variant of `set()`.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Parse a `NAME=VALUE` assignment
    ///
    /// Split the assignment at the first `=` and set the variable. The
    /// value is stored as string. Returns `Err(())` if there is no `=` or
    /// the name is empty.
    pub fn set_assignment(&mut self, assignment: &str) -> Result<(), ()> {
        match assignment.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                self.set(name.trim(), value);
                Ok(())
            },
            _ => Err(()),
        }
    }
}

impl Provider for MapProvider {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.map.get(name).cloned()
    }
}

impl EnvProvider {
    /// Create an environment provider with the given prefix.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Map a variable name to its environment variable name.
    pub fn env_name(&self, name: &str) -> String {
        let mut s = self.prefix.clone();

        s.extend(
            name.chars().map(
                |v| if v == '.' || v == '-' { '_' } else { v.to_ascii_uppercase() }
            )
        );

        s
    }
}

impl Provider for EnvProvider {
    fn lookup(&self, name: &str) -> Option<Value> {
        std::env::var(self.env_name(name)).ok().map(Value::Str)
    }
}

impl<'a> ChainProvider<'a> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            chain: Vec::new(),
        }
    }

    /// Append a provider with lower priority than all previous ones.
    pub fn push(&mut self, provider: &'a dyn Provider) {
        self.chain.push(provider);
    }
}

impl<'a> Provider for ChainProvider<'a> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.chain.iter().find_map(|v| v.lookup(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lookup() {
        let p = MapProvider::new()
            .with("flutter.minSdkVersion", 21)
            .with("flutter.versionName", "1.0.0");

        assert_eq!(p.lookup("flutter.minSdkVersion"), Some(Value::Int(21)));
        assert_eq!(p.lookup("flutter.versionName"), Some(Value::Str("1.0.0".into())));
        assert_eq!(p.lookup("flutter.ndkVersion"), None);
    }

    // Verify command-line assignments
    //
    // Only the first `=` separates name and value, and names must not be
    // empty.
    #[test]
    fn map_assignment() {
        let mut p = MapProvider::new();

        p.set_assignment("a=b=c").unwrap();
        assert_eq!(p.lookup("a"), Some(Value::Str("b=c".into())));

        p.set_assignment("empty=").unwrap();
        assert_eq!(p.lookup("empty"), Some(Value::Str("".into())));

        assert!(p.set_assignment("novalue").is_err());
        assert!(p.set_assignment("=value").is_err());
    }

    #[test]
    fn env_name() {
        let p = EnvProvider::new("OSIRIS_");

        assert_eq!(p.env_name("flutter.minSdkVersion"), "OSIRIS_FLUTTER_MINSDKVERSION");
        assert_eq!(p.env_name("target-sdk"), "OSIRIS_TARGET_SDK");
    }

    #[test]
    fn env_lookup() {
        let p = EnvProvider::new("OSIRIS_CONFIG_TEST_");

        std::env::set_var("OSIRIS_CONFIG_TEST_FLUTTER_COMPILESDKVERSION", "34");
        assert_eq!(
            p.lookup("flutter.compileSdkVersion"),
            Some(Value::Str("34".into())),
        );
        assert_eq!(p.lookup("flutter.unset"), None);
    }

    // Verify chain priority
    //
    // Earlier providers shadow later ones, later ones fill gaps.
    #[test]
    fn chain_priority() {
        let a = MapProvider::new().with("x", 1);
        let b = MapProvider::new().with("x", 2).with("y", 3);
        let mut c = ChainProvider::new();

        c.push(&a);
        c.push(&b);

        assert_eq!(c.lookup("x"), Some(Value::Int(1)));
        assert_eq!(c.lookup("y"), Some(Value::Int(3)));
        assert_eq!(c.lookup("z"), None);
    }
}
