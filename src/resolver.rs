//! Configuration Resolver
//!
//! The resolver merges configuration fragments into a single resolved
//! configuration. It is created per build invocation, collects fragments
//! and rules, and produces exactly one `Resolved` configuration or fails
//! with a complete list of problems.
//!
//! Merge Order
//! -----------
//!
//! For every key, the value of the fragment with the highest precedence
//! rank wins. If several fragments of the same rank set a key, the one
//! registered last wins. Registration order is irrelevant otherwise.
//!
//! After merging, values of known keys are coerced into their semantic
//! kind (see `crate::key`), and all rules are checked. Coercion failures
//! and rule violations are collected together. Only if there are none is
//! a configuration returned. Partially valid configurations are never
//! exposed.

use crate::fragment::{Fragment, Source};
use crate::key;
use crate::rule::{Rule, Settings, Violation};
use crate::value::{Kind, Value};

/// Resolver Errors
///
/// This is the exhaustive list of possible errors raised by resolution and
/// by lookups on a resolved configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No fragments were registered, or none applies to the selected
    /// variant.
    #[error("no configuration fragments registered")]
    Empty,
    /// The merged configuration violates one or more rules. The list is
    /// complete and in rule order, with coercion failures first.
    #[error("configuration violates {} rule(s)", .0.len())]
    Validation(Vec<Violation>),
    /// The requested key is not part of the resolved configuration.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
    /// The requested key has a value of another type.
    #[error("configuration key '{key}' is not a {expected}")]
    Type {
        key: String,
        expected: &'static str,
    },
}

/// Value Origin
///
/// Records which fragment supplied the winning value of a setting.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Origin {
    pub source: Source,
    pub rank: i32,
    /// Position of the fragment in registration order.
    pub fragment: usize,
}

/// Configuration Resolver
pub struct Resolver {
    variant: Option<String>,
    fragments: Vec<Fragment>,
    rules: Vec<Box<dyn Rule>>,
}

/// Resolved Configuration
///
/// Immutable result of a successful resolution. Every key has exactly one
/// value. Lookups of absent keys always fail; there are no implicit
/// defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    variant: Option<String>,
    settings: Settings,
    origins: std::collections::BTreeMap<String, Origin>,
}

impl Resolver {
    /// Create a resolver
    ///
    /// Create a resolver without any fragments or rules. No variant is
    /// selected, so variant-restricted fragments are ignored.
    pub fn new() -> Self {
        Self {
            variant: None,
            fragments: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Create a resolver with the standard Android rules.
    pub fn android() -> Self {
        let mut r = Self::new();

        for rule in crate::rule::android() {
            r.rules.push(rule);
        }

        r
    }

    /// Select the build variant
    ///
    /// Only fragments unrestricted or restricted to this variant take part
    /// in resolution.
    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Register a fragment
    ///
    /// Append the fragment to the list of layers. No validation is done
    /// at this point.
    pub fn add_fragment(&mut self, fragment: Fragment) {
        tracing::debug!(
            source = %fragment.source(),
            rank = fragment.rank(),
            variant = fragment.variant(),
            settings = fragment.len(),
            "register fragment"
        );

        self.fragments.push(fragment);
    }

    /// Register a validation rule.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    // Merge applicable fragments
    //
    // Walk the fragments ordered by rank, with a stable sort to retain
    // registration order within a rank. Later writes replace earlier ones,
    // so the highest rank wins, and the last registered fragment within a
    // rank.
    fn merge(&self) -> Option<(Settings, std::collections::BTreeMap<String, Origin>)> {
        let mut order: Vec<usize> = (0..self.fragments.len())
            .filter(|i| self.fragments[*i].applies_to(self.variant.as_deref()))
            .collect();

        if order.is_empty() {
            return None;
        }

        order.sort_by_key(|i| self.fragments[*i].rank());

        let mut settings = Settings::new();
        let mut origins: std::collections::BTreeMap<String, Origin> = Default::default();

        for i in order {
            let fragment = &self.fragments[i];

            for (key, value) in fragment.iter() {
                if let Some(previous) = origins.get(key) {
                    tracing::trace!(
                        key,
                        from = %previous.source,
                        to = %fragment.source(),
                        "setting overridden"
                    );
                }

                settings.insert(key.to_string(), value.clone());
                origins.insert(
                    key.to_string(),
                    Origin {
                        source: fragment.source(),
                        rank: fragment.rank(),
                        fragment: i,
                    },
                );
            }
        }

        Some((settings, origins))
    }

    /// Resolve the configuration
    ///
    /// Merge all applicable fragments, coerce known keys, and check all
    /// rules. Returns the resolved configuration, or fails with the
    /// complete list of violations.
    ///
    /// This has no side-effects. Calling it repeatedly without registering
    /// further fragments yields identical results.
    pub fn resolve(&self) -> Result<Resolved, Error> {
        let (mut settings, origins) = self.merge().ok_or(Error::Empty)?;
        let mut violations = Vec::new();

        // Coerce known keys into their semantic kind. Values that cannot be
        // converted are retained as-is, so rules can skip them.
        for (name, value) in settings.iter_mut() {
            if let Some(kind) = key::kind(name) {
                match kind.coerce(value) {
                    Some(v) => *value = v,
                    None => violations.push(Violation::coercion(name, kind, value)),
                }
            }
        }

        for rule in self.rules.iter() {
            violations.extend(rule.check(&settings));
        }

        if !violations.is_empty() {
            for v in violations.iter() {
                tracing::warn!(rule = %v.rule, "{}", v.message);
            }
            return Err(Error::Validation(violations));
        }

        tracing::info!(
            variant = self.variant.as_deref(),
            settings = settings.len(),
            "configuration resolved"
        );

        Ok(
            Resolved {
                variant: self.variant.clone(),
                settings: settings,
                origins: origins,
            }
        )
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolved {
    /// Look up a setting
    ///
    /// Return the value of `key`, or fail with `Error::UnknownKey` if the
    /// configuration has no such setting.
    pub fn get(&self, key: &str) -> Result<&Value, Error> {
        self.settings.get(key).ok_or_else(
            || Error::UnknownKey(key.to_string())
        )
    }

    // Look up a setting and project it to a type
    fn get_as<'a, T>(
        &'a self,
        key: &str,
        kind: Kind,
        f: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, Error> {
        f(self.get(key)?).ok_or_else(
            || Error::Type {
                key: key.to_string(),
                expected: kind.as_str(),
            }
        )
    }

    /// Look up a boolean setting.
    pub fn get_bool(&self, key: &str) -> Result<bool, Error> {
        self.get_as(key, Kind::Bool, |v| v.as_bool())
    }

    /// Look up an integer setting. Java versions are integers as well.
    pub fn get_int(&self, key: &str) -> Result<i64, Error> {
        self.get_as(key, Kind::Int, |v| v.as_int())
    }

    /// Look up a string setting.
    pub fn get_str(&self, key: &str) -> Result<&str, Error> {
        self.get_as(key, Kind::Str, |v| v.as_str())
    }

    /// Return the origin of a setting
    ///
    /// Return which fragment supplied the value of `key`.
    pub fn provenance(&self, key: &str) -> Result<&Origin, Error> {
        self.origins.get(key).ok_or_else(
            || Error::UnknownKey(key.to_string())
        )
    }

    /// Return the variant this configuration was resolved for.
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// Iterate all settings ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Convert to JSON
    ///
    /// Return a JSON object with all settings, ordered by key.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self.settings.iter().map(
            |(k, v)| {
                let v = match v {
                    Value::Bool(v) => serde_json::Value::Bool(*v),
                    Value::Int(v) => serde_json::Value::from(*v),
                    Value::Str(v) => serde_json::Value::String(v.clone()),
                };
                (k.clone(), v)
            }
        ).collect::<serde_json::Map<_, _>>();

        serde_json::Value::Object(map)
    }
}
