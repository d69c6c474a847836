//! Validation Rules
//!
//! Rules are predicates over the merged settings. They run after all
//! fragments were merged and coerced, and report every violation they find
//! rather than stopping at the first.
//!
//! Rules see the coerced value of every setting. If a setting failed
//! coercion, its raw value is retained and the failure is reported
//! separately. Rules must thus tolerate values of unexpected type; they
//! skip such settings instead of reporting them again.

use crate::key;
use crate::value::Value;

/// Merged settings as seen by rules.
pub type Settings = std::collections::BTreeMap<String, Value>;

/// Violation Kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    /// A validation rule does not hold.
    Rule,
    /// A value could not be converted to the semantic type of its key.
    Coercion,
}

/// Rule Violation
///
/// Description of a single violated rule, naming the rule, the settings
/// involved, and a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    pub rule: String,
    pub kind: ViolationKind,
    pub keys: Vec<String>,
    pub message: String,
}

impl Violation {
    /// Create a rule violation.
    pub fn rule(rule: &str, keys: &[&str], message: String) -> Self {
        Self {
            rule: rule.to_string(),
            kind: ViolationKind::Rule,
            keys: keys.iter().map(|v| v.to_string()).collect(),
            message: message,
        }
    }

    /// Create a coercion violation for a single key.
    pub fn coercion(key: &str, expected: crate::value::Kind, value: &Value) -> Self {
        Self {
            rule: "coercion".to_string(),
            kind: ViolationKind::Coercion,
            keys: vec![key.to_string()],
            message: format!(
                "'{}' expects a {}, but {} '{}' cannot be converted",
                key, expected, value.type_name(), value,
            ),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Validation Rule
///
/// A rule checks the merged settings and returns all violations it found.
/// An empty list means the rule holds. Rules must be deterministic.
pub trait Rule {
    /// Name of the rule, used to attribute violations.
    fn name(&self) -> &str;

    /// Check the rule against the merged settings.
    fn check(&self, settings: &Settings) -> Vec<Violation>;
}

/// Required Setting
///
/// The setting must be present.
pub struct Required {
    pub key: &'static str,
}

/// Dependency Requirement
///
/// If the boolean `flag` is enabled, the dependency entry `dependency`
/// must be present.
pub struct RequiresDependency {
    pub name: &'static str,
    pub flag: &'static str,
    pub dependency: &'static str,
}

/// Equality
///
/// Settings `a` and `b` must either both be absent, or be present with
/// equal values.
pub struct Equal {
    pub name: &'static str,
    pub a: &'static str,
    pub b: &'static str,
}

/// Conditional Equality
///
/// If `key` is present, it must equal `reference`.
pub struct Matches {
    pub name: &'static str,
    pub key: &'static str,
    pub reference: &'static str,
}

/// Ordering
///
/// The integer settings in `keys` must be non-decreasing in the given
/// order. Absent settings are skipped.
pub struct Ordered {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

impl Rule for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn check(&self, settings: &Settings) -> Vec<Violation> {
        if settings.contains_key(self.key) {
            Vec::new()
        } else {
            vec![Violation::rule(
                self.name(),
                &[self.key],
                format!("'{}' must be set", self.key),
            )]
        }
    }
}

impl Rule for RequiresDependency {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, settings: &Settings) -> Vec<Violation> {
        let enabled = settings.get(self.flag).and_then(|v| v.as_bool()).unwrap_or(false);

        if enabled && !settings.contains_key(self.dependency) {
            vec![Violation::rule(
                self.name,
                &[self.flag, self.dependency],
                format!(
                    "'{}' is enabled, but the dependency entry '{}' is missing",
                    self.flag, self.dependency,
                ),
            )]
        } else {
            Vec::new()
        }
    }
}

impl Rule for Equal {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, settings: &Settings) -> Vec<Violation> {
        let message = match (settings.get(self.a), settings.get(self.b)) {
            (None, None) => None,
            (Some(a), Some(b)) if a.type_name() != b.type_name() => None,
            (Some(a), Some(b)) if a == b => None,
            (Some(a), Some(b)) => Some(format!(
                "'{}' ({}) and '{}' ({}) must be equal", self.a, a, self.b, b,
            )),
            (Some(_), None) => Some(format!(
                "'{}' is set, but '{}' is missing", self.a, self.b,
            )),
            (None, Some(_)) => Some(format!(
                "'{}' is set, but '{}' is missing", self.b, self.a,
            )),
        };

        message
            .map(|v| vec![Violation::rule(self.name, &[self.a, self.b], v)])
            .unwrap_or_default()
    }
}

impl Rule for Matches {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, settings: &Settings) -> Vec<Violation> {
        let message = match (settings.get(self.key), settings.get(self.reference)) {
            (None, _) => None,
            (Some(_), None) => Some(format!(
                "'{}' is set, but '{}' is missing", self.key, self.reference,
            )),
            (Some(a), Some(b)) if a.type_name() != b.type_name() => None,
            (Some(a), Some(b)) if a == b => None,
            (Some(a), Some(b)) => Some(format!(
                "'{}' ({}) must match '{}' ({})", self.key, a, self.reference, b,
            )),
        };

        message
            .map(|v| vec![Violation::rule(self.name, &[self.key, self.reference], v)])
            .unwrap_or_default()
    }
}

impl Rule for Ordered {
    fn name(&self) -> &str {
        self.name
    }

    fn check(&self, settings: &Settings) -> Vec<Violation> {
        let present: Vec<(&str, i64)> = self.keys.iter()
            .filter_map(|k| settings.get(*k).and_then(|v| v.as_int()).map(|v| (*k, v)))
            .collect();

        present.windows(2)
            .filter(|w| w[0].1 > w[1].1)
            .map(|w| Violation::rule(
                self.name,
                &[w[0].0, w[1].0],
                format!(
                    "'{}' ({}) must not exceed '{}' ({})",
                    w[0].0, w[0].1, w[1].0, w[1].1,
                ),
            ))
            .collect()
    }
}

/// Standard Android rule set
///
/// Return the rules every Android application module configuration must
/// satisfy:
///
///  * `application_id` must be set.
///  * Core library desugaring requires the desugaring library as
///    dependency.
///  * Java source and target compatibility must agree.
///  * The Kotlin JVM target, if set, must match the target compatibility.
///  * `min_sdk <= target_sdk <= compile_sdk`.
pub fn android() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(Required {
            key: key::APPLICATION_ID,
        }),
        Box::new(RequiresDependency {
            name: "desugar-dependency",
            flag: key::DESUGARING_ENABLED,
            dependency: key::DESUGAR_DEPENDENCY,
        }),
        Box::new(Equal {
            name: "java-compatibility",
            a: key::SOURCE_COMPATIBILITY,
            b: key::TARGET_COMPATIBILITY,
        }),
        Box::new(Matches {
            name: "jvm-target",
            key: key::JVM_TARGET,
            reference: key::TARGET_COMPATIBILITY,
        }),
        Box::new(Ordered {
            name: "sdk-order",
            keys: &[key::MIN_SDK, key::TARGET_SDK, key::COMPILE_SDK],
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(entries: &[(&str, Value)]) -> Settings {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    // Verify the desugaring dependency rule
    //
    // Enabled desugaring without the library is a violation, disabled or
    // unset desugaring never is.
    #[test]
    fn requires_dependency() {
        let rule = RequiresDependency {
            name: "desugar-dependency",
            flag: key::DESUGARING_ENABLED,
            dependency: key::DESUGAR_DEPENDENCY,
        };

        let s = settings(&[(key::DESUGARING_ENABLED, Value::Bool(true))]);
        let v = rule.check(&s);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].rule, "desugar-dependency");
        assert_eq!(v[0].kind, ViolationKind::Rule);

        let s = settings(&[
            (key::DESUGARING_ENABLED, Value::Bool(true)),
            (key::DESUGAR_DEPENDENCY, "com.android.tools:desugar_jdk_libs:2.0.4".into()),
        ]);
        assert!(rule.check(&s).is_empty());

        let s = settings(&[(key::DESUGARING_ENABLED, Value::Bool(false))]);
        assert!(rule.check(&s).is_empty());
        assert!(rule.check(&Settings::new()).is_empty());
    }

    #[test]
    fn equal() {
        let rule = Equal {
            name: "java-compatibility",
            a: key::SOURCE_COMPATIBILITY,
            b: key::TARGET_COMPATIBILITY,
        };

        let s = settings(&[
            (key::SOURCE_COMPATIBILITY, Value::Int(17)),
            (key::TARGET_COMPATIBILITY, Value::Int(17)),
        ]);
        assert!(rule.check(&s).is_empty());

        let s = settings(&[
            (key::SOURCE_COMPATIBILITY, Value::Int(17)),
            (key::TARGET_COMPATIBILITY, Value::Int(11)),
        ]);
        assert_eq!(rule.check(&s).len(), 1);

        let s = settings(&[(key::TARGET_COMPATIBILITY, Value::Int(11))]);
        assert_eq!(rule.check(&s).len(), 1);

        assert!(rule.check(&Settings::new()).is_empty());
    }

    // Verify uncoerced values are skipped
    //
    // A value that failed coercion is reported elsewhere, so rules must not
    // report it a second time.
    #[test]
    fn equal_skips_uncoerced() {
        let rule = Equal {
            name: "java-compatibility",
            a: key::SOURCE_COMPATIBILITY,
            b: key::TARGET_COMPATIBILITY,
        };

        let s = settings(&[
            (key::SOURCE_COMPATIBILITY, "seventeen".into()),
            (key::TARGET_COMPATIBILITY, Value::Int(17)),
        ]);
        assert!(rule.check(&s).is_empty());
    }

    #[test]
    fn matches() {
        let rule = Matches {
            name: "jvm-target",
            key: key::JVM_TARGET,
            reference: key::TARGET_COMPATIBILITY,
        };

        assert!(rule.check(&settings(&[(key::TARGET_COMPATIBILITY, Value::Int(17))])).is_empty());
        assert!(rule.check(&settings(&[
            (key::JVM_TARGET, Value::Int(17)),
            (key::TARGET_COMPATIBILITY, Value::Int(17)),
        ])).is_empty());
        assert_eq!(rule.check(&settings(&[
            (key::JVM_TARGET, Value::Int(11)),
            (key::TARGET_COMPATIBILITY, Value::Int(17)),
        ])).len(), 1);
        assert_eq!(rule.check(&settings(&[(key::JVM_TARGET, Value::Int(11))])).len(), 1);
    }

    // Verify SDK ordering
    //
    // Every adjacent inversion is reported, and gaps are skipped.
    #[test]
    fn ordered() {
        let rule = Ordered {
            name: "sdk-order",
            keys: &[key::MIN_SDK, key::TARGET_SDK, key::COMPILE_SDK],
        };

        let s = settings(&[
            (key::MIN_SDK, Value::Int(21)),
            (key::TARGET_SDK, Value::Int(34)),
            (key::COMPILE_SDK, Value::Int(34)),
        ]);
        assert!(rule.check(&s).is_empty());

        let s = settings(&[
            (key::MIN_SDK, Value::Int(35)),
            (key::TARGET_SDK, Value::Int(34)),
            (key::COMPILE_SDK, Value::Int(33)),
        ]);
        assert_eq!(rule.check(&s).len(), 2);

        let s = settings(&[
            (key::MIN_SDK, Value::Int(35)),
            (key::COMPILE_SDK, Value::Int(34)),
        ]);
        assert_eq!(rule.check(&s).len(), 1);
    }

    #[test]
    fn required() {
        let rule = Required { key: key::APPLICATION_ID };

        assert_eq!(rule.check(&Settings::new()).len(), 1);
        assert!(rule.check(&settings(&[(key::APPLICATION_ID, "com.example.app".into())])).is_empty());
    }
}
