//! Configuration Values
//!
//! Settings carry raw values as written by their source. A raw value is
//! either a string, an integer or a boolean. Known settings additionally
//! have a semantic kind, which raw values are coerced into before any
//! comparison is made.

use serde;

/// Raw Setting Value
///
/// This is the value of a single setting, as provided by a fragment. The
/// serde representation is untagged, so values can be read directly from
/// TOML or JSON scalars.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Semantic Kind
///
/// Enumeration of the semantic types known settings can have. A kind
/// defines which raw values are accepted for a setting and how they are
/// normalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Booleans, or strings and integers spelling one.
    Bool,
    /// Integers, or strings with a decimal integer.
    Int,
    /// Any scalar, rendered as text.
    Str,
    /// Java language levels like `17`, `1.8` or `VERSION_17`. Normalized
    /// to the integer major version.
    JavaVersion,
}

impl Value {
    /// Return boolean content
    ///
    /// Return the boolean, or `None` if this is not a native boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Return integer content
    ///
    /// Return the integer, or `None` if this is not a native integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Return string content
    ///
    /// Return the string, or `None` if this is not a native string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Return name of the raw type
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

// Parse a boolean spelling
//
// Accept the usual truthy and falsy words. Matching is ASCII
// case-insensitive and ignores surrounding whitespace.
fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();

    for v in ["true", "yes", "on", "1"] {
        if s.eq_ignore_ascii_case(v) {
            return Some(true);
        }
    }
    for v in ["false", "no", "off", "0"] {
        if s.eq_ignore_ascii_case(v) {
            return Some(false);
        }
    }

    None
}

// Parse a Java language level
//
// Gradle accepts `JavaVersion.VERSION_17`, `VERSION_17`, `17`, and the
// legacy `1.8` / `VERSION_1_8` spellings for old releases. The legacy
// `1.N` form maps to `N`.
fn parse_java_version(s: &str) -> Option<i64> {
    let s = s.trim();
    let s = s.strip_prefix("JavaVersion.").unwrap_or(s);
    let s = s.strip_prefix("VERSION_").unwrap_or(s);

    let digits = |v: &str| -> Option<i64> {
        if !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()) {
            v.parse().ok()
        } else {
            None
        }
    };

    let legacy = s.strip_prefix("1.").or_else(|| s.strip_prefix("1_"));
    let level = match legacy {
        Some(minor) => digits(minor),
        None => digits(s),
    };

    // Level 0 does not exist, neither does `1.0`.
    level.filter(|v| *v > 0)
}

impl Kind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Bool => "boolean",
            Kind::Int => "integer",
            Kind::Str => "string",
            Kind::JavaVersion => "java version",
        }
    }

    /// Coerce a raw value
    ///
    /// Convert the raw value into the normalized representation of this
    /// kind. Returns `None` if the value cannot be represented. No lossy
    /// conversions are performed; e.g., the integer `2` is not a boolean.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Kind::Bool, Value::Bool(v)) => Some(Value::Bool(*v)),
            (Kind::Bool, Value::Int(0)) => Some(Value::Bool(false)),
            (Kind::Bool, Value::Int(1)) => Some(Value::Bool(true)),
            (Kind::Bool, Value::Int(_)) => None,
            (Kind::Bool, Value::Str(v)) => parse_bool(v).map(Value::Bool),

            (Kind::Int, Value::Int(v)) => Some(Value::Int(*v)),
            (Kind::Int, Value::Str(v)) => v.trim().parse().ok().map(Value::Int),
            (Kind::Int, Value::Bool(_)) => None,

            (Kind::Str, Value::Str(v)) => Some(Value::Str(v.clone())),
            (Kind::Str, v) => Some(Value::Str(v.to_string())),

            (Kind::JavaVersion, Value::Int(v)) if *v > 0 => Some(Value::Int(*v)),
            (Kind::JavaVersion, Value::Str(v)) => parse_java_version(v).map(Value::Int),
            (Kind::JavaVersion, _) => None,
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
