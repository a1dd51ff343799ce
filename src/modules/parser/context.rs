//! Rendering contexts
//!
//! A [`RenderContext`] is an immutable set of names that template expressions
//! may refer to. Values are plain JSON values; functions are the only
//! callables an expression can reach.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use strata_core::{CliVars, Profile};
use tracing::info;

use crate::template::{is_truthy, to_text};

/// Signature of a context function
pub type ContextFn = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A single named entry in a rendering context
#[derive(Clone)]
pub enum ContextEntry {
    Value(Value),
    Function(ContextFn),
}

impl fmt::Debug for ContextEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextEntry::Value(value) => write!(f, "Value({})", value),
            ContextEntry::Function(_) => f.write_str("Function"),
        }
    }
}

/// Immutable name lookup used while rendering
///
/// Cloning is cheap; layering a new entry produces a new context and leaves
/// the original untouched.
#[derive(Clone, Default)]
pub struct RenderContext {
    entries: Arc<BTreeMap<String, ContextEntry>>,
}

impl RenderContext {
    /// A context with no names at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ContextEntry> {
        self.entries.get(name)
    }

    /// The value bound to `name`, if it is a value and not a function
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.entries.get(name) {
            Some(ContextEntry::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn with_entry(&self, name: impl Into<String>, entry: ContextEntry) -> Self {
        let mut entries = (*self.entries).clone();
        entries.insert(name.into(), entry);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// A new context with `name` bound to a value
    pub fn with_value(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_entry(name, ContextEntry::Value(value.into()))
    }

    /// A new context with `name` bound to a function
    pub fn with_function<F>(&self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.with_entry(name, ContextEntry::Function(Arc::new(function)))
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Context with command-line variables and the built-in functions
pub fn generate_base_context(vars: &CliVars) -> RenderContext {
    let vars = vars.clone();

    RenderContext::empty()
        .with_function("var", move |args| {
            let name = string_arg(args, 0, "variable name")?;
            match (vars.get(name), args.get(1)) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(default)) => Ok(default.clone()),
                (None, None) => Err(format!(
                    "required variable '{}' was not supplied and has no default",
                    name
                )),
            }
        })
        .with_function("env_var", |args| {
            let name = string_arg(args, 0, "environment variable name")?;
            match (std::env::var(name), args.get(1)) {
                (Ok(value), _) => Ok(Value::String(value)),
                (Err(_), Some(default)) => Ok(default.clone()),
                (Err(_), None) => Err(format!(
                    "environment variable '{}' is not set and has no default",
                    name
                )),
            }
        })
        .with_function("as_text", |args| Ok(Value::String(to_text(first(args)?))))
        .with_function("as_number", |args| as_number(first(args)?))
        .with_function("as_bool", |args| as_bool(first(args)?))
        .with_function("tojson", |args| {
            serde_json::to_string(first(args)?)
                .map(Value::String)
                .map_err(|e| e.to_string())
        })
        .with_function("fromjson", |args| {
            let text = string_arg(args, 0, "JSON text")?;
            serde_json::from_str(text).map_err(|e| format!("invalid JSON '{}': {}", text, e))
        })
        .with_function("log", |args| {
            info!(target: "strata::template", "{}", to_text(first(args)?));
            Ok(Value::String(String::new()))
        })
}

/// Base context plus `target`, describing the profile's selected target
///
/// Secret credential fields never appear in `target`.
pub fn generate_target_context(profile: &Profile, vars: &CliVars) -> RenderContext {
    let mut target = profile.credentials.connection_info();
    target.insert("name".to_string(), Value::from(profile.target_name.clone()));
    target.insert(
        "target_name".to_string(),
        Value::from(profile.target_name.clone()),
    );
    target.insert(
        "profile_name".to_string(),
        Value::from(profile.profile_name.clone()),
    );
    target.insert("threads".to_string(), Value::from(profile.threads));

    generate_base_context(vars).with_value("target", Value::Object(target))
}

fn first(args: &[Value]) -> Result<&Value, String> {
    args.first()
        .ok_or_else(|| "expected at least one argument".to_string())
}

fn string_arg<'a>(args: &'a [Value], index: usize, what: &str) -> Result<&'a str, String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(format!("{} must be a string, got {}", what, other)),
        None => Err(format!("missing {}", what)),
    }
}

fn as_number(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::from(*b as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{}' is not a number", s))
        }
        other => Err(format!("cannot convert {} to a number", other)),
    }
}

fn as_bool(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        other => Ok(Value::Bool(is_truthy(other))),
    }
}
