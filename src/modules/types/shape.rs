//! Structural shapes for validating JSON-compatible configuration values

use serde_json::Value;
use std::fmt;

use crate::keypath::Keypath;

/// Expected shape of a configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// String value
    String,
    /// Signed or unsigned integer
    Integer,
    /// Integer greater than or equal to zero
    Unsigned,
    /// Integer from zero up to the given maximum, inclusive
    UnsignedMax(u64),
    /// Any JSON number
    Number,
    /// Boolean value
    Boolean,
    /// Anything, including null
    Any,
    /// Sequence whose items all have the inner shape
    List(Box<Shape>),
    /// Mapping whose values all have the inner shape
    Map(Box<Shape>),
    /// Mapping with named fields
    Object(ObjectSchema),
    /// Mapping whose field set is selected by a tag field
    Tagged(TaggedSchema),
    /// Any one of the listed shapes
    OneOf(Vec<Shape>),
    /// The inner shape or null
    Nullable(Box<Shape>),
}

/// A named field of an object schema
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
}

/// Schema of a mapping with named fields
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
    /// Whether keys not listed in `fields` are accepted
    pub allow_extra: bool,
}

/// Schema of a mapping discriminated by a string tag field
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSchema {
    pub tag: &'static str,
    pub variants: Vec<(String, ObjectSchema)>,
}

/// A value that does not match its expected shape
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaViolation {
    pub path: Keypath,
    pub expected: String,
    pub found: String,
}

impl ObjectSchema {
    /// Create an empty schema that rejects unknown keys
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            allow_extra: false,
        }
    }

    pub fn required(mut self, name: &'static str, shape: Shape) -> Self {
        self.fields.push(FieldSpec {
            name,
            shape,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, shape: Shape) -> Self {
        self.fields.push(FieldSpec {
            name,
            shape,
            required: false,
        });
        self
    }

    /// Accept keys that are not declared as fields
    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Check a value against this schema, reporting the first violation
    pub fn check(&self, value: &Value, path: &Keypath) -> Result<(), SchemaViolation> {
        let map = value.as_object().ok_or_else(|| SchemaViolation {
            path: path.clone(),
            expected: format!("mapping `{}`", self.name),
            found: describe(value),
        })?;

        for field in &self.fields {
            match map.get(field.name) {
                Some(child) => field.shape.check(child, &path.key(field.name))?,
                None if field.required => {
                    return Err(SchemaViolation {
                        path: path.key(field.name),
                        expected: format!("required field of type {}", field.shape),
                        found: "nothing".to_string(),
                    });
                }
                None => {}
            }
        }

        if !self.allow_extra {
            if let Some(unknown) = map.keys().find(|k| self.field(k).is_none()) {
                return Err(SchemaViolation {
                    path: path.key(unknown.as_str()),
                    expected: format!(
                        "one of the fields of `{}`: {}",
                        self.name,
                        self.field_names().join(", ")
                    ),
                    found: "unknown field".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl TaggedSchema {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, name: impl Into<String>, schema: ObjectSchema) -> Self {
        self.variants.push((name.into(), schema));
        self
    }

    fn variant_names(&self) -> Vec<&str> {
        self.variants.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn check(&self, value: &Value, path: &Keypath) -> Result<(), SchemaViolation> {
        let map = value.as_object().ok_or_else(|| SchemaViolation {
            path: path.clone(),
            expected: format!("mapping with a `{}` field", self.tag),
            found: describe(value),
        })?;

        let tag_path = path.key(self.tag);
        let expected_tag = || format!("one of: {}", self.variant_names().join(", "));
        let tag = match map.get(self.tag) {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(SchemaViolation {
                    path: tag_path,
                    expected: expected_tag(),
                    found: describe(other),
                })
            }
            None => {
                return Err(SchemaViolation {
                    path: tag_path,
                    expected: expected_tag(),
                    found: "nothing".to_string(),
                })
            }
        };

        let (_, schema) = self
            .variants
            .iter()
            .find(|(name, _)| name == tag)
            .ok_or_else(|| SchemaViolation {
                path: tag_path.clone(),
                expected: expected_tag(),
                found: format!("`{}`", tag),
            })?;

        schema.check(value, path)
    }
}

impl Shape {
    pub fn list_of(inner: Shape) -> Self {
        Shape::List(Box::new(inner))
    }

    pub fn map_of(inner: Shape) -> Self {
        Shape::Map(Box::new(inner))
    }

    pub fn nullable(inner: Shape) -> Self {
        Shape::Nullable(Box::new(inner))
    }

    /// Returns true if the value matches this shape
    pub fn validate(&self, value: &Value) -> bool {
        self.check(value, &Keypath::root()).is_ok()
    }

    /// Check a value against this shape, reporting the first violation
    pub fn check(&self, value: &Value, path: &Keypath) -> Result<(), SchemaViolation> {
        let matches = match self {
            Shape::String => value.is_string(),
            Shape::Integer => value.is_i64() || value.is_u64(),
            Shape::Unsigned => value.is_u64(),
            Shape::UnsignedMax(max) => value.as_u64().map_or(false, |n| n <= *max),
            Shape::Number => value.is_number(),
            Shape::Boolean => value.is_boolean(),
            Shape::Any => true,
            Shape::Nullable(inner) => {
                if value.is_null() {
                    true
                } else {
                    return inner.check(value, path);
                }
            }
            Shape::List(inner) => {
                let items = value.as_array().ok_or_else(|| self.violation(value, path))?;
                for (i, item) in items.iter().enumerate() {
                    inner.check(item, &path.index(i))?;
                }
                true
            }
            Shape::Map(inner) => {
                let map = value.as_object().ok_or_else(|| self.violation(value, path))?;
                for (key, child) in map {
                    inner.check(child, &path.key(key.as_str()))?;
                }
                true
            }
            Shape::Object(schema) => return schema.check(value, path),
            Shape::Tagged(schema) => return schema.check(value, path),
            Shape::OneOf(options) => options.iter().any(|o| o.validate(value)),
        };

        if matches {
            Ok(())
        } else {
            Err(self.violation(value, path))
        }
    }

    fn violation(&self, value: &Value, path: &Keypath) -> SchemaViolation {
        SchemaViolation {
            path: path.clone(),
            expected: self.to_string(),
            found: describe(value),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::String => write!(f, "string"),
            Shape::Integer => write!(f, "integer"),
            Shape::Unsigned => write!(f, "non-negative integer"),
            Shape::UnsignedMax(max) => write!(f, "integer between 0 and {}", max),
            Shape::Number => write!(f, "number"),
            Shape::Boolean => write!(f, "boolean"),
            Shape::Any => write!(f, "any value"),
            Shape::List(inner) => write!(f, "list of {}", inner),
            Shape::Map(inner) => write!(f, "mapping of {}", inner),
            Shape::Object(schema) => write!(f, "mapping `{}`", schema.name),
            Shape::Tagged(schema) => write!(
                f,
                "mapping with `{}` one of: {}",
                schema.tag,
                schema.variant_names().join(", ")
            ),
            Shape::OneOf(options) => {
                let names: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "one of ({})", names.join(" | "))
            }
            Shape::Nullable(inner) => write!(f, "{} or null", inner),
        }
    }
}

/// Short human-readable description of a value's kind
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) if n.is_f64() => "number".to_string(),
        Value::Number(n) if n.is_i64() && n.as_i64().unwrap_or(0) < 0 => {
            "negative integer".to_string()
        }
        Value::Number(_) => "integer".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "sequence".to_string(),
        Value::Object(_) => "mapping".to_string(),
    }
}
