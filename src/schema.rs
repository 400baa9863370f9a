//! Parameter contracts for tools.
//!
//! A `Schema` is a small tagged AST describing the arguments a tool accepts.
//! It can be written by hand, converted from an arbitrary JSON Schema
//! document, or derived from a `schemars::JsonSchema` type. The same AST is
//! used to validate inbound arguments and to render the `inputSchema` shown
//! in `tools/list`.

use {
    schemars::JsonSchema,
    serde_json::{json, Map, Value},
    std::fmt,
};

/// One named property of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_required(&self) -> bool {
        !matches!(self.schema, Schema::Optional(_) | Schema::Any)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Object(Vec<Field>),
    String {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Integer {
        minimum: Option<i64>,
        maximum: Option<i64>,
    },
    Boolean,
    Array(Box<Schema>),
    Enum(Vec<String>),
    Optional(Box<Schema>),
    Any,
}

/// A single validation failure, located by a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "root" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

impl Schema {
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::Object(fields.into_iter().collect())
    }

    pub fn string() -> Self {
        Self::String {
            min_length: None,
            max_length: None,
        }
    }

    pub fn number() -> Self {
        Self::Number {
            minimum: None,
            maximum: None,
        }
    }

    pub fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    pub fn array(items: Schema) -> Self {
        Self::Array(Box::new(items))
    }

    pub fn enumeration<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Derive a contract from a Rust type through its generated JSON Schema.
    pub fn for_type<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        match serde_json::to_value(&root) {
            Ok(value) => Self::from_json_schema(&value),
            Err(_) => Self::Any,
        }
    }

    /// Convert a JSON Schema document into the internal representation.
    ///
    /// Local `$ref`s into `$defs`/`definitions` are resolved against the
    /// document root. Anything this AST cannot express becomes `Any`.
    pub fn from_json_schema(document: &Value) -> Self {
        convert(document, document, 0)
    }

    /// Render as JSON Schema for `tools/list`.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Object(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    let mut rendered = field.schema.to_json_schema();
                    if let (Some(desc), Some(obj)) = (&field.description, rendered.as_object_mut()) {
                        obj.insert("description".into(), json!(desc));
                    }
                    properties.insert(field.name.clone(), rendered);
                    if field.is_required() {
                        required.push(json!(field.name));
                    }
                }
                let mut schema = json!({ "type": "object", "properties": properties });
                if !required.is_empty() {
                    schema["required"] = Value::Array(required);
                }
                schema
            }
            Self::String {
                min_length,
                max_length,
            } => {
                let mut schema = json!({ "type": "string" });
                if let Some(min) = min_length {
                    schema["minLength"] = json!(min);
                }
                if let Some(max) = max_length {
                    schema["maxLength"] = json!(max);
                }
                schema
            }
            Self::Number { minimum, maximum } => {
                let mut schema = json!({ "type": "number" });
                if let Some(min) = minimum {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = maximum {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Self::Integer { minimum, maximum } => {
                let mut schema = json!({ "type": "integer" });
                if let Some(min) = minimum {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = maximum {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Self::Boolean => json!({ "type": "boolean" }),
            Self::Array(items) => json!({ "type": "array", "items": items.to_json_schema() }),
            Self::Enum(values) => json!({ "type": "string", "enum": values }),
            Self::Optional(inner) => inner.to_json_schema(),
            Self::Any => json!({}),
        }
    }

    /// Validate `value`, returning the normalised value (unknown object keys
    /// stripped) or every issue found.
    pub fn validate(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        let mut issues = Vec::new();
        let normalised = self.check(value, "", &mut issues);
        if issues.is_empty() {
            Ok(normalised)
        } else {
            Err(issues)
        }
    }

    /// Enumeration values, if this is (an optional) enum.
    pub fn enum_values(&self) -> Option<&[String]> {
        match self {
            Self::Enum(values) => Some(values),
            Self::Optional(inner) => inner.enum_values(),
            _ => None,
        }
    }

    fn check(&self, value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Value {
        let mut fail = |message: String| {
            issues.push(SchemaIssue {
                path: path.to_string(),
                message,
            });
            Value::Null
        };

        match self {
            Self::Any => value.clone(),
            Self::Optional(inner) => {
                if value.is_null() {
                    Value::Null
                } else {
                    inner.check(value, path, issues)
                }
            }
            Self::Object(fields) => {
                let Some(obj) = value.as_object() else {
                    return fail(format!("Expected object, received {}", type_name(value)));
                };
                let mut out = Map::new();
                for field in fields {
                    let child = join_path(path, &field.name);
                    match obj.get(&field.name) {
                        Some(v) => {
                            let checked = field.schema.check(v, &child, issues);
                            out.insert(field.name.clone(), checked);
                        }
                        None if field.is_required() => issues.push(SchemaIssue {
                            path: child,
                            message: "Required".into(),
                        }),
                        None => {}
                    }
                }
                Value::Object(out)
            }
            Self::String {
                min_length,
                max_length,
            } => {
                let Some(s) = value.as_str() else {
                    return fail(format!("Expected string, received {}", type_name(value)));
                };
                let len = s.chars().count();
                if let Some(min) = min_length.filter(|min| len < *min) {
                    return fail(format!("String must contain at least {min} character(s)"));
                }
                if let Some(max) = max_length.filter(|max| len > *max) {
                    return fail(format!("String must contain at most {max} character(s)"));
                }
                value.clone()
            }
            Self::Number { minimum, maximum } => {
                let Some(n) = value.as_f64() else {
                    return fail(format!("Expected number, received {}", type_name(value)));
                };
                if let Some(min) = minimum.filter(|min| n < *min) {
                    return fail(format!("Number must be greater than or equal to {min}"));
                }
                if let Some(max) = maximum.filter(|max| n > *max) {
                    return fail(format!("Number must be less than or equal to {max}"));
                }
                value.clone()
            }
            Self::Integer { minimum, maximum } => {
                let as_int = value
                    .as_i64()
                    .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64));
                let Some(n) = as_int else {
                    return if value.is_number() {
                        fail("Expected integer, received float".into())
                    } else {
                        fail(format!("Expected integer, received {}", type_name(value)))
                    };
                };
                if let Some(min) = minimum.filter(|min| n < *min) {
                    return fail(format!("Number must be greater than or equal to {min}"));
                }
                if let Some(max) = maximum.filter(|max| n > *max) {
                    return fail(format!("Number must be less than or equal to {max}"));
                }
                value.clone()
            }
            Self::Boolean => {
                if value.is_boolean() {
                    value.clone()
                } else {
                    fail(format!("Expected boolean, received {}", type_name(value)))
                }
            }
            Self::Array(items) => {
                let Some(arr) = value.as_array() else {
                    return fail(format!("Expected array, received {}", type_name(value)));
                };
                Value::Array(
                    arr.iter()
                        .enumerate()
                        .map(|(i, v)| items.check(v, &join_path(path, &i.to_string()), issues))
                        .collect(),
                )
            }
            Self::Enum(values) => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => value.clone(),
                _ => fail(format!(
                    "Invalid enum value. Expected {}, received {}",
                    values
                        .iter()
                        .map(|v| format!("'{v}'"))
                        .collect::<Vec<_>>()
                        .join(" | "),
                    value
                )),
            },
        }
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

const MAX_REF_DEPTH: usize = 32;

fn resolve_ref<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(pointer)
}

fn convert(node: &Value, root: &Value, depth: usize) -> Schema {
    if depth > MAX_REF_DEPTH {
        return Schema::Any;
    }
    let Some(obj) = node.as_object() else {
        return Schema::Any;
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        return match resolve_ref(root, reference) {
            Some(target) => convert(target, root, depth + 1),
            None => Schema::Any,
        };
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(variants) = obj.get(key).and_then(Value::as_array) {
            let (nulls, rest): (Vec<&Value>, Vec<&Value>) = variants
                .iter()
                .partition(|v| v.get("type").and_then(Value::as_str) == Some("null"));
            return match rest.as_slice() {
                [single] => {
                    let inner = convert(single, root, depth + 1);
                    if nulls.is_empty() {
                        inner
                    } else {
                        inner.optional()
                    }
                }
                _ => Schema::Any,
            };
        }
    }

    if let Some(values) = obj.get("enum").and_then(Value::as_array) {
        let strings: Vec<String> = values
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        let nullable = values.iter().any(Value::is_null);
        if !strings.is_empty() && strings.len() + usize::from(nullable) == values.len() {
            let schema = Schema::Enum(strings);
            return if nullable { schema.optional() } else { schema };
        }
        return Schema::Any;
    }

    let (type_name, nullable) = match obj.get("type") {
        Some(Value::String(t)) => (Some(t.as_str()), false),
        Some(Value::Array(types)) => {
            let nullable = types.iter().any(|t| t.as_str() == Some("null"));
            let concrete: Vec<&str> = types
                .iter()
                .filter_map(Value::as_str)
                .filter(|t| *t != "null")
                .collect();
            match concrete.as_slice() {
                [single] => (Some(*single), nullable),
                _ => (None, nullable),
            }
        }
        _ => (None, false),
    };

    let schema = match type_name {
        Some("object") => {
            let required: Vec<&str> = obj
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let fields = obj
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, prop)| {
                            let mut schema = convert(prop, root, depth + 1);
                            if !required.contains(&name.as_str()) {
                                schema = schema.optional();
                            }
                            let mut field = Field::new(name.clone(), schema);
                            field.description = prop
                                .get("description")
                                .and_then(Value::as_str)
                                .map(str::to_string);
                            field
                        })
                        .collect()
                })
                .unwrap_or_default();
            Schema::Object(fields)
        }
        Some("string") => Schema::String {
            min_length: obj.get("minLength").and_then(Value::as_u64).map(|v| v as usize),
            max_length: obj.get("maxLength").and_then(Value::as_u64).map(|v| v as usize),
        },
        Some("number") => Schema::Number {
            minimum: obj.get("minimum").and_then(Value::as_f64),
            maximum: obj.get("maximum").and_then(Value::as_f64),
        },
        Some("integer") => Schema::Integer {
            minimum: obj.get("minimum").and_then(Value::as_i64),
            maximum: obj.get("maximum").and_then(Value::as_i64),
        },
        Some("boolean") => Schema::Boolean,
        Some("array") => Schema::array(
            obj.get("items")
                .map(|items| convert(items, root, depth + 1))
                .unwrap_or(Schema::Any),
        ),
        _ => Schema::Any,
    };

    if nullable {
        schema.optional()
    } else {
        schema
    }
}
