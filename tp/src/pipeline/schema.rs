//! Declarative argument schemas and the validator that enforces them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Declared JSON type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
}

impl FieldType {
    fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        }
    }
}

/// Validation rules for a single field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldRule {
    pub fn of_type(field_type: FieldType) -> Self {
        Self {
            field_type: Some(field_type),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of_type(FieldType::String)
    }

    pub fn number() -> Self {
        Self::of_type(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::of_type(FieldType::Boolean)
    }

    pub fn object() -> Self {
        Self::of_type(FieldType::Object)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.min = Some(n);
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.max = Some(n);
        self
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check one present-or-absent value against this rule
    fn check(&self, field: &str, value: Option<&Value>) -> Result<(), String> {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ => {
                if self.required {
                    return Err(format!("Missing required field: {}", field));
                }
                return Ok(());
            }
        };

        match self.field_type {
            Some(FieldType::String) if !value.is_string() => {
                return Err(format!("Field {} must be a string", field));
            }
            Some(FieldType::Number) if !value.is_number() => {
                return Err(format!("Field {} must be a number", field));
            }
            _ => {}
        }

        if let Some(len) = value_length(value) {
            if let Some(min_length) = self.min_length
                && len < min_length
            {
                return Err(format!("Field {} must be at least {} characters", field, min_length));
            }
            if let Some(max_length) = self.max_length
                && len > max_length
            {
                return Err(format!("Field {} must be at most {} characters", field, max_length));
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min
                && n < min
            {
                return Err(format!("Field {} must be at least {}", field, format_number(min)));
            }
            if let Some(max) = self.max
                && n > max
            {
                return Err(format!("Field {} must be at most {}", field, format_number(max)));
            }
        }

        if let Some(allowed) = &self.enum_values
            && !allowed.iter().any(|a| values_equal(a, value))
        {
            let listed: Vec<String> = allowed.iter().map(display_value).collect();
            return Err(format!("Field {} must be one of: {}", field, listed.join(", ")));
        }

        Ok(())
    }

    fn to_json_schema(&self) -> Value {
        let mut prop = Map::new();
        if let Some(t) = self.field_type {
            prop.insert("type".into(), json!(t.as_str()));
        }
        if let Some(d) = &self.description {
            prop.insert("description".into(), json!(d));
        }
        if let Some(n) = self.min_length {
            prop.insert("minLength".into(), json!(n));
        }
        if let Some(n) = self.max_length {
            prop.insert("maxLength".into(), json!(n));
        }
        if let Some(n) = self.min {
            prop.insert("minimum".into(), json!(n));
        }
        if let Some(n) = self.max {
            prop.insert("maximum".into(), json!(n));
        }
        if let Some(values) = &self.enum_values {
            prop.insert("enum".into(), Value::Array(values.clone()));
        }
        Value::Object(prop)
    }
}

/// Ordered per-field rule set for one tool
///
/// Fields are validated in declaration order and the first failure wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    fields: Vec<(String, FieldRule)>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field; redeclaring a name replaces its rule in place
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Validate an argument map, returning the first violation
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<(), String> {
        debug!(field_count = self.fields.len(), "ToolSchema::validate: called");
        for (name, rule) in &self.fields {
            if let Err(msg) = rule.check(name, arguments.get(name)) {
                debug!(field = %name, %msg, "ToolSchema::validate: rejected");
                return Err(msg);
            }
        }
        Ok(())
    }

    /// Render as a JSON Schema object for `tools/list`
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, rule) in &self.fields {
            properties.insert(name.clone(), rule.to_json_schema());
            if rule.required {
                required.push(json!(name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// JSON Schema for a tool that declares no fields
pub fn empty_json_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Print whole numbers without a trailing `.0`
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("test arguments must be an object"),
        }
    }

    fn question_schema() -> ToolSchema {
        ToolSchema::new()
            .field("question", FieldRule::string().required().min_length(1).max_length(10))
            .field("max_tokens", FieldRule::number().min(1.0).max(4096.0))
            .field("size", FieldRule::string().one_of(["256x256", "512x512", "1024x1024"]))
    }

    #[test]
    fn test_missing_required_field() {
        let err = question_schema().validate(&args(json!({}))).unwrap_err();
        assert_eq!(err, "Missing required field: question");
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = question_schema().validate(&args(json!({"question": null}))).unwrap_err();
        assert_eq!(err, "Missing required field: question");
    }

    #[test]
    fn test_optional_field_absent_passes() {
        assert!(question_schema().validate(&args(json!({"question": "hi"}))).is_ok());
    }

    #[test]
    fn test_type_mismatch_messages() {
        let err = question_schema().validate(&args(json!({"question": 42}))).unwrap_err();
        assert_eq!(err, "Field question must be a string");

        let err = question_schema()
            .validate(&args(json!({"question": "hi", "max_tokens": "many"})))
            .unwrap_err();
        assert_eq!(err, "Field max_tokens must be a number");
    }

    #[test]
    fn test_length_messages() {
        let err = question_schema().validate(&args(json!({"question": ""}))).unwrap_err();
        assert_eq!(err, "Field question must be at least 1 characters");

        let err = question_schema()
            .validate(&args(json!({"question": "abcdefghijk"})))
            .unwrap_err();
        assert_eq!(err, "Field question must be at most 10 characters");
    }

    #[test]
    fn test_numeric_bound_messages() {
        let err = question_schema()
            .validate(&args(json!({"question": "hi", "max_tokens": 0})))
            .unwrap_err();
        assert_eq!(err, "Field max_tokens must be at least 1");

        let err = question_schema()
            .validate(&args(json!({"question": "hi", "max_tokens": 4097})))
            .unwrap_err();
        assert_eq!(err, "Field max_tokens must be at most 4096");
    }

    #[test]
    fn test_enum_lists_all_values() {
        let err = question_schema()
            .validate(&args(json!({"question": "hi", "size": "2048x2048"})))
            .unwrap_err();
        assert_eq!(err, "Field size must be one of: 256x256, 512x512, 1024x1024");
    }

    #[test]
    fn test_first_failure_short_circuits_in_declaration_order() {
        // Both fields are bad; only the first declared is reported
        let err = question_schema()
            .validate(&args(json!({"question": 7, "max_tokens": "x"})))
            .unwrap_err();
        assert_eq!(err, "Field question must be a string");
    }

    #[test]
    fn test_undeclared_fields_unconstrained() {
        let result = question_schema().validate(&args(json!({"question": "hi", "extra": [1, 2, 3]})));
        assert!(result.is_ok());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let schema = ToolSchema::new().field("s", FieldRule::string().max_length(3));
        assert!(schema.validate(&args(json!({"s": "héé"}))).is_ok());
    }

    #[test]
    fn test_redeclared_field_replaces_rule() {
        let schema = ToolSchema::new()
            .field("a", FieldRule::string())
            .field("b", FieldRule::number())
            .field("a", FieldRule::number());
        let names: Vec<&str> = schema.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(schema.rule("a").and_then(|r| r.field_type), Some(FieldType::Number));
    }

    #[test]
    fn test_json_schema_rendering() {
        let rendered = question_schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["question"]));
        assert_eq!(rendered["properties"]["question"]["type"], "string");
        assert_eq!(rendered["properties"]["question"]["maxLength"], 10);
        assert_eq!(rendered["properties"]["max_tokens"]["maximum"], 4096.0);
        assert_eq!(rendered["properties"]["size"]["enum"][1], "512x512");
    }

    #[test]
    fn test_rule_deserializes_from_camel_case() {
        let rule: FieldRule = serde_json::from_value(json!({
            "required": true,
            "type": "string",
            "minLength": 2,
            "enum": ["a", "b"]
        }))
        .unwrap();
        assert!(rule.required);
        assert_eq!(rule.field_type, Some(FieldType::String));
        assert_eq!(rule.min_length, Some(2));
        assert_eq!(rule.enum_values, Some(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
    }

    proptest! {
        #[test]
        fn prop_string_length_boundaries(min in 1usize..20, span in 0usize..20) {
            let max = min + span;
            let schema = ToolSchema::new().field("s", FieldRule::string().min_length(min).max_length(max));
            let at = |n: usize| args(json!({"s": "x".repeat(n)}));

            prop_assert!(schema.validate(&at(min)).is_ok());
            prop_assert!(schema.validate(&at(max)).is_ok());
            prop_assert!(schema.validate(&at(min - 1)).is_err());
            prop_assert!(schema.validate(&at(max + 1)).is_err());
        }

        #[test]
        fn prop_numeric_boundaries(min in -1000i64..1000, span in 0i64..1000) {
            let max = min + span;
            let schema = ToolSchema::new().field("n", FieldRule::number().min(min as f64).max(max as f64));
            let at = |n: i64| args(json!({"n": n}));

            prop_assert!(schema.validate(&at(min)).is_ok());
            prop_assert!(schema.validate(&at(max)).is_ok());
            prop_assert_eq!(
                schema.validate(&at(min - 1)).unwrap_err(),
                format!("Field n must be at least {}", min)
            );
            prop_assert_eq!(
                schema.validate(&at(max + 1)).unwrap_err(),
                format!("Field n must be at most {}", max)
            );
        }

        #[test]
        fn prop_enum_rejects_outsiders(values in proptest::collection::btree_set("[a-z]{1,6}", 1..6), probe in "[A-Z]{1,6}") {
            let listed: Vec<String> = values.iter().cloned().collect();
            let schema = ToolSchema::new().field("e", FieldRule::string().one_of(listed.clone()));

            for v in &listed {
                let input = args(json!({"e": v}));
                prop_assert!(schema.validate(&input).is_ok());
            }
            let err = schema.validate(&args(json!({"e": probe}))).unwrap_err();
            prop_assert_eq!(err, format!("Field e must be one of: {}", listed.join(", ")));
        }

        #[test]
        fn prop_missing_required_names_field(name in "[a-z_]{1,12}") {
            let schema = ToolSchema::new().field(name.clone(), FieldRule::string().required());
            let err = schema.validate(&Map::new()).unwrap_err();
            prop_assert_eq!(err, format!("Missing required field: {}", name));
        }
    }
}
