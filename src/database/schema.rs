use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ValidationError;

/// Name of the identity field on every document
pub const ID_FIELD: &str = "_id";

/// Storage type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Holds the `_id` of a document of another kind
    Reference,
    Object,
    Any,
}

impl FieldType {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::Any, _) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Reference, Value::String(s)) => uuid::Uuid::parse_str(s).is_ok(),
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Reference => "reference id",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }
}

/// A single schema path, keyed by its full dotted name (`complex.subdoc`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    /// Target kind for reference fields
    pub reference: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            default: None,
            reference: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn reference(name: impl Into<String>, kind: impl Into<String>) -> Self {
        let mut field = Self::new(name, FieldType::Reference);
        field.reference = Some(kind.into());
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Declared as a reference, with or without a target kind.
    /// Paths through such a field address the referenced document.
    pub fn is_reference_like(&self) -> bool {
        self.field_type == FieldType::Reference || self.is_reference()
    }
}

/// Field layout for one document kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub kind: String,
    fields: Vec<FieldDef>,
    /// Whether documents of this kind carry an `_id`
    pub id: bool,
}

impl Schema {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Vec::new(),
            id: true,
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    /// Documents of this kind have no identity and cannot be referenced
    pub fn without_id(mut self) -> Self {
        self.id = false;
        self
    }

    pub fn path(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Blank field values for a new document: every path set to its default or null
    pub fn defaults(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for field in &self.fields {
            let value = field.default.clone().unwrap_or(Value::Null);
            crate::database::document::write_path(&mut out, &field.name, value);
        }
        out
    }

    /// Check types and required fields of a document body
    pub fn validate(&self, id: Option<&str>, body: &Map<String, Value>) -> Result<(), ValidationError> {
        let mut errors = HashMap::new();
        for field in &self.fields {
            let value = crate::database::document::read_path(body, &field.name);
            match value {
                None | Some(Value::Null) => {
                    if field.required {
                        errors.insert(field.name.clone(), format!("Path `{}` is required.", field.name));
                    }
                }
                Some(v) if !field.field_type.accepts(v) => {
                    errors.insert(
                        field.name.clone(),
                        format!("Cast to {} failed for value {} at path `{}`", field.field_type.describe(), v, field.name),
                    );
                }
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(&self.kind, id, errors))
        }
    }
}

/// Explicit kind -> schema registry, owned by a store and shared by handle
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, schema: Schema) -> Self {
        tracing::debug!("Registered schema '{}' with {} fields", schema.kind, schema.fields.len());
        self.schemas.insert(schema.kind.clone(), Arc::new(schema));
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<Schema>> {
        self.schemas.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child() -> Schema {
        Schema::new("Child")
            .field(FieldDef::string("subeditable").required())
            .field(FieldDef::string("subreadonly"))
    }

    #[test]
    fn reference_like_covers_untargeted_references() {
        assert!(FieldDef::reference("child", "Child").is_reference_like());
        let loose = FieldDef::new("link", FieldType::Reference);
        assert!(loose.is_reference_like());
        assert!(!loose.is_reference());
        assert!(!FieldDef::string("editable").is_reference_like());
    }

    #[test]
    fn defaults_fill_nested_paths_with_null() {
        let schema = Schema::new("Parent")
            .field(FieldDef::string("editable"))
            .field(FieldDef::string("complex.subdoc"))
            .field(FieldDef::number("count").with_default(0));

        let defaults = schema.defaults();
        assert_eq!(Value::Object(defaults), json!({
            "editable": null,
            "complex": { "subdoc": null },
            "count": 0
        }));
    }

    #[test]
    fn validate_reports_required_and_type_errors() {
        let schema = child();
        let body = json!({ "subeditable": null, "subreadonly": 5 });
        let err = schema.validate(Some("abc"), body.as_object().unwrap()).unwrap_err();
        assert_eq!(err.kind, "Child");
        assert!(err.errors.contains_key("subeditable"));
        assert!(err.errors.contains_key("subreadonly"));
    }

    #[test]
    fn reference_fields_must_hold_uuids() {
        let schema = Schema::new("Parent").field(FieldDef::reference("child", "Child"));
        let bad = json!({ "child": "not-an-id" });
        assert!(schema.validate(None, bad.as_object().unwrap()).is_err());
        let good = json!({ "child": uuid::Uuid::new_v4().to_string() });
        assert!(schema.validate(None, good.as_object().unwrap()).is_ok());
    }

    #[test]
    fn registry_lookup() {
        let registry = SchemaRegistry::new().register(child());
        assert!(registry.get("Child").is_some());
        assert!(registry.get("Parent").is_none());
    }
}
