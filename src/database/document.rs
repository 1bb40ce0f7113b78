use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::schema::{Schema, ID_FIELD};

/// Identity of a document across kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey {
    pub kind: String,
    pub id: Uuid,
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// A managed instance of a schema kind with change tracking
///
/// Field values live in a nested JSON object keyed by path segment. Reference
/// fields always store the referenced `_id`; when a reference has been
/// populated the full referenced document is kept alongside in `populated`.
#[derive(Debug, Clone)]
pub struct Document {
    schema: Arc<Schema>,
    id: Uuid,
    /// Last persisted body (None until first save)
    original: Option<Map<String, Value>>,
    fields: Map<String, Value>,
    populated: HashMap<String, Document>,
}

impl Document {
    /// Blank document with schema defaults and a fresh id
    pub fn new(schema: Arc<Schema>) -> Self {
        let fields = schema.defaults();
        Self {
            schema,
            id: Uuid::new_v4(),
            original: None,
            fields,
            populated: HashMap::new(),
        }
    }

    /// Document loaded from storage; unknown schema paths default to null
    pub fn from_stored(schema: Arc<Schema>, id: Uuid, body: Map<String, Value>) -> Self {
        let mut fields = schema.defaults();
        merge_into(&mut fields, body);
        fields.remove(ID_FIELD);
        Self {
            schema,
            id,
            original: Some(fields.clone()),
            fields,
            populated: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.schema.kind
    }

    pub fn key(&self) -> DocKey {
        DocKey { kind: self.schema.kind.clone(), id: self.id }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Field values without `_id` or populated references
    pub fn body(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }

    /// Stored value at a dotted path
    pub fn get(&self, path: &str) -> Option<&Value> {
        read_path(&self.fields, path)
    }

    /// Write a value at a dotted path; returns whether the stored value changed.
    /// Writing a different id over a populated reference drops the populated document.
    pub fn set(&mut self, path: &str, value: Value) -> bool {
        if let Some(doc) = self.populated.get(path) {
            if Value::String(doc.id.to_string()) != value {
                self.populated.remove(path);
            }
        }

        if self.get(path) == Some(&value) {
            return false;
        }
        write_path(&mut self.fields, path, value);
        true
    }

    /// Populated document behind a reference field, if any
    pub fn populated(&self, path: &str) -> Option<&Document> {
        self.populated.get(path)
    }

    pub fn populated_mut(&mut self, path: &str) -> Option<&mut Document> {
        self.populated.get_mut(path)
    }

    /// Attach a referenced document; the field keeps holding its id
    pub fn set_populated(&mut self, path: &str, doc: Document) {
        let id = Value::String(doc.id.to_string());
        if self.get(path) != Some(&id) {
            write_path(&mut self.fields, path, id);
        }
        self.populated.insert(path.to_string(), doc);
    }

    /// True for never-saved documents or when the body differs from the last save
    pub fn is_modified(&self) -> bool {
        match &self.original {
            None => true,
            Some(original) => original != &self.fields,
        }
    }

    /// Leaf paths whose value differs from the last save; every leaf when new
    pub fn changes(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        diff_into(&mut out, "", &self.fields, self.original.as_ref());
        out
    }

    /// Replay `changes` from another copy of this document; returns whether anything changed
    pub fn apply_changes(&mut self, changes: &[(String, Value)]) -> bool {
        let mut changed = false;
        for (path, value) in changes {
            changed |= self.set(path, value.clone());
        }
        changed
    }

    /// Record the current body as persisted
    pub fn mark_persisted(&mut self) {
        self.original = Some(self.fields.clone());
    }

    /// Walk populated references from this document
    pub fn at(&self, location: &[String]) -> Option<&Document> {
        match location.split_first() {
            None => Some(self),
            Some((head, rest)) => self.populated.get(head)?.at(rest),
        }
    }

    pub fn at_mut(&mut self, location: &[String]) -> Option<&mut Document> {
        match location.split_first() {
            None => Some(self),
            Some((head, rest)) => self.populated.get_mut(head)?.at_mut(rest),
        }
    }

    /// Response form: body plus `_id`, populated references inlined
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.clone());
        }
        for (path, doc) in &self.populated {
            write_path(&mut out, path, doc.to_json());
        }
        Value::Object(out)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document(kind: {}, id: {}, modified: {})",
            self.kind(),
            self.id,
            self.is_modified()
        )
    }
}

/// Read a dotted path from a nested object
pub fn read_path<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a dotted path into a nested object, creating or replacing intermediates
pub fn write_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                write_path(inner, rest, value);
            }
        }
    }
}

fn diff_into(
    out: &mut Vec<(String, Value)>,
    prefix: &str,
    current: &Map<String, Value>,
    original: Option<&Map<String, Value>>,
) {
    for (key, value) in current {
        let path = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
        let before = original.and_then(|o| o.get(key));
        if before == Some(value) {
            continue;
        }
        match (value, before) {
            (Value::Object(inner), Some(Value::Object(prev))) => diff_into(out, &path, inner, Some(prev)),
            (Value::Object(inner), None) if !inner.is_empty() => diff_into(out, &path, inner, None),
            _ => out.push((path, value.clone())),
        }
    }
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_into(existing, incoming),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::FieldDef;
    use serde_json::json;

    fn parent_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("Parent")
                .field(FieldDef::reference("child", "Child"))
                .field(FieldDef::string("editable"))
                .field(FieldDef::string("complex.subdoc")),
        )
    }

    fn child_schema() -> Arc<Schema> {
        Arc::new(Schema::new("Child").field(FieldDef::string("subeditable")))
    }

    #[test]
    fn set_reports_changes_only() {
        let body = json!({ "editable": "a" }).as_object().cloned().unwrap();
        let mut doc = Document::from_stored(parent_schema(), Uuid::new_v4(), body);
        assert!(!doc.is_modified());
        assert!(!doc.set("editable", json!("a")));
        assert!(!doc.is_modified());
        assert!(doc.set("complex.subdoc", json!("x")));
        assert!(doc.is_modified());
        assert_eq!(doc.get("complex.subdoc"), Some(&json!("x")));
    }

    #[test]
    fn new_documents_are_modified_and_defaulted() {
        let doc = Document::new(parent_schema());
        assert!(doc.is_new());
        assert!(doc.is_modified());
        assert_eq!(doc.get("complex.subdoc"), Some(&Value::Null));
    }

    #[test]
    fn populated_reference_dropped_on_new_id() {
        let child = Document::from_stored(child_schema(), Uuid::new_v4(), Map::new());
        let child_id = child.id();
        let mut parent = Document::from_stored(parent_schema(), Uuid::new_v4(), Map::new());
        parent.set_populated("child", child);
        assert_eq!(parent.get("child"), Some(&json!(child_id.to_string())));

        let json = parent.to_json();
        assert_eq!(json["child"]["_id"], json!(child_id.to_string()));

        let other = Uuid::new_v4().to_string();
        assert!(parent.set("child", json!(other)));
        assert!(parent.populated("child").is_none());
        assert_eq!(parent.to_json()["child"], json!(other));
    }

    #[test]
    fn at_walks_populated_chain() {
        let child = Document::from_stored(child_schema(), Uuid::new_v4(), Map::new());
        let child_id = child.id();
        let mut parent = Document::new(parent_schema());
        parent.set_populated("child", child);
        assert_eq!(parent.at(&["child".to_string()]).map(|d| d.id()), Some(child_id));
        assert!(parent.at(&["missing".to_string()]).is_none());
        assert_eq!(parent.at(&[]).map(|d| d.id()), Some(parent.id()));
    }

    #[test]
    fn changes_list_changed_leaves_and_replay() {
        let body = json!({ "editable": "a", "complex": { "subdoc": "s" } }).as_object().cloned().unwrap();
        let id = Uuid::new_v4();
        let mut first = Document::from_stored(parent_schema(), id, body.clone());
        let mut second = Document::from_stored(parent_schema(), id, body);
        assert!(first.changes().is_empty());

        second.set("complex.subdoc", json!("t"));
        assert_eq!(second.changes(), vec![("complex.subdoc".to_string(), json!("t"))]);

        assert!(first.apply_changes(&second.changes()));
        assert_eq!(first.get("complex.subdoc"), Some(&json!("t")));
        assert_eq!(first.get("editable"), Some(&json!("a")));
        assert!(!first.apply_changes(&second.changes()));
    }
}
