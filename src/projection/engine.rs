use serde_json::Value;

use super::error::ConfigurationError;
use super::path::{resolve, FieldPath};
use crate::database::document::{DocKey, Document};
use crate::database::schema::{Schema, SchemaRegistry, ID_FIELD};

/// Target of a projection step
///
/// Only managed documents are written; a plain value (an unpopulated
/// reference id, an embedded object) ends the recursion.
pub enum Projectable<'a> {
    Document(&'a mut Document),
    Plain(&'a Value),
}

/// A document that needs saving, addressed by its chain of populated
/// reference fields from the projection root (empty for the root itself)
///
/// When several populated references hold copies of the same document, the
/// first one reached is `location` and the rest are `aliases`. Their writes
/// must be folded into the first copy before it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyEntry {
    pub key: DocKey,
    pub location: Vec<String>,
    pub aliases: Vec<Vec<String>>,
}

/// Ordered set of documents touched by one projection, unique by kind + id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    entries: Vec<DirtyEntry>,
}

impl DirtySet {
    pub fn insert(&mut self, key: DocKey, location: Vec<String>) {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                if entry.location != location && !entry.aliases.contains(&location) {
                    entry.aliases.push(location);
                }
            }
            None => self.entries.push(DirtyEntry { key, location, aliases: vec![] }),
        }
    }

    pub fn contains(&self, key: &DocKey) -> bool {
        self.entries.iter().any(|e| &e.key == key)
    }

    /// Merge a child projection's entries, re-rooted under `field`
    fn merge_under(&mut self, field: &str, child: DirtySet) {
        for entry in child.entries {
            let reroot = |tail: Vec<String>| {
                let mut location = Vec::with_capacity(tail.len() + 1);
                location.push(field.to_string());
                location.extend(tail);
                location
            };
            self.insert(entry.key.clone(), reroot(entry.location));
            for alias in entry.aliases {
                self.insert(entry.key.clone(), reroot(alias));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirtyEntry> {
        self.entries.iter()
    }
}

/// Whitelisted paths split by how they are written
struct Plan {
    direct: Vec<FieldPath>,
    /// Reference field -> sub-paths on the referenced document, in first-seen order
    references: Vec<(String, Vec<String>)>,
}

impl Plan {
    fn partition(schema: &Schema, paths: &[String]) -> Result<Self, ConfigurationError> {
        let mut plan = Plan { direct: vec![], references: vec![] };

        for raw in paths {
            let path = FieldPath::parse(raw)?;

            if schema.path(path.as_str()).is_some() {
                plan.direct.push(path);
                continue;
            }

            if let Some(rest) = path.rest() {
                if schema.path(path.first()).is_some_and(|f| f.is_reference_like()) {
                    match plan.references.iter_mut().find(|(field, _)| field == path.first()) {
                        Some((_, subpaths)) => subpaths.push(rest.to_string()),
                        None => plan.references.push((path.first().to_string(), vec![rest.to_string()])),
                    }
                    continue;
                }
            }

            tracing::warn!("Field '{}' does not exist on {}", raw, schema.kind);
        }

        Ok(plan)
    }
}

/// Write the whitelisted `paths` of `input` onto `target`.
///
/// Mutates the target and any populated documents reachable through
/// cross-document paths; persists nothing. Returns the documents that must be
/// saved: a document is included when one of its whitelisted values actually
/// changed or it was already modified (including never-saved documents).
pub fn project(
    target: Projectable<'_>,
    input: &Value,
    paths: &[String],
    registry: &SchemaRegistry,
) -> Result<DirtySet, ConfigurationError> {
    if paths.is_empty() {
        return Err(ConfigurationError::NoEditableFields);
    }

    let doc = match target {
        Projectable::Plain(_) => return Ok(DirtySet::default()),
        Projectable::Document(doc) => doc,
    };

    let schema = doc.schema().clone();
    let plan = Plan::partition(&schema, paths)?;
    let was_modified = doc.is_modified();
    let mut modified = false;

    for path in &plan.direct {
        let Some(value) = resolve(path.as_str(), input) else {
            continue;
        };
        let field = path.as_str();

        let Some(def) = schema.path(field) else {
            continue;
        };

        if def.is_reference_like() {
            let target_kind = def.reference.as_deref().ok_or_else(|| ConfigurationError::MissingReference {
                kind: schema.kind.clone(),
                field: field.to_string(),
            })?;
            check_reference_target(registry, field, target_kind)?;

            let Some(new_id) = reference_id(value) else {
                tracing::debug!("Reference {}.{} supplied without an _id; skipped", schema.kind, field);
                continue;
            };

            let populated_id = doc.populated(field).map(|d| Value::String(d.id().to_string()));
            match populated_id {
                // Unchanged populated reference: nested writes happen through the cross-document paths
                Some(current) if current == new_id => continue,
                Some(_) => {
                    doc.set(field, new_id);
                    modified = true;
                }
                None => modified |= doc.set(field, new_id),
            }
        } else {
            modified |= doc.set(field, value.clone());
        }
    }

    let mut dirty = DirtySet::default();
    if modified || was_modified {
        dirty.insert(doc.key(), vec![]);
    }

    for (field, subpaths) in &plan.references {
        let target_kind = schema
            .path(field)
            .and_then(|f| f.reference.as_deref())
            .ok_or_else(|| ConfigurationError::MissingReference {
                kind: schema.kind.clone(),
                field: field.clone(),
            })?;
        check_reference_target(registry, field, target_kind)?;

        let sub_input = match input.get(field) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };

        let child_dirty = if doc.populated(field).is_some() {
            match doc.populated_mut(field) {
                Some(child) => project(Projectable::Document(child), sub_input, subpaths, registry)?,
                None => continue,
            }
        } else {
            match doc.get(field) {
                Some(v) if !v.is_null() => project(Projectable::Plain(v), sub_input, subpaths, registry)?,
                _ => continue,
            }
        };

        dirty.merge_under(field, child_dirty);
    }

    Ok(dirty)
}

fn check_reference_target(registry: &SchemaRegistry, field: &str, target: &str) -> Result<(), ConfigurationError> {
    match registry.get(target) {
        None => Err(ConfigurationError::UnknownReferenceKind {
            field: field.to_string(),
            target: target.to_string(),
        }),
        Some(schema) if !schema.id => Err(ConfigurationError::ReferenceWithoutId(target.to_string())),
        Some(_) => Ok(()),
    }
}

/// Normalize a supplied reference value to the id it names.
/// Objects contribute their `_id`; an object without one names nothing.
fn reference_id(value: &Value) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(ID_FIELD).cloned(),
        other => Some(other.clone()),
    }
}
