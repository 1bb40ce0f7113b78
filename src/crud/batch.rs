use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::crud::persist::validate_and_save;
use crate::crud::resource::{RequestContext, ResourceDefinition};
use crate::crud::CrudError;
use crate::database::{Document, ID_FIELD};
use crate::error::ValidationError;
use crate::projection::{project, Projectable};

/// Response of a create or update batch; `models[i]` answers input `i`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    pub errors: Vec<ValidationError>,
    pub models: Vec<Option<Value>>,
}

enum Outcome {
    Saved(Value),
    Invalid(Vec<ValidationError>),
}

impl BatchResult {
    fn collect(outcomes: Vec<Outcome>) -> Self {
        let mut result = BatchResult::default();
        for outcome in outcomes {
            match outcome {
                Outcome::Saved(model) => result.models.push(Some(model)),
                Outcome::Invalid(errors) => {
                    result.errors.extend(errors);
                    result.models.push(None);
                }
            }
        }
        result
    }
}

/// Extract the `models` array from a request body.
/// Accepts a JSON-encoded string (the form-post convention) or an inline array.
pub fn parse_models(body: &Value, operation: &str) -> Result<Vec<Value>, CrudError> {
    let decoded = match body.get("models") {
        None | Some(Value::Null) => {
            return Err(CrudError::input(format!(
                "Cannot {}, 'models' parameter does not exist.",
                operation
            )))
        }
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)?,
        Some(other) => other.clone(),
    };

    match decoded {
        Value::Array(models) => Ok(models),
        _ => Err(CrudError::input(format!(
            "Cannot {}, 'models' parameter does not represent a JSON array.",
            operation
        ))),
    }
}

/// Run every instance pipeline to completion, then report the first error in
/// input order. Saves already dispatched by one instance are never cut short
/// by another instance failing.
async fn settle<F, T>(pipelines: impl IntoIterator<Item = F>) -> Result<Vec<T>, CrudError>
where
    F: std::future::Future<Output = Result<T, CrudError>>,
{
    join_all(pipelines).await.into_iter().collect()
}

/// Create one document per instance
pub async fn create(resource: &ResourceDefinition, instances: &[Value]) -> Result<BatchResult, CrudError> {
    let outcomes = settle(instances.iter().map(|inst| create_one(resource, inst))).await?;
    Ok(BatchResult::collect(outcomes))
}

async fn create_one(resource: &ResourceDefinition, inst: &Value) -> Result<Outcome, CrudError> {
    let store = resource.store();
    let mut doc = Document::new(resource.schema().clone());

    let dirty = project(Projectable::Document(&mut doc), inst, resource.editable_fields(), store.registry())?;
    let saved = validate_and_save(store, &mut doc, &dirty).await?;

    if !saved.errors.is_empty() {
        info!("{} validation errors exist on {}", saved.errors.len(), resource.kind());
        return Ok(Outcome::Invalid(saved.errors));
    }

    if saved.num_saved == 0 {
        info!("No fields updated on {}", resource.kind());
    } else {
        info!("Created new {}", resource.kind());
    }
    Ok(Outcome::Saved(doc.to_json()))
}

/// Apply each instance to the stored document named by its `_id`
pub async fn update(
    resource: &ResourceDefinition,
    ctx: &RequestContext,
    instances: &[Value],
) -> Result<BatchResult, CrudError> {
    let populate = resource.populate_fields(ctx);
    let outcomes = settle(
        instances
            .iter()
            .map(|inst| update_one(resource, populate.as_deref(), inst)),
    )
    .await?;
    Ok(BatchResult::collect(outcomes))
}

async fn update_one(
    resource: &ResourceDefinition,
    populate: Option<&[String]>,
    inst: &Value,
) -> Result<Outcome, CrudError> {
    let store = resource.store();
    let id = instance_id(inst).ok_or_else(|| CrudError::input("Cannot update, instance is missing '_id'."))?;
    let id = Uuid::parse_str(id)
        .map_err(|_| CrudError::not_found(format!("{} with ID: {} not found", resource.kind(), id)))?;

    let mut doc = fetch(resource, id, populate).await?;

    let dirty = project(Projectable::Document(&mut doc), inst, resource.editable_fields(), store.registry())?;
    let saved = validate_and_save(store, &mut doc, &dirty).await?;

    if !saved.errors.is_empty() {
        info!(
            "{} validation errors exist on {} with ID: {}",
            saved.errors.len(),
            resource.kind(),
            id
        );
        return Ok(Outcome::Invalid(saved.errors));
    }

    if saved.num_saved == 0 {
        info!("No fields updated on {} with ID: {}", resource.kind(), id);
    } else {
        info!("Updated existing {} with ID: {}", resource.kind(), id);
    }

    // A populated reference whose id changed has been dropped in place; read back
    // so the response carries the newly referenced document.
    if populate.is_some() {
        doc = fetch(resource, id, populate).await?;
    }
    Ok(Outcome::Saved(doc.to_json()))
}

async fn fetch(resource: &ResourceDefinition, id: Uuid, populate: Option<&[String]>) -> Result<Document, CrudError> {
    let store = resource.store();
    let mut doc = store
        .find_one(resource.kind(), id)
        .await?
        .ok_or_else(|| CrudError::not_found(format!("{} with ID: {} not found", resource.kind(), id)))?;
    if let Some(fields) = populate {
        store.populate(&mut doc, fields).await?;
    }
    Ok(doc)
}

/// Remove the document named by each instance's `_id`; one ack per instance
pub async fn destroy(resource: &ResourceDefinition, instances: &[Value]) -> Result<Vec<Value>, CrudError> {
    settle(instances.iter().map(|inst| destroy_one(resource, inst))).await
}

async fn destroy_one(resource: &ResourceDefinition, inst: &Value) -> Result<Value, CrudError> {
    let raw = inst.get(ID_FIELD).cloned().unwrap_or(Value::Null);
    let Some(id) = instance_id(inst).and_then(|s| Uuid::parse_str(s).ok()) else {
        tracing::warn!("Cannot destroy {}: invalid id {}", resource.kind(), raw);
        return Ok(json!({ ID_FIELD: raw, "destroyed": false, "error": "Invalid id" }));
    };

    if resource.store().remove(resource.kind(), id).await? {
        info!("Destroyed {} with ID: {}", resource.kind(), id);
        Ok(json!({ ID_FIELD: raw, "destroyed": true }))
    } else {
        Ok(json!({ ID_FIELD: raw, "destroyed": false, "error": "Not found" }))
    }
}

fn instance_id(inst: &Value) -> Option<&str> {
    inst.get(ID_FIELD).and_then(Value::as_str)
}
