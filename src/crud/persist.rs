use futures::future::join_all;

use crate::crud::CrudError;
use crate::database::{Document, DocumentStore};
use crate::error::ValidationError;
use crate::projection::DirtySet;

/// Result of validating and saving one document group
#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub errors: Vec<ValidationError>,
    pub num_saved: usize,
}

/// Validate every dirty document reachable from `root`, then save them all.
///
/// Validation gates saving: one failure and nothing in the group is written.
/// Saves run concurrently and all complete; the first failed save fails the
/// group. Saved documents are marked persisted in place.
pub async fn validate_and_save(
    store: &dyn DocumentStore,
    root: &mut Document,
    dirty: &DirtySet,
) -> Result<SaveOutcome, CrudError> {
    if dirty.is_empty() {
        return Ok(SaveOutcome::default());
    }

    fold_aliases(root, dirty);

    let docs: Vec<&Document> = dirty
        .iter()
        .filter_map(|entry| {
            let doc = root.at(&entry.location);
            if doc.is_none() {
                tracing::warn!("Dirty document {} no longer reachable from {}", entry.key, root.key());
            }
            doc
        })
        .collect();

    let errors: Vec<ValidationError> = join_all(docs.iter().map(|doc| store.validate(doc)))
        .await
        .into_iter()
        .filter_map(Result::err)
        .collect();

    if !errors.is_empty() {
        return Ok(SaveOutcome { errors, num_saved: 0 });
    }

    let results = join_all(docs.iter().map(|doc| store.save(doc))).await;
    let num_saved = results.iter().filter(|r| r.is_ok()).count();
    for result in results {
        if let Err(e) = result {
            tracing::error!("Save failed after {} of {} documents: {}", num_saved, dirty.len(), e);
            return Err(CrudError::Persistence(e));
        }
    }

    for entry in dirty.iter() {
        for location in std::iter::once(&entry.location).chain(&entry.aliases) {
            if let Some(doc) = root.at_mut(location) {
                doc.mark_persisted();
            }
        }
    }

    Ok(SaveOutcome { errors: vec![], num_saved })
}

/// Copies of one document reached through several references each carry
/// part of the writes. Fold them into the saved copy, then mirror the result
/// back so every copy reads the same. Later paths win on conflicting fields.
fn fold_aliases(root: &mut Document, dirty: &DirtySet) {
    for entry in dirty.iter().filter(|e| !e.aliases.is_empty()) {
        for alias in &entry.aliases {
            let Some(changes) = root.at(alias).map(Document::changes) else {
                continue;
            };
            if let Some(primary) = root.at_mut(&entry.location) {
                primary.apply_changes(&changes);
            }
        }

        let Some(merged) = root.at(&entry.location).map(Document::changes) else {
            continue;
        };
        for alias in &entry.aliases {
            if let Some(copy) = root.at_mut(alias) {
                copy.apply_changes(&merged);
            }
        }
    }
}
