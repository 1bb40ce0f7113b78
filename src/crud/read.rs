use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::crud::resource::{RequestContext, ResourceDefinition};
use crate::crud::CrudError;
use crate::database::Document;
use crate::filter::filter_order::FilterOrder;
use crate::filter::{Filter, FilterData};

/// Query string of a list request
///
/// `filter` and `sort` arrive JSON-encoded:
/// `filter={"logic":"and","filters":[{"field":"editable","operator":"eq","value":"x"}]}`,
/// `sort=[{"field":"editable","dir":"desc"}]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub skip: Option<String>,
    pub take: Option<String>,
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

/// Effective skip/limit after applying the page-size allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub skip: u64,
    pub limit: u64,
}

impl Paging {
    /// `take` outside `sizes` falls back to `default`; `skip` is rounded down
    /// to the start of its page. Unparseable numbers are ignored.
    pub fn resolve(params: &ListParams, sizes: &[u64], default: u64) -> Self {
        let limit = parse_count(params.take.as_deref())
            .filter(|take| sizes.contains(take))
            .unwrap_or(default);

        let skip = match parse_count(params.skip.as_deref()) {
            Some(skip) if limit > 0 => skip - skip % limit,
            _ => 0,
        };

        Paging { skip, limit }
    }
}

fn parse_count(raw: Option<&str>) -> Option<u64> {
    let raw = raw?.trim();
    match raw.parse::<i64>() {
        Ok(n) => Some(n.max(0) as u64),
        Err(_) => {
            tracing::debug!("Ignoring non-numeric paging value '{}'", raw);
            None
        }
    }
}

/// Build the list query: foreign keys as base, then the client filter and sort
pub fn build_filter(resource: &ResourceDefinition, ctx: &RequestContext, params: &ListParams) -> Result<Filter, CrudError> {
    let mut filter = Filter::new(resource.kind())?.base(resource.base_where(ctx))?;

    if let Some(raw) = params.filter.as_deref().filter(|s| !s.trim().is_empty()) {
        let data: FilterData = serde_json::from_str(raw)?;
        filter = filter.assign(data)?;
    }

    if let Some(raw) = params.sort.as_deref().filter(|s| !s.trim().is_empty()) {
        let value: Value = serde_json::from_str(raw)?;
        filter = filter.sort(FilterOrder::validate_and_parse(&value)?)?;
    }

    Ok(filter)
}

/// Page of documents plus the unpaged total: `{data, total}`
pub async fn list(resource: &ResourceDefinition, ctx: &RequestContext, params: &ListParams) -> Result<Value, CrudError> {
    let store = resource.store();
    let filter = build_filter(resource, ctx, params)?;
    let options = resource.options();
    let paging = Paging::resolve(params, &options.page_sizes, options.default_page_size);

    let total = store.count(&filter).await?;

    let filter = filter.skip(paging.skip).limit(paging.limit);
    let mut docs = store.find(&filter).await?;
    populate_all(resource, ctx, &mut docs).await?;

    tracing::debug!(
        "Listed {} of {} {} (skip {}, take {})",
        docs.len(),
        total,
        resource.kind(),
        paging.skip,
        paging.limit
    );

    Ok(json!({
        "data": docs.iter().map(Document::to_json).collect::<Vec<_>>(),
        "total": total,
    }))
}

/// Single document by id: `{data: [doc?], total, id}`.
/// Unknown or malformed ids give an empty result, never an error.
pub async fn get(resource: &ResourceDefinition, ctx: &RequestContext, id: &str) -> Result<Value, CrudError> {
    let Ok(id) = Uuid::parse_str(id) else {
        return Ok(json!({ "data": [], "total": 0, "id": null }));
    };

    let mut docs: Vec<Document> = resource
        .store()
        .find_one(resource.kind(), id)
        .await?
        .into_iter()
        .collect();
    populate_all(resource, ctx, &mut docs).await?;

    Ok(json!({
        "data": docs.iter().map(Document::to_json).collect::<Vec<_>>(),
        "total": docs.len(),
        "id": id.to_string(),
    }))
}

async fn populate_all(resource: &ResourceDefinition, ctx: &RequestContext, docs: &mut [Document]) -> Result<(), CrudError> {
    let Some(fields) = resource.populate_fields(ctx) else {
        return Ok(());
    };
    let store = resource.store();
    try_join_all(docs.iter_mut().map(|doc| store.populate(doc, &fields))).await?;
    Ok(())
}
