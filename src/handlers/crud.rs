use axum::extract::{Path, Query, State};
use serde_json::Value;
use std::collections::HashMap;

use crate::crud::{BatchResult, Crud, ListParams, RequestContext};
use crate::middleware::{ApiResponse, ApiResult};

use super::body::ModelsBody;

type PathParams = Option<Path<HashMap<String, String>>>;

fn context(params: PathParams, query: HashMap<String, String>) -> RequestContext {
    RequestContext::new(params.map(|Path(p)| p).unwrap_or_default(), query)
}

/// GET /api/:name/:id - Single document, `{data: [doc?], total, id}`
pub async fn get(
    State(crud): State<Crud>,
    params: PathParams,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    let ctx = context(params, query);
    let id = ctx.params.get("id").cloned().unwrap_or_default();
    Ok(ApiResponse::success(crud.get(&ctx, &id).await?))
}

/// GET /api/:name - Filtered, sorted page of documents, `{data, total}`
pub async fn list(
    State(crud): State<Crud>,
    params: PathParams,
    Query(list): Query<ListParams>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Value> {
    let ctx = context(params, query);
    Ok(ApiResponse::success(crud.list(&ctx, &list).await?))
}

/// POST /api/:name/create - Create a batch of documents, `{errors, models}`
pub async fn create(State(crud): State<Crud>, ModelsBody(body): ModelsBody) -> ApiResult<BatchResult> {
    Ok(ApiResponse::success(crud.create(&body).await?))
}

/// PUT /api/:name/update - Update a batch of documents by `_id`, `{errors, models}`
pub async fn update(
    State(crud): State<Crud>,
    params: PathParams,
    Query(query): Query<HashMap<String, String>>,
    ModelsBody(body): ModelsBody,
) -> ApiResult<BatchResult> {
    let ctx = context(params, query);
    Ok(ApiResponse::success(crud.update(&ctx, &body).await?))
}

/// DELETE /api/:name/destroy - Remove a batch of documents by `_id`, one ack each
pub async fn destroy(State(crud): State<Crud>, ModelsBody(body): ModelsBody) -> ApiResult<Vec<Value>> {
    Ok(ApiResponse::success(crud.destroy(&body).await?))
}
