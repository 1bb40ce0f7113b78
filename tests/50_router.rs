mod common;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use rest_crud::config::AppConfig;
use rest_crud::{demo, handlers};

fn app() -> Result<axum::Router> {
    let config = AppConfig::from_env();
    let store = common::memory_store();
    let resources = demo::resources(store.clone(), &config.api)?;
    Ok(handlers::app(store, resources, &config.api))
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    let response = app()?
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await?["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_lists_bound_resources() -> Result<()> {
    let response = app()?
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await?;
    let names: Vec<&str> = body["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names, vec!["parents", "children"]);
    Ok(())
}

#[tokio::test]
async fn create_via_json_body() -> Result<()> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/children/create")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "models": "[{\"subeditable\":\"x\"}]" }).to_string()))?;

    let response = app()?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["models"][0]["subeditable"], "x");
    Ok(())
}

#[tokio::test]
async fn unparseable_json_body_is_bad_request() -> Result<()> {
    let request = Request::builder()
        .method("PUT")
        .uri("/api/parents/update")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))?;

    let response = app()?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await?["code"], "INVALID_JSON");
    Ok(())
}
