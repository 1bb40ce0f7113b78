mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use rest_crud::crud::ResourceOptions;

#[tokio::test]
async fn update_writes_only_whitelisted_fields() -> Result<()> {
    let server = common::server_with("parents", "Parent", ResourceOptions::new(["editable"])).await?;
    let parent = common::seed_parent(&server, "editable", "readonly", None).await?;

    let (status, body) = server
        .update("parents", json!([{ "_id": parent["_id"], "editable": "new", "readonly": "new" }]))
        .await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["models"][0]["editable"], "new");
    assert_eq!(body["models"][0]["readonly"], "readonly");
    Ok(())
}

#[tokio::test]
async fn update_complex_path() -> Result<()> {
    let server = common::server_with("parents", "Parent", ResourceOptions::new(["complex.subdoc"])).await?;
    let parent = common::seed_parent(&server, "editable", "readonly", None).await?;

    let (status, body) = server
        .update("parents", json!([{ "_id": parent["_id"], "complex": { "subdoc": "v" } }]))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["models"][0]["complex"]["subdoc"], "v");

    // Flat dotted keys are accepted too
    let (_, body) = server
        .update("parents", json!([{ "_id": parent["_id"], "complex.subdoc": "flat" }]))
        .await?;
    assert_eq!(body["models"][0]["complex"]["subdoc"], "flat");
    Ok(())
}

#[tokio::test]
async fn update_through_populated_child() -> Result<()> {
    let options = ResourceOptions::new(["editable", "child.subeditable"]).populate(["child"]);
    let server = common::server_with("parents", "Parent", options).await?;
    let child = common::seed_child(&server, "sub-editable", "sub-readonly").await?;
    let parent = common::seed_parent(&server, "editable", "readonly", Some(&child)).await?;

    let (status, body) = server
        .update(
            "parents",
            json!([{
                "_id": parent["_id"],
                "editable": "new editable",
                "child": {
                    "_id": child["_id"],
                    "subeditable": "new sub-editable",
                    "subreadonly": "new sub-readonly"
                }
            }]),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);

    let model = &body["models"][0];
    assert_eq!(model["editable"], "new editable");
    assert_eq!(model["child"]["_id"], child["_id"]);
    assert_eq!(model["child"]["subeditable"], "new sub-editable");
    assert_eq!(model["child"]["subreadonly"], "sub-readonly");
    Ok(())
}

#[tokio::test]
async fn changing_reference_returns_new_child() -> Result<()> {
    let options = ResourceOptions::new(["child", "child.subeditable"]).populate(["child"]);
    let server = common::server_with("parents", "Parent", options).await?;
    let first = common::seed_child(&server, "first", "r1").await?;
    let second = common::seed_child(&server, "second", "r2").await?;
    let parent = common::seed_parent(&server, "editable", "readonly", Some(&first)).await?;

    let (_, body) = server
        .update(
            "parents",
            json!([{ "_id": parent["_id"], "child": { "_id": second["_id"], "subeditable": "ignored" } }]),
        )
        .await?;

    let model = &body["models"][0];
    assert_eq!(model["child"]["_id"], second["_id"]);
    assert_eq!(model["child"]["subeditable"], "second");

    let (_, stored) = server.get_json(&format!("/api/parents/{}", parent["_id"].as_str().unwrap())).await?;
    assert_eq!(stored["data"][0]["child"]["_id"], second["_id"]);
    Ok(())
}

#[tokio::test]
async fn identical_update_is_a_no_op() -> Result<()> {
    let server = common::server_with("parents", "Parent", ResourceOptions::new(["editable"])).await?;
    let parent = common::seed_parent(&server, "same", "readonly", None).await?;

    let (status, body) = server
        .update("parents", json!([{ "_id": parent["_id"], "editable": "same" }]))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"], json!([]));
    assert_eq!(body["models"][0], parent);
    Ok(())
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() -> Result<()> {
    let server = common::demo_server().await?;
    let (status, body) = server
        .update("children", json!([{ "_id": uuid::Uuid::new_v4().to_string(), "subeditable": "x" }]))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, _) = server.update("children", json!([{ "subeditable": "no id" }])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn update_batch_isolates_validation_errors() -> Result<()> {
    let server = common::server_with("parents", "Parent", ResourceOptions::new(["editable", "child"])).await?;
    let a = common::seed_parent(&server, "a", "ra", None).await?;
    let b = common::seed_parent(&server, "b", "rb", None).await?;

    let (status, body) = server
        .update(
            "parents",
            json!([
                { "_id": a["_id"], "child": 42 },
                { "_id": b["_id"], "editable": "b2" }
            ]),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);
    assert_eq!(body["models"][0], Value::Null);
    assert_eq!(body["models"][1]["editable"], "b2");

    let (_, stored) = server.get_json(&format!("/api/parents/{}", a["_id"].as_str().unwrap())).await?;
    assert_eq!(stored["data"][0]["child"], Value::Null);
    Ok(())
}
