#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use reqwest::StatusCode;
use serde_json::{json, Value};

use rest_crud::config::AppConfig;
use rest_crud::crud::{Crud, ResourceDefinition, ResourceOptions};
use rest_crud::database::{DocumentStore, MemoryStore};
use rest_crud::{demo, handlers};

/// In-process server on its own port with its own memory store
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<dyn DocumentStore>,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serve `router` on a free port; the server lives as long as the test runtime
    pub async fn start(router: Router, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST/PUT/DELETE with `models` JSON-encoded in a urlencoded form
    pub async fn send_models(&self, method: reqwest::Method, path: &str, models: Value) -> Result<(StatusCode, Value)> {
        let encoded = serde_json::to_string(&models)?;
        let res = self
            .client
            .request(method, self.url(path))
            .form(&[("models", encoded)])
            .send()
            .await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }

    pub async fn create(&self, name: &str, models: Value) -> Result<(StatusCode, Value)> {
        self.send_models(reqwest::Method::POST, &format!("/api/{}/create", name), models).await
    }

    pub async fn update(&self, name: &str, models: Value) -> Result<(StatusCode, Value)> {
        self.send_models(reqwest::Method::PUT, &format!("/api/{}/update", name), models).await
    }

    pub async fn destroy(&self, name: &str, models: Value) -> Result<(StatusCode, Value)> {
        self.send_models(reqwest::Method::DELETE, &format!("/api/{}/destroy", name), models).await
    }
}

pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new(demo::registry()))
}

/// Demo `parents` / `children` resources
pub async fn demo_server() -> Result<TestServer> {
    let config = AppConfig::from_env();
    let store = memory_store();
    let resources = demo::resources(store.clone(), &config.api)?;
    TestServer::start(handlers::app(store.clone(), resources, &config.api), store).await
}

/// One resource named `name` over the demo schemas, with custom options
pub async fn server_with(name: &str, kind: &str, options: ResourceOptions) -> Result<TestServer> {
    let config = AppConfig::from_env();
    let store = memory_store();
    let crud = Crud::new(ResourceDefinition::new(kind, store.clone(), options)?);
    let app = handlers::app(store.clone(), vec![(name.to_string(), crud)], &config.api);
    TestServer::start(app, store).await
}

/// Store a child directly, read-only fields included, and return its JSON
pub async fn seed_child(server: &TestServer, subeditable: &str, subreadonly: &str) -> Result<Value> {
    let schema = server.store.schema("Child")?;
    let mut doc = rest_crud::database::Document::new(schema);
    doc.set("subeditable", json!(subeditable));
    doc.set("subreadonly", json!(subreadonly));
    Ok(server.store.save(&doc).await?.to_json())
}

pub async fn seed_parent(server: &TestServer, editable: &str, readonly: &str, child: Option<&Value>) -> Result<Value> {
    let schema = server.store.schema("Parent")?;
    let mut doc = rest_crud::database::Document::new(schema);
    doc.set("editable", json!(editable));
    doc.set("readonly", json!(readonly));
    if let Some(child) = child {
        doc.set("child", child["_id"].clone());
    }
    Ok(server.store.save(&doc).await?.to_json())
}
