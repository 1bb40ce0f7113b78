use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header,
    Form, Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ApiError;

/// Write request body, accepted as JSON or as a urlencoded form.
/// Form fields become string members, so `models` arrives JSON-encoded.
#[derive(Debug)]
pub struct ModelsBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for ModelsBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            let map: Map<String, Value> = fields.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            Ok(ModelsBody(Value::Object(map)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| ApiError::invalid_json(e.body_text()))?;
            Ok(ModelsBody(value))
        }
    }
}
