//! HTTP API Module
//! Mission: Route assembly, response envelope, and error translation

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{create_router, AppState};

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Success envelope: `{success: true, data}`
pub fn success<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Success envelope for list endpoints, with a count field
pub fn success_with_count<T: Serialize>(items: &[T]) -> Json<Value> {
    Json(json!({ "success": true, "count": items.len(), "data": items }))
}

// Handlers that read claims from extensions consume the whole Request, so
// the JSON body has to be pulled out manually.
pub(crate) async fn deserialize_body<T: serde::de::DeserializeOwned>(
    req: axum::extract::Request,
) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .map_err(|_| ApiError::Validation(vec!["Invalid request body".to_string()]))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::Validation(vec![format!("Invalid request body: {}", e)]))
}

/// Like [`deserialize_body`] but an empty body yields the default value
/// (PUT transition endpoints accept an omitted body).
pub(crate) async fn deserialize_body_or_default<T>(
    req: axum::extract::Request,
) -> Result<T, ApiError>
where
    T: serde::de::DeserializeOwned + Default,
{
    let bytes = axum::body::to_bytes(req.into_body(), 1024 * 1024)
        .await
        .map_err(|_| ApiError::Validation(vec!["Invalid request body".to_string()]))?;
    if bytes.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::Validation(vec![format!("Invalid request body: {}", e)]))
}
