//! Thin routes for the embedding/vector-store collaborator (§1, §6). The
//! store itself is out of scope for this workspace; `VectorStoreClient` is
//! the seam a real client would plug into, and the default implementation
//! just reports itself unconfigured rather than silently no-oping.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeightedText {
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Weight", default)]
    pub weight: f64,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub texts: Vec<WeightedText>,
    #[serde(default)]
    pub original: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub texts: Vec<WeightedText>,
    #[serde(default)]
    pub n_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub texts: Vec<WeightedText>,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentsRequest {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: String,
}

/// Everything `/generate /search /compare /documents /delete` need from a
/// real embedding/vector store. Out of scope to implement (§1); this trait
/// exists so the HTTP surface is real even when nothing backs it.
pub trait VectorStoreClient: Send + Sync {
    fn generate(&self, texts: &[WeightedText], original: Option<&str>) -> Result<String, ApiError>;
    fn search(&self, texts: &[WeightedText], n_results: u32) -> Result<Vec<Value>, ApiError>;
    fn compare(&self, texts: &[WeightedText], id: &str) -> Result<bool, ApiError>;
    fn documents(&self, limit: u32, offset: u32) -> Result<Vec<Value>, ApiError>;
    fn delete(&self, id: &str) -> Result<(), ApiError>;
    fn export(&self) -> Result<String, ApiError>;
}

/// The only implementation this workspace ships: reports the collaborator
/// as unconfigured instead of returning placeholder data.
pub struct UnconfiguredVectorStore;

fn not_configured() -> ApiError {
    ApiError::VectorStoreNotConfigured
}

impl VectorStoreClient for UnconfiguredVectorStore {
    fn generate(&self, _texts: &[WeightedText], _original: Option<&str>) -> Result<String, ApiError> {
        Err(not_configured())
    }
    fn search(&self, _texts: &[WeightedText], _n_results: u32) -> Result<Vec<Value>, ApiError> {
        Err(not_configured())
    }
    fn compare(&self, _texts: &[WeightedText], _id: &str) -> Result<bool, ApiError> {
        Err(not_configured())
    }
    fn documents(&self, _limit: u32, _offset: u32) -> Result<Vec<Value>, ApiError> {
        Err(not_configured())
    }
    fn delete(&self, _id: &str) -> Result<(), ApiError> {
        Err(not_configured())
    }
    fn export(&self) -> Result<String, ApiError> {
        Err(not_configured())
    }
}

pub async fn generate(
    State(app): State<Arc<AppState>>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    let id = app.vector_store.generate(&body.texts, body.original.as_deref())?;
    Ok(Json(json!({ "id": id })))
}

pub async fn search(
    State(app): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let results = app.vector_store.search(&body.texts, body.n_results.unwrap_or(5))?;
    Ok(Json(results))
}

pub async fn compare(
    State(app): State<Arc<AppState>>,
    Json(body): Json<CompareRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = app.vector_store.compare(&body.texts, &body.id)?;
    Ok(Json(json!({ "result": result })))
}

pub async fn documents(
    State(app): State<Arc<AppState>>,
    Json(body): Json<DocumentsRequest>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = app
        .vector_store
        .documents(body.limit.unwrap_or(50), body.offset.unwrap_or(0))?;
    Ok(Json(docs))
}

pub async fn delete(
    State(app): State<Arc<AppState>>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<Value>, ApiError> {
    app.vector_store.delete(&params.id)?;
    Ok(Json(json!({ "id": params.id })))
}

pub async fn export(State(app): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let message = app.vector_store.export()?;
    Ok(Json(json!({ "message": message })))
}
