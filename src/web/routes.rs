//! API routes

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::AppError;
use crate::models::Item;
use crate::services::{ActivityLog, Interaction, ItemsService, UpdateOutcome};

use super::payload::{self, ItemPayload};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub items: Arc<ItemsService>,
    pub activity: Arc<ActivityLog>,
}

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/items", post(create_item))
        .route("/api/items", get(list_items))
        .route("/api/items/:id", get(get_item))
        .route("/api/items/:id", patch(update_item))
        .route("/api/items/:id", delete(delete_item))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn create_item(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Item>, AppError> {
    let result = match payload::from_multipart(multipart).await {
        Ok(p) => state.items.create(p).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(item) => {
            state
                .activity
                .record(Interaction::Create, Some(&item.id))
                .await;
            Ok(Json(item))
        }
        Err(e) => Err(record_error(&state, e).await),
    }
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    match state.items.list().await {
        Ok(items) => {
            state.activity.record(Interaction::Read, None).await;
            Ok(Json(items))
        }
        Err(e) => Err(record_error(&state, e).await),
    }
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError> {
    match state.items.get(&id).await {
        Ok(item) => {
            state
                .activity
                .record(Interaction::Read, Some(&item.id))
                .await;
            Ok(Json(item))
        }
        Err(e) => Err(record_error(&state, e).await),
    }
}

/// PATCH accepts either a multipart form (when an image is attached) or a
/// plain JSON body; anything else is a malformed-body validation failure.
async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<UpdateOutcome>, AppError> {
    let result = match parse_update_payload(request).await {
        Ok(p) => state.items.update(&id, p).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(outcome) => {
            state.activity.record(Interaction::Update, Some(&id)).await;
            Ok(Json(outcome))
        }
        Err(e) => Err(record_error(&state, e).await),
    }
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    match state.items.delete(&id).await {
        Ok(()) => {
            state.activity.record(Interaction::Delete, Some(&id)).await;
            Ok(Json(json!({ "msg": "Item removed" })))
        }
        Err(e) => Err(record_error(&state, e).await),
    }
}

async fn parse_update_payload(request: Request) -> Result<ItemPayload, AppError> {
    let is_multipart = request
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| malformed_body())?;
        payload::from_multipart(multipart).await
    } else {
        let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|_| malformed_body())?;
        payload::from_json(&body)
    }
}

fn malformed_body() -> AppError {
    AppError::Validation(vec![crate::error::FieldError::new(
        "Malformed request body",
        "body",
    )])
}

async fn record_error(state: &AppState, err: AppError) -> AppError {
    state
        .activity
        .record(Interaction::Error, Some(&err.to_string()))
        .await;
    err
}
