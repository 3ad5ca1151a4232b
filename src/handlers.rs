use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    models::{ApiResponse, HealthResponse},
    service::{Resource, ResourceService},
};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::collections::HashMap;

// --- Handlers ---
//
// Every resource handler is generic over `Resource`; the routes instantiate
// them once per collection (e.g. `list_resources::<Movies>`). Failures are
// returned as `ApiError` and turned into responses in one place; request
// bodies are taken as `Result<Json<_>, JsonRejection>` so that malformed JSON
// goes through the same path.

/// list_resources
///
/// [Public Route] Lists every record of the collection. If the query string
/// names one of the resource's filter fields (e.g. `?movieId=...` on reviews),
/// only matching records are returned; other parameters are ignored.
pub async fn list_resources<R: Resource>(
    State(service): State<ResourceService<R>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<Vec<R::Record>>>, ApiError> {
    let filter = R::FILTER_FIELDS
        .iter()
        .find_map(|field| params.get(*field).map(|value| (*field, value)));

    let records = match filter {
        Some((field, value)) => service.list_by(field, value).await?,
        None => service.list().await?,
    };

    Ok(Json(ApiResponse::success(
        records,
        format!("{} Retrieved", R::PLURAL),
    )))
}

/// get_resource
///
/// [Public Route] Retrieves a single record. The service answers `None` for an
/// unknown id; this handler turns that into a 404.
pub async fn get_resource<R: Resource>(
    State(service): State<ResourceService<R>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<R::Record>>, ApiError> {
    let record = service
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} not found", R::NAME)))?;

    Ok(Json(ApiResponse::success(
        record,
        format!("{} Retrieved", R::NAME),
    )))
}

/// create_resource
///
/// [Authenticated Route] Creates a record and answers 201 with the decrypted
/// record, including its store-assigned id.
pub async fn create_resource<R: Resource>(
    AuthUser { uid, .. }: AuthUser,
    State(service): State<ResourceService<R>>,
    payload: Result<Json<R::Create>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<R::Record>>), ApiError> {
    let Json(payload) = payload?;
    tracing::debug!(%uid, collection = R::COLLECTION, "create requested");
    let record = service.create(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(record, format!("{} Created", R::NAME))),
    ))
}

/// update_resource
///
/// [Admin Route] Applies a partial update. Fields omitted from the body are
/// left as they are.
pub async fn update_resource<R: Resource>(
    AuthUser { uid, .. }: AuthUser,
    State(service): State<ResourceService<R>>,
    Path(id): Path<String>,
    patch: Result<Json<R::Patch>, JsonRejection>,
) -> Result<Json<ApiResponse<R::Record>>, ApiError> {
    let Json(patch) = patch?;
    tracing::debug!(%uid, collection = R::COLLECTION, %id, "update requested");
    let record = service.update(&id, patch).await?;

    Ok(Json(ApiResponse::success(
        record,
        format!("{} Updated", R::NAME),
    )))
}

/// delete_resource
///
/// [Admin Route] Deletes a record; 404 if it does not exist.
pub async fn delete_resource<R: Resource>(
    AuthUser { uid, .. }: AuthUser,
    State(service): State<ResourceService<R>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    tracing::debug!(%uid, collection = R::COLLECTION, %id, "delete requested");
    service.delete(&id).await?;

    Ok(Json(ApiResponse::message(format!("{} Deleted", R::NAME))))
}

/// health
///
/// [Public Route] Liveness probe with process uptime and build version.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
