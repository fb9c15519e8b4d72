use std::collections::HashSet;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::image;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::image::{CreateImageRequest, ImageResponse, validate_create_image};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/images",
    tag = "Images",
    operation_id = "createImage",
    summary = "Register an uploaded image",
    description = "Records the URL and provider id of an asset uploaded out of band. The upload itself happens against the external provider; this endpoint only stores the reference.",
    request_body = CreateImageRequest,
    responses(
        (status = 201, description = "Image registered", body = ImageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload))]
pub async fn create_image(
    // Any authenticated user may register an image; the extractor enforces it.
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_image(&payload)?;

    let new_image = image::ActiveModel {
        url: Set(payload.url.trim().to_string()),
        provider_id: Set(payload.provider_id.trim().to_string()),
        kind: Set(payload
            .kind
            .map(|k| k.trim().to_string())
            .unwrap_or_else(|| "recipe".to_string())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = new_image.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(ImageResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/images/{id}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Get an image reference by ID",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image reference", body = ImageResponse),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ImageResponse>, AppError> {
    let model = image::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;
    Ok(Json(model.into()))
}

/// Fetch the images behind a banner reference list. Recipe validation calls
/// this and refuses the write when any id is dangling.
pub async fn find_banner_images<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<Vec<image::Model>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let images = image::Entity::find()
        .filter(image::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await?;
    Ok(images)
}

/// IDs in `requested` with no matching fetched image, each reported once in
/// request order.
pub fn missing_image_ids(requested: &[i32], found: &[image::Model]) -> Vec<i32> {
    let present: HashSet<i32> = found.iter().map(|m| m.id).collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .copied()
        .filter(|id| !present.contains(id) && seen.insert(*id))
        .collect()
}
