use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{collection, collection_recipe, recipe};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::recipe::ensure_recipe_visible;
use crate::models::collection::{
    CollectionDetail, CollectionResponse, CreateCollectionRequest, validate_create_collection,
    with_recipe, without_recipe,
};
use crate::models::recipe::RecipeThumbnail;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/collections",
    tag = "Collections",
    operation_id = "createCollection",
    summary = "Create a collection",
    request_body = CreateCollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = CollectionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_collection(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCollectionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_collection(&payload)?;

    let new_collection = collection::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        created_by: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let model = new_collection.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(CollectionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/collections",
    tag = "Collections",
    operation_id = "listMyCollections",
    summary = "List the caller's collections",
    responses(
        (status = 200, description = "Collections", body = Vec<CollectionResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_my_collections(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CollectionResponse>>, AppError> {
    let collections = collection::Entity::find()
        .filter(collection::Column::CreatedBy.eq(auth_user.user_id))
        .order_by_desc(collection::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(
        collections.into_iter().map(CollectionResponse::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/collections/{id}",
    tag = "Collections",
    operation_id = "getCollection",
    summary = "Get a collection with its recipes",
    description = "Member recipes come back resolved as thumbnails, in the order they were added. Owner or admin only.",
    params(("id" = i32, Path, description = "Collection ID")),
    responses(
        (status = 200, description = "Collection detail", body = CollectionDetail),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Collection not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_collection(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CollectionDetail>, AppError> {
    let model = find_collection(&state.db, id).await?;
    auth_user.require_owner_or_admin(model.created_by)?;

    let member_ids = member_recipe_ids(&state.db, model.id).await?;
    let recipes = if member_ids.is_empty() {
        Vec::new()
    } else {
        let found = recipe::Entity::find()
            .filter(recipe::Column::Id.is_in(member_ids.clone()))
            .all(&state.db)
            .await?;
        // Keep insertion order; skip members whose recipe has been deleted.
        member_ids
            .iter()
            .filter_map(|id| found.iter().find(|r| r.id == *id))
            .map(RecipeThumbnail::from)
            .collect()
    };

    Ok(Json(CollectionDetail {
        id: model.id,
        name: model.name,
        created_by: model.created_by,
        created_at: model.created_at,
        recipes,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/collections/{id}",
    tag = "Collections",
    operation_id = "deleteCollection",
    summary = "Delete a collection",
    description = "Removes the collection and its membership rows. The recipes themselves are untouched. Owner or admin only.",
    params(("id" = i32, Path, description = "Collection ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Collection not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_collection(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let model = find_collection_for_update(&txn, id).await?;
    auth_user.require_owner_or_admin(model.created_by)?;

    collection_recipe::Entity::delete_many()
        .filter(collection_recipe::Column::CollectionId.eq(model.id))
        .exec(&txn)
        .await?;
    collection::Entity::delete_by_id(model.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/v1/collections/{id}/recipes/{recipe_id}",
    tag = "Collections",
    operation_id = "addRecipeToCollection",
    summary = "Add a recipe to a collection",
    description = "Idempotent: adding a recipe that is already a member changes nothing and still returns 204.",
    params(
        ("id" = i32, Path, description = "Collection ID"),
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe is a member"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Collection or recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, recipe_id))]
pub async fn add_recipe_to_collection(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, recipe_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    // Lock the collection row so concurrent adds of the same recipe cannot
    // both pass the membership check.
    let model = find_collection_for_update(&txn, id).await?;
    auth_user.require_owner_or_admin(model.created_by)?;

    let target = recipe::Entity::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))?;
    // Same rule as the recipe detail endpoint, so a membership write cannot
    // be used to probe or expose someone else's private recipe.
    ensure_recipe_visible(&target, Some(&auth_user))?;

    let members = member_recipe_ids(&txn, model.id).await?;
    if with_recipe(&members, recipe_id).is_some() {
        let row = collection_recipe::ActiveModel {
            collection_id: Set(model.id),
            recipe_id: Set(recipe_id),
            added_at: Set(chrono::Utc::now()),
        };
        row.insert(&txn).await?;
    }
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/collections/{id}/recipes/{recipe_id}",
    tag = "Collections",
    operation_id = "removeRecipeFromCollection",
    summary = "Remove a recipe from a collection",
    description = "Idempotent: removing a recipe that is not a member changes nothing and still returns 204.",
    params(
        ("id" = i32, Path, description = "Collection ID"),
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe is not a member"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Collection not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, recipe_id))]
pub async fn remove_recipe_from_collection(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, recipe_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let model = find_collection_for_update(&txn, id).await?;
    auth_user.require_owner_or_admin(model.created_by)?;

    let members = member_recipe_ids(&txn, model.id).await?;
    if without_recipe(&members, recipe_id).is_some() {
        collection_recipe::Entity::delete_by_id((model.id, recipe_id))
            .exec(&txn)
            .await?;
    }
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_collection<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<collection::Model, AppError> {
    collection::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".into()))
}

async fn find_collection_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<collection::Model, AppError> {
    collection::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Collection not found".into()))
}

/// Member recipe ids in the order they were added.
async fn member_recipe_ids<C: ConnectionTrait>(
    db: &C,
    collection_id: i32,
) -> Result<Vec<i32>, AppError> {
    let ids = collection_recipe::Entity::find()
        .filter(collection_recipe::Column::CollectionId.eq(collection_id))
        .order_by_asc(collection_recipe::Column::AddedAt)
        .select_only()
        .column(collection_recipe::Column::RecipeId)
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids)
}
