use std::collections::{BTreeSet, HashMap};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{
    image, rating, recipe, recipe_banner, recipe_ingredient, recipe_step, recipe_tag, saved_recipe,
};
use crate::error::{AppError, ErrorBody, FieldError};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::handlers::image::{find_banner_images, missing_image_ids};
use crate::models::image::ImageEditView;
use crate::models::recipe::*;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/recipes",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Create a new recipe",
    description = "Creates a recipe with its banners, ingredients, method steps, and tags in one transaction. Banners must reference 1-4 existing images; the first banner's URL becomes the recipe's display image. Validation reports every offending field.",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeDetail),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = validate_create_recipe(&payload);

    let images = find_banner_images(&state.db, &payload.banners).await?;
    let missing = missing_image_ids(&payload.banners, &images);
    if !missing.is_empty() {
        errors.push(FieldError::new(
            "banners",
            format!("No such image: {}", join_ids(&missing)),
        ));
    }
    if !errors.is_empty() {
        return Err(AppError::Invalid(errors));
    }

    let by_id: HashMap<i32, image::Model> = images.into_iter().map(|m| (m.id, m)).collect();
    let image_url = payload
        .banners
        .first()
        .and_then(|id| by_id.get(id))
        .map(|m| m.url.clone())
        .unwrap_or_default();

    let now = chrono::Utc::now();
    let txn = state.db.begin().await?;

    let new_recipe = recipe::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        status: Set(payload.status.unwrap_or(true)),
        category: Set(normalize_category(&payload.category)),
        servings: Set(payload.servings),
        time: Set(payload.time),
        image_url: Set(image_url),
        rating_avg: Set(0.0),
        rating_total: Set(0),
        created_by: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = new_recipe.insert(&txn).await?;

    insert_children(
        &txn,
        model.id,
        &payload.banners,
        &payload.ingredients,
        &payload.methods,
        &payload.tags,
    )
    .await?;

    txn.commit().await?;

    let parts = RecipeParts {
        banners: payload
            .banners
            .iter()
            .filter_map(|id| by_id.get(id))
            .map(ImageEditView::from)
            .collect(),
        ingredients: payload.ingredients,
        methods: payload.methods,
        tags: dedup_tags(&payload.tags),
    };

    Ok((
        StatusCode::CREATED,
        Json(detail_view(model, parts, Some(auth_user.user_id), false)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List public recipes as thumbnails",
    description = "`sort=new` (default) orders by creation time descending; `sort=top` by rating total, then rating average, both descending. Private recipes are never listed.",
    params(ListRecipesQuery),
    responses(
        (status = 200, description = "Recipe thumbnails", body = Vec<RecipeThumbnail>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<ListRecipesQuery>,
) -> Result<Json<Vec<RecipeThumbnail>>, AppError> {
    let mut select = recipe::Entity::find().filter(recipe::Column::Status.eq(true));

    select = match query.sort.as_deref().unwrap_or("new") {
        "new" => select.order_by_desc(recipe::Column::CreatedAt),
        "top" => select
            .order_by_desc(recipe::Column::RatingTotal)
            .order_by_desc(recipe::Column::RatingAvg),
        _ => {
            return Err(AppError::Validation("sort must be one of: new, top".into()));
        }
    };

    let recipes = select.all(&state.db).await?;
    Ok(Json(recipes.iter().map(RecipeThumbnail::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/search",
    tag = "Recipes",
    operation_id = "searchRecipes",
    summary = "Full-text recipe search",
    description = "Ranks public recipes by weighted term relevance over name, category, tags, ingredient names, and description. The score only orders the results; it is never returned.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Ranked search results", body = Vec<RecipeSearchResult>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(q = %query.q))]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<RecipeSearchResult>>, AppError> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(AppError::Validation("q is required".into()));
    }

    let candidates = recipe::Entity::find()
        .filter(recipe::Column::Status.eq(true))
        .all(&state.db)
        .await?;
    let ids: Vec<i32> = candidates.iter().map(|m| m.id).collect();

    let mut tags_by: HashMap<i32, Vec<String>> = HashMap::new();
    let mut ingredients_by: HashMap<i32, Vec<String>> = HashMap::new();
    if !ids.is_empty() {
        for row in recipe_tag::Entity::find()
            .filter(recipe_tag::Column::RecipeId.is_in(ids.clone()))
            .all(&state.db)
            .await?
        {
            tags_by.entry(row.recipe_id).or_default().push(row.tag);
        }
        for row in recipe_ingredient::Entity::find()
            .filter(recipe_ingredient::Column::RecipeId.is_in(ids))
            .all(&state.db)
            .await?
        {
            ingredients_by
                .entry(row.recipe_id)
                .or_default()
                .push(row.name);
        }
    }

    let empty: Vec<String> = Vec::new();
    let mut scored: Vec<(u32, &recipe::Model)> = candidates
        .iter()
        .filter_map(|m| {
            let score = relevance_score(
                q,
                &m.name,
                &m.category,
                &m.description,
                tags_by.get(&m.id).unwrap_or(&empty),
                ingredients_by.get(&m.id).unwrap_or(&empty),
            );
            (score > 0).then_some((score, m))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));

    Ok(Json(
        scored
            .into_iter()
            .map(|(_, m)| RecipeSearchResult::from(m))
            .collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/categories",
    tag = "Recipes",
    operation_id = "listCategories",
    summary = "Category rollup over public recipes",
    description = "Groups publicly visible, categorized recipes by category into `{name, total, image_url}` entries, ordered by member count. `limit` truncates the result when supplied.",
    params(CategoriesQuery),
    responses(
        (status = 200, description = "Category summaries", body = Vec<CategorySummary>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoriesQuery>,
) -> Result<Json<Vec<CategorySummary>>, AppError> {
    let rows: Vec<(String, String)> = recipe::Entity::find()
        .filter(recipe::Column::Status.eq(true))
        .order_by_asc(recipe::Column::Id)
        .select_only()
        .column(recipe::Column::Category)
        .column(recipe::Column::ImageUrl)
        .into_tuple::<(String, String)>()
        .all(&state.db)
        .await?;

    Ok(Json(rollup_categories(rows, query.limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/category/{category}",
    tag = "Recipes",
    operation_id = "recipesByCategory",
    summary = "Public recipes in a category",
    params(("category" = String, Path, description = "Category name (case-insensitive)")),
    responses(
        (status = 200, description = "Recipe thumbnails", body = Vec<RecipeThumbnail>),
    ),
)]
#[instrument(skip(state), fields(category = %category))]
pub async fn recipes_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<RecipeThumbnail>>, AppError> {
    let recipes = recipe::Entity::find()
        .filter(recipe::Column::Status.eq(true))
        .filter(recipe::Column::Category.eq(normalize_category(&category)))
        .order_by_desc(recipe::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(recipes.iter().map(RecipeThumbnail::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe's detail view",
    description = "Full view with resolved banners, ingredients, method steps, and tags, plus `saved_by_user` and `created_by_user` flags for authenticated callers. Private recipes return 404 to anyone but their owner or an admin.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe detail", body = RecipeDetail),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_recipe(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeDetail>, AppError> {
    let model = find_recipe(&state.db, id).await?;
    ensure_recipe_visible(&model, auth_user.as_ref())?;

    let parts = load_parts(&state.db, model.id).await?;
    let viewer_id = auth_user.as_ref().map(|u| u.user_id);
    let saved = match viewer_id {
        Some(uid) => is_saved(&state.db, uid, model.id).await?,
        None => false,
    };

    Ok(Json(detail_view(model, parts, viewer_id, saved)))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipes/{id}/edit",
    tag = "Recipes",
    operation_id = "getRecipeEdit",
    summary = "Get a recipe's edit payload",
    description = "Full editable object with banners expanded to `{id, url}` pairs and ownership/audit fields stripped, so the client can resubmit it as-is. Owner or admin only.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Edit payload", body = RecipeEditView),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn get_recipe_edit(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RecipeEditView>, AppError> {
    let model = find_recipe(&state.db, id).await?;
    auth_user.require_owner_or_admin(model.created_by)?;

    let parts = load_parts(&state.db, model.id).await?;
    Ok(Json(edit_view(model, parts)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/recipes/{id}",
    tag = "Recipes",
    operation_id = "updateRecipe",
    summary = "Update a recipe",
    description = "PATCH semantics: only provided fields change; provided child lists (banners, tags, ingredients, methods) are replaced wholesale. New banners must all exist and re-derive the display image. Owner or admin only.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeDetail),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn update_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRecipeRequest>,
) -> Result<Json<RecipeDetail>, AppError> {
    let mut errors = validate_update_recipe(&payload);

    if payload == UpdateRecipeRequest::default() {
        let existing = find_recipe(&state.db, id).await?;
        auth_user.require_owner_or_admin(existing.created_by)?;
        let parts = load_parts(&state.db, existing.id).await?;
        let saved = is_saved(&state.db, auth_user.user_id, existing.id).await?;
        return Ok(Json(detail_view(
            existing,
            parts,
            Some(auth_user.user_id),
            saved,
        )));
    }

    let txn = state.db.begin().await?;
    let existing = find_recipe_for_update(&txn, id).await?;
    auth_user.require_owner_or_admin(existing.created_by)?;

    let mut image_url: Option<String> = None;
    if let Some(ref banners) = payload.banners
        && errors.iter().all(|e| e.field != "banners")
    {
        let images = find_banner_images(&txn, banners).await?;
        let missing = missing_image_ids(banners, &images);
        if missing.is_empty() {
            let by_id: HashMap<i32, image::Model> =
                images.into_iter().map(|m| (m.id, m)).collect();
            image_url = Some(
                banners
                    .first()
                    .and_then(|id| by_id.get(id))
                    .map(|m| m.url.clone())
                    .unwrap_or_default(),
            );
        } else {
            errors.push(FieldError::new(
                "banners",
                format!("No such image: {}", join_ids(&missing)),
            ));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Invalid(errors));
    }

    let recipe_id = existing.id;
    let mut active: recipe::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(ref category) = payload.category {
        active.category = Set(normalize_category(category));
    }
    if let Some(servings) = payload.servings {
        active.servings = Set(servings);
    }
    if let Some(time) = payload.time {
        active.time = Set(time);
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(url) = image_url {
        active.image_url = Set(url);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&txn).await?;

    if let Some(ref banners) = payload.banners {
        recipe_banner::Entity::delete_many()
            .filter(recipe_banner::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_banner_rows(&txn, recipe_id, banners).await?;
    }
    if let Some(ref tags) = payload.tags {
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_tag_rows(&txn, recipe_id, tags).await?;
    }
    if let Some(ref ingredients) = payload.ingredients {
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_ingredient_rows(&txn, recipe_id, ingredients).await?;
    }
    if let Some(ref methods) = payload.methods {
        recipe_step::Entity::delete_many()
            .filter(recipe_step::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;
        insert_step_rows(&txn, recipe_id, methods).await?;
    }

    let parts = load_parts(&txn, recipe_id).await?;
    let saved = is_saved(&txn, auth_user.user_id, recipe_id).await?;
    txn.commit().await?;

    Ok(Json(detail_view(
        model,
        parts,
        Some(auth_user.user_id),
        saved,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/ratings",
    tag = "Ratings",
    operation_id = "rateRecipe",
    summary = "Rate a recipe",
    description = "Records the caller's rating (1-5). A repeat submission updates the existing rating instead of adding a second one. The stored rollup changes only when the owner refreshes it.",
    params(("id" = i32, Path, description = "Recipe ID")),
    request_body = RateRecipeRequest,
    responses(
        (status = 201, description = "Rating created", body = RatingResponse),
        (status = 200, description = "Existing rating updated", body = RatingResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id))]
pub async fn rate_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<RateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_rate_recipe(&payload)?;

    let txn = state.db.begin().await?;
    // Lock the recipe row so rating writes serialize with rollup refreshes.
    let recipe = find_recipe_for_update(&txn, id).await?;
    ensure_recipe_visible(&recipe, Some(&auth_user))?;

    let existing = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe.id))
        .filter(rating::Column::UserId.eq(auth_user.user_id))
        .one(&txn)
        .await?;

    let (model, created) = match existing {
        Some(r) => {
            let mut active: rating::ActiveModel = r.into();
            active.rate = Set(payload.rate);
            (active.update(&txn).await?, false)
        }
        None => {
            let new_rating = rating::ActiveModel {
                recipe_id: Set(recipe.id),
                user_id: Set(auth_user.user_id),
                rate: Set(payload.rate),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            };
            (new_rating.insert(&txn).await?, true)
        }
    };
    txn.commit().await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(RatingResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/recipes/{id}/ratings/refresh",
    tag = "Ratings",
    operation_id = "refreshRating",
    summary = "Recompute a recipe's rating rollup",
    description = "Aggregates all rating rows of the recipe into `{avg, total}` and persists the summary. Zero ratings reset it to `{0, 0}`. Owner or admin only.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recomputed summary", body = RatingSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn refresh_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RatingSummary>, AppError> {
    let txn = state.db.begin().await?;
    let recipe = find_recipe_for_update(&txn, id).await?;
    auth_user.require_owner_or_admin(recipe.created_by)?;

    let rates: Vec<i32> = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe.id))
        .select_only()
        .column(rating::Column::Rate)
        .into_tuple::<i32>()
        .all(&txn)
        .await?;
    let summary = summarize_ratings(&rates);

    let mut active: recipe::ActiveModel = recipe.into();
    active.rating_avg = Set(summary.avg);
    active.rating_total = Set(summary.total);
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(summary))
}

#[utoipa::path(
    put,
    path = "/api/v1/recipes/{id}/save",
    tag = "Recipes",
    operation_id = "saveRecipe",
    summary = "Save a recipe to the caller's list",
    description = "Idempotent: saving an already-saved recipe is a no-op.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Saved"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn save_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let recipe = find_recipe(&state.db, id).await?;
    ensure_recipe_visible(&recipe, Some(&auth_user))?;

    let row = saved_recipe::ActiveModel {
        user_id: Set(auth_user.user_id),
        recipe_id: Set(id),
        saved_at: Set(chrono::Utc::now()),
    };
    let result = saved_recipe::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                saved_recipe::Column::UserId,
                saved_recipe::Column::RecipeId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await;
    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/recipes/{id}/save",
    tag = "Recipes",
    operation_id = "unsaveRecipe",
    summary = "Remove a recipe from the caller's saved list",
    description = "Idempotent: removing a recipe that is not saved is a no-op.",
    params(("id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn unsave_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    find_recipe(&state.db, id).await?;

    saved_recipe::Entity::delete_many()
        .filter(saved_recipe::Column::UserId.eq(auth_user.user_id))
        .filter(saved_recipe::Column::RecipeId.eq(id))
        .exec(&state.db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn find_recipe<C: ConnectionTrait>(db: &C, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

/// Visibility rule for private recipes: everyone sees a public recipe, only
/// the owner or an admin sees a private one. Fails with 404 rather than 403
/// so private recipe ids cannot be probed, from any endpoint that accepts a
/// recipe id.
pub(crate) fn ensure_recipe_visible(
    recipe: &recipe::Model,
    viewer: Option<&AuthUser>,
) -> Result<(), AppError> {
    if recipe.status {
        return Ok(());
    }
    let viewer = viewer.ok_or_else(|| AppError::NotFound("Recipe not found".into()))?;
    viewer
        .require_owner_or_admin(recipe.created_by)
        .map_err(|_| AppError::NotFound("Recipe not found".into()))
}

async fn find_recipe_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

async fn is_saved<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    recipe_id: i32,
) -> Result<bool, AppError> {
    Ok(saved_recipe::Entity::find_by_id((user_id, recipe_id))
        .one(db)
        .await?
        .is_some())
}

/// Resolve a recipe's child rows before projection, preserving stored order.
pub async fn load_parts<C: ConnectionTrait>(db: &C, recipe_id: i32) -> Result<RecipeParts, AppError> {
    let banner_rows = recipe_banner::Entity::find()
        .filter(recipe_banner::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_banner::Column::Position)
        .all(db)
        .await?;
    let image_ids: Vec<i32> = banner_rows.iter().map(|b| b.image_id).collect();
    let images = find_banner_images(db, &image_ids).await?;
    let by_id: HashMap<i32, image::Model> = images.into_iter().map(|m| (m.id, m)).collect();
    let banners = banner_rows
        .iter()
        .filter_map(|b| by_id.get(&b.image_id))
        .map(ImageEditView::from)
        .collect();

    let ingredients = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_ingredient::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(|m| Ingredient {
            quantity: m.quantity,
            name: m.name,
        })
        .collect();

    let methods = recipe_step::Entity::find()
        .filter(recipe_step::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_step::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.text)
        .collect();

    let tags = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_tag::Column::Tag)
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.tag)
        .collect();

    Ok(RecipeParts {
        banners,
        ingredients,
        methods,
        tags,
    })
}

async fn insert_children(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    banners: &[i32],
    ingredients: &[Ingredient],
    methods: &[String],
    tags: &[String],
) -> Result<(), AppError> {
    insert_banner_rows(txn, recipe_id, banners).await?;
    insert_ingredient_rows(txn, recipe_id, ingredients).await?;
    insert_step_rows(txn, recipe_id, methods).await?;
    insert_tag_rows(txn, recipe_id, tags).await?;
    Ok(())
}

async fn insert_banner_rows(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    banners: &[i32],
) -> Result<(), AppError> {
    if banners.is_empty() {
        return Ok(());
    }
    let rows: Vec<recipe_banner::ActiveModel> = banners
        .iter()
        .enumerate()
        .map(|(i, &image_id)| recipe_banner::ActiveModel {
            recipe_id: Set(recipe_id),
            position: Set(i as i32),
            image_id: Set(image_id),
        })
        .collect();
    recipe_banner::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

async fn insert_ingredient_rows(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    ingredients: &[Ingredient],
) -> Result<(), AppError> {
    if ingredients.is_empty() {
        return Ok(());
    }
    let rows: Vec<recipe_ingredient::ActiveModel> = ingredients
        .iter()
        .enumerate()
        .map(|(i, ing)| {
            Ok(recipe_ingredient::ActiveModel {
                recipe_id: Set(recipe_id),
                position: Set(list_position(i)?),
                quantity: Set(ing.quantity.clone()),
                name: Set(ing.name.clone()),
            })
        })
        .collect::<Result<_, AppError>>()?;
    recipe_ingredient::Entity::insert_many(rows)
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_step_rows(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    methods: &[String],
) -> Result<(), AppError> {
    if methods.is_empty() {
        return Ok(());
    }
    let rows: Vec<recipe_step::ActiveModel> = methods
        .iter()
        .enumerate()
        .map(|(i, text)| {
            Ok(recipe_step::ActiveModel {
                recipe_id: Set(recipe_id),
                position: Set(list_position(i)?),
                text: Set(text.clone()),
            })
        })
        .collect::<Result<_, AppError>>()?;
    recipe_step::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

async fn insert_tag_rows(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    tags: &[String],
) -> Result<(), AppError> {
    let rows: Vec<recipe_tag::ActiveModel> = dedup_tags(tags)
        .into_iter()
        .map(|tag| recipe_tag::ActiveModel {
            recipe_id: Set(recipe_id),
            tag: Set(tag),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    recipe_tag::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

fn list_position(index: usize) -> Result<i32, AppError> {
    i32::try_from(index).map_err(|_| AppError::Validation("List is too long".into()))
}

/// Trim, drop empties, and deduplicate. Tags come back sorted so the create
/// response agrees with later reads, which load them ordered by tag.
fn dedup_tags(tags: &[String]) -> Vec<String> {
    let tags: BTreeSet<String> = tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    tags.into_iter().collect()
}

fn join_ids(ids: &[i32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
