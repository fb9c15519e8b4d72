use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::recipe;
use crate::error::FieldError;
use crate::models::image::ImageEditView;

/// Relevance weights for text search, applied per matched occurrence.
/// Exposed so the search query collaborator and the scoring function agree.
pub const WEIGHT_NAME: u32 = 10;
pub const WEIGHT_CATEGORY: u32 = 7;
pub const WEIGHT_TAG: u32 = 6;
pub const WEIGHT_INGREDIENT: u32 = 6;
pub const WEIGHT_DESCRIPTION: u32 = 5;

pub const MIN_SERVINGS: i32 = 1;
pub const MAX_SERVINGS: i32 = 16;
pub const MIN_TIME: i32 = 1;
pub const MAX_TIME: i32 = 200;
pub const MIN_BANNERS: usize = 1;
pub const MAX_BANNERS: usize = 4;

/// Rolling rating summary stored on the recipe.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct RatingSummary {
    pub avg: f64,
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Ingredient {
    pub quantity: String,
    pub name: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub description: String,
    pub category: String,
    pub servings: i32,
    /// Preparation time in minutes.
    pub time: i32,
    /// Public visibility, defaults to true.
    pub status: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ordered image ids, 1-4; every id must reference an existing image.
    pub banners: Vec<i32>,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub methods: Vec<String>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub servings: Option<i32>,
    pub time: Option<i32>,
    pub status: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub banners: Option<Vec<i32>>,
    pub ingredients: Option<Vec<Ingredient>>,
    pub methods: Option<Vec<String>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct ListRecipesQuery {
    /// `new` (default) orders by creation time; `top` by rating total then
    /// rating average.
    pub sort: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CategoriesQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RateRecipeRequest {
    pub rate: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingResponse {
    pub id: i32,
    pub recipe_id: i32,
    pub user_id: i32,
    pub rate: i32,
}

impl From<crate::entity::rating::Model> for RatingResponse {
    fn from(m: crate::entity::rating::Model) -> Self {
        Self {
            id: m.id,
            recipe_id: m.recipe_id,
            user_id: m.user_id,
            rate: m.rate,
        }
    }
}

/// Compact projection for list and grid displays. Deliberately omits all
/// bulky and filter-only fields (banners, ingredients, methods, description,
/// category, tags, time, status, servings, timestamps).
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeThumbnail {
    pub id: i32,
    pub name: String,
    pub image_url: String,
    pub rating: RatingSummary,
}

impl From<&recipe::Model> for RecipeThumbnail {
    fn from(m: &recipe::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            image_url: m.image_url.clone(),
            rating: RatingSummary {
                avg: m.rating_avg,
                total: m.rating_total,
            },
        }
    }
}

/// Search hit projection. Shaped like the thumbnail; the relevance score
/// used for ordering never leaves the handler.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeSearchResult {
    pub id: i32,
    pub name: String,
    pub image_url: String,
    pub rating: RatingSummary,
}

impl From<&recipe::Model> for RecipeSearchResult {
    fn from(m: &recipe::Model) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            image_url: m.image_url.clone(),
            rating: RatingSummary {
                avg: m.rating_avg,
                total: m.rating_total,
            },
        }
    }
}

/// Full editable payload with banners expanded to `{id, url}` pairs.
/// Omits ownership and audit fields so a client can resubmit it verbatim.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeEditView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub status: bool,
    pub category: String,
    pub servings: i32,
    pub time: i32,
    pub tags: Vec<String>,
    pub banners: Vec<ImageEditView>,
    pub ingredients: Vec<Ingredient>,
    pub methods: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// Full detail view, personalized with the requesting user's relationship
/// to the recipe.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecipeDetail {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub status: bool,
    pub category: String,
    pub servings: i32,
    pub time: i32,
    pub image_url: String,
    pub tags: Vec<String>,
    pub banners: Vec<ImageEditView>,
    pub ingredients: Vec<Ingredient>,
    pub methods: Vec<String>,
    pub rating: RatingSummary,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub saved_by_user: bool,
    pub created_by_user: bool,
}

/// Resolved child rows of a recipe, loaded before projection so the view
/// constructors perform no I/O.
pub struct RecipeParts {
    pub banners: Vec<ImageEditView>,
    pub ingredients: Vec<Ingredient>,
    pub methods: Vec<String>,
    pub tags: Vec<String>,
}

pub fn edit_view(m: recipe::Model, parts: RecipeParts) -> RecipeEditView {
    RecipeEditView {
        id: m.id,
        name: m.name,
        description: m.description,
        status: m.status,
        category: m.category,
        servings: m.servings,
        time: m.time,
        tags: parts.tags,
        banners: parts.banners,
        ingredients: parts.ingredients,
        methods: parts.methods,
        updated_at: m.updated_at,
    }
}

pub fn detail_view(
    m: recipe::Model,
    parts: RecipeParts,
    viewer_id: Option<i32>,
    saved_by_user: bool,
) -> RecipeDetail {
    let created_by_user = viewer_id == Some(m.created_by);
    RecipeDetail {
        id: m.id,
        name: m.name,
        description: m.description,
        status: m.status,
        category: m.category,
        servings: m.servings,
        time: m.time,
        image_url: m.image_url,
        tags: parts.tags,
        banners: parts.banners,
        ingredients: parts.ingredients,
        methods: parts.methods,
        rating: RatingSummary {
            avg: m.rating_avg,
            total: m.rating_total,
        },
        created_by: m.created_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
        saved_by_user,
        created_by_user,
    }
}

/// One entry of the category rollup.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CategorySummary {
    pub name: String,
    pub total: u64,
    pub image_url: String,
}

/// Category normalization applied before storage and lookups.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Roll all rating values up into the stored summary. An empty set resets
/// the summary to zero.
pub fn summarize_ratings(rates: &[i32]) -> RatingSummary {
    if rates.is_empty() {
        return RatingSummary { avg: 0.0, total: 0 };
    }
    let sum: i64 = rates.iter().map(|&r| i64::from(r)).sum();
    RatingSummary {
        avg: sum as f64 / rates.len() as f64,
        total: rates.len() as i32,
    }
}

/// Group `(category, image_url)` rows of publicly visible recipes into
/// per-category summaries. The representative image is the first one seen
/// for the category; ordering is by member count descending, then name.
pub fn rollup_categories(
    rows: impl IntoIterator<Item = (String, String)>,
    limit: Option<usize>,
) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<String, (u64, String)> = BTreeMap::new();
    for (category, image_url) in rows {
        if category.is_empty() {
            continue;
        }
        let entry = groups.entry(category).or_insert((0, image_url));
        entry.0 += 1;
    }

    let mut summaries: Vec<CategorySummary> = groups
        .into_iter()
        .map(|(name, (total, image_url))| CategorySummary {
            name,
            total,
            image_url,
        })
        .collect();
    summaries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    if let Some(limit) = limit {
        summaries.truncate(limit);
    }
    summaries
}

fn occurrences(haystack: &str, needle: &str) -> u32 {
    haystack.matches(needle).count() as u32
}

/// Weighted relevance of a recipe for a free-text query. Terms are matched
/// case-insensitively as substrings; every occurrence counts once per field
/// weight. Zero means no field matched any term.
pub fn relevance_score(
    query: &str,
    name: &str,
    category: &str,
    description: &str,
    tags: &[String],
    ingredients: &[String],
) -> u32 {
    let name = name.to_lowercase();
    let category = category.to_lowercase();
    let description = description.to_lowercase();
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let ingredients: Vec<String> = ingredients.iter().map(|i| i.to_lowercase()).collect();

    let mut score = 0u32;
    for term in query.split_whitespace() {
        let term = term.to_lowercase();
        if term.is_empty() {
            continue;
        }
        score += occurrences(&name, &term) * WEIGHT_NAME;
        score += occurrences(&category, &term) * WEIGHT_CATEGORY;
        score += tags.iter().map(|t| occurrences(t, &term)).sum::<u32>() * WEIGHT_TAG;
        score += ingredients
            .iter()
            .map(|i| occurrences(i, &term))
            .sum::<u32>()
            * WEIGHT_INGREDIENT;
        score += occurrences(&description, &term) * WEIGHT_DESCRIPTION;
    }
    score
}

fn check_scalars(
    errors: &mut Vec<FieldError>,
    name: Option<&str>,
    description: Option<&str>,
    category: Option<&str>,
    servings: Option<i32>,
    time: Option<i32>,
) {
    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 150 {
            errors.push(FieldError::new("name", "Name must be 1-150 characters"));
        }
    }
    if let Some(description) = description
        && (description.trim().is_empty() || description.len() > 5000)
    {
        errors.push(FieldError::new(
            "description",
            "Description must be non-empty and at most 5000 bytes",
        ));
    }
    if let Some(category) = category {
        let category = normalize_category(category);
        if category.is_empty() || category.chars().count() > 50 {
            errors.push(FieldError::new(
                "category",
                "Category must be 1-50 characters",
            ));
        }
    }
    if let Some(servings) = servings
        && !(MIN_SERVINGS..=MAX_SERVINGS).contains(&servings)
    {
        errors.push(FieldError::new(
            "servings",
            format!("Servings must be {MIN_SERVINGS}-{MAX_SERVINGS}"),
        ));
    }
    if let Some(time) = time
        && !(MIN_TIME..=MAX_TIME).contains(&time)
    {
        errors.push(FieldError::new(
            "time",
            format!("Time must be {MIN_TIME}-{MAX_TIME} minutes"),
        ));
    }
}

fn check_lists(
    errors: &mut Vec<FieldError>,
    tags: Option<&[String]>,
    banners: Option<&[i32]>,
    ingredients: Option<&[Ingredient]>,
    methods: Option<&[String]>,
) {
    if let Some(tags) = tags
        && tags.iter().any(|t| t.trim().is_empty())
    {
        errors.push(FieldError::new("tags", "Tags must be non-empty strings"));
    }
    if let Some(banners) = banners
        && !(MIN_BANNERS..=MAX_BANNERS).contains(&banners.len())
    {
        errors.push(FieldError::new(
            "banners",
            format!("Banners must reference {MIN_BANNERS}-{MAX_BANNERS} images"),
        ));
    }
    if let Some(ingredients) = ingredients
        && ingredients.iter().any(|i| i.name.trim().is_empty())
    {
        errors.push(FieldError::new(
            "ingredients",
            "Every ingredient needs a name",
        ));
    }
    if let Some(methods) = methods
        && methods.iter().any(|s| s.trim().is_empty())
    {
        errors.push(FieldError::new(
            "methods",
            "Method steps must be non-empty",
        ));
    }
}

/// Field-level validation of a create payload. Banner *existence* is checked
/// separately against the database; the caller merges that failure into the
/// same error list.
pub fn validate_create_recipe(req: &CreateRecipeRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_scalars(
        &mut errors,
        Some(&req.name),
        Some(&req.description),
        Some(&req.category),
        Some(req.servings),
        Some(req.time),
    );
    check_lists(
        &mut errors,
        Some(&req.tags),
        Some(&req.banners),
        Some(&req.ingredients),
        Some(&req.methods),
    );
    errors
}

/// Field-level validation of a PATCH payload; only provided fields are checked.
pub fn validate_update_recipe(req: &UpdateRecipeRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_scalars(
        &mut errors,
        req.name.as_deref(),
        req.description.as_deref(),
        req.category.as_deref(),
        req.servings,
        req.time,
    );
    check_lists(
        &mut errors,
        req.tags.as_deref(),
        req.banners.as_deref(),
        req.ingredients.as_deref(),
        req.methods.as_deref(),
    );
    errors
}

pub fn validate_rate_recipe(req: &RateRecipeRequest) -> Result<(), crate::error::AppError> {
    if !(1..=5).contains(&req.rate) {
        return Err(crate::error::AppError::Validation(
            "Rate must be 1-5".into(),
        ));
    }
    Ok(())
}
