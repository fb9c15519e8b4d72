use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    pub description: String,
    /// Public visibility flag. Private recipes are excluded from listings,
    /// search, and category rollups.
    pub status: bool,
    /// Lowercased and trimmed before storage.
    pub category: String,
    pub servings: i32, // 1-16
    pub time: i32,     // in minutes, 1-200

    /// Derived: the first banner's URL, empty when the recipe has none.
    pub image_url: String,

    /// Rolling rating summary, recomputed on demand from `rating` rows.
    pub rating_avg: f64,
    pub rating_total: i32,

    pub created_by: i32,
    #[sea_orm(belongs_to, from = "created_by", to = "id")]
    pub creator: BelongsTo<super::user::Entity>,

    #[sea_orm(has_many)]
    pub banners: HasMany<super::recipe_banner::Entity>,

    #[sea_orm(has_many)]
    pub ingredients: HasMany<super::recipe_ingredient::Entity>,

    #[sea_orm(has_many)]
    pub steps: HasMany<super::recipe_step::Entity>,

    #[sea_orm(has_many)]
    pub tags: HasMany<super::recipe_tag::Entity>,

    #[sea_orm(has_many)]
    pub ratings: HasMany<super::rating::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
