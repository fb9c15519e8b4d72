use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered banner image reference. Position 0 is the display thumbnail;
/// recipes carry 1-4 of these.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_banner")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub recipe_id: i32,
    #[sea_orm(primary_key)]
    pub position: i32,

    pub image_id: i32,

    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: BelongsTo<super::recipe::Entity>,
    #[sea_orm(belongs_to, from = "image_id", to = "id")]
    pub image: BelongsTo<super::image::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
