use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Collection membership. The composite key makes a recipe appear at most
/// once per collection.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collection_recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub collection_id: i32,
    #[sea_orm(primary_key)]
    pub recipe_id: i32,

    #[sea_orm(belongs_to, from = "collection_id", to = "id")]
    pub collection: BelongsTo<super::collection::Entity>,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: BelongsTo<super::recipe::Entity>,

    pub added_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
