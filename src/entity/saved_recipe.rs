use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's saved-recipes list, backing the `saved_by_user` flag on the
/// recipe detail view.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "saved_recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub user_id: i32,
    #[sea_orm(primary_key)]
    pub recipe_id: i32,

    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: BelongsTo<super::user::Entity>,
    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: BelongsTo<super::recipe::Entity>,

    pub saved_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
