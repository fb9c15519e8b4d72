use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A stored image asset. Bytes live with the external provider; this row
/// records the serving URL and the provider's asset id.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub url: String,
    pub provider_id: String,
    pub kind: String,

    #[sea_orm(has_many)]
    pub banners: HasMany<super::recipe_banner::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
