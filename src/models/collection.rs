use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::collection;
use crate::error::AppError;
use crate::models::recipe::RecipeThumbnail;
use crate::models::shared::validate_name;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCollectionRequest {
    pub name: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CollectionResponse {
    pub id: i32,
    pub name: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Detail view with member recipes resolved to thumbnails. The resolve step
/// happens in the handler; this type never holds bare references.
#[derive(Serialize, utoipa::ToSchema)]
pub struct CollectionDetail {
    pub id: i32,
    pub name: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub recipes: Vec<RecipeThumbnail>,
}

impl From<collection::Model> for CollectionResponse {
    fn from(m: collection::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            created_by: m.created_by,
            created_at: m.created_at,
        }
    }
}

pub fn validate_create_collection(req: &CreateCollectionRequest) -> Result<(), AppError> {
    validate_name(&req.name, 128)
}

/// Membership set after adding `recipe_id`, or `None` when it is already a
/// member and nothing needs to be written.
pub fn with_recipe(members: &[i32], recipe_id: i32) -> Option<Vec<i32>> {
    if members.contains(&recipe_id) {
        return None;
    }
    let mut next = members.to_vec();
    next.push(recipe_id);
    Some(next)
}

/// Membership set after removing `recipe_id`, or `None` when it was not a
/// member (removal of an absent recipe is a no-op, not an error).
pub fn without_recipe(members: &[i32], recipe_id: i32) -> Option<Vec<i32>> {
    if !members.contains(&recipe_id) {
        return None;
    }
    Some(members.iter().copied().filter(|&m| m != recipe_id).collect())
}
