use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::image;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateImageRequest {
    /// Serving URL produced by the external upload provider.
    pub url: String,
    /// Provider-side asset id (used for later cleanup at the provider).
    pub provider_id: String,
    /// Asset category, defaults to `recipe`.
    pub kind: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    pub url: String,
    pub provider_id: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// Image projection for edit payloads: just enough for a client to render
/// and resubmit the banner list.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageEditView {
    pub id: i32,
    pub url: String,
}

impl From<image::Model> for ImageResponse {
    fn from(m: image::Model) -> Self {
        Self {
            id: m.id,
            url: m.url,
            provider_id: m.provider_id,
            kind: m.kind,
            created_at: m.created_at,
        }
    }
}

impl From<&image::Model> for ImageEditView {
    fn from(m: &image::Model) -> Self {
        Self {
            id: m.id,
            url: m.url.clone(),
        }
    }
}

pub fn validate_create_image(req: &CreateImageRequest) -> Result<(), AppError> {
    if req.url.trim().is_empty() || req.url.len() > 2048 {
        return Err(AppError::Validation(
            "Url must be non-empty and at most 2048 bytes".into(),
        ));
    }
    if req.provider_id.trim().is_empty() {
        return Err(AppError::Validation("Provider id must be non-empty".into()));
    }
    if let Some(ref kind) = req.kind
        && kind.trim().is_empty()
    {
        return Err(AppError::Validation("Kind must be non-empty".into()));
    }
    Ok(())
}
