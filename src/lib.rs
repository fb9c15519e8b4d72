pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ladle Recipe API",
        version = "1.0.0",
        description = "API for the Ladle recipe sharing service"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::image::create_image,
        handlers::image::get_image,
        handlers::recipe::create_recipe,
        handlers::recipe::list_recipes,
        handlers::recipe::search_recipes,
        handlers::recipe::list_categories,
        handlers::recipe::recipes_by_category,
        handlers::recipe::get_recipe,
        handlers::recipe::get_recipe_edit,
        handlers::recipe::update_recipe,
        handlers::recipe::rate_recipe,
        handlers::recipe::refresh_rating,
        handlers::recipe::save_recipe,
        handlers::recipe::unsave_recipe,
        handlers::collection::create_collection,
        handlers::collection::list_my_collections,
        handlers::collection::get_collection,
        handlers::collection::delete_collection,
        handlers::collection::add_recipe_to_collection,
        handlers::collection::remove_recipe_from_collection,
    ),
    tags(
        (name = "Auth", description = "Authentication and user management"),
        (name = "Images", description = "Image reference registry"),
        (name = "Recipes", description = "Recipe CRUD, discovery, and saved lists"),
        (name = "Ratings", description = "Recipe ratings and rollups"),
        (name = "Collections", description = "User-curated recipe collections"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(cfg: &config::CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(cfg.max_age));
    if cfg.allow_origins.iter().any(|o| o == "*") {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }
    layer
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let api = ApiDoc::openapi();

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
