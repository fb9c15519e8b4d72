use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/images", image_routes())
        .nest("/recipes", recipe_routes())
        .nest("/collections", collection_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::image::create_image))
        .route("/{id}", get(handlers::image::get_image))
}

fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::recipe::list_recipes).post(handlers::recipe::create_recipe),
        )
        .route("/search", get(handlers::recipe::search_recipes))
        .route("/categories", get(handlers::recipe::list_categories))
        .route(
            "/category/{category}",
            get(handlers::recipe::recipes_by_category),
        )
        .route(
            "/{id}",
            get(handlers::recipe::get_recipe).patch(handlers::recipe::update_recipe),
        )
        .route("/{id}/edit", get(handlers::recipe::get_recipe_edit))
        .route("/{id}/ratings", post(handlers::recipe::rate_recipe))
        .route(
            "/{id}/ratings/refresh",
            post(handlers::recipe::refresh_rating),
        )
        .route(
            "/{id}/save",
            put(handlers::recipe::save_recipe).delete(handlers::recipe::unsave_recipe),
        )
}

fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::collection::list_my_collections)
                .post(handlers::collection::create_collection),
        )
        .route(
            "/{id}",
            get(handlers::collection::get_collection)
                .delete(handlers::collection::delete_collection),
        )
        .route(
            "/{id}/recipes/{recipe_id}",
            put(handlers::collection::add_recipe_to_collection)
                .delete(handlers::collection::remove_recipe_from_collection),
        )
}
