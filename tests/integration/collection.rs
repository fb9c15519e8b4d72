use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use ladle::entity::collection_recipe;

use crate::common::{TestApp, create_recipe, recipe_payload, register_and_login, routes};

async fn create_collection(app: &TestApp, token: &str, name: &str) -> i64 {
    let res = app
        .post_with_token(routes::COLLECTIONS, &json!({"name": name}), token)
        .await;
    assert_eq!(res.status, 201, "Collection creation failed: {}", res.text);
    res.body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn owner_can_create_and_list_their_collections() {
    let app = TestApp::spawn().await;
    let alice = register_and_login(&app, "alice").await;
    create_collection(&app, &alice, "Weeknight dinners").await;

    let bob = register_and_login(&app, "bob").await;
    create_collection(&app, &bob, "Desserts").await;

    let res = app.get_with_token(routes::COLLECTIONS, &alice).await;

    assert_eq!(res.status, 200);
    let items = res.body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Weeknight dinners");
}

#[tokio::test]
async fn blank_collection_name_is_rejected() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;

    let res = app
        .post_with_token(routes::COLLECTIONS, &json!({"name": "   "}), &token)
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn detail_resolves_members_to_thumbnails_in_added_order() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;
    let first = create_recipe(&app, &token, "Stew", "dinner").await["id"]
        .as_i64()
        .unwrap();
    let second = create_recipe(&app, &token, "Roast", "dinner").await["id"]
        .as_i64()
        .unwrap();
    let id = create_collection(&app, &token, "Dinners").await;

    let res = app
        .put_with_token(&routes::collection_recipe(id, second), &token)
        .await;
    assert_eq!(res.status, 204);
    let res = app
        .put_with_token(&routes::collection_recipe(id, first), &token)
        .await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::collection(id), &token).await;

    assert_eq!(res.status, 200);
    let recipes = res.body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 2);
    assert_eq!(recipes[0]["name"], "Roast");
    assert_eq!(recipes[1]["name"], "Stew");

    let keys: Vec<&str> = recipes[0]
        .as_object()
        .unwrap()
        .keys()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(keys, ["id", "name", "image_url", "rating"]);
}

#[tokio::test]
async fn collections_are_private_to_their_owner() {
    let app = TestApp::spawn().await;
    let owner = register_and_login(&app, "alice").await;
    let id = create_collection(&app, &owner, "Dinners").await;

    let stranger = register_and_login(&app, "bob").await;
    let res = app.get_with_token(&routes::collection(id), &stranger).await;

    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn adding_a_member_twice_is_a_noop() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;
    let recipe = create_recipe(&app, &token, "Stew", "dinner").await["id"]
        .as_i64()
        .unwrap();
    let id = create_collection(&app, &token, "Dinners").await;

    let res = app
        .put_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;
    assert_eq!(res.status, 204);
    let res = app
        .put_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::collection(id), &token).await;
    assert_eq!(res.body["recipes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn strangers_cannot_pull_a_private_recipe_into_their_collection() {
    let app = TestApp::spawn().await;
    let owner = register_and_login(&app, "alice").await;
    let mut payload = recipe_payload(&app, &owner, "Secret", "dinner").await;
    payload["status"] = json!(false);
    let created = app.post_with_token(routes::RECIPES, &payload, &owner).await;
    assert_eq!(created.status, 201);
    let recipe = created.body["id"].as_i64().unwrap();

    let stranger = register_and_login(&app, "bob").await;
    let id = create_collection(&app, &stranger, "Gleaned").await;

    let res = app
        .put_with_token(&routes::collection_recipe(id, recipe), &stranger)
        .await;
    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");

    let res = app.get_with_token(&routes::collection(id), &stranger).await;
    assert_eq!(res.body["recipes"].as_array().unwrap().len(), 0);

    let own = create_collection(&app, &owner, "Drafts").await;
    let res = app
        .put_with_token(&routes::collection_recipe(own, recipe), &owner)
        .await;
    assert_eq!(res.status, 204);
}

#[tokio::test]
async fn adding_a_missing_recipe_returns_404() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;
    let id = create_collection(&app, &token, "Dinners").await;

    let res = app
        .put_with_token(&routes::collection_recipe(id, 999), &token)
        .await;

    assert_eq!(res.status, 404);
    assert_eq!(res.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn removing_a_member_is_idempotent() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;
    let recipe = create_recipe(&app, &token, "Stew", "dinner").await["id"]
        .as_i64()
        .unwrap();
    let id = create_collection(&app, &token, "Dinners").await;
    app.put_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;

    let res = app
        .delete_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;
    assert_eq!(res.status, 204);
    let res = app
        .delete_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::collection(id), &token).await;
    assert_eq!(res.body["recipes"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn deleting_a_collection_keeps_its_recipes() {
    let app = TestApp::spawn().await;
    let token = register_and_login(&app, "alice").await;
    let recipe = create_recipe(&app, &token, "Stew", "dinner").await["id"]
        .as_i64()
        .unwrap();
    let id = create_collection(&app, &token, "Dinners").await;
    app.put_with_token(&routes::collection_recipe(id, recipe), &token)
        .await;

    let res = app.delete_with_token(&routes::collection(id), &token).await;
    assert_eq!(res.status, 204);

    let res = app.get_with_token(&routes::collection(id), &token).await;
    assert_eq!(res.status, 404);

    let res = app.get_without_token(&routes::recipe(recipe)).await;
    assert_eq!(res.status, 200);

    let leftover = collection_recipe::Entity::find()
        .filter(collection_recipe::Column::CollectionId.eq(id as i32))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn only_the_owner_may_delete_a_collection() {
    let app = TestApp::spawn().await;
    let owner = register_and_login(&app, "alice").await;
    let id = create_collection(&app, &owner, "Dinners").await;

    let stranger = register_and_login(&app, "bob").await;
    let res = app
        .delete_with_token(&routes::collection(id), &stranger)
        .await;

    assert_eq!(res.status, 403);
}
