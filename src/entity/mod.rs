pub mod collection;
pub mod collection_recipe;
pub mod image;
pub mod rating;
pub mod recipe;
pub mod recipe_banner;
pub mod recipe_ingredient;
pub mod recipe_step;
pub mod recipe_tag;
pub mod saved_recipe;
pub mod user;
