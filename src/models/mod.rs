pub mod auth;
pub mod collection;
pub mod image;
pub mod recipe;
pub mod shared;
