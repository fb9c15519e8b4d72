mod common;

mod auth;
mod collection;
mod image;
