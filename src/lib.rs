pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;
