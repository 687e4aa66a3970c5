pub mod models;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod services;
pub mod store;
