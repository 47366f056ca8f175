//! Photo feed: image posts with likes and comments, served over HTTP.

pub mod auth;
pub mod aws_clients;
pub mod client;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod startup;
pub mod state;
pub mod storage;

pub use state::AppState;
