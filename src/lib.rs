pub mod cli;
pub mod config;
pub mod database;
pub mod ean;
pub mod error;
pub mod handlers;
pub mod hierarchy;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
