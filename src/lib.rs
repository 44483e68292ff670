pub mod app;
pub mod auth;
pub mod aws;
pub mod bootstrap;
pub mod config;
pub mod database;
mod middleware;
pub mod parameter_store;
pub mod routes;
mod shutdown;
pub mod state;
mod tracing;
