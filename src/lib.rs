pub mod cells;
pub mod config;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod import;
pub mod models;
pub mod recognition;
pub mod render;
pub mod schema;
pub mod session;
