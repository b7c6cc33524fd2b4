// src/lib.rs

pub mod config;
pub mod error;
pub mod exam;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod paragraph;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod utils;

// Re-export specific items for convenience if needed
pub use routes::create_router;
