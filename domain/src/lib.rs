pub mod aggregation;
pub mod models;
pub mod repositories;
pub mod types;
