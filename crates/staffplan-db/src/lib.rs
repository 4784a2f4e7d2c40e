//! Persistence layer for staffing plans and their resource allocations.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
