//! Query functions, one module per table.

pub mod allocations;
pub mod plans;
