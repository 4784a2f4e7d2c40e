//! Staffing cost projection: the cost engine, plan files, and the
//! transactional coordinator that keeps cached plan figures consistent.

pub mod allocation;
pub mod cost;
pub mod plan;
