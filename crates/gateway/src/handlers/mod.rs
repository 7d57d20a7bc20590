//! API handlers module

pub mod debug;
pub mod health;
pub mod query;
