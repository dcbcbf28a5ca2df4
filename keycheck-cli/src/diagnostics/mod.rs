//! Report writers for the three key checks

pub mod live;
pub mod models;
pub mod simple;
