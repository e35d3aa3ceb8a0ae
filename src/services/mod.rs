// src/services/mod.rs
pub mod cache;
pub mod frame;
pub mod fred;
pub mod valuation;
pub mod yahoo;
