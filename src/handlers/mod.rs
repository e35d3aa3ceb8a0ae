// src/handlers/mod.rs
pub mod equities;
pub mod error;
pub mod macro_risk;
pub mod search;
