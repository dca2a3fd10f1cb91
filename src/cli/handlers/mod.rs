// src/cli/handlers/mod.rs

// One module per CLI action, plus helpers they share.

pub mod backup;
pub mod commons;
pub mod favorites;
pub mod history;
pub mod icon;
pub mod resolve;
pub mod search;
pub mod transfer;
pub mod tree;
