// src/core/mod.rs

pub mod catalog;
pub mod clock;
pub mod config_store;
pub mod icon_resolver;
pub mod migration;
pub mod paths;
pub mod reference_resolver;
pub mod settings;
pub mod tree_display;
pub mod validator;
