//! Configuration and resolution engine for a tray command launcher.
//!
//! The [`core::config_store::ConfigStore`] owns the three on-disk documents
//! (command tree, favorites, history) and answers every question a launcher
//! asks about them: what to show, what a favorite points at, which icon file
//! to load, and how to undo a bad edit.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
