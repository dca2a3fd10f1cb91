//! # Handler for the `fav` command
//!
//! Manages favorites: labels that point at commands elsewhere in the tree.
//!
//! ## Core Logic
//!
//! - **References, not copies**: `add` verifies that the path names a live command
//!   and stores only the path, so later edits to the command show through.
//! - **Health check**: `check` resolves every favorite and reports broken ones,
//!   stale ones (recorded command text no longer matches), and legacy inline copies.

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::console::measure_text_width;

use crate::{
    cli::handlers::commons,
    core::{config_store::ConfigStore, reference_resolver::FavoriteStatus},
    models::FavoriteEntry,
};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manage favorite commands.")]
struct FavArgs {
    #[command(subcommand)]
    command: Option<FavCommand>,
}

#[derive(Subcommand, Debug)]
enum FavCommand {
    /// Adds a favorite pointing at a command, or repoints an existing label.
    Add {
        /// Dotted path of the command (e.g. 'Dev.Build').
        path: String,
        /// Label shown in the favorites menu. Defaults to the command's own label.
        label: Option<String>,
    },
    /// Removes a favorite.
    #[command(name = "remove", aliases = ["rm"])]
    Remove {
        /// The label of the favorite to remove.
        label: String,
    },
    /// Lists all favorites.
    #[command(name = "list", aliases = ["ls"])]
    List,
    /// Resolves every favorite and reports broken or stale ones.
    Check,
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let fav_args = FavArgs::try_parse_from(&args)?;

    match fav_args.command.unwrap_or(FavCommand::List) {
        FavCommand::Add { path, label } => add_favorite(store, &path, label.as_deref()),
        FavCommand::Remove { label } => remove_favorite(store, &label),
        FavCommand::List => list_favorites(store),
        FavCommand::Check => check_favorites(store),
    }
}

fn add_favorite(store: &ConfigStore, path: &str, label: Option<&str>) -> Result<()> {
    let existing = store.get_favorites(false);
    if let Some(label) = label {
        if existing.entries.contains_key(label) {
            println!(
                "{}",
                format!(t!("fav.warning.overwriting"), label = label).yellow()
            );
        }
    }

    let label = store.add_favorite(path, label)?;
    println!(
        "{} {}",
        t!("common.success"),
        format!(
            t!("fav.success.added"),
            label = label.cyan(),
            path = commons::display_path(path)
        )
    );
    Ok(())
}

fn remove_favorite(store: &ConfigStore, label: &str) -> Result<()> {
    if store.remove_favorite(label)? {
        println!(
            "{} {}",
            t!("common.success"),
            format!(t!("fav.success.removed"), label = label)
        );
        Ok(())
    } else {
        Err(anyhow!(t!("fav.error.not_found"), label = label))
    }
}

fn list_favorites(store: &ConfigStore) -> Result<()> {
    let favorites = store.get_favorites(false);
    if favorites.is_empty() {
        println!("\n{}", t!("fav.info.none"));
        return Ok(());
    }

    println!("\n{}:", t!("fav.info.header"));
    let width = favorites
        .entries
        .keys()
        .map(|label| measure_text_width(label))
        .max()
        .unwrap_or(0);

    for (label, entry) in &favorites.entries {
        let padding = " ".repeat(width.saturating_sub(measure_text_width(label)));
        let target = match entry {
            FavoriteEntry::Reference(reference) => commons::display_path(&reference.path),
            FavoriteEntry::Inline(copy) => {
                format!("{} {}", copy.command, t!("fav.info.inline_marker").dimmed())
            }
        };
        println!("  {}{} ->  {}", label.cyan(), padding, target);
    }
    Ok(())
}

fn check_favorites(store: &ConfigStore) -> Result<()> {
    let statuses = store.resolve_favorites()?;
    if statuses.is_empty() {
        println!("\n{}", t!("fav.info.none"));
        return Ok(());
    }

    println!("\n{}", t!("fav.info.checking_header"));
    let mut broken = 0usize;
    let mut stale = 0usize;

    for (label, status) in &statuses {
        match status {
            FavoriteStatus::Live { resolved, stale: false } => {
                println!("  {} {} -> {}", "✔".green(), label.cyan(), resolved.command);
            }
            FavoriteStatus::Live { resolved, stale: true } => {
                stale += 1;
                println!(
                    "  {} {} -> {} {}",
                    "!".yellow(),
                    label.cyan(),
                    resolved.command,
                    t!("fav.info.stale_marker").yellow()
                );
            }
            FavoriteStatus::Inline(resolved) => {
                println!(
                    "  {} {} -> {} {}",
                    "•".dimmed(),
                    label.cyan(),
                    resolved.command,
                    t!("fav.info.inline_marker").dimmed()
                );
            }
            FavoriteStatus::Broken(unresolved) => {
                broken += 1;
                println!(
                    "  {} {} -> {} ({})",
                    "✖".red(),
                    label.cyan(),
                    unresolved.path,
                    unresolved.reason.to_string().red()
                );
            }
        }
    }

    println!("---");
    if broken == 0 && stale == 0 {
        println!("{} {}", t!("common.success"), t!("fav.success.all_ok"));
    } else {
        println!(
            "{}",
            format!(t!("fav.warning.found_problems"), broken = broken, stale = stale).yellow()
        );
    }
    Ok(())
}
