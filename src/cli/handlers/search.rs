use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dialoguer::console::measure_text_width;

use crate::{cli::handlers::commons, core::config_store::ConfigStore};

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Finds commands whose location matches a text (case-insensitive)."
)]
struct SearchArgs {
    /// Text to look for, e.g. `docker` or `dev → build`. Empty lists everything.
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

pub fn handle(args: Vec<String>, store: &ConfigStore) -> Result<()> {
    let search_args = SearchArgs::try_parse_from(&args)?;
    let query = search_args.query.join(" ");
    let items = store.search_commands(&query)?;

    if items.is_empty() {
        println!("\n{}", format!(t!("search.info.no_results"), query = query));
        return Ok(());
    }

    println!("\n{}", format!(t!("search.header"), count = items.len()).bold());

    let displays: Vec<String> = items.iter().map(|item| item.display()).collect();
    let width = displays
        .iter()
        .map(|d| measure_text_width(d))
        .max()
        .unwrap_or(0);

    for (item, display) in items.iter().zip(&displays) {
        let padding = " ".repeat(width.saturating_sub(measure_text_width(display)));
        println!(
            "  {}{}  {}{}",
            display.cyan(),
            padding,
            item.resolved.command,
            commons::flag_summary(&item.resolved).dimmed()
        );
    }
    Ok(())
}
